//! Optimistic-concurrency version checks.

use recmold_core::{
    Attribute, EntityAccessor, Error, FromValue, PropertyAccess, Result, StaleVersionError,
    TransferRecord, TypeError,
};

/// Compares a record's version with its entity's before an update.
#[derive(Debug, Clone, Copy)]
pub struct VersionGuard<'p> {
    property: &'p str,
}

impl<'p> VersionGuard<'p> {
    /// A guard reading versions from entity property `property`.
    pub fn new(property: &'p str) -> Self {
        Self { property }
    }

    pub fn property(&self) -> &'p str {
        self.property
    }

    /// The version `record` carries: its explicit version, else the value of
    /// a declared version property.
    pub fn provided(&self, record: &TransferRecord) -> Result<Option<i64>> {
        if let Some(version) = record.version() {
            return Ok(Some(version));
        }
        if !record.property_names().contains(self.property) {
            return Ok(None);
        }
        Option::<i64>::from_value(&record.get(self.property)?)
    }

    /// The version `entity` is currently at.
    pub fn current<A: EntityAccessor>(&self, accessor: &A, entity: &A::Entity) -> Result<Option<i64>> {
        match accessor.get(entity, self.property)? {
            Attribute::Value(value) => Option::<i64>::from_value(&value),
            Attribute::One(_) | Attribute::Many(_) => Err(Error::Type(TypeError {
                expected: "version number",
                actual: "relationship".to_string(),
                property: Some(self.property.to_string()),
            })),
        }
    }

    /// Check `record` against `entity`.
    ///
    /// Returns the version to store once the write has succeeded, or `None`
    /// when the record carries no version. A mismatch fails with
    /// `StaleVersion` and touches nothing.
    pub fn verify<A: EntityAccessor>(
        &self,
        accessor: &A,
        entity: &A::Entity,
        model: &str,
        record: &TransferRecord,
    ) -> Result<Option<i64>> {
        let Some(provided) = self.provided(record)? else {
            return Ok(None);
        };
        let current = self.current(accessor, entity)?;
        if current != Some(provided) {
            tracing::warn!(model, ?current, provided, "stale version rejected");
            return Err(StaleVersionError {
                model: model.to_string(),
                current,
                provided,
            }
            .into());
        }
        let next = provided.checked_add(1).ok_or_else(|| {
            Error::config(format!(
                "{model} version {provided} cannot be incremented without overflow"
            ))
        })?;
        Ok(Some(next))
    }
}
