//! The generic property-access contract and its map-backed storage.

use std::sync::Arc;

use crate::Result;
use crate::error::Error;
use crate::property::PropertySet;
use crate::value::{Value, ValueMap};

/// Generic get/set of named properties.
///
/// Implemented by the map-backed [`PropertyBag`] and by the struct-backed
/// [`TypedAccessorBag`](crate::accessor::TypedAccessorBag).
pub trait PropertyAccess {
    /// Names this storage can address.
    fn property_names(&self) -> &PropertySet;

    /// Read one property.
    fn get(&self, name: &str) -> Result<Value>;

    /// Assign one property.
    fn set(&mut self, name: &str, value: Value) -> Result<()>;

    /// Read every declared property.
    fn get_all(&self) -> Result<ValueMap> {
        self.property_names()
            .iter()
            .map(|name| Ok((name.to_string(), self.get(name)?)))
            .collect()
    }

    /// Read the requested subset.
    fn get_many(&self, names: &[&str]) -> Result<ValueMap> {
        names
            .iter()
            .map(|name| Ok(((*name).to_string(), self.get(name)?)))
            .collect()
    }

    /// Bulk-assign. Every name is checked before anything is written.
    fn set_all(&mut self, values: ValueMap) -> Result<()> {
        if let Some(name) = values
            .keys()
            .find(|name| !self.property_names().contains(name))
        {
            return Err(Error::undeclared(name.clone(), None));
        }
        for (name, value) in values {
            self.set(&name, value)?;
        }
        Ok(())
    }
}

/// Map-backed property storage.
///
/// Values are stored positionally, aligned with the shared `PropertySet`, so
/// bags built from the same set share their metadata.
#[derive(Debug, Clone)]
pub struct PropertyBag {
    names: Arc<PropertySet>,
    values: Vec<Value>,
}

impl PropertyBag {
    /// A bag declaring `names`, every value null.
    pub fn new(names: Arc<PropertySet>) -> Self {
        let values = vec![Value::Null; names.len()];
        Self { names, values }
    }

    /// A bag whose declared set is inferred from the map keys.
    pub fn from_values(values: ValueMap) -> Self {
        let names = Arc::new(PropertySet::new(values.keys().cloned()));
        let values = values.into_values().collect();
        Self { names, values }
    }

    /// Shared handle to the declared set.
    pub fn shared_names(&self) -> Arc<PropertySet> {
        Arc::clone(&self.names)
    }

    /// Borrow a value without cloning.
    pub fn value(&self, name: &str) -> Result<&Value> {
        self.names
            .index_of(name)
            .and_then(|i| self.values.get(i))
            .ok_or_else(|| Error::undeclared(name, None))
    }

    /// Iterate over (name, value) pairs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.names.iter().zip(self.values.iter())
    }
}

impl PropertyAccess for PropertyBag {
    fn property_names(&self) -> &PropertySet {
        &self.names
    }

    fn get(&self, name: &str) -> Result<Value> {
        self.value(name).cloned()
    }

    fn set(&mut self, name: &str, value: Value) -> Result<()> {
        let index = self
            .names
            .index_of(name)
            .ok_or_else(|| Error::undeclared(name, None))?;
        self.values[index] = value;
        Ok(())
    }

    fn get_all(&self) -> Result<ValueMap> {
        Ok(self
            .iter()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect())
    }
}
