//! Collaborator traits for reaching persistent domain entities.
//!
//! The projector never owns entities. It reads and mutates them through an
//! [`EntityAccessor`], resolves them by key through an [`EntityLookup`], and
//! creates or removes them through an [`EntityLifecycle`]. Entity handles are
//! cheap to clone (an id, an `Arc`, a row handle) and identify the same
//! underlying object after cloning.

use crate::Result;
use crate::record::TransferRecord;
use crate::value::{Value, ValueMap};

/// What an entity property holds.
#[derive(Debug, Clone, PartialEq)]
pub enum Attribute<E> {
    /// A scalar column value
    Value(Value),
    /// A to-one relationship
    One(Option<E>),
    /// A to-many relationship
    Many(Option<Vec<E>>),
}

impl<E> Attribute<E> {
    /// The scalar, if this is one.
    pub fn into_value(self) -> Option<Value> {
        match self {
            Attribute::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_relationship(&self) -> bool {
        !matches!(self, Attribute::Value(_))
    }
}

/// Generic access to entity properties.
pub trait EntityAccessor {
    type Entity: Clone;

    /// Logical model name of `entity`.
    fn model_name(&self, entity: &Self::Entity) -> String;

    fn get(&self, entity: &Self::Entity, property: &str) -> Result<Attribute<Self::Entity>>;

    fn set(&self, entity: &mut Self::Entity, property: &str, value: Value) -> Result<()>;

    /// Assign several scalars.
    fn set_all(&self, entity: &mut Self::Entity, values: ValueMap) -> Result<()> {
        for (property, value) in values {
            self.set(entity, &property, value)?;
        }
        Ok(())
    }

    /// The entity a to-one relationship points at.
    fn get_relationship(&self, entity: &Self::Entity, relationship: &str) -> Result<Option<Self::Entity>>;

    fn set_relationship(
        &self,
        entity: &mut Self::Entity,
        relationship: &str,
        related: Option<Self::Entity>,
    ) -> Result<()>;
}

/// Resolution of entities by key.
pub trait EntityLookup: EntityAccessor {
    /// The `model` entity identified by `key`'s key properties.
    ///
    /// A miss is `Error::NotFound`.
    fn find_by_key(&self, model: &str, key: &TransferRecord) -> Result<Self::Entity>;

    /// Every `model` entity, in a stable order.
    fn find_all(&self, model: &str) -> Result<Vec<Self::Entity>>;
}

/// Creation and removal of entities.
pub trait EntityLifecycle: EntityAccessor {
    /// Create a `model` entity identified by `key`.
    fn create(&self, model: &str, key: &TransferRecord) -> Result<Self::Entity>;

    fn remove(&self, entity: &Self::Entity) -> Result<()>;
}

/// Produces a fresh entity for an incoming record.
pub trait EntityFactory<E> {
    fn create_entity(&mut self, record: &TransferRecord) -> Result<E>;
}

impl<E, F> EntityFactory<E> for F
where
    F: FnMut(&TransferRecord) -> Result<E>,
{
    fn create_entity(&mut self, record: &TransferRecord) -> Result<E> {
        self(record)
    }
}
