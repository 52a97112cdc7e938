//! In-memory entity store.
//!
//! Implements every collaborator trait over `Arc`-shared entities, with
//! snapshot-based transactions. Used by tests and by hosts that want to
//! exercise molds without a database.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use recmold_core::{
    Attribute, EntityAccessor, EntityLifecycle, EntityLookup, Error, PropertyAccess, PropertySet,
    Result, TransactionError, TransactionErrorKind, TransferRecord, Value, ValueMap, check_key,
    key_values,
};

use crate::transaction::TransactionBoundary;

/// Shape of one model in the store.
#[derive(Debug, Clone)]
pub struct ModelSchema {
    keys: PropertySet,
    scalars: PropertySet,
    one: PropertySet,
    many: PropertySet,
}

impl ModelSchema {
    /// A model identified by `keys`, with scalar properties `scalars` (keys included).
    pub fn new<K, KS, S, SS>(keys: K, scalars: S) -> Self
    where
        K: IntoIterator<Item = KS>,
        KS: Into<String>,
        S: IntoIterator<Item = SS>,
        SS: Into<String>,
    {
        let keys = PropertySet::new(keys);
        Self {
            scalars: keys.union(&PropertySet::new(scalars)),
            keys,
            one: PropertySet::empty(),
            many: PropertySet::empty(),
        }
    }

    /// Declare a to-one relationship.
    pub fn one(mut self, name: &str) -> Self {
        self.one = self.one.union(&PropertySet::new([name]));
        self
    }

    /// Declare a to-many relationship.
    pub fn many(mut self, name: &str) -> Self {
        self.many = self.many.union(&PropertySet::new([name]));
        self
    }
}

#[derive(Debug, Clone)]
struct EntityData {
    model: String,
    values: ValueMap,
    one: BTreeMap<String, Option<MemoryEntity>>,
    many: BTreeMap<String, Option<Vec<MemoryEntity>>>,
}

/// Handle to an entity in a [`MemoryStore`]. Clones share the entity.
#[derive(Clone)]
pub struct MemoryEntity(Arc<RwLock<EntityData>>);

impl MemoryEntity {
    fn read(&self) -> RwLockReadGuard<'_, EntityData> {
        self.0.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, EntityData> {
        self.0.write().unwrap_or_else(|e| e.into_inner())
    }

    pub fn model(&self) -> String {
        self.read().model.clone()
    }

    /// Current scalar value of `name`, null when unset.
    pub fn value(&self, name: &str) -> Value {
        self.read().values.get(name).cloned().unwrap_or_default()
    }

    pub fn ptr_eq(&self, other: &MemoryEntity) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for MemoryEntity {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

// Relationships are left out: entity meshes may be cyclic.
impl fmt::Debug for MemoryEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.read();
        f.debug_struct("MemoryEntity")
            .field("model", &data.model)
            .field("values", &data.values)
            .finish_non_exhaustive()
    }
}

struct Snapshot {
    entities: Vec<MemoryEntity>,
    data: Vec<(MemoryEntity, EntityData)>,
}

/// Entities of several models, held in memory.
#[derive(Default)]
pub struct MemoryStore {
    schemas: HashMap<String, ModelSchema>,
    entities: RwLock<Vec<MemoryEntity>>,
    next_id: AtomicI64,
    snapshot: Mutex<Option<Snapshot>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a model.
    pub fn with_model(mut self, name: impl Into<String>, schema: ModelSchema) -> Self {
        self.schemas.insert(name.into(), schema);
        self
    }

    fn schema(&self, model: &str) -> Result<&ModelSchema> {
        self.schemas
            .get(model)
            .ok_or_else(|| Error::config(format!("unknown model '{}'", model)))
    }

    fn all(&self) -> RwLockReadGuard<'_, Vec<MemoryEntity>> {
        self.entities.read().unwrap_or_else(|e| e.into_inner())
    }

    fn all_mut(&self) -> RwLockWriteGuard<'_, Vec<MemoryEntity>> {
        self.entities.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Add an entity with the given scalar values.
    pub fn insert<I, S>(&self, model: &str, values: I) -> Result<MemoryEntity>
    where
        I: IntoIterator<Item = (S, Value)>,
        S: Into<String>,
    {
        let schema = self.schema(model)?;
        let values: ValueMap = values.into_iter().map(|(k, v)| (k.into(), v)).collect();
        if let Some(name) = values.keys().find(|k| !schema.scalars.contains(k)) {
            return Err(Error::undeclared(name.clone(), Some(model)));
        }
        let entity = MemoryEntity(Arc::new(RwLock::new(EntityData {
            model: model.to_string(),
            values,
            one: BTreeMap::new(),
            many: BTreeMap::new(),
        })));
        self.all_mut().push(entity.clone());
        Ok(entity)
    }

    /// Replace the members of a to-many relationship.
    pub fn set_many(
        &self,
        entity: &MemoryEntity,
        relationship: &str,
        related: Option<Vec<MemoryEntity>>,
    ) -> Result<()> {
        let mut data = entity.write();
        if !self.schema(&data.model)?.many.contains(relationship) {
            return Err(Error::undeclared(relationship, Some(&data.model)));
        }
        data.many.insert(relationship.to_string(), related);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.all().len()
    }

    pub fn is_empty(&self) -> bool {
        self.all().is_empty()
    }

    fn key_of(&self, entity: &MemoryEntity) -> Vec<Value> {
        let data = entity.read();
        self.schemas
            .get(&data.model)
            .map(|schema| {
                schema
                    .keys
                    .iter()
                    .map(|k| data.values.get(k).cloned().unwrap_or_default())
                    .collect()
            })
            .unwrap_or_default()
    }
}

// Integers compare by value whatever their width.
fn same_value(a: &Value, b: &Value) -> bool {
    match (a.as_i64(), b.as_i64()) {
        (Some(x), Some(y)) if !matches!(a, Value::Bool(_)) && !matches!(b, Value::Bool(_)) => x == y,
        _ => a == b,
    }
}

impl EntityAccessor for MemoryStore {
    type Entity = MemoryEntity;

    fn model_name(&self, entity: &MemoryEntity) -> String {
        entity.model()
    }

    fn get(&self, entity: &MemoryEntity, property: &str) -> Result<Attribute<MemoryEntity>> {
        let data = entity.read();
        let schema = self.schema(&data.model)?;
        if schema.scalars.contains(property) {
            Ok(Attribute::Value(
                data.values.get(property).cloned().unwrap_or_default(),
            ))
        } else if schema.one.contains(property) {
            Ok(Attribute::One(data.one.get(property).cloned().flatten()))
        } else if schema.many.contains(property) {
            Ok(Attribute::Many(data.many.get(property).cloned().flatten()))
        } else {
            Err(Error::undeclared(property, Some(&data.model)))
        }
    }

    fn set(&self, entity: &mut MemoryEntity, property: &str, value: Value) -> Result<()> {
        let mut data = entity.write();
        if !self.schema(&data.model)?.scalars.contains(property) {
            return Err(Error::undeclared(property, Some(&data.model)));
        }
        data.values.insert(property.to_string(), value);
        Ok(())
    }

    fn get_relationship(
        &self,
        entity: &MemoryEntity,
        relationship: &str,
    ) -> Result<Option<MemoryEntity>> {
        let data = entity.read();
        if !self.schema(&data.model)?.one.contains(relationship) {
            return Err(Error::undeclared(relationship, Some(&data.model)));
        }
        Ok(data.one.get(relationship).cloned().flatten())
    }

    fn set_relationship(
        &self,
        entity: &mut MemoryEntity,
        relationship: &str,
        related: Option<MemoryEntity>,
    ) -> Result<()> {
        let mut data = entity.write();
        if !self.schema(&data.model)?.one.contains(relationship) {
            return Err(Error::undeclared(relationship, Some(&data.model)));
        }
        data.one.insert(relationship.to_string(), related);
        Ok(())
    }
}

impl EntityLookup for MemoryStore {
    fn find_by_key(&self, model: &str, key: &TransferRecord) -> Result<MemoryEntity> {
        self.schema(model)?;
        let values = key_values(key)?;
        let names = key.key_property_names();
        self.all()
            .iter()
            .find(|entity| {
                let data = entity.read();
                data.model == model
                    && names.iter().zip(&values).all(|(name, wanted)| {
                        data.values
                            .get(name)
                            .is_some_and(|have| same_value(have, wanted))
                    })
            })
            .cloned()
            .ok_or_else(|| Error::not_found(model, values))
    }

    fn find_all(&self, model: &str) -> Result<Vec<MemoryEntity>> {
        self.schema(model)?;
        Ok(self
            .all()
            .iter()
            .filter(|entity| entity.read().model == model)
            .cloned()
            .collect())
    }
}

impl EntityLifecycle for MemoryStore {
    /// Single-column keys left null are assigned the next integer id.
    fn create(&self, model: &str, key: &TransferRecord) -> Result<MemoryEntity> {
        let schema = self.schema(model)?;
        let mut values = Vec::with_capacity(schema.keys.len());
        for name in schema.keys.iter() {
            let value = if key.property_names().contains(name) {
                key.get(name)?
            } else {
                Value::Null
            };
            values.push(value);
        }
        if let [only] = values.as_mut_slice() {
            if only.is_null() {
                *only = Value::BigInt(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
            }
        }
        check_key(&schema.keys, &values)?;

        let duplicate = self.all().iter().any(|entity| {
            entity.read().model == model
                && self
                    .key_of(entity)
                    .iter()
                    .zip(&values)
                    .all(|(a, b)| same_value(a, b))
        });
        if duplicate {
            return Err(Error::Custom(format!(
                "{} with key {:?} already exists",
                model, values
            )));
        }

        let pairs: Vec<(String, Value)> = schema
            .keys
            .iter()
            .map(str::to_string)
            .zip(values)
            .collect();
        let entity = self.insert(model, pairs)?;
        tracing::trace!(model, "created entity");
        Ok(entity)
    }

    fn remove(&self, entity: &MemoryEntity) -> Result<()> {
        let mut all = self.all_mut();
        match all.iter().position(|e| e.ptr_eq(entity)) {
            Some(index) => {
                all.remove(index);
                Ok(())
            }
            None => {
                drop(all);
                Err(Error::not_found(entity.model(), self.key_of(entity)))
            }
        }
    }
}

fn transaction_error(kind: TransactionErrorKind, message: &str) -> Error {
    Error::Transaction(TransactionError {
        kind,
        message: message.to_string(),
        source: None,
    })
}

/// One transaction at a time; rollback restores every entity and the entity list.
impl TransactionBoundary for MemoryStore {
    fn begin(&self) -> Result<()> {
        let mut snapshot = self.snapshot.lock().unwrap_or_else(|e| e.into_inner());
        if snapshot.is_some() {
            return Err(transaction_error(
                TransactionErrorKind::Begin,
                "a transaction is already active",
            ));
        }
        let entities = self.all().clone();
        let data = entities
            .iter()
            .map(|entity| (entity.clone(), entity.read().clone()))
            .collect();
        *snapshot = Some(Snapshot { entities, data });
        Ok(())
    }

    fn commit(&self) -> Result<()> {
        let mut snapshot = self.snapshot.lock().unwrap_or_else(|e| e.into_inner());
        snapshot
            .take()
            .map(|_| ())
            .ok_or_else(|| transaction_error(TransactionErrorKind::Commit, "no active transaction"))
    }

    fn rollback(&self) -> Result<()> {
        let mut snapshot = self.snapshot.lock().unwrap_or_else(|e| e.into_inner());
        let Some(saved) = snapshot.take() else {
            return Err(transaction_error(
                TransactionErrorKind::Rollback,
                "no active transaction",
            ));
        };
        *self.all_mut() = saved.entities;
        for (entity, data) in saved.data {
            *entity.write() = data;
        }
        tracing::debug!("memory store rolled back");
        Ok(())
    }
}

impl fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryStore")
            .field("models", &self.schemas.keys().collect::<Vec<_>>())
            .field("entities", &self.len())
            .finish_non_exhaustive()
    }
}
