//! Model-level CRUD over transfer records.
//!
//! A [`Repository`] resolves models through the registry, entities through the
//! store and runs every write inside the configured transaction boundary.

use std::sync::Arc;

use recmold_core::{
    EntityLifecycle, EntityLookup, ModelRegistry, MoldMap, ProjectorConfig, PropertyAccess,
    PropertySet, Result, TransferRecord, Value, ValueMap,
};

use crate::projector::GraphProjector;
use crate::transaction::{NoTransaction, TransactionBoundary, in_transaction};
use crate::write::key_record;

static NO_TRANSACTION: NoTransaction = NoTransaction;

/// Reads and writes entities of registered models as transfer records.
pub struct Repository<'r, S, T: ?Sized = NoTransaction> {
    store: &'r S,
    registry: &'r dyn ModelRegistry,
    tx: &'r T,
    config: ProjectorConfig,
}

impl<'r, S> Repository<'r, S>
where
    S: EntityLookup + EntityLifecycle,
{
    pub fn new(store: &'r S, registry: &'r dyn ModelRegistry) -> Self {
        Self {
            store,
            registry,
            tx: &NO_TRANSACTION,
            config: ProjectorConfig::default(),
        }
    }
}

impl<'r, S, T> Repository<'r, S, T>
where
    S: EntityLookup + EntityLifecycle,
    T: TransactionBoundary + ?Sized,
{
    /// Run writes inside `tx`.
    pub fn with_transaction<U>(self, tx: &'r U) -> Repository<'r, S, U>
    where
        U: TransactionBoundary + ?Sized,
    {
        Repository {
            store: self.store,
            registry: self.registry,
            tx,
            config: self.config,
        }
    }

    pub fn with_config(mut self, config: ProjectorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &ProjectorConfig {
        &self.config
    }

    /// A projector sharing this repository's store, registry and config.
    pub fn projector(&self) -> GraphProjector<'r, S> {
        GraphProjector::new(self.store, self.registry).with_config(self.config.clone())
    }

    fn molds_for(&self, model: &str, molds: Option<&MoldMap>) -> Result<MoldMap> {
        match molds {
            Some(molds) => Ok(molds.clone()),
            None => self.registry.model(model)?.default_molds(),
        }
    }

    /// Load the entity identified by `key` and project it.
    ///
    /// Without `molds` the model's default mold is used.
    #[tracing::instrument(level = "debug", skip_all, fields(model = %model))]
    pub fn find(
        &self,
        model: &str,
        key: &TransferRecord,
        molds: Option<&MoldMap>,
    ) -> Result<TransferRecord> {
        let molds = self.molds_for(model, molds)?;
        let entity = self.store.find_by_key(model, key)?;
        self.projector().project(&entity, &molds)
    }

    /// Project every entity of `model`.
    #[tracing::instrument(level = "debug", skip_all, fields(model = %model))]
    pub fn list(&self, model: &str, molds: Option<&MoldMap>) -> Result<Vec<TransferRecord>> {
        let molds = self.molds_for(model, molds)?;
        let entities = self.store.find_all(model)?;
        let projector = self.projector();
        let records = projector.project_all(Some(&entities), &molds)?;
        Ok(records.unwrap_or_default())
    }

    /// Create an entity of `model` from `record` and echo it back.
    ///
    /// Key values the record leaves null are left for the store to assign.
    #[tracing::instrument(level = "debug", skip_all, fields(model = %model))]
    pub fn create(&self, model: &str, record: &TransferRecord) -> Result<TransferRecord> {
        let info = self.registry.model(model)?;
        let projector = self.projector();
        in_transaction(self.tx, || {
            let mut factory = |source: &TransferRecord| -> Result<S::Entity> {
                let identity = identity_of(info.keys(), source)?;
                self.store.create(model, &identity)
            };
            projector.create(&mut factory, record)
        })
    }

    /// Write `record` onto the entity its key values identify.
    #[tracing::instrument(level = "debug", skip_all, fields(model = %model))]
    pub fn update(&self, model: &str, record: &TransferRecord) -> Result<TransferRecord> {
        let info = self.registry.model(model)?;
        let key = key_record(info.keys(), record)?;
        let projector = self.projector();
        in_transaction(self.tx, || {
            let mut entity = self.store.find_by_key(model, &key)?;
            projector.update(&mut entity, record)
        })
    }

    /// Remove the entity identified by `key`.
    #[tracing::instrument(level = "debug", skip_all, fields(model = %model))]
    pub fn delete(&self, model: &str, key: &TransferRecord) -> Result<()> {
        let projector = self.projector();
        in_transaction(self.tx, || {
            let entity = self.store.find_by_key(model, key)?;
            projector.delete(&entity)
        })
    }
}

// Key values declared on `source`, null for the rest.
fn identity_of(keys: &Arc<PropertySet>, source: &TransferRecord) -> Result<TransferRecord> {
    let mut values = ValueMap::new();
    for name in keys.iter() {
        let value = if source.property_names().contains(name) {
            source.get(name)?
        } else {
            Value::Null
        };
        values.insert(name.to_string(), value);
    }
    TransferRecord::builder(Arc::clone(keys))
        .keys(Arc::clone(keys))
        .values(values)
        .build()
}

impl<S, T: ?Sized> std::fmt::Debug for Repository<'_, S, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
