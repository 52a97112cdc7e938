//! Transfer record → entity.
//!
//! Scalars are bulk-assigned onto the entity. Relationships change only
//! through their virtual foreign keys, which are looked up again; nested
//! record values are never written. On alter the version check runs before
//! anything is touched and the version bump runs after everything else.

use std::sync::Arc;

use recmold_core::{
    EntityFactory, EntityLifecycle, EntityLookup, Error, Mold, MoldMap, PropertyAccess,
    PropertySet, RelationshipError, RelationshipInfo, Result, TransferRecord, Value, ValueMap,
};

use crate::projector::GraphProjector;
use crate::version::VersionGuard;

/// Which write-path rules apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// New entity: keys are written when present
    Create,
    /// Existing entity: keys are left alone and versions are checked
    Alter,
}

/// A key-only record for `keys`, with values taken from `source`.
pub fn key_record(keys: &Arc<PropertySet>, source: &TransferRecord) -> Result<TransferRecord> {
    let values = keys
        .iter()
        .map(|name| Ok((name.to_string(), source.get(name)?)))
        .collect::<Result<ValueMap>>()?;
    TransferRecord::builder(Arc::clone(keys))
        .keys(Arc::clone(keys))
        .values(values)
        .build()
}

impl<A: EntityLookup> GraphProjector<'_, A> {
    /// Write `record` onto `entity` and return the record echoed to the caller.
    #[tracing::instrument(level = "debug", skip_all, fields(mode = ?mode))]
    pub fn apply(
        &self,
        entity: &mut A::Entity,
        record: &TransferRecord,
        mode: WriteMode,
    ) -> Result<TransferRecord> {
        let model = self.accessor.model_name(entity);
        let (info, foreign_keys) = self.foreign_keys_of(&model);
        let versioned = mode == WriteMode::Alter && self.config.optimistic_concurrency;
        let guard = VersionGuard::new(&self.config.version_property);

        let next_version = if versioned {
            guard.verify(self.accessor, entity, &model, record)?
        } else {
            None
        };

        let mut excluded = foreign_keys;
        if mode == WriteMode::Alter {
            excluded = excluded.union(record.key_property_names());
        }
        if versioned {
            excluded = excluded.union(&PropertySet::new([guard.property()]));
        }

        let mut scalars = ValueMap::new();
        for name in record.property_names().iter() {
            if excluded.contains(name) {
                continue;
            }
            let value = record.get(name)?;
            if value.is_graph() {
                continue;
            }
            // Unprojected relationships read back as null, empty collections as [].
            if matches!(value, Value::Null | Value::Array(_))
                && self.accessor.get(entity, name)?.is_relationship()
            {
                continue;
            }
            // Null keys on create are left to the entity's own identity assignment.
            if mode == WriteMode::Create
                && value.is_null()
                && record.key_property_names().contains(name)
            {
                continue;
            }
            scalars.insert(name.to_string(), value);
        }
        tracing::trace!(model = %model, count = scalars.len(), "writing scalars");
        self.accessor.set_all(entity, scalars)?;

        if let Some(info) = &info {
            for rel in info.relationships() {
                self.resolve_relationship(entity, rel, record)?;
            }
        }

        let mut echo = record.snapshot()?;
        if let Some(next) = next_version {
            self.accessor
                .set(entity, guard.property(), Value::BigInt(next))?;
            echo.set_version(Some(next));
            if echo.property_names().contains(guard.property()) {
                echo.set(guard.property(), Value::BigInt(next))?;
            }
            tracing::debug!(model = %model, version = next, "version bumped");
        }
        Ok(echo)
    }

    /// Re-attach the related entity named by `rel`'s foreign keys.
    ///
    /// Skipped when any foreign key is undeclared or null on `record`.
    fn resolve_relationship(
        &self,
        entity: &mut A::Entity,
        rel: &RelationshipInfo,
        record: &TransferRecord,
    ) -> Result<()> {
        let mut key = ValueMap::new();
        for (fk, target_key) in rel.pairs() {
            if !record.property_names().contains(fk) {
                return Ok(());
            }
            let value = record.get(fk)?;
            if value.is_null() {
                tracing::trace!(relationship = rel.relationship(), "foreign key absent, skipping");
                return Ok(());
            }
            key.insert(target_key.to_string(), value);
        }

        let lookup = TransferRecord::from_values(key, rel.target_keys().iter().cloned())?;
        let related = self
            .accessor
            .find_by_key(rel.target_model(), &lookup)
            .map_err(|cause| {
                Error::Relationship(RelationshipError {
                    relationship: rel.relationship().to_string(),
                    target_model: rel.target_model().to_string(),
                    source: Some(Box::new(cause)),
                })
            })?;
        self.accessor
            .set_relationship(entity, rel.relationship(), Some(related))
    }

    /// Create an entity through `factory`, write `record` onto it and echo it
    /// back re-projected through the record's own shape.
    pub fn create<F>(&self, factory: &mut F, record: &TransferRecord) -> Result<TransferRecord>
    where
        F: EntityFactory<A::Entity>,
    {
        self.create_entity(factory, record).map(|(_, echo)| echo)
    }

    /// Like [`create`](Self::create), also returning the new entity.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn create_entity<F>(
        &self,
        factory: &mut F,
        record: &TransferRecord,
    ) -> Result<(A::Entity, TransferRecord)>
    where
        F: EntityFactory<A::Entity>,
    {
        let mut entity = factory.create_entity(record)?;
        self.apply(&mut entity, record, WriteMode::Create)?;
        let echo = self.reproject(&entity, record)?;
        Ok((entity, echo))
    }

    /// Write `record` onto an existing entity.
    pub fn update(&self, entity: &mut A::Entity, record: &TransferRecord) -> Result<TransferRecord> {
        self.apply(entity, record, WriteMode::Alter)
    }

    fn reproject(&self, entity: &A::Entity, record: &TransferRecord) -> Result<TransferRecord> {
        let mut mold = Mold::new(record.shared_names(), record.shared_keys())?;
        if let Some(access) = record.access_interface() {
            mold = mold.with_access(Arc::clone(access));
        }
        self.project(entity, &MoldMap::single(mold))
    }
}

impl<A: EntityLifecycle> GraphProjector<'_, A> {
    /// Remove `entity` through the lifecycle collaborator.
    #[tracing::instrument(level = "debug", skip_all, fields(model = %self.accessor.model_name(entity)))]
    pub fn delete(&self, entity: &A::Entity) -> Result<()> {
        self.accessor.remove(entity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryEntity, MemoryStore, ModelSchema};
    use recmold_core::{ModelInfo, ProjectorConfig, StaticRegistry};

    fn store() -> MemoryStore {
        MemoryStore::new()
            .with_model("Team", ModelSchema::new(["id"], ["name", "version"]))
            .with_model("Hero", ModelSchema::new(["id"], ["name", "age", "version"]).one("team"))
    }

    fn registry() -> StaticRegistry {
        StaticRegistry::new().with_model(
            ModelInfo::new("Hero", ["id"])
                .relationship(RelationshipInfo::new("team", "Team", ["teamId"], ["id"]).unwrap()),
        )
    }

    fn hero_record(values: &[(&str, Value)]) -> TransferRecord {
        let mut record =
            TransferRecord::with_properties(["id", "name", "age", "teamId"], ["id"]).unwrap();
        for (name, value) in values {
            record.set(name, value.clone()).unwrap();
        }
        record
    }

    fn hero(store: &MemoryStore) -> MemoryEntity {
        store
            .insert("Hero", [("id", Value::BigInt(1)), ("name", Value::from("Old"))])
            .unwrap()
    }

    #[test]
    fn alter_writes_scalars_but_not_keys() {
        let store = store();
        let registry = registry();
        let projector = GraphProjector::new(&store, &registry);
        let mut entity = hero(&store);

        let record = hero_record(&[
            ("id", Value::BigInt(99)),
            ("name", Value::from("New")),
            ("age", Value::Int(30)),
        ]);
        projector.update(&mut entity, &record).unwrap();
        assert_eq!(entity.value("name"), Value::from("New"));
        assert_eq!(entity.value("age"), Value::Int(30));
        assert_eq!(entity.value("id"), Value::BigInt(1));
    }

    #[test]
    fn foreign_keys_resolve_relationships() {
        let store = store();
        let registry = registry();
        let projector = GraphProjector::new(&store, &registry);
        let team = store.insert("Team", [("id", Value::BigInt(5))]).unwrap();
        let mut entity = hero(&store);

        let record = hero_record(&[("teamId", Value::BigInt(5))]);
        projector.update(&mut entity, &record).unwrap();
        assert_eq!(
            recmold_core::EntityAccessor::get_relationship(&store, &entity, "team").unwrap(),
            Some(team)
        );
    }

    #[test]
    fn absent_foreign_key_leaves_relationship_alone() {
        let store = store();
        let registry = registry();
        let projector = GraphProjector::new(&store, &registry);
        let team = store.insert("Team", [("id", Value::BigInt(5))]).unwrap();
        let mut entity = hero(&store);
        recmold_core::EntityAccessor::set_relationship(&store, &mut entity, "team", Some(team.clone()))
            .unwrap();

        projector.update(&mut entity, &hero_record(&[])).unwrap();
        assert_eq!(
            recmold_core::EntityAccessor::get_relationship(&store, &entity, "team").unwrap(),
            Some(team)
        );
    }

    #[test]
    fn unresolvable_foreign_key_is_a_relationship_error() {
        let store = store();
        let registry = registry();
        let projector = GraphProjector::new(&store, &registry);
        let mut entity = hero(&store);

        let err = projector
            .update(&mut entity, &hero_record(&[("teamId", Value::BigInt(404))]))
            .unwrap_err();
        assert!(err.is_relationship_error());
        let source = std::error::Error::source(&err).unwrap().to_string();
        assert!(source.contains("no Team with key"));
    }

    #[test]
    fn nested_records_are_not_written() {
        let store = store();
        let registry = registry();
        let projector = GraphProjector::new(&store, &registry);
        let mut entity = hero(&store);

        let nested = TransferRecord::with_properties(["id"], ["id"]).unwrap();
        let mut record =
            TransferRecord::with_properties(["id", "name", "team"], ["id"]).unwrap();
        record.set("name", Value::from("Solo")).unwrap();
        record.set("team", Value::from(nested)).unwrap();
        projector.update(&mut entity, &record).unwrap();
        assert_eq!(entity.value("name"), Value::from("Solo"));

        let team = store.insert("Team", [("id", Value::BigInt(5))]).unwrap();
        recmold_core::EntityAccessor::set_relationship(&store, &mut entity, "team", Some(team.clone()))
            .unwrap();
        record.set("team", Value::Null).unwrap();
        projector.update(&mut entity, &record).unwrap();
        assert_eq!(entity.value("name"), Value::from("Solo"));
        assert_eq!(
            recmold_core::EntityAccessor::get_relationship(&store, &entity, "team").unwrap(),
            Some(team)
        );
    }

    #[test]
    fn empty_collection_round_trips() {
        let store = MemoryStore::new()
            .with_model("Team", ModelSchema::new(["id"], ["name"]).many("heroes"))
            .with_model("Hero", ModelSchema::new(["id"], ["name"]));
        let registry = StaticRegistry::new();
        let projector = GraphProjector::new(&store, &registry);
        let mut team = store
            .insert("Team", [("id", Value::BigInt(1)), ("name", Value::from("Solo"))])
            .unwrap();
        store.set_many(&team, "heroes", Some(Vec::new())).unwrap();

        let molds = MoldMap::new()
            .with(recmold_core::ROOT_PATH, Mold::of(["id", "name", "heroes"], ["id"]).unwrap())
            .with("heroes", Mold::of(["id", "name"], ["id"]).unwrap());
        let mut record = projector.project(&team, &molds).unwrap();
        assert_eq!(record.get("heroes").unwrap(), Value::Array(Vec::new()));

        record.set("name", Value::from("Duo")).unwrap();
        projector.update(&mut team, &record).unwrap();
        assert_eq!(team.value("name"), Value::from("Duo"));
        assert_eq!(
            recmold_core::EntityAccessor::get(&store, &team, "heroes").unwrap(),
            recmold_core::Attribute::Many(Some(Vec::new()))
        );
    }

    #[test]
    fn version_checked_and_bumped() {
        let store = store();
        let registry = registry();
        let projector = GraphProjector::new(&store, &registry)
            .with_config(ProjectorConfig::new().optimistic_concurrency(true));
        let mut entity = store
            .insert("Team", [("id", Value::BigInt(1)), ("version", Value::BigInt(5))])
            .unwrap();

        let mut record = TransferRecord::with_properties(["id", "name"], ["id"]).unwrap();
        record.set("name", Value::from("Avengers")).unwrap();
        record.set_version(Some(5));
        let echo = projector.update(&mut entity, &record).unwrap();
        assert_eq!(echo.version(), Some(6));
        assert_eq!(record.version(), Some(5));
        assert_eq!(entity.value("version"), Value::BigInt(6));

        record.set_version(Some(4));
        record.set("name", Value::from("Stale")).unwrap();
        let err = projector.update(&mut entity, &record).unwrap_err();
        assert!(err.is_stale_version());
        assert_eq!(entity.value("version"), Value::BigInt(6));
        assert_eq!(entity.value("name"), Value::from("Avengers"));
    }

    #[test]
    fn declared_version_property_is_echoed() {
        let store = store();
        let registry = registry();
        let projector = GraphProjector::new(&store, &registry)
            .with_config(ProjectorConfig::new().optimistic_concurrency(true));
        let mut entity = store
            .insert("Team", [("id", Value::BigInt(1)), ("version", Value::BigInt(2))])
            .unwrap();

        let mut record = TransferRecord::with_properties(["id", "version"], ["id"]).unwrap();
        record.set("version", Value::BigInt(2)).unwrap();
        let echo = projector.update(&mut entity, &record).unwrap();
        assert_eq!(echo.get("version").unwrap(), Value::BigInt(3));
        assert_eq!(entity.value("version"), Value::BigInt(3));
    }

    #[test]
    fn create_echoes_generated_values() {
        let store = store();
        let registry = registry();
        let projector = GraphProjector::new(&store, &registry);
        let team = store.insert("Team", [("id", Value::BigInt(5))]).unwrap();

        let record = hero_record(&[("name", Value::from("Fresh")), ("teamId", Value::BigInt(5))]);
        let mut factory = |r: &TransferRecord| -> Result<MemoryEntity> {
            let key = key_record(&r.shared_keys(), r)?;
            recmold_core::EntityLifecycle::create(&store, "Hero", &key)
        };
        let (entity, echo) = projector.create_entity(&mut factory, &record).unwrap();
        assert_eq!(echo.get("id").unwrap(), Value::BigInt(1));
        assert_eq!(echo.get("name").unwrap(), Value::from("Fresh"));
        assert_eq!(echo.get("teamId").unwrap(), Value::BigInt(5));
        assert_eq!(
            recmold_core::EntityAccessor::get_relationship(&store, &entity, "team").unwrap(),
            Some(team)
        );
    }

    #[test]
    fn delete_removes_entity() {
        let store = store();
        let registry = registry();
        let projector = GraphProjector::new(&store, &registry);
        let entity = hero(&store);
        projector.delete(&entity).unwrap();
        assert!(store.is_empty());
    }
}
