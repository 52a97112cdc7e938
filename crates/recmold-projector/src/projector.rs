//! Entity graph → transfer record graph.
//!
//! The read path walks an entity and the molds of a [`MoldMap`] in lockstep.
//! A relationship is followed only when the map holds a mold for its dotted
//! path, so the map's path set bounds the traversal even over cyclic meshes.
//! Virtual foreign-key properties are filled from the related entity's key.

use std::sync::Arc;

use recmold_core::mold::path_depth;
use recmold_core::{
    Attribute, EntityAccessor, Error, ModelInfo, ModelRegistry, Mold, MoldMap, ProjectorConfig,
    PropertyAccess, PropertySet, ROOT_PATH, Result, TransferRecord, TypeError, Value, ValueMap,
    child_path,
};

/// Converts entity graphs into transfer-record graphs and back.
pub struct GraphProjector<'a, A> {
    pub(crate) accessor: &'a A,
    pub(crate) registry: &'a dyn ModelRegistry,
    pub(crate) config: ProjectorConfig,
}

impl<'a, A: EntityAccessor> GraphProjector<'a, A> {
    pub fn new(accessor: &'a A, registry: &'a dyn ModelRegistry) -> Self {
        Self {
            accessor,
            registry,
            config: ProjectorConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ProjectorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &ProjectorConfig {
        &self.config
    }

    pub fn accessor(&self) -> &'a A {
        self.accessor
    }

    /// Project `entity` through the root mold of `molds`.
    #[tracing::instrument(level = "debug", skip_all, fields(model = %self.accessor.model_name(entity)))]
    pub fn project(&self, entity: &A::Entity, molds: &MoldMap) -> Result<TransferRecord> {
        self.project_at(entity, molds, ROOT_PATH)?
            .ok_or_else(|| Error::config("mold map has no root mold"))
    }

    /// Project each entity in order. A missing collection stays missing.
    pub fn project_all(
        &self,
        entities: Option<&[A::Entity]>,
        molds: &MoldMap,
    ) -> Result<Option<Vec<TransferRecord>>> {
        let Some(entities) = entities else {
            return Ok(None);
        };
        let records = entities
            .iter()
            .map(|entity| self.project(entity, molds))
            .collect::<Result<Vec<_>>>()?;
        tracing::debug!(count = records.len(), "projected collection");
        Ok(Some(records))
    }

    /// Project `entity` through the mold at `path`; `None` when there is none.
    pub fn project_at(
        &self,
        entity: &A::Entity,
        molds: &MoldMap,
        path: &str,
    ) -> Result<Option<TransferRecord>> {
        let Some(mold) = molds.get(path) else {
            tracing::trace!(path, "no mold, not traversing");
            return Ok(None);
        };
        let depth = path_depth(path);
        if depth > self.config.max_depth {
            return Err(Error::config(format!(
                "path '{}' is deeper than the maximum of {}",
                path, self.config.max_depth
            )));
        }

        let model = self.accessor.model_name(entity);
        let (info, foreign_keys) = self.foreign_keys_of(&model);

        let mut values = ValueMap::new();
        for name in mold.properties().iter() {
            if foreign_keys.contains(name) {
                continue;
            }
            let value = match self.accessor.get(entity, name)? {
                Attribute::Value(value) => Some(value),
                Attribute::One(related) => {
                    self.project_one(related.as_ref(), molds, &child_path(path, name))?
                }
                Attribute::Many(related) => {
                    self.project_many(related.as_deref(), molds, &child_path(path, name))?
                }
            };
            if let Some(value) = value {
                values.insert(name.to_string(), value);
            }
        }

        if let Some(info) = &info {
            self.populate_foreign_keys(entity, info, mold, &mut values)?;
        }

        let version = if self.config.optimistic_concurrency {
            values
                .get(&self.config.version_property)
                .and_then(Value::as_i64)
        } else {
            None
        };

        let mut record = TransferRecord::from_mold(mold)?;
        record.set_all(values)?;
        record.set_version(version);
        tracing::trace!(path, depth, model = %model, "projected record");
        Ok(Some(record))
    }

    // Absent mold and absent entity both leave the slot unset (null).
    fn project_one(
        &self,
        related: Option<&A::Entity>,
        molds: &MoldMap,
        path: &str,
    ) -> Result<Option<Value>> {
        let Some(related) = related else {
            return Ok(None);
        };
        Ok(self
            .project_at(related, molds, path)?
            .map(|record| Value::Record(Box::new(record))))
    }

    fn project_many(
        &self,
        related: Option<&[A::Entity]>,
        molds: &MoldMap,
        path: &str,
    ) -> Result<Option<Value>> {
        let Some(related) = related else {
            return Ok(None);
        };
        if !molds.contains(path) {
            tracing::trace!(path, "no mold, not traversing");
            return Ok(None);
        }
        let mut items = Vec::with_capacity(related.len());
        for entity in related {
            if let Some(record) = self.project_at(entity, molds, path)? {
                items.push(Value::Record(Box::new(record)));
            }
        }
        Ok(Some(Value::Array(items)))
    }

    fn populate_foreign_keys(
        &self,
        entity: &A::Entity,
        info: &ModelInfo,
        mold: &Arc<Mold>,
        values: &mut ValueMap,
    ) -> Result<()> {
        let declared = mold.properties();
        for rel in info.relationships() {
            if !rel.foreign_keys().iter().any(|fk| declared.contains(fk)) {
                continue;
            }
            let related = self.accessor.get_relationship(entity, rel.relationship())?;
            for (fk, target_key) in rel.pairs() {
                if !declared.contains(fk) {
                    continue;
                }
                let value = match &related {
                    Some(related) => self.scalar(related, target_key)?,
                    None => Value::Null,
                };
                values.insert(fk.to_string(), value);
            }
        }
        Ok(())
    }

    /// Read a property that must hold a scalar.
    pub(crate) fn scalar(&self, entity: &A::Entity, name: &str) -> Result<Value> {
        match self.accessor.get(entity, name)? {
            Attribute::Value(value) => Ok(value),
            Attribute::One(_) | Attribute::Many(_) => Err(Error::Type(TypeError {
                expected: "scalar",
                actual: "relationship".to_string(),
                property: Some(name.to_string()),
            })),
        }
    }

    /// Foreign-key properties of `model`, empty when it is not registered.
    pub(crate) fn foreign_keys_of(&self, model: &str) -> (Option<Arc<ModelInfo>>, PropertySet) {
        let info = self.registry.get(model);
        let foreign_keys = info
            .as_deref()
            .map(ModelInfo::foreign_key_names)
            .unwrap_or_default();
        (info, foreign_keys)
    }
}

impl<A> std::fmt::Debug for GraphProjector<'_, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphProjector")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryEntity, MemoryStore, ModelSchema};
    use recmold_core::{Error, RelationshipInfo, StaticRegistry};

    fn store() -> MemoryStore {
        MemoryStore::new()
            .with_model(
                "Team",
                ModelSchema::new(["id"], ["name", "version"])
                    .one("captain")
                    .many("heroes"),
            )
            .with_model("Hero", ModelSchema::new(["id"], ["name"]).one("team"))
    }

    fn registry() -> StaticRegistry {
        StaticRegistry::new().with_model(
            ModelInfo::new("Hero", ["id"])
                .relationship(RelationshipInfo::new("team", "Team", ["teamId"], ["id"]).unwrap()),
        )
    }

    fn hero(store: &MemoryStore, id: i64, name: &str) -> MemoryEntity {
        store
            .insert("Hero", [("id", Value::BigInt(id)), ("name", Value::from(name))])
            .unwrap()
    }

    fn team(store: &MemoryStore) -> MemoryEntity {
        store
            .insert(
                "Team",
                [("id", Value::BigInt(10)), ("name", Value::from("Preventers"))],
            )
            .unwrap()
    }

    #[test]
    fn nested_projection_stops_where_molds_end() {
        let store = store();
        let registry = registry();
        let team = team(&store);
        let mut captain = hero(&store, 1, "Deadpond");
        store.set_relationship(&mut captain, "team", Some(team.clone())).unwrap();
        let mut t = team.clone();
        store.set_relationship(&mut t, "captain", Some(captain.clone())).unwrap();

        let molds = MoldMap::new()
            .with(ROOT_PATH, Mold::of(["id", "name", "team"], ["id"]).unwrap())
            .with("team", Mold::of(["id", "name", "captain"], ["id"]).unwrap());
        let record = GraphProjector::new(&store, &registry)
            .project(&captain, &molds)
            .unwrap();

        let nested = record.get("team").unwrap();
        let nested = nested.as_record().unwrap();
        assert_eq!(nested.get("name").unwrap(), Value::from("Preventers"));
        assert_eq!(nested.get("captain").unwrap(), Value::Null);
    }

    #[test]
    fn collections_keep_entity_order() {
        let store = store();
        let registry = registry();
        let team = team(&store);
        let members = vec![hero(&store, 3, "C"), hero(&store, 1, "A"), hero(&store, 2, "B")];
        store.set_many(&team, "heroes", Some(members)).unwrap();

        let molds = MoldMap::new()
            .with(ROOT_PATH, Mold::of(["id", "heroes"], ["id"]).unwrap())
            .with("heroes", Mold::of(["id", "name"], ["id"]).unwrap());
        let record = GraphProjector::new(&store, &registry)
            .project(&team, &molds)
            .unwrap();

        let heroes = record.get("heroes").unwrap();
        let names: Vec<Value> = heroes
            .as_array()
            .unwrap()
            .iter()
            .map(|item| item.as_record().unwrap().get("name").unwrap())
            .collect();
        assert_eq!(names, [Value::from("C"), Value::from("A"), Value::from("B")]);
    }

    #[test]
    fn missing_relationships_project_as_null() {
        let store = store();
        let registry = registry();
        let team = team(&store);
        store.set_many(&team, "heroes", None).unwrap();

        let molds = MoldMap::new()
            .with(ROOT_PATH, Mold::of(["id", "heroes", "captain"], ["id"]).unwrap())
            .with("heroes", Mold::of(["id"], ["id"]).unwrap())
            .with("captain", Mold::of(["id"], ["id"]).unwrap());
        let record = GraphProjector::new(&store, &registry)
            .project(&team, &molds)
            .unwrap();
        assert_eq!(record.get("heroes").unwrap(), Value::Null);
        assert_eq!(record.get("captain").unwrap(), Value::Null);
    }

    #[test]
    fn foreign_keys_come_from_related_entity() {
        let store = store();
        let registry = registry();
        let team = team(&store);
        let mut linked = hero(&store, 1, "Linked");
        store.set_relationship(&mut linked, "team", Some(team)).unwrap();
        let loose = hero(&store, 2, "Loose");

        let molds = MoldMap::single(Mold::of(["id", "teamId"], ["id"]).unwrap());
        let projector = GraphProjector::new(&store, &registry);
        let records = projector
            .project_all(Some(&[linked, loose][..]), &molds)
            .unwrap()
            .unwrap();
        assert_eq!(records[0].get("teamId").unwrap(), Value::BigInt(10));
        assert_eq!(records[1].get("teamId").unwrap(), Value::Null);
        assert!(projector.project_all(None, &molds).unwrap().is_none());
    }

    #[test]
    fn depth_limit_and_missing_root() {
        let store = store();
        let registry = registry();
        let team = team(&store);
        let mut captain = hero(&store, 1, "Deadpond");
        store.set_relationship(&mut captain, "team", Some(team.clone())).unwrap();
        let mut t = team.clone();
        store.set_relationship(&mut t, "captain", Some(captain.clone())).unwrap();

        let molds = MoldMap::new()
            .with(ROOT_PATH, Mold::of(["id", "captain"], ["id"]).unwrap())
            .with("captain", Mold::of(["id", "team"], ["id"]).unwrap())
            .with("captain.team", Mold::of(["id"], ["id"]).unwrap());
        let shallow = GraphProjector::new(&store, &registry)
            .with_config(ProjectorConfig::new().max_depth(1));
        let err = shallow.project(&team, &molds).unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let empty = MoldMap::new().with("captain", Mold::of(["id"], ["id"]).unwrap());
        let err = shallow.project(&team, &empty).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn version_is_read_when_optimistic() {
        let store = store();
        let registry = registry();
        let team = store
            .insert("Team", [("id", Value::BigInt(1)), ("version", Value::BigInt(7))])
            .unwrap();
        let molds = MoldMap::single(Mold::of(["id", "version"], ["id"]).unwrap());

        let plain = GraphProjector::new(&store, &registry).project(&team, &molds).unwrap();
        assert_eq!(plain.version(), None);

        let versioned = GraphProjector::new(&store, &registry)
            .with_config(ProjectorConfig::new().optimistic_concurrency(true))
            .project(&team, &molds)
            .unwrap();
        assert_eq!(versioned.version(), Some(7));
    }
}
