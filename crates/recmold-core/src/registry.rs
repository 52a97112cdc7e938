//! Model registry: per-model keys, relationships and default molds.
//!
//! Definitions are loaded once (typically from a JSON document at startup)
//! and then only read.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Deserialize;

use crate::Result;
use crate::error::Error;
use crate::interface::AccessInterface;
use crate::mold::{Mold, MoldMap};
use crate::property::PropertySet;
use crate::relationship::RelationshipInfo;

/// Everything the projector needs to know about one model.
#[derive(Debug, Clone)]
pub struct ModelInfo {
    name: String,
    keys: Arc<PropertySet>,
    relationships: Vec<RelationshipInfo>,
    default_mold: Option<Arc<Mold>>,
}

impl ModelInfo {
    pub fn new<K, KS>(name: impl Into<String>, keys: K) -> Self
    where
        K: IntoIterator<Item = KS>,
        KS: Into<String>,
    {
        Self {
            name: name.into(),
            keys: Arc::new(PropertySet::new(keys)),
            relationships: Vec::new(),
            default_mold: None,
        }
    }

    pub fn relationship(mut self, info: RelationshipInfo) -> Self {
        self.relationships.push(info);
        self
    }

    pub fn default_mold(mut self, mold: impl Into<Arc<Mold>>) -> Self {
        self.default_mold = Some(mold.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn keys(&self) -> &Arc<PropertySet> {
        &self.keys
    }

    pub fn relationships(&self) -> &[RelationshipInfo] {
        &self.relationships
    }

    /// The mapping for relationship property `name`.
    pub fn find_relationship(&self, name: &str) -> Option<&RelationshipInfo> {
        self.relationships.iter().find(|r| r.relationship() == name)
    }

    /// Every virtual foreign-key property declared by this model.
    pub fn foreign_key_names(&self) -> PropertySet {
        PropertySet::new(
            self.relationships
                .iter()
                .flat_map(|r| r.foreign_keys().iter().cloned()),
        )
    }

    pub fn get_default_mold(&self) -> Option<&Arc<Mold>> {
        self.default_mold.as_ref()
    }

    /// A mold map with the default mold at the root.
    pub fn default_molds(&self) -> Result<MoldMap> {
        self.default_mold
            .as_ref()
            .map(|mold| MoldMap::single(Arc::clone(mold)))
            .ok_or_else(|| Error::config(format!("model '{}' has no default mold", self.name)))
    }
}

/// Resolves model names to their metadata.
pub trait ModelRegistry: Send + Sync {
    fn get(&self, name: &str) -> Option<Arc<ModelInfo>>;

    /// Like [`get`](Self::get), failing for unknown models.
    fn model(&self, name: &str) -> Result<Arc<ModelInfo>> {
        self.get(name)
            .ok_or_else(|| Error::config(format!("unknown model '{}'", name)))
    }
}

/// A fixed set of models.
#[derive(Debug, Clone, Default)]
pub struct StaticRegistry {
    models: HashMap<String, Arc<ModelInfo>>,
}

#[derive(Debug, Deserialize)]
struct RegistryDef {
    models: Vec<ModelDef>,
}

#[derive(Debug, Deserialize)]
struct ModelDef {
    name: String,
    key: Vec<String>,
    #[serde(default)]
    properties: Option<Vec<String>>,
    #[serde(default)]
    access: Option<AccessInterface>,
    #[serde(default)]
    relationships: Vec<RelationshipInfo>,
}

impl ModelDef {
    fn into_model(self) -> Result<ModelInfo> {
        let keys = PropertySet::validated(self.key)?;
        let default_mold = match (self.properties, self.access) {
            (Some(_), Some(_)) => {
                return Err(Error::config(format!(
                    "model '{}' declares both properties and an access interface",
                    self.name
                )));
            }
            (Some(properties), None) => {
                let mold = Mold::new(PropertySet::validated(properties)?, keys.clone())?;
                Some(Arc::new(mold))
            }
            (None, Some(access)) => {
                let access = Arc::new(access.key(keys.iter().map(str::to_string)));
                let mold = Mold::from_interface(&access, crate::cache::MetadataCache::global())?;
                Some(Arc::new(mold))
            }
            (None, None) => None,
        };
        Ok(ModelInfo {
            name: self.name,
            keys: Arc::new(keys),
            relationships: self.relationships,
            default_mold,
        })
    }
}

impl StaticRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style registration.
    pub fn with_model(mut self, model: ModelInfo) -> Self {
        self.register(model);
        self
    }

    pub fn register(&mut self, model: ModelInfo) {
        self.models.insert(model.name.clone(), Arc::new(model));
    }

    /// Load model definitions from JSON.
    ///
    /// ```json
    /// {"models": [{"name": "Hero", "key": ["id"], "properties": ["id", "name", "teamId"],
    ///   "relationships": [{"relationship": "team", "target_model": "Team",
    ///                      "foreign_keys": ["teamId"], "target_keys": ["id"]}]}]}
    /// ```
    pub fn from_json(json: &str) -> Result<Self> {
        let def: RegistryDef = serde_json::from_str(json)?;
        let mut registry = Self::new();
        for model in def.models {
            registry.register(model.into_model()?);
        }
        tracing::debug!(models = registry.models.len(), "loaded model registry");
        Ok(registry)
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

impl ModelRegistry for StaticRegistry {
    fn get(&self, name: &str) -> Option<Arc<ModelInfo>> {
        self.models.get(name).cloned()
    }
}
