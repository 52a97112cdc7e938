//! Molds: templates that shape projected records.
//!
//! A [`Mold`] names the properties a projected record exposes, the key subset
//! and optionally the access interface. A [`MoldMap`] assigns molds to dotted
//! relationship paths; a path without a mold is not traversed.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::Result;
use crate::cache::MetadataCache;
use crate::interface::{AccessInterface, AccessType};
use crate::property::PropertySet;
use crate::record::TransferRecord;

/// Path of the root record.
pub const ROOT_PATH: &str = "";

/// Immutable projection template.
#[derive(Debug, Clone)]
pub struct Mold {
    properties: Arc<PropertySet>,
    keys: Arc<PropertySet>,
    access: Option<Arc<AccessInterface>>,
}

impl Mold {
    /// A mold exposing `properties`, identified by `keys`.
    ///
    /// Fails when a key property is not among the exposed properties.
    pub fn new(properties: impl Into<Arc<PropertySet>>, keys: impl Into<Arc<PropertySet>>) -> Result<Self> {
        let properties = properties.into();
        let keys = keys.into();
        if let Some(missing) = keys.iter().find(|k| !properties.contains(k)) {
            return Err(crate::Error::config(format!(
                "mold key '{}' is not an exposed property",
                missing
            )));
        }
        Ok(Self {
            properties,
            keys,
            access: None,
        })
    }

    /// Convenience for literal name lists.
    pub fn of<I, S, K, KS>(properties: I, keys: K) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        K: IntoIterator<Item = KS>,
        KS: Into<String>,
    {
        Self::new(PropertySet::new(properties), PropertySet::new(keys))
    }

    pub fn with_access(mut self, interface: Arc<AccessInterface>) -> Self {
        self.access = Some(interface);
        self
    }

    /// Derive properties and keys from an interface, introspected once per cache.
    pub fn from_interface(interface: &Arc<AccessInterface>, cache: &MetadataCache) -> Result<Self> {
        let meta = interface.metadata(cache)?;
        Ok(Self {
            properties: Arc::clone(&meta.properties),
            keys: Arc::clone(&meta.keys),
            access: Some(Arc::clone(interface)),
        })
    }

    pub fn for_type<T: AccessType>() -> Result<Self> {
        let cache = MetadataCache::global();
        Self::from_interface(&AccessInterface::of_in::<T>(cache), cache)
    }

    pub fn properties(&self) -> &Arc<PropertySet> {
        &self.properties
    }

    pub fn keys(&self) -> &Arc<PropertySet> {
        &self.keys
    }

    pub fn access(&self) -> Option<&Arc<AccessInterface>> {
        self.access.as_ref()
    }

    /// An empty record in this mold's shape.
    pub fn new_record(&self) -> Result<TransferRecord> {
        TransferRecord::from_mold(self)
    }

    /// Wrap in an `Arc` for use in a [`MoldMap`].
    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}

impl TransferRecord {
    /// An empty record shaped by `mold`.
    pub fn from_mold(mold: &Mold) -> Result<Self> {
        let builder = TransferRecord::builder(Arc::clone(mold.properties()))
            .keys(Arc::clone(mold.keys()));
        match mold.access() {
            Some(access) => builder.access(Arc::clone(access)).build(),
            None => builder.build(),
        }
    }
}

/// Dotted path → mold.
#[derive(Debug, Clone, Default)]
pub struct MoldMap {
    molds: BTreeMap<String, Arc<Mold>>,
}

impl MoldMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// A map holding only a root mold.
    pub fn single(mold: impl Into<Arc<Mold>>) -> Self {
        Self::new().with(ROOT_PATH, mold)
    }

    /// Builder-style insert.
    pub fn with(mut self, path: impl Into<String>, mold: impl Into<Arc<Mold>>) -> Self {
        self.insert(path, mold);
        self
    }

    pub fn insert(&mut self, path: impl Into<String>, mold: impl Into<Arc<Mold>>) -> Option<Arc<Mold>> {
        self.molds.insert(path.into(), mold.into())
    }

    pub fn get(&self, path: &str) -> Option<&Arc<Mold>> {
        self.molds.get(path)
    }

    pub fn root(&self) -> Option<&Arc<Mold>> {
        self.get(ROOT_PATH)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.molds.contains_key(path)
    }

    /// A copy without `path` (descendant paths are kept but become unreachable).
    pub fn without(&self, path: &str) -> Self {
        let mut molds = self.molds.clone();
        molds.remove(path);
        Self { molds }
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.molds.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.molds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.molds.is_empty()
    }
}

/// Path of `property` beneath `parent`.
pub fn child_path(parent: &str, property: &str) -> String {
    if parent.is_empty() {
        property.to_string()
    } else {
        format!("{}.{}", parent, property)
    }
}

/// Nesting depth of `path`; the root is 0.
pub fn path_depth(path: &str) -> usize {
    if path.is_empty() {
        0
    } else {
        path.split('.').count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bag::PropertyAccess;

    #[test]
    fn child_paths() {
        assert_eq!(child_path(ROOT_PATH, "team"), "team");
        assert_eq!(child_path("team", "heroes"), "team.heroes");
        assert_eq!(path_depth(""), 0);
        assert_eq!(path_depth("team.heroes"), 2);
    }

    #[test]
    fn mold_keys_must_be_exposed() {
        assert!(Mold::of(["name"], ["id"]).is_err());
        assert!(Mold::of(["id", "name"], ["id"]).is_ok());
    }

    #[test]
    fn mold_map_lookup_and_removal() {
        let root = Mold::of(["id", "team"], ["id"]).unwrap().shared();
        let team = Mold::of(["id"], ["id"]).unwrap().shared();
        let map = MoldMap::single(Arc::clone(&root)).with("team", Arc::clone(&team));

        assert!(Arc::ptr_eq(map.root().unwrap(), &root));
        assert_eq!(map.paths().collect::<Vec<_>>(), ["", "team"]);
        let trimmed = map.without("team");
        assert!(!trimmed.contains("team"));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn records_from_a_mold_share_its_sets() {
        let mold = Mold::of(["id", "name"], ["id"]).unwrap();
        let a = mold.new_record().unwrap();
        let b = TransferRecord::from_mold(&mold).unwrap();
        assert!(Arc::ptr_eq(&a.shared_names(), &b.shared_names()));
        assert_eq!(a.get("name").unwrap(), crate::Value::Null);
    }

    #[test]
    fn mold_from_interface() {
        let cache = MetadataCache::new();
        let iface = Arc::new(
            AccessInterface::new("TeamView")
                .property("id")
                .property("headquarters")
                .key(["id"]),
        );
        let mold = Mold::from_interface(&iface, &cache).unwrap();
        assert_eq!(mold.properties().names(), ["id", "headquarters"]);
        assert_eq!(mold.access().unwrap().name, "TeamView");
        let record = mold.new_record().unwrap();
        assert_eq!(record.access_interface().unwrap().name, "TeamView");
    }
}
