//! Transfer records: the generic, dynamically-shaped unit of data exchange.
//!
//! A record declares a [`PropertySet`] and a key subset of it, optionally
//! carries an access interface and a version, and stores one value per
//! declared property. Storage is either map-backed ([`PropertyBag`]) or
//! struct-backed ([`TypedAccessorBag`]); the choice is made at construction
//! and callers only ever see [`PropertyAccess`].

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::Result;
use crate::accessor::{Accessible, TypedAccessorBag};
use crate::bag::{PropertyAccess, PropertyBag};
use crate::cache::MetadataCache;
use crate::error::Error;
use crate::interface::{AccessInterface, AccessType};
use crate::property::PropertySet;
use crate::value::{Value, ValueMap};

/// Struct-backed storage with the concrete type erased.
trait ErasedBag: PropertyAccess + Send + Sync + fmt::Debug {
    fn clone_box(&self) -> Box<dyn ErasedBag>;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T> ErasedBag for TypedAccessorBag<T>
where
    T: Accessible + Clone + fmt::Debug,
{
    fn clone_box(&self) -> Box<dyn ErasedBag> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[derive(Debug)]
enum Storage {
    Map(PropertyBag),
    Typed(Box<dyn ErasedBag>),
}

impl Clone for Storage {
    fn clone(&self) -> Self {
        match self {
            Storage::Map(bag) => Storage::Map(bag.clone()),
            Storage::Typed(bag) => Storage::Typed(bag.clone_box()),
        }
    }
}

impl Storage {
    fn get(&self, name: &str) -> Result<Value> {
        match self {
            Storage::Map(bag) => bag.get(name),
            Storage::Typed(bag) => bag.get(name),
        }
    }

    fn set(&mut self, name: &str, value: Value) -> Result<()> {
        match self {
            Storage::Map(bag) => bag.set(name, value),
            Storage::Typed(bag) => bag.set(name, value),
        }
    }
}

/// A generic record exchanged between the projector and its callers.
#[derive(Debug, Clone)]
pub struct TransferRecord {
    names: Arc<PropertySet>,
    keys: Arc<PropertySet>,
    access: Option<Arc<AccessInterface>>,
    version: Option<i64>,
    storage: Storage,
}

/// Builder for map-backed records.
#[derive(Debug, Clone)]
pub struct RecordBuilder {
    names: Arc<PropertySet>,
    keys: Arc<PropertySet>,
    access: Option<Arc<AccessInterface>>,
    version: Option<i64>,
    values: ValueMap,
}

impl RecordBuilder {
    pub fn keys(mut self, keys: impl Into<Arc<PropertySet>>) -> Self {
        self.keys = keys.into();
        self
    }

    pub fn access(mut self, interface: impl Into<Arc<AccessInterface>>) -> Self {
        self.access = Some(interface.into());
        self
    }

    pub fn version(mut self, version: i64) -> Self {
        self.version = Some(version);
        self
    }

    pub fn value(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    pub fn values(mut self, values: ValueMap) -> Self {
        self.values.extend(values);
        self
    }

    /// Validate the key subset and assign the initial values.
    pub fn build(self) -> Result<TransferRecord> {
        check_keys(&self.names, &self.keys)?;
        let mut record = TransferRecord {
            storage: Storage::Map(PropertyBag::new(Arc::clone(&self.names))),
            names: self.names,
            keys: self.keys,
            access: self.access,
            version: self.version,
        };
        if !self.values.is_empty() {
            record.set_all(self.values)?;
        }
        Ok(record)
    }
}

fn check_keys(names: &PropertySet, keys: &PropertySet) -> Result<()> {
    match keys.iter().find(|k| !names.contains(k)) {
        Some(missing) => Err(Error::config(format!(
            "key property '{}' is not a declared property",
            missing
        ))),
        None => Ok(()),
    }
}

impl TransferRecord {
    /// Start a map-backed record declaring `properties`, every value null.
    pub fn builder(properties: impl Into<Arc<PropertySet>>) -> RecordBuilder {
        RecordBuilder {
            names: properties.into(),
            keys: Arc::new(PropertySet::empty()),
            access: None,
            version: None,
            values: ValueMap::new(),
        }
    }

    /// An empty record declaring `names`, keyed by `keys`.
    pub fn with_properties<I, S, K, KS>(names: I, keys: K) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        K: IntoIterator<Item = KS>,
        KS: Into<String>,
    {
        Self::builder(PropertySet::new(names))
            .keys(PropertySet::new(keys))
            .build()
    }

    /// A record whose declared set is inferred from the map.
    pub fn from_values<K, KS>(values: ValueMap, keys: K) -> Result<Self>
    where
        K: IntoIterator<Item = KS>,
        KS: Into<String>,
    {
        let bag = PropertyBag::from_values(values);
        let names = bag.shared_names();
        let keys = Arc::new(PropertySet::new(keys));
        check_keys(&names, &keys)?;
        Ok(TransferRecord {
            storage: Storage::Map(bag),
            names,
            keys,
            access: None,
            version: None,
        })
    }

    /// An empty record shaped by an access interface.
    pub fn for_interface(interface: &Arc<AccessInterface>) -> Result<Self> {
        RecordFactory::global().for_interface(interface)
    }

    /// An empty record shaped by the interface `T` describes.
    pub fn for_type<T: AccessType>() -> Result<Self> {
        RecordFactory::global().for_type::<T>()
    }

    /// A struct-backed record over `value`, declaring its readable properties.
    pub fn typed<T, K, KS>(value: T, keys: K) -> Result<Self>
    where
        T: Accessible + Clone + fmt::Debug,
        K: IntoIterator<Item = KS>,
        KS: Into<String>,
    {
        RecordFactory::global().typed(value, keys)
    }

    pub fn property_names(&self) -> &PropertySet {
        &self.names
    }

    /// Shared handle to the declared set.
    pub fn shared_names(&self) -> Arc<PropertySet> {
        Arc::clone(&self.names)
    }

    pub fn key_property_names(&self) -> &PropertySet {
        &self.keys
    }

    pub fn shared_keys(&self) -> Arc<PropertySet> {
        Arc::clone(&self.keys)
    }

    pub fn access_interface(&self) -> Option<&Arc<AccessInterface>> {
        self.access.as_ref()
    }

    pub fn version(&self) -> Option<i64> {
        self.version
    }

    pub fn set_version(&mut self, version: Option<i64>) {
        self.version = version;
    }

    pub fn is_typed(&self) -> bool {
        matches!(self.storage, Storage::Typed(_))
    }

    /// The struct behind a typed record, if it is a `T`.
    pub fn typed_value<T: Accessible>(&self) -> Option<&T> {
        match &self.storage {
            Storage::Typed(bag) => bag
                .as_any()
                .downcast_ref::<TypedAccessorBag<T>>()
                .map(TypedAccessorBag::inner),
            Storage::Map(_) => None,
        }
    }

    pub fn typed_value_mut<T: Accessible>(&mut self) -> Option<&mut T> {
        match &mut self.storage {
            Storage::Typed(bag) => bag
                .as_any_mut()
                .downcast_mut::<TypedAccessorBag<T>>()
                .map(TypedAccessorBag::inner_mut),
            Storage::Map(_) => None,
        }
    }

    /// Ordered key values, validated.
    pub fn key_values(&self) -> Result<Vec<Value>> {
        crate::key::key_values(self)
    }

    /// A map-backed copy carrying the same metadata and values.
    pub fn snapshot(&self) -> Result<Self> {
        let mut builder = Self::builder(self.shared_names())
            .keys(self.shared_keys())
            .values(self.get_all()?);
        if let Some(access) = &self.access {
            builder = builder.access(Arc::clone(access));
        }
        if let Some(version) = self.version {
            builder = builder.version(version);
        }
        builder.build()
    }

    fn owner(&self) -> Option<&str> {
        self.access.as_deref().map(|i| i.name.as_str())
    }

    fn check_declared(&self, name: &str) -> Result<()> {
        if self.names.contains(name) {
            Ok(())
        } else {
            Err(Error::undeclared(name, self.owner()))
        }
    }
}

impl PropertyAccess for TransferRecord {
    fn property_names(&self) -> &PropertySet {
        &self.names
    }

    fn get(&self, name: &str) -> Result<Value> {
        self.check_declared(name)?;
        self.storage.get(name)
    }

    fn set(&mut self, name: &str, value: Value) -> Result<()> {
        self.check_declared(name)?;
        self.storage.set(name, value)
    }

    fn set_all(&mut self, values: ValueMap) -> Result<()> {
        for name in values.keys() {
            self.check_declared(name)?;
        }
        for (name, value) in values {
            self.storage.set(&name, value)?;
        }
        Ok(())
    }
}

/// Records compare by shape, metadata and values, not by storage strategy.
impl PartialEq for TransferRecord {
    fn eq(&self, other: &Self) -> bool {
        self.names == other.names
            && self.keys.names() == other.keys.names()
            && self.owner() == other.owner()
            && self.version == other.version
            && match (self.get_all(), other.get_all()) {
                (Ok(a), Ok(b)) => a == b,
                _ => false,
            }
    }
}

#[derive(Serialize)]
struct RecordRef<'a> {
    properties: &'a [String],
    keys: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    access: Option<&'a AccessInterface>,
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<i64>,
    values: ValueMap,
}

#[derive(Deserialize)]
struct RecordRepr {
    properties: Vec<String>,
    #[serde(default)]
    keys: Vec<String>,
    #[serde(default)]
    access: Option<AccessInterface>,
    #[serde(default)]
    version: Option<i64>,
    #[serde(default)]
    values: ValueMap,
}

impl Serialize for TransferRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let values = self.get_all().map_err(serde::ser::Error::custom)?;
        RecordRef {
            properties: self.names.names(),
            keys: self.keys.names(),
            access: self.access.as_deref(),
            version: self.version,
            values,
        }
        .serialize(serializer)
    }
}

/// Deserialized records are always map-backed.
impl<'de> Deserialize<'de> for TransferRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let repr = RecordRepr::deserialize(deserializer)?;
        let mut builder = TransferRecord::builder(PropertySet::new(repr.properties))
            .keys(PropertySet::new(repr.keys))
            .values(repr.values);
        if let Some(access) = repr.access {
            builder = builder.access(access);
        }
        if let Some(version) = repr.version {
            builder = builder.version(version);
        }
        builder.build().map_err(serde::de::Error::custom)
    }
}

/// Record constructors bound to a specific metadata cache.
#[derive(Debug, Clone, Copy)]
pub struct RecordFactory<'c> {
    cache: &'c MetadataCache,
}

impl RecordFactory<'static> {
    /// A factory over the process-wide cache.
    pub fn global() -> Self {
        Self {
            cache: MetadataCache::global(),
        }
    }
}

impl<'c> RecordFactory<'c> {
    pub fn new(cache: &'c MetadataCache) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &'c MetadataCache {
        self.cache
    }

    pub fn with_properties<I, S, K, KS>(&self, names: I, keys: K) -> Result<TransferRecord>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        K: IntoIterator<Item = KS>,
        KS: Into<String>,
    {
        TransferRecord::with_properties(names, keys)
    }

    pub fn from_values<K, KS>(&self, values: ValueMap, keys: K) -> Result<TransferRecord>
    where
        K: IntoIterator<Item = KS>,
        KS: Into<String>,
    {
        TransferRecord::from_values(values, keys)
    }

    /// Introspects `interface` once per cache; later records share its sets.
    pub fn for_interface(&self, interface: &Arc<AccessInterface>) -> Result<TransferRecord> {
        let meta = interface.metadata(self.cache)?;
        TransferRecord::builder(Arc::clone(&meta.properties))
            .keys(Arc::clone(&meta.keys))
            .access(Arc::clone(interface))
            .build()
    }

    pub fn for_type<T: AccessType>(&self) -> Result<TransferRecord> {
        self.for_interface(&AccessInterface::of_in::<T>(self.cache))
    }

    pub fn typed<T, K, KS>(&self, value: T, keys: K) -> Result<TransferRecord>
    where
        T: Accessible + Clone + fmt::Debug,
        K: IntoIterator<Item = KS>,
        KS: Into<String>,
    {
        let bag = TypedAccessorBag::with_cache(value, self.cache);
        let names = Arc::clone(bag.table().readable());
        let keys = Arc::new(PropertySet::new(keys));
        check_keys(&names, &keys)?;
        Ok(TransferRecord {
            names,
            keys,
            access: None,
            version: None,
            storage: Storage::Typed(Box::new(bag)),
        })
    }
}
