//! Access interfaces: the named method surface a record is exposed through.
//!
//! An access interface is described as data (a name plus method signatures)
//! instead of being a compile-time trait, so one generic record can satisfy
//! an open set of differently-named interfaces. Interfaces come either from a
//! Rust type implementing [`AccessType`] or from configuration.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::Result;
use crate::cache::{MetadataCache, TypeKey};
use crate::error::Error;
use crate::property::{AccessorName, PropertySet, parse_accessor_name};
use crate::proxy::DispatchTable;

/// Kind of a method parameter, as far as dispatch cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
    /// A property value
    Value,
    /// A single property name
    Name,
    /// A list of property names
    Names,
    /// A name → value map
    Map,
}

/// One method of an access interface.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MethodSig {
    pub name: String,
    #[serde(default)]
    pub params: Vec<ParamKind>,
}

impl MethodSig {
    pub fn new(name: impl Into<String>, params: impl Into<Vec<ParamKind>>) -> Self {
        Self {
            name: name.into(),
            params: params.into(),
        }
    }
}

/// A named set of method signatures.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccessInterface {
    pub name: String,
    #[serde(default)]
    pub methods: Vec<MethodSig>,
    /// Key properties, in key order
    #[serde(default)]
    pub key: Vec<String>,
}

impl AccessInterface {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            methods: Vec::new(),
            key: Vec::new(),
        }
    }

    /// Add a zero-argument method (`getName`, `isActive`, ...).
    pub fn getter(mut self, method: impl Into<String>) -> Self {
        self.methods.push(MethodSig::new(method, []));
        self
    }

    /// Add a one-value method (`setName`, ...).
    pub fn setter(mut self, method: impl Into<String>) -> Self {
        self.methods.push(MethodSig::new(method, [ParamKind::Value]));
        self
    }

    /// Add a getter/setter pair for `property` in camel-case form.
    pub fn property(self, property: &str) -> Self {
        let mut chars = property.chars();
        let capitalized = match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
            None => String::new(),
        };
        self.getter(format!("get{}", capitalized))
            .setter(format!("set{}", capitalized))
    }

    /// Add an arbitrary method.
    pub fn method(mut self, method: impl Into<String>, params: impl Into<Vec<ParamKind>>) -> Self {
        self.methods.push(MethodSig::new(method, params));
        self
    }

    /// Declare the key properties.
    pub fn key<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.key = names.into_iter().map(Into::into).collect();
        self
    }

    /// The interface described by `T`, cached per type in the global cache.
    pub fn of<T: AccessType>() -> Arc<AccessInterface> {
        Self::of_in::<T>(MetadataCache::global())
    }

    /// The interface described by `T`, cached per type in `cache`.
    pub fn of_in<T: AccessType>(cache: &MetadataCache) -> Arc<AccessInterface> {
        cache.get_or_introspect(TypeKey::of::<T>(), T::interface)
    }

    /// Properties implied by accessor-shaped methods.
    pub fn derive_properties(&self) -> PropertySet {
        PropertySet::new(
            self.methods
                .iter()
                .filter_map(|m| match (parse_accessor_name(&m.name), m.params.as_slice()) {
                    (Some(AccessorName::Getter(p)), []) => Some(p),
                    (Some(AccessorName::Setter(p)), [ParamKind::Value]) => Some(p),
                    _ => None,
                })
                .filter(|p| !crate::proxy::is_metadata_property(p)),
        )
    }

    /// Derived metadata (property set, key set, dispatch table), cached in
    /// `cache` per distinct interface definition.
    pub fn metadata(self: &Arc<Self>, cache: &MetadataCache) -> Result<Arc<InterfaceMetadata>> {
        let meta = cache.get_or_introspect(self.cache_key(), || {
            InterfaceMetadata::introspect(Arc::clone(self))
        });
        if *meta.interface != **self {
            return Err(Error::config(format!(
                "access interface '{}' collides with a different cached definition",
                self.name
            )));
        }
        if !meta.properties.is_superset_of(&meta.keys) {
            return Err(Error::config(format!(
                "access interface '{}' declares key properties it does not expose",
                self.name
            )));
        }
        Ok(meta)
    }

    // Name plus a digest of the whole definition, so same-named interfaces
    // with different methods or keys get separate entries.
    fn cache_key(&self) -> TypeKey {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        TypeKey::named(format!("{}#{:016x}", self.name, hasher.finish()))
    }
}

/// Rust types that describe an access interface.
pub trait AccessType: 'static {
    fn interface() -> AccessInterface;
}

/// Everything derived from an access interface, computed once.
#[derive(Debug)]
pub struct InterfaceMetadata {
    pub interface: Arc<AccessInterface>,
    pub properties: Arc<PropertySet>,
    pub keys: Arc<PropertySet>,
    pub dispatch: Arc<DispatchTable>,
}

impl InterfaceMetadata {
    pub fn introspect(interface: Arc<AccessInterface>) -> Self {
        let properties = Arc::new(interface.derive_properties());
        let keys = Arc::new(PropertySet::new(interface.key.iter().cloned()));
        let dispatch = Arc::new(DispatchTable::compile(&interface));
        Self {
            interface,
            properties,
            keys,
            dispatch,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Hero;

    impl AccessType for Hero {
        fn interface() -> AccessInterface {
            AccessInterface::new("Hero")
                .property("id")
                .property("name")
                .getter("isActive")
                .getter("getPropertyNames")
                .method("lookup", [ParamKind::Name])
                .key(["id"])
        }
    }

    #[test]
    fn derives_properties_from_accessor_methods() {
        let iface = Hero::interface();
        assert_eq!(
            iface.derive_properties().names(),
            ["id", "name", "active"]
        );
    }

    #[test]
    fn interface_of_type_is_cached() {
        let cache = MetadataCache::new();
        let a = AccessInterface::of_in::<Hero>(&cache);
        let b = AccessInterface::of_in::<Hero>(&cache);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.introspections(), 1);

        let meta = a.metadata(&cache).unwrap();
        let again = a.metadata(&cache).unwrap();
        assert!(Arc::ptr_eq(&meta, &again));
        assert_eq!(cache.introspections(), 2);
        assert_eq!(meta.keys.names(), ["id"]);
    }

    #[test]
    fn same_named_interfaces_keep_their_own_metadata() {
        let cache = MetadataCache::new();
        let narrow = Arc::new(AccessInterface::new("View").property("id").key(["id"]));
        let wide = Arc::new(
            AccessInterface::new("View")
                .property("id")
                .property("email")
                .key(["id"]),
        );

        let a = narrow.metadata(&cache).unwrap();
        let b = wide.metadata(&cache).unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(a.properties.names(), ["id"]);
        assert_eq!(b.properties.names(), ["id", "email"]);
        assert_eq!(cache.introspections(), 2);

        let copy = Arc::new((*wide).clone());
        assert!(Arc::ptr_eq(&copy.metadata(&cache).unwrap(), &b));
    }

    #[test]
    fn key_outside_properties_is_rejected() {
        let cache = MetadataCache::new();
        let iface = Arc::new(AccessInterface::new("Broken").property("name").key(["id"]));
        assert!(matches!(iface.metadata(&cache), Err(Error::Config(_))));
    }

    #[test]
    fn deserializes_from_json() {
        let iface: AccessInterface = serde_json::from_str(
            r#"{"name":"Team","methods":[{"name":"getName"},{"name":"setName","params":["value"]}],"key":["name"]}"#,
        )
        .unwrap();
        assert_eq!(iface.derive_properties().names(), ["name"]);
    }
}
