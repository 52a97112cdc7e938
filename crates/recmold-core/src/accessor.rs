//! Struct-backed property access.
//!
//! A type opts in by implementing [`Accessible`] (normally through
//! `#[derive(Accessible)]`), which lists one [`Accessor`] per property. The
//! list is turned into an [`AccessorTable`] once per type and cached, so
//! name-based access costs a hash lookup and a function-pointer call.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::Result;
use crate::bag::PropertyAccess;
use crate::cache::{MetadataCache, TypeKey};
use crate::error::Error;
use crate::property::PropertySet;
use crate::value::Value;

pub type Getter<T> = fn(&T) -> Result<Value>;
pub type Setter<T> = fn(&mut T, Value) -> Result<()>;

/// A named read and/or write accessor on `T`.
pub struct Accessor<T> {
    pub name: &'static str,
    pub getter: Option<Getter<T>>,
    pub setter: Option<Setter<T>>,
}

impl<T> Accessor<T> {
    pub const fn read_write(name: &'static str, getter: Getter<T>, setter: Setter<T>) -> Self {
        Self {
            name,
            getter: Some(getter),
            setter: Some(setter),
        }
    }

    pub const fn read_only(name: &'static str, getter: Getter<T>) -> Self {
        Self {
            name,
            getter: Some(getter),
            setter: None,
        }
    }

    pub const fn write_only(name: &'static str, setter: Setter<T>) -> Self {
        Self {
            name,
            getter: None,
            setter: Some(setter),
        }
    }
}

impl<T> Clone for Accessor<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Accessor<T> {}

impl<T> fmt::Debug for Accessor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Accessor")
            .field("name", &self.name)
            .field("readable", &self.getter.is_some())
            .field("writable", &self.setter.is_some())
            .finish()
    }
}

/// Types whose properties are reached through named accessors.
///
/// # Example
///
/// ```ignore
/// #[derive(Clone, Accessible)]
/// struct Hero {
///     id: i64,
///     #[accessor(rename = "secretName")]
///     secret_name: String,
/// }
/// ```
pub trait Accessible: Sized + Send + Sync + 'static {
    /// Name used in diagnostics.
    const TYPE_NAME: &'static str;

    /// One accessor per property. Called once per process (per cache).
    fn accessors() -> Vec<Accessor<Self>>;
}

/// Cached per-type accessor metadata.
pub struct AccessorTable<T> {
    type_name: &'static str,
    names: Arc<PropertySet>,
    readable: Arc<PropertySet>,
    entries: HashMap<&'static str, Accessor<T>>,
}

impl<T: Accessible> AccessorTable<T> {
    /// Build the table by asking the type for its accessors.
    pub fn introspect() -> Self {
        let accessors = T::accessors();
        let names = PropertySet::new(accessors.iter().map(|a| a.name));
        let readable = PropertySet::new(
            accessors
                .iter()
                .filter(|a| a.getter.is_some())
                .map(|a| a.name),
        );
        let entries = accessors.into_iter().map(|a| (a.name, a)).collect();
        Self {
            type_name: T::TYPE_NAME,
            names: Arc::new(names),
            readable: Arc::new(readable),
            entries,
        }
    }

    /// The table for `T` from `cache`, introspecting on first use.
    pub fn of(cache: &MetadataCache) -> Arc<Self> {
        cache.get_or_introspect(TypeKey::of::<T>(), Self::introspect)
    }
}

impl<T> AccessorTable<T> {
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Every name with an accessor.
    pub fn names(&self) -> &Arc<PropertySet> {
        &self.names
    }

    /// Names with a read accessor.
    pub fn readable(&self) -> &Arc<PropertySet> {
        &self.readable
    }

    pub fn accessor(&self, name: &str) -> Option<&Accessor<T>> {
        self.entries.get(name)
    }

    /// Read `name` from `target`.
    pub fn read(&self, target: &T, name: &str) -> Result<Value> {
        let getter = self
            .accessor(name)
            .and_then(|a| a.getter)
            .ok_or_else(|| Error::no_accessor(name, self.type_name))?;
        getter(target).map_err(|cause| Error::access(name, self.type_name, cause))
    }

    /// Write `value` to `name` on `target`.
    pub fn write(&self, target: &mut T, name: &str, value: Value) -> Result<()> {
        let setter = self
            .accessor(name)
            .and_then(|a| a.setter)
            .ok_or_else(|| Error::no_accessor(name, self.type_name))?;
        setter(target, value).map_err(|cause| Error::access(name, self.type_name, cause))
    }
}

impl<T> fmt::Debug for AccessorTable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessorTable")
            .field("type_name", &self.type_name)
            .field("names", &self.names.names())
            .finish()
    }
}

/// Property access backed by a concrete value's accessors.
pub struct TypedAccessorBag<T> {
    value: T,
    table: Arc<AccessorTable<T>>,
}

impl<T: Accessible> TypedAccessorBag<T> {
    /// Wrap `value`, resolving accessors through the process-wide cache.
    pub fn new(value: T) -> Self {
        Self::with_cache(value, MetadataCache::global())
    }

    /// Wrap `value`, resolving accessors through `cache`.
    pub fn with_cache(value: T, cache: &MetadataCache) -> Self {
        Self {
            value,
            table: AccessorTable::of(cache),
        }
    }
}

impl<T> TypedAccessorBag<T> {
    pub fn inner(&self) -> &T {
        &self.value
    }

    pub fn inner_mut(&mut self) -> &mut T {
        &mut self.value
    }

    pub fn into_inner(self) -> T {
        self.value
    }

    pub fn table(&self) -> &Arc<AccessorTable<T>> {
        &self.table
    }
}

impl<T> PropertyAccess for TypedAccessorBag<T> {
    fn property_names(&self) -> &PropertySet {
        self.table.names()
    }

    fn get(&self, name: &str) -> Result<Value> {
        self.table.read(&self.value, name)
    }

    fn set(&mut self, name: &str, value: Value) -> Result<()> {
        self.table.write(&mut self.value, name, value)
    }

    // Only readable names; write-only accessors are skipped rather than failing.
    fn get_all(&self) -> Result<crate::value::ValueMap> {
        self.table
            .readable()
            .iter()
            .map(|name| Ok((name.to_string(), self.get(name)?)))
            .collect()
    }
}

impl<T: Clone> Clone for TypedAccessorBag<T> {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
            table: Arc::clone(&self.table),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for TypedAccessorBag<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedAccessorBag")
            .field("value", &self.value)
            .finish_non_exhaustive()
    }
}
