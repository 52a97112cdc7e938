//! Process-wide metadata cache for type introspection.
//!
//! Accessor tables and access-interface descriptors are derived once per type
//! and reused for the life of the process. Entries are never evicted.
//!
//! Lookups of already-cached types take a read lock only. On a miss the
//! introspection closure runs *outside* the lock, and the result is inserted
//! first-writer-wins: two threads racing on the same type both compute
//! identical metadata, and both walk away with the `Arc` that landed first.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock, RwLock};

/// Cache key: a Rust type, or a runtime-defined name (access interfaces
/// loaded from configuration have no Rust type).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeKey {
    Type(TypeId),
    Named(String),
}

impl TypeKey {
    pub fn of<T: Any>() -> Self {
        TypeKey::Type(TypeId::of::<T>())
    }

    pub fn named(name: impl Into<String>) -> Self {
        TypeKey::Named(name.into())
    }
}

type Entry = Arc<dyn Any + Send + Sync>;

/// A concurrent key → metadata store with init-on-first-use.
#[derive(Default)]
pub struct MetadataCache {
    // Keyed by (what, kind-of-metadata) so one type can carry several tables.
    entries: RwLock<HashMap<(TypeKey, TypeId), Entry>>,
    introspections: AtomicUsize,
}

impl MetadataCache {
    /// A fresh, isolated cache. Tests inject one of these.
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide cache.
    pub fn global() -> &'static MetadataCache {
        static CACHE: OnceLock<MetadataCache> = OnceLock::new();
        CACHE.get_or_init(MetadataCache::new)
    }

    /// Fetch the `M` stored for `key`, running `introspect` on first use.
    pub fn get_or_introspect<M, F>(&self, key: TypeKey, introspect: F) -> Arc<M>
    where
        M: Any + Send + Sync,
        F: FnOnce() -> M,
    {
        let slot = (key, TypeId::of::<M>());

        // Fast path
        {
            let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
            if let Some(found) = entries.get(&slot) {
                if let Ok(meta) = Arc::clone(found).downcast::<M>() {
                    return meta;
                }
            }
        }

        // Slow path: introspect without holding the lock
        let fresh: Entry = Arc::new(introspect());
        self.introspections.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(key = ?slot.0, "introspected type metadata");

        let stored = {
            let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
            Arc::clone(entries.entry(slot).or_insert(fresh))
        };
        stored
            .downcast::<M>()
            .unwrap_or_else(|_| unreachable!("slot is keyed by the metadata TypeId"))
    }

    /// Fetch without populating.
    pub fn get<M: Any + Send + Sync>(&self, key: &TypeKey) -> Option<Arc<M>> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries
            .get(&(key.clone(), TypeId::of::<M>()))
            .and_then(|found| Arc::clone(found).downcast::<M>().ok())
    }

    /// Is metadata of type `M` cached for `key`?
    pub fn contains<M: Any + Send + Sync>(&self, key: &TypeKey) -> bool {
        self.get::<M>(key).is_some()
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// How many times an introspection closure has run.
    ///
    /// Equals `len()` unless threads raced on the same key.
    pub fn introspections(&self) -> usize {
        self.introspections.load(Ordering::Relaxed)
    }
}

impl std::fmt::Debug for MetadataCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetadataCache")
            .field("entries", &self.len())
            .field("introspections", &self.introspections())
            .finish()
    }
}
