//! Cache storage.
//!
//! [`CacheStore`] is the seam between the engine and where entries live.
//! Operations are synchronous: the engine never awaits while holding a
//! store reference, and a write that has started always completes.
//!
//! [`MemoryStore`] is the in-process implementation, a sharded concurrent
//! map. It has no eviction policy; entries leave only through
//! invalidation, validation (an entry found to be uncacheable) or
//! [`CacheStore::clear`].

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use cachet_core::{CacheEntry, CacheKey};

/// Storage backend for cache entries.
pub trait CacheStore: Send + Sync {
    /// Reads the entry stored under `key`.
    fn get(&self, key: &CacheKey) -> Option<Arc<CacheEntry>>;

    /// Writes `entry`, returning the entry it replaced.
    fn put(&self, key: CacheKey, entry: Arc<CacheEntry>) -> Option<Arc<CacheEntry>>;

    /// Atomically replaces the entry under `key` with `f(existing)`.
    ///
    /// No other write to `key` can interleave between the read and the
    /// write, so a merge computed in `f` is never lost.
    fn update(
        &self,
        key: CacheKey,
        f: &mut dyn FnMut(Option<&Arc<CacheEntry>>) -> Arc<CacheEntry>,
    ) -> Arc<CacheEntry>;

    /// Removes the entry under `key`.
    fn remove(&self, key: &CacheKey) -> Option<Arc<CacheEntry>>;

    /// Removes the entry under `key` only if it is still `expected`.
    ///
    /// An entry written in its place since `expected` was read is kept.
    fn remove_if_same(&self, key: &CacheKey, expected: &Arc<CacheEntry>) -> bool;

    /// Removes every entry.
    fn clear(&self);

    /// Returns the number of stored entries.
    fn len(&self) -> usize;

    /// Returns `true` if nothing is stored.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns a point-in-time copy of every key and entry.
    fn snapshot(&self) -> Vec<(CacheKey, Arc<CacheEntry>)>;
}

/// In-memory store backed by [`DashMap`].
///
/// Cloning is cheap and clones share the same entries.
#[derive(Clone, Default)]
pub struct MemoryStore {
    entries: Arc<DashMap<CacheKey, Arc<CacheEntry>>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if an entry is stored under `key`.
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries.contains_key(key)
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("len", &self.entries.len())
            .finish()
    }
}

impl CacheStore for MemoryStore {
    fn get(&self, key: &CacheKey) -> Option<Arc<CacheEntry>> {
        self.entries.get(key).map(|entry| Arc::clone(entry.value()))
    }

    fn put(&self, key: CacheKey, entry: Arc<CacheEntry>) -> Option<Arc<CacheEntry>> {
        self.entries.insert(key, entry)
    }

    fn update(
        &self,
        key: CacheKey,
        f: &mut dyn FnMut(Option<&Arc<CacheEntry>>) -> Arc<CacheEntry>,
    ) -> Arc<CacheEntry> {
        // The entry guard holds the shard lock until the write is done.
        match self.entries.entry(key) {
            Entry::Occupied(mut occupied) => {
                let next = f(Some(occupied.get()));
                occupied.insert(Arc::clone(&next));
                next
            }
            Entry::Vacant(vacant) => {
                let next = f(None);
                vacant.insert(Arc::clone(&next));
                next
            }
        }
    }

    fn remove(&self, key: &CacheKey) -> Option<Arc<CacheEntry>> {
        self.entries.remove(key).map(|(_, entry)| entry)
    }

    fn remove_if_same(&self, key: &CacheKey, expected: &Arc<CacheEntry>) -> bool {
        self.entries
            .remove_if(key, |_, stored| Arc::ptr_eq(stored, expected))
            .is_some()
    }

    fn clear(&self) {
        self.entries.clear();
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn snapshot(&self) -> Vec<(CacheKey, Arc<CacheEntry>)> {
        self.entries
            .iter()
            .map(|item| (item.key().clone(), Arc::clone(item.value())))
            .collect()
    }
}
