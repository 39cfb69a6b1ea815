//! Dependency invalidation.
//!
//! Every stored entry lists the resources it depends on in
//! `FreshnessMetadata::dependent_uris`. Mutating a resource must take down
//! the entries stored for it, every entry that depends on it, and then
//! everything that depends on those, transitively.
//!
//! The walk is breadth-first from the mutated URI. A reverse index
//! (`uri → entries` and `dependency → entries`) is built in one pass over a
//! store snapshot, so the cost is proportional to what is reachable rather
//! than to the number of edges times the store size. Visited sets of URIs
//! and entries make cycles, self-references and diamonds terminate with
//! each entry reported exactly once.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use cachet_core::{CacheEntry, CacheKey, ResourceUri};

use crate::store::CacheStore;

/// An entry selected for invalidation.
#[derive(Debug, Clone)]
pub struct Invalidated {
    /// Key the entry is stored under.
    pub key: CacheKey,
    /// The entry as it was when the walk saw it.
    pub entry: Arc<CacheEntry>,
}

/// Collects every entry reachable from `mutated`, in breadth-first order,
/// without touching the store.
pub fn plan(mutated: &ResourceUri, store: &dyn CacheStore) -> Vec<Invalidated> {
    let snapshot = store.snapshot();

    let mut by_uri: HashMap<&ResourceUri, Vec<usize>> = HashMap::new();
    let mut by_dependency: HashMap<&ResourceUri, Vec<usize>> = HashMap::new();
    for (index, (_, entry)) in snapshot.iter().enumerate() {
        by_uri.entry(entry.uri()).or_default().push(index);
        for dependency in &entry.metadata.dependent_uris {
            by_dependency.entry(dependency).or_default().push(index);
        }
    }

    let mut visited_uris: HashSet<ResourceUri> = HashSet::from([mutated.clone()]);
    let mut visited_entries: HashSet<usize> = HashSet::new();
    let mut queue = VecDeque::from([mutated.clone()]);
    let mut order = Vec::new();

    while let Some(uri) = queue.pop_front() {
        let reached = by_uri
            .get(&uri)
            .into_iter()
            .chain(by_dependency.get(&uri))
            .flatten();
        for &index in reached {
            if !visited_entries.insert(index) {
                continue;
            }
            let entry_uri = snapshot[index].1.uri();
            if visited_uris.insert(entry_uri.clone()) {
                queue.push_back(entry_uri.clone());
            }
            order.push(index);
        }
    }

    order
        .into_iter()
        .map(|index| {
            let (key, entry) = &snapshot[index];
            Invalidated {
                key: key.clone(),
                entry: Arc::clone(entry),
            }
        })
        .collect()
}

/// Removes every entry reachable from `mutated` and returns them.
pub fn invalidate(mutated: &ResourceUri, store: &dyn CacheStore) -> Vec<Invalidated> {
    let planned = plan(mutated, store);
    for item in &planned {
        store.remove_if_same(&item.key, &item.entry);
    }
    planned
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::store::tests::entry;

    fn depending(uri: &str, value: u32, depends_on: &[&str]) -> (CacheKey, Arc<CacheEntry>) {
        let (key, entry) = entry(uri, value);
        let mut metadata = entry.metadata.clone();
        metadata.dependent_uris = depends_on
            .iter()
            .map(|uri| ResourceUri::parse(uri).unwrap())
            .collect();
        (key, Arc::new(entry.with_metadata(metadata)))
    }

    fn store_with(entries: Vec<(CacheKey, Arc<CacheEntry>)>) -> MemoryStore {
        let store = MemoryStore::new();
        for (key, entry) in entries {
            store.put(key, entry);
        }
        store
    }

    fn uris(invalidated: &[Invalidated]) -> Vec<&str> {
        invalidated.iter().map(|i| i.entry.uri().as_str()).collect()
    }

    #[test]
    fn test_transitive_dependents() {
        let store = store_with(vec![
            depending("http://h/a", 1, &[]),
            depending("http://h/b", 2, &["http://h/a"]),
            depending("http://h/c", 3, &["http://h/b"]),
            depending("http://h/d", 4, &[]),
        ]);
        let mutated = ResourceUri::parse("http://h/a").unwrap();
        let removed = invalidate(&mutated, &store);
        assert_eq!(uris(&removed), vec!["http://h/a", "http://h/b", "http://h/c"]);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_cycle_reports_each_entry_once() {
        let store = store_with(vec![
            depending("http://h/a", 1, &["http://h/b"]),
            depending("http://h/b", 2, &["http://h/a"]),
        ]);
        let removed = invalidate(&ResourceUri::parse("http://h/a").unwrap(), &store);
        assert_eq!(removed.len(), 2);
        assert!(store.is_empty());
    }

    #[test]
    fn test_self_reference() {
        let store = store_with(vec![depending("http://h/a", 1, &["http://h/a"])]);
        let removed = invalidate(&ResourceUri::parse("http://h/a").unwrap(), &store);
        assert_eq!(removed.len(), 1);
    }

    #[test]
    fn test_mutating_a_dependency_without_entry() {
        let store = store_with(vec![depending("http://h/list", 1, &["http://h/item/1"])]);
        let planned = plan(&ResourceUri::parse("http://h/item/1").unwrap(), &store);
        assert_eq!(uris(&planned), vec!["http://h/list"]);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_unrelated_entries_untouched() {
        let store = store_with(vec![depending("http://h/a", 1, &["http://h/x"])]);
        let removed = invalidate(&ResourceUri::parse("http://h/y").unwrap(), &store);
        assert!(removed.is_empty());
        assert_eq!(store.len(), 1);
    }
}
