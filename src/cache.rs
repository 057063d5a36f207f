use ahash::{AHashMap, AHashSet};
use parking_lot::RwLock;

use crate::types::{Neighbors, NodeId};

/// Neighbor cache owned by a single adapter. Entries are never evicted.
#[derive(Default)]
pub struct AdjacencyCache {
    inner: RwLock<AHashMap<NodeId, Neighbors>>,
}

impl AdjacencyCache {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(AHashMap::new()),
        }
    }

    pub fn get(&self, key: NodeId) -> Option<Neighbors> {
        self.inner.read().get(&key).cloned()
    }

    pub fn contains(&self, key: NodeId) -> bool {
        self.inner.read().contains_key(&key)
    }

    /// Inserts unless an entry already exists; the first fetch wins.
    pub fn insert(&self, key: NodeId, value: Neighbors) {
        self.inner.write().entry(key).or_insert(value);
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    /// Splits `ids` into cached entries and ids that still need a fetch.
    /// Duplicate ids are reported once.
    pub fn partition(&self, ids: &[NodeId]) -> (Vec<(NodeId, Neighbors)>, Vec<NodeId>) {
        let guard = self.inner.read();
        let mut seen = AHashSet::with_capacity(ids.len());
        let mut hits = Vec::new();
        let mut misses = Vec::new();
        for &id in ids {
            if !seen.insert(id) {
                continue;
            }
            match guard.get(&id) {
                Some(value) => hits.push((id, value.clone())),
                None => misses.push(id),
            }
        }
        (hits, misses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partition_reports_duplicates_once() {
        let cache = AdjacencyCache::new();
        cache.insert(NodeId(1), vec![NodeId(2)]);
        let (hits, misses) = cache.partition(&[NodeId(1), NodeId(3), NodeId(1), NodeId(3)]);
        assert_eq!(hits, vec![(NodeId(1), vec![NodeId(2)])]);
        assert_eq!(misses, vec![NodeId(3)]);
    }

    #[test]
    fn first_insert_wins() {
        let cache = AdjacencyCache::new();
        cache.insert(NodeId(1), vec![NodeId(2)]);
        cache.insert(NodeId(1), Vec::new());
        assert_eq!(cache.get(NodeId(1)), Some(vec![NodeId(2)]));
    }
}
