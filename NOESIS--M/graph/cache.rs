use std::{
    hash::Hash,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use indexmap::IndexMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::{
    geometry::Position,
    lookup::{Lookup, LookupError},
    node::{Neighbor, NodeId},
};

/// Counters describing cache effectiveness.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Reads served from memory.
    pub hits: u64,
    /// Reads forwarded to the backing store.
    pub misses: u64,
    /// Entries dropped to stay within capacity.
    pub evictions: u64,
    /// Entries dropped because the store no longer knows the node.
    pub invalidations: u64,
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    invalidations: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Insertion-ordered map bounded by capacity; the oldest entry leaves first.
#[derive(Debug)]
struct BoundedMap<K, V> {
    capacity: usize,
    entries: RwLock<IndexMap<K, V>>,
}

impl<K: Hash + Eq + Copy, V: Clone> BoundedMap<K, V> {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: RwLock::new(IndexMap::new()),
        }
    }

    fn get(&self, key: &K) -> Option<V> {
        self.entries.read().get(key).cloned()
    }

    /// Returns true when an entry had to be evicted.
    fn insert(&self, key: K, value: V) -> bool {
        let mut entries = self.entries.write();
        if entries.contains_key(&key) {
            entries.insert(key, value);
            return false;
        }
        let evicted = entries.len() >= self.capacity;
        if evicted {
            entries.shift_remove_index(0);
        }
        entries.insert(key, value);
        evicted
    }

    fn remove(&self, key: &K) -> bool {
        self.entries.write().shift_remove(key).is_some()
    }

    fn len(&self) -> usize {
        self.entries.read().len()
    }

    fn clear(&self) {
        self.entries.write().clear();
    }
}

/// Bounded read-through cache for node text and position.
///
/// Neighbor and text-search queries always go to the backing store. Safe to
/// share between concurrent readers; population goes through a write lock.
pub struct CachedLookup {
    inner: Arc<dyn Lookup>,
    texts: BoundedMap<NodeId, String>,
    positions: BoundedMap<NodeId, Position>,
    counters: Counters,
}

impl std::fmt::Debug for CachedLookup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedLookup")
            .field("texts", &self.texts.len())
            .field("positions", &self.positions.len())
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

impl CachedLookup {
    /// Wraps `inner`, holding at most `capacity` entries per table.
    #[must_use]
    pub fn new(inner: Arc<dyn Lookup>, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner,
            texts: BoundedMap::new(capacity),
            positions: BoundedMap::new(capacity),
            counters: Counters::default(),
        }
    }

    /// Populates text and position for every id up front. Returns the number
    /// of ids the store knew.
    pub fn preload(&self, ids: &[NodeId]) -> Result<usize, LookupError> {
        let mut known = 0;
        for &id in ids {
            let text = self.lookup_text(id)?;
            let position = self.lookup_position(id)?;
            if !text.is_empty() || position.is_some() {
                known += 1;
            }
        }
        tracing::debug!(requested = ids.len(), known, "lookup cache preloaded");
        Ok(known)
    }

    /// Drops every cached entry.
    pub fn clear(&self) {
        self.texts.clear();
        self.positions.clear();
    }

    /// Current counters.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            evictions: self.counters.evictions.load(Ordering::Relaxed),
            invalidations: self.counters.invalidations.load(Ordering::Relaxed),
        }
    }

    /// Number of cached texts and positions.
    #[must_use]
    pub fn len(&self) -> (usize, usize) {
        (self.texts.len(), self.positions.len())
    }

    fn record_insert(&self, evicted: bool) {
        if evicted {
            Counters::bump(&self.counters.evictions);
        }
    }

    fn record_invalidation(&self, removed: bool) {
        if removed {
            Counters::bump(&self.counters.invalidations);
        }
    }
}

impl Lookup for CachedLookup {
    fn lookup_text(&self, id: NodeId) -> Result<String, LookupError> {
        if let Some(text) = self.texts.get(&id) {
            Counters::bump(&self.counters.hits);
            return Ok(text);
        }
        Counters::bump(&self.counters.misses);
        let text = self.inner.lookup_text(id)?;
        if text.is_empty() {
            self.record_invalidation(self.texts.remove(&id));
        } else {
            self.record_insert(self.texts.insert(id, text.clone()));
        }
        Ok(text)
    }

    fn lookup_position(&self, id: NodeId) -> Result<Option<Position>, LookupError> {
        if let Some(position) = self.positions.get(&id) {
            Counters::bump(&self.counters.hits);
            return Ok(Some(position));
        }
        Counters::bump(&self.counters.misses);
        let position = self.inner.lookup_position(id)?;
        match position {
            Some(found) => self.record_insert(self.positions.insert(id, found)),
            None => self.record_invalidation(self.positions.remove(&id)),
        }
        Ok(position)
    }

    fn get_neighbors(
        &self,
        id: NodeId,
        min_confidence: f64,
        min_observations: u64,
    ) -> Result<Vec<Neighbor>, LookupError> {
        self.inner.get_neighbors(id, min_confidence, min_observations)
    }

    fn find_node(&self, text: &str) -> Result<Option<NodeId>, LookupError> {
        self.inner.find_node(text)
    }
}
