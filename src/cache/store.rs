//! Store interface and in-memory implementation

use super::types::{CacheEntry, StoreEvent};
use crate::types::QueryKey;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use tokio::sync::broadcast;

/// Capacity of the change notification channel
const EVENT_CAPACITY: usize = 256;

/// Key-value store for query results with namespace invalidation.
///
/// `update` and `upsert` run their closure under the store's write lock, so a
/// check-then-set inside them is atomic with respect to every other writer.
pub trait QueryStore<V>: Send + Sync {
    /// Get a copy of an entry
    fn get(&self, key: &QueryKey) -> Option<CacheEntry<V>>;

    /// Write a value, clearing any stale mark
    fn set(&self, key: QueryKey, value: V);

    /// Mutate an existing entry in place
    fn update<R, F>(&self, key: &QueryKey, f: F) -> Option<R>
    where
        F: FnOnce(&mut CacheEntry<V>) -> R;

    /// Mutate an entry, creating it with `init` when absent
    fn upsert<R, I, F>(&self, key: QueryKey, init: I, f: F) -> R
    where
        I: FnOnce() -> V,
        F: FnOnce(&mut CacheEntry<V>) -> R;

    /// Mark every entry under `namespace` stale, returning how many were marked
    fn invalidate(&self, namespace: &str) -> usize;

    /// Remove an entry
    fn remove(&self, key: &QueryKey) -> Option<V>;

    /// Keys currently held under a namespace
    fn keys_in(&self, namespace: &str) -> Vec<QueryKey>;

    /// Subscribe to change notifications
    fn subscribe(&self) -> broadcast::Receiver<StoreEvent>;
}

/// In-memory store backed by a `HashMap` and a broadcast channel
pub struct MemoryStore<V> {
    entries: RwLock<HashMap<QueryKey, CacheEntry<V>>>,
    events: broadcast::Sender<StoreEvent>,
}

impl<V> MemoryStore<V> {
    /// Create an empty store
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            entries: RwLock::new(HashMap::new()),
            events,
        }
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn notify(&self, event: StoreEvent) {
        // No receivers is fine
        let _ = self.events.send(event);
    }
}

impl<V> Default for MemoryStore<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> std::fmt::Debug for MemoryStore<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("entries", &self.len())
            .field("subscribers", &self.events.receiver_count())
            .finish()
    }
}

impl<V: Clone + Send + Sync> QueryStore<V> for MemoryStore<V> {
    fn get(&self, key: &QueryKey) -> Option<CacheEntry<V>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set(&self, key: QueryKey, value: V) {
        {
            let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
            entries.insert(key.clone(), CacheEntry::new(value));
        }
        self.notify(StoreEvent::Updated(key));
    }

    fn update<R, F>(&self, key: &QueryKey, f: F) -> Option<R>
    where
        F: FnOnce(&mut CacheEntry<V>) -> R,
    {
        let result = {
            let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
            entries.get_mut(key).map(f)
        };
        if result.is_some() {
            self.notify(StoreEvent::Updated(key.clone()));
        }
        result
    }

    fn upsert<R, I, F>(&self, key: QueryKey, init: I, f: F) -> R
    where
        I: FnOnce() -> V,
        F: FnOnce(&mut CacheEntry<V>) -> R,
    {
        let result = {
            let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
            let entry = entries
                .entry(key.clone())
                .or_insert_with(|| CacheEntry::new(init()));
            f(entry)
        };
        self.notify(StoreEvent::Updated(key));
        result
    }

    fn invalidate(&self, namespace: &str) -> usize {
        let count = {
            let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
            let mut count = 0;
            for (_, entry) in entries
                .iter_mut()
                .filter(|(key, _)| key.in_namespace(namespace))
            {
                entry.mark_stale();
                count += 1;
            }
            count
        };
        self.notify(StoreEvent::Invalidated {
            namespace: namespace.to_string(),
            count,
        });
        count
    }

    fn remove(&self, key: &QueryKey) -> Option<V> {
        let removed = self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key)
            .map(|entry| entry.value);
        if removed.is_some() {
            self.notify(StoreEvent::Removed(key.clone()));
        }
        removed
    }

    fn keys_in(&self, namespace: &str) -> Vec<QueryKey> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .filter(|key| key.in_namespace(namespace))
            .cloned()
            .collect()
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }
}
