//! Tests for cache module

use super::*;
use crate::types::{Filters, QueryKey};

fn key(namespace: &str, limit: u32) -> QueryKey {
    QueryKey::new(namespace, Filters::new(), limit).unwrap()
}

// ============================================================================
// MemoryStore Tests
// ============================================================================

#[test]
fn test_set_and_get() {
    let store: MemoryStore<u32> = MemoryStore::new();
    assert!(store.is_empty());

    store.set(key("events", 50), 7);

    let entry = store.get(&key("events", 50)).unwrap();
    assert_eq!(entry.value, 7);
    assert!(!entry.stale);
    assert!(store.get(&key("events", 25)).is_none());
    assert_eq!(store.len(), 1);
}

#[test]
fn test_update_missing_returns_none() {
    let store: MemoryStore<u32> = MemoryStore::new();
    assert!(store.update(&key("jobs", 50), |e| e.value += 1).is_none());

    store.set(key("jobs", 50), 1);
    assert_eq!(
        store.update(&key("jobs", 50), |e| {
            e.value += 1;
            e.value
        }),
        Some(2)
    );
}

#[test]
fn test_upsert_creates_once() {
    let store: MemoryStore<Vec<u32>> = MemoryStore::new();

    store.upsert(key("alerts", 10), Vec::new, |e| e.value.push(1));
    store.upsert(key("alerts", 10), || vec![99], |e| e.value.push(2));

    assert_eq!(store.get(&key("alerts", 10)).unwrap().value, vec![1, 2]);
}

#[test]
fn test_invalidate_marks_namespace_only() {
    let store: MemoryStore<u32> = MemoryStore::new();
    store.set(key("alerts", 10), 1);
    store.set(key("alerts", 20), 2);
    store.set(key("events", 10), 3);

    assert_eq!(store.invalidate("alerts"), 2);

    assert!(store.get(&key("alerts", 10)).unwrap().stale);
    assert!(store.get(&key("alerts", 20)).unwrap().stale);
    assert!(!store.get(&key("events", 10)).unwrap().stale);

    // Writing clears the mark
    store.set(key("alerts", 10), 4);
    assert!(!store.get(&key("alerts", 10)).unwrap().stale);
}

#[test]
fn test_keys_in_and_remove() {
    let store: MemoryStore<u32> = MemoryStore::new();
    store.set(key("jobs", 10), 1);
    store.set(key("jobs", 20), 2);
    store.set(key("events", 10), 3);

    let mut keys = store.keys_in("jobs");
    keys.sort_by_key(QueryKey::limit);
    assert_eq!(keys, vec![key("jobs", 10), key("jobs", 20)]);

    assert_eq!(store.remove(&key("jobs", 10)), Some(1));
    assert_eq!(store.remove(&key("jobs", 10)), None);
    assert_eq!(store.keys_in("jobs").len(), 1);
}

// ============================================================================
// Subscription Tests
// ============================================================================

#[tokio::test]
async fn test_subscribe_receives_events() {
    let store: MemoryStore<u32> = MemoryStore::new();
    let mut rx = store.subscribe();

    store.set(key("alerts", 10), 1);
    store.invalidate("alerts");
    store.remove(&key("alerts", 10));

    assert_eq!(rx.recv().await.unwrap(), StoreEvent::Updated(key("alerts", 10)));
    assert_eq!(
        rx.recv().await.unwrap(),
        StoreEvent::Invalidated {
            namespace: "alerts".to_string(),
            count: 1
        }
    );
    let removed = rx.recv().await.unwrap();
    assert_eq!(removed, StoreEvent::Removed(key("alerts", 10)));
    assert!(removed.touches("alerts"));
    assert!(!removed.touches("events"));
}
