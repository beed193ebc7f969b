//! Cache entry and change notification types

use crate::types::QueryKey;
use std::time::Instant;

/// A stored value with freshness tracking
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// The cached value
    pub value: V,
    /// Set by invalidation; the next read must refetch
    pub stale: bool,
    /// When the value was last written
    pub updated_at: Instant,
}

impl<V> CacheEntry<V> {
    /// Create a fresh entry
    pub fn new(value: V) -> Self {
        Self {
            value,
            stale: false,
            updated_at: Instant::now(),
        }
    }

    /// Mark the entry as needing a refetch
    pub fn mark_stale(&mut self) {
        self.stale = true;
    }

    /// Mark the entry as freshly written
    pub fn touch(&mut self) {
        self.stale = false;
        self.updated_at = Instant::now();
    }
}

/// Change notification sent to store subscribers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    /// An entry was written
    Updated(QueryKey),
    /// Every entry under a namespace was marked stale
    Invalidated {
        /// Namespace that was invalidated
        namespace: String,
        /// Number of entries affected
        count: usize,
    },
    /// An entry was removed
    Removed(QueryKey),
}

impl StoreEvent {
    /// Check whether this event concerns a namespace
    pub fn touches(&self, namespace: &str) -> bool {
        match self {
            Self::Updated(key) | Self::Removed(key) => key.in_namespace(namespace),
            Self::Invalidated { namespace: ns, .. } => ns == namespace,
        }
    }
}
