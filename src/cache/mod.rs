//! Query cache module
//!
//! Holds the results of list queries keyed by [`QueryKey`](crate::types::QueryKey)
//! and notifies subscribers when entries change.
//!
//! # Overview
//!
//! The cache module provides:
//! - `QueryStore` - The store interface the pagination engine writes through
//! - `MemoryStore` - In-memory map + broadcast channel implementation
//! - `CacheEntry` / `StoreEvent` - Stored values and change notifications

mod store;
mod types;

pub use store::{MemoryStore, QueryStore};
pub use types::{CacheEntry, StoreEvent};

#[cfg(test)]
mod tests;
