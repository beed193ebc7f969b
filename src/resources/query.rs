//! Shared list-view contract
//!
//! Every resource list is the same thing: a typed filter record and a page
//! size bound to one engine series, read back as a [`ListView`].

use crate::error::Result;
use crate::pagination::{
    CursorPaginationEngine, EngineConfig, FetchOutcome, PageFetcher, SeriesSnapshot,
    DEFAULT_LIMIT, DEFAULT_MAX_PAGES,
};
use crate::types::{Filters, QueryKey};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::ops::Deref;
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// Resource
// ============================================================================

/// A cursor-paginated resource exposed by the dashboard API
pub trait Resource: Send + Sync + 'static {
    /// Cache namespace, also the invalidation unit
    const NAMESPACE: &'static str;

    /// Page size when none is configured
    const DEFAULT_LIMIT: u32 = DEFAULT_LIMIT;

    /// Resident pages when none is configured
    const DEFAULT_MAX_PAGES: usize = DEFAULT_MAX_PAGES;

    /// Automatic retries of a failed page fetch
    const DEFAULT_RETRY: u32 = 1;

    /// List item
    type Item: Serialize + DeserializeOwned + Clone + Send + Sync + 'static;

    /// Typed filter record
    type Filters: Serialize + DeserializeOwned + Clone + Default + Send + Sync + 'static;

    /// List endpoint path
    fn path() -> &'static str;

    /// Engine configuration from the resource defaults
    fn engine_config() -> EngineConfig {
        EngineConfig::new()
            .with_max_pages(Self::DEFAULT_MAX_PAGES)
            .with_retry(Self::DEFAULT_RETRY)
            .with_retry_backoff(Duration::from_millis(250))
    }
}

// ============================================================================
// List View
// ============================================================================

/// Read side of one resource list.
///
/// Dereferences to the underlying [`SeriesSnapshot`]; resources add a named
/// projection of `items` (e.g. `events()`), which is the same `Arc`.
#[derive(Debug)]
pub struct ListView<T> {
    snapshot: SeriesSnapshot<T>,
}

impl<T> ListView<T> {
    /// Wrap a snapshot
    pub fn new(snapshot: SeriesSnapshot<T>) -> Self {
        Self { snapshot }
    }

    /// Unwrap into the snapshot
    pub fn into_snapshot(self) -> SeriesSnapshot<T> {
        self.snapshot
    }
}

impl<T> Deref for ListView<T> {
    type Target = SeriesSnapshot<T>;

    fn deref(&self) -> &Self::Target {
        &self.snapshot
    }
}

impl<T> Clone for ListView<T> {
    fn clone(&self) -> Self {
        Self {
            snapshot: self.snapshot.clone(),
        }
    }
}

// ============================================================================
// Resource Query
// ============================================================================

/// One resource list bound to an engine and a fetcher.
///
/// Changing filters or limit switches to a different series that starts from
/// empty; the previous one stays cached and any late result for it lands there.
pub struct ResourceQuery<R: Resource> {
    engine: Arc<CursorPaginationEngine<R::Item>>,
    fetcher: Arc<dyn PageFetcher<R::Item>>,
    filters: R::Filters,
    key: QueryKey,
}

impl<R: Resource> ResourceQuery<R> {
    /// Create a query for `filters` and `limit`
    pub fn new(
        engine: Arc<CursorPaginationEngine<R::Item>>,
        fetcher: Arc<dyn PageFetcher<R::Item>>,
        filters: R::Filters,
        limit: u32,
    ) -> Result<Self> {
        let key = Self::key_for(&filters, limit)?;
        Ok(Self {
            engine,
            fetcher,
            filters,
            key,
        })
    }

    /// Create a query with default filters and the resource's default limit
    pub fn with_defaults(
        engine: Arc<CursorPaginationEngine<R::Item>>,
        fetcher: Arc<dyn PageFetcher<R::Item>>,
    ) -> Result<Self> {
        Self::new(engine, fetcher, R::Filters::default(), R::DEFAULT_LIMIT)
    }

    fn key_for(filters: &R::Filters, limit: u32) -> Result<QueryKey> {
        QueryKey::new(R::NAMESPACE, Filters::from_serializable(filters)?, limit)
    }

    /// Key of the current series
    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    /// Current filters
    pub fn filters(&self) -> &R::Filters {
        &self.filters
    }

    /// Current page size
    pub fn limit(&self) -> u32 {
        self.key.limit()
    }

    /// The engine backing this query
    pub fn engine(&self) -> &Arc<CursorPaginationEngine<R::Item>> {
        &self.engine
    }

    /// Fetch the first page if the series is absent or stale, then return the view
    pub async fn load(&self) -> Result<ListView<R::Item>> {
        let snapshot = self.engine.read(&self.key, self.fetcher.as_ref()).await?;
        Ok(ListView::new(snapshot))
    }

    /// Fetch the next page
    pub async fn fetch_next_page(&self) -> Result<FetchOutcome> {
        self.engine
            .fetch_next_page(&self.key, self.fetcher.as_ref())
            .await
    }

    /// Restart the series from the first page
    pub async fn refetch(&self) -> Result<FetchOutcome> {
        self.engine.refetch(&self.key, self.fetcher.as_ref()).await
    }

    /// Switch to a different filter set.
    ///
    /// The series for the new filters always starts from empty, even when it
    /// was loaded before.
    pub fn set_filters(&mut self, filters: R::Filters) -> Result<()> {
        let key = Self::key_for(&filters, self.key.limit())?;
        self.switch_to(key);
        self.filters = filters;
        Ok(())
    }

    /// Switch to a different page size, starting that series from empty
    pub fn set_limit(&mut self, limit: u32) -> Result<()> {
        let key = Self::key_for(&self.filters, limit)?;
        self.switch_to(key);
        Ok(())
    }

    fn switch_to(&mut self, key: QueryKey) {
        if key == self.key {
            return;
        }
        // Drops the old pages and supersedes fetches still in flight for it
        self.engine.remove(&key);
        self.key = key;
    }

    /// Current view without fetching
    pub fn view(&self) -> ListView<R::Item> {
        ListView::new(self.engine.snapshot(&self.key))
    }

    /// Invalidate every series of this resource
    pub fn invalidate(&self) -> usize {
        self.engine.invalidate(R::NAMESPACE)
    }
}

impl<R: Resource> std::fmt::Debug for ResourceQuery<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceQuery")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}
