//! Cursor pagination engine
//!
//! Turns a cursor-based list endpoint into an accumulating, memory-bounded
//! page sequence per [`QueryKey`].
//!
//! Staleness is handled by key identity plus a per-key [`StalenessGuard`]:
//! - a filter or limit change is a different key, so late results land in a
//!   series nobody reads anymore;
//! - `fetch_first_page` and `invalidate` supersede in-flight fetches for the
//!   same key, whose results are then dropped as [`FetchOutcome::Superseded`].
//!
//! Single-flight: the "check in-flight, then mark in-flight" step runs inside
//! one store update, so two near-simultaneous `fetch_next_page` calls issue
//! exactly one request.

use super::fetcher::PageFetcher;
use super::types::{FetchOutcome, Page, PageRequest, PageSeries, SeriesSnapshot};
use crate::cache::{MemoryStore, QueryStore};
use crate::error::{Error, Result};
use crate::staleness::{RequestToken, StalenessGuard};
use crate::types::QueryKey;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, warn};

/// Page size used when a resource does not specify one
pub const DEFAULT_LIMIT: u32 = 50;

/// Default retention bound, in pages
pub const DEFAULT_MAX_PAGES: usize = 10;

// ============================================================================
// Configuration
// ============================================================================

/// Engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Maximum resident pages per series
    pub max_pages: usize,
    /// Automatic retries of a failed page fetch before the error surfaces
    pub retry: u32,
    /// Base delay between retries (grows linearly per attempt)
    pub retry_backoff: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_pages: DEFAULT_MAX_PAGES,
            retry: 1,
            retry_backoff: Duration::from_millis(250),
        }
    }
}

impl EngineConfig {
    /// Create a default config
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the retention bound (minimum 1)
    #[must_use]
    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages.max(1);
        self
    }

    /// Set the automatic retry count
    #[must_use]
    pub fn with_retry(mut self, retry: u32) -> Self {
        self.retry = retry;
        self
    }

    /// Set the retry backoff
    #[must_use]
    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }
}

// ============================================================================
// Engine
// ============================================================================

/// Generic cursor pagination engine, one per item type
pub struct CursorPaginationEngine<T, S = MemoryStore<PageSeries<T>>> {
    store: Arc<S>,
    config: EngineConfig,
    guards: Mutex<HashMap<QueryKey, Arc<StalenessGuard>>>,
    flight_ids: AtomicU64,
    _items: PhantomData<fn() -> T>,
}

impl<T> CursorPaginationEngine<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create an engine backed by an in-memory store
    pub fn new(config: EngineConfig) -> Self {
        Self::with_store(Arc::new(MemoryStore::new()), config)
    }
}

impl<T, S> CursorPaginationEngine<T, S>
where
    T: Clone + Send + Sync + 'static,
    S: QueryStore<PageSeries<T>>,
{
    /// Create an engine over an existing store
    pub fn with_store(store: Arc<S>, config: EngineConfig) -> Self {
        Self {
            store,
            config,
            guards: Mutex::new(HashMap::new()),
            flight_ids: AtomicU64::new(0),
            _items: PhantomData,
        }
    }

    /// Engine configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Underlying store
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Fetch the first page and replace the series for `key` with it.
    ///
    /// Supersedes any fetch already in flight for `key`. On failure the
    /// existing pages stay untouched and the error is recorded on the series.
    pub async fn fetch_first_page<F>(&self, key: &QueryKey, fetcher: &F) -> Result<FetchOutcome>
    where
        F: PageFetcher<T> + ?Sized,
    {
        let guard = self.guard(key);
        let token = guard.begin();
        let flight = self.next_flight_id();
        let max_pages = self.config.max_pages;

        self.store.upsert(
            key.clone(),
            || PageSeries::new(max_pages),
            |entry| {
                entry.value.fetching_first = Some(flight);
                // The previous cursor chain is abandoned
                entry.value.fetching_next = None;
            },
        );
        let mut in_flight = FlightGuard::<T, S>::new(&*self.store, key, flight, Flight::First);

        debug!(key = %key, "fetching first page");
        let request = PageRequest::first(key.limit(), key.filters().clone());
        let result = self
            .fetch_with_retry(key, fetcher, request, &guard, token)
            .await;
        in_flight.disarm();

        let outcome = self
            .store
            .update(key, |entry| {
                let series = &mut entry.value;
                if series.fetching_first == Some(flight) {
                    series.fetching_first = None;
                }
                if !guard.is_current(token) {
                    return Ok(FetchOutcome::Superseded);
                }
                match result {
                    Ok(page) => {
                        series.reset_with(page);
                        entry.touch();
                        Ok(FetchOutcome::Applied)
                    }
                    Err(e) => {
                        let shared = Arc::new(e);
                        series.error = Some(Arc::clone(&shared));
                        Err(Error::Shared(shared))
                    }
                }
            })
            .unwrap_or(Ok(FetchOutcome::Superseded));

        self.log_outcome(key, "first", &outcome);
        outcome
    }

    /// Fetch the page after the last resident one and append it.
    ///
    /// No-op ([`FetchOutcome::Skipped`]) when the series has no next page, was
    /// invalidated, or a fetch for `key` is already in flight. Failures leave the pages and
    /// `has_next_page` untouched so the call can be retried.
    pub async fn fetch_next_page<F>(&self, key: &QueryKey, fetcher: &F) -> Result<FetchOutcome>
    where
        F: PageFetcher<T> + ?Sized,
    {
        let guard = self.guard(key);
        let token = guard.current();
        let flight = self.next_flight_id();

        let cursor = self
            .store
            .update(key, |entry| {
                // An invalidated series restarts from the first page on its next read
                if entry.stale {
                    return None;
                }
                let series = &mut entry.value;
                if series.is_fetching_first() || series.is_fetching_next() {
                    return None;
                }
                let cursor = series.next_cursor().cloned()?;
                series.fetching_next = Some(flight);
                Some(cursor)
            })
            .flatten();

        let Some(cursor) = cursor else {
            debug!(key = %key, "next page skipped");
            return Ok(FetchOutcome::Skipped);
        };
        let mut in_flight = FlightGuard::<T, S>::new(&*self.store, key, flight, Flight::Next);

        debug!(key = %key, cursor = %cursor, "fetching next page");
        let request = PageRequest::after(cursor, key.limit(), key.filters().clone());
        let result = self
            .fetch_with_retry(key, fetcher, request, &guard, token)
            .await;
        in_flight.disarm();

        let outcome = self
            .store
            .update(key, |entry| {
                let series = &mut entry.value;
                if series.fetching_next == Some(flight) {
                    series.fetching_next = None;
                }
                if !guard.is_current(token) {
                    return Ok(FetchOutcome::Superseded);
                }
                match result {
                    Ok(page) => {
                        series.append(page);
                        Ok(FetchOutcome::Applied)
                    }
                    Err(e) => {
                        let shared = Arc::new(e);
                        series.error = Some(Arc::clone(&shared));
                        Err(Error::Shared(shared))
                    }
                }
            })
            .unwrap_or(Ok(FetchOutcome::Superseded));

        self.log_outcome(key, "next", &outcome);
        outcome
    }

    /// Unconditionally restart the series from the first page
    pub async fn refetch<F>(&self, key: &QueryKey, fetcher: &F) -> Result<FetchOutcome>
    where
        F: PageFetcher<T> + ?Sized,
    {
        self.fetch_first_page(key, fetcher).await
    }

    /// Snapshot of the series, fetching the first page when the series is
    /// absent, invalidated, or never loaded successfully
    pub async fn read<F>(&self, key: &QueryKey, fetcher: &F) -> Result<SeriesSnapshot<T>>
    where
        F: PageFetcher<T> + ?Sized,
    {
        let needs_fetch = match self.store.get(key) {
            None => true,
            Some(entry) => {
                entry.stale || (entry.value.is_empty() && !entry.value.is_fetching_first())
            }
        };
        if needs_fetch {
            self.fetch_first_page(key, fetcher).await?;
        }
        Ok(self.snapshot(key))
    }

    /// Mark every series in `namespace` as needing a fresh first page and
    /// drop the results of fetches currently in flight for them
    pub fn invalidate(&self, namespace: &str) -> usize {
        {
            let guards = self.guards.lock().unwrap_or_else(PoisonError::into_inner);
            for (key, guard) in guards.iter() {
                if key.in_namespace(namespace) {
                    guard.clear();
                }
            }
        }
        let count = self.store.invalidate(namespace);
        debug!(namespace, count, "invalidated series");
        count
    }

    /// Forget a series entirely
    pub fn remove(&self, key: &QueryKey) {
        if let Some(guard) = self
            .guards
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key)
        {
            guard.clear();
        }
        self.store.remove(key);
    }

    /// Current view of a series
    pub fn snapshot(&self, key: &QueryKey) -> SeriesSnapshot<T> {
        self.store
            .get(key)
            .map_or_else(SeriesSnapshot::empty, |entry| {
                SeriesSnapshot::from_series(&entry.value, entry.stale)
            })
    }

    /// Flattened items of a series
    pub fn flatten(&self, key: &QueryKey) -> Arc<Vec<T>> {
        self.store
            .get(key)
            .map_or_else(|| Arc::new(Vec::new()), |entry| entry.value.flatten())
    }

    /// Total count of a series, 0 before any fetch
    pub fn total_count(&self, key: &QueryKey) -> u64 {
        self.store
            .get(key)
            .map_or(0, |entry| entry.value.total_count())
    }

    /// Check whether a series can fetch another page
    pub fn has_next_page(&self, key: &QueryKey) -> bool {
        self.store
            .get(key)
            .is_some_and(|entry| entry.value.has_next_page())
    }

    async fn fetch_with_retry<F>(
        &self,
        key: &QueryKey,
        fetcher: &F,
        request: PageRequest,
        guard: &StalenessGuard,
        token: RequestToken,
    ) -> Result<Page<T>>
    where
        F: PageFetcher<T> + ?Sized,
    {
        let mut attempt = 0;
        loop {
            match fetcher.fetch_page(request.clone()).await {
                Ok(page) => return Ok(page),
                Err(e) if attempt < self.config.retry && !e.is_conflict() => {
                    if !guard.is_current(token) {
                        return Err(e);
                    }
                    attempt += 1;
                    let delay = self.config.retry_backoff * attempt;
                    warn!(
                        key = %key,
                        error = %e,
                        "page fetch failed, attempt {}/{}, retrying in {:?}",
                        attempt,
                        self.config.retry + 1,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn guard(&self, key: &QueryKey) -> Arc<StalenessGuard> {
        let mut guards = self.guards.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(guards.entry(key.clone()).or_default())
    }

    fn next_flight_id(&self) -> u64 {
        self.flight_ids.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn log_outcome(&self, key: &QueryKey, which: &str, outcome: &Result<FetchOutcome>) {
        match outcome {
            Ok(FetchOutcome::Superseded) => {
                debug!(key = %key, "discarding superseded {which} page");
            }
            Ok(_) => {}
            Err(e) => warn!(key = %key, error = %e, "{which} page fetch failed"),
        }
    }
}

impl<T, S> std::fmt::Debug for CursorPaginationEngine<T, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CursorPaginationEngine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// In-flight bookkeeping
// ============================================================================

#[derive(Debug, Clone, Copy)]
enum Flight {
    First,
    Next,
}

/// Clears an in-flight mark if the fetching future is dropped mid-request
struct FlightGuard<'a, T, S: QueryStore<PageSeries<T>>> {
    store: &'a S,
    key: &'a QueryKey,
    flight: u64,
    kind: Flight,
    armed: bool,
    _items: PhantomData<fn() -> T>,
}

impl<'a, T, S: QueryStore<PageSeries<T>>> FlightGuard<'a, T, S> {
    fn new(store: &'a S, key: &'a QueryKey, flight: u64, kind: Flight) -> Self {
        Self {
            store,
            key,
            flight,
            kind,
            armed: true,
            _items: PhantomData,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl<T, S: QueryStore<PageSeries<T>>> Drop for FlightGuard<'_, T, S> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let (flight, kind) = (self.flight, self.kind);
        self.store.update(self.key, |entry| {
            let slot = match kind {
                Flight::First => &mut entry.value.fetching_first,
                Flight::Next => &mut entry.value.fetching_next,
            };
            if *slot == Some(flight) {
                *slot = None;
            }
        });
    }
}
