//! Pagination types
//!
//! Defines the page wire shape, page requests, and the accumulated
//! `PageSeries` state owned by the engine for one query key.

use crate::error::Error;
use crate::types::{Cursor, Filters};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;

/// Pagination metadata carried on every page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageInfo {
    /// Cursor for the next page; `None` means the list is exhausted
    #[serde(default)]
    pub next_cursor: Option<Cursor>,
    /// Total number of items, only meaningful on the first page
    #[serde(default)]
    pub total: Option<u64>,
}

/// One fetch's worth of items plus pagination metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    /// Items in server order
    pub items: Vec<T>,
    /// Pagination metadata
    #[serde(default)]
    pub pagination: PageInfo,
}

impl<T> Page<T> {
    /// Create a page
    pub fn new(items: Vec<T>, next_cursor: Option<Cursor>, total: Option<u64>) -> Self {
        Self {
            items,
            pagination: PageInfo { next_cursor, total },
        }
    }

    /// Create a final page (no next cursor)
    pub fn last(items: Vec<T>) -> Self {
        Self::new(items, None, None)
    }

    /// Check whether the server reported more pages.
    ///
    /// An empty page with a cursor still has more; only a null cursor ends the list.
    pub fn has_more(&self) -> bool {
        self.pagination.next_cursor.is_some()
    }
}

/// Parameters for a single page fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    /// Cursor to continue from, `None` for the first page
    pub cursor: Option<Cursor>,
    /// Page size
    pub limit: u32,
    /// Filters applied to the list
    pub filters: Filters,
    /// Ask the server for a total count
    pub include_total: bool,
}

impl PageRequest {
    /// Request for the first page. Only the first page asks for a total.
    pub fn first(limit: u32, filters: Filters) -> Self {
        Self {
            cursor: None,
            limit,
            filters,
            include_total: true,
        }
    }

    /// Request for a page after `cursor`
    pub fn after(cursor: Cursor, limit: u32, filters: Filters) -> Self {
        Self {
            cursor: Some(cursor),
            limit,
            filters,
            include_total: false,
        }
    }

    /// Check if this requests the first page
    pub fn is_first(&self) -> bool {
        self.cursor.is_none()
    }
}

/// Result of asking the engine to fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The page was fetched and written into the series
    Applied,
    /// Nothing was fetched (no next page, or a fetch is already in flight)
    Skipped,
    /// The fetch completed but a newer reset or invalidation superseded it
    Superseded,
}

impl FetchOutcome {
    /// Check if the page was applied
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied)
    }
}

/// Accumulated pages for one query key.
///
/// Pages are kept in fetch order inside a sliding window of `max_pages`; the
/// oldest page is evicted first. The total count is taken from the first page
/// only and kept as "last known" once that page is evicted.
#[derive(Debug)]
pub struct PageSeries<T> {
    pages: VecDeque<Arc<Page<T>>>,
    max_pages: usize,
    first_page_resident: bool,
    last_known_total: Option<u64>,
    items: Arc<Vec<T>>,
    pub(crate) fetching_first: Option<u64>,
    pub(crate) fetching_next: Option<u64>,
    pub(crate) error: Option<Arc<Error>>,
    pages_fetched: u64,
}

impl<T> Clone for PageSeries<T> {
    fn clone(&self) -> Self {
        Self {
            pages: self.pages.clone(),
            max_pages: self.max_pages,
            first_page_resident: self.first_page_resident,
            last_known_total: self.last_known_total,
            items: Arc::clone(&self.items),
            fetching_first: self.fetching_first,
            fetching_next: self.fetching_next,
            error: self.error.clone(),
            pages_fetched: self.pages_fetched,
        }
    }
}

impl<T: Clone> PageSeries<T> {
    /// Create an empty series holding at most `max_pages` pages (minimum 1)
    pub fn new(max_pages: usize) -> Self {
        Self {
            pages: VecDeque::new(),
            max_pages: max_pages.max(1),
            first_page_resident: false,
            last_known_total: None,
            items: Arc::new(Vec::new()),
            fetching_first: None,
            fetching_next: None,
            error: None,
            pages_fetched: 0,
        }
    }

    /// Replace every page with a freshly fetched first page
    pub fn reset_with(&mut self, page: Page<T>) {
        self.last_known_total = page.pagination.total;
        self.pages.clear();
        self.pages.push_back(Arc::new(page));
        self.first_page_resident = true;
        self.pages_fetched = 1;
        self.error = None;
        self.rebuild_items();
    }

    /// Append a page, evicting from the front past `max_pages`
    pub fn append(&mut self, page: Page<T>) {
        self.pages.push_back(Arc::new(page));
        self.pages_fetched += 1;
        while self.pages.len() > self.max_pages {
            self.pages.pop_front();
            self.first_page_resident = false;
        }
        self.error = None;
        self.rebuild_items();
    }

    fn rebuild_items(&mut self) {
        let items = self
            .pages
            .iter()
            .flat_map(|page| page.items.iter().cloned())
            .collect();
        self.items = Arc::new(items);
    }
}

impl<T> PageSeries<T> {
    /// Resident pages in fetch order
    pub fn pages(&self) -> impl Iterator<Item = &Arc<Page<T>>> {
        self.pages.iter()
    }

    /// Number of resident pages
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    /// Check if no page has been fetched yet
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Retention bound
    pub fn max_pages(&self) -> usize {
        self.max_pages
    }

    /// Pages fetched since the last reset, evicted ones included
    pub fn pages_fetched(&self) -> u64 {
        self.pages_fetched
    }

    /// Concatenation of all resident pages' items in fetch order.
    ///
    /// The same `Arc` is returned until the page set changes.
    pub fn flatten(&self) -> Arc<Vec<T>> {
        Arc::clone(&self.items)
    }

    /// Total count from the first page, or the last known value once it was evicted
    pub fn total_count(&self) -> u64 {
        if self.first_page_resident {
            if let Some(total) = self.pages.front().and_then(|p| p.pagination.total) {
                return total;
            }
        }
        self.last_known_total.unwrap_or(0)
    }

    /// Check if the total count can no longer be refreshed from a resident first page
    pub fn is_total_stale(&self) -> bool {
        !self.pages.is_empty() && !self.first_page_resident
    }

    /// Check whether the most recent page has a next cursor
    pub fn has_next_page(&self) -> bool {
        self.pages.back().is_some_and(|page| page.has_more())
    }

    /// Cursor to continue from
    pub fn next_cursor(&self) -> Option<&Cursor> {
        self.pages.back()?.pagination.next_cursor.as_ref()
    }

    /// Check if a first-page fetch is in flight
    pub fn is_fetching_first(&self) -> bool {
        self.fetching_first.is_some()
    }

    /// Check if a next-page fetch is in flight
    pub fn is_fetching_next(&self) -> bool {
        self.fetching_next.is_some()
    }

    /// Last fetch failure, cleared by the next successful fetch
    pub fn error(&self) -> Option<&Arc<Error>> {
        self.error.as_ref()
    }
}

/// Read-only view of a series, as handed to list views
#[derive(Debug)]
pub struct SeriesSnapshot<T> {
    /// Flattened items of all resident pages
    pub items: Arc<Vec<T>>,
    /// Resident pages in fetch order
    pub pages: Vec<Arc<Page<T>>>,
    /// Total count (see [`PageSeries::total_count`])
    pub total_count: u64,
    /// Whether another page can be fetched
    pub has_next_page: bool,
    /// No data yet and the first page is loading
    pub is_loading: bool,
    /// Any fetch for this key is in flight
    pub is_fetching: bool,
    /// A next-page fetch is in flight
    pub is_fetching_next_page: bool,
    /// Last fetch failure
    pub error: Option<Arc<Error>>,
    /// The series was invalidated and will be refetched on next read
    pub is_stale: bool,
}

impl<T> SeriesSnapshot<T> {
    /// Snapshot of a stored series
    pub fn from_series(series: &PageSeries<T>, is_stale: bool) -> Self {
        let is_fetching_first = series.is_fetching_first();
        let is_fetching_next = series.is_fetching_next();
        Self {
            items: Arc::clone(&series.items),
            pages: series.pages.iter().cloned().collect(),
            total_count: series.total_count(),
            has_next_page: series.has_next_page(),
            is_loading: series.is_empty() && is_fetching_first,
            is_fetching: is_fetching_first || is_fetching_next,
            is_fetching_next_page: is_fetching_next,
            error: series.error.clone(),
            is_stale,
        }
    }

    /// Snapshot for a key nothing has been fetched for
    pub fn empty() -> Self {
        Self {
            items: Arc::new(Vec::new()),
            pages: Vec::new(),
            total_count: 0,
            has_next_page: false,
            is_loading: false,
            is_fetching: false,
            is_fetching_next_page: false,
            error: None,
            is_stale: false,
        }
    }

    /// Check if the last fetch failed
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

impl<T> Clone for SeriesSnapshot<T> {
    fn clone(&self) -> Self {
        Self {
            items: Arc::clone(&self.items),
            pages: self.pages.clone(),
            total_count: self.total_count,
            has_next_page: self.has_next_page,
            is_loading: self.is_loading,
            is_fetching: self.is_fetching,
            is_fetching_next_page: self.is_fetching_next_page,
            error: self.error.clone(),
            is_stale: self.is_stale,
        }
    }
}
