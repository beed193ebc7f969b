//! Pagination module
//!
//! Cursor-based pagination with bounded retention.
//!
//! # Overview
//!
//! The pagination module provides:
//! - `Page` / `PageInfo` - The server response unit
//! - `PageFetcher` - Uniform `(cursor, limit, filters) -> Page` contract
//! - `PageSeries` - Accumulated pages for one query key (sliding window)
//! - `CursorPaginationEngine` - Fetch first/next page, invalidate, flatten
//!
//! The engine never inspects a cursor; it only forwards the one carried on
//! the most recent page.

mod engine;
mod fetcher;
mod types;

pub use engine::{CursorPaginationEngine, EngineConfig, DEFAULT_LIMIT, DEFAULT_MAX_PAGES};
pub use fetcher::{fetcher_fn, FnFetcher, PageFetcher};
pub use types::{FetchOutcome, Page, PageInfo, PageRequest, PageSeries, SeriesSnapshot};
