//! # dashfeed
//!
//! Asynchronous read/write consistency core for a monitoring dashboard.
//!
//! ## Features
//!
//! - **Cursor Pagination**: Accumulating, memory-bounded page series per query key
//! - **Stale-Request Guarding**: Out-of-order completions never overwrite newer state
//! - **Conflict Handling**: Version conflicts as observable state with bounded retry
//! - **Resources**: Events, audit logs, jobs and alerts over one shared contract
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use dashfeed::{DashboardConfig, DataLayer, EventFilters, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = DashboardConfig::from_file("dashfeed.yaml")?;
//!     let layer = DataLayer::new(config)?;
//!
//!     let events = layer.events(EventFilters::default().with_severity("critical"))?;
//!     let view = events.load().await?;
//!     println!("{} of {} events", view.events().len(), view.total_count);
//!
//!     if view.has_next_page {
//!         events.fetch_next_page().await?;
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  Resources: events │ audit_logs │ jobs │ alerts (+ actions)  │
//! └──────────────────────────────┬───────────────────────────────┘
//!                                │
//! ┌──────────────┬───────────────┴──────┬────────────┬───────────┐
//! │  Pagination  │     Staleness        │  Conflict  │   Cache   │
//! ├──────────────┼──────────────────────┼────────────┼───────────┤
//! │ PageSeries   │ StalenessGuard       │ run/retry  │ QueryStore│
//! │ Engine       │ DebouncedPreview     │ clear      │ Memory    │
//! └──────────────┴──────────────────────┴────────────┴───────────┘
//!                                │
//!                    HTTP: ApiClient + HttpPageFetcher
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]
#![allow(missing_docs)] // TODO: Document resource item fields before 1.0

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common types and type aliases
pub mod types;

/// Query store and cache entries
pub mod cache;

/// Cursor pagination engine
pub mod pagination;

/// Stale-request guarding and debounced previews
pub mod staleness;

/// Optimistic-locking conflict handling
pub mod conflict;

/// HTTP client with retry and rate limiting
pub mod http;

/// Dashboard resources and the data layer
pub mod resources;

/// Configuration
pub mod config;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result, ResultExt};
pub use types::*;

pub use config::DashboardConfig;
pub use conflict::{ConflictRetryController, ConflictState};
pub use pagination::{CursorPaginationEngine, FetchOutcome, Page, PageFetcher, PageRequest};
pub use resources::{
    AlertFilters, AlertPatch, AuditLogFilters, DataLayer, EventFilters, JobFilters, ListView,
    Resource, ResourceKind, ResourceQuery,
};
pub use staleness::{DebouncedPreview, StalenessGuard};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
