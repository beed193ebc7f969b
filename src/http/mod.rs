//! HTTP transport module
//!
//! The concrete transport behind the paginated reads and alert mutations.
//!
//! # Features
//!
//! - **Automatic Retries**: Configurable retry logic with backoff
//! - **Rate Limiting**: Token bucket rate limiter using governor
//! - **Conflict Mapping**: HTTP 409 surfaces as `Error::Conflict`
//! - **Page Fetching**: `HttpPageFetcher` speaks the cursor list protocol

mod client;
mod fetcher;
mod rate_limit;

pub use client::{ApiClient, ApiClientConfig};
pub use fetcher::HttpPageFetcher;
pub use rate_limit::{RateLimiter, RateLimiterConfig};

#[cfg(test)]
mod tests;
