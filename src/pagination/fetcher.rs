//! Page fetcher contract
//!
//! Wraps a resource-specific network call into the uniform
//! `(cursor, limit, filters) -> Page` contract the engine consumes.

use super::types::{Page, PageRequest};
use crate::error::Result;
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;

/// Fetches one page of a cursor-paginated list.
///
/// Implementations must behave like an idempotent GET: the engine may call
/// them again for the same request after a failure.
#[async_trait]
pub trait PageFetcher<T>: Send + Sync {
    /// Fetch a single page
    async fn fetch_page(&self, request: PageRequest) -> Result<Page<T>>;
}

#[async_trait]
impl<T, F> PageFetcher<T> for Arc<F>
where
    T: Send + 'static,
    F: PageFetcher<T> + ?Sized,
{
    async fn fetch_page(&self, request: PageRequest) -> Result<Page<T>> {
        (**self).fetch_page(request).await
    }
}

/// Adapter turning an async closure into a [`PageFetcher`]
#[derive(Clone)]
pub struct FnFetcher<F> {
    f: F,
}

impl<F> FnFetcher<F> {
    /// Wrap a closure
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> std::fmt::Debug for FnFetcher<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnFetcher").finish_non_exhaustive()
    }
}

#[async_trait]
impl<T, F, Fut> PageFetcher<T> for FnFetcher<F>
where
    T: Send + 'static,
    F: Fn(PageRequest) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Page<T>>> + Send,
{
    async fn fetch_page(&self, request: PageRequest) -> Result<Page<T>> {
        (self.f)(request).await
    }
}

/// Build a fetcher from an async closure
pub fn fetcher_fn<F>(f: F) -> FnFetcher<F> {
    FnFetcher::new(f)
}
