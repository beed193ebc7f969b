//! Conflict retry controller

use super::types::ConflictState;
use crate::error::{Error, Result};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

/// Default bound on user-initiated retries
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Decides whether an error is a version conflict
pub type ConflictClassifier = Arc<dyn Fn(&Error) -> bool + Send + Sync>;

type ConflictCallback = Arc<dyn Fn(&Error) + Send + Sync>;
type ExhaustedCallback = Arc<dyn Fn(&ConflictState) + Send + Sync>;

#[derive(Debug, Default)]
struct Inner {
    state: ConflictState,
    exhausted_notified: bool,
}

/// Executes mutations and tracks version conflicts.
///
/// `retry_count` accumulates across conflict episodes and only returns to 0
/// on [`clear_conflict`](Self::clear_conflict). The exhausted callback fires
/// at most once per episode.
pub struct ConflictRetryController {
    max_retries: u32,
    inner: Mutex<Inner>,
    classifier: ConflictClassifier,
    on_conflict: Option<ConflictCallback>,
    on_exhausted: Option<ExhaustedCallback>,
}

impl ConflictRetryController {
    /// Create a controller allowing `max_retries` retries
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            inner: Mutex::new(Inner::default()),
            classifier: Arc::new(Error::is_conflict),
            on_conflict: None,
            on_exhausted: None,
        }
    }

    /// Replace the conflict classifier (default: [`Error::is_conflict`])
    #[must_use]
    pub fn with_classifier<F>(mut self, classifier: F) -> Self
    where
        F: Fn(&Error) -> bool + Send + Sync + 'static,
    {
        self.classifier = Arc::new(classifier);
        self
    }

    /// Callback invoked each time a conflict is recorded
    #[must_use]
    pub fn on_conflict<F>(mut self, callback: F) -> Self
    where
        F: Fn(&Error) + Send + Sync + 'static,
    {
        self.on_conflict = Some(Arc::new(callback));
        self
    }

    /// Callback invoked when a retry is refused because the bound was reached
    #[must_use]
    pub fn on_exhausted<F>(mut self, callback: F) -> Self
    where
        F: Fn(&ConflictState) + Send + Sync + 'static,
    {
        self.on_exhausted = Some(Arc::new(callback));
        self
    }

    /// Execute a mutation.
    ///
    /// Success resolves any recorded conflict. A conflict is recorded and
    /// returned as [`Error::Shared`]; other failures pass through untouched.
    pub async fn run<T, F, Fut>(&self, operation: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        match operation().await {
            Ok(value) => {
                self.lock().state.resolve();
                Ok(value)
            }
            Err(e) => Err(self.handle_failure(e)),
        }
    }

    /// Retry a mutation after a conflict.
    ///
    /// Returns `Ok(None)` without calling `operation` once `retry_count`
    /// reached the bound.
    pub async fn retry<T, F, Fut>(&self, operation: F) -> Result<Option<T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let exhausted = {
            let mut inner = self.lock();
            if inner.state.retry_count >= self.max_retries {
                let first = !inner.exhausted_notified;
                inner.exhausted_notified = true;
                Some((first, inner.state.clone()))
            } else {
                inner.state.retry_count += 1;
                inner.state.is_retrying = true;
                None
            }
        };

        if let Some((first, state)) = exhausted {
            if first {
                warn!(
                    retry_count = state.retry_count,
                    max_retries = self.max_retries,
                    "conflict retries exhausted"
                );
                if let Some(callback) = &self.on_exhausted {
                    callback(&state);
                }
            }
            return Ok(None);
        }

        debug!(retry_count = self.retry_count(), "retrying after conflict");
        match operation().await {
            Ok(value) => {
                self.lock().state.resolve();
                Ok(Some(value))
            }
            Err(e) => {
                self.lock().state.is_retrying = false;
                Err(self.handle_failure(e))
            }
        }
    }

    /// Dismiss the conflict: reset every field and the exhausted one-shot
    pub fn clear_conflict(&self) {
        let mut inner = self.lock();
        inner.state.clear();
        inner.exhausted_notified = false;
    }

    /// Copy of the current state
    pub fn state(&self) -> ConflictState {
        self.lock().state.clone()
    }

    /// Check if the last attempt failed with a conflict
    pub fn has_conflict(&self) -> bool {
        self.lock().state.has_conflict
    }

    /// The recorded conflict error
    pub fn conflict_error(&self) -> Option<Arc<Error>> {
        self.lock().state.conflict_error.clone()
    }

    /// Retries issued since the last dismissal
    pub fn retry_count(&self) -> u32 {
        self.lock().state.retry_count
    }

    /// Check if a retry is executing
    pub fn is_retrying(&self) -> bool {
        self.lock().state.is_retrying
    }

    /// Check if no retry is left
    pub fn is_exhausted(&self) -> bool {
        self.retry_count() >= self.max_retries
    }

    /// Retry bound
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    fn handle_failure(&self, error: Error) -> Error {
        if !(self.classifier)(&error) {
            return error;
        }
        let shared = Arc::new(error);
        {
            let mut inner = self.lock();
            if !inner.state.has_conflict {
                // New episode
                inner.exhausted_notified = false;
            }
            inner.state.record(Arc::clone(&shared));
        }
        warn!(error = %shared, "version conflict");
        if let Some(callback) = &self.on_conflict {
            callback(&shared);
        }
        Error::Shared(shared)
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for ConflictRetryController {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RETRIES)
    }
}

impl std::fmt::Debug for ConflictRetryController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConflictRetryController")
            .field("max_retries", &self.max_retries)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
