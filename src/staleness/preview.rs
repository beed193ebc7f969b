//! Debounced preview built on the staleness guard
//!
//! Each parameter change supersedes the previous one, cancels its pending
//! timer and schedules a new one. When a timer fires the computation runs to
//! completion, but its result (or failure) is applied only if no newer
//! change arrived in the meantime.

use super::guard::{RequestToken, StalenessGuard};
use crate::error::{Error, Result};
use futures::future::BoxFuture;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

type ComputeFn<P, R> = dyn Fn(P) -> BoxFuture<'static, Result<R>> + Send + Sync;

/// Observable state of a preview
#[derive(Debug)]
pub struct PreviewState<R> {
    /// A computation for the latest parameters is running
    pub is_loading: bool,
    /// Failure of the latest applied computation
    pub error: Option<Arc<Error>>,
    /// Result of the latest successful computation
    pub result: Option<Arc<R>>,
}

impl<R> PreviewState<R> {
    /// Check if the latest computation failed
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

impl<R> Default for PreviewState<R> {
    fn default() -> Self {
        Self {
            is_loading: false,
            error: None,
            result: None,
        }
    }
}

impl<R> Clone for PreviewState<R> {
    fn clone(&self) -> Self {
        Self {
            is_loading: self.is_loading,
            error: self.error.clone(),
            result: self.result.clone(),
        }
    }
}

struct Inner<P, R> {
    guard: StalenessGuard,
    debounce: Duration,
    compute: Box<ComputeFn<P, R>>,
    state: Mutex<PreviewState<R>>,
    last_params: Mutex<Option<P>>,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl<P, R> Inner<P, R> {
    async fn execute(&self, token: RequestToken, params: P) {
        {
            let mut state = lock(&self.state);
            if !self.guard.is_current(token) {
                return;
            }
            state.is_loading = true;
        }

        let outcome = (self.compute)(params).await;

        let mut state = lock(&self.state);
        if !self.guard.is_current(token) {
            debug!(token = token.value(), "discarding superseded preview result");
            return;
        }
        state.is_loading = false;
        match outcome {
            Ok(result) => {
                state.result = Some(Arc::new(result));
                state.error = None;
            }
            Err(e) => {
                debug!(error = %e, "preview computation failed");
                state.error = Some(Arc::new(e));
            }
        }
    }

    fn cancel_timer(&self) {
        if let Some(timer) = lock(&self.timer).take() {
            timer.abort();
        }
    }
}

/// Debounced recompute surface: `{ is_loading, error, result, refresh(), clear() }`
pub struct DebouncedPreview<P, R> {
    inner: Arc<Inner<P, R>>,
}

impl<P, R> DebouncedPreview<P, R>
where
    P: Clone + Send + Sync + 'static,
    R: Send + Sync + 'static,
{
    /// Create a preview that waits `debounce` after the last change before computing
    pub fn new<F, Fut>(debounce: Duration, compute: F) -> Self
    where
        F: Fn(P) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R>> + Send + 'static,
    {
        let compute: Box<ComputeFn<P, R>> = Box::new(move |params| Box::pin(compute(params)));
        Self {
            inner: Arc::new(Inner {
                guard: StalenessGuard::new(),
                debounce,
                compute,
                state: Mutex::new(PreviewState::default()),
                last_params: Mutex::new(None),
                timer: Mutex::new(None),
            }),
        }
    }

    /// Record new parameters and (re)start the debounce timer.
    ///
    /// Must be called from within a tokio runtime.
    pub fn schedule(&self, params: P) {
        let token = self.inner.guard.begin();
        *lock(&self.inner.last_params) = Some(params.clone());

        let inner = Arc::clone(&self.inner);
        let timer = tokio::spawn(async move {
            tokio::time::sleep(inner.debounce).await;
            if !inner.guard.is_current(token) {
                return;
            }
            // Run detached so a later schedule() only cancels pending timers
            tokio::spawn(async move { inner.execute(token, params).await });
        });

        if let Some(previous) = lock(&self.inner.timer).replace(timer) {
            previous.abort();
        }
    }

    /// Recompute immediately with the last scheduled parameters.
    ///
    /// Returns `false` when nothing has been scheduled yet.
    pub async fn refresh(&self) -> bool {
        let Some(params) = lock(&self.inner.last_params).clone() else {
            return false;
        };
        let token = self.inner.guard.begin();
        self.inner.cancel_timer();
        self.inner.execute(token, params).await;
        true
    }

    /// Drop pending and in-flight work and reset the visible state
    pub fn clear(&self) {
        self.inner.guard.clear();
        self.inner.cancel_timer();
        *lock(&self.inner.last_params) = None;
        *lock(&self.inner.state) = PreviewState::default();
    }

    /// Snapshot of the current state
    pub fn state(&self) -> PreviewState<R> {
        lock(&self.inner.state).clone()
    }

    /// Latest applied result
    pub fn result(&self) -> Option<Arc<R>> {
        lock(&self.inner.state).result.clone()
    }

    /// Latest applied failure
    pub fn error(&self) -> Option<Arc<Error>> {
        lock(&self.inner.state).error.clone()
    }

    /// Check whether a computation for the latest parameters is running
    pub fn is_loading(&self) -> bool {
        lock(&self.inner.state).is_loading
    }
}

impl<P, R> Drop for DebouncedPreview<P, R> {
    fn drop(&mut self) {
        self.inner.cancel_timer();
    }
}

impl<P, R> std::fmt::Debug for DebouncedPreview<P, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DebouncedPreview")
            .field("debounce", &self.inner.debounce)
            .field("token", &self.inner.guard.current())
            .finish_non_exhaustive()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
