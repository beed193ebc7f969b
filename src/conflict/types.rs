//! Conflict state

use crate::error::Error;
use std::sync::Arc;

/// Observable conflict state of one mutation surface
#[derive(Debug, Clone, Default)]
pub struct ConflictState {
    /// The last attempt failed with a version conflict
    pub has_conflict: bool,
    /// The conflict error, kept until success or dismissal
    pub conflict_error: Option<Arc<Error>>,
    /// Retries issued since the last dismissal
    pub retry_count: u32,
    /// A retry is currently executing
    pub is_retrying: bool,
}

impl ConflictState {
    /// Reset every field
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Record a fresh conflict
    pub(crate) fn record(&mut self, error: Arc<Error>) {
        self.has_conflict = true;
        self.conflict_error = Some(error);
        self.is_retrying = false;
    }

    /// Record a successful attempt. The retry count is kept.
    pub(crate) fn resolve(&mut self) {
        self.has_conflict = false;
        self.conflict_error = None;
        self.is_retrying = false;
    }
}
