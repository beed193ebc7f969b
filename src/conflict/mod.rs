//! Optimistic-locking conflict handling
//!
//! Wraps mutations so that a version-conflict failure becomes observable
//! state instead of an ad hoc error, and governs bounded retry.
//!
//! # Overview
//!
//! - `ConflictState` - `{ has_conflict, conflict_error, retry_count, is_retrying }`
//! - `ConflictRetryController` - `run`, `retry`, `clear_conflict`
//!
//! Conflict errors are delivered twice on purpose: recorded in the state and
//! returned to the caller.

mod controller;
mod types;

pub use controller::{ConflictClassifier, ConflictRetryController, DEFAULT_MAX_RETRIES};
pub use types::ConflictState;

#[cfg(test)]
mod tests;
