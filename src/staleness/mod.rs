//! Stale-request guarding
//!
//! Ensures that out-of-order asynchronous completions never overwrite newer
//! state: every request captures a token, and only the holder of the latest
//! token may apply its result.
//!
//! # Overview
//!
//! - `StalenessGuard` - Monotonic request token counter ("last begin wins")
//! - `DebouncedPreview` - Debounced recompute surface built on the guard

mod guard;
mod preview;

pub use guard::{RequestToken, StalenessGuard};
pub use preview::{DebouncedPreview, PreviewState};

#[cfg(test)]
mod tests;
