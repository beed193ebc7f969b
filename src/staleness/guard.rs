//! Monotonic request token counter

use std::sync::atomic::{AtomicU64, Ordering};

/// Token captured before starting async work
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestToken(u64);

impl RequestToken {
    /// Raw counter value
    pub fn value(self) -> u64 {
        self.0
    }
}

/// Discards results from superseded requests.
///
/// A result may be applied only while its token is still the guard's latest,
/// regardless of the order in which requests actually complete.
#[derive(Debug, Default)]
pub struct StalenessGuard {
    current: AtomicU64,
}

impl StalenessGuard {
    /// Create a new guard
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new request, superseding every earlier token
    pub fn begin(&self) -> RequestToken {
        RequestToken(self.current.fetch_add(1, Ordering::AcqRel) + 1)
    }

    /// The latest issued token, without superseding anything
    pub fn current(&self) -> RequestToken {
        RequestToken(self.current.load(Ordering::Acquire))
    }

    /// Check whether a token is still the latest
    pub fn is_current(&self, token: RequestToken) -> bool {
        self.current.load(Ordering::Acquire) == token.0
    }

    /// Invalidate in-flight work without starting a replacement
    pub fn clear(&self) {
        self.current.fetch_add(1, Ordering::AcqRel);
    }
}
