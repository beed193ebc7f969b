//! Error types for dashfeed
//!
//! This module defines the error hierarchy for the entire crate.
//! All public APIs return `Result<T, Error>` where Error is defined here.
//!
//! Stale results are not errors: a superseded completion is reported through
//! [`crate::pagination::FetchOutcome::Superseded`] or dropped silently.

use std::sync::Arc;
use thiserror::Error;

/// The main error type for dashfeed
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid config value for '{field}': {message}")]
    InvalidConfigValue { field: String, message: String },

    #[error("Page limit must be a positive integer, got {limit}")]
    InvalidLimit { limit: u32 },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    // ============================================================================
    // Transport Errors
    // ============================================================================
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Rate limited, retry after {retry_after_seconds}s")]
    RateLimited { retry_after_seconds: u64 },

    #[error("Request timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ============================================================================
    // Read / Write Consistency Errors
    // ============================================================================
    #[error("Failed to fetch page for '{namespace}': {message}")]
    Fetch { namespace: String, message: String },

    #[error("Version conflict: {message}")]
    Conflict {
        message: String,
        /// Version the server currently holds, when reported
        current_version: Option<u64>,
        /// Version the client expected to overwrite
        expected_version: Option<u64>,
    },

    #[error("Unknown resource: {name}")]
    UnknownResource { name: String },

    /// An error already recorded in shared state (a series or conflict state)
    /// and handed back to the caller as well
    #[error(transparent)]
    Shared(#[from] Arc<Error>),

    // ============================================================================
    // I/O Errors
    // ============================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ============================================================================
    // Generic Errors
    // ============================================================================
    #[error("{0}")]
    Other(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an invalid config value error
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfigValue {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create an HTTP status error
    pub fn http_status(status: u16, body: impl Into<String>) -> Self {
        Self::HttpStatus {
            status,
            body: body.into(),
        }
    }

    /// Create a transient fetch error
    pub fn fetch(namespace: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Fetch {
            namespace: namespace.into(),
            message: message.into(),
        }
    }

    /// Create a version conflict error without version details
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
            current_version: None,
            expected_version: None,
        }
    }

    /// Create a version conflict error carrying both versions
    pub fn version_conflict(expected: u64, current: u64) -> Self {
        Self::Conflict {
            message: format!("expected version {expected}, server has {current}"),
            current_version: Some(current),
            expected_version: Some(expected),
        }
    }

    /// Check if this error signals an optimistic-lock version mismatch
    pub fn is_conflict(&self) -> bool {
        match self {
            Error::Conflict { .. } => true,
            Error::HttpStatus { status, .. } => *status == 409,
            Error::Shared(inner) => inner.is_conflict(),
            _ => false,
        }
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Http(_)
            | Error::RateLimited { .. }
            | Error::Timeout { .. }
            | Error::Fetch { .. } => true,
            Error::HttpStatus { status, .. } => is_retryable_status(*status),
            Error::Shared(inner) => inner.is_retryable(),
            _ => false,
        }
    }
}

/// Check if an HTTP status code is retryable
fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

/// Result type alias for dashfeed
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", message.into(), inner))
        })
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", f(), inner))
        })
    }
}
