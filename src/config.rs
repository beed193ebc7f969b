//! Configuration for the dashboard data layer
//!
//! Loaded from YAML or JSON. Every section has defaults, so an empty
//! document plus a `base_url` is a complete configuration.

use crate::error::{Error, Result, ResultExt};
use crate::http::{ApiClientConfig, RateLimiterConfig};
use crate::pagination::EngineConfig;
use crate::types::BackoffType;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::time::Duration;

// ============================================================================
// Top-Level Config
// ============================================================================

/// Complete data layer configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Base URL of the dashboard API
    pub base_url: String,

    /// HTTP transport settings
    pub http: HttpSettings,

    /// Defaults for every paginated list
    pub pagination: PaginationSettings,

    /// Per-resource overrides, keyed by namespace
    pub resources: BTreeMap<String, ResourceOverride>,

    /// Debounced preview settings
    pub preview: PreviewSettings,

    /// Conflict retry settings
    pub conflict: ConflictSettings,
}

impl DashboardConfig {
    /// Load from a file, choosing JSON for `.json` and YAML otherwise
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        if is_json {
            Self::from_json_str(&content)
        } else {
            Self::from_yaml_str(&content)
        }
    }

    /// Parse YAML and validate
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse JSON and validate
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the engine or transport cannot work with.
    ///
    /// An empty `base_url` is allowed here and rejected when a client is built.
    pub fn validate(&self) -> Result<()> {
        if self.pagination.default_limit == Some(0) {
            return Err(Error::invalid_value(
                "pagination.default_limit",
                "must be a positive integer",
            ));
        }
        if self.pagination.max_pages == Some(0) {
            return Err(Error::invalid_value(
                "pagination.max_pages",
                "must be at least 1",
            ));
        }
        for (namespace, resource) in &self.resources {
            if resource.limit == Some(0) {
                return Err(Error::invalid_value(
                    format!("resources.{namespace}.limit"),
                    "must be a positive integer",
                ));
            }
            if resource.max_pages == Some(0) {
                return Err(Error::invalid_value(
                    format!("resources.{namespace}.max_pages"),
                    "must be at least 1",
                ));
            }
        }
        if self.http.requests_per_second == Some(0) || self.http.burst_size == Some(0) {
            return Err(Error::invalid_value(
                "http",
                "rate limit values must be greater than 0",
            ));
        }
        Ok(())
    }

    /// Transport configuration, failing when no base URL is set
    pub fn client_config(&self) -> Result<ApiClientConfig> {
        if self.base_url.trim().is_empty() {
            return Err(Error::config("base_url is required"));
        }
        Ok(self.http.client_config(&self.base_url))
    }

    /// Override for one namespace, if configured
    pub fn resource(&self, namespace: &str) -> Option<&ResourceOverride> {
        self.resources.get(namespace)
    }
}

// ============================================================================
// HTTP Settings
// ============================================================================

/// HTTP transport settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Transport-level retries
    pub max_retries: u32,

    /// Initial backoff in milliseconds
    pub initial_backoff_ms: u64,

    /// Maximum backoff in milliseconds
    pub max_backoff_ms: u64,

    /// Backoff growth
    pub backoff: BackoffType,

    /// Client-side rate limit; unset disables throttling
    pub requests_per_second: Option<u32>,

    /// Burst allowance, defaults to `requests_per_second`
    pub burst_size: Option<u32>,

    /// Headers sent with every request
    pub headers: HashMap<String, String>,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            max_retries: 3,
            initial_backoff_ms: 100,
            max_backoff_ms: 30_000,
            backoff: BackoffType::Exponential,
            requests_per_second: None,
            burst_size: None,
            headers: HashMap::new(),
        }
    }
}

impl HttpSettings {
    /// Client configuration for `base_url`
    pub fn client_config(&self, base_url: &str) -> ApiClientConfig {
        let mut config = ApiClientConfig::new(base_url)
            .with_timeout(Duration::from_secs(self.timeout_secs))
            .with_max_retries(self.max_retries)
            .with_backoff(
                self.backoff,
                Duration::from_millis(self.initial_backoff_ms),
                Duration::from_millis(self.max_backoff_ms),
            );

        config = match self.requests_per_second {
            Some(rps) => config.with_rate_limit(RateLimiterConfig::new(
                rps,
                self.burst_size.unwrap_or(rps),
            )),
            None => config.without_rate_limit(),
        };

        for (key, value) in &self.headers {
            config = config.with_header(key, value);
        }
        config
    }
}

// ============================================================================
// Pagination Settings
// ============================================================================

/// Defaults applied to every paginated list.
///
/// Unset values fall back to each resource's own defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationSettings {
    /// Page size
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_limit: Option<u32>,

    /// Resident pages per series
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_pages: Option<usize>,

    /// Automatic retries of a failed page fetch
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry: Option<u32>,

    /// Base delay between automatic retries in milliseconds
    pub retry_backoff_ms: u64,
}

impl Default for PaginationSettings {
    fn default() -> Self {
        Self {
            default_limit: None,
            max_pages: None,
            retry: None,
            retry_backoff_ms: 250,
        }
    }
}

impl PaginationSettings {
    /// Engine configuration for one resource.
    ///
    /// Precedence: `resources.<namespace>` override, then these settings,
    /// then the resource's `defaults`.
    pub fn engine_config(
        &self,
        resource: Option<&ResourceOverride>,
        defaults: EngineConfig,
    ) -> EngineConfig {
        let max_pages = resource
            .and_then(|r| r.max_pages)
            .or(self.max_pages)
            .unwrap_or(defaults.max_pages);
        let retry = resource
            .and_then(|r| r.retry)
            .or(self.retry)
            .unwrap_or(defaults.retry);

        defaults
            .with_max_pages(max_pages)
            .with_retry(retry)
            .with_retry_backoff(Duration::from_millis(self.retry_backoff_ms))
    }

    /// Page size for one resource, with the same precedence as [`Self::engine_config`]
    pub fn limit(&self, resource: Option<&ResourceOverride>, default: u32) -> u32 {
        resource
            .and_then(|r| r.limit)
            .or(self.default_limit)
            .unwrap_or(default)
    }
}

/// Per-resource overrides
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceOverride {
    /// Endpoint path
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// Page size
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,

    /// Resident pages
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_pages: Option<usize>,

    /// Automatic retries
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry: Option<u32>,
}

// ============================================================================
// Preview / Conflict Settings
// ============================================================================

/// Debounced preview settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewSettings {
    /// Quiet period before a preview is recomputed, in milliseconds
    pub debounce_ms: u64,
}

impl Default for PreviewSettings {
    fn default() -> Self {
        Self { debounce_ms: 300 }
    }
}

impl PreviewSettings {
    /// Debounce as a duration
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

/// Conflict retry settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConflictSettings {
    /// User-initiated retries allowed per dismissal
    pub max_retries: u32,
}

impl Default for ConflictSettings {
    fn default() -> Self {
        Self {
            max_retries: crate::conflict::DEFAULT_MAX_RETRIES,
        }
    }
}
