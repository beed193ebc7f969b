//! Retrying JSON API client
//!
//! Handles:
//! - Automatic retries with configurable backoff
//! - Client-side rate limiting
//! - Mapping of HTTP 409 to a version conflict
//! - JSON request and response bodies

use super::rate_limit::{RateLimiter, RateLimiterConfig};
use crate::error::{Error, Result};
use crate::types::{BackoffType, JsonValue, Method};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Seconds to wait on a 429 without a usable `Retry-After`
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

// ============================================================================
// Configuration
// ============================================================================

/// Configuration for [`ApiClient`]
#[derive(Debug, Clone)]
pub struct ApiClientConfig {
    /// Base URL every request path is resolved against
    pub base_url: String,
    /// Per-request timeout
    pub timeout: Duration,
    /// Retries for retryable failures
    pub max_retries: u32,
    /// Initial delay for backoff
    pub initial_backoff: Duration,
    /// Upper bound for backoff
    pub max_backoff: Duration,
    /// Backoff growth
    pub backoff_type: BackoffType,
    /// Client-side throttling, `None` to disable
    pub rate_limit: Option<RateLimiterConfig>,
    /// Headers sent with every request
    pub default_headers: HashMap<String, String>,
    /// User agent string
    pub user_agent: String,
}

impl ApiClientConfig {
    /// Create a config with defaults for `base_url`
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: Duration::from_secs(30),
            max_retries: 3,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(30),
            backoff_type: BackoffType::Exponential,
            rate_limit: Some(RateLimiterConfig::default()),
            default_headers: HashMap::new(),
            user_agent: format!("{}/{}", crate::NAME, crate::VERSION),
        }
    }

    /// Set the request timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set max retries
    #[must_use]
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Set backoff configuration
    #[must_use]
    pub fn with_backoff(mut self, backoff_type: BackoffType, initial: Duration, max: Duration) -> Self {
        self.backoff_type = backoff_type;
        self.initial_backoff = initial;
        self.max_backoff = max;
        self
    }

    /// Set the rate limit
    #[must_use]
    pub fn with_rate_limit(mut self, config: RateLimiterConfig) -> Self {
        self.rate_limit = Some(config);
        self
    }

    /// Disable rate limiting
    #[must_use]
    pub fn without_rate_limit(mut self) -> Self {
        self.rate_limit = None;
        self
    }

    /// Add a default header
    #[must_use]
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.insert(key.into(), value.into());
        self
    }

    /// Set the user agent
    #[must_use]
    pub fn with_user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = agent.into();
        self
    }
}

// ============================================================================
// Client
// ============================================================================

/// JSON API client with retry, rate limiting and conflict mapping
pub struct ApiClient {
    client: Client,
    base_url: Url,
    config: ApiClientConfig,
    rate_limiter: Option<RateLimiter>,
}

impl ApiClient {
    /// Create a client, validating the base URL and rate limit
    pub fn new(config: ApiClientConfig) -> Result<Self> {
        let base_url = Url::parse(config.base_url.trim_end_matches('/'))?;
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()?;
        let rate_limiter = config.rate_limit.map(RateLimiter::new).transpose()?;

        Ok(Self {
            client,
            base_url,
            config,
            rate_limiter,
        })
    }

    /// Client configuration
    pub fn config(&self) -> &ApiClientConfig {
        &self.config
    }

    /// Check if rate limiting is enabled
    pub fn has_rate_limiter(&self) -> bool {
        self.rate_limiter.is_some()
    }

    /// GET `path` with query parameters and decode the JSON body
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(String, String)],
    ) -> Result<T> {
        let response = self.execute(Method::GET, path, query, None).await?;
        decode(response).await
    }

    /// Send a JSON body with `method` and decode the JSON response
    pub async fn send_json<B, T>(&self, method: Method, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = serde_json::to_value(body)?;
        let response = self.execute(method, path, &[], Some(&body)).await?;
        decode(response).await
    }

    /// Issue a request, retrying retryable failures with backoff
    pub async fn execute(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
        body: Option<&JsonValue>,
    ) -> Result<Response> {
        let url = self.url(path)?;
        let max_retries = self.config.max_retries;
        let mut attempt = 0;

        loop {
            if let Some(limiter) = &self.rate_limiter {
                limiter.wait().await;
            }

            let mut request = self.client.request(method.into(), url.clone());
            for (key, value) in &self.config.default_headers {
                request = request.header(key.as_str(), value.as_str());
            }
            if !query.is_empty() {
                request = request.query(query);
            }
            if let Some(body) = body {
                request = request.json(body);
            }

            let error = match request.send().await {
                Ok(response) => match check_status(response).await {
                    Ok(response) => {
                        debug!(method = ?method, url = %url, "request succeeded");
                        return Ok(response);
                    }
                    Err(e) => e,
                },
                Err(e) if e.is_timeout() => Error::Timeout {
                    timeout_ms: u64::try_from(self.config.timeout.as_millis()).unwrap_or(u64::MAX),
                },
                Err(e) => Error::Http(e),
            };

            if attempt >= max_retries || !should_retry(&error) {
                return Err(error);
            }

            let delay = match &error {
                Error::RateLimited {
                    retry_after_seconds,
                } => Duration::from_secs(*retry_after_seconds),
                _ => self.calculate_backoff(attempt),
            };
            warn!(
                error = %error,
                "request failed, attempt {}/{}, retrying in {:?}",
                attempt + 1,
                max_retries + 1,
                delay
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    /// Backoff delay before retry number `attempt + 1`
    pub fn calculate_backoff(&self, attempt: u32) -> Duration {
        let initial = self.config.initial_backoff;
        let delay = match self.config.backoff_type {
            BackoffType::Constant => initial,
            BackoffType::Linear => initial * (attempt + 1),
            BackoffType::Exponential => initial * 2u32.saturating_pow(attempt),
        };
        delay.min(self.config.max_backoff)
    }

    fn url(&self, path: &str) -> Result<Url> {
        if path.starts_with("http://") || path.starts_with("https://") {
            return Ok(Url::parse(path)?);
        }
        let base = self.base_url.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!("{base}/{}", path.trim_start_matches('/')))?)
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url.as_str())
            .field("has_rate_limiter", &self.rate_limiter.is_some())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Response handling
// ============================================================================

/// Conflict payload some servers attach to a 409
#[derive(Debug, Default, Deserialize)]
struct ConflictBody {
    #[serde(default, alias = "error", alias = "detail")]
    message: Option<String>,
    #[serde(default)]
    current_version: Option<u64>,
    #[serde(default)]
    expected_version: Option<u64>,
}

async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(Error::RateLimited {
            retry_after_seconds: retry_after(&response),
        });
    }

    let body = response.text().await.unwrap_or_default();
    if status == StatusCode::CONFLICT {
        return Err(conflict_error(&body));
    }
    Err(Error::http_status(status.as_u16(), body))
}

fn conflict_error(body: &str) -> Error {
    let parsed: ConflictBody = serde_json::from_str(body).unwrap_or_default();
    let message = parsed.message.unwrap_or_else(|| {
        if body.is_empty() {
            "resource was modified by another client".to_string()
        } else {
            body.to_string()
        }
    });
    Error::Conflict {
        message,
        current_version: parsed.current_version,
        expected_version: parsed.expected_version,
    }
}

/// Transport retries connection failures but not other reqwest errors
fn should_retry(error: &Error) -> bool {
    match error {
        Error::Http(e) => e.is_connect(),
        other => other.is_retryable(),
    }
}

fn retry_after(response: &Response) -> u64 {
    response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(DEFAULT_RETRY_AFTER_SECS)
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let bytes = response.bytes().await?;
    if bytes.is_empty() {
        // Empty bodies (204) decode as JSON null
        return Ok(serde_json::from_value(JsonValue::Null)?);
    }
    Ok(serde_json::from_slice(&bytes)?)
}
