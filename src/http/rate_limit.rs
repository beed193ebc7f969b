//! Client-side request throttling
//!
//! Token bucket built on the governor crate, shared by every request an
//! [`ApiClient`](super::ApiClient) issues.

use crate::error::{Error, Result};
use governor::clock::DefaultClock;
use governor::middleware::NoOpMiddleware;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter as Governor};
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;
use std::sync::Arc;

/// Requests per second and burst allowance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimiterConfig {
    /// Sustained requests per second
    pub requests_per_second: u32,
    /// Requests allowed back to back
    pub burst_size: u32,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            requests_per_second: 20,
            burst_size: 20,
        }
    }
}

impl RateLimiterConfig {
    /// Create a config
    pub fn new(requests_per_second: u32, burst_size: u32) -> Self {
        Self {
            requests_per_second,
            burst_size,
        }
    }

    fn quota(&self) -> Result<Quota> {
        let rate = NonZeroU32::new(self.requests_per_second).ok_or_else(|| {
            Error::invalid_value("http.requests_per_second", "must be greater than 0")
        })?;
        let burst = NonZeroU32::new(self.burst_size)
            .ok_or_else(|| Error::invalid_value("http.burst_size", "must be greater than 0"))?;
        Ok(Quota::per_second(rate).allow_burst(burst))
    }
}

/// Shared token bucket
#[derive(Clone)]
pub struct RateLimiter {
    limiter: Arc<Governor<NotKeyed, InMemoryState, DefaultClock, NoOpMiddleware>>,
    config: RateLimiterConfig,
}

impl RateLimiter {
    /// Create a limiter, rejecting a zero rate or burst
    pub fn new(config: RateLimiterConfig) -> Result<Self> {
        let quota = config.quota()?;
        Ok(Self {
            limiter: Arc::new(Governor::direct(quota)),
            config,
        })
    }

    /// Wait for a permit
    pub async fn wait(&self) {
        self.limiter.until_ready().await;
    }

    /// Take a permit if one is available right now
    pub fn try_acquire(&self) -> bool {
        self.limiter.check().is_ok()
    }

    /// The limiter's configuration
    pub fn config(&self) -> RateLimiterConfig {
        self.config
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod rate_limit_tests {
    use super::*;

    #[test]
    fn test_zero_rate_rejected() {
        let err = RateLimiter::new(RateLimiterConfig::new(0, 5)).unwrap_err();
        assert!(err.to_string().contains("requests_per_second"));

        let err = RateLimiter::new(RateLimiterConfig::new(5, 0)).unwrap_err();
        assert!(err.to_string().contains("burst_size"));
    }

    #[test]
    fn test_burst_then_throttle() {
        let limiter = RateLimiter::new(RateLimiterConfig::new(1, 3)).unwrap();
        for _ in 0..3 {
            assert!(limiter.try_acquire());
        }
        assert!(!limiter.try_acquire());
    }

    #[tokio::test]
    async fn test_wait_within_burst() {
        let limiter = RateLimiter::new(RateLimiterConfig::default()).unwrap();
        limiter.wait().await;
        assert_eq!(limiter.config().burst_size, 20);
    }
}
