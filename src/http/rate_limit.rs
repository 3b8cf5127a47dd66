//! Client-side request throttling
//!
//! Keeps a single client under the API gateway's per-client throttle so
//! bursts queue locally instead of coming back as 429s.

use governor::clock::DefaultClock;
use governor::middleware::NoOpMiddleware;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter as Governor};
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Throttle settings (the `http.rate_limit` config section)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimiterConfig {
    /// Sustained requests per second
    pub requests_per_second: u32,
    /// Requests allowed at once; defaults to one second's worth
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub burst_size: Option<u32>,
}

impl RateLimiterConfig {
    /// Rate with an explicit burst
    pub fn new(requests_per_second: u32, burst_size: u32) -> Self {
        Self {
            requests_per_second,
            burst_size: Some(burst_size),
        }
    }

    /// Rate whose burst equals the per-second rate
    pub fn per_second(requests_per_second: u32) -> Self {
        Self {
            requests_per_second,
            burst_size: None,
        }
    }

    /// Effective burst size
    pub fn burst(&self) -> u32 {
        self.burst_size.unwrap_or(self.requests_per_second)
    }
}

/// Token bucket shared by all clones
#[derive(Clone)]
pub struct RateLimiter {
    limiter: Arc<Governor<NotKeyed, InMemoryState, DefaultClock, NoOpMiddleware>>,
}

impl RateLimiter {
    /// Build a limiter. Zero values are clamped to one; `AppConfig::validate`
    /// rejects them before they get here.
    pub fn new(config: &RateLimiterConfig) -> Self {
        let rate = NonZeroU32::new(config.requests_per_second).unwrap_or(NonZeroU32::MIN);
        let burst = NonZeroU32::new(config.burst()).unwrap_or(NonZeroU32::MIN);

        Self {
            limiter: Arc::new(Governor::direct(Quota::per_second(rate).allow_burst(burst))),
        }
    }

    /// Wait for a permit and return how long that took
    pub async fn wait(&self) -> Duration {
        let start = Instant::now();
        self.limiter.until_ready().await;
        start.elapsed()
    }

    /// Take a permit if one is available right now
    pub fn try_acquire(&self) -> bool {
        self.limiter.check().is_ok()
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod rate_limit_tests {
    use super::*;

    #[test]
    fn test_burst_defaults_to_rate() {
        let config: RateLimiterConfig = serde_yaml::from_str("requests_per_second: 5").unwrap();
        assert_eq!(config, RateLimiterConfig::per_second(5));
        assert_eq!(config.burst(), 5);
        assert_eq!(RateLimiterConfig::new(5, 2).burst(), 2);
    }

    #[tokio::test]
    async fn test_burst_then_throttle() {
        let limiter = RateLimiter::new(&RateLimiterConfig::new(1, 3));

        for _ in 0..3 {
            assert!(limiter.try_acquire());
        }
        assert!(!limiter.try_acquire());
    }

    #[tokio::test]
    async fn test_clones_share_the_bucket() {
        let limiter = RateLimiter::new(&RateLimiterConfig::new(1, 1));
        let clone = limiter.clone();

        assert!(limiter.try_acquire());
        assert!(!clone.try_acquire());
    }

    #[tokio::test]
    async fn test_zero_is_clamped() {
        let limiter = RateLimiter::new(&RateLimiterConfig::per_second(0));
        assert!(limiter.try_acquire());
    }

    #[tokio::test]
    async fn test_wait_within_burst_is_immediate() {
        let limiter = RateLimiter::new(&RateLimiterConfig::per_second(100));
        assert!(limiter.wait().await < Duration::from_millis(50));
    }
}
