//! In-memory rate limiter using the governor crate.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use governor::clock::{Clock, DefaultClock};
use governor::state::keyed::DefaultKeyedStateStore;
use governor::{Quota, RateLimiter as GovernorRateLimiter};

use quill_core::ports::{RateLimitError, RateLimitResult, RateLimiter};

type KeyedRateLimiter = GovernorRateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>;

/// In-memory rate limiter configuration.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Maximum requests per window.
    pub max_requests: u32,
    /// Window duration.
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 100,
            window: Duration::from_secs(60),
        }
    }
}

/// Per-key in-memory rate limiter using the GCRA algorithm.
///
/// Keys are client addresses; limits are per-process, not distributed
/// across instances.
pub struct InMemoryRateLimiter {
    limiter: Arc<KeyedRateLimiter>,
    config: RateLimitConfig,
}

impl InMemoryRateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        let quota = Quota::with_period(config.window / config.max_requests)
            .expect("Valid quota")
            .allow_burst(NonZeroU32::new(config.max_requests).expect("Non-zero"));

        let limiter = Arc::new(GovernorRateLimiter::keyed(quota));

        Self { limiter, config }
    }

    pub fn from_env() -> Self {
        let config = RateLimitConfig {
            max_requests: std::env::var("RATE_LIMIT_MAX_REQUESTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(100),
            window: Duration::from_secs(
                std::env::var("RATE_LIMIT_WINDOW_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(60),
            ),
        };
        Self::new(config)
    }
}

#[async_trait]
impl RateLimiter for InMemoryRateLimiter {
    async fn check(&self, key: &str) -> Result<RateLimitResult, RateLimitError> {
        match self.limiter.check_key(&key.to_string()) {
            Ok(_) => Ok(RateLimitResult {
                allowed: true,
                remaining: self.config.max_requests, // Approximate
                reset_after: self.config.window,
            }),
            Err(not_until) => Ok(RateLimitResult {
                allowed: false,
                remaining: 0,
                reset_after: not_until.wait_time_from(DefaultClock::default().now()),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_limit_is_per_key() {
        let limiter = InMemoryRateLimiter::new(RateLimitConfig {
            max_requests: 2,
            window: Duration::from_secs(60),
        });

        assert!(limiter.check("1.2.3.4").await.unwrap().allowed);
        assert!(limiter.check("1.2.3.4").await.unwrap().allowed);
        let third = limiter.check("1.2.3.4").await.unwrap();
        assert!(!third.allowed);
        assert!(third.reset_after > Duration::ZERO);

        // A different client is unaffected
        assert!(limiter.check("5.6.7.8").await.unwrap().allowed);
    }
}
