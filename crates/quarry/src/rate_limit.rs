use std::num::NonZeroU32;
use std::sync::Arc;

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};

/// Type alias for the governor rate limiter.
type GovernorRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Default rate limits per provider (requests per second).
pub mod rate_limits {
    /// Bitbucket Cloud: 1000 repository requests/hour per user = ~0.3/sec,
    /// we use 2/sec and rely on retry for the occasional 429.
    pub const BITBUCKET_CLOUD_DEFAULT_RPS: u32 = 2;
}

/// A shared API rate limiter using the governor crate.
///
/// Clones share the same quota, so every query stream of one source draws
/// from a single budget.
///
/// # Example
///
/// ```ignore
/// use quarry::rate_limit::ApiRateLimiter;
///
/// let limiter = ApiRateLimiter::new(2);
///
/// // Before each API call:
/// limiter.wait().await;
/// ```
#[derive(Clone)]
pub struct ApiRateLimiter {
    inner: Arc<GovernorRateLimiter>,
}

impl ApiRateLimiter {
    /// Create a new rate limiter with the specified requests per second.
    ///
    /// A value of 0 is treated as 1.
    pub fn new(requests_per_second: u32) -> Self {
        let rps = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
        let rate_limiter = RateLimiter::direct(Quota::per_second(rps));

        Self {
            inner: Arc::new(rate_limiter),
        }
    }

    /// Wait until a request is allowed by the rate limiter.
    pub async fn wait(&self) {
        self.inner.until_ready().await;
    }
}

impl std::fmt::Debug for ApiRateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiRateLimiter").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;

    #[test]
    fn test_default_rps_constant() {
        assert_eq!(rate_limits::BITBUCKET_CLOUD_DEFAULT_RPS, 2);
    }

    #[tokio::test]
    async fn test_first_request_is_not_delayed() {
        let limiter = ApiRateLimiter::new(100);
        let start = Instant::now();
        limiter.wait().await;
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_zero_rps_still_admits_requests() {
        let limiter = ApiRateLimiter::new(0);
        let cloned = limiter.clone();
        let start = Instant::now();
        cloned.wait().await;
        assert!(start.elapsed() < Duration::from_secs(5));
    }
}
