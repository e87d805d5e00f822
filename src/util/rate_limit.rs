//! Rate limiting utilities

use dashmap::DashMap;
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::num::NonZeroU32;
use std::sync::Arc;

/// Rate limiter type alias
pub type Limiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Create a rate limiter with the specified requests per second
pub fn create_limiter(requests_per_second: u32) -> Arc<Limiter> {
    let quota = Quota::per_second(NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN));
    Arc::new(RateLimiter::direct(quota))
}

/// Login attempt rate limit (per email)
pub const LOGIN_RATE_LIMIT: u32 = 5; // Max 5 attempts per second

/// Registration rate limit (per email)
pub const REGISTER_RATE_LIMIT: u32 = 2; // Max 2 attempts per second

/// Keyed rate limiter - one limiter per key, created lazily
#[derive(Clone)]
pub struct KeyedRateLimiter {
    limiters: Arc<DashMap<String, Arc<Limiter>>>,
    requests_per_second: u32,
}

impl KeyedRateLimiter {
    pub fn new(requests_per_second: u32) -> Self {
        Self {
            limiters: Arc::new(DashMap::new()),
            requests_per_second,
        }
    }

    /// Check if a request for the given key is allowed (returns true if allowed)
    pub fn check(&self, key: &str) -> bool {
        let limiter = self
            .limiters
            .entry(key.to_string())
            .or_insert_with(|| create_limiter(self.requests_per_second))
            .clone();
        limiter.check().is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_within_quota() {
        let limiter = KeyedRateLimiter::new(5);
        assert!(limiter.check("a@example.com"));
    }

    #[test]
    fn blocks_burst_over_quota() {
        let limiter = KeyedRateLimiter::new(1);
        assert!(limiter.check("b@example.com"));
        // Second immediate attempt for the same key exceeds the burst quota
        assert!(!limiter.check("b@example.com"));
        // Other keys are unaffected
        assert!(limiter.check("c@example.com"));
    }
}
