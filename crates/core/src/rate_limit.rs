//! Sliding-window rate limiting keyed by (bucket, identity).
//!
//! Each named bucket ("generate", "assist", ...) carries its own window
//! and limit so endpoint classes are throttled independently. Per
//! identity the limiter keeps the timestamps of accepted requests
//! inside the trailing window; older entries are evicted on each call.
//! This is a pure admission decision -- it never fails.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Window and ceiling for one bucket.
#[derive(Debug, Clone, Copy)]
pub struct RateLimit {
    /// Trailing window length.
    pub window: Duration,
    /// Maximum accepted requests per identity within the window.
    pub max_requests: usize,
}

impl RateLimit {
    pub fn new(window: Duration, max_requests: usize) -> Self {
        Self {
            window,
            max_requests,
        }
    }
}

/// Concurrency-safe admission control.
///
/// Owned by the application state and passed explicitly to handlers;
/// never a process-wide global. A rejected call leaves no trace, so
/// denied requests do not consume budget.
#[derive(Debug, Default)]
pub struct RateLimiter {
    /// bucket name -> identity -> accepted-request timestamps.
    buckets: Mutex<HashMap<String, HashMap<String, VecDeque<Instant>>>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit or reject a request from `identity` in `bucket`.
    ///
    /// Returns `true` and records the request if fewer than
    /// `limit.max_requests` accepted requests fall within the trailing
    /// `limit.window`; returns `false` with no state change otherwise.
    pub fn allow(&self, bucket: &str, identity: &str, limit: RateLimit) -> bool {
        self.allow_at(Instant::now(), bucket, identity, limit)
    }

    /// Clock-parametrized variant of [`RateLimiter::allow`] so window
    /// expiry can be tested without sleeping.
    pub fn allow_at(&self, now: Instant, bucket: &str, identity: &str, limit: RateLimit) -> bool {
        let mut buckets = self.buckets.lock().expect("rate limiter lock poisoned");
        let window = buckets
            .entry(bucket.to_string())
            .or_default()
            .entry(identity.to_string())
            .or_default();

        while let Some(&front) = window.front() {
            if now.duration_since(front) >= limit.window {
                window.pop_front();
            } else {
                break;
            }
        }

        if window.len() >= limit.max_requests {
            return false;
        }
        window.push_back(now);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limit(window_secs: u64, max: usize) -> RateLimit {
        RateLimit::new(Duration::from_secs(window_secs), max)
    }

    #[test]
    fn allows_exactly_max_requests_within_window() {
        let limiter = RateLimiter::new();
        let t0 = Instant::now();
        for _ in 0..3 {
            assert!(limiter.allow_at(t0, "generate", "id-a", limit(60, 3)));
        }
        assert!(!limiter.allow_at(t0, "generate", "id-a", limit(60, 3)));
    }

    #[test]
    fn window_expiry_frees_budget() {
        let limiter = RateLimiter::new();
        let t0 = Instant::now();
        for _ in 0..2 {
            assert!(limiter.allow_at(t0, "generate", "id-a", limit(10, 2)));
        }
        assert!(!limiter.allow_at(t0 + Duration::from_secs(5), "generate", "id-a", limit(10, 2)));

        // Both entries have aged out of the trailing window.
        assert!(limiter.allow_at(t0 + Duration::from_secs(10), "generate", "id-a", limit(10, 2)));
    }

    #[test]
    fn identities_do_not_interfere() {
        let limiter = RateLimiter::new();
        let t0 = Instant::now();
        assert!(limiter.allow_at(t0, "generate", "id-a", limit(60, 1)));
        assert!(!limiter.allow_at(t0, "generate", "id-a", limit(60, 1)));

        // A different identity has its own window.
        assert!(limiter.allow_at(t0, "generate", "id-b", limit(60, 1)));
    }

    #[test]
    fn buckets_are_independent() {
        let limiter = RateLimiter::new();
        let t0 = Instant::now();
        assert!(limiter.allow_at(t0, "generate", "id-a", limit(60, 1)));
        assert!(!limiter.allow_at(t0, "generate", "id-a", limit(60, 1)));

        // Same identity, different bucket with its own limit.
        assert!(limiter.allow_at(t0, "assist", "id-a", limit(60, 10)));
    }

    #[test]
    fn rejected_requests_consume_no_budget() {
        let limiter = RateLimiter::new();
        let t0 = Instant::now();
        assert!(limiter.allow_at(t0, "generate", "id-a", limit(10, 1)));
        for _ in 0..5 {
            assert!(!limiter.allow_at(t0 + Duration::from_secs(1), "generate", "id-a", limit(10, 1)));
        }

        // Only the single accepted entry ages out; the rejections above
        // must not have extended the window.
        assert!(limiter.allow_at(t0 + Duration::from_secs(10), "generate", "id-a", limit(10, 1)));
    }
}
