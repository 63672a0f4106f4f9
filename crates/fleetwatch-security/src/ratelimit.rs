//! Keyed token-bucket rate limiter.
//!
//! Each key accrues fractional tokens over time up to `max_requests`;
//! every permitted call consumes one token. A single mutex guards the
//! bucket map so refill and consumption are atomic per call.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// One bucket per logical identity (`user:<id>`, `server:<id>`, ...).
#[derive(Debug)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

/// Outcome of one rate-limit check.
#[derive(Debug, Clone, PartialEq)]
pub struct RateLimitDecision {
    /// Whether the call is permitted.
    pub allowed: bool,
    /// Whole tokens remaining after this call.
    pub remaining: u32,
    /// Seconds until the next token accrues (0 when allowed).
    pub retry_after_seconds: f64,
}

/// In-process, per-key token-bucket rate limiter.
#[derive(Debug, Default)]
pub struct RateLimiter {
    buckets: Mutex<HashMap<String, Bucket>>,
}

impl RateLimiter {
    /// Create an empty rate limiter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Check and consume one token for `key`.
    ///
    /// The bucket refills at `max_requests / window_seconds` tokens per
    /// second, capped at `max_requests`. Two concurrent callers for the
    /// same key cannot both consume the same fractional token.
    pub fn check(&self, key: &str, max_requests: u32, window_seconds: u64) -> RateLimitDecision {
        let max = f64::from(max_requests.max(1));
        let rate = max / window_seconds.max(1) as f64;
        let now = Instant::now();

        let mut buckets = self.buckets.lock().unwrap_or_else(|e| e.into_inner());
        let bucket = buckets.entry(key.to_string()).or_insert(Bucket {
            tokens: max,
            last_refill: now,
        });

        let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * rate).min(max);
        bucket.last_refill = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            RateLimitDecision {
                allowed: true,
                remaining: bucket.tokens.floor() as u32,
                retry_after_seconds: 0.0,
            }
        } else {
            RateLimitDecision {
                allowed: false,
                remaining: 0,
                retry_after_seconds: (1.0 - bucket.tokens) / rate,
            }
        }
    }

    /// Drop the bucket for `key`, restoring a full allowance.
    pub fn reset(&self, key: &str) {
        let mut buckets = self.buckets.lock().unwrap_or_else(|e| e.into_inner());
        buckets.remove(key);
    }

    /// Evict buckets idle for longer than `max_age`.
    ///
    /// Idle full buckets carry no state worth keeping; without eviction
    /// the map grows with every distinct key ever seen.
    pub fn purge_idle(&self, max_age: Duration) {
        let now = Instant::now();
        let mut buckets = self.buckets.lock().unwrap_or_else(|e| e.into_inner());
        buckets.retain(|_, bucket| now.duration_since(bucket.last_refill) < max_age);
    }

    /// Number of tracked keys.
    pub fn tracked_keys(&self) -> usize {
        self.buckets.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}
