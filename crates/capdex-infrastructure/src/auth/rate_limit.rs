//! Token-bucket admission control
//!
//! One bucket per identity, refilled continuously at the configured
//! per-minute rate with a burst allowance on top. Admission is an O(1)
//! lookup plus an atomic map entry update; counters are updated on every
//! successful admission, including response-cache hits.

use capdex_domain::error::{Error, Result};
use dashmap::DashMap;
use std::time::Instant;

/// Rate limiter configuration
#[derive(Debug, Clone, Copy)]
pub struct RateLimiterConfig {
    /// Default admissions per identity per minute
    pub default_per_minute: u32,
    /// Burst capacity on top of the steady rate
    pub burst: u32,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            default_per_minute: capdex_domain::constants::DEFAULT_RATE_LIMIT_PER_MINUTE,
            burst: capdex_domain::constants::DEFAULT_RATE_LIMIT_BURST,
        }
    }
}

/// What the caller is told about its quota
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateLimitDecision {
    /// Steady per-minute quota for this identity
    pub limit: u32,
    /// Whole tokens left in the bucket after this admission
    pub remaining: u32,
    /// Seconds until at least one token is available again
    pub reset_secs: u64,
}

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

/// Per-identity token-bucket rate limiter
pub struct RateLimiter {
    config: RateLimiterConfig,
    buckets: DashMap<String, Bucket>,
}

impl RateLimiter {
    /// Create a limiter with the given configuration
    pub fn new(config: RateLimiterConfig) -> Self {
        Self {
            config,
            buckets: DashMap::new(),
        }
    }

    /// Try to admit one request for `key`.
    ///
    /// `per_minute_override` comes from the API key record when present.
    pub fn admit(&self, key: &str, per_minute_override: Option<u32>) -> Result<RateLimitDecision> {
        let per_minute = per_minute_override.unwrap_or(self.config.default_per_minute).max(1);
        let rate_per_sec = f64::from(per_minute) / 60.0;
        let capacity = f64::from(per_minute + self.config.burst);

        let mut entry = self.buckets.entry(key.to_string()).or_insert_with(|| Bucket {
            tokens: capacity,
            last_refill: Instant::now(),
        });

        let now = Instant::now();
        let elapsed = now.duration_since(entry.last_refill).as_secs_f64();
        entry.tokens = (entry.tokens + elapsed * rate_per_sec).min(capacity);
        entry.last_refill = now;

        if entry.tokens < 1.0 {
            let deficit = 1.0 - entry.tokens;
            let retry_after = (deficit / rate_per_sec).ceil() as u64;
            return Err(Error::rate_limited(retry_after.max(1)));
        }

        entry.tokens -= 1.0;
        let remaining = entry.tokens.floor().max(0.0) as u32;
        let reset_secs = if entry.tokens >= 1.0 {
            0
        } else {
            ((1.0 - entry.tokens) / rate_per_sec).ceil() as u64
        };

        Ok(RateLimitDecision {
            limit: per_minute,
            remaining,
            reset_secs,
        })
    }

    /// Drop buckets idle long enough to be fully refilled
    pub fn cleanup(&self) {
        let idle_cutoff = 120.0;
        self.buckets
            .retain(|_, bucket| bucket.last_refill.elapsed().as_secs_f64() < idle_cutoff);
    }
}
