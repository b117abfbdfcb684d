//! Rate Limiter
//!
//! Fixed-window request counting built on the store's public primitives: an
//! add-only counter key carrying the window TTL, incremented per request.

use std::sync::Arc;

use tracing::debug;

use crate::cache::TypedTtlStore;
use crate::error::{CacheError, Result};

const KEY_PREFIX: &str = "ratelimit:";

/// Attempts before giving up on a counter that keeps expiring mid-request.
const MAX_ATTEMPTS: usize = 3;

// == Rate Limit Decision ==
/// Outcome of a single rate limit check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitDecision {
    /// Whether the request may proceed
    pub allowed: bool,
    /// Requests permitted per window
    pub limit: i64,
    /// Requests left in the current window
    pub remaining: i64,
    /// Unix timestamp (seconds) at which the window resets
    pub reset_at: i64,
}

// == Rate Limiter ==
/// Allows at most `limit` requests per client within each `window_secs` window.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    store: Arc<TypedTtlStore>,
    limit: i64,
    window_secs: u64,
}

impl RateLimiter {
    pub fn new(store: Arc<TypedTtlStore>, limit: i64, window_secs: u64) -> Self {
        Self {
            store,
            limit,
            window_secs: window_secs.max(1),
        }
    }

    /// Counts a request from `client_id` and decides whether it is allowed.
    ///
    /// Denied requests do not consume quota.
    pub fn check(&self, client_id: &str) -> Result<RateLimitDecision> {
        let key = format!("{}{}", KEY_PREFIX, client_id);

        for _ in 0..MAX_ATTEMPTS {
            if !self.store.exists(&key) {
                match self.store.store(&key, 0, self.window_secs, false) {
                    // Another request opened the window first
                    Ok(()) | Err(CacheError::Rejected(_)) => {}
                    Err(e) => return Err(e),
                }
            }

            let count = match self.store.increment(&key, 1) {
                Ok(value) => value.as_i64().unwrap_or(i64::MAX),
                // Window expired between the check and the increment
                Err(CacheError::NotFound(_)) => continue,
                Err(e) => return Err(e),
            };

            if count > self.limit {
                self.release(&key)?;
                debug!("rate limit exceeded for {}", client_id);
                return self.decision(&key, false, 0);
            }

            return self.decision(&key, true, self.limit - count);
        }

        Err(CacheError::NotFound(key))
    }

    /// Requests left for `client_id` in the current window without counting one.
    pub fn remaining(&self, client_id: &str) -> i64 {
        let key = format!("{}{}", KEY_PREFIX, client_id);
        match self.store.peek(&key) {
            Ok(value) => (self.limit - value.as_i64().unwrap_or(self.limit)).max(0),
            Err(_) => self.limit,
        }
    }

    /// Hands back one counted request so the stored count stays at the limit.
    fn release(&self, key: &str) -> Result<()> {
        match self.store.decrement(key, 1) {
            // Window expired after the increment, nothing left to return
            Ok(_) | Err(CacheError::NotFound(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }

    fn decision(&self, key: &str, allowed: bool, remaining: i64) -> Result<RateLimitDecision> {
        Ok(RateLimitDecision {
            allowed,
            limit: self.limit,
            remaining,
            reset_at: self.store.ttl(key, true)?,
        })
    }
}
