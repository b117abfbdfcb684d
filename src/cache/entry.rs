//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::cache::Value;

// == Cache Entry ==
/// Represents a single cache entry with value and metadata.
#[derive(Debug)]
pub struct CacheEntry {
    /// The stored value
    pub value: Value,
    /// Timestamp of the most recent write (Unix milliseconds)
    pub created_at: u64,
    /// Expiration timestamp (Unix milliseconds), None = no expiration
    pub expires_at: Option<u64>,
    /// Store-wide stamp of the insert that created this entry
    pub generation: u64,
    /// Successful fetches since creation
    hits: AtomicU64,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new cache entry.
    ///
    /// # Arguments
    /// * `value` - The value to store
    /// * `expires_at` - Expiry (Unix milliseconds), None = never expires
    /// * `now_ms` - Current time (Unix milliseconds)
    /// * `generation` - Store-wide insert stamp
    pub fn new(value: Value, expires_at: Option<u64>, now_ms: u64, generation: u64) -> Self {
        Self {
            value,
            created_at: now_ms,
            expires_at,
            generation,
            hits: AtomicU64::new(0),
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired at `now_ms`.
    ///
    /// An entry is expired once the current time is greater than or equal to
    /// its expiration time. Entries without TTL never expire.
    pub fn is_expired_at(&self, now_ms: u64) -> bool {
        match self.expires_at {
            Some(expires) => now_ms >= expires,
            None => false,
        }
    }

    // == Time To Live ==
    /// Returns remaining TTL in whole seconds (rounded up), or None if no
    /// expiration is set. Negative once the entry has expired.
    pub fn ttl_remaining_secs(&self, now_ms: u64) -> Option<i64> {
        self.expires_at.map(|expires| {
            let remaining_ms = i128::from(expires) - i128::from(now_ms);
            let secs = if remaining_ms > 0 {
                (remaining_ms + 999) / 1000
            } else {
                remaining_ms / 1000
            };
            // |secs| <= u64::MAX / 1000, always within i64
            secs as i64
        })
    }

    // == Replace Value ==
    /// Overwrites the value while keeping the absolute expiry and hit count.
    pub fn replace_value(&mut self, value: Value, now_ms: u64) {
        self.value = value;
        self.created_at = now_ms;
    }

    // == Hits ==
    /// Returns the number of successful fetches.
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Counts one successful fetch.
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }
}
