//! Cache Store Module
//!
//! Main cache engine: sharded concurrent map storage with typed values, lazy
//! TTL expiration, hit tracking and pattern scans.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{debug, warn};

use crate::cache::stats::StatsCounters;
use crate::cache::{
    CacheEntry, CacheStats, Clock, KeyPattern, Mutation, SystemClock, Value, MAX_KEY_LENGTH,
};
use crate::config::Config;
use crate::error::{CacheError, Result};

/// Shard count used when none is configured.
pub const DEFAULT_SHARD_COUNT: usize = 16;

// == Typed TTL Store ==
/// Concurrent typed key/value store with TTL support.
///
/// Keys live in a `DashMap` whose shards are locked independently. Point
/// operations lock a single shard; full scans lock one shard at a time.
/// Expired entries stay in memory, invisible to reads, until reaped, deleted
/// or overwritten.
///
/// # Example
/// ```
/// use typed_ttl_store::cache::TypedTtlStore;
///
/// let store = TypedTtlStore::new(1000);
/// store.store("hits", 0, 60, false).unwrap();
/// assert_eq!(store.increment("hits", 1).unwrap().as_i64(), Some(1));
/// ```
#[derive(Debug)]
pub struct TypedTtlStore {
    entries: DashMap<String, CacheEntry>,
    clock: Arc<dyn Clock>,
    /// Entries held, expired ones included
    len: AtomicUsize,
    /// Stamp handed to the next insert
    next_generation: AtomicU64,
    stats: StatsCounters,
    max_entries: usize,
}

impl TypedTtlStore {
    // == Constructors ==
    /// Creates a store holding at most `max_entries` entries on the system clock.
    pub fn new(max_entries: usize) -> Self {
        Self::with_clock(max_entries, DEFAULT_SHARD_COUNT, Arc::new(SystemClock))
    }

    /// Creates a store from configuration.
    pub fn from_config(config: &Config) -> Self {
        Self::with_clock(config.max_entries, config.shard_count, Arc::new(SystemClock))
    }

    /// Creates a store with an explicit shard count and time source.
    ///
    /// The shard count is rounded up to a power of two, minimum 2.
    pub fn with_clock(max_entries: usize, shard_count: usize, clock: Arc<dyn Clock>) -> Self {
        let shard_amount = shard_count.max(2).next_power_of_two();

        Self {
            entries: DashMap::with_shard_amount(shard_amount),
            clock,
            len: AtomicUsize::new(0),
            next_generation: AtomicU64::new(0),
            stats: StatsCounters::default(),
            max_entries,
        }
    }

    // == Exists ==
    /// Returns true if `key` is present and unexpired. Does not count as a hit.
    pub fn exists(&self, key: &str) -> bool {
        let now = self.clock.now_ms();
        self.entries
            .get(key)
            .is_some_and(|entry| !entry.is_expired_at(now))
    }

    // == Fetch ==
    /// Retrieves a value by key, counting a hit on the entry.
    pub fn fetch(&self, key: &str) -> Result<Value> {
        let now = self.clock.now_ms();

        match self.entries.get(key) {
            Some(entry) if !entry.is_expired_at(now) => {
                entry.record_hit();
                self.stats.record_hit();
                Ok(entry.value.clone())
            }
            _ => {
                self.stats.record_miss();
                Err(CacheError::NotFound(key.to_string()))
            }
        }
    }

    // == Peek ==
    /// Reads a live value without counting a hit or touching stats.
    pub fn peek(&self, key: &str) -> Result<Value> {
        let now = self.clock.now_ms();
        self.entries
            .get(key)
            .filter(|entry| !entry.is_expired_at(now))
            .map(|entry| entry.value.clone())
            .ok_or_else(|| CacheError::NotFound(key.to_string()))
    }

    // == Store ==
    /// Stores a value.
    ///
    /// Without `overwrite`, a live entry under `key` makes this fail with
    /// `Rejected` and leaves it untouched. An expired entry is always replaced.
    /// A `ttl_seconds` of 0 means the entry never expires; a TTL whose expiry
    /// falls outside the representable timestamp range fails with
    /// `InvalidRequest`. Writing resets the entry's hit count.
    ///
    /// # Arguments
    /// * `key` - The key to store
    /// * `value` - The value to store
    /// * `ttl_seconds` - Seconds until expiry, 0 = never
    /// * `overwrite` - Replace an existing live entry
    pub fn store(
        &self,
        key: &str,
        value: impl Into<Value>,
        ttl_seconds: u64,
        overwrite: bool,
    ) -> Result<()> {
        validate_key(key)?;

        let now = self.clock.now_ms();
        let expires_at = expiry_ms(ttl_seconds, now)?;
        let slot = self.entries.entry(key.to_string());

        match &slot {
            Entry::Occupied(existing) if !overwrite && !existing.get().is_expired_at(now) => {
                debug!("store rejected, key exists: {}", key);
                return Err(CacheError::Rejected(key.to_string()));
            }
            Entry::Occupied(_) => {}
            Entry::Vacant(_) => self.reserve_slot()?,
        }

        // Stamped under the shard lock
        let generation = self.next_generation.fetch_add(1, Ordering::SeqCst);
        let entry = CacheEntry::new(value.into(), expires_at, now, generation);

        match slot {
            Entry::Occupied(mut existing) => {
                existing.insert(entry);
            }
            Entry::Vacant(vacant) => {
                vacant.insert(entry);
            }
        }
        Ok(())
    }

    // == Update ==
    /// Applies a mutation to a live entry, keeping its absolute expiry.
    ///
    /// Deltas run as a read-modify-write under the shard lock, so concurrent
    /// increments are never lost. Returns the new value.
    pub fn update(&self, key: &str, mutation: impl Into<Mutation>) -> Result<Value> {
        let mutation: Mutation = mutation.into();
        let now = self.clock.now_ms();

        let mut entry = match self.entries.get_mut(key) {
            Some(entry) if !entry.is_expired_at(now) => entry,
            _ => return Err(CacheError::NotFound(key.to_string())),
        };

        let value = mutation.apply_to(key, &entry.value)?;
        entry.replace_value(value.clone(), now);
        Ok(value)
    }

    /// Adds `by` to the numeric value at `key`.
    pub fn increment(&self, key: &str, by: i64) -> Result<Value> {
        self.update(key, Mutation::Increment(by))
    }

    /// Subtracts `by` from the numeric value at `key`.
    pub fn decrement(&self, key: &str, by: i64) -> Result<Value> {
        self.update(key, Mutation::Decrement(by))
    }

    // == Delete ==
    /// Removes an entry, expired or not. Returns whether anything was removed.
    pub fn delete(&self, key: &str) -> bool {
        let removed = self.entries.remove(key).is_some();
        if removed {
            self.len.fetch_sub(1, Ordering::SeqCst);
        }
        removed
    }

    // == TTL ==
    /// Returns the expiry of a live entry.
    ///
    /// Non-expiring entries report 0. Otherwise returns the remaining whole
    /// seconds, or the Unix timestamp (seconds) of expiry when `absolute`.
    pub fn ttl(&self, key: &str, absolute: bool) -> Result<i64> {
        let now = self.clock.now_ms();
        let entry = self
            .entries
            .get(key)
            .filter(|entry| !entry.is_expired_at(now))
            .ok_or_else(|| CacheError::NotFound(key.to_string()))?;

        Ok(match entry.expires_at {
            None => 0,
            Some(expires) if absolute => (expires / 1000) as i64,
            Some(_) => entry.ttl_remaining_secs(now).unwrap_or(0),
        })
    }

    /// Returns the absolute expiry of a live entry, `None` if it never expires.
    pub fn expires_at(&self, key: &str) -> Result<Option<DateTime<Utc>>> {
        let now = self.clock.now_ms();

        self.entries
            .get(key)
            .filter(|entry| !entry.is_expired_at(now))
            .map(|entry| {
                entry
                    .expires_at
                    .and_then(|ms| DateTime::from_timestamp_millis(ms as i64))
            })
            .ok_or_else(|| CacheError::NotFound(key.to_string()))
    }

    // == Search By Pattern ==
    /// Collects live entries whose key matches `pattern`.
    ///
    /// Without `include_values`, each matched key maps to itself and an empty
    /// map is returned when nothing matches. With `include_values`, keys map to
    /// their values and no match fails with `Empty`.
    pub fn search_by_pattern(
        &self,
        pattern: &str,
        include_values: bool,
    ) -> Result<BTreeMap<String, Value>> {
        let pattern = KeyPattern::new(pattern)?;
        let now = self.clock.now_ms();
        let mut found = BTreeMap::new();

        for item in self.entries.iter() {
            let (key, entry) = item.pair();
            if entry.is_expired_at(now) || !pattern.matches(key) {
                continue;
            }
            let value = if include_values {
                entry.value.clone()
            } else {
                Value::Str(key.clone())
            };
            found.insert(key.clone(), value);
        }

        debug!("pattern {} matched {} keys", pattern.as_str(), found.len());

        if include_values && found.is_empty() {
            return Err(CacheError::Empty(pattern.as_str().to_string()));
        }
        Ok(found)
    }

    // == Delete By Pattern ==
    /// Deletes every entry whose key matches `pattern`, expired ones included.
    ///
    /// Only entries written before the call started are removed; keys stored
    /// or overwritten by concurrent writers during the scan survive.
    pub fn delete_by_pattern(&self, pattern: &str) -> Result<usize> {
        let pattern = KeyPattern::new(pattern)?;
        let watermark = self.next_generation.load(Ordering::SeqCst);

        let removed = self.remove_matching_before(&pattern, watermark);

        debug!("pattern {} deleted {} keys", pattern.as_str(), removed);
        Ok(removed)
    }

    // == Reap Expired ==
    /// Removes all entries whose expiry has passed. Returns the number removed.
    pub fn reap_expired(&self) -> usize {
        let now = self.clock.now_ms();
        let removed = self.remove_where(|_, entry| entry.is_expired_at(now));
        self.stats.record_reaped(removed);
        removed
    }

    // == Purge Unpopular ==
    /// Removes every entry fetched fewer than `min_hits` times, regardless of
    /// its remaining TTL. Returns the number removed.
    pub fn purge_unpopular(&self, min_hits: u64) -> usize {
        let removed = self.remove_where(|_, entry| entry.hits() < min_hits);
        self.stats.record_purged(removed);
        removed
    }

    // == Clear ==
    /// Removes all entries. Returns the number removed.
    pub fn clear(&self) -> usize {
        self.remove_where(|_, _| true)
    }

    // == Capacity ==
    /// Percentage of entry slots still free, rounded to one decimal place.
    pub fn capacity_free_ratio(&self) -> f64 {
        if self.max_entries == 0 {
            return 0.0;
        }
        let free = self.max_entries.saturating_sub(self.len());
        let percent = free as f64 / self.max_entries as f64 * 100.0;
        (percent * 10.0).round() / 10.0
    }

    /// Maximum number of entries this store accepts.
    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot(self.len())
    }

    // == Length ==
    /// Returns the number of entries held, including expired ones not yet reaped.
    pub fn len(&self) -> usize {
        self.len.load(Ordering::SeqCst)
    }

    // == Is Empty ==
    /// Returns true if the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // == Internals ==
    /// Claims one entry slot, failing when the store is full.
    fn reserve_slot(&self) -> Result<()> {
        self.len
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                (n < self.max_entries).then_some(n + 1)
            })
            .map(|_| ())
            .map_err(|_| {
                warn!("store full at {} entries", self.max_entries);
                CacheError::CapacityExceeded {
                    max_entries: self.max_entries,
                }
            })
    }

    /// Removes entries matching `pattern` stamped before `watermark`.
    fn remove_matching_before(&self, pattern: &KeyPattern, watermark: u64) -> usize {
        self.remove_where(|key, entry| entry.generation < watermark && pattern.matches(key))
    }

    /// Removes matching entries, locking one shard at a time.
    fn remove_where<F>(&self, predicate: F) -> usize
    where
        F: Fn(&str, &CacheEntry) -> bool,
    {
        let mut removed = 0;
        self.entries.retain(|key, entry| {
            if predicate(key.as_str(), entry) {
                self.len.fetch_sub(1, Ordering::SeqCst);
                removed += 1;
                false
            } else {
                true
            }
        });
        removed
    }
}

/// Converts a TTL into an absolute expiry, None for TTL 0.
///
/// Expiries past the last instant `chrono` can represent are rejected.
fn expiry_ms(ttl_seconds: u64, now_ms: u64) -> Result<Option<u64>> {
    if ttl_seconds == 0 {
        return Ok(None);
    }

    let max_expiry_ms = DateTime::<Utc>::MAX_UTC.timestamp_millis() as u64;
    ttl_seconds
        .checked_mul(1000)
        .and_then(|ttl_ms| now_ms.checked_add(ttl_ms))
        .filter(|expires| *expires <= max_expiry_ms)
        .map(Some)
        .ok_or_else(|| {
            CacheError::InvalidRequest(format!("TTL of {} seconds is out of range", ttl_seconds))
        })
}

fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(CacheError::InvalidRequest("Key cannot be empty".to_string()));
    }
    if key.len() > MAX_KEY_LENGTH {
        return Err(CacheError::InvalidRequest(format!(
            "Key exceeds maximum length of {} bytes",
            MAX_KEY_LENGTH
        )));
    }
    Ok(())
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ManualClock;
    use std::time::Duration;

    const START_MS: u64 = 1_700_000_000_000;

    fn store_with_clock(max_entries: usize) -> (TypedTtlStore, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(START_MS));
        let store = TypedTtlStore::with_clock(max_entries, 4, clock.clone());
        (store, clock)
    }

    #[test]
    fn test_store_new() {
        let store = TypedTtlStore::new(100);
        assert_eq!(store.len(), 0);
        assert!(store.is_empty());
        assert_eq!(store.max_entries(), 100);
    }

    #[test]
    fn test_store_and_fetch_keeps_type() {
        let (store, _) = store_with_clock(100);

        store.store("int", 5, 0, false).unwrap();
        store.store("str", "5", 0, false).unwrap();

        assert_eq!(store.fetch("int").unwrap(), Value::Int(5));
        assert_eq!(store.fetch("str").unwrap(), Value::Str("5".to_string()));
        assert!(store.exists("int"));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_fetch_nonexistent() {
        let (store, _) = store_with_clock(100);
        assert!(matches!(store.fetch("missing"), Err(CacheError::NotFound(_))));
    }

    #[test]
    fn test_add_only_rejects_existing() {
        let (store, _) = store_with_clock(100);

        store.store("k", "v1", 60, false).unwrap();
        let result = store.store("k", "v2", 60, false);

        assert!(matches!(result, Err(CacheError::Rejected(_))));
        assert_eq!(store.fetch("k").unwrap(), Value::from("v1"));
    }

    #[test]
    fn test_overwrite_replaces_and_resets_hits() {
        let (store, _) = store_with_clock(100);

        store.store("k", "v1", 0, false).unwrap();
        store.fetch("k").unwrap();
        store.store("k", "v2", 0, true).unwrap();

        assert_eq!(store.fetch("k").unwrap(), Value::from("v2"));
        assert_eq!(store.len(), 1);
        // One fetch after the overwrite, so a purge at 2 removes it
        assert_eq!(store.purge_unpopular(2), 1);
    }

    #[test]
    fn test_add_only_replaces_expired_entry() {
        let (store, clock) = store_with_clock(100);

        store.store("k", 1, 1, false).unwrap();
        clock.advance(Duration::from_secs(2));

        store.store("k", 2, 0, false).unwrap();
        assert_eq!(store.fetch("k").unwrap(), Value::Int(2));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_exists_does_not_count_hit() {
        let (store, _) = store_with_clock(100);

        store.store("k", 1, 0, false).unwrap();
        assert!(store.exists("k"));
        assert!(store.exists("k"));

        assert_eq!(store.stats().hits, 0);
        assert_eq!(store.purge_unpopular(1), 1);
    }

    #[test]
    fn test_expired_entry_is_invisible() {
        let (store, clock) = store_with_clock(100);

        store.store("k", 1, 1, false).unwrap();
        clock.advance(Duration::from_millis(1_000));

        assert!(!store.exists("k"));
        assert!(matches!(store.fetch("k"), Err(CacheError::NotFound(_))));
        assert!(matches!(store.ttl("k", false), Err(CacheError::NotFound(_))));
        assert!(matches!(store.increment("k", 1), Err(CacheError::NotFound(_))));
        // Still physically present until reaped
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_update_preserves_absolute_expiry() {
        let (store, clock) = store_with_clock(100);

        store.store("k", 1, 100, false).unwrap();
        let expiry = store.ttl("k", true).unwrap();

        clock.advance(Duration::from_secs(10));
        let updated = store.update("k", Value::from(2)).unwrap();

        assert_eq!(updated, Value::Int(2));
        assert_eq!(store.ttl("k", false).unwrap(), 90);
        assert_eq!(store.ttl("k", true).unwrap(), expiry);
    }

    #[test]
    fn test_update_without_ttl_stays_permanent() {
        let (store, clock) = store_with_clock(100);

        store.store("k", 1, 0, false).unwrap();
        clock.advance(Duration::from_secs(10));
        store.increment("k", 4).unwrap();

        assert_eq!(store.ttl("k", false).unwrap(), 0);
        assert_eq!(store.expires_at("k").unwrap(), None);
    }

    #[test]
    fn test_update_keeps_hits() {
        let (store, _) = store_with_clock(100);

        store.store("k", 1, 0, false).unwrap();
        store.fetch("k").unwrap();
        store.fetch("k").unwrap();
        store.increment("k", 1).unwrap();

        assert_eq!(store.purge_unpopular(2), 0);
        assert_eq!(store.purge_unpopular(3), 1);
    }

    #[test]
    fn test_update_missing_key() {
        let (store, _) = store_with_clock(100);
        assert!(matches!(
            store.update("missing", Value::from(1)),
            Err(CacheError::NotFound(_))
        ));
    }

    #[test]
    fn test_increment_and_decrement() {
        let (store, _) = store_with_clock(100);

        store.store("counter", 5, 0, false).unwrap();
        assert_eq!(store.increment("counter", 3).unwrap(), Value::Int(8));
        assert_eq!(store.decrement("counter", 10).unwrap(), Value::Int(-2));
        assert_eq!(store.update("counter", Mutation::parse("inc:2")).unwrap(), Value::Int(0));
    }

    #[test]
    fn test_increment_non_numeric_fails_without_mutation() {
        let (store, _) = store_with_clock(100);

        store.store("name", "five", 0, false).unwrap();
        let result = store.increment("name", 1);

        assert!(matches!(result, Err(CacheError::TypeMismatch { .. })));
        assert_eq!(store.fetch("name").unwrap(), Value::from("five"));
    }

    #[test]
    fn test_delete() {
        let (store, _) = store_with_clock(100);

        store.store("k", 1, 0, false).unwrap();
        assert!(store.delete("k"));
        assert!(!store.delete("k"));
        assert!(store.is_empty());
    }

    #[test]
    fn test_delete_expired_entry() {
        let (store, clock) = store_with_clock(100);

        store.store("k", 1, 1, false).unwrap();
        clock.advance(Duration::from_secs(5));

        assert!(store.delete("k"));
        assert!(store.is_empty());
    }

    #[test]
    fn test_ttl_values() {
        let (store, clock) = store_with_clock(100);

        store.store("forever", 1, 0, false).unwrap();
        store.store("short", 1, 30, false).unwrap();

        assert_eq!(store.ttl("forever", false).unwrap(), 0);
        assert_eq!(store.ttl("forever", true).unwrap(), 0);
        assert_eq!(store.ttl("short", false).unwrap(), 30);
        assert_eq!(
            store.ttl("short", true).unwrap(),
            (START_MS / 1000 + 30) as i64
        );

        clock.advance(Duration::from_millis(12_500));
        assert_eq!(store.ttl("short", false).unwrap(), 18);
    }

    #[test]
    fn test_expires_at() {
        let (store, _) = store_with_clock(100);

        store.store("k", 1, 60, false).unwrap();
        let expiry = store.expires_at("k").unwrap().unwrap();
        assert_eq!(expiry.timestamp_millis() as u64, START_MS + 60_000);
    }

    #[test]
    fn test_ttl_beyond_timestamp_range_rejected() {
        let clock = Arc::new(ManualClock::new(0));
        let store = TypedTtlStore::with_clock(100, 4, clock);

        for ttl in [10_000_000_000_000_000, 9_223_372_036_854_775, u64::MAX] {
            assert!(matches!(
                store.store("k", 1, ttl, false),
                Err(CacheError::InvalidRequest(_))
            ));
        }
        assert!(store.is_empty());
    }

    #[test]
    fn test_largest_ttl_stays_positive() {
        let (store, _) = store_with_clock(100);
        let max_ms = DateTime::<Utc>::MAX_UTC.timestamp_millis() as u64;
        let max_ttl = (max_ms - START_MS) / 1000;

        store.store("far", 1, max_ttl, false).unwrap();
        assert_eq!(store.ttl("far", false).unwrap(), max_ttl as i64);
        assert!(store.expires_at("far").unwrap().is_some());

        assert!(matches!(
            store.store("further", 1, max_ttl + 1, false),
            Err(CacheError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_peek_does_not_count_hit() {
        let (store, clock) = store_with_clock(100);

        store.store("k", 7, 1, false).unwrap();
        assert_eq!(store.peek("k").unwrap(), Value::Int(7));
        assert!(matches!(store.peek("missing"), Err(CacheError::NotFound(_))));

        let stats = store.stats();
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 0);

        clock.advance(Duration::from_secs(1));
        assert!(matches!(store.peek("k"), Err(CacheError::NotFound(_))));
        assert_eq!(store.purge_unpopular(1), 1);
    }

    #[test]
    fn test_search_by_pattern_keys_only() {
        let (store, _) = store_with_clock(100);

        store.store("myvar_a", 1, 0, false).unwrap();
        store.store("myvar_b", 2, 0, false).unwrap();
        store.store("other", 3, 0, false).unwrap();

        let found = store.search_by_pattern("/^myvar_(.*)$/", false).unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found["myvar_a"], Value::from("myvar_a"));
        assert_eq!(found["myvar_b"], Value::from("myvar_b"));
    }

    #[test]
    fn test_search_by_pattern_with_values() {
        let (store, _) = store_with_clock(100);

        store.store("myvar_a", 1, 0, false).unwrap();
        store.store("myvar_b", "two", 0, false).unwrap();

        let found = store.search_by_pattern("^myvar_", true).unwrap();
        assert_eq!(found["myvar_a"], Value::Int(1));
        assert_eq!(found["myvar_b"], Value::from("two"));
    }

    #[test]
    fn test_search_empty_asymmetry() {
        let (store, _) = store_with_clock(100);

        store.store("other", 1, 0, false).unwrap();

        assert!(store.search_by_pattern("^myvar_", false).unwrap().is_empty());
        assert!(matches!(
            store.search_by_pattern("^myvar_", true),
            Err(CacheError::Empty(_))
        ));
    }

    #[test]
    fn test_search_skips_expired_and_does_not_hit() {
        let (store, clock) = store_with_clock(100);

        store.store("a_live", 1, 0, false).unwrap();
        store.store("a_dead", 1, 1, false).unwrap();
        clock.advance(Duration::from_secs(2));

        let found = store.search_by_pattern("^a_", true).unwrap();
        assert_eq!(found.keys().collect::<Vec<_>>(), vec!["a_live"]);
        assert_eq!(store.stats().hits, 0);
    }

    #[test]
    fn test_search_invalid_pattern() {
        let (store, _) = store_with_clock(100);
        assert!(matches!(
            store.search_by_pattern("(", false),
            Err(CacheError::InvalidPattern(_))
        ));
        assert!(matches!(
            store.delete_by_pattern("["),
            Err(CacheError::InvalidPattern(_))
        ));
    }

    #[test]
    fn test_delete_by_pattern_counts_expired() {
        let (store, clock) = store_with_clock(100);

        store.store("job_1", 1, 1, false).unwrap();
        store.store("job_2", 2, 0, false).unwrap();
        store.store("keep", 3, 0, false).unwrap();
        clock.advance(Duration::from_secs(2));

        assert!(!store.exists("job_1"));
        assert_eq!(store.delete_by_pattern("^job_").unwrap(), 2);
        assert_eq!(store.len(), 1);
        assert!(store.exists("keep"));
    }

    #[test]
    fn test_delete_by_pattern_spares_writes_after_watermark() {
        let (store, _) = store_with_clock(100);

        store.store("job_1", "old", 0, false).unwrap();
        store.store("job_2", "old", 0, false).unwrap();
        let watermark = store.next_generation.load(Ordering::SeqCst);

        // Writes landing while the scan is in flight
        store.store("job_1", "new", 0, true).unwrap();
        store.store("job_3", "new", 0, false).unwrap();

        let pattern = KeyPattern::new("^job_").unwrap();
        assert_eq!(store.remove_matching_before(&pattern, watermark), 1);

        assert!(!store.exists("job_2"));
        assert_eq!(store.fetch("job_1").unwrap(), Value::from("new"));
        assert_eq!(store.fetch("job_3").unwrap(), Value::from("new"));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_delete_by_pattern_no_match() {
        let (store, _) = store_with_clock(100);
        store.store("keep", 1, 0, false).unwrap();
        assert_eq!(store.delete_by_pattern("^nothing").unwrap(), 0);
    }

    #[test]
    fn test_reap_expired() {
        let (store, clock) = store_with_clock(100);

        store.store("short", 1, 1, false).unwrap();
        store.store("long", 2, 10, false).unwrap();
        store.store("forever", 3, 0, false).unwrap();
        clock.advance(Duration::from_secs(2));

        assert_eq!(store.reap_expired(), 1);
        assert_eq!(store.len(), 2);
        assert!(store.exists("long"));
        assert!(store.exists("forever"));
        assert_eq!(store.stats().reaped, 1);
    }

    #[test]
    fn test_purge_unpopular_threshold() {
        let (store, _) = store_with_clock(100);

        store.store("cold", 1, 3_600, false).unwrap();
        store.store("warm", 2, 0, false).unwrap();
        for _ in 0..4 {
            store.fetch("cold").unwrap();
        }
        for _ in 0..5 {
            store.fetch("warm").unwrap();
        }

        assert_eq!(store.purge_unpopular(5), 1);
        assert!(!store.exists("cold"));
        assert!(store.exists("warm"));
        assert_eq!(store.stats().purged, 1);
    }

    #[test]
    fn test_clear() {
        let (store, _) = store_with_clock(100);

        for i in 0..10 {
            store.store(&format!("key{}", i), i, 0, false).unwrap();
        }
        assert_eq!(store.clear(), 10);
        assert!(store.is_empty());
        assert_eq!(store.capacity_free_ratio(), 100.0);
    }

    #[test]
    fn test_capacity_exceeded() {
        let (store, _) = store_with_clock(2);

        store.store("a", 1, 0, false).unwrap();
        store.store("b", 2, 0, false).unwrap();

        assert!(matches!(
            store.store("c", 3, 0, false),
            Err(CacheError::CapacityExceeded { max_entries: 2 })
        ));
        // Overwriting an existing key needs no new slot
        store.store("a", 10, 0, true).unwrap();
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_capacity_free_ratio() {
        let (store, _) = store_with_clock(3);
        assert_eq!(store.capacity_free_ratio(), 100.0);

        store.store("a", 1, 0, false).unwrap();
        assert_eq!(store.capacity_free_ratio(), 66.7);

        store.store("b", 1, 0, false).unwrap();
        store.store("c", 1, 0, false).unwrap();
        assert_eq!(store.capacity_free_ratio(), 0.0);
    }

    #[test]
    fn test_stats_hits_and_misses() {
        let (store, _) = store_with_clock(100);

        store.store("k", 1, 0, false).unwrap();
        store.fetch("k").unwrap();
        let _ = store.fetch("missing");

        let stats = store.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.total_entries, 1);
    }

    #[test]
    fn test_store_key_validation() {
        let (store, _) = store_with_clock(100);

        assert!(matches!(
            store.store("", 1, 0, false),
            Err(CacheError::InvalidRequest(_))
        ));
        let long_key = "x".repeat(MAX_KEY_LENGTH + 1);
        assert!(matches!(
            store.store(&long_key, 1, 0, false),
            Err(CacheError::InvalidRequest(_))
        ));
    }
}
