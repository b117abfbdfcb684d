//! Configuration Module
//!
//! Handles loading store and janitor configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::tasks::JanitorPolicy;

/// Store and janitor configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum number of entries the store can hold
    pub max_entries: usize,
    /// Number of independently locked shards, rounded up to a power of two
    pub shard_count: usize,
    /// Janitor pass interval in seconds
    pub cleanup_interval: u64,
    /// Free capacity percentage below which the janitor purges
    pub min_free_percent: f64,
    /// Entries fetched fewer times than this are purged under pressure
    pub min_hits: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `MAX_ENTRIES` - Maximum store entries (default: 10000)
    /// - `SHARD_COUNT` - Lock shards (default: 16)
    /// - `CLEANUP_INTERVAL` - Janitor frequency in seconds (default: 60)
    /// - `MIN_FREE_PERCENT` - Purge threshold in percent (default: 20)
    /// - `MIN_HITS` - Purge hit floor (default: 10)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_entries: env_or("MAX_ENTRIES", defaults.max_entries),
            shard_count: env_or("SHARD_COUNT", defaults.shard_count),
            cleanup_interval: env_or("CLEANUP_INTERVAL", defaults.cleanup_interval),
            min_free_percent: env_or("MIN_FREE_PERCENT", defaults.min_free_percent),
            min_hits: env_or("MIN_HITS", defaults.min_hits),
        }
    }

    /// Builds the janitor policy described by this configuration.
    pub fn janitor_policy(&self) -> JanitorPolicy {
        JanitorPolicy {
            interval: Duration::from_secs(self.cleanup_interval),
            min_free_percent: self.min_free_percent,
            min_hits: self.min_hits,
            clear_as_last_resort: false,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_entries: 10_000,
            shard_count: 16,
            cleanup_interval: 60,
            min_free_percent: 20.0,
            min_hits: 10,
        }
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
