//! Typed TTL Store - A concurrent in-process key/value cache
//!
//! Stores typed values with optional expiration, tracks per-key hit counts,
//! and supports atomic increments, regex key scans, expiry reaping and
//! popularity purges.

pub mod cache;
pub mod config;
pub mod error;
pub mod rate_limit;
pub mod tasks;

pub use cache::{Mutation, TypedTtlStore, Value};
pub use config::Config;
pub use error::{CacheError, Result};
pub use rate_limit::{RateLimitDecision, RateLimiter};
pub use tasks::{spawn_janitor_task, JanitorPolicy};
