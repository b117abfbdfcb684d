//! Cache Module
//!
//! Provides a concurrent in-memory store with typed values, TTL expiration,
//! hit tracking and pattern-based scans.

mod clock;
mod entry;
mod pattern;
mod stats;
mod store;
mod value;


// Re-export public types
pub use clock::{Clock, ManualClock, SystemClock};
pub use entry::CacheEntry;
pub use pattern::KeyPattern;
pub use stats::CacheStats;
pub use store::{TypedTtlStore, DEFAULT_SHARD_COUNT};
pub use value::{Mutation, Value, ValueKind};

// == Public Constants ==
/// Maximum allowed key length in bytes
pub const MAX_KEY_LENGTH: usize = 256;
