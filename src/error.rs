//! Error types for the cache store
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

use crate::cache::ValueKind;

// == Cache Error Enum ==
/// Unified error type for the cache store.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Key absent or expired
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Add-only store hit an existing live key
    #[error("Key already exists: {0}")]
    Rejected(String),

    /// Value search matched nothing
    #[error("No keys matched pattern: {0}")]
    Empty(String),

    /// No free slot for a new entry
    #[error("Capacity exceeded: store holds at most {max_entries} entries")]
    CapacityExceeded { max_entries: usize },

    /// Key pattern failed to compile
    #[error("Invalid pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// Delta applied to a non-numeric value
    #[error("Cannot apply numeric delta to {found} value at key {key}")]
    TypeMismatch { key: String, found: ValueKind },

    /// Integer delta overflowed i64
    #[error("Numeric overflow at key: {0}")]
    Overflow(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Input has no payload representation
    #[error("Unsupported value: {0}")]
    Unsupported(String),
}

// == Result Type Alias ==
/// Convenience Result type for the cache store.
pub type Result<T> = std::result::Result<T, CacheError>;
