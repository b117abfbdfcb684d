//! Value Module
//!
//! Typed payloads stored in the cache and the update input applied to them.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CacheError, Result};

// == Value ==
/// A cached payload. The variant doubles as the stored type tag, so a numeric
/// string and an integer never decode to one another.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

/// Type tag of a [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    Integer,
    Float,
    String,
    Boolean,
    List,
    Map,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Integer => "integer",
            ValueKind::Float => "float",
            ValueKind::String => "string",
            ValueKind::Boolean => "boolean",
            ValueKind::List => "list",
            ValueKind::Map => "map",
        };
        f.write_str(name)
    }
}

impl Value {
    // == Kind ==
    /// Returns the type tag recorded for this value.
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Int(_) => ValueKind::Integer,
            Value::Float(_) => ValueKind::Float,
            Value::Str(_) => ValueKind::String,
            Value::Bool(_) => ValueKind::Boolean,
            Value::List(_) => ValueKind::List,
            Value::Map(_) => ValueKind::Map,
        }
    }

    /// Returns the integer payload, if this is an `Int`.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the string payload, if this is a `Str`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    // == Apply Delta ==
    /// Adds a signed delta to a numeric value.
    ///
    /// Integers use checked arithmetic; floats add the delta as `f64`.
    /// Every other kind fails with `TypeMismatch`.
    pub(crate) fn apply_delta(&self, key: &str, delta: i64) -> Result<Value> {
        match self {
            Value::Int(n) => n
                .checked_add(delta)
                .map(Value::Int)
                .ok_or_else(|| CacheError::Overflow(key.to_string())),
            Value::Float(f) => Ok(Value::Float(f + delta as f64)),
            other => Err(CacheError::TypeMismatch {
                key: key.to_string(),
                found: other.kind(),
            }),
        }
    }
}

// == Conversions ==
impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(n as i64)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Value::Map(map)
    }
}

impl TryFrom<serde_json::Value> for Value {
    type Error = CacheError;

    fn try_from(json: serde_json::Value) -> Result<Self> {
        match json {
            serde_json::Value::Null => Err(CacheError::Unsupported(
                "null has no cache representation".to_string(),
            )),
            serde_json::Value::Bool(b) => Ok(Value::Bool(b)),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Ok(Value::Int(i)),
                None => n
                    .as_f64()
                    .map(Value::Float)
                    .ok_or_else(|| CacheError::Unsupported(format!("number {}", n))),
            },
            serde_json::Value::String(s) => Ok(Value::Str(s)),
            serde_json::Value::Array(items) => items
                .into_iter()
                .map(Value::try_from)
                .collect::<Result<Vec<_>>>()
                .map(Value::List),
            serde_json::Value::Object(fields) => fields
                .into_iter()
                .map(|(k, v)| Value::try_from(v).map(|v| (k, v)))
                .collect::<Result<BTreeMap<_, _>>>()
                .map(Value::Map),
        }
    }
}

impl From<Value> for serde_json::Value {
    fn from(value: Value) -> Self {
        match value {
            Value::Int(n) => serde_json::Value::from(n),
            // Non-finite floats become null
            Value::Float(f) => serde_json::Value::from(f),
            Value::Str(s) => serde_json::Value::String(s),
            Value::Bool(b) => serde_json::Value::Bool(b),
            Value::List(items) => {
                serde_json::Value::Array(items.into_iter().map(Into::into).collect())
            }
            Value::Map(fields) => serde_json::Value::Object(
                fields.into_iter().map(|(k, v)| (k, v.into())).collect(),
            ),
        }
    }
}

// == Mutation ==
/// Input to [`TypedTtlStore::update`](crate::cache::TypedTtlStore::update).
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    /// Add to the current numeric value
    Increment(i64),
    /// Subtract from the current numeric value
    Decrement(i64),
    /// Write a literal replacement
    Replace(Value),
}

impl Mutation {
    // == Parse ==
    /// Decodes the string form used by script callers.
    ///
    /// `"inc:N"` and `"dec:N"` become deltas; any other input, including a
    /// marker followed by a non-integer, is a literal string replacement.
    pub fn parse(input: &str) -> Self {
        let delta = input
            .get(..4)
            .zip(input.get(4..).and_then(|amount| amount.parse::<i64>().ok()));

        match delta {
            Some(("inc:", n)) => Mutation::Increment(n),
            Some(("dec:", n)) => Mutation::Decrement(n),
            _ => Mutation::Replace(Value::Str(input.to_string())),
        }
    }

    // == Apply ==
    /// Computes the value that replaces `current`.
    pub(crate) fn apply_to(self, key: &str, current: &Value) -> Result<Value> {
        match self {
            Mutation::Replace(value) => Ok(value),
            Mutation::Increment(n) => current.apply_delta(key, n),
            Mutation::Decrement(n) => {
                let delta = n
                    .checked_neg()
                    .ok_or_else(|| CacheError::Overflow(key.to_string()))?;
                current.apply_delta(key, delta)
            }
        }
    }
}

impl From<Value> for Mutation {
    fn from(value: Value) -> Self {
        Mutation::Replace(value)
    }
}
