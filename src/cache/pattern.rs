//! Key Pattern Module
//!
//! Compiles key patterns for bulk search and deletion.

use regex::Regex;

use crate::error::{CacheError, Result};

/// Flags accepted after a closing `/` delimiter.
const DELIMITED_FLAGS: &str = "imsxU";

// == Key Pattern ==
/// A compiled key pattern.
///
/// Accepts plain regular expressions (`^session_\d+$`) and the delimited form
/// `/^session_\d+$/i`, where trailing flags map to inline regex flags.
/// Patterns are unanchored unless they anchor themselves.
#[derive(Debug, Clone)]
pub struct KeyPattern {
    source: String,
    regex: Regex,
}

impl KeyPattern {
    /// Compiles `pattern`, failing with `InvalidPattern` on bad syntax.
    pub fn new(pattern: &str) -> Result<Self> {
        let expr = match split_delimited(pattern) {
            Some((body, "")) => body.to_string(),
            Some((body, flags)) => format!("(?{}){}", flags, body),
            None => pattern.to_string(),
        };

        Ok(Self {
            source: pattern.to_string(),
            regex: Regex::new(&expr)?,
        })
    }

    /// Returns true if `key` matches.
    pub fn matches(&self, key: &str) -> bool {
        self.regex.is_match(key)
    }

    /// The pattern as given by the caller.
    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl TryFrom<&str> for KeyPattern {
    type Error = CacheError;

    fn try_from(pattern: &str) -> Result<Self> {
        Self::new(pattern)
    }
}

/// Splits `/body/flags` into its parts. Returns `None` when the input is not
/// delimited or carries flags the regex engine has no equivalent for.
fn split_delimited(pattern: &str) -> Option<(&str, &str)> {
    let rest = pattern.strip_prefix('/')?;
    let close = rest.rfind('/')?;
    let (body, flags) = (&rest[..close], &rest[close + 1..]);

    if flags.chars().all(|c| DELIMITED_FLAGS.contains(c)) {
        Some((body, flags))
    } else {
        None
    }
}
