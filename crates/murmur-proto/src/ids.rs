//! Identifiers as they appear on the wire.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A user, chat, or group identifier.
///
/// The server emits database ids as JSON numbers, but clients and tests may
/// carry string ids. Both forms round-trip unchanged; `7` and `"7"` are
/// distinct values.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireId {
    /// Numeric id (the server's native form)
    Numeric(u64),
    /// Textual id
    Text(String),
}

impl WireId {
    /// Numeric value, if this id is numeric.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Self::Numeric(n) => Some(*n),
            Self::Text(_) => None,
        }
    }
}

impl fmt::Display for WireId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<u64> for WireId {
    fn from(value: u64) -> Self {
        Self::Numeric(value)
    }
}

impl From<&str> for WireId {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for WireId {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}
