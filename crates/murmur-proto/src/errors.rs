//! Protocol error types.
//!
//! Outbound encoding and inbound decoding fail in different ways and are
//! handled differently by callers: an encode failure is a local bug, a decode
//! failure is one bad frame from the peer that gets logged and discarded.

use thiserror::Error;

/// Result alias for outbound protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors produced while building outbound frames.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// JSON serialization failed
    #[error("JSON encode failed: {0}")]
    JsonEncode(String),

    /// Credentials were empty when the frame was built
    #[error("credentials incomplete: {missing} is empty")]
    IncompleteCredentials {
        /// Which token was empty
        missing: &'static str,
    },
}

/// Errors produced while classifying inbound frames.
///
/// None of these are fatal to the connection that delivered the frame.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Frame text was not valid JSON
    #[error("frame is not valid JSON: {0}")]
    NotJson(String),

    /// Frame was valid JSON but not an object
    #[error("frame is not a JSON object (found {found})")]
    NotAnObject {
        /// JSON type that was found instead
        found: &'static str,
    },

    /// A field required by the frame's apparent shape is absent
    #[error("{frame} frame is missing field `{field}`")]
    MissingField {
        /// Apparent frame kind
        frame: &'static str,
        /// Name of the absent field
        field: &'static str,
    },

    /// A field is present but has the wrong type or structure
    #[error("{frame} frame has an invalid field: {reason}")]
    InvalidField {
        /// Apparent frame kind
        frame: &'static str,
        /// Deserializer message
        reason: String,
    },
}

impl From<serde_json::Error> for ProtocolError {
    fn from(err: serde_json::Error) -> Self {
        Self::JsonEncode(err.to_string())
    }
}
