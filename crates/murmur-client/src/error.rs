//! Error types for the async boundary.

use murmur_core::ChannelError;
use thiserror::Error;

/// Errors from a transport connector or handle.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Connection could not be established
    #[error("connection failed: {0}")]
    Connect(String),

    /// The transport task has already stopped
    #[error("transport closed")]
    Closed,
}

/// Errors returned by [`RuntimeHandle`](crate::RuntimeHandle) calls.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    /// The channel rejected the request
    #[error(transparent)]
    Channel(#[from] ChannelError),

    /// The runtime loop is no longer running
    #[error("runtime stopped")]
    Stopped,
}

/// Errors from directory (request/response) calls.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    /// Credentials were absent when the request was built
    #[error("credentials missing")]
    AuthMissing,

    /// Request could not be sent or the response could not be read
    #[error("http error: {0}")]
    Http(String),

    /// Server answered with a non-success status
    #[error("server returned {status}: {detail}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Server-provided detail, if any
        detail: String,
    },

    /// Server reported the resource as unknown in a success response
    #[error("not found: {0}")]
    NotFound(String),

    /// Response body did not match the expected shape
    #[error("unexpected response: {0}")]
    Decode(String),

    /// Base URL cannot carry path segments
    #[error("invalid base url: {0}")]
    InvalidUrl(String),
}

/// Invalid configuration value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid {var}={value:?}: {reason}")]
pub struct ConfigError {
    /// Variable name
    pub var: &'static str,
    /// Offending value
    pub value: String,
    /// Why it was rejected
    pub reason: String,
}
