//! Error types for the channel core.
//!
//! There is no decode variant: a frame that fails to decode is
//! logged and discarded where it arrives and never reaches a caller.

use std::time::Duration;

use thiserror::Error;

use crate::connection::ChannelState;

/// Errors from channel operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChannelError {
    /// Credentials were absent or incomplete when an action needed them
    #[error("credentials missing: both access and anti-forgery tokens are required")]
    AuthMissing,

    /// Operation requires an Active channel
    #[error("channel not ready: operation requires Active, channel is {state:?}")]
    ChannelNotReady {
        /// State at the time of the call
        state: ChannelState,
    },

    /// Private send attempted before the history snapshot named the chat
    #[error("chat id unknown: no history snapshot received yet")]
    ChatIdUnknown,

    /// Membership operation on a private channel
    #[error("membership operations require a group channel")]
    NotAGroupChannel,

    /// No channel has been opened
    #[error("no channel open")]
    NoChannel,

    /// Frame could not be built
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Underlying transport failed
    #[error("transport error: {0}")]
    Transport(String),

    /// Peer or network closed the transport
    #[error("transport closed: {reason}")]
    TransportClosed {
        /// Close reason reported by the transport
        reason: String,
    },

    /// Join did not complete in time
    #[error("join timeout after {elapsed:?}")]
    JoinTimeout {
        /// How long the channel waited
        elapsed: Duration,
    },
}

impl ChannelError {
    /// Returns true if an explicit re-open may succeed.
    ///
    /// Nothing reconnects automatically. Transport failures and join timeouts
    /// are worth a caller-initiated retry; auth and usage errors are not.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::TransportClosed { .. } | Self::JoinTimeout { .. })
    }
}

impl From<murmur_proto::ProtocolError> for ChannelError {
    fn from(err: murmur_proto::ProtocolError) -> Self {
        match err {
            murmur_proto::ProtocolError::IncompleteCredentials { .. } => Self::AuthMissing,
            other => Self::Protocol(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_failures_are_retryable() {
        assert!(ChannelError::Transport("reset".into()).is_retryable());
        assert!(ChannelError::TransportClosed { reason: "1006".into() }.is_retryable());
        assert!(ChannelError::JoinTimeout { elapsed: Duration::from_secs(11) }.is_retryable());
    }

    #[test]
    fn caller_errors_are_not_retryable() {
        assert!(!ChannelError::AuthMissing.is_retryable());
        assert!(!ChannelError::ChannelNotReady { state: ChannelState::Idle }.is_retryable());
        assert!(!ChannelError::ChatIdUnknown.is_retryable());
        assert!(!ChannelError::NotAGroupChannel.is_retryable());
        assert!(!ChannelError::Protocol("bad".into()).is_retryable());
    }

    #[test]
    fn incomplete_credentials_map_to_auth_missing() {
        let err = murmur_proto::ProtocolError::IncompleteCredentials { missing: "csrf_token" };
        assert_eq!(ChannelError::from(err), ChannelError::AuthMissing);
    }
}
