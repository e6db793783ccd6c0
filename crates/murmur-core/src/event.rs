//! Channel events and actions.

use murmur_proto::{Member, Message, OutboundFrame, WireId};

use crate::{
    connection::{ChannelState, ConnectionId},
    context::{ChannelKey, ChatContext},
    error::ChannelError,
    membership::Roster,
};

/// Something the transport reported for one connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Connection established
    Opened,
    /// One text frame arrived
    Message(String),
    /// Transport failed
    Error(String),
    /// Transport closed by the peer or the network
    Closed {
        /// Close reason, empty if none was given
        reason: String,
    },
}

/// Events the caller feeds into the [`ConnectionManager`].
///
/// The caller is responsible for:
/// - Forwarding user intents (open, send, membership changes, close)
/// - Forwarding transport callbacks, tagged with their connection id
/// - Driving time forward via ticks
///
/// Generic over `I` (Instant type) so simulations can use virtual time.
///
/// [`ConnectionManager`]: crate::ConnectionManager
#[derive(Debug, Clone)]
pub enum ChannelEvent<I = std::time::Instant> {
    /// Open a channel for this context, closing any other live channel.
    Open {
        /// Context to open
        context: ChatContext,
    },

    /// Post a message to the current channel.
    SendMessage {
        /// Message text
        content: String,
    },

    /// Add a user to the current group.
    AddMember {
        /// User to add
        member: Member,
    },

    /// Remove a user from the current group.
    RemoveMember {
        /// User to remove
        user_id: WireId,
    },

    /// Authoritative roster fetched out of band (directory refresh).
    RosterRefreshed {
        /// Group the roster belongs to
        group_name: String,
        /// The roster
        roster: Roster,
    },

    /// Close the current channel.
    Close,

    /// Transport callback.
    Transport {
        /// Connection the callback belongs to
        connection: ConnectionId,
        /// What happened
        event: TransportEvent,
    },

    /// Time tick for timeout processing.
    Tick {
        /// Current time from the environment
        now: I,
    },
}

/// Actions the manager produces.
///
/// The first three are transport work for the driver to execute; the rest
/// are immutable notifications for observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelAction {
    /// Open a transport for this connection.
    OpenTransport {
        /// Connection to open
        connection: ConnectionId,
        /// Context it serves
        context: ChatContext,
    },

    /// Write one text frame.
    SendFrame {
        /// Target connection
        connection: ConnectionId,
        /// Encoded frame
        frame: OutboundFrame,
    },

    /// Close and release the transport.
    CloseTransport {
        /// Connection to close
        connection: ConnectionId,
    },

    /// Lifecycle transition.
    StateChanged {
        /// Connection that moved
        connection: ConnectionId,
        /// Previous state
        from: ChannelState,
        /// New state
        to: ChannelState,
    },

    /// A history snapshot replaced the channel's log.
    HistoryReplaced {
        /// Channel whose log changed
        key: ChannelKey,
        /// The complete new log
        messages: Vec<Message>,
    },

    /// One message was appended.
    MessageAppended {
        /// Channel whose log changed
        key: ChannelKey,
        /// The new message
        message: Message,
    },

    /// The group roster changed (snapshot or optimistic mutation).
    RosterChanged {
        /// Group name
        group_name: String,
        /// Visible members
        members: Vec<Member>,
        /// Viewer's admin flag
        is_self_admin: bool,
    },

    /// Server text about a rejected action.
    Notice {
        /// Connection that received it
        connection: ConnectionId,
        /// Notice text
        content: String,
    },

    /// The connection ended without a local close.
    ConnectionLost {
        /// Connection that ended
        connection: ConnectionId,
        /// Why
        error: ChannelError,
    },
}

impl ChannelAction {
    /// True for actions the driver must execute against a transport.
    pub fn is_transport_work(&self) -> bool {
        matches!(
            self,
            Self::OpenTransport { .. } | Self::SendFrame { .. } | Self::CloseTransport { .. }
        )
    }
}
