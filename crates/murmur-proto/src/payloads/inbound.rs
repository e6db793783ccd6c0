//! Classified inbound frames.

use serde::Deserialize;

use crate::{Member, Message, WireId};

/// Which identifier the history frame carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotScope {
    /// Frame carried `chat_id`.
    Private,
    /// Frame carried `group_id`.
    Group,
}

/// Authoritative history for the channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// Which id field was present.
    pub scope: SnapshotScope,
    /// Server chat or group id.
    pub channel_id: WireId,
    /// Complete ordered history.
    pub history: Vec<Message>,
}

/// Authoritative group roster.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RosterSnapshot {
    /// Group the roster belongs to, when the server names it.
    #[serde(default)]
    pub group_name: Option<String>,
    /// Every member, admin included.
    pub members: Vec<Member>,
    /// Whether the viewer administers the group, when the server says so.
    #[serde(default, alias = "is_admin")]
    pub admin: Option<bool>,
}

/// Result of classifying one inbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    /// Replace the channel's message log.
    Snapshot(Snapshot),
    /// Replace the group's roster.
    RosterSnapshot(RosterSnapshot),
    /// Append one message.
    Increment(Message),
    /// Server text about a rejected action; never stored as a message.
    Notice {
        /// Text of the notice.
        content: String,
    },
}

impl InboundEvent {
    /// Short name for logs.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Snapshot(_) => "snapshot",
            Self::RosterSnapshot(_) => "roster_snapshot",
            Self::Increment(_) => "increment",
            Self::Notice { .. } => "notice",
        }
    }
}
