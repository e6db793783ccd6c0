//! Chat messages and roster members.

use serde::{Deserialize, Serialize};

use crate::WireId;

/// A chat message.
///
/// `timestamp` is payload data (ISO-8601 text as produced by the server), not
/// a sort key. Display order is arrival order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Message {
    /// Username of the sender.
    #[serde(rename = "sender_username")]
    pub sender: String,
    /// Message text.
    pub content: String,
    /// ISO-8601 timestamp.
    pub timestamp: String,
}

impl Message {
    /// Create a message.
    pub fn new(
        sender: impl Into<String>,
        content: impl Into<String>,
        timestamp: impl Into<String>,
    ) -> Self {
        Self { sender: sender.into(), content: content.into(), timestamp: timestamp.into() }
    }
}

/// A user as listed in a group roster or user directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Member {
    /// Server-assigned user id.
    pub id: WireId,
    /// Display username.
    pub username: String,
}

impl Member {
    /// Create a member entry.
    pub fn new(id: impl Into<WireId>, username: impl Into<String>) -> Self {
        Self { id: id.into(), username: username.into() }
    }
}
