//! Outbound action payloads.
//!
//! Each variant of [`OutboundAction`] carries the `data` object for one wire
//! action. Field names follow the server's snake_case contract; the Rust names
//! describe meaning.

use serde::{Deserialize, Serialize};

use crate::{Message, WireId};

/// The fixed set of actions a client may send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    /// Open a one-to-one chat.
    JoinPrivate,
    /// Post to a one-to-one chat.
    SendPrivateMessage,
    /// Open a group chat.
    JoinGroup,
    /// Post to a group chat.
    SendGroupMessage,
    /// Add a user to a group.
    AddGroupMember,
    /// Remove a user from a group (admin only).
    RemoveGroupMember,
}

impl ActionKind {
    /// Every action kind, in declaration order.
    pub const ALL: [Self; 6] = [
        Self::JoinPrivate,
        Self::SendPrivateMessage,
        Self::JoinGroup,
        Self::SendGroupMessage,
        Self::AddGroupMember,
        Self::RemoveGroupMember,
    ];

    /// Value of the envelope's `action` field.
    pub const fn wire_name(self) -> &'static str {
        match self {
            Self::JoinPrivate => "join_private_chat",
            Self::SendPrivateMessage => "send_private_message",
            Self::JoinGroup => "join_group_chat",
            Self::SendGroupMessage => "send_group_message",
            Self::AddGroupMember => "add_user_to_group_chat",
            Self::RemoveGroupMember => "remove_user_from_group_chat",
        }
    }

    /// True for the two join actions sent on transport open.
    pub const fn is_join(self) -> bool {
        matches!(self, Self::JoinPrivate | Self::JoinGroup)
    }
}

/// Reference to the acting user by username.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityRef {
    /// Username.
    pub username: String,
}

/// `join_private_chat` data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinPrivate {
    /// The viewer.
    #[serde(rename = "user1")]
    pub self_identity: IdentityRef,
    /// The other participant's id.
    #[serde(rename = "user2_id")]
    pub counterpart_id: WireId,
}

/// `send_private_message` data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendPrivateMessage {
    /// Chat id learned from the history snapshot.
    pub chat_id: WireId,
    /// Message with sender, content, and client timestamp.
    pub message: Message,
}

/// `join_group_chat` data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinGroup {
    /// Group name.
    pub group_name: String,
    /// The viewer's username.
    #[serde(rename = "user_name")]
    pub self_identity: String,
}

/// Body of a group message. The server assigns the timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMessageBody {
    /// Sender username.
    #[serde(rename = "sender_username")]
    pub sender: String,
    /// Message text.
    pub content: String,
}

/// `send_group_message` data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendGroupMessage {
    /// Group addressed by name (the server resolves `group_id` by name).
    #[serde(rename = "group_id")]
    pub group: String,
    /// Message body.
    pub message: GroupMessageBody,
}

/// `add_user_to_group_chat` data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddGroupMember {
    /// Group name.
    pub group_name: String,
    /// User being added.
    pub user_id: WireId,
    /// Username of the member performing the add.
    #[serde(rename = "adder_name")]
    pub adder: String,
}

/// `remove_user_from_group_chat` data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveGroupMember {
    /// Group name.
    pub group_name: String,
    /// User being removed.
    pub user_id: WireId,
    /// Username of the group admin performing the removal.
    #[serde(rename = "admin_name")]
    pub admin: String,
}

/// An outbound action with its data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundAction {
    /// Open a one-to-one chat
    JoinPrivate(JoinPrivate),
    /// Post to a one-to-one chat
    SendPrivateMessage(SendPrivateMessage),
    /// Open a group chat
    JoinGroup(JoinGroup),
    /// Post to a group chat
    SendGroupMessage(SendGroupMessage),
    /// Add a user to a group
    AddGroupMember(AddGroupMember),
    /// Remove a user from a group
    RemoveGroupMember(RemoveGroupMember),
}

impl OutboundAction {
    /// Kind of this action.
    #[must_use]
    pub const fn kind(&self) -> ActionKind {
        match self {
            Self::JoinPrivate(_) => ActionKind::JoinPrivate,
            Self::SendPrivateMessage(_) => ActionKind::SendPrivateMessage,
            Self::JoinGroup(_) => ActionKind::JoinGroup,
            Self::SendGroupMessage(_) => ActionKind::SendGroupMessage,
            Self::AddGroupMember(_) => ActionKind::AddGroupMember,
            Self::RemoveGroupMember(_) => ActionKind::RemoveGroupMember,
        }
    }
}
