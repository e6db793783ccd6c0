//! Chat contexts and the keys that scope per-channel state.

use std::fmt;

use murmur_proto::{
    OutboundAction, WireId,
    payloads::{IdentityRef, JoinGroup, JoinPrivate},
};

/// What a channel is opened for.
///
/// Two contexts are equal iff kind and all identifying fields match.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ChatContext {
    /// One-to-one chat with another user.
    Private {
        /// Viewer's username
        self_identity: String,
        /// Other participant's user id
        counterpart_id: WireId,
    },
    /// Named group chat.
    Group {
        /// Group name
        group_name: String,
        /// Viewer's username
        self_identity: String,
    },
}

impl ChatContext {
    /// Private context.
    pub fn private(self_identity: impl Into<String>, counterpart_id: impl Into<WireId>) -> Self {
        Self::Private { self_identity: self_identity.into(), counterpart_id: counterpart_id.into() }
    }

    /// Group context.
    pub fn group(self_identity: impl Into<String>, group_name: impl Into<String>) -> Self {
        Self::Group { group_name: group_name.into(), self_identity: self_identity.into() }
    }

    /// Viewer's username.
    pub fn self_identity(&self) -> &str {
        match self {
            Self::Private { self_identity, .. } | Self::Group { self_identity, .. } => {
                self_identity
            },
        }
    }

    /// Group name, for group contexts.
    pub fn group_name(&self) -> Option<&str> {
        match self {
            Self::Group { group_name, .. } => Some(group_name),
            Self::Private { .. } => None,
        }
    }

    /// Key for this context's message log.
    pub fn key(&self) -> ChannelKey {
        match self {
            Self::Private { self_identity, counterpart_id } => ChannelKey::Private {
                self_identity: self_identity.clone(),
                counterpart_id: counterpart_id.clone(),
            },
            Self::Group { group_name, .. } => ChannelKey::Group { group_name: group_name.clone() },
        }
    }

    /// Join action sent once the transport opens.
    pub fn join_action(&self) -> OutboundAction {
        match self {
            Self::Private { self_identity, counterpart_id } => {
                OutboundAction::JoinPrivate(JoinPrivate {
                    self_identity: IdentityRef { username: self_identity.clone() },
                    counterpart_id: counterpart_id.clone(),
                })
            },
            Self::Group { group_name, self_identity } => OutboundAction::JoinGroup(JoinGroup {
                group_name: group_name.clone(),
                self_identity: self_identity.clone(),
            }),
        }
    }
}

impl fmt::Display for ChatContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Private { self_identity, counterpart_id } => {
                write!(f, "private({self_identity} -> {counterpart_id})")
            },
            Self::Group { group_name, self_identity } => {
                write!(f, "group({group_name} as {self_identity})")
            },
        }
    }
}

/// Key scoping a message log.
///
/// Private keys include the viewer. Group keys do not; a group log is
/// cleared whenever a new connection is opened for it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ChannelKey {
    /// Private chat between the viewer and this user
    Private {
        /// Viewer's username
        self_identity: String,
        /// Other participant's user id
        counterpart_id: WireId,
    },
    /// Group chat
    Group {
        /// Group name
        group_name: String,
    },
}
