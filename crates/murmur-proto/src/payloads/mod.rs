//! JSON payload types.
//!
//! Outbound frames are action-tagged envelopes (`{action, data, access_token,
//! csrf_token}`); inbound frames are untagged objects whose shape decides their
//! meaning. The two directions therefore use separate types and are never
//! expected to round-trip through each other.

pub mod chat;
pub mod directory;
pub mod inbound;
pub mod outbound;

pub use chat::{Member, Message};
pub use inbound::{InboundEvent, RosterSnapshot, Snapshot, SnapshotScope};
pub use outbound::{
    ActionKind, AddGroupMember, GroupMessageBody, IdentityRef, JoinGroup, JoinPrivate,
    OutboundAction, RemoveGroupMember, SendGroupMessage, SendPrivateMessage,
};
