//! Murmur wire protocol
//!
//! JSON text frames exchanged over a chat channel's persistent connection, and
//! the result shapes of the request/response directory endpoints.
//!
//! # Components
//!
//! - [`encode`]: Wrap an [`OutboundAction`] with the caller's [`Credentials`]
//!   into an [`OutboundFrame`]
//! - [`decode`]: Classify raw inbound text into an [`InboundEvent`]
//! - [`payloads`]: Typed action data, inbound frame bodies, directory shapes
//!
//! The codec is stateless. It never retains credentials and never panics on
//! malformed input; every failure is a [`DecodeError`] or [`ProtocolError`].

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod codec;
pub mod credentials;
pub mod errors;
pub mod ids;
pub mod payloads;

pub use codec::{OutboundFrame, decode, encode};
pub use credentials::Credentials;
pub use errors::{DecodeError, ProtocolError, Result};
pub use ids::WireId;
pub use payloads::{
    ActionKind, InboundEvent, Member, Message, OutboundAction, RosterSnapshot, Snapshot,
    SnapshotScope,
};
