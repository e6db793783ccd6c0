//! Murmur channel core
//!
//! Sans-IO state machines for real-time chat channels: one persistent
//! connection per chat context, history snapshots reconciled against a stream
//! of increments, and optimistic group membership.
//!
//! # Components
//!
//! - [`ConnectionManager`]: Lifecycle of the single live channel; routes
//!   decoded frames and gates outgoing actions
//! - [`ChannelRegistry`]: Context-keyed connection records enforcing at most
//!   one live channel
//! - [`MessageStore`]: Per-channel message logs (snapshot replace, append)
//! - [`MembershipTracker`]: Group rosters with tentative local changes
//! - [`CredentialSource`]: Fresh credentials for every join and send
//! - [`Environment`]: Time abstraction for deterministic tests
//!
//! Nothing here performs I/O. The driver feeds [`ChannelEvent`]s in and
//! executes the transport half of the returned [`ChannelAction`]s.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod auth;
pub mod connection;
pub mod context;
pub mod env;
pub mod error;
pub mod event;
pub mod membership;
pub mod registry;
pub mod store;

pub use auth::{CredentialSource, SharedCredentials, StaticCredentials};
pub use connection::{
    ChannelConfig, ChannelState, ConnectionId, ConnectionManager, DEFAULT_JOIN_TIMEOUT,
};
pub use context::{ChannelKey, ChatContext};
pub use env::Environment;
pub use error::ChannelError;
pub use event::{ChannelAction, ChannelEvent, TransportEvent};
pub use membership::{EntryStatus, MembershipTracker, Roster, RosterEntry};
pub use registry::{ChannelConnection, ChannelRegistry};
pub use store::MessageStore;
