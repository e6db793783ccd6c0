//! Deterministic simulation harness for Murmur channel testing.
//!
//! Virtual-time [`Environment`](murmur_core::Environment), an in-memory chat
//! server, and an in-memory [`Connector`](murmur_client::Connector) for
//! reproducible channel tests.
//!
//! # Model-Based Testing
//!
//! The `model` module drives a real `ConnectionManager` through arbitrary
//! operation sequences against a [`SimServer`], with every frame delivered
//! only when an operation says so.
//!
//! # Invariant Testing
//!
//! The `invariants` module checks what must hold after every step, whatever
//! the interleaving. Use [`InvariantRegistry::standard()`] for the channel
//! invariants.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod invariants;
pub mod model;
pub mod sim_connector;
pub mod sim_env;
pub mod sim_server;

pub use invariants::{
    ChannelSnapshot, GroupSnapshot, Invariant, InvariantRegistry, InvariantResult,
    RosterHasNoDuplicates, SingleActiveChannel, StoreOnlyForKnownChannels, SystemSnapshot,
    Violation,
};
pub use model::{GROUPS, Operation, SimWorld, SmallText, VIEWER};
pub use sim_connector::SimConnector;
pub use sim_env::{EPOCH_MILLIS, SimEnv};
pub use sim_server::{SimServer, UNKNOWN_ACTION};
