//! Murmur client runtime
//!
//! Drives the sans-IO [`murmur_core::ConnectionManager`] from tokio: one
//! event queue for caller commands, transport callbacks, and timer ticks;
//! a [`Connector`] seam for the persistent per-channel connection; and a
//! [`Directory`] for the request/response endpoints around it.
//!
//! # Components
//!
//! - [`Runtime`] / [`RuntimeHandle`]: Event loop and its cloneable handle
//! - [`Connector`]: How a channel's connection is established
//! - [`Directory`]: Users, groups, and authoritative rosters
//! - [`ClientConfig`]: Endpoint and timing settings (`MURMUR_*` variables)
//! - [`SystemEnv`]: Production time source
//!
//! # Features
//!
//! - `transport`: [`WsConnector`] (tokio-tungstenite) and [`HttpDirectory`]
//!   (reqwest)

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod config;
pub mod directory;
pub mod error;
#[cfg(feature = "transport")]
pub mod http;
pub mod runtime;
pub mod system_env;
pub mod transport;
#[cfg(feature = "transport")]
pub mod ws;

pub use config::ClientConfig;
pub use directory::{Directory, refresh_roster};
pub use error::{ConfigError, DirectoryError, RuntimeError, TransportError};
#[cfg(feature = "transport")]
pub use http::HttpDirectory;
pub use runtime::{ChannelView, Command, Runtime, RuntimeHandle};
pub use system_env::SystemEnv;
pub use transport::{Connector, Outgoing, TransportHandle, TransportSink};
#[cfg(feature = "transport")]
pub use ws::WsConnector;
