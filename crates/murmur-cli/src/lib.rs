//! Murmur terminal client.
//!
//! Reads lines from stdin and turns them into channel commands; prints
//! channel actions as they happen. The binary wires these to a
//! [`murmur_client::Runtime`] with the WebSocket connector.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod input;
pub mod render;

pub use input::{Input, InputError, parse_line};
pub use render::{render_action, render_members};
