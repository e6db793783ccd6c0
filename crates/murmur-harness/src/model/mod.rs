//! Model-based testing.
//!
//! [`Operation`]s are generated by proptest or the fuzzer and applied to a
//! [`SimWorld`], which runs the real channel core against a simulated server.
//! Invariants are checked after every step, and observable state is compared
//! with the server's logs.

mod operation;
mod world;

pub use operation::{Operation, SmallText};
pub use world::{GROUPS, SimWorld, VIEWER};
