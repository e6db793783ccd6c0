//! Fuzz target for the channel state machine
//!
//! Applies arbitrary operation sequences (intents, deliveries, faults,
//! credential changes, time) to a simulated client and server.
//!
//! # Invariants
//!
//! - At most one channel is live, and it is the current one
//! - Rosters never list a user twice
//! - Message logs exist only for known channels
//! - An Active channel that has received everything agrees with the server
//! - NEVER panic

#![no_main]

use libfuzzer_sys::fuzz_target;
use murmur_core::ChannelState;
use murmur_harness::{InvariantRegistry, Operation, SimWorld};

fuzz_target!(|ops: Vec<Operation>| {
    let registry = InvariantRegistry::standard();
    let mut world = SimWorld::new();

    for (step, op) in ops.iter().take(256).enumerate() {
        let _ = world.apply(op);
        registry.assert_all(&world.snapshot(), &format!("at step {step} ({op:?})"));

        if world.in_flight() == 0 && world.manager().state() == ChannelState::Active {
            assert_eq!(Some(world.manager().messages()), world.server_log());
        }
    }
});
