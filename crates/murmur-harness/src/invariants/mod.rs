//! Channel invariants.
//!
//! Each [`Invariant`] is a predicate over a [`SystemSnapshot`]. The model
//! tests and the state-machine fuzzer capture a snapshot after every
//! operation and run the whole [`InvariantRegistry`] against it, so a
//! violation is reported at the first step that causes it.
//!
//! ```ignore
//! let registry = InvariantRegistry::standard();
//! registry.assert_all(&world.snapshot(), "after DeliverAll");
//! ```

mod checks;
mod snapshot;

use std::fmt;

pub use checks::{RosterHasNoDuplicates, SingleActiveChannel, StoreOnlyForKnownChannels};
pub use snapshot::{ChannelSnapshot, GroupSnapshot, SystemSnapshot};

/// Outcome of one check.
pub type InvariantResult = Result<(), Violation>;

/// A failed check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Which invariant failed
    pub invariant: &'static str,
    /// Offending state, human readable
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.invariant, self.message)
    }
}

impl std::error::Error for Violation {}

/// Predicate that must hold for every reachable snapshot.
pub trait Invariant: Send + Sync {
    /// Stable name used in reports.
    fn name(&self) -> &'static str;

    /// Check `state`.
    fn check(&self, state: &SystemSnapshot) -> InvariantResult;
}

/// Ordered set of invariants run together.
#[derive(Default)]
pub struct InvariantRegistry {
    checks: Vec<Box<dyn Invariant>>,
}

impl InvariantRegistry {
    /// Registry with nothing in it.
    pub fn new() -> Self {
        Self::default()
    }

    /// [`SingleActiveChannel`], [`RosterHasNoDuplicates`], and
    /// [`StoreOnlyForKnownChannels`].
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.add(SingleActiveChannel);
        registry.add(RosterHasNoDuplicates);
        registry.add(StoreOnlyForKnownChannels);
        registry
    }

    /// Register another invariant.
    pub fn add(&mut self, invariant: impl Invariant + 'static) {
        self.checks.push(Box::new(invariant));
    }

    /// Run every check. All failures are returned, not just the first.
    pub fn check_all(&self, state: &SystemSnapshot) -> Result<(), Vec<Violation>> {
        let failures: Vec<Violation> =
            self.checks.iter().filter_map(|check| check.check(state).err()).collect();
        if failures.is_empty() { Ok(()) } else { Err(failures) }
    }

    /// [`check_all`](Self::check_all), panicking with a report on failure.
    /// `context` names the step being checked.
    #[allow(clippy::panic)]
    pub fn assert_all(&self, state: &SystemSnapshot, context: &str) {
        let Err(failures) = self.check_all(state) else {
            return;
        };
        let report = failures.iter().map(|v| format!("  {v}")).collect::<Vec<_>>().join("\n");
        panic!("{} invariant(s) violated {context}:\n{report}", failures.len());
    }

    /// Registered invariant count.
    pub fn len(&self) -> usize {
        self.checks.len()
    }

    /// True when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }
}
