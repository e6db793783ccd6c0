//! Environment abstraction for deterministic testing.
//!
//! Decouples channel logic from system time. Production uses the monotonic
//! clock and the system wall clock; simulation uses a virtual clock that only
//! moves when the test advances it.

use std::{ops::Sub, time::Duration};

use chrono::{DateTime, SecondsFormat, Utc};

/// Source of time for the channel state machines.
///
/// # Invariants
///
/// - `now()` never goes backwards
/// - `wall_clock()` is only used for message timestamps, never for timeouts
pub trait Environment: Clone + Send + Sync + 'static {
    /// Monotonic instant type.
    ///
    /// Production uses `std::time::Instant`; simulation uses a virtual
    /// instant.
    type Instant: Copy + Ord + Send + Sync + Sub<Output = Duration>;

    /// Current monotonic time.
    fn now(&self) -> Self::Instant;

    /// Current wall-clock time in UTC.
    fn wall_clock(&self) -> DateTime<Utc>;

    /// Wall-clock time formatted for an outgoing message (RFC 3339,
    /// millisecond precision, `Z` suffix).
    fn timestamp(&self) -> String {
        self.wall_clock().to_rfc3339_opts(SecondsFormat::Millis, true)
    }
}
