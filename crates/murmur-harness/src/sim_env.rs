//! Virtual-time Environment for deterministic simulation.
//!
//! Time only moves when the test calls [`SimEnv::advance`]. Clones share the
//! same clock, so a test can keep one handle and advance the clock under a
//! manager that owns another.

use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use chrono::{DateTime, Utc};
use murmur_core::Environment;

/// Wall clock at virtual time zero: 2024-01-01T00:00:00Z.
pub const EPOCH_MILLIS: i64 = 1_704_067_200_000;

/// Simulation environment with a shared virtual clock.
#[derive(Debug, Clone, Default)]
pub struct SimEnv {
    elapsed_millis: Arc<AtomicU64>,
}

impl SimEnv {
    /// Clock at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        self.elapsed_millis.fetch_add(by.as_millis() as u64, Ordering::SeqCst);
    }

    /// Virtual time since start.
    pub fn elapsed(&self) -> Duration {
        Duration::from_millis(self.elapsed_millis.load(Ordering::SeqCst))
    }
}

impl Environment for SimEnv {
    type Instant = Duration;

    fn now(&self) -> Duration {
        self.elapsed()
    }

    fn wall_clock(&self) -> DateTime<Utc> {
        let millis = EPOCH_MILLIS.saturating_add(self.elapsed().as_millis() as i64);
        DateTime::from_timestamp_millis(millis).unwrap_or_default()
    }
}
