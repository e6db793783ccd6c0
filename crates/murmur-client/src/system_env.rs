//! Production Environment implementation using system time.
//!
//! `SystemEnv` reads the monotonic clock for timeouts and the system wall
//! clock for message timestamps. Behavior is non-deterministic; simulations
//! use a virtual clock instead.

use chrono::{DateTime, Utc};
use murmur_core::Environment;

/// Production environment using system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnv;

impl SystemEnv {
    /// Create a new system environment.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SystemEnv {
    type Instant = std::time::Instant;

    #[allow(clippy::disallowed_methods)]
    fn now(&self) -> Self::Instant {
        std::time::Instant::now()
    }

    fn wall_clock(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn now_never_goes_backwards() {
        let env = SystemEnv::new();
        let first = env.now();
        let second = env.now();
        assert!(second >= first);
    }

    #[test]
    fn timestamp_is_rfc3339_utc_millis() {
        let stamp = SystemEnv.timestamp();
        assert!(stamp.ends_with('Z'));
        assert!(DateTime::parse_from_rfc3339(&stamp).is_ok());
        // 2024-01-01T00:00:00.000Z
        assert_eq!(stamp.len(), 24);
    }
}
