//! Client configuration.
//!
//! Defaults target a local development server. Every field can be overridden
//! from the environment (`MURMUR_*`) and, in the CLI, from flags.

use std::{env, str::FromStr, time::Duration};

use murmur_core::{ChannelConfig, DEFAULT_JOIN_TIMEOUT};

use crate::error::ConfigError;

/// Default server base URL.
pub const DEFAULT_SERVER_URL: &str = "http://localhost:8008";

/// Default WebSocket path.
pub const DEFAULT_WS_PATH: &str = "/ws";

/// Default capacity of the runtime's event queue.
pub const DEFAULT_EVENT_QUEUE_CAPACITY: usize = 256;

/// Default interval between timeout checks.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(500);

/// Client configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Server base URL (`http://` or `https://`)
    pub server_url: String,
    /// Path of the WebSocket endpoint
    pub ws_path: String,
    /// Time allowed for open + join + first frame
    pub join_timeout: Duration,
    /// Capacity of the runtime's single event queue
    pub event_queue_capacity: usize,
    /// Interval between timeout checks
    pub tick_interval: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_owned(),
            ws_path: DEFAULT_WS_PATH.to_owned(),
            join_timeout: DEFAULT_JOIN_TIMEOUT,
            event_queue_capacity: DEFAULT_EVENT_QUEUE_CAPACITY,
            tick_interval: DEFAULT_TICK_INTERVAL,
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults.
    ///
    /// | variable                      | field                  |
    /// |-------------------------------|------------------------|
    /// | `MURMUR_SERVER_URL`           | `server_url`           |
    /// | `MURMUR_WS_PATH`              | `ws_path`              |
    /// | `MURMUR_JOIN_TIMEOUT_MS`      | `join_timeout`         |
    /// | `MURMUR_EVENT_QUEUE_CAPACITY` | `event_queue_capacity` |
    /// | `MURMUR_TICK_INTERVAL_MS`     | `tick_interval`        |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an explicit lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let config = Self {
            server_url: lookup("MURMUR_SERVER_URL").unwrap_or(defaults.server_url),
            ws_path: lookup("MURMUR_WS_PATH").unwrap_or(defaults.ws_path),
            join_timeout: parse(&lookup, "MURMUR_JOIN_TIMEOUT_MS")?
                .map_or(defaults.join_timeout, Duration::from_millis),
            event_queue_capacity: parse(&lookup, "MURMUR_EVENT_QUEUE_CAPACITY")?
                .unwrap_or(defaults.event_queue_capacity),
            tick_interval: parse(&lookup, "MURMUR_TICK_INTERVAL_MS")?
                .map_or(defaults.tick_interval, Duration::from_millis),
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject values the runtime cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.server_url.starts_with("http://") || self.server_url.starts_with("https://")) {
            return Err(ConfigError {
                var: "MURMUR_SERVER_URL",
                value: self.server_url.clone(),
                reason: "must start with http:// or https://".into(),
            });
        }
        if self.event_queue_capacity == 0 {
            return Err(ConfigError {
                var: "MURMUR_EVENT_QUEUE_CAPACITY",
                value: "0".into(),
                reason: "must be at least 1".into(),
            });
        }
        if self.tick_interval.is_zero() {
            return Err(ConfigError {
                var: "MURMUR_TICK_INTERVAL_MS",
                value: "0".into(),
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }

    /// Base URL for directory requests, without a trailing slash.
    pub fn http_base(&self) -> &str {
        self.server_url.trim_end_matches('/')
    }

    /// WebSocket URL: the server URL with its scheme switched to `ws`/`wss`.
    pub fn ws_endpoint(&self) -> String {
        let base = self.http_base();
        let rest = base
            .strip_prefix("https://")
            .map(|rest| format!("wss://{rest}"))
            .or_else(|| base.strip_prefix("http://").map(|rest| format!("ws://{rest}")))
            .unwrap_or_else(|| base.to_owned());

        if self.ws_path.starts_with('/') {
            format!("{rest}{}", self.ws_path)
        } else {
            format!("{rest}/{}", self.ws_path)
        }
    }

    /// Channel settings for the connection manager.
    pub fn channel(&self) -> ChannelConfig {
        ChannelConfig { join_timeout: self.join_timeout }
    }
}

fn parse<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<T>, ConfigError>
where
    T::Err: std::fmt::Display,
{
    lookup(var)
        .map(|value| {
            value.trim().parse().map_err(|e: T::Err| ConfigError {
                var,
                value: value.clone(),
                reason: e.to_string(),
            })
        })
        .transpose()
}
