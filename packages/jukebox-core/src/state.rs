//! Core configuration types.
//!
//! [`Config`] carries every tunable of the core. The standalone server builds
//! one from its YAML file and environment; tests use the defaults.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_JOIN_TIMEOUT_MS, DEFAULT_NODE_TIMEOUT_MS, DEFAULT_RESOLVE_TIMEOUT_MS,
    DEFAULT_VOLUME, MAX_VOLUME,
};

/// Configuration for the jukebox core.
///
/// All fields have sensible defaults.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct Config {
    // Server
    /// Preferred port for the HTTP/WS server (0 = auto-allocate).
    pub preferred_port: u16,

    /// Origins allowed to call the HTTP API from a browser.
    pub trusted_origins: Vec<String>,

    // Playback
    /// Volume applied to every new session.
    pub default_volume: u16,

    // Collaborator time limits
    /// Time limit for a metadata resolver call (milliseconds).
    pub resolve_timeout_ms: u64,

    /// Time limit for a single audio node call (milliseconds).
    pub node_timeout_ms: u64,

    /// Time limit for joining a voice channel (milliseconds).
    pub join_timeout_ms: u64,

    // Channels
    /// Capacity of the event broadcast channel.
    pub event_channel_capacity: usize,

    /// Capacity of the node event channel feeding the event bridge.
    pub node_event_channel_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            preferred_port: 0,
            trusted_origins: vec![
                "http://localhost".to_string(),
                "http://127.0.0.1".to_string(),
            ],
            default_volume: DEFAULT_VOLUME,
            resolve_timeout_ms: DEFAULT_RESOLVE_TIMEOUT_MS,
            node_timeout_ms: DEFAULT_NODE_TIMEOUT_MS,
            join_timeout_ms: DEFAULT_JOIN_TIMEOUT_MS,
            event_channel_capacity: 100,
            node_event_channel_capacity: 256,
        }
    }
}

impl Config {
    /// Validates the configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.default_volume > MAX_VOLUME {
            return Err(format!("default_volume must be <= {MAX_VOLUME}"));
        }
        if self.resolve_timeout_ms == 0 || self.node_timeout_ms == 0 || self.join_timeout_ms == 0 {
            return Err("collaborator timeouts must be >= 1ms".to_string());
        }
        if self.event_channel_capacity == 0 {
            return Err(
                "event_channel_capacity must be >= 1 (broadcast::channel panics on 0)".to_string(),
            );
        }
        if self.node_event_channel_capacity == 0 {
            return Err(
                "node_event_channel_capacity must be >= 1 (mpsc::channel panics on 0)".to_string(),
            );
        }
        Ok(())
    }

    pub fn timeouts(&self) -> Timeouts {
        Timeouts {
            resolve: Duration::from_millis(self.resolve_timeout_ms),
            node: Duration::from_millis(self.node_timeout_ms),
            join: Duration::from_millis(self.join_timeout_ms),
        }
    }
}

/// Time limits applied to collaborator calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub resolve: Duration,
    pub node: Duration,
    pub join: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Config::default().timeouts()
    }
}
