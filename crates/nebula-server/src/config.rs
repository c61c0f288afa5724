//! Server configuration.

use std::time::Duration;

use nebula_settings::ServerSettings;
use serde::{Deserialize, Serialize};

/// Configuration for the NebulaLink server.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind (default `"127.0.0.1"`).
    pub host: String,
    /// Port to bind (default `0` for auto-assign).
    pub port: u16,
    /// Maximum concurrent `WebSocket` sessions.
    pub max_connections: usize,
    /// Heartbeat interval in seconds.
    pub heartbeat_interval_secs: u64,
    /// Close a session silent for this many seconds.
    pub heartbeat_timeout_secs: u64,
    /// Max inbound `WebSocket` message size in bytes.
    pub max_message_size: usize,
    /// Outbound queue depth per session.
    pub send_queue_capacity: usize,
    /// How long `stop` waits for sessions to finish.
    pub shutdown_grace_secs: u64,
    /// Broadcast refreshed state after display and power-plan mutations.
    pub broadcast_state_changes: bool,
}

impl ServerConfig {
    /// Heartbeat interval, never below one second.
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs.max(1))
    }

    /// Heartbeat timeout, never shorter than the interval.
    pub fn heartbeat_timeout(&self) -> Duration {
        Duration::from_secs(self.heartbeat_timeout_secs).max(self.heartbeat_interval())
    }

    /// Shutdown grace period.
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 0,
            max_connections: 50,
            heartbeat_interval_secs: 30,
            heartbeat_timeout_secs: 90,
            max_message_size: 1024 * 1024,
            send_queue_capacity: 256,
            shutdown_grace_secs: 10,
            broadcast_state_changes: true,
        }
    }
}

impl From<&ServerSettings> for ServerConfig {
    fn from(settings: &ServerSettings) -> Self {
        Self {
            host: settings.host.clone(),
            port: settings.port,
            max_connections: settings.max_connections.max(1),
            heartbeat_interval_secs: settings.heartbeat_interval_secs,
            heartbeat_timeout_secs: settings.heartbeat_timeout_secs,
            max_message_size: settings.max_message_size,
            send_queue_capacity: settings.send_queue_capacity.max(1),
            shutdown_grace_secs: settings.shutdown_grace_secs,
            broadcast_state_changes: settings.broadcast_state_changes,
        }
    }
}
