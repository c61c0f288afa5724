//! Listener, session and shutdown settings.

use serde::{Deserialize, Serialize};

/// Server network and session settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// Bind address.
    pub host: String,
    /// Listening port.
    pub port: u16,
    /// Maximum number of concurrent WebSocket sessions.
    pub max_connections: usize,
    /// Seconds between server pings.
    pub heartbeat_interval_secs: u64,
    /// Seconds of silence after which a session is closed.
    pub heartbeat_timeout_secs: u64,
    /// Maximum inbound message size in bytes.
    pub max_message_size: usize,
    /// Outbound queue capacity per session.
    pub send_queue_capacity: usize,
    /// Seconds `stop()` waits for in-flight sessions to finish.
    pub shutdown_grace_secs: u64,
    /// Broadcast refreshed display/plan state after successful mutations.
    pub broadcast_state_changes: bool,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8765,
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let s = ServerSettings::default();
        assert_eq!(s.port, 8765);
        assert_eq!(s.heartbeat_interval_secs, 30);
        assert_eq!(s.heartbeat_timeout_secs, 90);
        assert_eq!(s.max_message_size, 1_048_576);
        assert_eq!(s.shutdown_grace_secs, 10);
        assert!(s.broadcast_state_changes);
    }

    #[test]
    fn timeout_exceeds_interval() {
        let s = ServerSettings::default();
        assert!(s.heartbeat_timeout_secs > s.heartbeat_interval_secs);
    }
}
