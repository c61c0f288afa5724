//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase", default)]`, so a partial
//! settings file only needs the keys it changes.

mod logging;
mod providers;
mod server;

pub use logging::*;
pub use providers::*;
pub use server::*;

use serde::{Deserialize, Serialize};

/// Root settings type for the NebulaLink daemon.
///
/// Loaded from `~/.nebulalink/settings.json` with defaults applied for
/// missing fields. Example:
///
/// ```json
/// {
///   "server": { "port": 9000 },
///   "logging": { "level": "debug", "format": "json" },
///   "providers": { "backend": "simulated" }
/// }
/// ```
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NebulaSettings {
    /// Network listener and session settings.
    pub server: ServerSettings,
    /// Log output configuration.
    pub logging: LoggingSettings,
    /// Capability provider selection.
    pub providers: ProviderSettings,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_camel_case() {
        let json = serde_json::to_value(NebulaSettings::default()).unwrap();
        assert!(json["server"].get("maxConnections").is_some());
        assert!(json["server"].get("heartbeatIntervalSecs").is_some());
        assert!(json["providers"].get("commandTimeoutSecs").is_some());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let settings: NebulaSettings =
            serde_json::from_str(r#"{"server": {"port": 9001}}"#).unwrap();
        assert_eq!(settings.server.port, 9001);
        assert_eq!(settings.server.host, "127.0.0.1");
        assert_eq!(settings.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn empty_object_is_default() {
        let settings: NebulaSettings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings.server.port, ServerSettings::default().port);
        assert!(settings.logging.file.is_none());
    }
}
