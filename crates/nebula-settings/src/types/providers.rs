//! Capability provider selection.

use serde::{Deserialize, Serialize};

/// Which family of capability providers the daemon wires up.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderBackend {
    /// Operating-system backed providers.
    #[default]
    System,
    /// In-memory providers that never touch the machine.
    Simulated,
}

impl ProviderBackend {
    /// Parse a backend name, case-insensitively.
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "system" => Some(Self::System),
            "simulated" | "sim" => Some(Self::Simulated),
            _ => None,
        }
    }
}

/// Provider settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProviderSettings {
    /// Provider family.
    pub backend: ProviderBackend,
    /// Upper bound on any single OS command invocation, in seconds.
    pub command_timeout_secs: u64,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            backend: ProviderBackend::System,
            command_timeout_secs: 15,
        }
    }
}
