//! Settings error types.

use std::path::PathBuf;

use thiserror::Error;

/// Why a settings file could not be turned into [`crate::NebulaSettings`].
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The file exists but could not be read.
    #[error("cannot read {}: {source}", path.display())]
    Read {
        /// File that was being read.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// The file is not JSON, or a field has the wrong shape.
    #[error("malformed settings in {}: {source}", path.display())]
    Parse {
        /// File that was being parsed.
        path: PathBuf,
        /// Decoder diagnostic, with line and column.
        #[source]
        source: serde_json::Error,
    },
    /// Compiled defaults failed to serialize.
    #[error("cannot encode default settings: {0}")]
    Encode(#[from] serde_json::Error),
    /// A value parsed but is unusable, such as a zero-sized queue.
    #[error("{key}: {reason}")]
    Invalid {
        /// Dotted camelCase key, e.g. `server.maxConnections`.
        key: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}

impl SettingsError {
    pub(crate) fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Result type for settings operations.
pub type Result<T> = std::result::Result<T, SettingsError>;
