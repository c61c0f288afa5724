//! # nebula-logging
//!
//! Structured logging with `tracing`.
//!
//! [`init`] installs the global subscriber: an [`EnvFilter`] (`RUST_LOG`
//! wins over the configured level), a console layer on stderr in either
//! pretty or JSON form, and an optional log file written through a
//! non-blocking `tracing-appender` worker. The file rotates by size
//! ([`RotatingFile`]), keeping a fixed number of backups.

#![deny(unsafe_code)]

mod rotating;

use std::path::{Path, PathBuf};

use nebula_settings::{LogFormat, LoggingSettings};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

pub use rotating::RotatingFile;

/// Errors raised while installing the subscriber.
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    /// The configured filter directive did not parse.
    #[error("invalid log filter {directive:?}: {message}")]
    Filter {
        /// Directive as configured.
        directive: String,
        /// Parser message.
        message: String,
    },
    /// The log file could not be opened.
    #[error("failed to open log file {path:?}: {source}")]
    Io {
        /// Requested file.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },
    /// A global subscriber was already installed.
    #[error("logging already initialized: {0}")]
    AlreadyInitialized(String),
}

/// Keeps the file writer flushing; drop it last in `main`.
#[derive(Debug)]
pub struct LoggingGuard {
    file_worker: Option<WorkerGuard>,
}

impl LoggingGuard {
    /// Whether a log file worker is attached.
    pub fn has_file(&self) -> bool {
        self.file_worker.is_some()
    }
}

/// Install the global tracing subscriber described by `settings`.
pub fn init(settings: &LoggingSettings) -> Result<LoggingGuard, LoggingError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => build_filter(settings.level.as_filter_str())?,
    };

    let (file_writer, file_guard) = match settings.file.as_deref() {
        Some(path) => {
            let file = open_log_file(
                Path::new(path),
                settings.max_file_bytes,
                settings.max_backups,
            )?;
            let (writer, guard) = tracing_appender::non_blocking(file);
            (Some(writer), Some(guard))
        }
        None => (None, None),
    };

    let pretty = (settings.format == LogFormat::Pretty).then(|| {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_writer(std::io::stderr)
    });
    let json = (settings.format == LogFormat::Json).then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_writer(std::io::stderr)
    });
    let file = file_writer.map(|writer| {
        tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_target(true)
            .with_writer(writer)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(pretty)
        .with(json)
        .with(file)
        .try_init()
        .map_err(|e| LoggingError::AlreadyInitialized(e.to_string()))?;

    Ok(LoggingGuard {
        file_worker: file_guard,
    })
}

/// Parse a filter directive such as `info` or `info,nebula_rpc=debug`.
pub fn build_filter(directive: &str) -> Result<EnvFilter, LoggingError> {
    EnvFilter::try_new(directive).map_err(|e| LoggingError::Filter {
        directive: directive.to_string(),
        message: e.to_string(),
    })
}

fn open_log_file(
    path: &Path,
    max_bytes: u64,
    max_backups: usize,
) -> Result<RotatingFile, LoggingError> {
    RotatingFile::open(path, max_bytes, max_backups).map_err(|source| LoggingError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_filter_accepts_levels() {
        for level in ["trace", "debug", "info", "warn", "error"] {
            assert!(build_filter(level).is_ok(), "{level}");
        }
        assert!(build_filter("info,nebula_rpc=debug").is_ok());
    }

    #[test]
    fn build_filter_rejects_garbage() {
        let err = build_filter("nebula_rpc=loudest").unwrap_err();
        assert!(matches!(err, LoggingError::Filter { .. }));
        assert!(err.to_string().contains("loudest"));
    }

    #[test]
    fn open_log_file_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("nebula.log");
        let _file = open_log_file(&path, 1024, 5).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn open_log_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        // A directory cannot be opened for appending.
        let err = open_log_file(dir.path(), 1024, 5).unwrap_err();
        assert!(matches!(err, LoggingError::Io { .. }));
    }

    // Only one test may install the global subscriber.
    #[test]
    fn init_writes_file_and_rejects_second_install() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nebula.log");
        let settings = LoggingSettings {
            file: Some(path.to_string_lossy().into_owned()),
            ..LoggingSettings::default()
        };

        let guard = init(&settings).unwrap();
        assert!(guard.has_file());
        tracing::error!(marker = "file-sink-check", "logging smoke test");
        drop(guard);

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("logging smoke test"));

        let second = init(&LoggingSettings::default());
        assert!(matches!(second, Err(LoggingError::AlreadyInitialized(_))));
    }
}
