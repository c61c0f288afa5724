//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`NebulaSettings::default()`]
//! 2. If the settings file exists, deep-merge user values over defaults
//! 3. Apply `NEBULA_*` environment variable overrides (highest priority)
//! 4. Reject values the daemon cannot run with ([`validate`])
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::{Result, SettingsError};
use crate::types::{LogFormat, LogLevel, NebulaSettings, ProviderBackend};

/// Resolve the path to the settings file (`~/.nebulalink/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| std::env::temp_dir().to_string_lossy().into_owned());
    PathBuf::from(home).join(".nebulalink").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<NebulaSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// If the file does not exist, returns defaults. If the file contains
/// invalid JSON, or the final values fail [`validate`], returns an error.
pub fn load_settings_from_path(path: &Path) -> Result<NebulaSettings> {
    let mut settings = read_settings_file(path)?;
    apply_env_overrides(&mut settings);
    validate(&settings)?;
    Ok(settings)
}

/// Load defaults merged with the file at `path`, without env overrides.
pub fn read_settings_file(path: &Path) -> Result<NebulaSettings> {
    let defaults = serde_json::to_value(NebulaSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let user: Value =
            serde_json::from_str(&content).map_err(|source| parse_error(path, source))?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    serde_json::from_value(merged).map_err(|source| parse_error(path, source))
}

fn parse_error(path: &Path, source: serde_json::Error) -> SettingsError {
    SettingsError::Parse {
        path: path.to_path_buf(),
        source,
    }
}

/// Check values that deserialize fine but would leave the daemon unusable.
pub fn validate(settings: &NebulaSettings) -> Result<()> {
    let server = &settings.server;
    if server.max_connections == 0 {
        return Err(SettingsError::invalid("server.maxConnections", "must be at least 1"));
    }
    if server.send_queue_capacity == 0 {
        return Err(SettingsError::invalid("server.sendQueueCapacity", "must be at least 1"));
    }
    if server.max_message_size == 0 {
        return Err(SettingsError::invalid("server.maxMessageSize", "must be at least 1"));
    }
    if server.heartbeat_interval_secs == 0 {
        return Err(SettingsError::invalid(
            "server.heartbeatIntervalSecs",
            "must be at least 1",
        ));
    }
    if server.heartbeat_timeout_secs < server.heartbeat_interval_secs {
        return Err(SettingsError::invalid(
            "server.heartbeatTimeoutSecs",
            format!(
                "{}s is shorter than the {}s heartbeat interval",
                server.heartbeat_timeout_secs, server.heartbeat_interval_secs
            ),
        ));
    }
    if settings.providers.command_timeout_secs == 0 {
        return Err(SettingsError::invalid(
            "providers.commandTimeoutSecs",
            "must be at least 1",
        ));
    }
    Ok(())
}

/// Recursive deep merge of two JSON values.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply `NEBULA_*` environment variable overrides to loaded settings.
///
/// Invalid values are ignored with a warning and the file/default value kept.
pub fn apply_env_overrides(settings: &mut NebulaSettings) {
    apply_overrides_from(settings, |name| std::env::var(name).ok());
}

/// Apply overrides read through `lookup` instead of the process environment.
pub fn apply_overrides_from<F>(settings: &mut NebulaSettings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let env = EnvReader { lookup };

    // ── Server ──────────────────────────────────────────────────────
    if let Some(v) = env.string("NEBULA_HOST") {
        settings.server.host = v;
    }
    // 0 asks the OS for a free port, same as `--port 0`
    if let Some(v) = env.parsed("NEBULA_PORT", |s| parse_u16_range(s, 0, u16::MAX)) {
        settings.server.port = v;
    }
    if let Some(v) = env.parsed("NEBULA_MAX_CONNECTIONS", |s| {
        parse_usize_range(s, 1, 10_000)
    }) {
        settings.server.max_connections = v;
    }
    if let Some(v) = env.parsed("NEBULA_BROADCAST_STATE_CHANGES", parse_bool) {
        settings.server.broadcast_state_changes = v;
    }

    // ── Logging ─────────────────────────────────────────────────────
    if let Some(v) = env.parsed("NEBULA_LOG_LEVEL", LogLevel::parse) {
        settings.logging.level = v;
    }
    if let Some(v) = env.parsed("NEBULA_LOG_FORMAT", LogFormat::parse) {
        settings.logging.format = v;
    }
    if let Some(v) = env.string("NEBULA_LOG_FILE") {
        settings.logging.file = Some(v);
    }
    if let Some(v) = env.parsed("NEBULA_LOG_MAX_BYTES", |s| {
        parse_u64_range(s, 0, u64::MAX)
    }) {
        settings.logging.max_file_bytes = v;
    }
    if let Some(v) = env.parsed("NEBULA_LOG_BACKUPS", |s| parse_usize_range(s, 0, 100)) {
        settings.logging.max_backups = v;
    }

    // ── Providers ───────────────────────────────────────────────────
    if let Some(v) = env.parsed("NEBULA_BACKEND", ProviderBackend::parse) {
        settings.providers.backend = v;
    }
    if let Some(v) = env.parsed("NEBULA_COMMAND_TIMEOUT_SECS", |s| {
        parse_u64_range(s, 1, 3600)
    }) {
        settings.providers.command_timeout_secs = v;
    }
}

// ── Pure parsing functions (testable without env vars) ──────────────────────

/// Parse a string as a boolean.
///
/// Accepts (case-insensitive): `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a string as a `u16` within a range.
pub fn parse_u16_range(val: &str, min: u16, max: u16) -> Option<u16> {
    let n: u16 = val.trim().parse().ok()?;
    (min..=max).contains(&n).then_some(n)
}

/// Parse a string as a `u64` within a range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.trim().parse().ok()?;
    (min..=max).contains(&n).then_some(n)
}

/// Parse a string as a `usize` within a range.
pub fn parse_usize_range(val: &str, min: usize, max: usize) -> Option<usize> {
    let n: usize = val.trim().parse().ok()?;
    (min..=max).contains(&n).then_some(n)
}

// ── Env var reader ──────────────────────────────────────────────────────────

struct EnvReader<F> {
    lookup: F,
}

impl<F> EnvReader<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn string(&self, name: &str) -> Option<String> {
        (self.lookup)(name).filter(|v| !v.is_empty())
    }

    fn parsed<T>(&self, name: &str, parse: impl Fn(&str) -> Option<T>) -> Option<T> {
        let val = self.string(name)?;
        let result = parse(&val);
        if result.is_none() {
            warn!(key = name, value = %val, "invalid env var, ignoring");
        }
        result
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
