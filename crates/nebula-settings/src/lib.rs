//! # nebula-settings
//!
//! Configuration management with layered sources for the NebulaLink daemon.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`NebulaSettings::default()`]
//! 2. **User file**: `~/.nebulalink/settings.json` (deep-merged over defaults)
//! 3. **Environment variables**: `NEBULA_*` overrides (highest priority)
//!
//! Command-line flags are applied on top by the binary.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{
    apply_env_overrides, deep_merge, load_settings, load_settings_from_path, read_settings_file,
    settings_path, validate,
};
pub use types::*;
