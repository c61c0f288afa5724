//! # nebula-platform
//!
//! Concrete capability providers.
//!
//! - [`SystemPowerProvider`], [`XrandrDisplayProvider`] and
//!   [`SysinfoProcessProvider`] act on the host through external tools and
//!   `sysinfo`.
//! - The `Simulated*` providers keep state in memory for dry runs and tests.
//!
//! [`build_providers`] wires one family together from [`ProviderSettings`].

#![deny(unsafe_code)]

pub mod command;
pub mod display;
pub mod power;
pub mod process;
pub mod simulated;

pub use command::{CommandOutput, CommandRunner, TokioCommandRunner};
pub use display::XrandrDisplayProvider;
pub use power::SystemPowerProvider;
pub use process::SysinfoProcessProvider;
pub use simulated::{SimulatedDisplayProvider, SimulatedPowerProvider, SimulatedProcessProvider};

use std::sync::Arc;
use std::time::Duration;

use nebula_core::Providers;
use nebula_settings::{ProviderBackend, ProviderSettings};
use tracing::info;

/// Host operating system family, selecting a command table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Platform {
    /// Linux (systemd, power-profiles-daemon, X11).
    Linux,
    /// Windows.
    Windows,
    /// macOS.
    MacOs,
    /// Anything else; most operations are unsupported.
    Other,
}

impl Platform {
    /// The platform this binary was compiled for.
    pub fn current() -> Self {
        if cfg!(target_os = "linux") {
            Self::Linux
        } else if cfg!(target_os = "windows") {
            Self::Windows
        } else if cfg!(target_os = "macos") {
            Self::MacOs
        } else {
            Self::Other
        }
    }
}

/// Build the provider set selected by `settings`.
pub fn build_providers(settings: &ProviderSettings) -> Providers {
    match settings.backend {
        ProviderBackend::System => {
            let runner: Arc<dyn CommandRunner> = Arc::new(TokioCommandRunner::new(
                Duration::from_secs(settings.command_timeout_secs),
            ));
            info!(
                platform = ?Platform::current(),
                timeout_secs = settings.command_timeout_secs,
                "using system providers"
            );
            Providers {
                power: Arc::new(SystemPowerProvider::new(Arc::clone(&runner))),
                display: Arc::new(XrandrDisplayProvider::new(runner)),
                process: Arc::new(SysinfoProcessProvider::new()),
            }
        }
        ProviderBackend::Simulated => {
            info!("using simulated providers");
            simulated_providers()
        }
    }
}

/// A fresh set of simulated providers.
pub fn simulated_providers() -> Providers {
    Providers {
        power: Arc::new(SimulatedPowerProvider::new()),
        display: Arc::new(SimulatedDisplayProvider::new()),
        process: Arc::new(SimulatedProcessProvider::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_platform_matches_target() {
        let platform = Platform::current();
        if cfg!(target_os = "linux") {
            assert_eq!(platform, Platform::Linux);
        }
        if cfg!(target_os = "windows") {
            assert_eq!(platform, Platform::Windows);
        }
    }

    #[tokio::test]
    async fn simulated_backend_lists_without_host_access() {
        let settings = ProviderSettings {
            backend: ProviderBackend::Simulated,
            ..ProviderSettings::default()
        };
        let providers = build_providers(&settings);
        assert_eq!(providers.display.list_displays().await.unwrap().len(), 2);
        assert_eq!(providers.power.list_plans().await.unwrap().len(), 3);
        assert!(!providers.process.list_processes().await.unwrap().is_empty());
    }

    #[test]
    fn system_backend_builds() {
        let providers = build_providers(&ProviderSettings::default());
        assert_eq!(
            providers.process.concurrency(),
            nebula_core::Concurrency::Serialized
        );
    }
}
