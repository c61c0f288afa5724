//! # nebula-agent
//!
//! NebulaLink daemon binary: loads settings, initialises logging, wires the
//! capability providers into the command router and serves `WebSocket`
//! clients until ctrl-c.

#![deny(unsafe_code)]

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use nebula_rpc::{CommandRouter, RpcContext};
use nebula_server::config::ServerConfig;
use nebula_server::server::NebulaServer;
use nebula_settings::{LogLevel, NebulaSettings, ProviderBackend};
use tracing::{info, warn};

/// NebulaLink remote-control daemon.
#[derive(Parser, Debug)]
#[command(name = "nebula-agent", version, about = "NebulaLink remote-control daemon")]
struct Cli {
    /// Host to bind (overrides settings).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind, 0 for auto-assign (overrides settings).
    #[arg(long)]
    port: Option<u16>,

    /// Settings file (default `~/.nebulalink/settings.json`).
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Capability backend: `system` or `simulated`.
    #[arg(long, value_parser = parse_backend)]
    backend: Option<ProviderBackend>,

    /// Log level: trace, debug, info, warn or error.
    #[arg(long, value_parser = parse_log_level)]
    log_level: Option<LogLevel>,
}

impl Cli {
    /// Apply flags on top of file and env settings.
    fn apply(&self, settings: &mut NebulaSettings) {
        if let Some(ref host) = self.host {
            settings.server.host.clone_from(host);
        }
        if let Some(port) = self.port {
            settings.server.port = port;
        }
        if let Some(backend) = self.backend {
            settings.providers.backend = backend;
        }
        if let Some(level) = self.log_level {
            settings.logging.level = level;
        }
    }

    fn load_settings(&self) -> Result<NebulaSettings> {
        let path = self
            .settings
            .clone()
            .unwrap_or_else(nebula_settings::settings_path);
        let mut settings = nebula_settings::load_settings_from_path(&path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?;
        self.apply(&mut settings);
        Ok(settings)
    }
}

fn parse_backend(value: &str) -> Result<ProviderBackend, String> {
    ProviderBackend::parse(value).ok_or_else(|| format!("unknown backend '{value}'"))
}

fn parse_log_level(value: &str) -> Result<LogLevel, String> {
    LogLevel::parse(value).ok_or_else(|| format!("unknown log level '{value}'"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = cli.load_settings()?;

    let _log_guard =
        nebula_logging::init(&settings.logging).context("Failed to initialise logging")?;

    let metrics = nebula_server::metrics::install_recorder()
        .context("Failed to install metrics recorder")?;

    let providers = nebula_platform::build_providers(&settings.providers);
    let router = CommandRouter::with_default_handlers(RpcContext::new(providers))
        .context("Failed to build command router")?;

    let config = ServerConfig::from(&settings.server);
    let grace = config.shutdown_grace();
    let server = NebulaServer::new(config, router).with_metrics(metrics);

    let (addr, handle) = server.listen().await.context("Failed to bind server")?;
    info!(
        backend = ?settings.providers.backend,
        "NebulaLink listening on ws://{addr}/ws"
    );

    // Wait for shutdown signal
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl-c")?;

    info!("Shutting down...");
    let drained = server.stop().await;
    if tokio::time::timeout(grace, handle).await.is_err() {
        warn!("accept loop did not exit within the grace period");
    }

    info!(drained, "Shutdown complete");
    Ok(())
}
