//! Prometheus metrics recorder and metric names.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::info;

use crate::errors::ServerError;

/// Install the Prometheus recorder globally.
///
/// Returns the handle used to render `/metrics`. Fails if a recorder is
/// already installed.
pub fn install_recorder() -> Result<PrometheusHandle, ServerError> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| ServerError::Metrics(e.to_string()))?;
    info!("prometheus metrics recorder installed");
    Ok(handle)
}

/// A handle over a recorder that is not installed globally.
pub fn detached_handle() -> PrometheusHandle {
    PrometheusBuilder::new().build_recorder().handle()
}

/// Sessions opened (counter).
pub const WS_CONNECTIONS_TOTAL: &str = "nebula_ws_connections_total";
/// Sessions closed (counter).
pub const WS_DISCONNECTIONS_TOTAL: &str = "nebula_ws_disconnections_total";
/// Live sessions (gauge).
pub const WS_CONNECTIONS_ACTIVE: &str = "nebula_ws_connections_active";
/// Upgrades refused at the connection cap (counter).
pub const WS_CONNECTIONS_REJECTED_TOTAL: &str = "nebula_ws_connections_rejected_total";
/// Session lifetime (histogram).
pub const WS_CONNECTION_DURATION_SECONDS: &str = "nebula_ws_connection_duration_seconds";
/// Broadcast messages dropped on full or closed queues (counter).
pub const WS_BROADCAST_DROPS_TOTAL: &str = "nebula_ws_broadcast_drops_total";
/// Sessions closed by the heartbeat (counter).
pub const WS_HEARTBEAT_TIMEOUTS_TOTAL: &str = "nebula_ws_heartbeat_timeouts_total";
