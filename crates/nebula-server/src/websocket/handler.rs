//! `GET /ws` upgrade handler.

use axum::extract::State;
use axum::extract::ws::WebSocketUpgrade;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use metrics::counter;
use tracing::{debug, warn};
use uuid::Uuid;

use super::connection::run_connection;
use crate::metrics::WS_CONNECTIONS_REJECTED_TOTAL;
use crate::server::AppState;

/// Upgrade to a `WebSocket` session, or 503 when shutting down or at the
/// connection cap.
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    if state.shutdown.is_shutting_down() {
        return (StatusCode::SERVICE_UNAVAILABLE, "server is shutting down").into_response();
    }
    let Ok(permit) = state.limiter.clone().try_acquire_owned() else {
        counter!(WS_CONNECTIONS_REJECTED_TOTAL).increment(1);
        warn!(
            max_connections = state.config.max_connections,
            "connection limit reached, rejecting upgrade"
        );
        return (StatusCode::SERVICE_UNAVAILABLE, "connection limit reached").into_response();
    };

    let session_id = Uuid::now_v7().to_string();
    debug!(session_id, "upgrading connection");
    let ctx = state.connection_context();
    let shutdown = state.shutdown.clone();
    ws.max_message_size(state.config.max_message_size)
        .on_upgrade(move |socket| async move {
            let _permit = permit;
            shutdown.track(run_connection(socket, session_id, ctx)).await;
        })
}
