//! `NebulaServer`: Axum HTTP + `WebSocket` server.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use metrics_exporter_prometheus::PrometheusHandle;
use nebula_rpc::CommandRouter;
use parking_lot::Mutex;
use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::config::ServerConfig;
use crate::errors::ServerError;
use crate::health::{self, HealthResponse};
use crate::shutdown::ShutdownCoordinator;
use crate::websocket::connection::ConnectionContext;
use crate::websocket::handler::ws_upgrade;
use crate::websocket::manager::SessionManager;

/// Shared state accessible from Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Command router.
    pub router: Arc<CommandRouter>,
    /// Live sessions.
    pub sessions: Arc<SessionManager>,
    /// Shutdown coordinator.
    pub shutdown: Arc<ShutdownCoordinator>,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// One permit per allowed concurrent session.
    pub limiter: Arc<Semaphore>,
    /// When the server started.
    pub start_time: Instant,
    /// Prometheus handle for `/metrics`, if a recorder is attached.
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// What a connection loop needs from this state.
    pub fn connection_context(&self) -> ConnectionContext {
        ConnectionContext {
            router: self.router.clone(),
            sessions: self.sessions.clone(),
            config: self.config.clone(),
            shutdown: self.shutdown.token(),
        }
    }
}

/// The NebulaLink server.
pub struct NebulaServer {
    config: Arc<ServerConfig>,
    router: Arc<CommandRouter>,
    sessions: Arc<SessionManager>,
    shutdown: Arc<ShutdownCoordinator>,
    limiter: Arc<Semaphore>,
    start_time: Instant,
    metrics_handle: Option<PrometheusHandle>,
    listen_state: Mutex<ListenState>,
}

/// Lifecycle of the listener, claimed under one lock so concurrent
/// `listen` calls cannot both bind.
#[derive(Clone, Copy, Debug)]
enum ListenState {
    Idle,
    Binding,
    Listening(SocketAddr),
}

impl NebulaServer {
    /// Create a new server.
    pub fn new(config: ServerConfig, router: CommandRouter) -> Self {
        let limiter = Arc::new(Semaphore::new(config.max_connections.max(1)));
        Self {
            config: Arc::new(config),
            router: Arc::new(router),
            sessions: Arc::new(SessionManager::new()),
            shutdown: Arc::new(ShutdownCoordinator::new()),
            limiter,
            start_time: Instant::now(),
            metrics_handle: None,
            listen_state: Mutex::new(ListenState::Idle),
        }
    }

    /// Serve `/metrics` from `handle`.
    #[must_use]
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics_handle = Some(handle);
        self
    }

    /// Build the Axum router with all routes.
    pub fn router(&self) -> Router {
        let state = AppState {
            router: self.router.clone(),
            sessions: self.sessions.clone(),
            shutdown: self.shutdown.clone(),
            config: self.config.clone(),
            limiter: self.limiter.clone(),
            start_time: self.start_time,
            metrics: self.metrics_handle.clone(),
        };

        Router::new()
            .route("/health", get(health_handler))
            .route("/metrics", get(metrics_handler))
            .route("/ws", get(ws_upgrade))
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }

    /// Bind the listener and start accepting connections.
    ///
    /// Port `0` picks a free port; the bound address is returned along with
    /// the accept task's handle.
    pub async fn listen(&self) -> Result<(SocketAddr, JoinHandle<()>), ServerError> {
        {
            let mut state = self.listen_state.lock();
            match *state {
                ListenState::Idle => *state = ListenState::Binding,
                ListenState::Binding => return Err(ServerError::ListenInProgress),
                ListenState::Listening(addr) => return Err(ServerError::AlreadyListening(addr)),
            }
        }

        let (listener, addr) = match self.bind().await {
            Ok(bound) => bound,
            Err(e) => {
                *self.listen_state.lock() = ListenState::Idle;
                return Err(e);
            }
        };
        *self.listen_state.lock() = ListenState::Listening(addr);

        let app = self.router();
        let token = self.shutdown.token();
        let handle = tokio::spawn(async move {
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(async move { token.cancelled().await })
                .await;
            if let Err(e) = result {
                error!(error = %e, "server error");
            }
        });

        info!(%addr, max_connections = self.config.max_connections, "listening");
        Ok((addr, handle))
    }

    async fn bind(&self) -> Result<(TcpListener, SocketAddr), ServerError> {
        let listener = TcpListener::bind((self.config.host.as_str(), self.config.port))
            .await
            .map_err(|source| ServerError::Bind {
                address: format!("{}:{}", self.config.host, self.config.port),
                source,
            })?;
        let addr = listener.local_addr().map_err(ServerError::LocalAddr)?;
        Ok((listener, addr))
    }

    /// Stop accepting, signal every session loop, and wait up to the
    /// configured grace period for them to finish.
    ///
    /// In-flight commands are never interrupted. Returns `true` if all
    /// sessions closed within the grace period.
    pub async fn stop(&self) -> bool {
        info!(sessions = self.sessions.count(), "stopping server");
        let drained = self
            .shutdown
            .graceful_shutdown(self.config.shutdown_grace())
            .await;
        info!(drained, remaining = self.sessions.count(), "server stopped");
        drained
    }

    /// Address bound by [`Self::listen`].
    pub fn local_addr(&self) -> Option<SocketAddr> {
        match *self.listen_state.lock() {
            ListenState::Listening(addr) => Some(addr),
            ListenState::Idle | ListenState::Binding => None,
        }
    }

    /// Get the session manager.
    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    /// Get the shutdown coordinator.
    pub fn shutdown(&self) -> &Arc<ShutdownCoordinator> {
        &self.shutdown
    }

    /// Get the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Get the command router.
    pub fn command_router(&self) -> &Arc<CommandRouter> {
        &self.router
    }
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(health::health_check(
        state.start_time,
        state.sessions.count(),
        state.shutdown.is_shutting_down(),
    ))
}

/// GET /metrics
async fn metrics_handler(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "metrics recorder not installed").into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use nebula_rpc::RpcContext;
    use tower::ServiceExt;

    fn make_server(config: ServerConfig) -> NebulaServer {
        let router = CommandRouter::with_default_handlers(RpcContext::new(
            nebula_platform::simulated_providers(),
        ))
        .unwrap();
        NebulaServer::new(config, router)
    }

    async fn get(app: Router, uri: &str) -> (StatusCode, String) {
        let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let resp = app.oneshot(req).await.unwrap();
        let status = resp.status();
        let body = axum::body::to_bytes(resp.into_body(), 100_000)
            .await
            .unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn health_endpoint_returns_ok() {
        let server = make_server(ServerConfig::default());
        let (status, body) = get(server.router(), "/health").await;
        assert_eq!(status, StatusCode::OK);
        let parsed: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(parsed["status"], "ok");
        assert_eq!(parsed["connections"], 0);
        assert!(parsed["uptime_secs"].is_number());
    }

    #[tokio::test]
    async fn health_reports_shutting_down() {
        let server = make_server(ServerConfig::default());
        server.shutdown().shutdown();
        let (_, body) = get(server.router(), "/health").await;
        let parsed: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(parsed["status"], "shutting_down");
    }

    #[tokio::test]
    async fn metrics_without_recorder_is_404() {
        let server = make_server(ServerConfig::default());
        let (status, _) = get(server.router(), "/metrics").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn metrics_with_recorder_renders() {
        let server = make_server(ServerConfig::default())
            .with_metrics(crate::metrics::detached_handle());
        let (status, _) = get(server.router(), "/metrics").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn ws_without_upgrade_headers_rejected() {
        let server = make_server(ServerConfig::default());
        let (status, _) = get(server.router(), "/ws").await;
        assert!(status.is_client_error());
    }

    #[tokio::test]
    async fn unknown_route_returns_404() {
        let server = make_server(ServerConfig::default());
        let (status, _) = get(server.router(), "/nonexistent").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn listen_binds_ephemeral_port() {
        let server = make_server(ServerConfig::default());
        let (addr, _handle) = server.listen().await.unwrap();
        assert_ne!(addr.port(), 0);
        assert_eq!(server.local_addr(), Some(addr));

        let err = server.listen().await.unwrap_err();
        assert!(matches!(err, ServerError::AlreadyListening(a) if a == addr));
        assert!(server.stop().await);
    }

    #[tokio::test]
    async fn listen_on_taken_port_fails() {
        let first = make_server(ServerConfig::default());
        let (addr, _handle) = first.listen().await.unwrap();

        let second = make_server(ServerConfig {
            port: addr.port(),
            ..ServerConfig::default()
        });
        let err = second.listen().await.unwrap_err();
        assert!(matches!(err, ServerError::Bind { .. }));
        assert_eq!(second.local_addr(), None);
        let _ = first.stop().await;
    }

    #[tokio::test]
    async fn concurrent_listen_binds_once() {
        let server = make_server(ServerConfig::default());
        let (a, b) = tokio::join!(server.listen(), server.listen());

        let (ok, err) = match (a, b) {
            (Ok(ok), Err(err)) | (Err(err), Ok(ok)) => (ok, err),
            (Ok(_), Ok(_)) => panic!("both listen calls bound"),
            (Err(a), Err(b)) => panic!("both listen calls failed: {a}, {b}"),
        };
        assert!(matches!(
            err,
            ServerError::ListenInProgress | ServerError::AlreadyListening(_)
        ));
        assert_eq!(server.local_addr(), Some(ok.0));
        assert!(server.stop().await);
    }

    #[tokio::test]
    async fn stop_with_no_sessions_is_immediate() {
        let server = make_server(ServerConfig::default());
        let (_, handle) = server.listen().await.unwrap();
        assert!(server.stop().await);
        assert!(server.shutdown().is_shutting_down());
        tokio::time::timeout(std::time::Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
