//! # nebula-server
//!
//! Axum HTTP + `WebSocket` server for NebulaLink.
//!
//! - `GET /ws`: one session per client; commands are dispatched strictly in
//!   receipt order through the [`nebula_rpc::CommandRouter`]
//! - `GET /health` and `GET /metrics`
//! - [`websocket::manager::SessionManager`]: the synchronized set of live
//!   sessions with unicast and best-effort broadcast
//! - Heartbeat pings, a connection cap, and state-change broadcasts after
//!   display and power-plan mutations
//! - Graceful shutdown via `CancellationToken` + `TaskTracker`

#![deny(unsafe_code)]

pub mod config;
pub mod errors;
pub mod health;
pub mod metrics;
pub mod server;
pub mod shutdown;
pub mod websocket;

pub use config::ServerConfig;
pub use errors::ServerError;
pub use server::NebulaServer;
