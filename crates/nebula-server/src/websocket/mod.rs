//! `WebSocket` sessions: lifecycle, the session set, the per-connection loop
//! and state-change broadcasts.

pub mod connection;
pub mod handler;
pub mod manager;
pub mod notify;
pub mod session;
