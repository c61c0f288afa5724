//! Per-connection message loop: one reader that dispatches commands strictly
//! in receipt order, and one writer that drains the outbound queue and sends
//! heartbeat pings.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, Utf8Bytes, WebSocket};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use metrics::{counter, gauge, histogram};
use nebula_rpc::{CommandRouter, ErrorKind, ResponseEnvelope};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::manager::SessionManager;
use super::notify;
use super::session::Session;
use crate::config::ServerConfig;
use crate::metrics::{
    WS_CONNECTION_DURATION_SECONDS, WS_CONNECTIONS_ACTIVE, WS_CONNECTIONS_TOTAL,
    WS_DISCONNECTIONS_TOTAL, WS_HEARTBEAT_TIMEOUTS_TOTAL,
};

/// How long the writer gets to flush queued replies after the reader exits.
const WRITER_FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

/// Everything a connection loop needs from the server.
#[derive(Clone)]
pub struct ConnectionContext {
    /// Command router shared by all sessions.
    pub router: Arc<CommandRouter>,
    /// The live session set.
    pub sessions: Arc<SessionManager>,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Cancelled by `stop()`.
    pub shutdown: CancellationToken,
}

/// Why the writer task ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriterExit {
    /// The reader finished and the queue was flushed.
    Drained,
    /// Sending a frame failed.
    SendFailed,
    /// No inbound traffic within the heartbeat timeout.
    HeartbeatTimeout,
}

/// Run one session from upgrade through disconnect.
///
/// The session is registered before the first read and unregistered on every
/// exit path. Every reply goes out through the [`SessionManager`], so a
/// session removed from the set stops receiving replies and its loop ends. Cancellation is only observed while waiting for the next frame,
/// so a command that has started dispatching always runs to completion and
/// its reply is flushed.
#[instrument(skip_all, fields(session_id = %session_id))]
pub async fn run_connection(socket: WebSocket, session_id: String, ctx: ConnectionContext) {
    let (sink, mut stream) = socket.split();
    let (tx, rx) = mpsc::channel(ctx.config.send_queue_capacity.max(1));
    let session = Arc::new(Session::new(session_id.clone(), tx));

    if !ctx.sessions.register(session.clone()) {
        return;
    }
    info!(session_id, "client connected");
    counter!(WS_CONNECTIONS_TOTAL).increment(1);
    gauge!(WS_CONNECTIONS_ACTIVE).increment(1.0);

    let reader_stop = ctx.shutdown.child_token();
    let writer_stop = CancellationToken::new();
    let mut writer = tokio::spawn(write_loop(
        sink,
        rx,
        session.clone(),
        ctx.config.heartbeat_interval(),
        ctx.config.heartbeat_timeout(),
        writer_stop.clone(),
        reader_stop.clone(),
    ));

    read_loop(&mut stream, &session, &ctx, &reader_stop).await;

    let _ = session.begin_closing();
    let _ = ctx.sessions.unregister(&session_id);
    writer_stop.cancel();
    match tokio::time::timeout(WRITER_FLUSH_TIMEOUT, &mut writer).await {
        Ok(Ok(exit)) => debug!(session_id, ?exit, "writer finished"),
        Ok(Err(e)) => warn!(session_id, error = %e, "writer task failed"),
        Err(_) => {
            warn!(session_id, "writer did not flush in time");
            writer.abort();
        }
    }
    session.mark_closed();

    info!(session_id, "client disconnected");
    counter!(WS_DISCONNECTIONS_TOTAL).increment(1);
    gauge!(WS_CONNECTIONS_ACTIVE).decrement(1.0);
    histogram!(WS_CONNECTION_DURATION_SECONDS).record(session.age().as_secs_f64());
}

async fn read_loop(
    stream: &mut SplitStream<WebSocket>,
    session: &Session,
    ctx: &ConnectionContext,
    stop: &CancellationToken,
) {
    loop {
        let frame = tokio::select! {
            () = stop.cancelled() => {
                debug!(session_id = session.id(), "connection loop cancelled");
                break;
            }
            frame = stream.next() => frame,
        };

        let text = match frame {
            Some(Ok(Message::Text(text))) => text,
            Some(Ok(Message::Binary(data))) => match String::from_utf8(data.to_vec()) {
                Ok(text) => Utf8Bytes::from(text),
                Err(_) => {
                    session.mark_alive();
                    let envelope = ResponseEnvelope::error(
                        ErrorKind::InvalidMessage,
                        "Binary frame is not valid UTF-8",
                    );
                    if !ctx.sessions.send(session.id(), &envelope).await {
                        break;
                    }
                    continue;
                }
            },
            Some(Ok(Message::Ping(_) | Message::Pong(_))) => {
                session.mark_alive();
                continue;
            }
            Some(Ok(Message::Close(_))) => {
                debug!(session_id = session.id(), "client sent close frame");
                break;
            }
            Some(Err(e)) => {
                debug!(session_id = session.id(), error = %e, "read failed");
                break;
            }
            None => break,
        };
        session.mark_alive();

        if !ctx.sessions.contains(session.id()) {
            debug!(session_id = session.id(), "session no longer registered, dropping frame");
            break;
        }
        let (action, envelope) = ctx.router.dispatch_frame(text.as_str()).await;
        let succeeded = envelope.is_success();
        if !ctx.sessions.send(session.id(), &envelope).await {
            debug!(session_id = session.id(), "reply not delivered, session gone");
            break;
        }

        if let Some(action) = action.filter(|_| succeeded && ctx.config.broadcast_state_changes) {
            let _ = notify::broadcast_state_change(&ctx.router, &ctx.sessions, action).await;
        }
    }
}

async fn write_loop(
    mut sink: SplitSink<WebSocket, Message>,
    mut rx: mpsc::Receiver<Utf8Bytes>,
    session: Arc<Session>,
    interval: Duration,
    timeout: Duration,
    stop: CancellationToken,
    reader_stop: CancellationToken,
) -> WriterExit {
    let mut ping = tokio::time::interval(interval);
    // Skip the immediate first tick
    let _ = ping.tick().await;

    let exit = loop {
        tokio::select! {
            frame = rx.recv() => {
                let Some(frame) = frame else { break WriterExit::Drained };
                if sink.send(Message::Text(frame)).await.is_err() {
                    break WriterExit::SendFailed;
                }
            }
            _ = ping.tick() => {
                if session.idle() >= timeout {
                    warn!(session_id = session.id(), "client unresponsive for {timeout:?}, disconnecting");
                    counter!(WS_HEARTBEAT_TIMEOUTS_TOTAL).increment(1);
                    break WriterExit::HeartbeatTimeout;
                }
                if sink.send(Message::Ping(Vec::new().into())).await.is_err() {
                    break WriterExit::SendFailed;
                }
            }
            () = stop.cancelled() => {
                rx.close();
                while let Some(frame) = rx.recv().await {
                    if sink.send(Message::Text(frame)).await.is_err() {
                        return WriterExit::SendFailed;
                    }
                }
                let _ = sink.send(Message::Close(None)).await;
                break WriterExit::Drained;
            }
        }
    };

    if exit != WriterExit::Drained {
        reader_stop.cancel();
        let _ = sink.close().await;
    }
    exit
}
