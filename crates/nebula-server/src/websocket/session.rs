//! Server-side record of one connected client.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use axum::extract::ws::Utf8Bytes;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::time::Instant;

/// Lifecycle of a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// Registered and accepting outbound messages.
    Connected,
    /// The connection loop is exiting; nothing new is queued.
    Closing,
    /// The writer has finished.
    Closed,
}

/// One connected client.
///
/// Outbound frames go through a bounded queue drained by the session's
/// writer task.
pub struct Session {
    id: String,
    tx: mpsc::Sender<Utf8Bytes>,
    state: Mutex<SessionState>,
    connected_at: Instant,
    last_seen: Mutex<Instant>,
    dropped_messages: AtomicU64,
}

impl Session {
    /// Create a connected session writing into `tx`.
    pub fn new(id: String, tx: mpsc::Sender<Utf8Bytes>) -> Self {
        let now = Instant::now();
        Self {
            id,
            tx,
            state: Mutex::new(SessionState::Connected),
            connected_at: now,
            last_seen: Mutex::new(now),
            dropped_messages: AtomicU64::new(0),
        }
    }

    /// Unique session id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        *self.state.lock()
    }

    /// Move `Connected → Closing`. Returns `false` if already past it.
    pub fn begin_closing(&self) -> bool {
        let mut state = self.state.lock();
        if *state == SessionState::Connected {
            *state = SessionState::Closing;
            true
        } else {
            false
        }
    }

    /// Move to `Closed`.
    pub fn mark_closed(&self) {
        *self.state.lock() = SessionState::Closed;
    }

    /// Queue a reply, waiting for queue capacity.
    ///
    /// Returns `false` if the session is no longer connected or its writer
    /// has gone away.
    pub async fn send(&self, frame: Utf8Bytes) -> bool {
        if self.state() != SessionState::Connected {
            return false;
        }
        self.tx.send(frame).await.is_ok()
    }

    /// Queue a frame without waiting; counts a drop if the queue is full or
    /// closed.
    pub fn try_send(&self, frame: Utf8Bytes) -> bool {
        if self.state() == SessionState::Connected && self.tx.try_send(frame).is_ok() {
            return true;
        }
        let _ = self.dropped_messages.fetch_add(1, Ordering::Relaxed);
        false
    }

    /// Record inbound activity.
    pub fn mark_alive(&self) {
        *self.last_seen.lock() = Instant::now();
    }

    /// Time since the last inbound frame (or connection).
    pub fn idle(&self) -> Duration {
        self.last_seen.lock().elapsed()
    }

    /// Frames dropped by [`Self::try_send`].
    pub fn drop_count(&self) -> u64 {
        self.dropped_messages.load(Ordering::Relaxed)
    }

    /// Session age.
    pub fn age(&self) -> Duration {
        self.connected_at.elapsed()
    }
}
