//! The set of live sessions.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::ws::Utf8Bytes;
use metrics::counter;
use nebula_rpc::ResponseEnvelope;
use parking_lot::RwLock;
use tracing::{debug, warn};

use super::session::Session;
use crate::metrics::WS_BROADCAST_DROPS_TOTAL;

/// Outcome of one [`SessionManager::broadcast`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Sessions registered when the broadcast started.
    pub recipients: usize,
    /// Sessions the message was queued for.
    pub delivered: usize,
    /// Sessions whose queue was full or closed.
    pub dropped: usize,
}

/// Tracks connected sessions and routes outbound messages to them.
///
/// The set is only reachable through register, unregister, send and
/// broadcast; the lock is never held across an await.
pub struct SessionManager {
    sessions: RwLock<HashMap<String, Arc<Session>>>,
}

impl SessionManager {
    /// Create an empty manager.
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Add a session. Returns `false` (and leaves the set unchanged) if a
    /// session with the same id is already registered.
    pub fn register(&self, session: Arc<Session>) -> bool {
        let mut sessions = self.sessions.write();
        if sessions.contains_key(session.id()) {
            warn!(session_id = session.id(), "session already registered");
            return false;
        }
        let _ = sessions.insert(session.id().to_owned(), session);
        true
    }

    /// Remove a session. Unknown ids are a no-op.
    pub fn unregister(&self, session_id: &str) -> Option<Arc<Session>> {
        self.sessions.write().remove(session_id)
    }

    /// Send `envelope` to one session, waiting for queue capacity.
    ///
    /// Returns `false` if the session is not registered or no longer
    /// accepting messages.
    pub async fn send(&self, session_id: &str, envelope: &ResponseEnvelope) -> bool {
        let session = self.sessions.read().get(session_id).cloned();
        match session {
            Some(session) => session.send(Utf8Bytes::from(envelope.to_text())).await,
            None => false,
        }
    }

    /// Best-effort delivery of `envelope` to every session registered at the
    /// moment of the call.
    ///
    /// Never waits on a slow session: a full or closed queue counts as a
    /// drop and delivery continues with the rest.
    pub fn broadcast(&self, envelope: &ResponseEnvelope) -> BroadcastReport {
        let frame = Utf8Bytes::from(envelope.to_text());
        let recipients: Vec<Arc<Session>> = self.sessions.read().values().cloned().collect();

        let mut report = BroadcastReport {
            recipients: recipients.len(),
            ..BroadcastReport::default()
        };
        for session in &recipients {
            if session.try_send(frame.clone()) {
                report.delivered += 1;
            } else {
                report.dropped += 1;
                debug!(session_id = session.id(), "broadcast dropped for session");
            }
        }

        if report.dropped > 0 {
            counter!(WS_BROADCAST_DROPS_TOTAL).increment(report.dropped as u64);
            warn!(
                recipients = report.recipients,
                dropped = report.dropped,
                "broadcast not delivered to every session"
            );
        }
        debug!(recipients = report.recipients, delivered = report.delivered, "broadcast");
        report
    }

    /// Whether `session_id` is registered.
    pub fn contains(&self, session_id: &str) -> bool {
        self.sessions.read().contains_key(session_id)
    }

    /// Number of registered sessions.
    pub fn count(&self) -> usize {
        self.sessions.read().len()
    }

    /// Ids of the registered sessions, in no particular order.
    pub fn ids(&self) -> Vec<String> {
        self.sessions.read().keys().cloned().collect()
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}
