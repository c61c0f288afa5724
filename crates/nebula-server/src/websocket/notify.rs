//! State-change broadcasts.
//!
//! After a display or power-plan mutation succeeds, the affected listing is
//! re-read and pushed to every session. The re-read is a separate
//! server-originated [`CommandRouter::refresh`], never part of the mutating
//! command and never counted as a client command.

use nebula_rpc::{Action, CommandRouter};
use tracing::{debug, warn};

use super::manager::{BroadcastReport, SessionManager};

/// Broadcast fresh state after `action`, if it changes any.
///
/// Returns `None` when `action` has no listing to refresh or the re-read
/// failed.
pub async fn broadcast_state_change(
    router: &CommandRouter,
    sessions: &SessionManager,
    action: Action,
) -> Option<BroadcastReport> {
    let refresh = action.state_refresh()?;
    let envelope = router.refresh(refresh).await;
    if !envelope.is_success() {
        warn!(%action, %refresh, ?envelope, "state refresh failed, nothing broadcast");
        return None;
    }
    let report = sessions.broadcast(&envelope);
    debug!(%action, %refresh, delivered = report.delivered, "state change broadcast");
    Some(report)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::extract::ws::Utf8Bytes;
    use nebula_rpc::RpcContext;
    use tokio::sync::mpsc;

    use super::*;
    use crate::websocket::session::Session;

    fn router() -> CommandRouter {
        CommandRouter::with_default_handlers(RpcContext::new(
            nebula_platform::simulated_providers(),
        ))
        .unwrap()
    }

    fn manager_with(ids: &[&str]) -> (SessionManager, Vec<mpsc::Receiver<Utf8Bytes>>) {
        let mgr = SessionManager::new();
        let mut receivers = Vec::new();
        for id in ids {
            let (tx, rx) = mpsc::channel(8);
            let _ = mgr.register(Arc::new(Session::new((*id).into(), tx)));
            receivers.push(rx);
        }
        (mgr, receivers)
    }

    #[tokio::test]
    async fn display_change_broadcasts_display_info() {
        let router = router();
        let (mgr, mut receivers) = manager_with(&["a", "b"]);

        let report = broadcast_state_change(&router, &mgr, Action::SetResolution)
            .await
            .unwrap();
        assert_eq!(report.delivered, 2);

        for rx in &mut receivers {
            let frame = rx.recv().await.unwrap();
            let value: serde_json::Value = serde_json::from_str(frame.as_str()).unwrap();
            assert_eq!(value["status"], "success");
            assert_eq!(value["action"], "display_info");
            assert!(value["displays"].is_array());
        }
    }

    #[tokio::test]
    async fn plan_change_broadcasts_power_plans() {
        let router = router();
        let (mgr, mut receivers) = manager_with(&["a"]);

        let _ = broadcast_state_change(&router, &mgr, Action::SetPowerPlan)
            .await
            .unwrap();
        let frame = receivers[0].recv().await.unwrap();
        let value: serde_json::Value = serde_json::from_str(frame.as_str()).unwrap();
        assert_eq!(value["action"], "power_plans");
    }

    #[tokio::test]
    async fn non_state_actions_broadcast_nothing() {
        let router = router();
        let (mgr, mut receivers) = manager_with(&["a"]);

        for action in [Action::Ping, Action::PauseProgram, Action::Shutdown] {
            assert!(broadcast_state_change(&router, &mgr, action).await.is_none());
        }
        assert!(receivers[0].try_recv().is_err());
    }
}
