//! Graceful shutdown coordination via `CancellationToken` and `TaskTracker`.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tokio_util::task::task_tracker::TrackedFuture;
use tracing::{info, warn};

/// Coordinates graceful shutdown across all server tasks.
pub struct ShutdownCoordinator {
    token: CancellationToken,
    tracker: TaskTracker,
}

impl ShutdownCoordinator {
    /// Create a new shutdown coordinator.
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
            tracker: TaskTracker::new(),
        }
    }

    /// Get a clone of the cancellation token.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Initiate shutdown.
    pub fn shutdown(&self) {
        self.token.cancel();
    }

    /// Whether a shutdown has been initiated.
    pub fn is_shutting_down(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Track `fut` so [`Self::graceful_shutdown`] waits for it.
    pub fn track<F: Future>(&self, fut: F) -> TrackedFuture<F> {
        self.tracker.track_future(fut)
    }

    /// Number of tracked tasks still running.
    pub fn tracked(&self) -> usize {
        self.tracker.len()
    }

    /// Cancel the token and wait up to `grace` for tracked tasks.
    ///
    /// Returns `true` if every tracked task finished in time. Tasks still
    /// running after the grace period are left alone, never aborted.
    pub async fn graceful_shutdown(&self, grace: Duration) -> bool {
        self.shutdown();
        let _ = self.tracker.close();
        info!(
            task_count = self.tracker.len(),
            grace_secs = grace.as_secs_f64(),
            "waiting for tasks to complete"
        );

        if tokio::time::timeout(grace, self.tracker.wait()).await.is_ok() {
            true
        } else {
            warn!(
                remaining = self.tracker.len(),
                "shutdown timed out after {grace:?}, some tasks may still be running"
            );
            false
        }
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}
