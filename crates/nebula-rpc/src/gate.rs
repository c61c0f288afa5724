//! Per-capability admission control.

use std::future::Future;

use nebula_core::Concurrency;
use tokio::sync::Mutex;

/// Serializes calls into a provider that is not reentrant-safe.
///
/// Reentrant providers pass straight through.
#[derive(Debug)]
pub struct CapabilityGate {
    name: &'static str,
    lock: Option<Mutex<()>>,
}

impl CapabilityGate {
    /// Gate for a provider reporting `concurrency`.
    pub fn new(name: &'static str, concurrency: Concurrency) -> Self {
        let lock = match concurrency {
            Concurrency::Reentrant => None,
            Concurrency::Serialized => Some(Mutex::new(())),
        };
        Self { name, lock }
    }

    /// Capability name, for diagnostics.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether calls through this gate are serialized.
    pub fn is_serialized(&self) -> bool {
        self.lock.is_some()
    }

    /// Run `call`, waiting for earlier calls first if serialized.
    pub async fn run<F: Future>(&self, call: F) -> F::Output {
        match &self.lock {
            Some(lock) => {
                let _guard = lock.lock().await;
                call.await
            }
            None => call.await,
        }
    }
}

/// Admits at most one operation at a time and rejects the rest immediately.
#[derive(Debug, Default)]
pub struct ExclusiveGate {
    lock: Mutex<()>,
}

impl ExclusiveGate {
    /// An idle gate.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether an operation currently holds the gate.
    pub fn is_busy(&self) -> bool {
        self.lock.try_lock().is_err()
    }

    /// Run `op` if the gate is idle; `None` if another operation holds it.
    pub async fn try_run<F: Future>(&self, op: F) -> Option<F::Output> {
        let _guard = self.lock.try_lock().ok()?;
        Some(op.await)
    }
}
