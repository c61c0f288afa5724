//! Process provider backed by `sysinfo`.

use std::sync::Arc;

use async_trait::async_trait;
use nebula_core::process::no_such_process;
use nebula_core::{
    Acknowledgement, CapabilityError, CapabilityResult, ProcessDescriptor, ProcessProvider,
};
use parking_lot::Mutex;
use sysinfo::{Pid, ProcessesToUpdate, Signal, System};
use tracing::info;

/// Lists processes and suspends/resumes them with `SIGSTOP`/`SIGCONT`
/// (or the platform equivalent `sysinfo` maps them to).
///
/// `sysinfo` calls block, so every call runs on the blocking pool.
pub struct SysinfoProcessProvider {
    system: Arc<Mutex<System>>,
}

impl SysinfoProcessProvider {
    /// Create a provider with an empty process table.
    pub fn new() -> Self {
        Self {
            system: Arc::new(Mutex::new(System::new())),
        }
    }

    async fn blocking<T, F>(&self, f: F) -> CapabilityResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut System) -> CapabilityResult<T> + Send + 'static,
    {
        let system = Arc::clone(&self.system);
        tokio::task::spawn_blocking(move || f(&mut system.lock()))
            .await
            .map_err(|e| CapabilityError::internal(format!("process task failed: {e}")))?
    }

    async fn signal(&self, pid: u32, action: SignalAction) -> CapabilityResult<Acknowledgement> {
        if pid == std::process::id() {
            return Err(CapabilityError::invalid_argument(
                "pid",
                format!("Refusing to {} the daemon's own process", action.verb()),
            ));
        }

        self.blocking(move |system| {
            let target = Pid::from_u32(pid);
            let _ = system.refresh_processes(ProcessesToUpdate::Some(&[target]), true);
            let process = system
                .process(target)
                .ok_or_else(|| CapabilityError::not_found(no_such_process(pid)))?;

            match process.kill_with(action.signal()) {
                Some(true) => {
                    info!(pid, action = action.verb(), "process signalled");
                    Ok(Acknowledgement::new(format!(
                        "Program with PID {pid} {}",
                        action.past_tense()
                    )))
                }
                Some(false) => Err(CapabilityError::operation_failed(format!(
                    "Failed to {} program: signal delivery to PID {pid} failed",
                    action.verb()
                ))),
                None => Err(CapabilityError::unsupported(format!(
                    "Cannot {} processes on this platform",
                    action.verb()
                ))),
            }
        })
        .await
    }
}

impl Default for SysinfoProcessProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Copy, Debug)]
enum SignalAction {
    Pause,
    Resume,
}

impl SignalAction {
    fn signal(self) -> Signal {
        match self {
            Self::Pause => Signal::Stop,
            Self::Resume => Signal::Continue,
        }
    }

    fn verb(self) -> &'static str {
        match self {
            Self::Pause => "pause",
            Self::Resume => "resume",
        }
    }

    fn past_tense(self) -> &'static str {
        match self {
            Self::Pause => "paused",
            Self::Resume => "resumed",
        }
    }
}

#[async_trait]
impl ProcessProvider for SysinfoProcessProvider {
    async fn list_processes(&self) -> CapabilityResult<Vec<ProcessDescriptor>> {
        self.blocking(|system| {
            let _ = system.refresh_processes(ProcessesToUpdate::All, true);
            let mut processes: Vec<_> = system
                .processes()
                .iter()
                .map(|(pid, process)| ProcessDescriptor {
                    pid: pid.as_u32(),
                    name: process.name().to_string_lossy().into_owned(),
                })
                .collect();
            processes.sort_by_key(|p| p.pid);
            Ok(processes)
        })
        .await
    }

    async fn suspend(&self, pid: u32) -> CapabilityResult<Acknowledgement> {
        self.signal(pid, SignalAction::Pause).await
    }

    async fn resume(&self, pid: u32) -> CapabilityResult<Acknowledgement> {
        self.signal(pid, SignalAction::Resume).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lists_own_process() {
        let provider = SysinfoProcessProvider::new();
        let processes = provider.list_processes().await.unwrap();
        let own = std::process::id();
        assert!(processes.iter().any(|p| p.pid == own));
        assert!(processes.windows(2).all(|w| w[0].pid <= w[1].pid));
    }

    #[tokio::test]
    async fn refuses_own_pid() {
        let provider = SysinfoProcessProvider::new();
        let err = provider.suspend(std::process::id()).await.unwrap_err();
        assert!(matches!(err, CapabilityError::InvalidArgument { .. }));
    }

    #[tokio::test]
    async fn missing_pid_is_not_found() {
        let provider = SysinfoProcessProvider::new();
        let pid = u32::MAX - 7;
        let err = provider.suspend(pid).await.unwrap_err();
        assert_eq!(err, CapabilityError::not_found(no_such_process(pid)));
        let err = provider.resume(pid).await.unwrap_err();
        assert!(matches!(err, CapabilityError::NotFound { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn pause_then_resume_child() {
        let mut child = std::process::Command::new("sleep").arg("30").spawn().unwrap();
        let pid = child.id();

        let provider = SysinfoProcessProvider::new();
        let paused = provider.suspend(pid).await.unwrap();
        assert_eq!(paused.message, format!("Program with PID {pid} paused"));
        let resumed = provider.resume(pid).await.unwrap();
        assert_eq!(resumed.message, format!("Program with PID {pid} resumed"));

        child.kill().unwrap();
        let _ = child.wait();
    }
}
