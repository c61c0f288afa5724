//! Subprocess execution for OS-backed providers.
//!
//! Commands are always an explicit program plus argument vector; nothing is
//! passed through a shell.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use nebula_core::{CapabilityError, CapabilityResult};
use tracing::{debug, warn};

/// Captured result of one finished command.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Standard output, lossily decoded.
    pub stdout: String,
    /// Standard error, lossily decoded.
    pub stderr: String,
    /// Exit code, `None` when killed by a signal.
    pub exit_code: Option<i32>,
}

impl CommandOutput {
    /// Build a successful output with the given stdout.
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
            exit_code: Some(0),
        }
    }

    /// Build a failed output with the given exit code and stderr.
    pub fn failed(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            stderr: stderr.into(),
            exit_code: Some(exit_code),
        }
    }

    /// Whether the command exited with status 0.
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Turn a non-zero exit into `OperationFailed`, prefixed with `context`.
    pub fn check(self, context: &str) -> CapabilityResult<Self> {
        if self.success() {
            return Ok(self);
        }
        let detail = match self.stderr.trim() {
            "" => match self.exit_code {
                Some(code) => format!("exit code {code}"),
                None => "terminated by signal".to_string(),
            },
            stderr => stderr.to_string(),
        };
        Err(CapabilityError::operation_failed(format!(
            "{context}: {detail}"
        )))
    }
}

/// Runs one external program to completion.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `program` with `args` and capture its output.
    ///
    /// A missing binary is `Unsupported`; exceeding the runner's bounded wait
    /// is `OperationFailed`. A non-zero exit is returned as output, not error.
    async fn run(&self, program: &str, args: &[&str]) -> CapabilityResult<CommandOutput>;
}

/// [`CommandRunner`] backed by `tokio::process::Command`.
#[derive(Clone, Debug)]
pub struct TokioCommandRunner {
    timeout: Duration,
}

impl TokioCommandRunner {
    /// Create a runner that kills commands running longer than `timeout`.
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Configured bounded wait.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Default for TokioCommandRunner {
    fn default() -> Self {
        Self::new(Duration::from_secs(15))
    }
}

#[async_trait]
impl CommandRunner for TokioCommandRunner {
    async fn run(&self, program: &str, args: &[&str]) -> CapabilityResult<CommandOutput> {
        let start = Instant::now();

        let mut cmd = tokio::process::Command::new(program);
        let _ = cmd
            .args(args)
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .kill_on_drop(true);

        debug!(program, ?args, "spawning command");

        let child = cmd.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                CapabilityError::unsupported(format!("`{program}` is not available on this system"))
            } else {
                CapabilityError::operation_failed(format!("Failed to run `{program}`: {e}"))
            }
        })?;

        // Dropping the wait future drops the child, which kills it.
        let output = tokio::select! {
            result = child.wait_with_output() => {
                result.map_err(|e| {
                    CapabilityError::operation_failed(format!("Failed to wait for `{program}`: {e}"))
                })?
            }
            () = tokio::time::sleep(self.timeout) => {
                warn!(program, timeout = ?self.timeout, "command timed out");
                return Err(CapabilityError::operation_failed(format!(
                    "`{program}` timed out after {:?}",
                    self.timeout
                )));
            }
        };

        let duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
        let exit_code = output.status.code();
        debug!(program, ?exit_code, duration_ms, "command completed");

        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code,
        })
    }
}

/// Scripted runner for provider tests.
#[cfg(test)]
pub(crate) mod testing {
    use std::collections::VecDeque;

    use parking_lot::Mutex;

    use super::*;

    /// Replays queued results in order and records every invocation.
    #[derive(Default)]
    pub(crate) struct ScriptedRunner {
        replies: Mutex<VecDeque<CapabilityResult<CommandOutput>>>,
        calls: Mutex<Vec<Vec<String>>>,
    }

    impl ScriptedRunner {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        pub(crate) fn reply(self, result: CapabilityResult<CommandOutput>) -> Self {
            self.replies.lock().push_back(result);
            self
        }

        pub(crate) fn reply_ok(self, stdout: &str) -> Self {
            self.reply(Ok(CommandOutput::ok(stdout)))
        }

        pub(crate) fn calls(&self) -> Vec<Vec<String>> {
            self.calls.lock().clone()
        }
    }

    #[async_trait]
    impl CommandRunner for ScriptedRunner {
        async fn run(&self, program: &str, args: &[&str]) -> CapabilityResult<CommandOutput> {
            let mut call = vec![program.to_string()];
            call.extend(args.iter().map(|a| (*a).to_string()));
            self.calls.lock().push(call);
            self.replies
                .lock()
                .pop_front()
                .unwrap_or_else(|| Ok(CommandOutput::ok("")))
        }
    }
}
