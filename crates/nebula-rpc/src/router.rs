//! The command router: action name + payload in, response envelope out.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use metrics::{counter, histogram};
use tracing::{debug, info, warn};

use crate::action::Action;
use crate::context::RpcContext;
use crate::errors::{RegistryError, RpcError};
use crate::handlers;
use crate::params::Payload;
use crate::registry::ActionRegistry;
use crate::types::{Command, ErrorKind, ResponseEnvelope, SuccessBody};

/// Requests slower than this are logged at `warn`.
const SLOW_COMMAND_THRESHOLD: Duration = Duration::from_secs(5);

/// Routes commands to their handlers.
///
/// Dispatch never returns an error and never unwinds: every failure,
/// including a panicking provider, becomes an error envelope.
pub struct CommandRouter {
    registry: ActionRegistry,
    ctx: Arc<RpcContext>,
}

impl CommandRouter {
    /// Build a router, failing if any action lacks a handler.
    pub fn new(registry: ActionRegistry, ctx: RpcContext) -> Result<Self, RegistryError> {
        registry.validate()?;
        Ok(Self {
            registry,
            ctx: Arc::new(ctx),
        })
    }

    /// Router with the built-in handler for every action.
    pub fn with_default_handlers(ctx: RpcContext) -> Result<Self, RegistryError> {
        let mut registry = ActionRegistry::new();
        handlers::register_all(&mut registry);
        Self::new(registry, ctx)
    }

    /// Shared handler context.
    pub fn context(&self) -> &RpcContext {
        &self.ctx
    }

    /// Decode a text frame and dispatch it.
    pub async fn dispatch_text(&self, text: &str) -> ResponseEnvelope {
        self.dispatch_frame(text).await.1
    }

    /// Like [`Self::dispatch_text`], also returning the action that ran if
    /// the frame named a known one.
    pub async fn dispatch_frame(&self, text: &str) -> (Option<Action>, ResponseEnvelope) {
        match Command::decode(text) {
            Ok(command) => {
                let envelope = self.dispatch(&command.action, &command.payload).await;
                (Action::parse(&command.action), envelope)
            }
            Err(err) => {
                counter!("nebula_command_errors_total", "action" => "invalid", "error_kind" => err.kind().as_str())
                    .increment(1);
                debug!(error = %err, "undecodable message");
                (None, err.into())
            }
        }
    }

    /// Dispatch one command.
    pub async fn dispatch(&self, action_name: &str, payload: &Payload) -> ResponseEnvelope {
        let Some(action) = Action::parse(action_name) else {
            counter!("nebula_commands_total", "action" => "unknown").increment(1);
            counter!("nebula_command_errors_total", "action" => "unknown", "error_kind" => "UnknownAction")
                .increment(1);
            warn!(action = action_name, "unknown action received");
            return RpcError::UnknownAction {
                action: action_name.to_owned(),
            }
            .into();
        };
        counter!("nebula_commands_total", "action" => action.as_str()).increment(1);

        let start = Instant::now();
        let result = self.run_handler(action, payload).await;
        let duration = start.elapsed();

        histogram!("nebula_command_duration_seconds", "action" => action.as_str())
            .record(duration.as_secs_f64());
        if duration >= SLOW_COMMAND_THRESHOLD {
            warn!(%action, duration_secs = duration.as_secs_f64(), "slow command");
        }

        match result {
            Ok(body) => {
                if action.is_mutation() {
                    info!(%action, outcome = "success", "command executed");
                } else {
                    debug!(%action, "command executed");
                }
                body.into()
            }
            Err(err) => {
                let kind = err.kind();
                counter!("nebula_command_errors_total", "action" => action.as_str(), "error_kind" => kind.as_str())
                    .increment(1);
                if action.is_mutation() || kind == ErrorKind::InternalError {
                    warn!(%action, error_kind = kind.as_str(), error = %err, "command failed");
                } else {
                    debug!(%action, error_kind = kind.as_str(), error = %err, "command failed");
                }
                err.into()
            }
        }
    }

    /// Run a read-only listing on behalf of the server itself, e.g. to
    /// broadcast fresh state after a mutation.
    ///
    /// Recorded under `nebula_state_refreshes_total` only, so client command
    /// counters and latencies stay untouched.
    pub async fn refresh(&self, action: Action) -> ResponseEnvelope {
        if action.is_mutation() {
            return RpcError::Internal {
                message: format!("{action} is not a listing"),
            }
            .into();
        }
        counter!("nebula_state_refreshes_total", "action" => action.as_str()).increment(1);
        match self.run_handler(action, &Payload::default()).await {
            Ok(body) => body.into(),
            Err(err) => {
                warn!(%action, error = %err, "state refresh failed");
                err.into()
            }
        }
    }

    async fn run_handler(
        &self,
        action: Action,
        payload: &Payload,
    ) -> Result<SuccessBody, RpcError> {
        let Some(handler) = self.registry.get(action) else {
            return Err(RpcError::Internal {
                message: format!("no handler for {action}"),
            });
        };
        match AssertUnwindSafe(handler.handle(payload, &self.ctx))
            .catch_unwind()
            .await
        {
            Ok(result) => result,
            Err(panic) => Err(RpcError::Internal {
                message: format!("{action} handler panicked: {}", panic_message(panic.as_ref())),
            }),
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_owned()
    }
}
