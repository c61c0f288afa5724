//! Program handlers: listing, pause and resume.

use async_trait::async_trait;
use tracing::instrument;

use crate::context::RpcContext;
use crate::errors::RpcError;
use crate::params::{PID_RANGE, Payload};
use crate::registry::ActionHandler;
use crate::types::SuccessBody;

/// Lists processes as `{"action": "running_programs", "programs": [...]}`.
pub struct GetRunningProgramsHandler;

#[async_trait]
impl ActionHandler for GetRunningProgramsHandler {
    #[instrument(skip_all, fields(action = "get_running_programs"))]
    async fn handle(&self, _payload: &Payload, ctx: &RpcContext) -> Result<SuccessBody, RpcError> {
        let programs = ctx
            .process_gate
            .run(ctx.providers.process.list_processes())
            .await?;
        SuccessBody::listing("running_programs", "programs", &programs)
    }
}

/// Suspends `pid`.
pub struct PauseProgramHandler;

#[async_trait]
impl ActionHandler for PauseProgramHandler {
    #[instrument(skip_all, fields(action = "pause_program", pid))]
    async fn handle(&self, payload: &Payload, ctx: &RpcContext) -> Result<SuccessBody, RpcError> {
        let pid = payload.require_u32("pid", PID_RANGE)?;
        let _ = tracing::Span::current().record("pid", pid);
        let ack = ctx
            .process_gate
            .run(ctx.providers.process.suspend(pid))
            .await?;
        Ok(SuccessBody::status(ack.message))
    }
}

/// Resumes `pid`.
pub struct ResumeProgramHandler;

#[async_trait]
impl ActionHandler for ResumeProgramHandler {
    #[instrument(skip_all, fields(action = "resume_program", pid))]
    async fn handle(&self, payload: &Payload, ctx: &RpcContext) -> Result<SuccessBody, RpcError> {
        let pid = payload.require_u32("pid", PID_RANGE)?;
        let _ = tracing::Span::current().record("pid", pid);
        let ack = ctx
            .process_gate
            .run(ctx.providers.process.resume(pid))
            .await?;
        Ok(SuccessBody::status(ack.message))
    }
}
