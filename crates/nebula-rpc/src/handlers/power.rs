//! Power handlers: plans and state transitions.

use async_trait::async_trait;
use nebula_core::PowerState;
use tracing::instrument;

use crate::context::RpcContext;
use crate::errors::RpcError;
use crate::params::{MAX_GUID_LENGTH, Payload};
use crate::registry::ActionHandler;
use crate::types::SuccessBody;

/// Lists power plans as `{"action": "power_plans", "plans": [...]}`.
pub struct GetPowerPlansHandler;

#[async_trait]
impl ActionHandler for GetPowerPlansHandler {
    #[instrument(skip_all, fields(action = "get_power_plans"))]
    async fn handle(&self, _payload: &Payload, ctx: &RpcContext) -> Result<SuccessBody, RpcError> {
        let plans = ctx.power_gate.run(ctx.providers.power.list_plans()).await?;
        SuccessBody::listing("power_plans", "plans", &plans)
    }
}

/// Activates the plan named by `guid`.
pub struct SetPowerPlanHandler;

#[async_trait]
impl ActionHandler for SetPowerPlanHandler {
    #[instrument(skip_all, fields(action = "set_power_plan"))]
    async fn handle(&self, payload: &Payload, ctx: &RpcContext) -> Result<SuccessBody, RpcError> {
        let guid = payload.require_str("guid", MAX_GUID_LENGTH)?;
        let ack = ctx.power_gate.run(ctx.providers.power.set_plan(guid)).await?;
        Ok(SuccessBody::status(ack.message))
    }
}

/// Performs one disruptive power transition.
///
/// Only one transition may be in flight; a concurrent request is rejected
/// rather than queued.
pub struct TransitionHandler(pub PowerState);

#[async_trait]
impl ActionHandler for TransitionHandler {
    #[instrument(skip_all, fields(state = %self.0))]
    async fn handle(&self, _payload: &Payload, ctx: &RpcContext) -> Result<SuccessBody, RpcError> {
        let ack = ctx
            .transition_gate
            .try_run(ctx.power_gate.run(ctx.providers.power.transition(self.0)))
            .await
            .ok_or_else(|| RpcError::OperationFailed {
                message: "a power transition is already in progress".into(),
            })??;
        Ok(SuccessBody::status(ack.message))
    }
}
