//! System handlers: ping.

use async_trait::async_trait;
use tracing::instrument;

use crate::context::RpcContext;
use crate::errors::RpcError;
use crate::params::Payload;
use crate::registry::ActionHandler;
use crate::types::SuccessBody;

/// Replies `{"action": "pong"}`.
pub struct PingHandler;

#[async_trait]
impl ActionHandler for PingHandler {
    #[instrument(skip_all, fields(action = "ping"))]
    async fn handle(&self, _payload: &Payload, _ctx: &RpcContext) -> Result<SuccessBody, RpcError> {
        Ok(SuccessBody::pong())
    }
}
