//! Display handlers: enumeration, mode changes and the dummy display.

use async_trait::async_trait;
use nebula_core::DisplayModeChange;
use tracing::instrument;

use crate::context::RpcContext;
use crate::errors::RpcError;
use crate::params::{DIMENSION_RANGE, DISPLAY_ID_RANGE, Payload, RATE_RANGE};
use crate::registry::ActionHandler;
use crate::types::SuccessBody;

/// Lists displays as `{"action": "display_info", "displays": [...]}`.
pub struct GetDisplayInfoHandler;

#[async_trait]
impl ActionHandler for GetDisplayInfoHandler {
    #[instrument(skip_all, fields(action = "get_display_info"))]
    async fn handle(&self, _payload: &Payload, ctx: &RpcContext) -> Result<SuccessBody, RpcError> {
        let displays = ctx
            .display_gate
            .run(ctx.providers.display.list_displays())
            .await?;
        SuccessBody::listing("display_info", "displays", &displays)
    }
}

/// Sets `width`x`height` on `display_id`.
pub struct SetResolutionHandler;

#[async_trait]
impl ActionHandler for SetResolutionHandler {
    #[instrument(skip_all, fields(action = "set_resolution"))]
    async fn handle(&self, payload: &Payload, ctx: &RpcContext) -> Result<SuccessBody, RpcError> {
        let display_id = payload.require_u32("display_id", DISPLAY_ID_RANGE)?;
        let width = payload.require_u32("width", DIMENSION_RANGE)?;
        let height = payload.require_u32("height", DIMENSION_RANGE)?;
        let change = DisplayModeChange::Resolution { width, height };
        let ack = ctx
            .display_gate
            .run(ctx.providers.display.set_mode(display_id, change))
            .await?;
        Ok(SuccessBody::status(ack.message))
    }
}

/// Sets the refresh `rate` on `display_id`.
pub struct SetRefreshRateHandler;

#[async_trait]
impl ActionHandler for SetRefreshRateHandler {
    #[instrument(skip_all, fields(action = "set_refresh_rate"))]
    async fn handle(&self, payload: &Payload, ctx: &RpcContext) -> Result<SuccessBody, RpcError> {
        let display_id = payload.require_u32("display_id", DISPLAY_ID_RANGE)?;
        let rate = payload.require_u32("rate", RATE_RANGE)?;
        let ack = ctx
            .display_gate
            .run(
                ctx.providers
                    .display
                    .set_mode(display_id, DisplayModeChange::RefreshRate { rate }),
            )
            .await?;
        Ok(SuccessBody::status(ack.message))
    }
}

/// Toggles the virtual dummy display on (`true`) or off.
pub struct DummyDisplayHandler(pub bool);

#[async_trait]
impl ActionHandler for DummyDisplayHandler {
    #[instrument(skip_all, fields(enabled = self.0))]
    async fn handle(&self, _payload: &Payload, ctx: &RpcContext) -> Result<SuccessBody, RpcError> {
        let ack = ctx
            .display_gate
            .run(ctx.providers.display.set_dummy_display(self.0))
            .await?;
        Ok(SuccessBody::status(ack.message))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::ErrorKind;
    use crate::handlers::test_helpers::{make_test_context, payload};

    async fn displays(ctx: &RpcContext) -> serde_json::Value {
        let body = GetDisplayInfoHandler
            .handle(&Payload::default(), ctx)
            .await
            .unwrap();
        serde_json::to_value(&body).unwrap()["displays"].clone()
    }

    #[tokio::test]
    async fn lists_displays_with_resolution() {
        let ctx = make_test_context();
        let body = GetDisplayInfoHandler
            .handle(&Payload::default(), &ctx)
            .await
            .unwrap();
        assert_eq!(body.action_tag(), Some("display_info"));
        let list = displays(&ctx).await;
        assert_eq!(list.as_array().unwrap().len(), 2);
        assert_eq!(list[0]["id"], 0);
        assert_eq!(list[0]["resolution"], "1920x1080");
        assert_eq!(list[1]["refresh_rate"], 144);
    }

    #[tokio::test]
    async fn set_resolution_applies() {
        let ctx = make_test_context();
        let body = SetResolutionHandler
            .handle(
                &payload(json!({"display_id": 0, "width": 1280, "height": 720})),
                &ctx,
            )
            .await
            .unwrap();
        assert_eq!(body.get("message"), Some(&json!("Resolution set to 1280x720")));
        assert_eq!(displays(&ctx).await[0]["resolution"], "1280x720");
    }

    #[tokio::test]
    async fn set_resolution_missing_height() {
        let ctx = make_test_context();
        let err = SetResolutionHandler
            .handle(&payload(json!({"display_id": 0, "width": 1280})), &ctx)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(err.to_string(), "Missing required field 'height'");
    }

    #[tokio::test]
    async fn set_resolution_rejects_zero_width() {
        let ctx = make_test_context();
        let err = SetResolutionHandler
            .handle(
                &payload(json!({"display_id": 0, "width": 0, "height": 720})),
                &ctx,
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert!(err.to_string().contains("width"));
    }

    #[tokio::test]
    async fn unknown_display_is_not_found() {
        let ctx = make_test_context();
        let err = SetRefreshRateHandler
            .handle(&payload(json!({"display_id": 42, "rate": 60})), &ctx)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.to_string(), "Invalid display ID: 42");
    }

    #[tokio::test]
    async fn set_refresh_rate_applies() {
        let ctx = make_test_context();
        let body = SetRefreshRateHandler
            .handle(&payload(json!({"display_id": 1, "rate": 120})), &ctx)
            .await
            .unwrap();
        assert_eq!(body.get("message"), Some(&json!("Refresh rate set to 120Hz")));
        assert_eq!(displays(&ctx).await[1]["refresh_rate"], 120);
    }

    #[tokio::test]
    async fn unsupported_rate_leaves_state() {
        let ctx = make_test_context();
        let err = SetRefreshRateHandler
            .handle(&payload(json!({"display_id": 0, "rate": 144})), &ctx)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(displays(&ctx).await[0]["refresh_rate"], 60);
    }

    #[tokio::test]
    async fn dummy_display_toggles() {
        let ctx = make_test_context();
        let on = DummyDisplayHandler(true)
            .handle(&Payload::default(), &ctx)
            .await
            .unwrap();
        assert_eq!(
            on.get("message"),
            Some(&json!("Dummy display enabled (placeholder)"))
        );
        let off = DummyDisplayHandler(false)
            .handle(&Payload::default(), &ctx)
            .await
            .unwrap();
        assert_eq!(
            off.get("message"),
            Some(&json!("Dummy display disabled (placeholder)"))
        );
    }
}
