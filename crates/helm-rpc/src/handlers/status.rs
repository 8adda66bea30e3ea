//! `status` — active run ids and session count.
//!
//! Reads controller state exclusively through its query operations.

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::context::RpcContext;
use crate::errors::RpcError;
use crate::registry::MethodHandler;

/// Status snapshot handler.
pub struct StatusHandler;

#[async_trait]
impl MethodHandler for StatusHandler {
    async fn handle(&self, _params: Option<Value>, ctx: &RpcContext) -> Result<Value, RpcError> {
        let session_count = ctx.sessions.session_count().map_err(|e| RpcError::Internal {
            message: format!("failed to count sessions: {e}"),
        })?;
        Ok(json!({
            "activeRunIds": ctx.controller.active_run_ids(),
            "activeRunCount": ctx.controller.active_run_count(),
            "sessionCount": session_count,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_helpers::make_test_context;

    #[tokio::test]
    async fn status_on_idle_controller() {
        let (ctx, _dir) = make_test_context();
        let payload = StatusHandler.handle(None, &ctx).await.unwrap();
        assert_eq!(payload["activeRunCount"], 0);
        assert_eq!(payload["sessionCount"], 0);
        assert!(payload["activeRunIds"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn status_counts_sessions() {
        let (ctx, _dir) = make_test_context();
        let _ = ctx.sessions.get_or_create("a").unwrap();
        let _ = ctx.sessions.get_or_create("b").unwrap();
        let payload = StatusHandler.handle(None, &ctx).await.unwrap();
        assert_eq!(payload["sessionCount"], 2);
    }
}
