//! `health` — liveness snapshot.

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::context::RpcContext;
use crate::errors::RpcError;
use crate::registry::MethodHandler;

/// Liveness handler.
pub struct HealthHandler;

#[async_trait]
impl MethodHandler for HealthHandler {
    async fn handle(&self, _params: Option<Value>, ctx: &RpcContext) -> Result<Value, RpcError> {
        Ok(json!({
            "status": "ok",
            "ready": true,
            "uptimeSecs": ctx.start_time.elapsed().as_secs(),
            "connections": ctx.connection_count(),
            "activeRuns": ctx.controller.active_run_count(),
        }))
    }
}
