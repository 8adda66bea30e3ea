//! `agent` — start (or continue) a run and return its terminal summary.
//!
//! The handler blocks until the run reaches a terminal state; intermediate
//! progress streams to subscribers as events. Runs that fail mid-loop are
//! still a *successful* RPC — the terminal Run record carries the error —
//! while precondition failures (empty message, busy session) map to error
//! responses.

use async_trait::async_trait;
use serde_json::Value;
use tracing::instrument;

use helm_runtime::RunError;

use crate::context::RpcContext;
use crate::errors::RpcError;
use crate::handlers::{optional_string_param, require_string_param};
use crate::registry::MethodHandler;

/// Run submission handler.
pub struct AgentHandler;

#[async_trait]
impl MethodHandler for AgentHandler {
    #[instrument(skip_all)]
    async fn handle(&self, params: Option<Value>, ctx: &RpcContext) -> Result<Value, RpcError> {
        let session_id = require_string_param(params.as_ref(), "sessionId")?;
        let message = require_string_param(params.as_ref(), "message")?;
        let run_id = optional_string_param(params.as_ref(), "runId")?;

        let run = ctx
            .controller
            .start(&session_id, &message, run_id)
            .await
            .map_err(|e| match e {
                RunError::InvalidArgument(message) => RpcError::InvalidArgument { message },
                other => RpcError::Custom {
                    code: other.code().to_owned(),
                    message: other.to_string(),
                },
            })?;

        serde_json::to_value(&run).map_err(|e| RpcError::Internal {
            message: format!("failed to serialize run: {e}"),
        })
    }
}

/// Run cancellation handler.
///
/// Returns `cancelled: true` iff the run was active and this request
/// initiated its transition to `cancelled`.
pub struct CancelHandler;

#[async_trait]
impl MethodHandler for CancelHandler {
    async fn handle(&self, params: Option<Value>, ctx: &RpcContext) -> Result<Value, RpcError> {
        let run_id = require_string_param(params.as_ref(), "runId")?;
        let cancelled = ctx.controller.cancel(&run_id);
        Ok(serde_json::json!({ "runId": run_id, "cancelled": cancelled }))
    }
}
