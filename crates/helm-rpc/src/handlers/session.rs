//! Session administration: `session.list`, `session.get`, `session.delete`.

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::context::RpcContext;
use crate::errors::RpcError;
use crate::handlers::require_string_param;
use crate::registry::MethodHandler;

/// List sessions ordered by last update, newest first.
pub struct SessionListHandler;

#[async_trait]
impl MethodHandler for SessionListHandler {
    async fn handle(&self, _params: Option<Value>, ctx: &RpcContext) -> Result<Value, RpcError> {
        let sessions = ctx.sessions.list().map_err(|e| RpcError::Internal {
            message: format!("failed to list sessions: {e}"),
        })?;
        let summaries: Vec<Value> = sessions
            .iter()
            .map(|s| {
                json!({
                    "id": s.id,
                    "createdAt": s.created_at,
                    "updatedAt": s.updated_at,
                    "messageCount": s.len(),
                })
            })
            .collect();
        Ok(json!({ "sessions": summaries }))
    }
}

/// Fetch one session's full transcript.
pub struct SessionGetHandler;

#[async_trait]
impl MethodHandler for SessionGetHandler {
    async fn handle(&self, params: Option<Value>, ctx: &RpcContext) -> Result<Value, RpcError> {
        let session_id = require_string_param(params.as_ref(), "sessionId")?;
        let sessions = ctx.sessions.list().map_err(|e| RpcError::Internal {
            message: format!("failed to read sessions: {e}"),
        })?;
        let session = sessions
            .into_iter()
            .find(|s| s.id == session_id)
            .ok_or_else(|| RpcError::NotFound {
                message: format!("session '{session_id}' not found"),
            })?;
        serde_json::to_value(&session).map_err(|e| RpcError::Internal {
            message: format!("failed to serialize session: {e}"),
        })
    }
}

/// Delete a session (explicit administrative operation).
pub struct SessionDeleteHandler;

#[async_trait]
impl MethodHandler for SessionDeleteHandler {
    async fn handle(&self, params: Option<Value>, ctx: &RpcContext) -> Result<Value, RpcError> {
        let session_id = require_string_param(params.as_ref(), "sessionId")?;
        ctx.sessions.delete(&session_id).map_err(|e| RpcError::Internal {
            message: format!("failed to delete session: {e}"),
        })?;
        Ok(json!({ "sessionId": session_id, "deleted": true }))
    }
}
