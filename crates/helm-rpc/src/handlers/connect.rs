//! `connect` — handshake after transport-level auth.
//!
//! Transport authentication already happened at WebSocket upgrade, so this
//! is a no-op acknowledgement. An optional `sessionId` parameter scopes the
//! connection's event subscription; the gateway binds the filter when it
//! sees a successful `connect` response.

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::context::RpcContext;
use crate::errors::RpcError;
use crate::handlers::optional_string_param;
use crate::registry::MethodHandler;

/// Protocol identifier echoed to clients.
pub const PROTOCOL: &str = "helm/1";

/// Handshake handler.
pub struct ConnectHandler;

#[async_trait]
impl MethodHandler for ConnectHandler {
    async fn handle(&self, params: Option<Value>, _ctx: &RpcContext) -> Result<Value, RpcError> {
        let filter = optional_string_param(params.as_ref(), "sessionId")?;
        let mut payload = json!({ "protocol": PROTOCOL });
        if let Some(session_id) = filter {
            payload["sessionId"] = json!(session_id);
        }
        Ok(payload)
    }
}
