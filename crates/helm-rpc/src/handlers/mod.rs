//! RPC method handlers.
//!
//! One module per method family; [`register_all`] wires every handler into a
//! registry in one place.

pub mod agent;
pub mod connect;
pub mod health;
pub mod session;
pub mod status;

use serde_json::Value;

use crate::errors::RpcError;
use crate::registry::MethodRegistry;

/// Register every built-in method.
pub fn register_all(registry: &mut MethodRegistry) {
    registry.register("connect", connect::ConnectHandler);
    registry.register("agent", agent::AgentHandler);
    registry.register("agent.cancel", agent::CancelHandler);
    registry.register("status", status::StatusHandler);
    registry.register("health", health::HealthHandler);
    registry.register("session.list", session::SessionListHandler);
    registry.register("session.get", session::SessionGetHandler);
    registry.register("session.delete", session::SessionDeleteHandler);
}

/// Extract a required string parameter.
pub fn require_string_param(params: Option<&Value>, name: &str) -> Result<String, RpcError> {
    params
        .and_then(|p| p.get(name))
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or_else(|| RpcError::InvalidArgument {
            message: format!("missing or non-string parameter '{name}'"),
        })
}

/// Extract an optional string parameter, rejecting non-string values.
pub fn optional_string_param(
    params: Option<&Value>,
    name: &str,
) -> Result<Option<String>, RpcError> {
    match params.and_then(|p| p.get(name)) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(RpcError::InvalidArgument {
            message: format!("parameter '{name}' must be a string"),
        }),
    }
}
