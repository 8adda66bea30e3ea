//! Wire-format frame types.
//!
//! Every WebSocket text frame is one JSON object tagged by `type`:
//!
//! - `{"type": "req", "id": ..., "method": ..., "params": ...}`
//! - `{"type": "res", "id": ..., "ok": ..., "payload"?: ..., "error"?: ...}`
//! - `{"type": "event", "event": ..., "payload": ...}`
//!
//! Every request yields exactly one response with a matching id.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Incoming request frame from a client.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RpcRequest {
    /// Frame tag — always `"req"`.
    #[serde(rename = "type")]
    pub frame_type: String,
    /// Caller-supplied correlation identifier.
    pub id: String,
    /// Method name (e.g. `agent`, `status`).
    pub method: String,
    /// Optional parameters object.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl RpcRequest {
    /// Build a request frame.
    #[must_use]
    pub fn new(id: impl Into<String>, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            frame_type: "req".into(),
            id: id.into(),
            method: method.into(),
            params,
        }
    }

    /// Whether the frame tag is the expected `"req"`.
    #[must_use]
    pub fn is_request(&self) -> bool {
        self.frame_type == "req"
    }
}

/// Structured error body inside a response.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RpcErrorBody {
    /// Machine-readable error code (e.g. `SESSION_BUSY`).
    pub code: String,
    /// Human-readable message.
    pub message: String,
}

/// Outgoing response frame.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RpcResponse {
    /// Frame tag — always `"res"`.
    #[serde(rename = "type")]
    pub frame_type: String,
    /// Echoed request identifier.
    pub id: String,
    /// Whether the call succeeded.
    pub ok: bool,
    /// Result payload (present when `ok`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    /// Error body (present when `!ok`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcErrorBody>,
}

impl RpcResponse {
    /// Build a success response.
    #[must_use]
    pub fn success(id: impl Into<String>, payload: Value) -> Self {
        Self {
            frame_type: "res".into(),
            id: id.into(),
            ok: true,
            payload: Some(payload),
            error: None,
        }
    }

    /// Build an error response.
    #[must_use]
    pub fn error(
        id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            frame_type: "res".into(),
            id: id.into(),
            ok: false,
            payload: None,
            error: Some(RpcErrorBody {
                code: code.into(),
                message: message.into(),
            }),
        }
    }
}

/// Server-pushed event frame.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RpcEvent {
    /// Frame tag — always `"event"`.
    #[serde(rename = "type")]
    pub frame_type: String,
    /// Event name (e.g. `run.started`, `agent.content`).
    pub event: String,
    /// Event payload.
    pub payload: Value,
}

impl RpcEvent {
    /// Build an event frame.
    #[must_use]
    pub fn new(event: impl Into<String>, payload: Value) -> Self {
        Self {
            frame_type: "event".into(),
            event: event.into(),
            payload,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // ── Wire format fixtures ────────────────────────────────────────

    #[test]
    fn wire_format_request() {
        let raw = r#"{"type": "req", "id": "r1", "method": "agent", "params": {"sessionId": "main", "message": "list files"}}"#;
        let req: RpcRequest = serde_json::from_str(raw).unwrap();
        assert!(req.is_request());
        assert_eq!(req.id, "r1");
        assert_eq!(req.method, "agent");
        assert_eq!(req.params.unwrap()["sessionId"], "main");
    }

    #[test]
    fn wire_format_request_without_params() {
        let raw = r#"{"type": "req", "id": "r2", "method": "status"}"#;
        let req: RpcRequest = serde_json::from_str(raw).unwrap();
        assert!(req.params.is_none());
    }

    #[test]
    fn request_missing_type_fails_to_parse() {
        let raw = r#"{"id": "r1", "method": "status"}"#;
        assert!(serde_json::from_str::<RpcRequest>(raw).is_err());
    }

    #[test]
    fn request_with_wrong_tag_is_detected() {
        let raw = r#"{"type": "res", "id": "r1", "method": "status"}"#;
        let req: RpcRequest = serde_json::from_str(raw).unwrap();
        assert!(!req.is_request());
    }

    #[test]
    fn wire_format_success_response() {
        let resp = RpcResponse::success("r1", json!({"status": "completed"}));
        let v: serde_json::Value = serde_json::to_value(&resp).unwrap();
        assert_eq!(v["type"], "res");
        assert_eq!(v["id"], "r1");
        assert_eq!(v["ok"], true);
        assert_eq!(v["payload"]["status"], "completed");
        assert!(v.get("error").is_none());
    }

    #[test]
    fn wire_format_error_response() {
        let resp = RpcResponse::error("r2", "SESSION_BUSY", "session 'main' already has an active run");
        let v: serde_json::Value = serde_json::to_value(&resp).unwrap();
        assert_eq!(v["ok"], false);
        assert!(v.get("payload").is_none());
        assert_eq!(v["error"]["code"], "SESSION_BUSY");
    }

    #[test]
    fn wire_format_event() {
        let ev = RpcEvent::new("agent.content", json!({"text": "hi", "runId": "run_1"}));
        let v: serde_json::Value = serde_json::to_value(&ev).unwrap();
        assert_eq!(v["type"], "event");
        assert_eq!(v["event"], "agent.content");
        assert_eq!(v["payload"]["text"], "hi");
    }

    #[test]
    fn response_roundtrip() {
        let resp = RpcResponse::error("r9", "NOT_FOUND", "gone");
        let back: RpcResponse =
            serde_json::from_str(&serde_json::to_string(&resp).unwrap()).unwrap();
        assert_eq!(back.id, "r9");
        assert!(!back.ok);
        assert_eq!(back.error.unwrap().code, "NOT_FOUND");
    }

    #[test]
    fn request_constructor_sets_tag() {
        let req = RpcRequest::new("r1", "health", None);
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains(r#""type":"req""#));
        assert!(!json.contains("params"));
    }
}
