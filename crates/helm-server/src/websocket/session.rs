//! WebSocket session lifecycle — handles a single connected client from
//! upgrade through disconnect.
//!
//! Each inbound frame is dispatched on its own task, so a long-running
//! `agent` request never blocks this client's later frames (an
//! `agent.cancel` for that very run included) or any other client.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use metrics::counter;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

use helm_rpc::context::RpcContext;
use helm_rpc::errors;
use helm_rpc::registry::MethodRegistry;
use helm_rpc::types::{RpcEvent, RpcRequest, RpcResponse};

use super::broadcast::BroadcastManager;
use super::connection::ClientConnection;
use crate::config::ServerConfig;

/// Outbound channel depth per client.
const OUTBOUND_BUFFER: usize = 256;

/// Run a WebSocket session for a connected, authenticated client.
///
/// 1. Sends a `connected` welcome event carrying the connection ID
/// 2. Dispatches incoming `req` frames through the method registry
/// 3. Forwards responses and broadcast events via the send channel
/// 4. Sends periodic pings and disconnects unresponsive clients
/// 5. Cleans up on disconnect
#[instrument(skip_all, fields(client_id = %client_id))]
pub async fn run_ws_session(
    ws: WebSocket,
    client_id: String,
    registry: Arc<MethodRegistry>,
    ctx: Arc<RpcContext>,
    broadcast: Arc<BroadcastManager>,
    config: ServerConfig,
) {
    let (mut ws_tx, mut ws_rx) = ws.split();

    let (send_tx, mut send_rx) = mpsc::channel::<Arc<String>>(OUTBOUND_BUFFER);
    let connection = Arc::new(ClientConnection::new(client_id.clone(), send_tx));

    info!(client_id, "client connected");
    counter!("ws_connections_total").increment(1);
    broadcast.add(connection.clone()).await;
    let _ = ctx.connections.fetch_add(1, Ordering::Relaxed);

    // Welcome event — the first frame every authenticated client sees.
    let welcome = RpcEvent::new(
        "connected",
        serde_json::json!({
            "connectionId": client_id,
            "protocol": helm_rpc::handlers::connect::PROTOCOL,
        }),
    );
    if let Ok(json) = serde_json::to_string(&welcome) {
        let _ = ws_tx.send(Message::Text(json.into())).await;
    }

    // Outbound pump with periodic pings.
    let outbound_conn = connection.clone();
    let ping_interval = config.heartbeat_interval;
    let pong_timeout = config.heartbeat_timeout;
    let outbound = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(ping_interval);
        // Skip the immediate first tick
        let _ = ticker.tick().await;
        loop {
            tokio::select! {
                msg = send_rx.recv() => {
                    match msg {
                        Some(text) => {
                            if ws_tx.send(Message::Text((*text).clone().into())).await.is_err() {
                                break;
                            }
                        }
                        None => break,
                    }
                }
                _ = ticker.tick() => {
                    if !outbound_conn.check_alive()
                        && outbound_conn.last_pong_elapsed() > pong_timeout
                    {
                        warn!("client unresponsive for {pong_timeout:?}, disconnecting");
                        break;
                    }
                    if ws_tx.send(Message::Ping(vec![].into())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    // Inbound loop.
    while let Some(Ok(msg)) = ws_rx.next().await {
        let text = match msg {
            Message::Text(ref t) => Some(t.to_string()),
            Message::Binary(ref data) => match std::str::from_utf8(data) {
                Ok(s) => Some(s.to_owned()),
                Err(_) => {
                    debug!(client_id, len = data.len(), "ignoring non-UTF8 binary frame");
                    None
                }
            },
            Message::Close(_) => {
                info!(client_id, "client sent close frame");
                break;
            }
            Message::Ping(_) | Message::Pong(_) => {
                connection.mark_alive();
                None
            }
        };
        let Some(text) = text else { continue };
        connection.mark_alive();

        let registry = registry.clone();
        let ctx = ctx.clone();
        let conn = connection.clone();
        let _handle = tokio::spawn(async move {
            let response = dispatch_frame(&text, &registry, &ctx, &conn).await;
            match serde_json::to_string(&response) {
                Ok(json) => {
                    if !conn.send(Arc::new(json)) {
                        debug!(conn_id = %conn.id, "failed to enqueue response");
                    }
                }
                Err(e) => tracing::error!(error = %e, "failed to serialize response"),
            }
        });
    }

    broadcast.remove(&client_id).await;
    let _ = ctx.connections.fetch_sub(1, Ordering::Relaxed);
    outbound.abort();
    info!(client_id, "client disconnected");
}

/// Parse one inbound frame and dispatch it through the registry.
///
/// Malformed frames produce a request-scoped error response (id `"unknown"`
/// when no id could be recovered) and never drop the connection. A
/// successful `connect` carrying a `sessionId` binds the connection's event
/// filter.
pub async fn dispatch_frame(
    text: &str,
    registry: &MethodRegistry,
    ctx: &RpcContext,
    conn: &ClientConnection,
) -> RpcResponse {
    let request: RpcRequest = match serde_json::from_str(text) {
        Ok(r) => r,
        Err(e) => {
            warn!("invalid frame received");
            return RpcResponse::error(
                "unknown",
                errors::INVALID_ARGUMENT,
                format!("invalid frame: {e}"),
            );
        }
    };

    if !request.is_request() {
        return RpcResponse::error(
            request.id,
            errors::INVALID_ARGUMENT,
            format!("frame type must be 'req', got '{}'", request.frame_type),
        );
    }

    let method = request.method.clone();
    debug!(method, id = request.id, "dispatching request");

    let filter = if method == "connect" {
        request
            .params
            .as_ref()
            .and_then(|p| p.get("sessionId"))
            .and_then(Value::as_str)
            .map(str::to_owned)
    } else {
        None
    };

    let response = registry.dispatch(request, ctx).await;

    if response.ok {
        if let Some(session_id) = filter {
            debug!(conn_id = %conn.id, session_id, "event filter bound");
            conn.bind_filter(session_id);
        }
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use helm_llm::testing::ScriptedGateway;
    use helm_runtime::{ControllerConfig, RunController};
    use helm_sessions::SessionStore;
    use helm_tools::ToolBroker;

    fn make_ctx() -> (RpcContext, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(SessionStore::open(dir.path()).unwrap());
        let controller = Arc::new(RunController::new(
            store.clone(),
            Arc::new(ScriptedGateway::new()),
            Arc::new(ToolBroker::new()),
            ControllerConfig::default(),
        ));
        (RpcContext::new(controller, store), dir)
    }

    fn make_registry() -> MethodRegistry {
        let mut registry = MethodRegistry::new();
        helm_rpc::handlers::register_all(&mut registry);
        registry
    }

    fn make_conn() -> (ClientConnection, mpsc::Receiver<Arc<String>>) {
        let (tx, rx) = mpsc::channel(8);
        (ClientConnection::new("c1".into(), tx), rx)
    }

    #[tokio::test]
    async fn invalid_json_yields_request_scoped_error() {
        let (ctx, _dir) = make_ctx();
        let registry = make_registry();
        let (conn, _rx) = make_conn();

        let resp = dispatch_frame("not json at all", &registry, &ctx, &conn).await;
        assert!(!resp.ok);
        assert_eq!(resp.id, "unknown");
        assert_eq!(resp.error.unwrap().code, "INVALID_ARGUMENT");
    }

    #[tokio::test]
    async fn wrong_frame_tag_rejected_with_id_preserved() {
        let (ctx, _dir) = make_ctx();
        let registry = make_registry();
        let (conn, _rx) = make_conn();

        let resp = dispatch_frame(
            r#"{"type": "event", "id": "r7", "method": "status"}"#,
            &registry,
            &ctx,
            &conn,
        )
        .await;
        assert!(!resp.ok);
        assert_eq!(resp.id, "r7");
    }

    #[tokio::test]
    async fn unknown_method_yields_method_not_found() {
        let (ctx, _dir) = make_ctx();
        let registry = make_registry();
        let (conn, _rx) = make_conn();

        let resp = dispatch_frame(
            r#"{"type": "req", "id": "r1", "method": "bogus"}"#,
            &registry,
            &ctx,
            &conn,
        )
        .await;
        assert!(!resp.ok);
        assert_eq!(resp.error.unwrap().code, "METHOD_NOT_FOUND");
    }

    #[tokio::test]
    async fn health_dispatches() {
        let (ctx, _dir) = make_ctx();
        let registry = make_registry();
        let (conn, _rx) = make_conn();

        let resp = dispatch_frame(
            r#"{"type": "req", "id": "h1", "method": "health"}"#,
            &registry,
            &ctx,
            &conn,
        )
        .await;
        assert!(resp.ok);
        assert_eq!(resp.payload.unwrap()["status"], "ok");
    }

    #[tokio::test]
    async fn successful_connect_binds_filter() {
        let (ctx, _dir) = make_ctx();
        let registry = make_registry();
        let (conn, _rx) = make_conn();

        assert!(conn.filter().is_none());
        let resp = dispatch_frame(
            r#"{"type": "req", "id": "c1", "method": "connect", "params": {"sessionId": "main"}}"#,
            &registry,
            &ctx,
            &conn,
        )
        .await;
        assert!(resp.ok);
        assert_eq!(conn.filter().as_deref(), Some("main"));
    }

    #[tokio::test]
    async fn connect_without_filter_leaves_broadcast_all() {
        let (ctx, _dir) = make_ctx();
        let registry = make_registry();
        let (conn, _rx) = make_conn();

        let resp = dispatch_frame(
            r#"{"type": "req", "id": "c1", "method": "connect"}"#,
            &registry,
            &ctx,
            &conn,
        )
        .await;
        assert!(resp.ok);
        assert!(conn.filter().is_none());
    }

    #[tokio::test]
    async fn failed_connect_does_not_bind_filter() {
        let (ctx, _dir) = make_ctx();
        let registry = make_registry();
        let (conn, _rx) = make_conn();

        // Non-string sessionId fails validation
        let resp = dispatch_frame(
            r#"{"type": "req", "id": "c1", "method": "connect", "params": {"sessionId": 9}}"#,
            &registry,
            &ctx,
            &conn,
        )
        .await;
        assert!(!resp.ok);
        assert!(conn.filter().is_none());
    }
}
