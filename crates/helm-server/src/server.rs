//! `GatewayServer` — Axum HTTP + WebSocket server.

use std::collections::HashMap;
use std::sync::Arc;

use axum::Router;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use metrics::counter;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use helm_core::ids::ConnectionId;
use helm_rpc::context::RpcContext;
use helm_rpc::registry::MethodRegistry;

use crate::auth;
use crate::config::ServerConfig;
use crate::shutdown::ShutdownCoordinator;
use crate::websocket::broadcast::BroadcastManager;
use crate::websocket::event_bridge::EventBridge;
use crate::websocket::session::run_ws_session;

/// Shared state accessible from Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Broadcast manager for event fan-out.
    pub broadcast: Arc<BroadcastManager>,
    /// RPC method registry.
    pub registry: Arc<MethodRegistry>,
    /// Handler dependencies.
    pub rpc: Arc<RpcContext>,
    /// Server configuration (auth, limits, heartbeat).
    pub config: Arc<ServerConfig>,
}

/// The gateway server.
pub struct GatewayServer {
    config: Arc<ServerConfig>,
    registry: Arc<MethodRegistry>,
    rpc: Arc<RpcContext>,
    broadcast: Arc<BroadcastManager>,
    shutdown: Arc<ShutdownCoordinator>,
}

impl GatewayServer {
    /// Create a new server.
    #[must_use]
    pub fn new(config: ServerConfig, registry: MethodRegistry, rpc: RpcContext) -> Self {
        Self {
            config: Arc::new(config),
            registry: Arc::new(registry),
            rpc: Arc::new(rpc),
            broadcast: Arc::new(BroadcastManager::new()),
            shutdown: Arc::new(ShutdownCoordinator::new()),
        }
    }

    /// Build the Axum router with all routes.
    #[must_use]
    pub fn router(&self) -> Router {
        let state = AppState {
            broadcast: self.broadcast.clone(),
            registry: self.registry.clone(),
            rpc: self.rpc.clone(),
            config: self.config.clone(),
        };

        Router::new()
            .route("/health", get(health_handler))
            .route("/ws", get(ws_handler))
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }

    /// Get the broadcast manager.
    #[must_use]
    pub fn broadcast(&self) -> &Arc<BroadcastManager> {
        &self.broadcast
    }

    /// Get the shutdown coordinator.
    #[must_use]
    pub fn shutdown(&self) -> &Arc<ShutdownCoordinator> {
        &self.shutdown
    }

    /// Get the server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Spawn the bridge forwarding controller events to clients.
    fn spawn_event_bridge(&self) -> tokio::task::JoinHandle<()> {
        let bridge = EventBridge::new(self.rpc.controller.subscribe(), self.broadcast.clone());
        tokio::spawn(bridge.run())
    }

    /// Bind per configuration and serve until shutdown.
    pub async fn serve(self) -> std::io::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.config.bind_addr()).await?;
        self.serve_on(listener).await
    }

    /// Serve on an already-bound listener until shutdown.
    pub async fn serve_on(self, listener: tokio::net::TcpListener) -> std::io::Result<()> {
        let addr = listener.local_addr()?;
        info!(%addr, "gateway listening");

        let bridge = self.spawn_event_bridge();
        let token = self.shutdown.token();
        let app = self.router();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move { token.cancelled().await })
            .await?;

        bridge.abort();
        Ok(())
    }
}

/// GET /health — liveness probe outside the frame protocol.
async fn health_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "ready": true,
        "uptimeSecs": state.rpc.start_time.elapsed().as_secs(),
        "connections": state.broadcast.connection_count(),
        "activeRuns": state.rpc.controller.active_run_count(),
    }))
}

/// GET /ws — authenticated WebSocket upgrade.
async fn ws_handler(
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    if let Err(rejection) = auth::authorize(&state.config, &headers, &query) {
        warn!(reason = rejection.reason(), "refusing connection");
        counter!("ws_auth_rejections_total").increment(1);
        return StatusCode::UNAUTHORIZED.into_response();
    }

    if state.broadcast.connection_count() >= state.config.max_connections {
        warn!(limit = state.config.max_connections, "connection limit reached");
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }

    let client_id = format!("conn_{}", ConnectionId::new());
    let config = (*state.config).clone();
    ws.max_message_size(state.config.max_message_size)
        .on_upgrade(move |socket| {
            run_ws_session(
                socket,
                client_id,
                state.registry,
                state.rpc,
                state.broadcast,
                config,
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use helm_llm::testing::ScriptedGateway;
    use helm_runtime::{ControllerConfig, RunController};
    use helm_sessions::SessionStore;
    use helm_settings::AuthMode;
    use helm_tools::ToolBroker;
    use tower::ServiceExt;

    fn make_server(config: ServerConfig) -> (GatewayServer, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(SessionStore::open(dir.path()).unwrap());
        let controller = Arc::new(RunController::new(
            store.clone(),
            Arc::new(ScriptedGateway::new()),
            Arc::new(ToolBroker::new()),
            ControllerConfig::default(),
        ));
        let mut registry = MethodRegistry::new();
        helm_rpc::handlers::register_all(&mut registry);
        let rpc = RpcContext::new(controller, store);
        (GatewayServer::new(config, registry, rpc), dir)
    }

    fn upgrade_request(uri: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header("host", "localhost")
            .header("connection", "upgrade")
            .header("upgrade", "websocket")
            .header("sec-websocket-version", "13")
            .header("sec-websocket-key", "dGhlIHNhbXBsZSBub25jZQ==")
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn health_endpoint_returns_ok() {
        let (server, _dir) = make_server(ServerConfig::default());
        let app = server.router();

        let resp = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let body = axum::body::to_bytes(resp.into_body(), 10_000).await.unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed["status"], "ok");
        assert_eq!(parsed["ready"], true);
        assert_eq!(parsed["connections"], 0);
        assert_eq!(parsed["activeRuns"], 0);
    }

    #[tokio::test]
    async fn unknown_route_returns_404() {
        let (server, _dir) = make_server(ServerConfig::default());
        let resp = server
            .router()
            .oneshot(Request::builder().uri("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn ws_upgrade_accepted_with_none_auth() {
        let (server, _dir) = make_server(ServerConfig::default());
        let resp = server.router().oneshot(upgrade_request("/ws")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::SWITCHING_PROTOCOLS);
    }

    #[tokio::test]
    async fn ws_upgrade_refused_with_bad_token() {
        let config = ServerConfig {
            auth_mode: AuthMode::Token,
            auth_token: Some("s3cret".into()),
            ..ServerConfig::default()
        };
        let (server, _dir) = make_server(config);
        let resp = server
            .router()
            .oneshot(upgrade_request("/ws?token=wrong"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn ws_upgrade_refused_without_token() {
        let config = ServerConfig {
            auth_mode: AuthMode::Token,
            auth_token: Some("s3cret".into()),
            ..ServerConfig::default()
        };
        let (server, _dir) = make_server(config);
        let resp = server.router().oneshot(upgrade_request("/ws")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn ws_upgrade_accepted_with_matching_token() {
        let config = ServerConfig {
            auth_mode: AuthMode::Token,
            auth_token: Some("s3cret".into()),
            ..ServerConfig::default()
        };
        let (server, _dir) = make_server(config);
        let resp = server
            .router()
            .oneshot(upgrade_request("/ws?token=s3cret"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::SWITCHING_PROTOCOLS);
    }

    #[test]
    fn shutdown_coordinator_accessible() {
        let (server, _dir) = make_server(ServerConfig::default());
        assert!(!server.shutdown().is_shutting_down());
        server.shutdown().shutdown();
        assert!(server.shutdown().is_shutting_down());
    }
}
