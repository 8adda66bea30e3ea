//! Method registry and async dispatch.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use metrics::{counter, histogram};
use serde_json::Value;
use tracing::warn;

use crate::context::RpcContext;
use crate::errors::{self, RpcError};
use crate::types::{RpcRequest, RpcResponse};

/// Default ceiling on a single handler invocation. Generous because the
/// `agent` method blocks for the full run.
const DEFAULT_HANDLER_TIMEOUT: Duration = Duration::from_secs(600);

/// Trait implemented by every RPC method handler.
#[async_trait]
pub trait MethodHandler: Send + Sync {
    /// Execute the handler with the given params and context.
    async fn handle(&self, params: Option<Value>, ctx: &RpcContext) -> Result<Value, RpcError>;
}

/// Registry mapping method names to handlers.
pub struct MethodRegistry {
    handlers: HashMap<String, Arc<dyn MethodHandler>>,
    handler_timeout: Duration,
}

impl MethodRegistry {
    /// Create an empty registry with the default handler timeout.
    #[must_use]
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
            handler_timeout: DEFAULT_HANDLER_TIMEOUT,
        }
    }

    /// Override the per-request handler timeout.
    #[must_use]
    pub fn with_handler_timeout(mut self, timeout: Duration) -> Self {
        self.handler_timeout = timeout;
        self
    }

    /// Register a handler for a method name.
    pub fn register(&mut self, method: &str, handler: impl MethodHandler + 'static) {
        let _ = self.handlers.insert(method.to_owned(), Arc::new(handler));
    }

    /// Dispatch a request to the appropriate handler.
    ///
    /// Always produces exactly one response carrying the request's id.
    pub async fn dispatch(&self, request: RpcRequest, ctx: &RpcContext) -> RpcResponse {
        let method = request.method.clone();
        counter!("rpc_requests_total", "method" => method.clone()).increment(1);

        let Some(handler) = self.handlers.get(&method) else {
            counter!("rpc_errors_total", "method" => method.clone(), "error_type" => "method_not_found").increment(1);
            return RpcResponse::error(
                &request.id,
                errors::METHOD_NOT_FOUND,
                format!("method '{method}' not found"),
            );
        };

        let start = std::time::Instant::now();
        let result = tokio::time::timeout(
            self.handler_timeout,
            handler.handle(request.params, ctx),
        )
        .await;

        let response = match result {
            Ok(Ok(payload)) => RpcResponse::success(&request.id, payload),
            Ok(Err(err)) => {
                counter!("rpc_errors_total", "method" => method.clone(), "error_type" => err.code().to_owned()).increment(1);
                let body = err.to_error_body();
                RpcResponse {
                    frame_type: "res".into(),
                    id: request.id,
                    ok: false,
                    payload: None,
                    error: Some(body),
                }
            }
            Err(_elapsed) => {
                counter!("rpc_errors_total", "method" => method.clone(), "error_type" => "timeout").increment(1);
                warn!(method, timeout = ?self.handler_timeout, "RPC handler timed out");
                RpcResponse::error(
                    &request.id,
                    errors::INTERNAL_ERROR,
                    format!("handler for '{method}' timed out"),
                )
            }
        };

        histogram!("rpc_request_duration_seconds", "method" => method)
            .record(start.elapsed().as_secs_f64());

        response
    }

    /// List all registered method names (sorted).
    #[must_use]
    pub fn methods(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handlers.keys().cloned().collect();
        names.sort();
        names
    }

    /// Check whether a method is registered.
    #[must_use]
    pub fn has_method(&self, method: &str) -> bool {
        self.handlers.contains_key(method)
    }
}

impl Default for MethodRegistry {
    fn default() -> Self {
        Self::new()
    }
}
