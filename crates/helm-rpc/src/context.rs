//! Shared context handed to every RPC handler.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use helm_runtime::RunController;
use helm_sessions::SessionStore;

/// Dependencies available to method handlers.
///
/// Handlers read controller state only through its explicit query methods —
/// the context deliberately exposes no structural access to run internals.
#[derive(Clone)]
pub struct RpcContext {
    /// The run controller.
    pub controller: Arc<RunController>,
    /// The session store.
    pub sessions: Arc<SessionStore>,
    /// When the server started (for uptime reporting).
    pub start_time: Instant,
    /// Live connected-client count, maintained by the gateway.
    pub connections: Arc<AtomicUsize>,
}

impl RpcContext {
    /// Build a context.
    #[must_use]
    pub fn new(controller: Arc<RunController>, sessions: Arc<SessionStore>) -> Self {
        Self {
            controller,
            sessions,
            start_time: Instant::now(),
            connections: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Current connected-client count.
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.connections.load(Ordering::Relaxed)
    }
}
