//! Event fan-out to connected WebSocket clients.
//!
//! Delivery is at-least-once, best-effort: each connection has a bounded
//! outbound channel, a full channel counts a drop, and a connection whose
//! lifetime drops exceed the threshold is evicted so it can never stall
//! delivery to other clients or back-pressure the run controller.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use helm_rpc::types::RpcEvent;
use metrics::counter;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::connection::ClientConnection;

/// Maximum lifetime message drops before forcibly evicting a slow client.
const MAX_TOTAL_DROPS: u64 = 100;

/// Manages event broadcasting to connected clients.
pub struct BroadcastManager {
    /// Connected clients indexed by connection ID.
    connections: RwLock<HashMap<String, Arc<ClientConnection>>>,
    /// Atomic counter tracking total connections (avoids read-locking for
    /// count queries).
    active_count: AtomicUsize,
}

impl BroadcastManager {
    /// Create a new broadcast manager.
    #[must_use]
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
            active_count: AtomicUsize::new(0),
        }
    }

    /// Add a connection.
    pub async fn add(&self, connection: Arc<ClientConnection>) {
        let mut conns = self.connections.write().await;
        if conns.insert(connection.id.clone(), connection).is_none() {
            let _ = self.active_count.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Remove a connection by ID.
    pub async fn remove(&self, connection_id: &str) {
        let mut conns = self.connections.write().await;
        if conns.remove(connection_id).is_some() {
            let _ = self.active_count.fetch_sub(1, Ordering::Relaxed);
        }
    }

    /// Broadcast a run event to every connection whose filter admits the
    /// owning session.
    pub async fn broadcast_run_event(&self, session_id: &str, event: &RpcEvent) {
        self.broadcast_to(|c| c.wants(session_id), event, session_id)
            .await;
    }

    /// Broadcast an event to all connections regardless of filter.
    pub async fn broadcast_all(&self, event: &RpcEvent) {
        self.broadcast_to(|_| true, event, "all").await;
    }

    /// Serialize the event once, fan out to matching clients, evict slow ones.
    async fn broadcast_to(
        &self,
        matches: impl Fn(&ClientConnection) -> bool,
        event: &RpcEvent,
        label: &str,
    ) {
        let json = match serde_json::to_string(event) {
            Ok(j) => Arc::new(j),
            Err(e) => {
                warn!(event = event.event, error = %e, "failed to serialize event");
                return;
            }
        };

        let mut to_evict = Vec::new();
        {
            let conns = self.connections.read().await;
            let mut recipients = 0u32;
            for conn in conns.values() {
                if matches(conn) {
                    recipients += 1;
                    if !conn.send(Arc::clone(&json)) {
                        counter!("ws_broadcast_drops_total").increment(1);
                        let drops = conn.drop_count();
                        if drops >= MAX_TOTAL_DROPS {
                            warn!(conn_id = %conn.id, label, drops, "evicting slow client");
                            to_evict.push(conn.id.clone());
                        } else {
                            warn!(conn_id = %conn.id, label, drops, "dropped event (channel full)");
                        }
                    }
                }
            }
            debug!(event = event.event, label, recipients, "broadcast event");
        }

        if !to_evict.is_empty() {
            let mut conns = self.connections.write().await;
            for id in &to_evict {
                if conns.remove(id).is_some() {
                    let _ = self.active_count.fetch_sub(1, Ordering::Relaxed);
                }
            }
        }
    }

    /// Number of active connections.
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.active_count.load(Ordering::Relaxed)
    }
}

impl Default for BroadcastManager {
    fn default() -> Self {
        Self::new()
    }
}
