//! Event bridge — converts [`RunEvent`]s from the run controller broadcast
//! into wire-format `event` frames and routes them through the
//! [`BroadcastManager`].

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use helm_core::events::RunEvent;
use helm_rpc::types::RpcEvent;

use super::broadcast::BroadcastManager;

/// Bridges controller events to WebSocket clients.
pub struct EventBridge {
    rx: broadcast::Receiver<RunEvent>,
    broadcast: Arc<BroadcastManager>,
}

impl EventBridge {
    /// Create a new event bridge.
    #[must_use]
    pub fn new(rx: broadcast::Receiver<RunEvent>, broadcast: Arc<BroadcastManager>) -> Self {
        Self { rx, broadcast }
    }

    /// Run the bridge loop. Exits when the controller's sender is dropped.
    #[tracing::instrument(skip_all, name = "event_bridge")]
    pub async fn run(mut self) {
        loop {
            match self.rx.recv().await {
                Ok(event) => {
                    debug!(event_type = event.event_type(), "bridging event to clients");
                    let session_id = event.session_id().to_owned();
                    let frame = run_event_to_frame(&event);
                    self.broadcast.broadcast_run_event(&session_id, &frame).await;
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(lagged = n, "event bridge lagged behind the controller");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    info!("event bridge: controller sender closed, exiting");
                    break;
                }
            }
        }
    }
}

/// Convert a [`RunEvent`] into a wire `event` frame.
///
/// The event name rides in the frame's `event` field, so the redundant tag
/// is stripped from the payload object.
#[must_use]
pub fn run_event_to_frame(event: &RunEvent) -> RpcEvent {
    let mut payload = serde_json::to_value(event).unwrap_or(serde_json::Value::Null);
    if let Some(obj) = payload.as_object_mut() {
        let _ = obj.remove("type");
    }
    RpcEvent::new(event.event_type(), payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::websocket::connection::ClientConnection;
    use helm_core::events::BaseEvent;
    use tokio::sync::mpsc;

    #[test]
    fn frame_carries_event_name_and_payload() {
        let event = RunEvent::Content {
            base: BaseEvent::now("run_1", "sess_1"),
            text: "hello".into(),
        };
        let frame = run_event_to_frame(&event);
        assert_eq!(frame.event, "agent.content");
        assert_eq!(frame.payload["runId"], "run_1");
        assert_eq!(frame.payload["sessionId"], "sess_1");
        assert_eq!(frame.payload["text"], "hello");
        assert!(frame.payload.get("type").is_none());
    }

    #[tokio::test]
    async fn bridge_forwards_controller_events() {
        let (tx, rx) = broadcast::channel(16);
        let bm = Arc::new(BroadcastManager::new());

        let (conn_tx, mut conn_rx) = mpsc::channel(16);
        bm.add(Arc::new(ClientConnection::new("c1".into(), conn_tx))).await;

        let bridge = EventBridge::new(rx, bm);
        let handle = tokio::spawn(bridge.run());

        let _ = tx
            .send(RunEvent::RunStarted {
                base: BaseEvent::now("run_1", "sess_1"),
            })
            .unwrap();

        let raw = tokio::time::timeout(std::time::Duration::from_secs(1), conn_rx.recv())
            .await
            .unwrap()
            .unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed["type"], "event");
        assert_eq!(parsed["event"], "run.started");
        assert_eq!(parsed["payload"]["sessionId"], "sess_1");

        drop(tx);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn bridge_respects_session_filters() {
        let (tx, rx) = broadcast::channel(16);
        let bm = Arc::new(BroadcastManager::new());

        let (tx_a, mut rx_a) = mpsc::channel(16);
        let conn_a = Arc::new(ClientConnection::new("a".into(), tx_a));
        conn_a.bind_filter("sess_a");
        bm.add(conn_a).await;

        let (tx_b, mut rx_b) = mpsc::channel(16);
        let conn_b = Arc::new(ClientConnection::new("b".into(), tx_b));
        conn_b.bind_filter("sess_b");
        bm.add(conn_b).await;

        let handle = tokio::spawn(EventBridge::new(rx, bm).run());
        let _ = tx
            .send(RunEvent::RunStarted {
                base: BaseEvent::now("run_1", "sess_a"),
            })
            .unwrap();
        drop(tx);
        handle.await.unwrap();

        assert!(rx_a.try_recv().is_ok());
        assert!(rx_b.try_recv().is_err());
    }
}
