//! WebSocket layer: connection state, broadcast fan-out, the event bridge,
//! and the per-client session loop.

pub mod broadcast;
pub mod connection;
pub mod event_bridge;
pub mod session;
