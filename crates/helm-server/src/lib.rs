//! # helm-server
//!
//! The gateway control plane: accepts concurrent WebSocket clients,
//! authenticates them at upgrade time, dispatches parsed `req` frames
//! through the method registry, and fans run events out to every subscribed
//! client — without letting a slow client block delivery to others or block
//! the run controller.

#![deny(unsafe_code)]

pub mod auth;
pub mod config;
pub mod server;
pub mod shutdown;
pub mod websocket;

pub use config::ServerConfig;
pub use server::GatewayServer;
pub use shutdown::ShutdownCoordinator;
