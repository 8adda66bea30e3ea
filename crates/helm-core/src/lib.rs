//! # helm-core
//!
//! Foundation types shared across the Helm workspace: branded IDs,
//! conversation messages, tool schema/result types, and run lifecycle events.
//!
//! This crate carries no business logic and no I/O — every other crate in the
//! workspace depends on it, so it stays at the bottom of the dependency graph.

#![deny(unsafe_code)]

pub mod events;
pub mod ids;
pub mod messages;
pub mod tools;

pub use events::{BaseEvent, RunEvent};
pub use ids::{ConnectionId, RunId, SessionId};
pub use messages::{Context, Message, Role, TokenUsage, ToolCall, ToolResult};
pub use tools::{Tool, ToolParameterSchema};
