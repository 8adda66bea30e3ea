//! # helm-rpc
//!
//! The gateway wire protocol: one JSON object per frame, three frame kinds —
//! `req` (client request), `res` (matched response), `event` (unsolicited
//! server push) — plus the method registry that dispatches parsed requests
//! to typed handlers.

#![deny(unsafe_code)]

pub mod context;
pub mod errors;
pub mod handlers;
pub mod registry;
pub mod types;

pub use context::RpcContext;
pub use errors::RpcError;
pub use registry::{MethodHandler, MethodRegistry};
pub use types::{RpcErrorBody, RpcEvent, RpcRequest, RpcResponse};
