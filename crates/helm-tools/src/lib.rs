//! # helm-tools
//!
//! The tool broker: resolves a model-requested tool call to a registered
//! capability, enforces per-tool policy, executes with a timeout, and returns
//! a normalized [`helm_core::ToolResult`]. No failure mode escapes as a
//! fault — unknown tools, policy denials, bad arguments, timeouts, and tool
//! errors all come back as error results the run controller feeds to the
//! model.
//!
//! Built-ins cover shell execution, workspace filesystem access, and web page
//! fetching; anything implementing [`HelmTool`] can be registered alongside
//! them.

#![deny(unsafe_code)]

pub mod broker;
pub mod errors;
pub mod fs;
pub mod policy;
pub mod shell;
pub mod traits;
pub mod web;

pub use broker::ToolBroker;
pub use errors::ToolError;
pub use fs::FilesystemTool;
pub use policy::ToolPolicy;
pub use shell::ShellTool;
pub use traits::{HelmTool, ToolContext};
pub use web::BrowserTool;
