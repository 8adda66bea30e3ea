//! Tool errors.
//!
//! These never propagate past the broker: [`crate::ToolBroker::execute`]
//! converts every variant into an error `ToolResult`.

/// Errors raised by tool implementations and the broker.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// A required argument is missing or has the wrong type.
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    /// The invocation was rejected by policy.
    #[error("denied by policy: {0}")]
    Denied(String),

    /// No tool with the requested name is registered (or it is disabled).
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    /// The tool exceeded its execution timeout.
    #[error("tool timed out after {0}ms")]
    Timeout(u64),

    /// Filesystem failure inside a tool.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Tool-specific execution failure.
    #[error("{0}")]
    Execution(String),
}
