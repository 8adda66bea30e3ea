//! Core tool trait and execution context.

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;

use helm_core::tools::Tool;

use crate::errors::ToolError;

/// Execution context passed to every tool invocation.
#[derive(Clone, Debug)]
pub struct ToolContext {
    /// Unique ID of this tool call.
    pub call_id: String,
    /// Session of the run invoking the tool.
    pub session_id: String,
    /// Workspace directory for path resolution.
    pub workspace_dir: String,
    /// Run-scoped cancellation token. Tools may observe it, but a dispatched
    /// tool is allowed to run to completion; the controller discards the
    /// result instead of killing the call.
    pub cancellation: CancellationToken,
}

impl ToolContext {
    /// A context for unit tests.
    #[must_use]
    pub fn for_test(workspace_dir: impl Into<String>) -> Self {
        Self {
            call_id: "tc_test".into(),
            session_id: "sess_test".into(),
            workspace_dir: workspace_dir.into(),
            cancellation: CancellationToken::new(),
        }
    }
}

/// The trait every tool implements.
///
/// A tool provides its schema via [`definition`](HelmTool::definition) — sent
/// to the model and used for required-field validation — and its behavior via
/// [`execute`](HelmTool::execute). Tools must not panic; failures are
/// returned as [`ToolError`]s and captured by the broker.
#[async_trait]
pub trait HelmTool: Send + Sync {
    /// Tool name — the exact string sent to/from the model.
    fn name(&self) -> &str;

    /// Optional per-tool timeout in milliseconds (overrides the broker default).
    fn timeout_ms(&self) -> Option<u64> {
        None
    }

    /// Generate the [`Tool`] schema advertised to the model.
    fn definition(&self) -> Tool;

    /// Execute the tool with JSON arguments, producing a success payload.
    async fn execute(&self, args: Map<String, Value>, ctx: &ToolContext)
    -> Result<Value, ToolError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_defaults() {
        let ctx = ToolContext::for_test("/tmp");
        assert_eq!(ctx.workspace_dir, "/tmp");
        assert!(!ctx.cancellation.is_cancelled());
    }
}
