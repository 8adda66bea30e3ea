//! `shell` tool — command execution with timeout and output truncation.
//!
//! Spawns `sh -c <command>` in the workspace directory. Output beyond the
//! byte budget is truncated with a marker so a runaway command cannot flood
//! the model context.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value, json};
use tracing::debug;

use helm_core::tools::{Tool, ToolParameterSchema};

use crate::errors::ToolError;
use crate::traits::{HelmTool, ToolContext};

const DEFAULT_TIMEOUT_MS: u64 = 120_000;
const MAX_TIMEOUT_MS: u64 = 600_000;

/// The `shell` tool executes a command line.
pub struct ShellTool {
    timeout_ms: u64,
    max_output_bytes: usize,
}

impl ShellTool {
    /// Create a shell tool with the given limits.
    #[must_use]
    pub fn new(timeout_ms: u64, max_output_bytes: usize) -> Self {
        Self {
            timeout_ms: timeout_ms.min(MAX_TIMEOUT_MS),
            max_output_bytes,
        }
    }
}

impl Default for ShellTool {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT_MS, 64 * 1024)
    }
}

fn truncate(output: &str, max_bytes: usize) -> String {
    if output.len() <= max_bytes {
        return output.to_owned();
    }
    let mut end = max_bytes;
    while !output.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}\n... [output truncated]", &output[..end])
}

#[async_trait]
impl HelmTool for ShellTool {
    fn name(&self) -> &str {
        "shell"
    }

    fn timeout_ms(&self) -> Option<u64> {
        Some(self.timeout_ms)
    }

    fn definition(&self) -> Tool {
        let mut props = Map::new();
        let _ = props.insert(
            "command".into(),
            json!({"type": "string", "description": "The command line to execute"}),
        );
        Tool {
            name: "shell".into(),
            description: "Execute a shell command in the workspace directory and return its \
                          exit code, stdout, and stderr."
                .into(),
            parameters: ToolParameterSchema::object(props, vec!["command".into()]),
        }
    }

    async fn execute(
        &self,
        args: Map<String, Value>,
        ctx: &ToolContext,
    ) -> Result<Value, ToolError> {
        let command = args
            .get("command")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::InvalidArguments("'command' must be a string".into()))?;

        debug!(command, workspace = ctx.workspace_dir, "running shell command");

        let mut cmd = tokio::process::Command::new("sh");
        let _ = cmd
            .arg("-c")
            .arg(command)
            .current_dir(&ctx.workspace_dir)
            .kill_on_drop(true);

        let output = tokio::time::timeout(Duration::from_millis(self.timeout_ms), cmd.output())
            .await
            .map_err(|_| ToolError::Timeout(self.timeout_ms))??;

        let stdout = truncate(&String::from_utf8_lossy(&output.stdout), self.max_output_bytes);
        let stderr = truncate(&String::from_utf8_lossy(&output.stderr), self.max_output_bytes);

        Ok(json!({
            "exitCode": output.status.code(),
            "stdout": stdout,
            "stderr": stderr,
        }))
    }
}
