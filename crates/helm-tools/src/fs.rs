//! `filesystem` tool — read, write, and list within the workspace.
//!
//! Paths are resolved relative to the workspace directory; absolute paths and
//! `..` traversal are rejected so the tool cannot escape its root.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use serde_json::{Map, Value, json};

use helm_core::tools::{Tool, ToolParameterSchema};

use crate::errors::ToolError;
use crate::traits::{HelmTool, ToolContext};

/// The `filesystem` tool provides workspace file access.
pub struct FilesystemTool {
    max_read_bytes: usize,
}

impl FilesystemTool {
    /// Create a filesystem tool with the given read budget.
    #[must_use]
    pub fn new(max_read_bytes: usize) -> Self {
        Self { max_read_bytes }
    }
}

impl Default for FilesystemTool {
    fn default() -> Self {
        Self::new(256 * 1024)
    }
}

/// Resolve `path` under `root`, rejecting absolute paths and traversal.
fn resolve_path(root: &str, path: &str) -> Result<PathBuf, ToolError> {
    let rel = Path::new(path);
    if rel.is_absolute() {
        return Err(ToolError::InvalidArguments(format!(
            "path must be relative to the workspace: '{path}'"
        )));
    }
    for component in rel.components() {
        match component {
            Component::Normal(_) | Component::CurDir => {}
            _ => {
                return Err(ToolError::InvalidArguments(format!(
                    "path escapes the workspace: '{path}'"
                )));
            }
        }
    }
    Ok(Path::new(root).join(rel))
}

fn required_str<'a>(args: &'a Map<String, Value>, key: &str) -> Result<&'a str, ToolError> {
    args.get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| ToolError::InvalidArguments(format!("'{key}' must be a string")))
}

#[async_trait]
impl HelmTool for FilesystemTool {
    fn name(&self) -> &str {
        "filesystem"
    }

    fn definition(&self) -> Tool {
        let mut props = Map::new();
        let _ = props.insert(
            "action".into(),
            json!({"type": "string", "enum": ["read", "write", "list"], "description": "Operation to perform"}),
        );
        let _ = props.insert(
            "path".into(),
            json!({"type": "string", "description": "Path relative to the workspace (defaults to '.' for list)"}),
        );
        let _ = props.insert(
            "content".into(),
            json!({"type": "string", "description": "File content (write only)"}),
        );
        Tool {
            name: "filesystem".into(),
            description: "Read, write, or list files in the workspace directory.".into(),
            parameters: ToolParameterSchema::object(props, vec!["action".into()]),
        }
    }

    async fn execute(
        &self,
        args: Map<String, Value>,
        ctx: &ToolContext,
    ) -> Result<Value, ToolError> {
        let action = required_str(&args, "action")?;
        match action {
            "read" => {
                let path = resolve_path(&ctx.workspace_dir, required_str(&args, "path")?)?;
                let content = tokio::fs::read_to_string(&path).await?;
                if content.len() > self.max_read_bytes {
                    return Err(ToolError::Execution(format!(
                        "file is {} bytes, larger than the {} byte read budget",
                        content.len(),
                        self.max_read_bytes
                    )));
                }
                Ok(json!({ "path": required_str(&args, "path")?, "content": content }))
            }
            "write" => {
                let raw = required_str(&args, "path")?;
                let path = resolve_path(&ctx.workspace_dir, raw)?;
                let content = required_str(&args, "content")?;
                if let Some(parent) = path.parent() {
                    tokio::fs::create_dir_all(parent).await?;
                }
                tokio::fs::write(&path, content).await?;
                Ok(json!({ "path": raw, "written": content.len() }))
            }
            "list" => {
                let raw = args.get("path").and_then(Value::as_str).unwrap_or(".");
                let path = resolve_path(&ctx.workspace_dir, raw)?;
                let mut entries = Vec::new();
                let mut dir = tokio::fs::read_dir(&path).await?;
                while let Some(entry) = dir.next_entry().await? {
                    let name = entry.file_name().to_string_lossy().into_owned();
                    let is_dir = entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false);
                    entries.push(json!({ "name": name, "dir": is_dir }));
                }
                entries.sort_by(|a, b| a["name"].as_str().cmp(&b["name"].as_str()));
                Ok(json!({ "path": raw, "entries": entries }))
            }
            other => Err(ToolError::InvalidArguments(format!(
                "unknown action '{other}' (expected read, write, or list)"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(pairs: &[(&str, &str)]) -> Map<String, Value> {
        let mut m = Map::new();
        for (k, v) in pairs {
            let _ = m.insert((*k).to_owned(), json!(v));
        }
        m
    }

    fn workspace() -> (tempfile::TempDir, ToolContext) {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ToolContext::for_test(dir.path().to_str().unwrap());
        (dir, ctx)
    }

    #[tokio::test]
    async fn write_then_read_roundtrip() {
        let (_dir, ctx) = workspace();
        let tool = FilesystemTool::default();

        let written = tool
            .execute(
                args(&[("action", "write"), ("path", "notes.txt"), ("content", "hello")]),
                &ctx,
            )
            .await
            .unwrap();
        assert_eq!(written["written"], 5);

        let read = tool
            .execute(args(&[("action", "read"), ("path", "notes.txt")]), &ctx)
            .await
            .unwrap();
        assert_eq!(read["content"], "hello");
    }

    #[tokio::test]
    async fn write_creates_parent_directories() {
        let (dir, ctx) = workspace();
        let tool = FilesystemTool::default();
        let _ = tool
            .execute(
                args(&[("action", "write"), ("path", "a/b/c.txt"), ("content", "x")]),
                &ctx,
            )
            .await
            .unwrap();
        assert!(dir.path().join("a/b/c.txt").exists());
    }

    #[tokio::test]
    async fn list_returns_sorted_entries() {
        let (dir, ctx) = workspace();
        std::fs::write(dir.path().join("b.txt"), "").unwrap();
        std::fs::write(dir.path().join("a.txt"), "").unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();

        let tool = FilesystemTool::default();
        let listed = tool.execute(args(&[("action", "list")]), &ctx).await.unwrap();
        let entries = listed["entries"].as_array().unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0]["name"], "a.txt");
        assert_eq!(entries[2]["name"], "sub");
        assert_eq!(entries[2]["dir"], true);
    }

    #[tokio::test]
    async fn read_missing_file_is_io_error() {
        let (_dir, ctx) = workspace();
        let tool = FilesystemTool::default();
        let err = tool
            .execute(args(&[("action", "read"), ("path", "absent.txt")]), &ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Io(_)));
    }

    #[tokio::test]
    async fn absolute_path_rejected() {
        let (_dir, ctx) = workspace();
        let tool = FilesystemTool::default();
        let err = tool
            .execute(args(&[("action", "read"), ("path", "/etc/passwd")]), &ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[tokio::test]
    async fn traversal_rejected() {
        let (_dir, ctx) = workspace();
        let tool = FilesystemTool::default();
        let err = tool
            .execute(args(&[("action", "read"), ("path", "../secrets")]), &ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[tokio::test]
    async fn unknown_action_rejected() {
        let (_dir, ctx) = workspace();
        let tool = FilesystemTool::default();
        let err = tool
            .execute(args(&[("action", "move"), ("path", "x")]), &ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[tokio::test]
    async fn oversized_read_rejected() {
        let (dir, ctx) = workspace();
        std::fs::write(dir.path().join("big.txt"), "x".repeat(100)).unwrap();
        let tool = FilesystemTool::new(10);
        let err = tool
            .execute(args(&[("action", "read"), ("path", "big.txt")]), &ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Execution(_)));
    }
}
