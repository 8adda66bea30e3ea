//! `browser` tool — fetch a URL and reduce it to readable text.
//!
//! The minimal browsing capability: validate the URL, fetch over HTTP(S),
//! convert HTML to plain text, and return it bounded by a byte budget.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value, json};
use tracing::debug;

use helm_core::tools::{Tool, ToolParameterSchema};

use crate::errors::ToolError;
use crate::traits::{HelmTool, ToolContext};

const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);
const TEXT_WIDTH: usize = 100;

/// The `browser` tool fetches web pages as text.
pub struct BrowserTool {
    client: reqwest::Client,
    max_bytes: usize,
}

impl BrowserTool {
    /// Create a browser tool with the given content budget.
    #[must_use]
    pub fn new(max_bytes: usize) -> Self {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_FETCH_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self { client, max_bytes }
    }
}

impl Default for BrowserTool {
    fn default() -> Self {
        Self::new(256 * 1024)
    }
}

fn validate_url(raw: &str) -> Result<reqwest::Url, ToolError> {
    let url: reqwest::Url = raw
        .parse()
        .map_err(|_| ToolError::InvalidArguments(format!("invalid URL: '{raw}'")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ToolError::InvalidArguments(format!(
            "unsupported URL scheme '{other}'"
        ))),
    }
}

#[async_trait]
impl HelmTool for BrowserTool {
    fn name(&self) -> &str {
        "browser"
    }

    fn definition(&self) -> Tool {
        let mut props = Map::new();
        let _ = props.insert(
            "url".into(),
            json!({"type": "string", "description": "The http(s) URL to fetch"}),
        );
        Tool {
            name: "browser".into(),
            description: "Fetch a web page and return its content as readable text.".into(),
            parameters: ToolParameterSchema::object(props, vec!["url".into()]),
        }
    }

    async fn execute(
        &self,
        args: Map<String, Value>,
        _ctx: &ToolContext,
    ) -> Result<Value, ToolError> {
        let raw = args
            .get("url")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::InvalidArguments("'url' must be a string".into()))?;
        let url = validate_url(raw)?;

        debug!(%url, "fetching page");
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| ToolError::Execution(format!("fetch failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ToolError::Execution(format!(
                "fetch failed with status {status}"
            )));
        }

        let is_html = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.contains("html"));

        let body = response
            .text()
            .await
            .map_err(|e| ToolError::Execution(format!("failed to read body: {e}")))?;

        let mut content = if is_html {
            html2text::from_read(body.as_bytes(), TEXT_WIDTH)
                .map_err(|e| ToolError::Execution(format!("failed to parse HTML: {e}")))?
        } else {
            body
        };

        if content.len() > self.max_bytes {
            let mut end = self.max_bytes;
            while !content.is_char_boundary(end) {
                end -= 1;
            }
            content.truncate(end);
            content.push_str("\n... [content truncated]");
        }

        Ok(json!({ "url": raw, "content": content }))
    }
}
