//! Anthropic backend implementing [`ModelGateway`].
//!
//! Builds non-streaming requests against the Messages API and maps the
//! response content blocks back into the gateway's response type. API key
//! auth only; OAuth and streaming are out of scope for this backend.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde_json::{Value, json};
use tracing::{debug, instrument, warn};

use helm_core::messages::{Context, Message, TokenUsage, ToolCall};

use crate::gateway::{
    CompletionOptions, GatewayError, GatewayResult, ModelGateway, ModelResponse,
};

/// Default base URL for the Anthropic API.
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";

/// API version header value.
const API_VERSION: &str = "2023-06-01";

/// Default `max_tokens` when neither options nor config specify one.
const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 8192;

/// Configuration for the Anthropic gateway.
#[derive(Clone, Debug)]
pub struct AnthropicConfig {
    /// API key (`x-api-key` header).
    pub api_key: String,
    /// Model ID.
    pub model: String,
    /// Base URL override (tests point this at a local server).
    pub base_url: Option<String>,
    /// Default `max_tokens` for requests.
    pub max_tokens: Option<u32>,
}

/// Anthropic model gateway.
pub struct AnthropicGateway {
    config: AnthropicConfig,
    client: reqwest::Client,
}

impl AnthropicGateway {
    /// Create a gateway from configuration.
    #[must_use]
    pub fn new(config: AnthropicConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    fn base_url(&self) -> &str {
        self.config.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }

    fn build_headers(&self) -> GatewayResult<HeaderMap> {
        if self.config.api_key.is_empty() {
            return Err(GatewayError::Auth {
                message: "no Anthropic API key configured".into(),
            });
        }
        let mut headers = HeaderMap::new();
        let _ = headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let _ = headers.insert("anthropic-version", HeaderValue::from_static(API_VERSION));
        let _ = headers.insert(
            "x-api-key",
            HeaderValue::from_str(&self.config.api_key).map_err(|_| GatewayError::Auth {
                message: "API key contains invalid header characters".into(),
            })?,
        );
        Ok(headers)
    }

    fn build_body(&self, context: &Context, options: &CompletionOptions) -> Value {
        let max_tokens = options
            .max_tokens
            .or(self.config.max_tokens)
            .unwrap_or(DEFAULT_MAX_OUTPUT_TOKENS);

        let mut body = json!({
            "model": self.config.model,
            "max_tokens": max_tokens,
            "messages": convert_messages(&context.messages),
        });

        if let Some(system) = &context.system_prompt {
            body["system"] = json!(system);
        }
        if let Some(tools) = &context.tools {
            if !tools.is_empty() {
                body["tools"] = Value::Array(
                    tools
                        .iter()
                        .map(|t| {
                            json!({
                                "name": t.name,
                                "description": t.description,
                                "input_schema": t.parameters,
                            })
                        })
                        .collect(),
                );
            }
        }
        if let Some(budget) = options.effort.as_deref().and_then(effort_budget) {
            body["thinking"] = json!({ "type": "enabled", "budget_tokens": budget });
        }

        body
    }
}

/// Map an effort hint to an extended-thinking token budget.
fn effort_budget(effort: &str) -> Option<u32> {
    match effort {
        "low" => Some(1024),
        "medium" => Some(4096),
        "high" => Some(16_384),
        _ => None,
    }
}

/// Convert transcript messages to Messages API params.
///
/// Tool results ride in a `user` turn per the API's conversation shape;
/// in-transcript system messages (rare) are folded into user turns.
fn convert_messages(messages: &[Message]) -> Vec<Value> {
    let mut out = Vec::with_capacity(messages.len());
    for msg in messages {
        match msg {
            Message::System { content, .. } | Message::User { content, .. } => {
                out.push(json!({
                    "role": "user",
                    "content": [{ "type": "text", "text": content }],
                }));
            }
            Message::Assistant {
                content,
                tool_calls,
                ..
            } => {
                let mut blocks = Vec::new();
                if !content.is_empty() {
                    blocks.push(json!({ "type": "text", "text": content }));
                }
                for tc in tool_calls {
                    blocks.push(json!({
                        "type": "tool_use",
                        "id": tc.id,
                        "name": tc.name,
                        "input": tc.arguments,
                    }));
                }
                if blocks.is_empty() {
                    continue;
                }
                out.push(json!({ "role": "assistant", "content": blocks }));
            }
            Message::Tool { results, .. } => {
                let blocks: Vec<Value> = results
                    .iter()
                    .map(|r| {
                        json!({
                            "type": "tool_result",
                            "tool_use_id": r.call_id,
                            "content": r.render(),
                            "is_error": r.is_error(),
                        })
                    })
                    .collect();
                out.push(json!({ "role": "user", "content": blocks }));
            }
        }
    }
    out
}

/// Parse a Messages API response body into a [`ModelResponse`].
fn parse_response(body: &Value) -> GatewayResult<ModelResponse> {
    let content = body
        .get("content")
        .and_then(Value::as_array)
        .ok_or_else(|| GatewayError::Malformed {
            message: "response has no content array".into(),
        })?;

    let mut text = String::new();
    let mut tool_calls = Vec::new();
    for block in content {
        match block.get("type").and_then(Value::as_str) {
            Some("text") => {
                if let Some(t) = block.get("text").and_then(Value::as_str) {
                    text.push_str(t);
                }
            }
            Some("tool_use") => {
                let id = block
                    .get("id")
                    .and_then(Value::as_str)
                    .ok_or_else(|| GatewayError::Malformed {
                        message: "tool_use block missing id".into(),
                    })?;
                let name = block
                    .get("name")
                    .and_then(Value::as_str)
                    .ok_or_else(|| GatewayError::Malformed {
                        message: "tool_use block missing name".into(),
                    })?;
                let arguments = block
                    .get("input")
                    .and_then(Value::as_object)
                    .cloned()
                    .unwrap_or_default();
                tool_calls.push(ToolCall::new(id, name, arguments));
            }
            // Thinking blocks and unknown block types are not surfaced
            other => debug!(block_type = ?other, "skipping response block"),
        }
    }

    let usage = TokenUsage {
        input_tokens: body
            .pointer("/usage/input_tokens")
            .and_then(Value::as_u64)
            .unwrap_or(0),
        output_tokens: body
            .pointer("/usage/output_tokens")
            .and_then(Value::as_u64)
            .unwrap_or(0),
    };

    Ok(ModelResponse {
        text: if text.is_empty() { None } else { Some(text) },
        tool_calls,
        usage,
    })
}

#[async_trait]
impl ModelGateway for AnthropicGateway {
    fn model(&self) -> &str {
        &self.config.model
    }

    #[instrument(skip_all, fields(model = self.config.model))]
    async fn complete(
        &self,
        context: &Context,
        options: &CompletionOptions,
    ) -> GatewayResult<ModelResponse> {
        let headers = self.build_headers()?;
        let body = self.build_body(context, options);
        let url = format!("{}/v1/messages", self.base_url());

        debug!(message_count = context.messages.len(), "sending completion request");

        let response = self
            .client
            .post(&url)
            .headers(headers)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_body: Value = response.json().await.unwrap_or_default();
            let message = error_body
                .pointer("/error/message")
                .and_then(Value::as_str)
                .unwrap_or("request failed")
                .to_owned();
            warn!(status = status.as_u16(), %message, "completion request failed");
            return Err(GatewayError::Api {
                status: status.as_u16(),
                message,
                retryable: status.as_u16() == 429 || status.is_server_error(),
            });
        }

        let body: Value = response.json().await?;
        parse_response(&body)
    }
}
