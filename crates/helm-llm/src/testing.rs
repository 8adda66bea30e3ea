//! Scripted gateway for tests.
//!
//! [`ScriptedGateway`] replays a queue of canned responses, recording each
//! request context it receives. Runtime and server tests drive full agent
//! loops against it without a network.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};

use helm_core::messages::{Context, TokenUsage, ToolCall};

use crate::gateway::{
    CompletionOptions, GatewayError, GatewayResult, ModelGateway, ModelResponse,
};

/// One scripted reply.
enum Step {
    Respond(ModelResponse),
    Fail(String),
}

/// A gateway that replays scripted responses in order.
///
/// When the script runs dry the gateway answers with a fixed fallback text
/// response, so an over-long loop fails a test assertion rather than panicking.
pub struct ScriptedGateway {
    steps: Mutex<VecDeque<Step>>,
    requests: Mutex<Vec<Context>>,
    delay: Option<Duration>,
}

impl ScriptedGateway {
    /// Create an empty script.
    #[must_use]
    pub fn new() -> Self {
        Self {
            steps: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    /// Delay each `complete` call by `delay` (for cancellation tests).
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Queue a plain-text response.
    pub fn push_text(&self, text: impl Into<String>) {
        self.push_response(ModelResponse {
            text: Some(text.into()),
            tool_calls: vec![],
            usage: TokenUsage { input_tokens: 10, output_tokens: 5 },
        });
    }

    /// Queue a single-tool-call response.
    pub fn push_tool_call(
        &self,
        call_id: impl Into<String>,
        tool: impl Into<String>,
        arguments: Map<String, Value>,
    ) {
        self.push_response(ModelResponse {
            text: None,
            tool_calls: vec![ToolCall::new(call_id, tool, arguments)],
            usage: TokenUsage { input_tokens: 10, output_tokens: 5 },
        });
    }

    /// Queue a full response.
    pub fn push_response(&self, response: ModelResponse) {
        self.steps
            .lock()
            .expect("script lock poisoned")
            .push_back(Step::Respond(response));
    }

    /// Queue a backend failure.
    pub fn push_error(&self, message: impl Into<String>) {
        self.steps
            .lock()
            .expect("script lock poisoned")
            .push_back(Step::Fail(message.into()));
    }

    /// Contexts received so far, in call order.
    pub fn requests(&self) -> Vec<Context> {
        self.requests.lock().expect("request lock poisoned").clone()
    }

    /// Number of `complete` calls made.
    pub fn call_count(&self) -> usize {
        self.requests.lock().expect("request lock poisoned").len()
    }
}

impl Default for ScriptedGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ModelGateway for ScriptedGateway {
    fn model(&self) -> &str {
        "scripted"
    }

    async fn complete(
        &self,
        context: &Context,
        _options: &CompletionOptions,
    ) -> GatewayResult<ModelResponse> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.requests
            .lock()
            .expect("request lock poisoned")
            .push(context.clone());

        let step = self.steps.lock().expect("script lock poisoned").pop_front();
        match step {
            Some(Step::Respond(resp)) => Ok(resp),
            Some(Step::Fail(message)) => Err(GatewayError::Other { message }),
            None => Ok(ModelResponse::text_only("script exhausted")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn replays_in_order() {
        let gw = ScriptedGateway::new();
        gw.push_tool_call("tc_1", "shell", Map::new());
        gw.push_text("Done");

        let ctx = Context::default();
        let opts = CompletionOptions::default();

        let first = gw.complete(&ctx, &opts).await.unwrap();
        assert!(first.has_tool_calls());

        let second = gw.complete(&ctx, &opts).await.unwrap();
        assert_eq!(second.text.as_deref(), Some("Done"));
        assert_eq!(gw.call_count(), 2);
    }

    #[tokio::test]
    async fn scripted_error_surfaces() {
        let gw = ScriptedGateway::new();
        gw.push_error("backend down");
        let err = gw
            .complete(&Context::default(), &CompletionOptions::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("backend down"));
    }

    #[tokio::test]
    async fn exhausted_script_falls_back_to_text() {
        let gw = ScriptedGateway::new();
        let resp = gw
            .complete(&Context::default(), &CompletionOptions::default())
            .await
            .unwrap();
        assert_eq!(resp.text.as_deref(), Some("script exhausted"));
    }

    #[tokio::test]
    async fn records_request_contexts() {
        let gw = ScriptedGateway::new();
        gw.push_text("a");
        let ctx = Context {
            system_prompt: Some("preamble".into()),
            ..Context::default()
        };
        let _ = gw.complete(&ctx, &CompletionOptions::default()).await.unwrap();
        let seen = gw.requests();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].system_prompt.as_deref(), Some("preamble"));
    }
}
