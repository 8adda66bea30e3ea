//! # Gateway Trait
//!
//! Core abstraction for language-model backends. Every backend implements
//! [`ModelGateway`] to expose a unified request/response interface: ordered
//! role-tagged messages plus tool descriptors in, assistant text and/or tool
//! calls plus token usage out.
//!
//! Retry policy, request translation, and transport details live behind this
//! boundary — the run controller treats a gateway failure as fatal for the
//! run and never retries here.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use helm_core::messages::{Context, TokenUsage, ToolCall};

/// Result type alias for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Errors that can occur during a model call.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// HTTP request failed (connect, timeout, transport).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Authentication failed (missing or invalid credentials).
    #[error("auth error: {message}")]
    Auth {
        /// Error description.
        message: String,
    },

    /// Backend returned an API error.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error description.
        message: String,
        /// Whether the backend considers this retryable.
        retryable: bool,
    },

    /// Backend returned a response this crate could not interpret.
    #[error("malformed response: {message}")]
    Malformed {
        /// Error description.
        message: String,
    },

    /// Backend-specific error.
    #[error("{message}")]
    Other {
        /// Error description.
        message: String,
    },
}

impl GatewayError {
    /// Whether a caller owning retry policy could retry this error.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(e) => {
                e.is_timeout()
                    || e.is_connect()
                    || e.status().is_some_and(|s| {
                        s == reqwest::StatusCode::TOO_MANY_REQUESTS || s.is_server_error()
                    })
            }
            Self::Api { retryable, .. } => *retryable,
            Self::Auth { .. } | Self::Json(_) | Self::Malformed { .. } | Self::Other { .. } => {
                false
            }
        }
    }

    /// Error category string for logging.
    #[must_use]
    pub fn category(&self) -> &'static str {
        match self {
            Self::Http(_) => "network",
            Self::Json(_) | Self::Malformed { .. } => "parse",
            Self::Auth { .. } => "auth",
            Self::Api { .. } => "api",
            Self::Other { .. } => "unknown",
        }
    }
}

/// Options for a completion request.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionOptions {
    /// Maximum tokens to generate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Thinking-effort hint (`"low"` / `"medium"` / `"high"`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effort: Option<String>,
}

/// A completed model response.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelResponse {
    /// Assistant text, if the model produced any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Tool calls the model requested, in request order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    /// Token accounting for this call.
    pub usage: TokenUsage,
}

impl ModelResponse {
    /// A plain-text response.
    #[must_use]
    pub fn text_only(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    /// Whether the model requested any tool use.
    #[must_use]
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// Core model gateway trait.
#[async_trait]
pub trait ModelGateway: Send + Sync {
    /// Model ID this gateway targets.
    fn model(&self) -> &str;

    /// Execute one completion call.
    async fn complete(
        &self,
        context: &Context,
        options: &CompletionOptions,
    ) -> GatewayResult<ModelResponse>;
}
