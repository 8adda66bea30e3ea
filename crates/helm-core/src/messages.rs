//! Message types for the conversation transcript.
//!
//! A transcript is an ordered, append-only sequence of [`Message`]s. Four
//! roles: system, user, assistant, and tool. Assistant messages may carry the
//! tool calls the model requested; tool messages carry the correlated
//! results. Messages are immutable once appended.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::tools::Tool;

// ─────────────────────────────────────────────────────────────────────────────
// Tool call / tool result
// ─────────────────────────────────────────────────────────────────────────────

/// A tool invocation requested by the model.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCall {
    /// Call ID, unique within a run, assigned by the model backend.
    pub id: String,
    /// Tool name.
    pub name: String,
    /// Tool arguments (JSON object).
    pub arguments: Map<String, Value>,
}

impl ToolCall {
    /// Create a tool call.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }
}

/// The outcome of one tool invocation, correlated to its call by `call_id`.
///
/// Exactly one of `payload` / `error` is present; the constructors are the
/// only way these are built in practice.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResult {
    /// ID of the tool call this result answers.
    pub call_id: String,
    /// Tool name (redundant with the call, kept for display).
    pub name: String,
    /// Success payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    /// Failure description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolResult {
    /// Build a success result.
    #[must_use]
    pub fn ok(call_id: impl Into<String>, name: impl Into<String>, payload: Value) -> Self {
        Self {
            call_id: call_id.into(),
            name: name.into(),
            payload: Some(payload),
            error: None,
        }
    }

    /// Build a failure result.
    #[must_use]
    pub fn err(
        call_id: impl Into<String>,
        name: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            call_id: call_id.into(),
            name: name.into(),
            payload: None,
            error: Some(error.into()),
        }
    }

    /// Whether this result reports a failure.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Render the result for inclusion in model context.
    #[must_use]
    pub fn render(&self) -> String {
        match (&self.payload, &self.error) {
            (_, Some(e)) => format!("error: {e}"),
            (Some(Value::String(s)), None) => s.clone(),
            (Some(v), None) => v.to_string(),
            (None, None) => String::new(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Message
// ─────────────────────────────────────────────────────────────────────────────

/// Conversation role.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System preamble.
    System,
    /// End-user input.
    User,
    /// Model output.
    Assistant,
    /// Tool results fed back to the model.
    Tool,
}

/// One turn of the transcript.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum Message {
    /// System preamble message.
    System {
        /// Message text.
        content: String,
        /// RFC 3339 creation time.
        timestamp: String,
    },
    /// User message.
    User {
        /// Message text.
        content: String,
        /// RFC 3339 creation time.
        timestamp: String,
    },
    /// Assistant message, optionally carrying requested tool calls.
    Assistant {
        /// Message text (may be empty when the turn is pure tool use).
        content: String,
        /// Tool calls the model requested this turn.
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ToolCall>,
        /// RFC 3339 creation time.
        timestamp: String,
    },
    /// Tool results message.
    Tool {
        /// Results, one per tool call of the preceding assistant message.
        results: Vec<ToolResult>,
        /// RFC 3339 creation time.
        timestamp: String,
    },
}

fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}

impl Message {
    /// Create a system message stamped now.
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self::System {
            content: content.into(),
            timestamp: now_rfc3339(),
        }
    }

    /// Create a user message stamped now.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::User {
            content: content.into(),
            timestamp: now_rfc3339(),
        }
    }

    /// Create an assistant message stamped now.
    #[must_use]
    pub fn assistant(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self::Assistant {
            content: content.into(),
            tool_calls,
            timestamp: now_rfc3339(),
        }
    }

    /// Create a tool-results message stamped now.
    #[must_use]
    pub fn tool(results: Vec<ToolResult>) -> Self {
        Self::Tool {
            results,
            timestamp: now_rfc3339(),
        }
    }

    /// The message's role.
    #[must_use]
    pub fn role(&self) -> Role {
        match self {
            Self::System { .. } => Role::System,
            Self::User { .. } => Role::User,
            Self::Assistant { .. } => Role::Assistant,
            Self::Tool { .. } => Role::Tool,
        }
    }

    /// Text content, if the role carries any.
    #[must_use]
    pub fn content(&self) -> Option<&str> {
        match self {
            Self::System { content, .. }
            | Self::User { content, .. }
            | Self::Assistant { content, .. } => Some(content),
            Self::Tool { .. } => None,
        }
    }

    /// Tool calls requested, for assistant messages.
    #[must_use]
    pub fn tool_calls(&self) -> &[ToolCall] {
        match self {
            Self::Assistant { tool_calls, .. } => tool_calls,
            _ => &[],
        }
    }

    /// Tool results carried, for tool messages.
    #[must_use]
    pub fn tool_results(&self) -> &[ToolResult] {
        match self {
            Self::Tool { results, .. } => results,
            _ => &[],
        }
    }

    /// The message's timestamp.
    #[must_use]
    pub fn timestamp(&self) -> &str {
        match self {
            Self::System { timestamp, .. }
            | Self::User { timestamp, .. }
            | Self::Assistant { timestamp, .. }
            | Self::Tool { timestamp, .. } => timestamp,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Model context
// ─────────────────────────────────────────────────────────────────────────────

/// The context handed to a model gateway call: the system preamble, the
/// trailing transcript window, and the tools the model may use.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Context {
    /// System preamble.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    /// Ordered conversation messages.
    pub messages: Vec<Message>,
    /// Tool descriptors advertised to the model.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<Tool>>,
}

/// Token usage reported by a model backend.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsage {
    /// Input (prompt) tokens.
    pub input_tokens: u64,
    /// Output (completion) tokens.
    pub output_tokens: u64,
}

impl TokenUsage {
    /// Sum two usage records.
    #[must_use]
    pub fn add(self, other: Self) -> Self {
        Self {
            input_tokens: self.input_tokens + other.input_tokens,
            output_tokens: self.output_tokens + other.output_tokens,
        }
    }
}
