//! Run lifecycle events.
//!
//! [`RunEvent`]s are produced by the run controller as a run progresses and
//! broadcast to gateway clients. Events of a single run are emitted in
//! production order; terminal events (`run.completed` / `run.failed` /
//! `run.cancelled`) are the last events of that run's stream.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::messages::{TokenUsage, ToolResult};

/// Fields common to every run event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaseEvent {
    /// Run this event belongs to.
    pub run_id: String,
    /// Session the run is bound to.
    pub session_id: String,
    /// ISO 8601 timestamp.
    pub timestamp: String,
}

impl BaseEvent {
    /// Create a new base event with the current UTC timestamp.
    #[must_use]
    pub fn now(run_id: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            session_id: session_id.into(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Events emitted over a run's lifetime.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RunEvent {
    /// The run transitioned to running; the loop is about to start.
    #[serde(rename = "run.started")]
    RunStarted {
        /// Base fields.
        #[serde(flatten)]
        base: BaseEvent,
    },

    /// A turn of the loop started.
    #[serde(rename = "turn.started")]
    TurnStarted {
        /// Base fields.
        #[serde(flatten)]
        base: BaseEvent,
        /// 1-based turn number.
        turn: u32,
    },

    /// Incremental assistant text for the current turn.
    #[serde(rename = "agent.content")]
    Content {
        /// Base fields.
        #[serde(flatten)]
        base: BaseEvent,
        /// Assistant text fragment.
        text: String,
    },

    /// A tool dispatch started.
    #[serde(rename = "tool.started")]
    ToolStarted {
        /// Base fields.
        #[serde(flatten)]
        base: BaseEvent,
        /// Tool call ID.
        call_id: String,
        /// Tool name.
        name: String,
        /// Invocation arguments.
        arguments: Map<String, Value>,
    },

    /// A tool dispatch finished (success or captured failure).
    #[serde(rename = "tool.completed")]
    ToolCompleted {
        /// Base fields.
        #[serde(flatten)]
        base: BaseEvent,
        /// Tool call ID.
        call_id: String,
        /// Tool name.
        name: String,
        /// Wall-clock duration in milliseconds.
        duration_ms: u64,
        /// The result fed back to the model.
        result: ToolResult,
    },

    /// A turn of the loop completed.
    #[serde(rename = "turn.completed")]
    TurnCompleted {
        /// Base fields.
        #[serde(flatten)]
        base: BaseEvent,
        /// 1-based turn number.
        turn: u32,
        /// Wall-clock duration in milliseconds.
        duration_ms: u64,
        /// Tokens consumed by this turn's model call.
        #[serde(skip_serializing_if = "Option::is_none")]
        token_usage: Option<TokenUsage>,
    },

    /// Terminal: the loop finished with a final assistant answer.
    #[serde(rename = "run.completed")]
    RunCompleted {
        /// Base fields.
        #[serde(flatten)]
        base: BaseEvent,
        /// Turns executed.
        turns: u32,
    },

    /// Terminal: the run aborted with an error.
    #[serde(rename = "run.failed")]
    RunFailed {
        /// Base fields.
        #[serde(flatten)]
        base: BaseEvent,
        /// Failure description.
        error: String,
    },

    /// Terminal: the run was cancelled at a suspension point.
    #[serde(rename = "run.cancelled")]
    RunCancelled {
        /// Base fields.
        #[serde(flatten)]
        base: BaseEvent,
    },
}

impl RunEvent {
    /// Wire name of this event.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::RunStarted { .. } => "run.started",
            Self::TurnStarted { .. } => "turn.started",
            Self::Content { .. } => "agent.content",
            Self::ToolStarted { .. } => "tool.started",
            Self::ToolCompleted { .. } => "tool.completed",
            Self::TurnCompleted { .. } => "turn.completed",
            Self::RunCompleted { .. } => "run.completed",
            Self::RunFailed { .. } => "run.failed",
            Self::RunCancelled { .. } => "run.cancelled",
        }
    }

    /// Base fields of the event.
    #[must_use]
    pub fn base(&self) -> &BaseEvent {
        match self {
            Self::RunStarted { base }
            | Self::TurnStarted { base, .. }
            | Self::Content { base, .. }
            | Self::ToolStarted { base, .. }
            | Self::ToolCompleted { base, .. }
            | Self::TurnCompleted { base, .. }
            | Self::RunCompleted { base, .. }
            | Self::RunFailed { base, .. }
            | Self::RunCancelled { base } => base,
        }
    }

    /// Session the event belongs to.
    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.base().session_id
    }

    /// Run the event belongs to.
    #[must_use]
    pub fn run_id(&self) -> &str {
        &self.base().run_id
    }

    /// Whether this event closes its run's stream.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::RunCompleted { .. } | Self::RunFailed { .. } | Self::RunCancelled { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn event_type_names() {
        let base = BaseEvent::now("r1", "s1");
        let ev = RunEvent::RunStarted { base: base.clone() };
        assert_eq!(ev.event_type(), "run.started");
        let ev = RunEvent::Content { base, text: "hi".into() };
        assert_eq!(ev.event_type(), "agent.content");
    }

    #[test]
    fn base_accessors() {
        let ev = RunEvent::TurnStarted {
            base: BaseEvent::now("run_9", "sess_3"),
            turn: 2,
        };
        assert_eq!(ev.run_id(), "run_9");
        assert_eq!(ev.session_id(), "sess_3");
    }

    #[test]
    fn terminal_classification() {
        let base = BaseEvent::now("r", "s");
        assert!(RunEvent::RunCompleted { base: base.clone(), turns: 1 }.is_terminal());
        assert!(RunEvent::RunFailed { base: base.clone(), error: "x".into() }.is_terminal());
        assert!(RunEvent::RunCancelled { base: base.clone() }.is_terminal());
        assert!(!RunEvent::TurnStarted { base, turn: 1 }.is_terminal());
    }

    #[test]
    fn serializes_with_type_tag_and_flattened_base() {
        let ev = RunEvent::ToolStarted {
            base: BaseEvent::now("r1", "s1"),
            call_id: "tc_1".into(),
            name: "shell".into(),
            arguments: serde_json::Map::new(),
        };
        let v: Value = serde_json::to_value(&ev).unwrap();
        assert_eq!(v["type"], "tool.started");
        assert_eq!(v["runId"], "r1");
        assert_eq!(v["sessionId"], "s1");
        assert_eq!(v["name"], "shell");
    }

    #[test]
    fn roundtrip_tool_completed() {
        let ev = RunEvent::ToolCompleted {
            base: BaseEvent::now("r1", "s1"),
            call_id: "tc_1".into(),
            name: "shell".into(),
            duration_ms: 12,
            result: ToolResult::ok("tc_1", "shell", json!("out")),
        };
        let back: RunEvent =
            serde_json::from_str(&serde_json::to_string(&ev).unwrap()).unwrap();
        assert_eq!(back, ev);
    }

    #[test]
    fn turn_completed_omits_missing_usage() {
        let ev = RunEvent::TurnCompleted {
            base: BaseEvent::now("r1", "s1"),
            turn: 1,
            duration_ms: 3,
            token_usage: None,
        };
        let json = serde_json::to_string(&ev).unwrap();
        assert!(!json.contains("tokenUsage"));
    }
}
