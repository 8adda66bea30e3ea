//! Run record and controller configuration.

use serde::{Deserialize, Serialize};

use helm_core::messages::TokenUsage;
use helm_settings::{AgentSettings, BusyPolicy, ToolsSettings};

/// Lifecycle state of a run.
///
/// `Pending -> Running -> {Completed, Error, Cancelled}`; the three terminal
/// states are final.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// Created, not yet executing (possibly queued behind a busy session).
    Pending,
    /// The loop is executing.
    Running,
    /// Finished with a final assistant answer.
    Completed,
    /// Aborted with a failure (model backend error, iteration limit, storage).
    Error,
    /// Cancelled at a suspension point.
    Cancelled,
}

impl RunStatus {
    /// Whether this state admits no further transitions.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Error | Self::Cancelled)
    }
}

/// One execution of the agent loop, bound to a session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Run {
    /// Run ID (caller-supplied or generated).
    pub id: String,
    /// Owning session.
    pub session_id: String,
    /// Lifecycle state.
    pub status: RunStatus,
    /// RFC 3339 creation time.
    pub started_at: String,
    /// RFC 3339 terminal time; absent until terminal.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<String>,
    /// Failure description; present only in the error state.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Turns executed so far.
    pub turns: u32,
    /// Token usage accumulated across the run's model calls.
    pub usage: TokenUsage,
}

impl Run {
    /// Create a pending run stamped now.
    #[must_use]
    pub fn new(id: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            session_id: session_id.into(),
            status: RunStatus::Pending,
            started_at: chrono::Utc::now().to_rfc3339(),
            ended_at: None,
            error: None,
            turns: 0,
            usage: TokenUsage::default(),
        }
    }
}

/// Run controller configuration.
#[derive(Clone, Debug)]
pub struct ControllerConfig {
    /// Maximum turns per run.
    pub max_turns: u32,
    /// Trailing transcript window handed to the model each turn.
    pub context_window: usize,
    /// Maximum concurrently executing runs across all sessions.
    pub max_concurrent_runs: usize,
    /// Busy-session policy.
    pub busy_policy: BusyPolicy,
    /// Model gateway call timeout.
    pub model_timeout: std::time::Duration,
    /// Thinking-effort hint forwarded to the gateway.
    pub effort: Option<String>,
    /// Workspace directory tool invocations run against.
    pub workspace_dir: String,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self::from_settings(&AgentSettings::default(), &ToolsSettings::default())
    }
}

impl ControllerConfig {
    /// Build a config from loaded settings.
    #[must_use]
    pub fn from_settings(agent: &AgentSettings, tools: &ToolsSettings) -> Self {
        Self {
            max_turns: agent.max_turns,
            context_window: agent.context_window_messages,
            max_concurrent_runs: agent.max_concurrent_runs,
            busy_policy: agent.busy_policy,
            model_timeout: std::time::Duration::from_secs(agent.model_timeout_secs),
            effort: agent.effort.clone(),
            workspace_dir: tools.workspace_dir.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_terminality() {
        assert!(!RunStatus::Pending.is_terminal());
        assert!(!RunStatus::Running.is_terminal());
        assert!(RunStatus::Completed.is_terminal());
        assert!(RunStatus::Error.is_terminal());
        assert!(RunStatus::Cancelled.is_terminal());
    }

    #[test]
    fn new_run_is_pending() {
        let run = Run::new("r1", "s1");
        assert_eq!(run.status, RunStatus::Pending);
        assert!(run.ended_at.is_none());
        assert!(run.error.is_none());
        assert_eq!(run.turns, 0);
    }

    #[test]
    fn run_serializes_camel_case() {
        let run = Run::new("r1", "s1");
        let v: serde_json::Value = serde_json::to_value(&run).unwrap();
        assert_eq!(v["sessionId"], "s1");
        assert_eq!(v["status"], "pending");
        assert!(v.get("endedAt").is_none());
        assert!(v.get("error").is_none());
    }

    #[test]
    fn config_defaults_follow_settings() {
        let config = ControllerConfig::default();
        assert_eq!(config.max_turns, 10);
        assert_eq!(config.context_window, 20);
        assert_eq!(config.busy_policy, BusyPolicy::Queue);
    }
}
