//! Settings types.
//!
//! Every field has a compiled default so a missing or partial settings file
//! always yields a runnable configuration.

use serde::{Deserialize, Serialize};

/// Root settings object.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HelmSettings {
    /// Gateway server settings.
    pub server: ServerSettings,
    /// Run controller settings.
    pub agent: AgentSettings,
    /// Tool broker settings.
    pub tools: ToolsSettings,
    /// Logging settings.
    pub logging: LoggingSettings,
}

/// Client authentication mode for the gateway.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    /// No check — every connection is accepted.
    #[default]
    None,
    /// Bearer token compared for exact equality against `token`.
    Token,
}

/// Gateway authentication settings.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AuthSettings {
    /// Authentication mode.
    pub mode: AuthMode,
    /// Shared secret for [`AuthMode::Token`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

/// Gateway server settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// Host to bind.
    pub host: String,
    /// Port to bind (0 for auto-assign).
    pub port: u16,
    /// Client authentication.
    pub auth: AuthSettings,
    /// Maximum concurrent WebSocket connections.
    pub max_connections: usize,
    /// Heartbeat ping interval in seconds.
    pub heartbeat_interval_secs: u64,
    /// Disconnect clients unresponsive for this many seconds.
    pub heartbeat_timeout_secs: u64,
    /// Maximum inbound frame size in bytes.
    pub max_message_size: usize,
    /// Per-request handler timeout in seconds (bounds a full `agent` run).
    pub request_timeout_secs: u64,
    /// Directory where session transcripts are persisted.
    pub sessions_dir: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_owned());
        Self {
            host: "127.0.0.1".into(),
            port: 7520,
            auth: AuthSettings::default(),
            max_connections: 50,
            heartbeat_interval_secs: 30,
            heartbeat_timeout_secs: 90,
            max_message_size: 4 * 1024 * 1024,
            request_timeout_secs: 600,
            sessions_dir: format!("{home}/.helm/sessions"),
        }
    }
}

/// Policy for a second run arriving while a session is busy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BusyPolicy {
    /// Wait for the active run to finish, then execute (serialized).
    #[default]
    Queue,
    /// Fail immediately with a session-busy error.
    Reject,
}

/// Run controller settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AgentSettings {
    /// Model ID handed to the model gateway.
    pub model: String,
    /// Optional thinking-effort hint (`"low"` / `"medium"` / `"high"`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effort: Option<String>,
    /// Maximum turns per run before aborting with an iteration-limit error.
    pub max_turns: u32,
    /// Trailing transcript window handed to the model each turn.
    pub context_window_messages: usize,
    /// Maximum runs executing concurrently across all sessions.
    pub max_concurrent_runs: usize,
    /// Busy-session policy.
    pub busy_policy: BusyPolicy,
    /// Model gateway call timeout in seconds.
    pub model_timeout_secs: u64,
    /// Tool dispatch timeout in seconds.
    pub tool_timeout_secs: u64,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            model: "claude-sonnet-4-5".into(),
            effort: None,
            max_turns: 10,
            context_window_messages: 20,
            max_concurrent_runs: 8,
            busy_policy: BusyPolicy::Queue,
            model_timeout_secs: 120,
            tool_timeout_secs: 60,
        }
    }
}

/// Tool broker settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ToolsSettings {
    /// Tool names disabled outright.
    pub disabled: Vec<String>,
    /// Allow patterns (regex over string argument values); empty means all.
    pub allow: Vec<String>,
    /// Deny patterns (regex over string argument values).
    pub deny: Vec<String>,
    /// Workspace directory filesystem/shell tools are rooted at.
    pub workspace_dir: String,
    /// Shell command timeout in milliseconds.
    pub shell_timeout_ms: u64,
    /// Maximum bytes of tool output kept before truncation.
    pub max_output_bytes: usize,
}

impl Default for ToolsSettings {
    fn default() -> Self {
        Self {
            disabled: Vec::new(),
            allow: Vec::new(),
            deny: Vec::new(),
            workspace_dir: ".".into(),
            shell_timeout_ms: 120_000,
            max_output_bytes: 64 * 1024,
        }
    }
}

/// Logging settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default filter directive when `RUST_LOG` is unset.
    pub level: String,
    /// Emit JSON-formatted log lines.
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_mode_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&AuthMode::None).unwrap(), "\"none\"");
        assert_eq!(serde_json::to_string(&AuthMode::Token).unwrap(), "\"token\"");
    }

    #[test]
    fn busy_policy_default_is_queue() {
        assert_eq!(BusyPolicy::default(), BusyPolicy::Queue);
        let parsed: BusyPolicy = serde_json::from_str("\"reject\"").unwrap();
        assert_eq!(parsed, BusyPolicy::Reject);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let settings: HelmSettings =
            serde_json::from_str(r#"{"server": {"port": 9000}}"#).unwrap();
        assert_eq!(settings.server.port, 9000);
        assert_eq!(settings.server.host, "127.0.0.1");
        assert_eq!(settings.agent.max_turns, 10);
    }

    #[test]
    fn roundtrip() {
        let settings = HelmSettings::default();
        let json = serde_json::to_string(&settings).unwrap();
        let back: HelmSettings = serde_json::from_str(&json).unwrap();
        assert_eq!(back.server.port, settings.server.port);
        assert_eq!(back.agent.busy_policy, settings.agent.busy_policy);
        assert_eq!(back.tools.shell_timeout_ms, settings.tools.shell_timeout_ms);
    }

    #[test]
    fn token_omitted_when_absent() {
        let json = serde_json::to_string(&AuthSettings::default()).unwrap();
        assert!(!json.contains("token"));
    }
}
