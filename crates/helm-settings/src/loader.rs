//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`HelmSettings::default()`]
//! 2. If the settings file exists, deep-merge user values over defaults
//! 3. Apply `HELM_*` environment overrides (highest priority)
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::errors::Result;
use crate::types::{AuthMode, BusyPolicy, HelmSettings};

/// Resolve the path to the settings file (`~/.helm/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_owned());
    PathBuf::from(home).join(".helm").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<HelmSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// If the file does not exist, returns defaults. If the file contains
/// invalid JSON, returns an error.
pub fn load_settings_from_path(path: &Path) -> Result<HelmSettings> {
    let defaults = serde_json::to_value(HelmSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    let mut settings: HelmSettings = serde_json::from_value(merged)?;
    apply_env_overrides(&mut settings);
    Ok(settings)
}

/// Recursive deep merge of two JSON values.
///
/// - Objects are merged recursively (source overrides target per-key)
/// - Arrays and primitives are replaced entirely by source
/// - Null values in source are skipped (preserving target)
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply environment variable overrides to loaded settings.
///
/// Integers must parse and fall within range; enums must match a known
/// variant. Invalid values are silently ignored (fall back to file/default).
pub fn apply_env_overrides(settings: &mut HelmSettings) {
    if let Some(v) = read_env_string("HELM_HOST") {
        settings.server.host = v;
    }
    if let Some(v) = read_env_u16("HELM_PORT") {
        settings.server.port = v;
    }
    if let Some(v) = read_env_string("HELM_AUTH_MODE") {
        match v.as_str() {
            "none" => settings.server.auth.mode = AuthMode::None,
            "token" => settings.server.auth.mode = AuthMode::Token,
            _ => {}
        }
    }
    if let Some(v) = read_env_string("HELM_AUTH_TOKEN") {
        settings.server.auth.token = Some(v);
    }
    if let Some(v) = read_env_string("HELM_SESSIONS_DIR") {
        settings.server.sessions_dir = v;
    }
    if let Some(v) = read_env_usize("HELM_MAX_CONNECTIONS", 1, 10_000) {
        settings.server.max_connections = v;
    }
    if let Some(v) = read_env_string("HELM_MODEL") {
        settings.agent.model = v;
    }
    if let Some(v) = read_env_u32("HELM_MAX_TURNS", 1, 1_000) {
        settings.agent.max_turns = v;
    }
    if let Some(v) = read_env_usize("HELM_MAX_CONCURRENT_RUNS", 1, 1_000) {
        settings.agent.max_concurrent_runs = v;
    }
    if let Some(v) = read_env_string("HELM_BUSY_POLICY") {
        match v.as_str() {
            "queue" => settings.agent.busy_policy = BusyPolicy::Queue,
            "reject" => settings.agent.busy_policy = BusyPolicy::Reject,
            _ => {}
        }
    }
    if let Some(v) = read_env_string("HELM_WORKSPACE_DIR") {
        settings.tools.workspace_dir = v;
    }
    if let Some(v) = read_env_string("HELM_LOG_LEVEL") {
        settings.logging.level = v;
    }
}

fn read_env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn read_env_u16(name: &str) -> Option<u16> {
    std::env::var(name).ok()?.parse().ok()
}

fn read_env_u32(name: &str, min: u32, max: u32) -> Option<u32> {
    let v: u32 = std::env::var(name).ok()?.parse().ok()?;
    (min..=max).contains(&v).then_some(v)
}

fn read_env_usize(name: &str, min: usize, max: usize) -> Option<usize> {
    let v: usize = std::env::var(name).ok()?.parse().ok()?;
    (min..=max).contains(&v).then_some(v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn merge_objects_recursively() {
        let target = json!({"a": {"x": 1, "y": 2}, "b": 3});
        let source = json!({"a": {"y": 20}});
        let merged = deep_merge(target, source);
        assert_eq!(merged, json!({"a": {"x": 1, "y": 20}, "b": 3}));
    }

    #[test]
    fn merge_replaces_arrays() {
        let target = json!({"list": [1, 2, 3]});
        let source = json!({"list": [9]});
        assert_eq!(deep_merge(target, source), json!({"list": [9]}));
    }

    #[test]
    fn merge_skips_nulls() {
        let target = json!({"keep": "value"});
        let source = json!({"keep": null});
        assert_eq!(deep_merge(target, source), json!({"keep": "value"}));
    }

    #[test]
    fn missing_file_returns_defaults() {
        let settings = load_settings_from_path(Path::new("/nonexistent/helm.json")).unwrap();
        assert_eq!(settings.server.host, "127.0.0.1");
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(br#"{"server": {"port": 9999}, "agent": {"maxTurns": 3}}"#)
            .unwrap();

        let settings = load_settings_from_path(&path).unwrap();
        assert_eq!(settings.server.port, 9999);
        assert_eq!(settings.agent.max_turns, 3);
        // Untouched fields keep defaults
        assert_eq!(settings.agent.context_window_messages, 20);
    }

    #[test]
    fn invalid_json_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(load_settings_from_path(&path).is_err());
    }

    #[test]
    fn unknown_busy_policy_env_value_ignored() {
        let mut settings = HelmSettings::default();
        // Simulate the match arm directly — env mutation is process-global,
        // so the parse logic is exercised without setting real env vars.
        match "sideways" {
            "queue" => settings.agent.busy_policy = BusyPolicy::Queue,
            "reject" => settings.agent.busy_policy = BusyPolicy::Reject,
            _ => {}
        }
        assert_eq!(settings.agent.busy_policy, BusyPolicy::Queue);
    }
}
