//! Per-tool invocation policy.
//!
//! Each registered tool name can carry a [`ToolPolicy`]: an enabled flag plus
//! allow/deny pattern lists. Patterns are regular expressions evaluated
//! against the invocation's string argument values.
//!
//! Evaluation order: disabled → rejected; any deny pattern matches →
//! rejected; allow list configured and nothing matches → rejected; otherwise
//! permitted.

use regex::Regex;
use serde_json::{Map, Value};

/// Policy attached to one tool name.
#[derive(Clone, Debug, Default)]
pub struct ToolPolicy {
    disabled: bool,
    allow: Vec<Regex>,
    deny: Vec<Regex>,
}

impl ToolPolicy {
    /// Build a policy from raw pattern strings. Invalid patterns are
    /// rejected so a typo never silently widens the policy.
    pub fn new(
        enabled: bool,
        allow: &[String],
        deny: &[String],
    ) -> Result<Self, regex::Error> {
        Ok(Self {
            disabled: !enabled,
            allow: compile(allow)?,
            deny: compile(deny)?,
        })
    }

    /// A policy that disables the tool outright.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            disabled: true,
            ..Self::default()
        }
    }

    /// Whether the tool is enabled at all (catalog visibility).
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        !self.disabled
    }

    /// Evaluate an invocation. Returns a denial reason on rejection.
    pub fn evaluate(&self, tool_name: &str, args: &Map<String, Value>) -> Result<(), String> {
        if self.disabled {
            return Err(format!("tool '{tool_name}' is disabled"));
        }

        let haystacks = argument_strings(args);

        if let Some(pattern) = self
            .deny
            .iter()
            .find(|p| haystacks.iter().any(|h| p.is_match(h)))
        {
            return Err(format!(
                "invocation of '{tool_name}' matches deny pattern '{pattern}'"
            ));
        }

        if !self.allow.is_empty()
            && !self
                .allow
                .iter()
                .any(|p| haystacks.iter().any(|h| p.is_match(h)))
        {
            return Err(format!(
                "invocation of '{tool_name}' matches no allow pattern"
            ));
        }

        Ok(())
    }
}

fn compile(patterns: &[String]) -> Result<Vec<Regex>, regex::Error> {
    patterns.iter().map(|p| Regex::new(p)).collect()
}

/// String views of the invocation the patterns are matched against.
fn argument_strings(args: &Map<String, Value>) -> Vec<String> {
    args.values()
        .map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .collect()
}
