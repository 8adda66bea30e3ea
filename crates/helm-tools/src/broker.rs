//! Tool broker — registration, policy-filtered resolution, and execution.
//!
//! The broker is assembled once at startup and shared immutably afterwards,
//! so lookups need no locking. `execute` is the single entry point the run
//! controller uses; it never returns an error — every failure is folded into
//! the returned [`ToolResult`].

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, instrument, warn};

use helm_core::messages::{ToolCall, ToolResult};
use helm_core::tools::Tool;

use crate::errors::ToolError;
use crate::policy::ToolPolicy;
use crate::traits::{HelmTool, ToolContext};

/// Default per-dispatch timeout when neither the broker nor the tool
/// overrides it.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Central broker mapping tool names to implementations plus policy.
pub struct ToolBroker {
    tools: HashMap<String, Arc<dyn HelmTool>>,
    policies: HashMap<String, ToolPolicy>,
    default_timeout: Duration,
}

impl ToolBroker {
    /// Create an empty broker with the default dispatch timeout.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
            policies: HashMap::new(),
            default_timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Override the default dispatch timeout.
    #[must_use]
    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Register a tool. Re-registration under an existing name replaces it.
    pub fn register(&mut self, tool: Arc<dyn HelmTool>) {
        debug!(tool_name = tool.name(), "tool registered");
        let _ = self.tools.insert(tool.name().to_owned(), tool);
    }

    /// Attach a policy to a tool name.
    pub fn set_policy(&mut self, name: impl Into<String>, policy: ToolPolicy) {
        let _ = self.policies.insert(name.into(), policy);
    }

    fn policy_for(&self, name: &str) -> ToolPolicy {
        self.policies.get(name).cloned().unwrap_or_default()
    }

    /// Look up an enabled tool by name.
    #[must_use]
    pub fn resolve(&self, name: &str) -> Option<Arc<dyn HelmTool>> {
        if !self.policy_for(name).is_enabled() {
            return None;
        }
        self.tools.get(name).cloned()
    }

    /// Definitions of currently enabled tools, sorted by name.
    #[must_use]
    pub fn catalog(&self) -> Vec<Tool> {
        let mut defs: Vec<Tool> = self
            .tools
            .values()
            .filter(|t| self.policy_for(t.name()).is_enabled())
            .map(|t| t.definition())
            .collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }

    /// Names of all registered tools (enabled or not), sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    /// Whether any tools are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Execute a tool call end to end: resolve, check policy, validate
    /// required arguments, run with a timeout, and normalize the outcome.
    #[instrument(skip_all, fields(tool_name = call.name, call_id = call.id))]
    pub async fn execute(&self, call: &ToolCall, ctx: &ToolContext) -> ToolResult {
        match self.try_execute(call, ctx).await {
            Ok(payload) => ToolResult::ok(&call.id, &call.name, payload),
            Err(e) => {
                warn!(tool_name = call.name, error = %e, "tool call failed");
                ToolResult::err(&call.id, &call.name, e.to_string())
            }
        }
    }

    async fn try_execute(&self, call: &ToolCall, ctx: &ToolContext) -> Result<Value, ToolError> {
        let Some(tool) = self.tools.get(&call.name) else {
            return Err(ToolError::UnknownTool(call.name.clone()));
        };

        self.policy_for(&call.name)
            .evaluate(&call.name, &call.arguments)
            .map_err(ToolError::Denied)?;

        validate_required(&tool.definition(), &call.arguments)?;

        let timeout = tool
            .timeout_ms()
            .map_or(self.default_timeout, Duration::from_millis);

        match tokio::time::timeout(timeout, tool.execute(call.arguments.clone(), ctx)).await {
            Ok(result) => result,
            Err(_elapsed) => Err(ToolError::Timeout(
                u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            )),
        }
    }
}

impl Default for ToolBroker {
    fn default() -> Self {
        Self::new()
    }
}

/// Check the declared `required` schema fields are present.
fn validate_required(
    definition: &Tool,
    args: &serde_json::Map<String, Value>,
) -> Result<(), ToolError> {
    if let Some(required) = &definition.parameters.required {
        for field in required {
            if !args.contains_key(field) {
                return Err(ToolError::InvalidArguments(format!(
                    "missing required argument '{field}'"
                )));
            }
        }
    }
    Ok(())
}
