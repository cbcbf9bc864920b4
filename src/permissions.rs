//! Permission control for tool usage
//!
//! The CLI consults the SDK before running a tool by sending a
//! `can_use_tool` control request. The [`PermissionManager`] answers it:
//! static allow/deny lists first, then the optional user callback, bounded
//! by the control deadline. Results are encoded with the CLI's field names
//! (`behavior`, `updatedInput`, `updatedPermissions`, `message`,
//! `interrupt`).

use std::sync::RwLock;
use std::time::Duration;

use serde_json::{Value, json};

use crate::error::{ClaudeError, Result};
use crate::types::{
    CanUseToolCallback, PermissionResult, PermissionUpdate, ToolName, ToolPermissionContext,
};

/// Answers `can_use_tool` queries from the CLI
///
/// The base `allowed_tools`/`disallowed_tools` lists come from the options
/// and never change. An agent profile selected at runtime installs a tool
/// overlay that replaces the allow list for as long as the profile is
/// active.
pub struct PermissionManager {
    callback: Option<CanUseToolCallback>,
    allowed_tools: Vec<ToolName>,
    disallowed_tools: Vec<ToolName>,
    agent_tools: RwLock<Option<Vec<ToolName>>>,
    timeout: Duration,
}

impl PermissionManager {
    /// Create a manager from the configured callback and tool lists
    #[must_use]
    pub fn new(
        callback: Option<CanUseToolCallback>,
        allowed_tools: Vec<ToolName>,
        disallowed_tools: Vec<ToolName>,
        timeout: Duration,
    ) -> Self {
        Self {
            callback,
            allowed_tools,
            disallowed_tools,
            agent_tools: RwLock::new(None),
            timeout,
        }
    }

    /// True when a user callback is registered
    #[must_use]
    pub fn has_callback(&self) -> bool {
        self.callback.is_some()
    }

    /// Install or clear the active agent profile's tool list
    ///
    /// While installed, the profile's list replaces `allowed_tools` as the
    /// effective allow set: tools on it are permitted and tools outside it
    /// are denied without consulting the callback. `None` restores the base
    /// configuration.
    pub fn set_agent_tools(&self, tools: Option<Vec<ToolName>>) {
        if let Ok(mut guard) = self.agent_tools.write() {
            *guard = tools;
        }
    }

    /// The allow list currently in effect: the active agent profile's tools,
    /// or the configured `allowed_tools`
    #[must_use]
    pub fn effective_allowed_tools(&self) -> Vec<ToolName> {
        match self.agent_tools.read() {
            Ok(guard) => guard.clone().unwrap_or_else(|| self.allowed_tools.clone()),
            Err(_) => self.allowed_tools.clone(),
        }
    }

    /// Decide whether a tool may run
    ///
    /// Disallowed tools are denied and tools on the effective allow list are
    /// permitted without consulting the callback. An active agent profile
    /// bounds the tool set: anything outside its list is denied. Everything
    /// else goes to the callback under the configured deadline.
    ///
    /// # Errors
    /// Returns an error when no callback is registered for an undecided tool,
    /// when the callback fails, or when it misses its deadline.
    pub async fn can_use_tool(
        &self,
        tool_name: &str,
        tool_input: Value,
        context: ToolPermissionContext,
    ) -> Result<PermissionResult> {
        if self.disallowed_tools.iter().any(|t| t.as_str() == tool_name) {
            return Ok(PermissionResult::deny(format!(
                "Tool '{tool_name}' is disallowed by configuration"
            )));
        }

        let agent_tools = self
            .agent_tools
            .read()
            .ok()
            .and_then(|guard| guard.clone());
        if let Some(tools) = agent_tools {
            return if tools.iter().any(|t| t.as_str() == tool_name) {
                Ok(PermissionResult::allow())
            } else {
                Ok(PermissionResult::deny(format!(
                    "Tool '{tool_name}' is not available to the active agent profile"
                )))
            };
        }

        if self.allowed_tools.iter().any(|t| t.as_str() == tool_name) {
            return Ok(PermissionResult::allow());
        }

        let Some(ref callback) = self.callback else {
            return Err(ClaudeError::control_protocol(
                "can_use_tool requested but no permission callback is registered",
            ));
        };

        let call = callback.call(tool_name.to_string(), tool_input, context);
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_elapsed) => Err(ClaudeError::control_timeout(
                self.timeout.as_millis() as u64,
                "can_use_tool",
            )),
        }
    }
}

impl std::fmt::Debug for PermissionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PermissionManager")
            .field("callback", &self.callback.as_ref().map(|_| "<callback>"))
            .field("allowed_tools", &self.allowed_tools)
            .field("disallowed_tools", &self.disallowed_tools)
            .field(
                "agent_tools",
                &self.agent_tools.read().ok().map(|g| g.clone()),
            )
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Encode a permission result into the CLI's response body
///
/// An allow without `updated_input` echoes the original input back, so the
/// CLI always receives a concrete `updatedInput`.
#[must_use]
pub fn encode_permission_result(result: &PermissionResult, original_input: &Value) -> Value {
    match result {
        PermissionResult::Allow(allow) => {
            let mut body = json!({
                "behavior": "allow",
                "updatedInput": allow
                    .updated_input
                    .clone()
                    .unwrap_or_else(|| original_input.clone()),
            });
            if let Some(ref updates) = allow.updated_permissions {
                body["updatedPermissions"] =
                    serde_json::to_value(updates).unwrap_or(Value::Array(Vec::new()));
            }
            body
        }
        PermissionResult::Deny(deny) => json!({
            "behavior": "deny",
            "message": deny.message,
            "interrupt": deny.interrupt,
        }),
    }
}

/// Parse permission-update suggestions leniently
///
/// Suggestions the CLI sends in a shape this SDK does not know are dropped
/// with a debug log instead of failing the permission request.
#[must_use]
pub fn parse_suggestions(raw: Option<Vec<Value>>) -> Vec<PermissionUpdate> {
    raw.unwrap_or_default()
        .into_iter()
        .filter_map(|value| match serde_json::from_value(value.clone()) {
            Ok(update) => Some(update),
            Err(e) => {
                tracing::debug!(error = %e, suggestion = %value, "Dropping unparseable permission suggestion");
                None
            }
        })
        .collect()
}
