//! Permission types for tool execution control

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

// ============================================================================
// Permission Modes and Destinations
// ============================================================================

/// Permission modes for tool execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PermissionMode {
    /// Default mode - CLI prompts for dangerous tools
    Default,
    /// Auto-accept file edits
    AcceptEdits,
    /// Plan mode
    Plan,
    /// Allow all tools (use with caution)
    BypassPermissions,
}

impl PermissionMode {
    /// The CLI-facing name of this mode
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionMode::Default => "default",
            PermissionMode::AcceptEdits => "acceptEdits",
            PermissionMode::Plan => "plan",
            PermissionMode::BypassPermissions => "bypassPermissions",
        }
    }
}

/// Setting source types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettingSource {
    /// User-level settings
    User,
    /// Project-level settings
    Project,
    /// Local settings
    Local,
}

/// Permission update destination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PermissionUpdateDestination {
    /// Save to user settings
    UserSettings,
    /// Save to project settings
    ProjectSettings,
    /// Save to local settings
    LocalSettings,
    /// Save to session only (temporary)
    Session,
}

/// Permission behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionBehavior {
    /// Allow the action
    Allow,
    /// Deny the action
    Deny,
    /// Ask the user
    Ask,
}

// ============================================================================
// Permission Updates
// ============================================================================

/// Permission rule value
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionRuleValue {
    /// Name of the tool
    #[serde(rename = "toolName", alias = "tool_name")]
    pub tool_name: String,
    /// Optional rule content
    #[serde(
        rename = "ruleContent",
        alias = "rule_content",
        skip_serializing_if = "Option::is_none"
    )]
    pub rule_content: Option<String>,
}

/// Permission update configuration
///
/// Sent inside `updatedPermissions` of an allow result and received inside
/// `permission_suggestions` of a `can_use_tool` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PermissionUpdate {
    /// Add permission rules
    AddRules {
        /// Rules to add
        #[serde(skip_serializing_if = "Option::is_none")]
        rules: Option<Vec<PermissionRuleValue>>,
        /// Behavior the rules grant
        #[serde(skip_serializing_if = "Option::is_none")]
        behavior: Option<PermissionBehavior>,
        /// Where to save the rules
        #[serde(skip_serializing_if = "Option::is_none")]
        destination: Option<PermissionUpdateDestination>,
    },
    /// Replace existing permission rules
    ReplaceRules {
        /// New rules
        #[serde(skip_serializing_if = "Option::is_none")]
        rules: Option<Vec<PermissionRuleValue>>,
        /// Behavior the rules grant
        #[serde(skip_serializing_if = "Option::is_none")]
        behavior: Option<PermissionBehavior>,
        /// Where to save the rules
        #[serde(skip_serializing_if = "Option::is_none")]
        destination: Option<PermissionUpdateDestination>,
    },
    /// Remove permission rules
    RemoveRules {
        /// Rules to remove
        #[serde(skip_serializing_if = "Option::is_none")]
        rules: Option<Vec<PermissionRuleValue>>,
        /// Behavior of the rules to remove
        #[serde(skip_serializing_if = "Option::is_none")]
        behavior: Option<PermissionBehavior>,
        /// Where to remove from
        #[serde(skip_serializing_if = "Option::is_none")]
        destination: Option<PermissionUpdateDestination>,
    },
    /// Set permission mode
    SetMode {
        /// New permission mode
        mode: PermissionMode,
        /// Where to save the mode
        #[serde(skip_serializing_if = "Option::is_none")]
        destination: Option<PermissionUpdateDestination>,
    },
    /// Add directories to allowed list
    AddDirectories {
        /// Directories to add
        #[serde(skip_serializing_if = "Option::is_none")]
        directories: Option<Vec<String>>,
        /// Where to save
        #[serde(skip_serializing_if = "Option::is_none")]
        destination: Option<PermissionUpdateDestination>,
    },
    /// Remove directories from allowed list
    RemoveDirectories {
        /// Directories to remove
        #[serde(skip_serializing_if = "Option::is_none")]
        directories: Option<Vec<String>>,
        /// Where to remove from
        #[serde(skip_serializing_if = "Option::is_none")]
        destination: Option<PermissionUpdateDestination>,
    },
}

// ============================================================================
// Permission Context and Result
// ============================================================================

/// Context for tool permission callbacks
///
/// Built from an inbound `can_use_tool` request. Suggestions the CLI could
/// not express in a typed form are dropped leniently rather than failing the
/// whole request.
#[derive(Clone, Default)]
pub struct ToolPermissionContext {
    /// Session ID, if the session has been established
    pub session_id: Option<String>,
    /// Permission-update suggestions from the CLI
    pub suggestions: Vec<PermissionUpdate>,
    /// Path the CLI blocked, for file-access permission queries
    pub blocked_path: Option<String>,
    /// Cancellation token for aborting long-running checks
    pub cancellation_token: Option<CancellationToken>,
}

impl std::fmt::Debug for ToolPermissionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolPermissionContext")
            .field("session_id", &self.session_id)
            .field("suggestions", &self.suggestions)
            .field("blocked_path", &self.blocked_path)
            .field(
                "cancellation_token",
                &self.cancellation_token.as_ref().map(|_| "<token>"),
            )
            .finish()
    }
}

impl ToolPermissionContext {
    /// Create a new context with suggestions only
    #[must_use]
    pub fn new(suggestions: Vec<PermissionUpdate>) -> Self {
        Self {
            suggestions,
            ..Default::default()
        }
    }

    /// Check if cancellation has been requested
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancellation_token
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
    }
}

/// Permission result for allowing tool use
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PermissionResultAllow {
    /// Modified input for the tool
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_input: Option<serde_json::Value>,
    /// Permission updates to apply
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_permissions: Option<Vec<PermissionUpdate>>,
}

/// Permission result for denying tool use
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionResultDeny {
    /// Reason for denying
    pub message: String,
    /// Whether to interrupt the conversation; an interrupted deny aborts the
    /// agent
    #[serde(default)]
    pub interrupt: bool,
}

/// Permission result enum
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PermissionResult {
    /// Allow the tool use
    Allow(PermissionResultAllow),
    /// Deny the tool use
    Deny(PermissionResultDeny),
}

impl PermissionResult {
    /// Plain allow without input rewriting
    #[must_use]
    pub fn allow() -> Self {
        PermissionResult::Allow(PermissionResultAllow::default())
    }

    /// Deny with a message, without interrupting the agent
    pub fn deny(message: impl Into<String>) -> Self {
        PermissionResult::Deny(PermissionResultDeny {
            message: message.into(),
            interrupt: false,
        })
    }
}

/// Type alias for a shared permission callback
pub type CanUseToolCallback = Arc<dyn crate::callbacks::PermissionCallback>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_mode_wire_names() {
        assert_eq!(
            serde_json::to_string(&PermissionMode::AcceptEdits).unwrap(),
            "\"acceptEdits\""
        );
        assert_eq!(PermissionMode::BypassPermissions.as_str(), "bypassPermissions");
    }

    #[test]
    fn test_permission_update_tagged_camel_case() {
        let update = PermissionUpdate::AddRules {
            rules: Some(vec![PermissionRuleValue {
                tool_name: "Bash".to_string(),
                rule_content: Some("ls *".to_string()),
            }]),
            behavior: Some(PermissionBehavior::Allow),
            destination: Some(PermissionUpdateDestination::Session),
        };

        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(json["type"], "addRules");
        assert_eq!(json["destination"], "session");
        assert_eq!(json["rules"][0]["toolName"], "Bash");
        assert_eq!(json["behavior"], "allow");
    }

    #[test]
    fn test_permission_update_destination_values() {
        let json =
            serde_json::to_string(&PermissionUpdateDestination::ProjectSettings).unwrap();
        assert_eq!(json, "\"projectSettings\"");
    }

    #[test]
    fn test_permission_rule_accepts_snake_case() {
        let json = serde_json::json!({"tool_name": "Read", "rule_content": null});
        let rule: PermissionRuleValue = serde_json::from_value(json).unwrap();
        assert_eq!(rule.tool_name, "Read");
    }

    #[test]
    fn test_deny_interrupt_default() {
        let deny: PermissionResultDeny =
            serde_json::from_value(serde_json::json!({"message": "no"})).unwrap();
        assert!(!deny.interrupt);
    }
}
