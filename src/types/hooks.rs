//! Hook types for event handling

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::permissions::PermissionBehavior;

// ============================================================================
// Hook Events
// ============================================================================

/// Hook event types
///
/// Serialized with the PascalCase names the CLI uses in its hooks table
/// (`"PreToolUse"`, `"UserPromptSubmit"`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HookEvent {
    /// Before a tool is used
    PreToolUse,
    /// After a tool is used
    PostToolUse,
    /// After a tool use fails
    PostToolUseFailure,
    /// When a notification is received
    Notification,
    /// When user submits a prompt
    UserPromptSubmit,
    /// When a session starts
    SessionStart,
    /// When a session ends
    SessionEnd,
    /// When conversation stops
    Stop,
    /// When a subagent starts
    SubagentStart,
    /// When a subagent stops
    SubagentStop,
    /// Before compacting the conversation
    PreCompact,
    /// When a permission is requested
    PermissionRequest,
}

impl HookEvent {
    /// The CLI-facing name of this event
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            HookEvent::PreToolUse => "PreToolUse",
            HookEvent::PostToolUse => "PostToolUse",
            HookEvent::PostToolUseFailure => "PostToolUseFailure",
            HookEvent::Notification => "Notification",
            HookEvent::UserPromptSubmit => "UserPromptSubmit",
            HookEvent::SessionStart => "SessionStart",
            HookEvent::SessionEnd => "SessionEnd",
            HookEvent::Stop => "Stop",
            HookEvent::SubagentStart => "SubagentStart",
            HookEvent::SubagentStop => "SubagentStop",
            HookEvent::PreCompact => "PreCompact",
            HookEvent::PermissionRequest => "PermissionRequest",
        }
    }
}

// ============================================================================
// Hook Output
// ============================================================================

/// Event-specific hook output, versioned by the `hookEventName` discriminant
///
/// This is the `hookSpecificOutput` envelope of the wire format. A
/// `PreToolUse` hook answers the permission question; context-carrying events
/// inject additional system context.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "hookEventName")]
pub enum HookSpecificOutput {
    /// Permission decision for a tool about to run
    PreToolUse {
        /// allow / deny / ask
        #[serde(
            rename = "permissionDecision",
            skip_serializing_if = "Option::is_none"
        )]
        permission_decision: Option<PermissionBehavior>,
        /// Human-readable reason for the decision
        #[serde(
            rename = "permissionDecisionReason",
            skip_serializing_if = "Option::is_none"
        )]
        permission_decision_reason: Option<String>,
        /// Replacement tool input
        #[serde(rename = "updatedInput", skip_serializing_if = "Option::is_none")]
        updated_input: Option<serde_json::Value>,
    },
    /// Context injected after a tool ran
    PostToolUse {
        /// Additional system-context text
        #[serde(
            rename = "additionalContext",
            skip_serializing_if = "Option::is_none"
        )]
        additional_context: Option<String>,
    },
    /// Context injected alongside the user prompt
    UserPromptSubmit {
        /// Additional system-context text
        #[serde(
            rename = "additionalContext",
            skip_serializing_if = "Option::is_none"
        )]
        additional_context: Option<String>,
    },
    /// Context injected when the session starts
    SessionStart {
        /// Additional system-context text
        #[serde(
            rename = "additionalContext",
            skip_serializing_if = "Option::is_none"
        )]
        additional_context: Option<String>,
    },
    /// Context injected before compaction
    PreCompact {
        /// Additional system-context text
        #[serde(
            rename = "additionalContext",
            skip_serializing_if = "Option::is_none"
        )]
        additional_context: Option<String>,
    },
}

impl HookSpecificOutput {
    /// Permission decision carried by this output, if any
    #[must_use]
    pub fn permission_decision(&self) -> Option<PermissionBehavior> {
        match self {
            HookSpecificOutput::PreToolUse {
                permission_decision,
                ..
            } => *permission_decision,
            _ => None,
        }
    }

    /// Additional context carried by this output, if any
    #[must_use]
    pub fn additional_context(&self) -> Option<&str> {
        match self {
            HookSpecificOutput::PostToolUse {
                additional_context, ..
            }
            | HookSpecificOutput::UserPromptSubmit {
                additional_context, ..
            }
            | HookSpecificOutput::SessionStart {
                additional_context, ..
            }
            | HookSpecificOutput::PreCompact {
                additional_context, ..
            } => additional_context.as_deref(),
            HookSpecificOutput::PreToolUse { .. } => None,
        }
    }
}

/// Hook output returned by a callback
///
/// A default value means "no opinion". Field names follow the CLI's camelCase
/// wire format.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HookOutput {
    /// Whether the agent should continue; `false` halts execution
    #[serde(rename = "continue", skip_serializing_if = "Option::is_none")]
    pub continue_: Option<bool>,
    /// Reason shown when stopping
    #[serde(rename = "stopReason", skip_serializing_if = "Option::is_none")]
    pub stop_reason: Option<String>,
    /// Suppress the intercepted output
    #[serde(rename = "suppressOutput", skip_serializing_if = "Option::is_none")]
    pub suppress_output: Option<bool>,
    /// System message to surface to the user
    #[serde(rename = "systemMessage", skip_serializing_if = "Option::is_none")]
    pub system_message: Option<String>,
    /// Event-specific output
    #[serde(
        rename = "hookSpecificOutput",
        skip_serializing_if = "Option::is_none"
    )]
    pub hook_specific_output: Option<HookSpecificOutput>,
}

impl HookOutput {
    /// True when this output carries no information
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.continue_.is_none()
            && self.stop_reason.is_none()
            && self.suppress_output.is_none()
            && self.system_message.is_none()
            && self.hook_specific_output.is_none()
    }

    /// Shorthand for a `PreToolUse` deny with a reason
    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            hook_specific_output: Some(HookSpecificOutput::PreToolUse {
                permission_decision: Some(PermissionBehavior::Deny),
                permission_decision_reason: Some(reason.into()),
                updated_input: None,
            }),
            ..Default::default()
        }
    }

    /// Shorthand for a `PreToolUse` allow
    #[must_use]
    pub fn allow() -> Self {
        Self {
            hook_specific_output: Some(HookSpecificOutput::PreToolUse {
                permission_decision: Some(PermissionBehavior::Allow),
                permission_decision_reason: None,
                updated_input: None,
            }),
            ..Default::default()
        }
    }
}

// ============================================================================
// Hook Context and Matcher
// ============================================================================

/// Context for hook callbacks
///
/// Provides session information and cancellation support, the SDK equivalent
/// of an `AbortSignal`.
#[derive(Clone, Default)]
pub struct HookContext {
    /// Session ID from the system init message
    pub session_id: Option<String>,
    /// Current working directory from the system init message
    pub cwd: Option<String>,
    /// Cancellation token for aborting long-running work
    pub cancellation_token: Option<CancellationToken>,
}

impl std::fmt::Debug for HookContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookContext")
            .field("session_id", &self.session_id)
            .field("cwd", &self.cwd)
            .field(
                "cancellation_token",
                &self.cancellation_token.as_ref().map(|_| "<token>"),
            )
            .finish()
    }
}

impl HookContext {
    /// Create a new `HookContext` with session information
    #[must_use]
    pub fn new(
        session_id: Option<String>,
        cwd: Option<String>,
        cancellation_token: Option<CancellationToken>,
    ) -> Self {
        Self {
            session_id,
            cwd,
            cancellation_token,
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

/// Hook matcher configuration
#[derive(Clone)]
pub struct HookMatcher {
    /// Matcher pattern: `"*"` (or `None`) for all tools, a literal tool name,
    /// or a regex like `"^(Bash|Shell)$"`
    pub matcher: Option<String>,
    /// Callbacks to run when the pattern matches
    pub hooks: Vec<Arc<dyn crate::callbacks::HookCallback>>,
    /// Per-call deadline for the callbacks in this matcher (default: 60 s)
    pub timeout: Option<std::time::Duration>,
}

impl std::fmt::Debug for HookMatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookMatcher")
            .field("matcher", &self.matcher)
            .field("hooks", &format!("[{} callbacks]", self.hooks.len()))
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hook_event_wire_names() {
        assert_eq!(HookEvent::PreToolUse.as_str(), "PreToolUse");
        assert_eq!(HookEvent::UserPromptSubmit.as_str(), "UserPromptSubmit");
        assert_eq!(
            serde_json::to_string(&HookEvent::PreCompact).unwrap(),
            "\"PreCompact\""
        );
    }

    #[test]
    fn test_hook_output_serialization_is_camel_case() {
        let output = HookOutput {
            continue_: Some(false),
            stop_reason: Some("blocked".to_string()),
            suppress_output: None,
            system_message: None,
            hook_specific_output: Some(HookSpecificOutput::PreToolUse {
                permission_decision: Some(PermissionBehavior::Deny),
                permission_decision_reason: Some("forbidden".to_string()),
                updated_input: None,
            }),
        };

        let json = serde_json::to_value(&output).unwrap();
        assert_eq!(json["continue"], false);
        assert_eq!(json["stopReason"], "blocked");
        assert_eq!(
            json["hookSpecificOutput"]["hookEventName"],
            "PreToolUse"
        );
        assert_eq!(
            json["hookSpecificOutput"]["permissionDecision"],
            "deny"
        );
        assert_eq!(
            json["hookSpecificOutput"]["permissionDecisionReason"],
            "forbidden"
        );
    }

    #[test]
    fn test_hook_output_default_is_empty() {
        let output = HookOutput::default();
        assert!(output.is_empty());
        let json = serde_json::to_value(&output).unwrap();
        assert_eq!(json, serde_json::json!({}));
    }

    #[test]
    fn test_context_injection_roundtrip() {
        let output = HookOutput {
            hook_specific_output: Some(HookSpecificOutput::UserPromptSubmit {
                additional_context: Some("remember the house style".to_string()),
            }),
            ..Default::default()
        };

        let json = serde_json::to_string(&output).unwrap();
        let back: HookOutput = serde_json::from_str(&json).unwrap();
        assert_eq!(
            back.hook_specific_output
                .as_ref()
                .and_then(HookSpecificOutput::additional_context),
            Some("remember the house style")
        );
    }

    #[test]
    fn test_hook_context_cancellation() {
        let token = CancellationToken::new();
        let ctx = HookContext::new(
            Some("session-1".to_string()),
            Some("/tmp".to_string()),
            Some(token.clone()),
        );

        assert!(!ctx.is_cancelled());
        token.cancel();
        assert!(ctx.is_cancelled());

        let default_ctx = HookContext::default();
        assert!(!default_ctx.is_cancelled());
    }
}
