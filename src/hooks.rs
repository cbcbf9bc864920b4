//! Hook registry and matcher
//!
//! Hooks are user callbacks the CLI invokes at defined points (before/after
//! tool use, prompt submit, stop, compact, ...). Callbacks are data, not
//! behavior: at registration each callback gets a stable id (`hook_0`,
//! `hook_1`, ...) and only ids cross the wire, inside the hooks table of the
//! `initialize` request. When the CLI fires a hook it echoes the id back in a
//! `hook_callback` control request and the registry resolves it to the
//! function.
//!
//! # Example
//!
//! ```no_run
//! use claude_agent_sdk::callbacks::hook_callback;
//! use claude_agent_sdk::hooks::HookMatcherBuilder;
//! use claude_agent_sdk::types::{HookEvent, HookOutput};
//! use std::collections::HashMap;
//!
//! let hook = hook_callback(|input, _tool_use_id, _ctx| async move {
//!     println!("about to run: {:?}", input.get("tool_name"));
//!     Ok(HookOutput::default())
//! });
//!
//! let mut hooks = HashMap::new();
//! hooks.insert(
//!     HookEvent::PreToolUse,
//!     vec![HookMatcherBuilder::new(Some("Bash")).add_hook(hook).build()],
//! );
//! ```

use std::collections::HashMap;
use std::time::Duration;

use serde_json::{Value, json};

use crate::callbacks::SharedHookCallback;
use crate::error::Result;
use crate::types::{
    HookContext, HookEvent, HookMatcher, HookOutput, HookSpecificOutput, PermissionBehavior,
};

/// Default deadline for a single hook callback invocation
pub const DEFAULT_HOOK_TIMEOUT: Duration = Duration::from_secs(60);

// ============================================================================
// Matcher
// ============================================================================

/// Compiled matcher pattern
///
/// The pattern kind is decided by shape: `"*"` matches everything, a string
/// with regex metacharacters that compiles is a regex, anything else is a
/// literal tool name.
#[derive(Debug, Clone)]
pub enum MatcherPattern {
    /// Matches any key
    Wildcard,
    /// Exact string equality
    Literal(String),
    /// Regular expression match
    Regex(regex::Regex),
}

impl MatcherPattern {
    /// Compile a pattern string
    #[must_use]
    pub fn parse(pattern: Option<&str>) -> Self {
        let Some(pattern) = pattern else {
            return MatcherPattern::Wildcard;
        };
        if pattern == "*" || pattern.is_empty() {
            return MatcherPattern::Wildcard;
        }

        let has_meta = pattern
            .chars()
            .any(|c| "^$*+?()[]{}|\\.".contains(c));
        if has_meta {
            match regex::Regex::new(pattern) {
                Ok(re) => return MatcherPattern::Regex(re),
                Err(e) => {
                    tracing::warn!(pattern, error = %e, "Matcher pattern is not a valid regex, using literal match");
                }
            }
        }

        MatcherPattern::Literal(pattern.to_string())
    }

    /// Test a key against this pattern
    #[must_use]
    pub fn matches(&self, key: &str) -> bool {
        match self {
            MatcherPattern::Wildcard => true,
            MatcherPattern::Literal(literal) => literal == key,
            MatcherPattern::Regex(re) => re.is_match(key),
        }
    }
}

// ============================================================================
// Output merging
// ============================================================================

/// Merge outputs from all callbacks that matched one event
///
/// Decision precedence is deny > ask > allow; context-injection strings
/// concatenate in order; execution-control flags take the most restrictive
/// value.
#[must_use]
pub fn merge_hook_outputs(event: HookEvent, outputs: &[HookOutput]) -> HookOutput {
    let mut merged = HookOutput::default();
    let mut decision: Option<PermissionBehavior> = None;
    let mut decision_reason: Option<String> = None;
    let mut updated_input: Option<Value> = None;
    let mut contexts: Vec<String> = Vec::new();
    let mut system_messages: Vec<String> = Vec::new();

    for output in outputs {
        match output.continue_ {
            Some(false) => merged.continue_ = Some(false),
            Some(true) if merged.continue_.is_none() => merged.continue_ = Some(true),
            _ => {}
        }
        if output.suppress_output == Some(true) {
            merged.suppress_output = Some(true);
        } else if output.suppress_output.is_some() && merged.suppress_output.is_none() {
            merged.suppress_output = output.suppress_output;
        }
        if merged.stop_reason.is_none() {
            merged.stop_reason = output.stop_reason.clone();
        }
        if let Some(ref msg) = output.system_message {
            system_messages.push(msg.clone());
        }

        match output.hook_specific_output.as_ref() {
            Some(HookSpecificOutput::PreToolUse {
                permission_decision,
                permission_decision_reason,
                updated_input: new_input,
            }) => {
                let outranks = match (decision, *permission_decision) {
                    (_, None) => false,
                    (None, Some(_)) => true,
                    (Some(old), Some(new)) => rank(new) > rank(old),
                };
                if outranks {
                    decision = *permission_decision;
                    decision_reason = permission_decision_reason.clone();
                }
                if new_input.is_some() {
                    updated_input = new_input.clone();
                }
            }
            Some(specific) => {
                if let Some(ctx) = specific.additional_context() {
                    contexts.push(ctx.to_string());
                }
            }
            None => {}
        }
    }

    if !system_messages.is_empty() {
        merged.system_message = Some(system_messages.join("\n"));
    }

    if decision.is_some() || updated_input.is_some() {
        merged.hook_specific_output = Some(HookSpecificOutput::PreToolUse {
            permission_decision: decision,
            permission_decision_reason: decision_reason,
            updated_input,
        });
    } else if !contexts.is_empty() {
        let additional_context = Some(contexts.join("\n"));
        merged.hook_specific_output = Some(match event {
            HookEvent::PostToolUse => HookSpecificOutput::PostToolUse { additional_context },
            HookEvent::SessionStart => HookSpecificOutput::SessionStart { additional_context },
            HookEvent::PreCompact => HookSpecificOutput::PreCompact { additional_context },
            _ => HookSpecificOutput::UserPromptSubmit { additional_context },
        });
    }

    merged
}

/// deny > ask > allow
fn rank(behavior: PermissionBehavior) -> u8 {
    match behavior {
        PermissionBehavior::Allow => 0,
        PermissionBehavior::Ask => 1,
        PermissionBehavior::Deny => 2,
    }
}

// ============================================================================
// Registry
// ============================================================================

struct RegisteredMatcher {
    event: HookEvent,
    pattern: MatcherPattern,
    callback_ids: Vec<String>,
    timeout: Duration,
}

/// Registry of user hook callbacks with stable ids
///
/// Built once from the hooks configuration at client start; immutable
/// afterwards, so lookups are lock-free.
pub struct HookRegistry {
    callbacks: HashMap<String, SharedHookCallback>,
    matchers: Vec<RegisteredMatcher>,
    table: HashMap<&'static str, Vec<Value>>,
}

impl HookRegistry {
    /// Build a registry from the options hooks configuration
    ///
    /// Callback ids are assigned in configuration order: `hook_0`, `hook_1`,
    /// and so on.
    #[must_use]
    pub fn from_config(config: &HashMap<HookEvent, Vec<HookMatcher>>) -> Self {
        let mut callbacks = HashMap::new();
        let mut matchers = Vec::new();
        let mut table: HashMap<&'static str, Vec<Value>> = HashMap::new();
        let mut next_id = 0usize;

        // Deterministic id assignment: events sorted by wire name
        let mut events: Vec<&HookEvent> = config.keys().collect();
        events.sort_by_key(|e| e.as_str());

        for event in events {
            let Some(event_matchers) = config.get(event) else {
                continue;
            };
            for matcher in event_matchers {
                let mut callback_ids = Vec::with_capacity(matcher.hooks.len());
                for hook in &matcher.hooks {
                    let id = format!("hook_{next_id}");
                    next_id += 1;
                    callbacks.insert(id.clone(), hook.clone());
                    callback_ids.push(id);
                }

                table.entry(event.as_str()).or_default().push(json!({
                    "matcher": matcher.matcher,
                    "hookCallbackIds": callback_ids,
                }));

                matchers.push(RegisteredMatcher {
                    event: *event,
                    pattern: MatcherPattern::parse(matcher.matcher.as_deref()),
                    callback_ids,
                    timeout: matcher.timeout.unwrap_or(DEFAULT_HOOK_TIMEOUT),
                });
            }
        }

        Self {
            callbacks,
            matchers,
            table,
        }
    }

    /// An empty registry (no hooks configured)
    #[must_use]
    pub fn empty() -> Self {
        Self {
            callbacks: HashMap::new(),
            matchers: Vec::new(),
            table: HashMap::new(),
        }
    }

    /// True when no callbacks are registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }

    /// Number of registered callbacks
    #[must_use]
    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    /// Resolve a callback id echoed back by the CLI
    #[must_use]
    pub fn lookup(&self, callback_id: &str) -> Option<&SharedHookCallback> {
        self.callbacks.get(callback_id)
    }

    /// All assigned callback ids
    #[must_use]
    pub fn callback_ids(&self) -> Vec<&str> {
        self.callbacks.keys().map(String::as_str).collect()
    }

    /// The CLI-facing hooks table for the `initialize` request
    ///
    /// Returns `None` when no hooks are configured.
    #[must_use]
    pub fn init_payload(&self) -> Option<Value> {
        if self.table.is_empty() {
            return None;
        }
        let mut hooks = serde_json::Map::new();
        for (event_name, matchers) in &self.table {
            hooks.insert((*event_name).to_string(), Value::Array(matchers.clone()));
        }
        Some(Value::Object(hooks))
    }

    /// Invoke all callbacks matching an event locally and merge their outputs
    ///
    /// `key` is the event-specific matching key (the tool name for tool
    /// events; `None` matches only wildcard matchers' semantics of "always").
    /// Each callback is bounded by its matcher's deadline; a timed-out
    /// callback contributes nothing and the session continues.
    ///
    /// # Errors
    /// Propagates callback errors.
    pub async fn invoke_event(
        &self,
        event: HookEvent,
        key: Option<&str>,
        input: Value,
        tool_use_id: Option<String>,
        context: HookContext,
    ) -> Result<HookOutput> {
        let mut outputs = Vec::new();

        for matcher in &self.matchers {
            if matcher.event != event {
                continue;
            }
            if let Some(key) = key {
                if !matcher.pattern.matches(key) {
                    continue;
                }
            }

            for callback_id in &matcher.callback_ids {
                let Some(callback) = self.callbacks.get(callback_id) else {
                    continue;
                };

                let call = callback.call(input.clone(), tool_use_id.clone(), context.clone());
                match tokio::time::timeout(matcher.timeout, call).await {
                    Ok(output) => outputs.push(output?),
                    Err(_elapsed) => {
                        tracing::warn!(
                            event = event.as_str(),
                            callback_id = %callback_id,
                            timeout_ms = matcher.timeout.as_millis() as u64,
                            "Hook callback timed out, continuing without its output"
                        );
                    }
                }
            }
        }

        Ok(merge_hook_outputs(event, &outputs))
    }
}

impl std::fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookRegistry")
            .field("callbacks", &format!("[{} callbacks]", self.callbacks.len()))
            .field("matchers", &format!("[{} matchers]", self.matchers.len()))
            .finish()
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for hook matchers
pub struct HookMatcherBuilder {
    matcher: Option<String>,
    hooks: Vec<SharedHookCallback>,
    timeout: Option<Duration>,
}

impl HookMatcherBuilder {
    /// Create a new builder
    ///
    /// # Arguments
    /// * `pattern` - `None` or `"*"` to match all tools, a literal tool name,
    ///   or a regex like `"^(Bash|Shell)$"`
    pub fn new(pattern: Option<impl Into<String>>) -> Self {
        Self {
            matcher: pattern.map(Into::into),
            hooks: Vec::new(),
            timeout: None,
        }
    }

    /// Add a hook callback
    #[must_use]
    pub fn add_hook(mut self, hook: SharedHookCallback) -> Self {
        self.hooks.push(hook);
        self
    }

    /// Set the per-call deadline for all hooks in this matcher
    ///
    /// Defaults to 60 seconds when unset.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Build the hook matcher
    #[must_use]
    pub fn build(self) -> HookMatcher {
        HookMatcher {
            matcher: self.matcher,
            hooks: self.hooks,
            timeout: self.timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callbacks::hook_callback;

    fn config_with(
        event: HookEvent,
        pattern: Option<&str>,
        hooks: Vec<SharedHookCallback>,
    ) -> HashMap<HookEvent, Vec<HookMatcher>> {
        let mut builder = HookMatcherBuilder::new(pattern);
        for hook in hooks {
            builder = builder.add_hook(hook);
        }
        let mut config = HashMap::new();
        config.insert(event, vec![builder.build()]);
        config
    }

    #[test]
    fn test_matcher_wildcard() {
        assert!(MatcherPattern::parse(Some("*")).matches("anything"));
        assert!(MatcherPattern::parse(None).matches("anything"));
        assert!(MatcherPattern::parse(Some("")).matches("anything"));
    }

    #[test]
    fn test_matcher_literal() {
        let pattern = MatcherPattern::parse(Some("Bash"));
        assert!(matches!(pattern, MatcherPattern::Literal(_)));
        assert!(pattern.matches("Bash"));
        assert!(!pattern.matches("Write"));
        assert!(!pattern.matches("bash"));
    }

    #[test]
    fn test_matcher_regex() {
        let pattern = MatcherPattern::parse(Some("^(Bash|Shell)$"));
        assert!(matches!(pattern, MatcherPattern::Regex(_)));
        assert!(pattern.matches("Bash"));
        assert!(pattern.matches("Shell"));
        assert!(!pattern.matches("BashX"));
        assert!(!pattern.matches("Write"));
    }

    #[test]
    fn test_matcher_pipe_pattern_is_regex() {
        let pattern = MatcherPattern::parse(Some("Write|Edit"));
        assert!(pattern.matches("Write"));
        assert!(pattern.matches("Edit"));
        assert!(!pattern.matches("Bash"));
    }

    #[test]
    fn test_registry_id_assignment_and_lookup() {
        let first = hook_callback(|_, _, _| async { Ok(HookOutput::default()) });
        let second = hook_callback(|_, _, _| async { Ok(HookOutput::default()) });

        let config = config_with(HookEvent::PreToolUse, Some("Bash"), vec![first, second]);
        let registry = HookRegistry::from_config(&config);

        assert_eq!(registry.len(), 2);
        assert!(registry.lookup("hook_0").is_some());
        assert!(registry.lookup("hook_1").is_some());
        assert!(registry.lookup("hook_2").is_none());
    }

    #[test]
    fn test_registry_init_payload_shape() {
        let hook = hook_callback(|_, _, _| async { Ok(HookOutput::default()) });
        let config = config_with(HookEvent::PreToolUse, Some("Bash"), vec![hook]);
        let registry = HookRegistry::from_config(&config);

        let payload = registry.init_payload().unwrap();
        let matchers = payload["PreToolUse"].as_array().unwrap();
        assert_eq!(matchers.len(), 1);
        assert_eq!(matchers[0]["matcher"], "Bash");
        assert_eq!(matchers[0]["hookCallbackIds"][0], "hook_0");
    }

    #[test]
    fn test_empty_registry_has_no_payload() {
        let registry = HookRegistry::empty();
        assert!(registry.is_empty());
        assert!(registry.init_payload().is_none());
    }

    #[tokio::test]
    async fn test_invoke_event_runs_matching_callbacks() {
        let matching = hook_callback(|_, _, _| async {
            Ok(HookOutput {
                system_message: Some("saw it".to_string()),
                ..Default::default()
            })
        });

        let config = config_with(HookEvent::PreToolUse, Some("Bash"), vec![matching]);
        let registry = HookRegistry::from_config(&config);

        let output = registry
            .invoke_event(
                HookEvent::PreToolUse,
                Some("Bash"),
                json!({}),
                None,
                HookContext::default(),
            )
            .await
            .unwrap();
        assert_eq!(output.system_message.as_deref(), Some("saw it"));

        // Non-matching key runs nothing
        let output = registry
            .invoke_event(
                HookEvent::PreToolUse,
                Some("Write"),
                json!({}),
                None,
                HookContext::default(),
            )
            .await
            .unwrap();
        assert!(output.is_empty());

        // Different event runs nothing
        let output = registry
            .invoke_event(
                HookEvent::PostToolUse,
                Some("Bash"),
                json!({}),
                None,
                HookContext::default(),
            )
            .await
            .unwrap();
        assert!(output.is_empty());
    }

    #[tokio::test]
    async fn test_invoke_event_timeout_is_not_fatal() {
        let slow = hook_callback(|_, _, _| async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(HookOutput {
                system_message: Some("never".to_string()),
                ..Default::default()
            })
        });

        let matcher = HookMatcherBuilder::new(Some("*"))
            .timeout(Duration::from_millis(50))
            .add_hook(slow)
            .build();
        let mut config = HashMap::new();
        config.insert(HookEvent::PreToolUse, vec![matcher]);
        let registry = HookRegistry::from_config(&config);

        let start = std::time::Instant::now();
        let output = registry
            .invoke_event(
                HookEvent::PreToolUse,
                Some("Bash"),
                json!({}),
                None,
                HookContext::default(),
            )
            .await
            .unwrap();

        assert!(start.elapsed() < Duration::from_secs(1));
        assert!(output.is_empty());
    }

    #[test]
    fn test_merge_deny_beats_ask_beats_allow() {
        let allow = HookOutput::allow();
        let ask = HookOutput {
            hook_specific_output: Some(HookSpecificOutput::PreToolUse {
                permission_decision: Some(PermissionBehavior::Ask),
                permission_decision_reason: Some("confirm".to_string()),
                updated_input: None,
            }),
            ..Default::default()
        };
        let deny = HookOutput::deny("forbidden");

        let merged = merge_hook_outputs(
            HookEvent::PreToolUse,
            &[allow.clone(), ask.clone(), deny.clone()],
        );
        assert_eq!(
            merged
                .hook_specific_output
                .as_ref()
                .and_then(HookSpecificOutput::permission_decision),
            Some(PermissionBehavior::Deny)
        );

        let merged = merge_hook_outputs(HookEvent::PreToolUse, &[allow.clone(), ask]);
        assert_eq!(
            merged
                .hook_specific_output
                .as_ref()
                .and_then(HookSpecificOutput::permission_decision),
            Some(PermissionBehavior::Ask)
        );

        let merged = merge_hook_outputs(HookEvent::PreToolUse, &[allow]);
        assert_eq!(
            merged
                .hook_specific_output
                .as_ref()
                .and_then(HookSpecificOutput::permission_decision),
            Some(PermissionBehavior::Allow)
        );
    }

    #[test]
    fn test_merge_context_concatenates_in_order() {
        let first = HookOutput {
            hook_specific_output: Some(HookSpecificOutput::UserPromptSubmit {
                additional_context: Some("alpha".to_string()),
            }),
            ..Default::default()
        };
        let second = HookOutput {
            hook_specific_output: Some(HookSpecificOutput::UserPromptSubmit {
                additional_context: Some("beta".to_string()),
            }),
            ..Default::default()
        };

        let merged = merge_hook_outputs(HookEvent::UserPromptSubmit, &[first, second]);
        assert_eq!(
            merged
                .hook_specific_output
                .as_ref()
                .and_then(HookSpecificOutput::additional_context),
            Some("alpha\nbeta")
        );
    }

    #[test]
    fn test_merge_execution_control_most_restrictive() {
        let lenient = HookOutput {
            continue_: Some(true),
            suppress_output: Some(false),
            ..Default::default()
        };
        let strict = HookOutput {
            continue_: Some(false),
            suppress_output: Some(true),
            stop_reason: Some("policy".to_string()),
            ..Default::default()
        };

        let merged = merge_hook_outputs(HookEvent::Stop, &[lenient, strict]);
        assert_eq!(merged.continue_, Some(false));
        assert_eq!(merged.suppress_output, Some(true));
        assert_eq!(merged.stop_reason.as_deref(), Some("policy"));
    }
}
