//! Claude Agent configuration options

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use typed_builder::TypedBuilder;

use super::hooks::{HookEvent, HookMatcher};
use super::identifiers::ToolName;
use super::mcp::McpServers;
use super::permissions::{CanUseToolCallback, PermissionMode, SettingSource};

// ============================================================================
// System Prompt Types
// ============================================================================

/// System prompt preset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemPromptPreset {
    /// Prompt type (always "preset")
    #[serde(rename = "type")]
    pub prompt_type: String,
    /// Preset name (e.g., "`claude_code`")
    pub preset: String,
    /// Additional text to append to the preset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub append: Option<String>,
}

/// System prompt configuration
#[derive(Debug, Clone)]
pub enum SystemPrompt {
    /// Plain string system prompt
    String(String),
    /// Preset-based system prompt
    Preset(SystemPromptPreset),
}

impl From<String> for SystemPrompt {
    fn from(s: String) -> Self {
        SystemPrompt::String(s)
    }
}

impl From<&str> for SystemPrompt {
    fn from(s: &str) -> Self {
        SystemPrompt::String(s.to_string())
    }
}

impl From<SystemPromptPreset> for SystemPrompt {
    fn from(preset: SystemPromptPreset) -> Self {
        SystemPrompt::Preset(preset)
    }
}

// ============================================================================
// Stderr Callback
// ============================================================================

/// Callback for stderr output
///
/// Invoked once per line the Claude CLI writes to stderr. Useful for
/// debugging and log forwarding; stderr never mixes into the message stream.
pub type StderrCallback = Arc<dyn Fn(String) + Send + Sync>;

// ============================================================================
// Beta Features
// ============================================================================

/// Available beta features
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SdkBeta {
    /// 1 million token context window
    #[serde(rename = "context-1m-2025-08-07")]
    Context1M,
}

impl SdkBeta {
    /// The CLI-facing beta flag value
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            SdkBeta::Context1M => "context-1m-2025-08-07",
        }
    }
}

// ============================================================================
// Agent Definition
// ============================================================================

/// Agent profile configuration
///
/// Selected at runtime with `set_agent`; overrides are merged on top of the
/// base options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentDefinition {
    /// Agent description
    pub description: String,
    /// Agent system prompt
    pub prompt: String,
    /// Tools available to the agent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<String>>,
    /// Model to use for the agent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

// ============================================================================
// Claude Agent Options
// ============================================================================

/// Main options for Claude Agent SDK
#[allow(clippy::struct_excessive_bools)]
#[derive(Clone, Default, TypedBuilder)]
#[builder(
    builder_method(doc = "Create a new builder for ClaudeAgentOptions"),
    builder_type(doc = "Builder for ClaudeAgentOptions", vis = "pub"),
    build_method(doc = "Build the ClaudeAgentOptions")
)]
pub struct ClaudeAgentOptions {
    /// List of tools that Claude is allowed to use
    #[builder(default, setter(into))]
    pub allowed_tools: Vec<ToolName>,

    /// List of tools that Claude is not allowed to use
    #[builder(default, setter(into))]
    pub disallowed_tools: Vec<ToolName>,

    /// System prompt configuration
    #[builder(default, setter(strip_option, into))]
    pub system_prompt: Option<SystemPrompt>,

    /// MCP server configurations
    #[builder(default)]
    pub mcp_servers: McpServers,

    /// Permission mode for tool execution
    #[builder(default, setter(strip_option))]
    pub permission_mode: Option<PermissionMode>,

    /// Whether to continue from the previous conversation
    #[builder(default)]
    pub continue_conversation: bool,

    /// Session ID to resume from
    #[builder(default, setter(strip_option, into))]
    pub resume: Option<super::identifiers::SessionId>,

    /// Whether to fork the session when resuming
    #[builder(default)]
    pub fork_session: bool,

    /// Maximum number of turns before stopping
    #[builder(default, setter(strip_option))]
    pub max_turns: Option<u32>,

    /// AI model to use
    #[builder(default, setter(strip_option, into))]
    pub model: Option<String>,

    /// Model to use if primary fails
    #[builder(default, setter(strip_option, into))]
    pub fallback_model: Option<String>,

    /// Tool name to use for permission prompts
    #[builder(default, setter(strip_option, into))]
    pub permission_prompt_tool_name: Option<String>,

    /// Working directory for the CLI process
    #[builder(default, setter(strip_option, into))]
    pub cwd: Option<PathBuf>,

    /// Path to settings file
    #[builder(default, setter(strip_option, into))]
    pub settings: Option<PathBuf>,

    /// Additional directories to add to the context
    #[builder(default, setter(into))]
    pub add_dirs: Vec<PathBuf>,

    /// Environment variables for the CLI process
    #[builder(default)]
    pub env: HashMap<String, String>,

    /// Extra CLI arguments to pass (allowlist-validated)
    #[builder(default)]
    pub extra_args: HashMap<String, Option<String>>,

    /// Maximum stdout line length in bytes before resynchronization
    /// (default: 1 MiB)
    #[builder(default, setter(strip_option))]
    pub max_line_size: Option<usize>,

    /// Deadline for control requests and SDK-side callbacks (default: 60 s)
    #[builder(default, setter(strip_option))]
    pub control_request_timeout: Option<Duration>,

    /// Callback for tool permission checks
    #[builder(default, setter(strip_option))]
    pub can_use_tool: Option<CanUseToolCallback>,

    /// Hook configurations
    #[builder(default, setter(strip_option))]
    pub hooks: Option<HashMap<HookEvent, Vec<HookMatcher>>>,

    /// Callback for stderr output
    #[builder(default, setter(strip_option))]
    pub stderr: Option<StderrCallback>,

    /// OS user to run the CLI as (process-substrate transports only)
    #[builder(default, setter(strip_option, into))]
    pub user: Option<String>,

    /// Whether to include partial messages in the stream
    #[builder(default)]
    pub include_partial_messages: bool,

    /// Custom agent profiles, selectable with `set_agent`
    #[builder(default, setter(strip_option))]
    pub agents: Option<HashMap<String, AgentDefinition>>,

    /// Setting sources to load
    #[builder(default, setter(strip_option))]
    pub setting_sources: Option<Vec<SettingSource>>,

    /// Beta features to enable
    #[builder(default, setter(strip_option))]
    pub betas: Option<Vec<SdkBeta>>,

    /// Enforce strict MCP configuration validation
    #[builder(default)]
    pub strict_mcp_config: bool,

    /// Path to a custom Claude Code executable
    #[builder(default, setter(strip_option, into))]
    pub path_to_claude_code_executable: Option<PathBuf>,
}

impl ClaudeAgentOptions {
    /// Default deadline for control requests and callbacks
    pub const DEFAULT_CONTROL_TIMEOUT: Duration = Duration::from_secs(60);

    /// Effective control-request deadline
    #[must_use]
    pub fn control_timeout(&self) -> Duration {
        self.control_request_timeout
            .unwrap_or(Self::DEFAULT_CONTROL_TIMEOUT)
    }
}

#[allow(clippy::missing_fields_in_debug)]
impl std::fmt::Debug for ClaudeAgentOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClaudeAgentOptions")
            .field("allowed_tools", &self.allowed_tools)
            .field("disallowed_tools", &self.disallowed_tools)
            .field("system_prompt", &self.system_prompt)
            .field("mcp_servers", &self.mcp_servers)
            .field("permission_mode", &self.permission_mode)
            .field("continue_conversation", &self.continue_conversation)
            .field("resume", &self.resume)
            .field("fork_session", &self.fork_session)
            .field("max_turns", &self.max_turns)
            .field("model", &self.model)
            .field("fallback_model", &self.fallback_model)
            .field(
                "permission_prompt_tool_name",
                &self.permission_prompt_tool_name,
            )
            .field("cwd", &self.cwd)
            .field("settings", &self.settings)
            .field("add_dirs", &self.add_dirs)
            .field("env", &self.env)
            .field("extra_args", &self.extra_args)
            .field("max_line_size", &self.max_line_size)
            .field("control_request_timeout", &self.control_request_timeout)
            .field(
                "can_use_tool",
                &self.can_use_tool.as_ref().map(|_| "<callback>"),
            )
            .field(
                "hooks",
                &self
                    .hooks
                    .as_ref()
                    .map(|h| format!("[{} hook types]", h.len())),
            )
            .field("stderr", &self.stderr.as_ref().map(|_| "<callback>"))
            .field("user", &self.user)
            .field("include_partial_messages", &self.include_partial_messages)
            .field("agents", &self.agents)
            .field("setting_sources", &self.setting_sources)
            .field("betas", &self.betas)
            .field("strict_mcp_config", &self.strict_mcp_config)
            .field(
                "path_to_claude_code_executable",
                &self.path_to_claude_code_executable,
            )
            .finish()
    }
}
