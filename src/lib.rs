//! # Claude Agent SDK for Rust
//!
//! SDK core for driving the Claude Code CLI as a child process over a
//! bidirectional, newline-delimited JSON control protocol. Async/await,
//! strong typing, tokio-based.
//!
//! The CLI streams conversation messages on stdout; the SDK streams user
//! messages and control requests on stdin. Mid-session the CLI also calls
//! *back into* the SDK - hook callbacks, tool-permission queries, and
//! in-process MCP tool invocations all arrive as control requests the SDK
//! answers on the same channel.
//!
//! ## Quick Start
//!
//! One-shot usage with [`query()`]:
//!
//! ```no_run
//! use claude_agent_sdk::query;
//! use futures::StreamExt;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let stream = query("What is 2 + 2?", None).await?;
//!     let mut stream = Box::pin(stream);
//!
//!     while let Some(message) = stream.next().await {
//!         if let claude_agent_sdk::Message::Assistant { message, .. } = message? {
//!             println!("Claude: {:?}", message.content);
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Interactive sessions with [`ClaudeSDKClient`]
//!
//! For stateful conversations with interrupts and runtime switches:
//!
//! ```no_run
//! # use claude_agent_sdk::{ClaudeSDKClient, ClaudeAgentOptions, Message};
//! # use futures::StreamExt;
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let options = ClaudeAgentOptions::builder().model("haiku").build();
//! let client = ClaudeSDKClient::new(options).await?;
//!
//! let mut messages = Box::pin(client.stream_messages());
//! client.send_message("Hello, Claude!").await?;
//!
//! while let Some(message) = messages.next().await {
//!     if message?.is_result() {
//!         break;
//!     }
//! }
//!
//! let resolved = client.set_model("opus").await?;
//! println!("now using {resolved}");
//!
//! client.close().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Hooks
//!
//! Intercept tool execution and other agent events. Callbacks are
//! registered under stable ids that the CLI echoes back; only ids cross the
//! wire.
//!
//! ```no_run
//! # use claude_agent_sdk::{ClaudeAgentOptions, callbacks::hook_callback};
//! # use claude_agent_sdk::hooks::HookMatcherBuilder;
//! # use claude_agent_sdk::types::{HookEvent, HookOutput};
//! # use std::collections::HashMap;
//! let hook = hook_callback(|input, _tool_use_id, _ctx| async move {
//!     if input["tool_input"]["command"]
//!         .as_str()
//!         .is_some_and(|c| c.contains("rm -rf"))
//!     {
//!         return Ok(HookOutput::deny("destructive command"));
//!     }
//!     Ok(HookOutput::default())
//! });
//!
//! let mut hooks = HashMap::new();
//! hooks.insert(
//!     HookEvent::PreToolUse,
//!     vec![HookMatcherBuilder::new(Some("Bash")).add_hook(hook).build()],
//! );
//!
//! let options = ClaudeAgentOptions::builder().hooks(hooks).build();
//! ```
//!
//! ## Permission control
//!
//! The `can_use_tool` callback decides tool usage, optionally rewriting the
//! input or pushing permission-rule updates:
//!
//! ```no_run
//! # use claude_agent_sdk::{ClaudeAgentOptions, callbacks::permission_callback};
//! # use claude_agent_sdk::types::PermissionResult;
//! let cb = permission_callback(|tool_name, _input, _ctx| async move {
//!     match tool_name.as_str() {
//!         "Read" | "Glob" | "Grep" => Ok(PermissionResult::allow()),
//!         _ => Ok(PermissionResult::deny("read-only session")),
//!     }
//! });
//!
//! let options = ClaudeAgentOptions::builder().can_use_tool(cb).build();
//! ```
//!
//! ## In-process MCP tools
//!
//! Declare tools that execute inside your process; the CLI routes
//! invocations back over the control protocol:
//!
//! ```no_run
//! # use claude_agent_sdk::{ClaudeAgentOptions};
//! # use claude_agent_sdk::mcp::{SdkMcpServer, SdkMcpTool, ToolResult};
//! # use claude_agent_sdk::types::{McpServers, McpServerConfig};
//! # use std::collections::HashMap;
//! # use serde_json::json;
//! let calc = SdkMcpServer::new("calc").version("1.0.0").tool(SdkMcpTool::new(
//!     "add",
//!     "Add two numbers",
//!     json!({"type": "object", "properties": {"a": {"type": "number"}, "b": {"type": "number"}}}),
//!     |input| async move {
//!         let a = input["a"].as_f64().unwrap_or(0.0);
//!         let b = input["b"].as_f64().unwrap_or(0.0);
//!         Ok(ToolResult::text(format!("{} + {} = {}", a, b, a + b)))
//!     },
//! ));
//!
//! let mut servers = HashMap::new();
//! servers.insert("calc".to_string(), McpServerConfig::from(calc));
//! let options = ClaudeAgentOptions::builder()
//!     .mcp_servers(McpServers::Dict(servers))
//!     .build();
//! ```
//!
//! ## Architecture
//!
//! - [`types`]: core type definitions, identifiers, and the options builder
//! - [`query()`]: one-shot query adapter
//! - [`client`]: the session actor tying transport, control protocol,
//!   callbacks, and broadcast together
//! - [`control`]: control-protocol codec (envelopes, request ids, framing)
//! - [`hooks`]: hook registry and matcher
//! - [`permissions`]: the `can_use_tool` path
//! - [`mcp`]: in-process MCP servers and tools
//! - [`transport`]: child-process lifecycle and line framing
//! - [`message`]: message parsing
//! - [`error`]: error types
//!
//! ## Logging
//!
//! This crate uses [`tracing`](https://crates.io/crates/tracing) for
//! structured logging. Events are always emitted and are zero-cost when no
//! subscriber is attached. To see logs, install a subscriber in your
//! application:
//!
//! ```rust,ignore
//! tracing_subscriber::fmt::init();
//! ```
//!
//! ## Reliability properties
//!
//! - **Bounded framing** - stdout lines are capped (default 1 MiB); an
//!   oversized line yields one error and framing resynchronizes on the next
//!   newline
//! - **No leaked requests** - every control request resolves with a
//!   response, a timeout, or a transport-closed error
//! - **Bounded callbacks** - hook, permission, and tool callbacks run under
//!   a deadline (default 60 s) with cooperative cancellation
//! - **Bounded broadcast** - per-subscriber channels are bounded; a lagging
//!   subscriber is dropped instead of stalling the session
//! - **Environment hardening** - injection-prone variables like
//!   `LD_PRELOAD` and `NODE_OPTIONS` are refused; extra CLI flags are
//!   allowlist-checked
//!
//! ## Requirements
//!
//! - Rust 1.85.0 or later
//! - Claude Code: `npm install -g @anthropic-ai/claude-code`

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod callbacks;
pub mod client;
pub mod control;
pub mod error;
pub mod hooks;
pub mod mcp;
pub mod message;
pub mod permissions;
pub mod query;
pub mod transport;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use callbacks::{
    FnHookCallback, FnPermissionCallback, HookCallback, PermissionCallback, SharedHookCallback,
    SharedPermissionCallback, hook_callback, permission_callback,
};
pub use client::{ClaudeSDKClient, ClientStatus};
pub use error::{ClaudeError, Result};
pub use futures::StreamExt;
pub use hooks::{HookMatcherBuilder, HookRegistry, MatcherPattern};
pub use mcp::{SdkMcpServer, SdkMcpTool, ToolContent, ToolResult};
pub use message::parse_message;
pub use permissions::PermissionManager;
pub use query::query;
pub use transport::{
    MIN_CLI_VERSION, PromptInput, SubprocessTransport, Transport, TransportEvent,
    check_claude_version,
};
pub use types::{
    AgentDefinition, CanUseToolCallback, ClaudeAgentOptions, ClaudeAgentOptionsBuilder,
    ContentBlock, ContentValue, HookContext, HookEvent, HookMatcher, HookOutput,
    HookSpecificOutput, McpHttpServerConfig, McpServerConfig, McpServers, McpSseServerConfig,
    McpStdioServerConfig, Message, PermissionBehavior, PermissionMode, PermissionResult,
    PermissionResultAllow, PermissionResultDeny, PermissionRuleValue, PermissionUpdate,
    PermissionUpdateDestination, RequestId, SessionId, SettingSource, SystemPrompt,
    SystemPromptPreset, ToolName, ToolPermissionContext,
};

/// Version of the SDK
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
