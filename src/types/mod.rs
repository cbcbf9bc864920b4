//! Type definitions for Claude Agent SDK
//!
//! This module contains all the type definitions used throughout the SDK,
//! including identifiers for type safety, message types, option types, and
//! the hook and permission data model.

pub mod hooks;
pub mod identifiers;
pub mod mcp;
pub mod messages;
pub mod options;
pub mod permissions;

pub use hooks::{
    HookContext, HookEvent, HookMatcher, HookOutput, HookSpecificOutput,
};
pub use identifiers::{RequestId, SessionId, ToolName};
pub use mcp::{
    McpHttpServerConfig, McpServerConfig, McpServers, McpSseServerConfig, McpStdioServerConfig,
};
pub use messages::{
    AssistantMessageContent, ContentBlock, ContentValue, Message, UserContent, UserMessageContent,
};
pub use options::{
    AgentDefinition, ClaudeAgentOptions, ClaudeAgentOptionsBuilder, SdkBeta, StderrCallback,
    SystemPrompt, SystemPromptPreset,
};
pub use permissions::{
    CanUseToolCallback, PermissionBehavior, PermissionMode, PermissionResult,
    PermissionResultAllow, PermissionResultDeny, PermissionRuleValue, PermissionUpdate,
    PermissionUpdateDestination, SettingSource, ToolPermissionContext,
};
