//! In-process MCP servers for Claude Agent SDK
//!
//! An SDK MCP server is a named collection of tools whose invocations are
//! handled inside this process: no subprocess, no socket. The CLI learns the
//! server exists from the `--mcp-config` payload (`type: "sdk"`) and the
//! `initialize` handshake, then routes tool invocations back over the
//! control protocol as `mcp_message` / `sdk_mcp_request` requests.
//!
//! # Example
//!
//! ```no_run
//! use claude_agent_sdk::mcp::{SdkMcpServer, SdkMcpTool, ToolResult};
//! use serde_json::json;
//!
//! let calculator = SdkMcpServer::new("calc")
//!     .version("1.0.0")
//!     .tool(SdkMcpTool::new(
//!         "add",
//!         "Add two numbers",
//!         json!({
//!             "type": "object",
//!             "properties": {
//!                 "a": {"type": "number"},
//!                 "b": {"type": "number"}
//!             },
//!             "required": ["a", "b"]
//!         }),
//!         |input| async move {
//!             let a = input["a"].as_f64().unwrap_or(0.0);
//!             let b = input["b"].as_f64().unwrap_or(0.0);
//!             Ok(ToolResult::text(format!("{} + {} = {}", a, b, a + b)))
//!         },
//!     ));
//! ```

mod server;
mod tool;

pub use server::SdkMcpServer;
pub use tool::{SdkMcpTool, ToolContent, ToolHandler, ToolResult};
