//! SDK MCP server: an in-process registry of tools

use futures::FutureExt;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;

use serde_json::{Value, json};

use super::tool::{SdkMcpTool, ToolResult};
use crate::error::{ClaudeError, Result};

// JSONRPC error codes used by the MCP protocol
const METHOD_NOT_FOUND: i64 = -32601;
const INVALID_PARAMS: i64 = -32602;
const INTERNAL_ERROR: i64 = -32603;

/// An in-process MCP server hosting custom tools
///
/// Tools are registered via the builder pattern. Duplicate tool names are
/// rejected; the first registration wins. Invocations arrive over the
/// control protocol, either as MCP JSONRPC (`tools/list`, `tools/call`) or
/// as a direct `{"tool": ..., "input": ...}` payload, both handled by
/// [`handle_message`](Self::handle_message).
pub struct SdkMcpServer {
    name: String,
    version: String,
    tools: HashMap<String, SdkMcpTool>,
}

impl SdkMcpServer {
    /// Create a new MCP server with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: "1.0.0".to_string(),
            tools: HashMap::new(),
        }
    }

    /// Set the server version
    #[must_use]
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Register a tool with the server
    ///
    /// A tool whose name is already taken is rejected and reported; the
    /// existing registration is kept.
    #[must_use]
    pub fn tool(mut self, tool: SdkMcpTool) -> Self {
        self.register(tool);
        self
    }

    /// Register multiple tools at once
    #[must_use]
    pub fn tools(mut self, tools: Vec<SdkMcpTool>) -> Self {
        for tool in tools {
            self.register(tool);
        }
        self
    }

    fn register(&mut self, tool: SdkMcpTool) {
        let name = tool.name().to_string();
        if self.tools.contains_key(&name) {
            tracing::warn!(
                server = %self.name,
                tool = %name,
                "Duplicate tool name rejected; keeping the first registration"
            );
            return;
        }
        self.tools.insert(name, tool);
    }

    /// Get the server name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the server version
    #[must_use]
    pub fn server_version(&self) -> &str {
        &self.version
    }

    /// The `{name, version}` declaration sent in the `initialize` handshake
    #[must_use]
    pub fn declaration(&self) -> Value {
        json!({"name": self.name, "version": self.version})
    }

    /// Get a tool by name
    #[must_use]
    pub fn get_tool(&self, name: &str) -> Option<&SdkMcpTool> {
        self.tools.get(name)
    }

    /// List registered tool metadata in `tools/list` format
    #[must_use]
    pub fn list_tools(&self) -> Vec<Value> {
        self.tools.values().map(SdkMcpTool::to_tool_info).collect()
    }

    /// Execute a tool by name under the error guard
    ///
    /// Handler errors and panics are converted into an error content block;
    /// nothing propagates toward the transport.
    pub async fn execute(&self, tool_name: &str, input: Value) -> ToolResult {
        let Some(tool) = self.tools.get(tool_name) else {
            return ToolResult::error(format!(
                "Tool '{tool_name}' not found on server '{}'",
                self.name
            ));
        };

        match AssertUnwindSafe(tool.invoke(input)).catch_unwind().await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => ToolResult::error(format!("Error executing tool: {e}")),
            Err(_panic) => {
                tracing::error!(server = %self.name, tool = tool_name, "Tool handler panicked");
                ToolResult::error(format!("Error executing tool: '{tool_name}' panicked"))
            }
        }
    }

    /// Handle a tool-invocation control payload
    ///
    /// Accepts both the MCP JSONRPC shape (`{"jsonrpc": "2.0", "method":
    /// "tools/call", ...}`) and the direct shape (`{"tool": ..., "input":
    /// ...}`). The returned value is placed verbatim in the `response` field
    /// of the success control-response.
    ///
    /// # Errors
    /// Returns [`ClaudeError::Mcp`] only when the payload matches neither
    /// shape; tool-level failures are encoded in the returned value.
    pub async fn handle_message(&self, message: &Value) -> Result<Value> {
        if message.get("method").is_some() {
            return Ok(self.handle_jsonrpc(message).await);
        }

        if let Some(tool_name) = message.get("tool").and_then(Value::as_str) {
            let input = message.get("input").cloned().unwrap_or(Value::Null);
            let result = self.execute(tool_name, input).await;
            return serde_json::to_value(result)
                .map_err(|e| ClaudeError::mcp(format!("Failed to serialize tool result: {e}")));
        }

        Err(ClaudeError::mcp(format!(
            "Unrecognized MCP message for server '{}'",
            self.name
        )))
    }

    async fn handle_jsonrpc(&self, request: &Value) -> Value {
        let id = request.get("id").cloned().unwrap_or(Value::Null);
        let method = request.get("method").and_then(Value::as_str).unwrap_or("");

        match method {
            "tools/list" => jsonrpc_success(id, json!({"tools": self.list_tools()})),
            "tools/call" => {
                let Some(params) = request.get("params") else {
                    return jsonrpc_error(id, INVALID_PARAMS, "tools/call requires parameters");
                };
                let Some(tool_name) = params.get("name").and_then(Value::as_str) else {
                    return jsonrpc_error(id, INVALID_PARAMS, "Missing tool name in parameters");
                };
                if self.tools.get(tool_name).is_none() {
                    return jsonrpc_error(
                        id,
                        METHOD_NOT_FOUND,
                        &format!("Tool '{tool_name}' not found"),
                    );
                }

                let arguments = params.get("arguments").cloned().unwrap_or(Value::Null);
                let result = self.execute(tool_name, arguments).await;
                match serde_json::to_value(result) {
                    Ok(value) => jsonrpc_success(id, value),
                    Err(e) => jsonrpc_error(
                        id,
                        INTERNAL_ERROR,
                        &format!("Failed to serialize result: {e}"),
                    ),
                }
            }
            other => jsonrpc_error(id, METHOD_NOT_FOUND, &format!("Method not found: {other}")),
        }
    }
}

fn jsonrpc_success(id: Value, result: Value) -> Value {
    json!({"jsonrpc": "2.0", "id": id, "result": result})
}

fn jsonrpc_error(id: Value, code: i64, message: &str) -> Value {
    json!({"jsonrpc": "2.0", "id": id, "error": {"code": code, "message": message}})
}

impl std::fmt::Debug for SdkMcpServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SdkMcpServer")
            .field("name", &self.name)
            .field("version", &self.version)
            .field("tools", &self.tools.keys().collect::<Vec<_>>())
            .finish()
    }
}
