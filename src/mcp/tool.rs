//! Tool definitions for in-process MCP servers

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::Result;

/// Boxed async tool handler
pub type ToolHandler = Arc<
    dyn Fn(serde_json::Value) -> Pin<Box<dyn Future<Output = Result<ToolResult>> + Send>>
        + Send
        + Sync,
>;

/// A tool that Claude can invoke in-process
///
/// Tools are defined with a unique name, a description, a JSON schema for
/// the input parameters, and an async handler. The handler reference never
/// crosses the wire; only name, description, and schema are advertised.
pub struct SdkMcpTool {
    pub(crate) name: String,
    pub(crate) description: String,
    pub(crate) input_schema: serde_json::Value,
    pub(crate) handler: ToolHandler,
}

impl SdkMcpTool {
    /// Create a new tool
    ///
    /// # Example
    ///
    /// ```no_run
    /// use claude_agent_sdk::mcp::{SdkMcpTool, ToolResult};
    /// use serde_json::json;
    ///
    /// let tool = SdkMcpTool::new(
    ///     "echo",
    ///     "Echo back the input",
    ///     json!({"type": "object", "properties": {"text": {"type": "string"}}}),
    ///     |input| async move {
    ///         let text = input["text"].as_str().unwrap_or("").to_string();
    ///         Ok(ToolResult::text(text))
    ///     },
    /// );
    /// ```
    pub fn new<F, Fut>(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: serde_json::Value,
        handler: F,
    ) -> Self
    where
        F: Fn(serde_json::Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ToolResult>> + Send + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
            handler: Arc::new(move |input| Box::pin(handler(input))),
        }
    }

    /// Get the tool name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the tool description
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Get the input schema
    #[must_use]
    pub fn input_schema(&self) -> &serde_json::Value {
        &self.input_schema
    }

    /// Invoke the handler directly, without the error guard
    ///
    /// # Errors
    /// Propagates handler errors; prefer [`crate::mcp::SdkMcpServer::execute`]
    /// which converts them into error content blocks.
    pub async fn invoke(&self, input: serde_json::Value) -> Result<ToolResult> {
        (self.handler)(input).await
    }

    /// Tool metadata in the MCP `tools/list` format
    pub(crate) fn to_tool_info(&self) -> serde_json::Value {
        serde_json::json!({
            "name": self.name,
            "description": self.description,
            "inputSchema": self.input_schema,
        })
    }
}

impl std::fmt::Debug for SdkMcpTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SdkMcpTool")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("input_schema", &self.input_schema)
            .finish()
    }
}

/// Result returned by a tool handler
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// Content blocks (text, images, ...)
    pub content: Vec<ToolContent>,
    /// Whether this result represents an error
    #[serde(rename = "isError", skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
}

impl ToolResult {
    /// Create a successful text result
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text { text: text.into() }],
            is_error: None,
        }
    }

    /// Create an error result
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text { text: text.into() }],
            is_error: Some(true),
        }
    }
}

/// Content block in a tool result
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ToolContent {
    /// Text content
    Text {
        /// The text content
        text: String,
    },
    /// Image content (base64 encoded)
    Image {
        /// Base64 encoded image data
        data: String,
        /// MIME type (e.g., "image/png")
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_tool_creation_and_invoke() {
        let tool = SdkMcpTool::new(
            "echo",
            "Echo tool",
            json!({"type": "object"}),
            |input| async move {
                let text = input["text"].as_str().unwrap_or("empty").to_string();
                Ok(ToolResult::text(text))
            },
        );

        assert_eq!(tool.name(), "echo");
        assert_eq!(tool.description(), "Echo tool");

        let result = tool.invoke(json!({"text": "hello"})).await.unwrap();
        match &result.content[0] {
            ToolContent::Text { text } => assert_eq!(text, "hello"),
            other => panic!("expected text content, got {other:?}"),
        }
    }

    #[test]
    fn test_tool_result_constructors() {
        let ok = ToolResult::text("success");
        assert_eq!(ok.content.len(), 1);
        assert!(ok.is_error.is_none());

        let err = ToolResult::error("failed");
        assert_eq!(err.is_error, Some(true));
    }

    #[test]
    fn test_tool_result_serializes_is_error_camel_case() {
        let result = ToolResult::error("boom");
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["isError"], true);
        assert_eq!(json["content"][0]["type"], "text");
        assert_eq!(json["content"][0]["text"], "boom");
    }

    #[test]
    fn test_tool_info_shape() {
        let tool = SdkMcpTool::new("t", "Test tool", json!({"type": "object"}), |_| async {
            Ok(ToolResult::text("ok"))
        });

        let info = tool.to_tool_info();
        assert_eq!(info["name"], "t");
        assert_eq!(info["description"], "Test tool");
        assert!(info["inputSchema"].is_object());
    }
}
