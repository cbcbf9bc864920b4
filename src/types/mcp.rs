//! MCP (Model Context Protocol) server configuration types
//!
//! Configuration for the MCP servers a session can reach: external servers
//! the CLI spawns or connects to, and in-process SDK servers whose tools run
//! inside this process (see [`crate::mcp`]).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use crate::mcp::SdkMcpServer;

/// MCP stdio server configuration
///
/// Used to spawn an MCP server as a subprocess.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpStdioServerConfig {
    /// Server type (stdio)
    #[serde(skip_serializing_if = "Option::is_none", rename = "type")]
    pub server_type: Option<String>,
    /// Command to execute
    pub command: String,
    /// Command arguments
    #[serde(skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<String>>,
    /// Environment variables
    #[serde(skip_serializing_if = "Option::is_none")]
    pub env: Option<HashMap<String, String>>,
}

/// MCP SSE server configuration
///
/// Used to connect to an MCP server via Server-Sent Events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpSseServerConfig {
    /// Server type (sse)
    #[serde(rename = "type")]
    pub server_type: String,
    /// Server URL
    pub url: String,
    /// HTTP headers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<HashMap<String, String>>,
}

/// MCP HTTP server configuration
///
/// Used to connect to an MCP server via HTTP.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpHttpServerConfig {
    /// Server type (http)
    #[serde(rename = "type")]
    pub server_type: String,
    /// Server URL
    pub url: String,
    /// HTTP headers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<HashMap<String, String>>,
}

/// MCP server configuration enum
///
/// The `Sdk` variant carries the live in-process server instance. Only its
/// name and version ever cross the wire; handlers stay in this process.
#[derive(Debug, Clone)]
pub enum McpServerConfig {
    /// Stdio-based MCP server (spawns subprocess)
    Stdio(McpStdioServerConfig),
    /// SSE-based MCP server (connects via Server-Sent Events)
    Sse(McpSseServerConfig),
    /// HTTP-based MCP server (connects via HTTP)
    Http(McpHttpServerConfig),
    /// In-process SDK server
    Sdk(Arc<SdkMcpServer>),
}

impl From<SdkMcpServer> for McpServerConfig {
    fn from(server: SdkMcpServer) -> Self {
        McpServerConfig::Sdk(Arc::new(server))
    }
}

/// MCP servers container
///
/// Specifies how MCP servers are configured for a session.
#[derive(Debug, Clone, Default)]
pub enum McpServers {
    /// No MCP servers
    #[default]
    None,
    /// Dictionary of MCP servers (inline configuration)
    Dict(HashMap<String, McpServerConfig>),
    /// Path to MCP servers configuration file
    Path(PathBuf),
}

impl McpServers {
    /// The in-process SDK servers declared in this configuration, keyed by
    /// the name they were registered under
    #[must_use]
    pub fn sdk_servers(&self) -> HashMap<String, Arc<SdkMcpServer>> {
        match self {
            McpServers::Dict(servers) => servers
                .iter()
                .filter_map(|(name, config)| match config {
                    McpServerConfig::Sdk(server) => Some((name.clone(), server.clone())),
                    _ => None,
                })
                .collect(),
            _ => HashMap::new(),
        }
    }
}
