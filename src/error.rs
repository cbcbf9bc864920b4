//! Error types for the Claude Agent SDK

use thiserror::Error;

/// Main error type for the Claude Agent SDK
#[derive(Error, Debug)]
pub enum ClaudeError {
    /// Claude Code CLI not found or not installed
    #[error("Claude Code CLI not found: {0}")]
    CliNotFound(String),

    /// Connection error when starting or talking to Claude Code
    #[error("Connection error: {0}")]
    Connection(String),

    /// Process execution error with exit code and stderr
    #[error("Process error (exit code {exit_code}): {message}")]
    Process {
        /// Error message
        message: String,
        /// Process exit code
        exit_code: i32,
        /// Standard error output captured from the CLI
        stderr: Option<String>,
    },

    /// JSON decode error when parsing CLI output
    #[error("JSON decode error: {0}")]
    JsonDecode(#[from] serde_json::Error),

    /// JSON encode error
    #[error("JSON encode error: {0}")]
    JsonEncode(String),

    /// Message parse error with optional raw data
    #[error("Message parse error: {message}")]
    MessageParse {
        /// Error message
        message: String,
        /// Raw message data that failed to parse
        data: Option<serde_json::Value>,
    },

    /// A stdout line exceeded the configured framing bound
    #[error("Line exceeded maximum length of {limit} bytes; discarded up to the next newline")]
    LineTooLong {
        /// Configured per-line ceiling in bytes
        limit: usize,
    },

    /// Transport layer error
    #[error("Transport error: {0}")]
    Transport(String),

    /// Control protocol error
    #[error("Control protocol error: {0}")]
    ControlProtocol(String),

    /// Control protocol request timed out
    #[error("Control request timed out after {timeout_ms} ms: {request_type}")]
    ControlTimeout {
        /// Timeout duration in milliseconds
        timeout_ms: u64,
        /// Type of request that timed out
        request_type: String,
    },

    /// Pending control request aborted because the transport closed
    #[error("Control request aborted, transport closed: {request_type}")]
    ControlClosed {
        /// Type of request that was pending
        request_type: String,
    },

    /// Hook execution error
    #[error("Hook error: {0}")]
    Hook(String),

    /// MCP (Model Context Protocol) error
    #[error("MCP error: {0}")]
    Mcp(String),

    /// I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// CLI version is below minimum required
    #[error(
        "Claude Code version {found} is below minimum required version {minimum}. Update with: npm update -g @anthropic-ai/claude-code"
    )]
    CliVersionTooOld {
        /// Version found
        found: String,
        /// Minimum version required
        minimum: String,
    },

    /// Client is not connected
    #[error("Not connected. Start the client before issuing operations.")]
    NotConnected,
}

/// Result type alias for Claude SDK operations
pub type Result<T> = std::result::Result<T, ClaudeError>;

impl ClaudeError {
    /// Create a CLI not found error with a helpful message
    #[must_use]
    pub fn cli_not_found() -> Self {
        Self::CliNotFound(
            "Claude Code not found. Install with:\n\
             npm install -g @anthropic-ai/claude-code\n\
             \n\
             If already installed locally, try:\n\
             export PATH=\"$HOME/node_modules/.bin:$PATH\"\n\
             \n\
             Or specify the path when creating transport"
                .to_string(),
        )
    }

    /// Create a connection error
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Create a process error
    pub fn process(msg: impl Into<String>, exit_code: i32, stderr: Option<String>) -> Self {
        Self::Process {
            message: msg.into(),
            exit_code,
            stderr,
        }
    }

    /// Create a message parse error
    pub fn message_parse(msg: impl Into<String>, data: Option<serde_json::Value>) -> Self {
        Self::MessageParse {
            message: msg.into(),
            data,
        }
    }

    /// Create a transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create a control protocol error
    pub fn control_protocol(msg: impl Into<String>) -> Self {
        Self::ControlProtocol(msg.into())
    }

    /// Create a JSON encode error
    pub fn json_encode(msg: impl Into<String>) -> Self {
        Self::JsonEncode(msg.into())
    }

    /// Create a control timeout error
    pub fn control_timeout(timeout_ms: u64, request_type: impl Into<String>) -> Self {
        Self::ControlTimeout {
            timeout_ms,
            request_type: request_type.into(),
        }
    }

    /// Create a control closed error
    pub fn control_closed(request_type: impl Into<String>) -> Self {
        Self::ControlClosed {
            request_type: request_type.into(),
        }
    }

    /// Create a hook error
    pub fn hook(msg: impl Into<String>) -> Self {
        Self::Hook(msg.into())
    }

    /// Create an MCP error
    pub fn mcp(msg: impl Into<String>) -> Self {
        Self::Mcp(msg.into())
    }

    /// Create an invalid configuration error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a CLI version too old error
    pub fn cli_version_too_old(found: impl Into<String>, minimum: impl Into<String>) -> Self {
        Self::CliVersionTooOld {
            found: found.into(),
            minimum: minimum.into(),
        }
    }

    /// Create a not connected error
    #[must_use]
    pub fn not_connected() -> Self {
        Self::NotConnected
    }
}
