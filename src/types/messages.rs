//! Message types for conversations

use serde::{Deserialize, Serialize};

use super::identifiers::SessionId;

// ============================================================================
// Content Blocks
// ============================================================================

/// Content value for tool results
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContentValue {
    /// String content
    String(String),
    /// Structured content blocks
    Blocks(Vec<serde_json::Value>),
}

/// Content block types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    /// Text content block
    Text {
        /// Text content
        text: String,
    },
    /// Thinking content block (extended thinking)
    Thinking {
        /// Thinking content
        thinking: String,
        /// Signature for verification
        signature: String,
    },
    /// Tool use request
    ToolUse {
        /// Tool use ID
        id: String,
        /// Tool name
        name: String,
        /// Tool input parameters
        input: serde_json::Value,
    },
    /// Tool execution result
    ToolResult {
        /// ID of the tool use this is a result for
        tool_use_id: String,
        /// Result content
        #[serde(skip_serializing_if = "Option::is_none")]
        content: Option<ContentValue>,
        /// Whether this is an error result
        #[serde(skip_serializing_if = "Option::is_none")]
        is_error: Option<bool>,
    },
}

/// User message content
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserMessageContent {
    /// Message role (always "user")
    pub role: String,
    /// Message content
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<UserContent>,
}

/// User content can be string or blocks
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserContent {
    /// Plain string content
    String(String),
    /// Structured content blocks
    Blocks(Vec<ContentBlock>),
}

/// Assistant message content
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantMessageContent {
    /// Model that generated the message
    pub model: String,
    /// Message content blocks
    pub content: Vec<ContentBlock>,
}

// ============================================================================
// Message
// ============================================================================

/// Message types streamed by the CLI
///
/// Exactly one `Result` frame terminates each logical turn. The `session_id`
/// is assigned on the first `System` init frame and is stable for the rest of
/// the session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Message {
    /// User message
    User {
        /// Parent tool use ID for nested conversations
        #[serde(skip_serializing_if = "Option::is_none")]
        parent_tool_use_id: Option<String>,
        /// Message content
        message: UserMessageContent,
        /// Session ID
        #[serde(skip_serializing_if = "Option::is_none")]
        session_id: Option<SessionId>,
        /// Message UUID (requires `--replay-user-messages`)
        #[serde(skip_serializing_if = "Option::is_none")]
        uuid: Option<String>,
    },
    /// Assistant message
    Assistant {
        /// Parent tool use ID for nested conversations
        #[serde(skip_serializing_if = "Option::is_none")]
        parent_tool_use_id: Option<String>,
        /// Message content
        message: AssistantMessageContent,
        /// Session ID
        #[serde(skip_serializing_if = "Option::is_none")]
        session_id: Option<SessionId>,
    },
    /// System message
    System {
        /// System message subtype ("init", "compact_boundary", ...)
        subtype: String,
        /// Additional system message data
        #[serde(flatten)]
        data: serde_json::Value,
    },
    /// Result message with metrics, terminating a turn
    Result {
        /// Result subtype; "success" or an error subtype. The set is
        /// extensible, unknown subtypes pass through untouched.
        subtype: String,
        /// Total duration in milliseconds
        #[serde(default)]
        duration_ms: u64,
        /// API call duration in milliseconds
        #[serde(default)]
        duration_api_ms: u64,
        /// Whether this is an error result
        #[serde(default)]
        is_error: bool,
        /// Number of conversation turns
        #[serde(default)]
        num_turns: u32,
        /// Session ID
        session_id: SessionId,
        /// Total cost in USD
        #[serde(skip_serializing_if = "Option::is_none")]
        total_cost_usd: Option<f64>,
        /// Token usage statistics
        #[serde(skip_serializing_if = "Option::is_none")]
        usage: Option<serde_json::Value>,
        /// Result text (for the success subtype)
        #[serde(skip_serializing_if = "Option::is_none")]
        result: Option<String>,
        /// Error messages (for error subtypes)
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        errors: Vec<String>,
    },
    /// Stream event for partial messages (gated by `include_partial_messages`)
    StreamEvent {
        /// Event UUID
        uuid: String,
        /// Session ID
        session_id: SessionId,
        /// Raw stream event data
        event: serde_json::Value,
        /// Parent tool use ID
        #[serde(skip_serializing_if = "Option::is_none")]
        parent_tool_use_id: Option<String>,
    },
    /// Message with an unrecognized `type`, forwarded rather than rejected
    Other {
        /// The original `type` tag
        message_type: String,
        /// Raw payload
        data: serde_json::Value,
    },
}

impl Message {
    /// The session id carried by this message, if any
    #[must_use]
    pub fn session_id(&self) -> Option<&SessionId> {
        match self {
            Message::User { session_id, .. } | Message::Assistant { session_id, .. } => {
                session_id.as_ref()
            }
            Message::Result { session_id, .. } | Message::StreamEvent { session_id, .. } => {
                Some(session_id)
            }
            Message::System { .. } | Message::Other { .. } => None,
        }
    }

    /// True for the terminal `Result` frame of a turn
    #[must_use]
    pub fn is_result(&self) -> bool {
        matches!(self, Message::Result { .. })
    }
}
