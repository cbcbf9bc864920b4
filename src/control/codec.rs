//! Wire codec for the control protocol
//!
//! Envelope shapes:
//!
//! ```json
//! {"type": "control_request", "request_id": "req_0_1a2b", "request": {"subtype": "set_model", "model": "opus"}}
//! {"type": "control_response", "response": {"subtype": "success", "request_id": "req_0_1a2b", "response": {...}}}
//! {"type": "control_cancel_request", "request_id": "req_3_9f"}
//! ```
//!
//! Field spellings vary across CLI versions; the codec accepts both camelCase
//! and snake_case on input and emits the CLI-expected form on output.

use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{ClaudeError, Result};
use crate::types::{PermissionMode, RequestId};

// ============================================================================
// Request IDs
// ============================================================================

/// Generator for control-request ids
///
/// Ids are a monotonic counter joined with a nanosecond-clock hex suffix
/// (`req_0_1a2b3c`), unique within the process.
#[derive(Debug, Default)]
pub struct RequestIdGenerator {
    counter: AtomicU64,
}

impl RequestIdGenerator {
    /// Create a new generator starting at zero
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Produce the next request id
    pub fn next_id(&self) -> RequestId {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        RequestId::new(format!("req_{n}_{nanos:x}"))
    }
}

// ============================================================================
// Outbound Requests (SDK → CLI)
// ============================================================================

/// Control requests the SDK sends to the CLI
#[derive(Debug, Clone)]
pub enum OutboundRequest {
    /// Protocol handshake carrying the hooks table and SDK MCP declarations
    Initialize {
        /// CLI-facing hooks table (`{"PreToolUse": [{"matcher": ..., "hookCallbackIds": [...]}]}`)
        hooks: Option<Value>,
        /// Declared in-process servers (`{name: {"name": ..., "version": ...}}`)
        sdk_mcp_servers: Option<Value>,
    },
    /// Switch the active model
    SetModel {
        /// Model name or alias
        model: String,
    },
    /// Switch the permission mode
    SetPermissionMode {
        /// New mode
        mode: PermissionMode,
    },
    /// Interrupt the current turn
    Interrupt,
    /// Rewind tracked files to their state at a user message
    RewindFiles {
        /// UUID of the user message to rewind to
        user_message_id: String,
    },
}

impl OutboundRequest {
    /// The request subtype, used in errors and timeouts
    #[must_use]
    pub fn subtype(&self) -> &'static str {
        match self {
            OutboundRequest::Initialize { .. } => "initialize",
            OutboundRequest::SetModel { .. } => "set_model",
            OutboundRequest::SetPermissionMode { .. } => "set_permission_mode",
            OutboundRequest::Interrupt => "interrupt",
            OutboundRequest::RewindFiles { .. } => "rewind_files",
        }
    }

    fn payload(&self) -> Value {
        match self {
            OutboundRequest::Initialize {
                hooks,
                sdk_mcp_servers,
            } => {
                let mut request = json!({"subtype": "initialize"});
                if let Some(hooks) = hooks {
                    request["hooks"] = hooks.clone();
                }
                if let Some(servers) = sdk_mcp_servers {
                    request["sdkMcpServers"] = servers.clone();
                }
                request
            }
            OutboundRequest::SetModel { model } => {
                json!({"subtype": "set_model", "model": model})
            }
            OutboundRequest::SetPermissionMode { mode } => {
                json!({"subtype": "set_permission_mode", "mode": mode.as_str()})
            }
            OutboundRequest::Interrupt => json!({"subtype": "interrupt"}),
            OutboundRequest::RewindFiles { user_message_id } => {
                json!({"subtype": "rewind_files", "user_message_id": user_message_id})
            }
        }
    }
}

/// Encode an outbound control request into a wire line
///
/// Returns the generated request id together with the newline-terminated
/// line.
///
/// # Errors
/// Returns an encode error if serialization fails.
pub fn encode_request(
    ids: &RequestIdGenerator,
    request: &OutboundRequest,
) -> Result<(RequestId, String)> {
    let request_id = ids.next_id();
    let envelope = json!({
        "type": "control_request",
        "request_id": request_id.as_str(),
        "request": request.payload(),
    });
    let line = serde_json::to_string(&envelope)
        .map_err(|e| ClaudeError::json_encode(format!("control request: {e}")))?;
    Ok((request_id, format!("{line}\n")))
}

/// Encode a success control response for a CLI-originated request
///
/// # Errors
/// Returns an encode error if serialization fails.
pub fn encode_success_response(request_id: &str, payload: Value) -> Result<String> {
    let envelope = json!({
        "type": "control_response",
        "response": {
            "subtype": "success",
            "request_id": request_id,
            "response": payload,
        },
    });
    let line = serde_json::to_string(&envelope)
        .map_err(|e| ClaudeError::json_encode(format!("control response: {e}")))?;
    Ok(format!("{line}\n"))
}

/// Encode an error control response for a CLI-originated request
///
/// # Errors
/// Returns an encode error if serialization fails.
pub fn encode_error_response(request_id: &str, message: &str) -> Result<String> {
    let envelope = json!({
        "type": "control_response",
        "response": {
            "subtype": "error",
            "request_id": request_id,
            "error": message,
        },
    });
    let line = serde_json::to_string(&envelope)
        .map_err(|e| ClaudeError::json_encode(format!("control response: {e}")))?;
    Ok(format!("{line}\n"))
}

/// Encode a user message line
///
/// # Errors
/// Returns an encode error if serialization fails.
pub fn encode_user_message(
    content: &str,
    session_id: &str,
    parent_tool_use_id: Option<&str>,
) -> Result<String> {
    let envelope = json!({
        "type": "user",
        "message": {
            "role": "user",
            "content": content,
        },
        "session_id": session_id,
        "parent_tool_use_id": parent_tool_use_id,
    });
    let line = serde_json::to_string(&envelope)
        .map_err(|e| ClaudeError::json_encode(format!("user message: {e}")))?;
    Ok(format!("{line}\n"))
}

// ============================================================================
// Inbound Frames (CLI → SDK)
// ============================================================================

/// A control response received from the CLI
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "subtype")]
pub enum ControlResponseFrame {
    /// The request succeeded
    #[serde(rename = "success")]
    Success {
        /// Correlating request id
        request_id: RequestId,
        /// Result payload; spelled `response` or `result` depending on the
        /// CLI version
        #[serde(default)]
        response: Option<Value>,
        /// Alternate payload spelling
        #[serde(default)]
        result: Option<Value>,
    },
    /// The request failed
    #[serde(rename = "error")]
    Error {
        /// Correlating request id
        request_id: RequestId,
        /// Error description
        #[serde(default)]
        error: Option<String>,
    },
}

impl ControlResponseFrame {
    /// The request id this response correlates with
    #[must_use]
    pub fn request_id(&self) -> &RequestId {
        match self {
            ControlResponseFrame::Success { request_id, .. }
            | ControlResponseFrame::Error { request_id, .. } => request_id,
        }
    }

    /// Convert into the waiter-facing result
    #[must_use]
    pub fn into_result(self) -> Result<Value> {
        match self {
            ControlResponseFrame::Success {
                response, result, ..
            } => Ok(response.or(result).unwrap_or(Value::Null)),
            ControlResponseFrame::Error { error, .. } => Err(ClaudeError::control_protocol(
                error.unwrap_or_else(|| "unknown control error".to_string()),
            )),
        }
    }
}

/// Control requests the CLI sends to the SDK
#[derive(Debug, Clone)]
pub enum InboundControlRequest {
    /// Invoke a registered hook callback
    HookCallback {
        /// Stable callback id assigned at registration
        callback_id: String,
        /// Event payload
        input: Value,
        /// Tool use id for tool-related events
        tool_use_id: Option<String>,
    },
    /// Ask the permission callback whether a tool may run
    CanUseTool {
        /// Tool being requested
        tool_name: String,
        /// Tool input parameters
        input: Value,
        /// Permission-update suggestions
        permission_suggestions: Option<Vec<Value>>,
        /// Path the CLI blocked, if any
        blocked_path: Option<String>,
    },
    /// Invoke an in-process MCP tool (`mcp_message` or `sdk_mcp_request`)
    McpMessage {
        /// Target server name
        server_name: String,
        /// JSONRPC or direct invocation payload
        message: Value,
    },
    /// A subtype this SDK version does not understand
    Other {
        /// The unrecognized subtype
        subtype: String,
    },
}

#[derive(Deserialize)]
struct HookCallbackFields {
    #[serde(alias = "callbackId")]
    callback_id: String,
    #[serde(default)]
    input: Value,
    #[serde(default, alias = "toolUseId")]
    tool_use_id: Option<String>,
}

#[derive(Deserialize)]
struct CanUseToolFields {
    #[serde(alias = "toolName")]
    tool_name: String,
    #[serde(default)]
    input: Value,
    #[serde(default, alias = "permissionSuggestions")]
    permission_suggestions: Option<Vec<Value>>,
    #[serde(default, alias = "blockedPath")]
    blocked_path: Option<String>,
}

#[derive(Deserialize)]
struct McpMessageFields {
    #[serde(alias = "serverName")]
    server_name: String,
    #[serde(default)]
    message: Value,
}

/// Parse the `request` object of an inbound control request
///
/// Unknown subtypes yield [`InboundControlRequest::Other`] so the caller can
/// answer with an error response instead of dropping the frame.
///
/// # Errors
/// Returns a protocol error when the subtype is missing or required fields
/// do not parse.
pub fn parse_inbound_request(request: &Value) -> Result<InboundControlRequest> {
    let subtype = request
        .get("subtype")
        .and_then(Value::as_str)
        .ok_or_else(|| ClaudeError::control_protocol("control request without subtype"))?;

    match subtype {
        "hook_callback" => {
            let fields: HookCallbackFields = serde_json::from_value(request.clone())
                .map_err(|e| ClaudeError::control_protocol(format!("hook_callback: {e}")))?;
            Ok(InboundControlRequest::HookCallback {
                callback_id: fields.callback_id,
                input: fields.input,
                tool_use_id: fields.tool_use_id,
            })
        }
        "can_use_tool" => {
            let fields: CanUseToolFields = serde_json::from_value(request.clone())
                .map_err(|e| ClaudeError::control_protocol(format!("can_use_tool: {e}")))?;
            Ok(InboundControlRequest::CanUseTool {
                tool_name: fields.tool_name,
                input: fields.input,
                permission_suggestions: fields.permission_suggestions,
                blocked_path: fields.blocked_path,
            })
        }
        // Older CLI versions say mcp_message, newer ones sdk_mcp_request
        "mcp_message" | "sdk_mcp_request" => {
            let fields: McpMessageFields = serde_json::from_value(request.clone())
                .map_err(|e| ClaudeError::control_protocol(format!("{subtype}: {e}")))?;
            Ok(InboundControlRequest::McpMessage {
                server_name: fields.server_name,
                message: fields.message,
            })
        }
        other => Ok(InboundControlRequest::Other {
            subtype: other.to_string(),
        }),
    }
}

/// A classified inbound wire frame
#[derive(Debug)]
pub enum InboundFrame {
    /// The CLI is asking the SDK to do something
    ControlRequest {
        /// Correlating request id to answer on
        request_id: String,
        /// Raw request object (parse with [`parse_inbound_request`])
        request: Value,
    },
    /// Answer to an SDK-issued request
    ControlResponse(ControlResponseFrame),
    /// The CLI cancelled an in-flight request it previously issued
    ControlCancelRequest {
        /// Id of the cancelled request
        request_id: String,
    },
    /// A conversation message or unknown frame, forwarded to subscribers
    Message(Value),
}

/// Classify one wire line by its top-level `type`
///
/// Unknown `type` values are forwarded as [`InboundFrame::Message`] rather
/// than rejected.
///
/// # Errors
/// Returns a decode error when the line is not valid JSON or a control frame
/// is malformed.
pub fn decode_frame(line: &str) -> Result<InboundFrame> {
    let value: Value = serde_json::from_str(line)?;

    let Some(frame_type) = value.get("type").and_then(Value::as_str) else {
        return Err(ClaudeError::message_parse(
            "frame without a type field",
            Some(value),
        ));
    };

    match frame_type {
        "control_request" => {
            let request_id = value
                .get("request_id")
                .and_then(Value::as_str)
                .ok_or_else(|| {
                    ClaudeError::control_protocol("control_request without request_id")
                })?
                .to_string();
            let request = value
                .get("request")
                .cloned()
                .ok_or_else(|| ClaudeError::control_protocol("control_request without body"))?;
            Ok(InboundFrame::ControlRequest {
                request_id,
                request,
            })
        }
        "control_response" => {
            let response = value
                .get("response")
                .cloned()
                .ok_or_else(|| ClaudeError::control_protocol("control_response without body"))?;
            let frame: ControlResponseFrame = serde_json::from_value(response)
                .map_err(|e| ClaudeError::control_protocol(format!("control_response: {e}")))?;
            Ok(InboundFrame::ControlResponse(frame))
        }
        "control_cancel_request" => {
            let request_id = value
                .get("request_id")
                .and_then(Value::as_str)
                .ok_or_else(|| {
                    ClaudeError::control_protocol("control_cancel_request without request_id")
                })?
                .to_string();
            Ok(InboundFrame::ControlCancelRequest { request_id })
        }
        _ => Ok(InboundFrame::Message(value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_ids_unique() {
        let ids = RequestIdGenerator::new();
        let a = ids.next_id();
        let b = ids.next_id();
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("req_0_"));
        assert!(b.as_str().starts_with("req_1_"));
    }

    #[test]
    fn test_encode_set_model() {
        let ids = RequestIdGenerator::new();
        let (request_id, line) = encode_request(
            &ids,
            &OutboundRequest::SetModel {
                model: "opus".to_string(),
            },
        )
        .unwrap();

        assert!(line.ends_with('\n'));
        let value: Value = serde_json::from_str(line.trim()).unwrap();
        assert_eq!(value["type"], "control_request");
        assert_eq!(value["request_id"], request_id.as_str());
        assert_eq!(value["request"]["subtype"], "set_model");
        assert_eq!(value["request"]["model"], "opus");
    }

    #[test]
    fn test_encode_initialize_with_hooks_and_servers() {
        let ids = RequestIdGenerator::new();
        let hooks = serde_json::json!({
            "PreToolUse": [{"matcher": "Bash", "hookCallbackIds": ["hook_0"]}]
        });
        let servers = serde_json::json!({
            "calc": {"name": "calc", "version": "1.0.0"}
        });
        let (_, line) = encode_request(
            &ids,
            &OutboundRequest::Initialize {
                hooks: Some(hooks),
                sdk_mcp_servers: Some(servers),
            },
        )
        .unwrap();

        let value: Value = serde_json::from_str(line.trim()).unwrap();
        assert_eq!(value["request"]["subtype"], "initialize");
        assert_eq!(
            value["request"]["hooks"]["PreToolUse"][0]["hookCallbackIds"][0],
            "hook_0"
        );
        assert_eq!(value["request"]["sdkMcpServers"]["calc"]["name"], "calc");
    }

    #[test]
    fn test_encode_interrupt_and_permission_mode() {
        let ids = RequestIdGenerator::new();

        let (_, line) = encode_request(&ids, &OutboundRequest::Interrupt).unwrap();
        let value: Value = serde_json::from_str(line.trim()).unwrap();
        assert_eq!(value["request"]["subtype"], "interrupt");

        let (_, line) = encode_request(
            &ids,
            &OutboundRequest::SetPermissionMode {
                mode: PermissionMode::Plan,
            },
        )
        .unwrap();
        let value: Value = serde_json::from_str(line.trim()).unwrap();
        assert_eq!(value["request"]["subtype"], "set_permission_mode");
        assert_eq!(value["request"]["mode"], "plan");
    }

    #[test]
    fn test_encode_user_message() {
        let line = encode_user_message("Say hi", "default", None).unwrap();
        let value: Value = serde_json::from_str(line.trim()).unwrap();
        assert_eq!(value["type"], "user");
        assert_eq!(value["message"]["role"], "user");
        assert_eq!(value["message"]["content"], "Say hi");
        assert_eq!(value["session_id"], "default");
        assert_eq!(value["parent_tool_use_id"], Value::Null);
    }

    #[test]
    fn test_decode_control_response_success() {
        let line = r#"{"type":"control_response","response":{"subtype":"success","request_id":"req_1_a","response":{"model":"claude-opus-4"}}}"#;
        match decode_frame(line).unwrap() {
            InboundFrame::ControlResponse(frame) => {
                assert_eq!(frame.request_id().as_str(), "req_1_a");
                let result = frame.into_result().unwrap();
                assert_eq!(result["model"], "claude-opus-4");
            }
            other => panic!("expected control response, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_control_response_result_spelling() {
        let line = r#"{"type":"control_response","response":{"subtype":"success","request_id":"req_1_a","result":{"ok":true}}}"#;
        match decode_frame(line).unwrap() {
            InboundFrame::ControlResponse(frame) => {
                assert_eq!(frame.into_result().unwrap()["ok"], true);
            }
            other => panic!("expected control response, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_control_response_error() {
        let line = r#"{"type":"control_response","response":{"subtype":"error","request_id":"req_1_a","error":"no such model"}}"#;
        match decode_frame(line).unwrap() {
            InboundFrame::ControlResponse(frame) => {
                let err = frame.into_result().unwrap_err();
                assert!(err.to_string().contains("no such model"));
            }
            other => panic!("expected control response, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_control_request_and_cancel() {
        let line = r#"{"type":"control_request","request_id":"req_9_b","request":{"subtype":"can_use_tool","tool_name":"Bash","input":{"command":"ls"}}}"#;
        match decode_frame(line).unwrap() {
            InboundFrame::ControlRequest {
                request_id,
                request,
            } => {
                assert_eq!(request_id, "req_9_b");
                assert_eq!(request["subtype"], "can_use_tool");
            }
            other => panic!("expected control request, got {other:?}"),
        }

        let line = r#"{"type":"control_cancel_request","request_id":"req_9_b"}"#;
        match decode_frame(line).unwrap() {
            InboundFrame::ControlCancelRequest { request_id } => {
                assert_eq!(request_id, "req_9_b");
            }
            other => panic!("expected cancel, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_unknown_type_forwarded() {
        let line = r#"{"type":"telemetry","data":{"x":1}}"#;
        match decode_frame(line).unwrap() {
            InboundFrame::Message(value) => assert_eq!(value["type"], "telemetry"),
            other => panic!("expected message, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_invalid_json() {
        assert!(decode_frame("not json").is_err());
    }

    #[test]
    fn test_parse_inbound_hook_callback_both_spellings() {
        let snake = serde_json::json!({
            "subtype": "hook_callback",
            "callback_id": "hook_0",
            "input": {"tool_name": "Bash"},
            "tool_use_id": "toolu_1"
        });
        match parse_inbound_request(&snake).unwrap() {
            InboundControlRequest::HookCallback {
                callback_id,
                tool_use_id,
                ..
            } => {
                assert_eq!(callback_id, "hook_0");
                assert_eq!(tool_use_id.as_deref(), Some("toolu_1"));
            }
            other => panic!("expected hook callback, got {other:?}"),
        }

        let camel = serde_json::json!({
            "subtype": "hook_callback",
            "callbackId": "hook_1",
            "input": {},
            "toolUseId": "toolu_2"
        });
        match parse_inbound_request(&camel).unwrap() {
            InboundControlRequest::HookCallback {
                callback_id,
                tool_use_id,
                ..
            } => {
                assert_eq!(callback_id, "hook_1");
                assert_eq!(tool_use_id.as_deref(), Some("toolu_2"));
            }
            other => panic!("expected hook callback, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_inbound_can_use_tool_with_blocked_path() {
        let request = serde_json::json!({
            "subtype": "can_use_tool",
            "toolName": "Write",
            "input": {"file_path": "/etc/passwd"},
            "blockedPath": "/etc/passwd"
        });
        match parse_inbound_request(&request).unwrap() {
            InboundControlRequest::CanUseTool {
                tool_name,
                blocked_path,
                ..
            } => {
                assert_eq!(tool_name, "Write");
                assert_eq!(blocked_path.as_deref(), Some("/etc/passwd"));
            }
            other => panic!("expected can_use_tool, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_inbound_mcp_message_aliases() {
        for subtype in ["mcp_message", "sdk_mcp_request"] {
            let request = serde_json::json!({
                "subtype": subtype,
                "server_name": "calc",
                "message": {"tool": "add", "input": {"a": 2, "b": 3}}
            });
            match parse_inbound_request(&request).unwrap() {
                InboundControlRequest::McpMessage { server_name, .. } => {
                    assert_eq!(server_name, "calc");
                }
                other => panic!("expected mcp message, got {other:?}"),
            }
        }

        // camelCase server name
        let request = serde_json::json!({
            "subtype": "mcp_message",
            "serverName": "calc",
            "message": {}
        });
        assert!(matches!(
            parse_inbound_request(&request).unwrap(),
            InboundControlRequest::McpMessage { .. }
        ));
    }

    #[test]
    fn test_parse_inbound_unknown_subtype() {
        let request = serde_json::json!({"subtype": "future_thing"});
        match parse_inbound_request(&request).unwrap() {
            InboundControlRequest::Other { subtype } => assert_eq!(subtype, "future_thing"),
            other => panic!("expected other, got {other:?}"),
        }
    }

    #[test]
    fn test_response_encode_decode_roundtrip() {
        let line =
            encode_success_response("req_4_z", serde_json::json!({"behavior": "allow"})).unwrap();
        match decode_frame(line.trim()).unwrap() {
            InboundFrame::ControlResponse(frame) => {
                assert_eq!(frame.request_id().as_str(), "req_4_z");
                assert_eq!(frame.into_result().unwrap()["behavior"], "allow");
            }
            other => panic!("expected control response, got {other:?}"),
        }

        let line = encode_error_response("req_5_y", "hook timed out").unwrap();
        match decode_frame(line.trim()).unwrap() {
            InboundFrame::ControlResponse(frame) => {
                assert!(
                    frame
                        .into_result()
                        .unwrap_err()
                        .to_string()
                        .contains("hook timed out")
                );
            }
            other => panic!("expected control response, got {other:?}"),
        }
    }
}
