//! Message parsing
//!
//! Converts raw JSON values from the wire into typed [`Message`]s. Unknown
//! message types are forwarded as [`Message::Other`] so new CLI versions do
//! not break older SDKs.

use serde_json::Value;

use crate::error::{ClaudeError, Result};
use crate::types::Message;

/// Parse a raw JSON value into a typed message
///
/// # Errors
/// Returns [`ClaudeError::MessageParse`] when the value has no `type` field
/// or a known type fails schema validation. The offending payload is retained
/// on the error for diagnostics.
pub fn parse_message(value: Value) -> Result<Message> {
    let Some(message_type) = value.get("type").and_then(Value::as_str).map(str::to_string) else {
        return Err(ClaudeError::message_parse(
            "message without a type field",
            Some(value),
        ));
    };

    match message_type.as_str() {
        "user" | "assistant" | "system" | "result" | "stream_event" => {
            serde_json::from_value(value.clone()).map_err(|e| {
                ClaudeError::message_parse(
                    format!("failed to parse {message_type} message: {e}"),
                    Some(value),
                )
            })
        }
        other => Ok(Message::Other {
            message_type: other.to_string(),
            data: value,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_result_message() {
        let value = serde_json::json!({
            "type": "result",
            "subtype": "success",
            "duration_ms": 100,
            "is_error": false,
            "session_id": "sess-1"
        });
        let msg = parse_message(value).unwrap();
        assert!(msg.is_result());
    }

    #[test]
    fn test_parse_unknown_type_forwarded() {
        let value = serde_json::json!({"type": "diagnostic", "level": "info"});
        match parse_message(value).unwrap() {
            Message::Other {
                message_type, data, ..
            } => {
                assert_eq!(message_type, "diagnostic");
                assert_eq!(data["level"], "info");
            }
            other => panic!("expected other, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_missing_type_is_error() {
        let value = serde_json::json!({"subtype": "init"});
        let err = parse_message(value).unwrap_err();
        match err {
            ClaudeError::MessageParse { data, .. } => assert!(data.is_some()),
            other => panic!("expected message parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_known_type_bad_schema_is_error() {
        // result without a session_id fails validation
        let value = serde_json::json!({"type": "result", "subtype": "success"});
        assert!(parse_message(value).is_err());
    }
}
