//! Newtype wrappers for type safety
//!
//! Session ids, tool names, and control-protocol request ids are all plain
//! strings on the wire; the newtypes keep them from being mixed up in code.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;

macro_rules! string_newtype {
    ($(#[$doc:meta])* $name:ident, $ctor_doc:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            #[doc = $ctor_doc]
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Get the inner value as a string slice
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl std::ops::Deref for $name {
            type Target = str;
            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}

string_newtype!(
    /// Session ID assigned by the CLI on the first `system` init frame
    SessionId,
    "Create a new session ID"
);

string_newtype!(
    /// Tool name as echoed through hook and permission callbacks
    ToolName,
    "Create a new tool name"
);

string_newtype!(
    /// Request ID correlating control requests with their responses
    RequestId,
    "Create a new request ID"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_newtype_roundtrip() {
        let id = SessionId::new("sess-123");
        assert_eq!(id.as_str(), "sess-123");
        assert_eq!(id.to_string(), "sess-123");

        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"sess-123\"");
        let back: SessionId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_newtypes_are_distinct() {
        let tool = ToolName::from("Bash");
        let req = RequestId::from("req_0_ab");
        assert_eq!(tool.as_ref(), "Bash");
        assert_eq!(&*req, "req_0_ab");
    }
}
