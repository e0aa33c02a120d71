//! Request and Response message types.
//!
//! Defines the framed message format exchanged with the browser control
//! subprocess. Every request carries a correlation ID and the frame the
//! command targets; every response echoes the ID.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::identifiers::{FrameId, RequestId};

use super::Command;

// ============================================================================
// Request
// ============================================================================

/// A command request from the client to the subprocess.
///
/// # Format
///
/// ```json
/// {
///   "id": "uuid",
///   "frameId": 0,
///   "method": "module.methodName",
///   "params": { ... }
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct Request {
    /// Unique identifier for request/response correlation.
    pub id: RequestId,

    /// Target frame (0 = main frame).
    #[serde(rename = "frameId")]
    pub frame: FrameId,

    /// Command with method and params.
    #[serde(flatten)]
    pub command: Command,
}

impl Request {
    /// Creates a new request with auto-generated ID.
    #[inline]
    #[must_use]
    pub fn new(frame: FrameId, command: Command) -> Self {
        Self {
            id: RequestId::generate(),
            frame,
            command,
        }
    }
}

// ============================================================================
// Response
// ============================================================================

/// A response from the subprocess.
///
/// # Format
///
/// Success:
/// ```json
/// { "id": "uuid", "type": "success", "result": { ... } }
/// ```
///
/// Error:
/// ```json
/// { "id": "uuid", "type": "error", "error": "code", "message": "detail" }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct Response {
    /// Matches the request `id`.
    pub id: RequestId,

    /// Response type.
    #[serde(rename = "type")]
    pub response_type: ResponseType,

    /// Result data (if success).
    #[serde(default)]
    pub result: Option<Value>,

    /// Error code (if error).
    #[serde(default)]
    pub error: Option<String>,

    /// Error message (if error).
    #[serde(default)]
    pub message: Option<String>,
}

impl Response {
    /// Returns `true` if this is a success response.
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.response_type == ResponseType::Success
    }

    /// Extracts the result value, mapping subprocess error codes to typed
    /// errors.
    ///
    /// # Errors
    ///
    /// | Subprocess code | Error |
    /// |-----------------|-------|
    /// | `not serializable` | [`Error::NotSerializable`] |
    /// | `frame not found` | [`Error::FrameNotFound`] |
    /// | `script error` | [`Error::ScriptError`] |
    /// | `invalid argument` | [`Error::InvalidArgument`] |
    /// | anything else | [`Error::Protocol`] |
    pub fn into_result(self) -> Result<Value> {
        match self.response_type {
            ResponseType::Success => Ok(self.result.unwrap_or(Value::Null)),
            ResponseType::Error => {
                let code = self.error.unwrap_or_else(|| "unknown error".to_string());
                let message = self.message.unwrap_or_else(|| code.clone());

                Err(match code.as_str() {
                    "not serializable" => Error::not_serializable(message),
                    "frame not found" => Error::frame_not_found(message),
                    "script error" => Error::script_error(message),
                    "invalid argument" => Error::invalid_argument(message),
                    _ => Error::protocol(message),
                })
            }
        }
    }

    /// Gets a string value from the result.
    ///
    /// Returns empty string if key not found or not a string.
    #[inline]
    #[must_use]
    pub fn get_string(&self, key: &str) -> String {
        self.result
            .as_ref()
            .and_then(|v| v.get(key))
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string()
    }

    /// Gets a u64 value from the result.
    ///
    /// Returns 0 if key not found or not a number.
    #[inline]
    #[must_use]
    pub fn get_u64(&self, key: &str) -> u64 {
        self.result
            .as_ref()
            .and_then(|v| v.get(key))
            .and_then(|v| v.as_u64())
            .unwrap_or_default()
    }

    /// Gets a boolean value from the result.
    ///
    /// Returns false if key not found or not a boolean.
    #[inline]
    #[must_use]
    pub fn get_bool(&self, key: &str) -> bool {
        self.result
            .as_ref()
            .and_then(|v| v.get(key))
            .and_then(|v| v.as_bool())
            .unwrap_or_default()
    }
}

// ============================================================================
// ResponseType
// ============================================================================

/// Response type discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
    /// Successful response.
    Success,
    /// Error response.
    Error,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::PageCommand;

    #[test]
    fn test_request_serialization() {
        let command = Command::Page(PageCommand::Reload);
        let request = Request::new(FrameId::MAIN, command);
        let json = serde_json::to_string(&request).expect("serialize");

        assert!(json.contains("page.reload"));
        assert!(json.contains("frameId"));
        assert!(json.contains(&request.id.to_string()));
    }

    #[test]
    fn test_success_response() {
        let json_str = r#"{
            "id": "550e8400-e29b-41d4-a716-446655440000",
            "type": "success",
            "result": {"title": "Example"}
        }"#;

        let response: Response = serde_json::from_str(json_str).expect("parse");
        assert!(response.is_success());
        assert_eq!(response.get_string("title"), "Example");
    }

    #[test]
    fn test_into_result_success() {
        let json_str = r#"{
            "id": "550e8400-e29b-41d4-a716-446655440000",
            "type": "success",
            "result": {"value": 42}
        }"#;

        let response: Response = serde_json::from_str(json_str).expect("parse");
        let result = response.into_result().expect("should succeed");
        assert_eq!(result.get("value").and_then(|v| v.as_u64()), Some(42));
    }

    #[test]
    fn test_error_code_mapping() {
        let cases = [
            ("not serializable", "NotSerializable"),
            ("frame not found", "FrameNotFound"),
            ("script error", "ScriptError"),
            ("invalid argument", "InvalidArgument"),
            ("weird failure", "Protocol"),
        ];

        for (code, expected) in cases {
            let json_str = format!(
                r#"{{
                    "id": "550e8400-e29b-41d4-a716-446655440000",
                    "type": "error",
                    "error": "{code}",
                    "message": "detail"
                }}"#
            );

            let response: Response = serde_json::from_str(&json_str).expect("parse");
            let err = response.into_result().unwrap_err();

            let matched = match expected {
                "NotSerializable" => matches!(err, Error::NotSerializable { .. }),
                "FrameNotFound" => matches!(err, Error::FrameNotFound { .. }),
                "ScriptError" => matches!(err, Error::ScriptError { .. }),
                "InvalidArgument" => matches!(err, Error::InvalidArgument { .. }),
                _ => matches!(err, Error::Protocol { .. }),
            };
            assert!(matched, "code {code:?} mapped to {err:?}");
        }
    }

    #[test]
    fn test_response_get_helpers() {
        let json_str = r#"{
            "id": "550e8400-e29b-41d4-a716-446655440000",
            "type": "success",
            "result": {
                "name": "test",
                "count": 42,
                "enabled": true
            }
        }"#;

        let response: Response = serde_json::from_str(json_str).expect("parse");
        assert_eq!(response.get_string("name"), "test");
        assert_eq!(response.get_u64("count"), 42);
        assert!(response.get_bool("enabled"));

        // Missing keys return defaults
        assert_eq!(response.get_string("missing"), "");
        assert_eq!(response.get_u64("missing"), 0);
        assert!(!response.get_bool("missing"));
    }
}
