//! Transport-neutral form of method-channel traffic.
//!
//! A call is a method name plus optional JSON arguments. A response is one
//! of success (with a JSON value), a typed error, or "not implemented" for
//! unknown method names.
//!
//! ```text
//! {"method":"readCard"}
//! {"status":"success","value":{"uid":"04A1B2C3","timestamp":1760601600000}}
//! {"status":"error","code":"READ_ERROR","message":"No card detected or reader busy"}
//! {"status":"not_implemented"}
//! ```

use mifare_core::ErrorCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::BridgeError;

/// An incoming method call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodCall {
    /// Method name, e.g. `readCard`.
    pub method: String,

    /// Call arguments. None of the reader methods take any.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub arguments: Value,
}

impl MethodCall {
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            arguments: Value::Null,
        }
    }

    /// Parse a call from its JSON form.
    ///
    /// # Errors
    /// Returns the `serde_json` error for malformed input.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

/// Result of a method call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MethodResponse {
    Success {
        value: Value,
    },

    Error {
        code: ErrorCode,
        message: String,
    },

    /// The method name is not handled on this channel.
    NotImplemented,
}

impl MethodResponse {
    pub fn success(value: impl Into<Value>) -> Self {
        Self::Success {
            value: value.into(),
        }
    }

    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Error {
            code,
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Error code, for error responses.
    pub fn error_code(&self) -> Option<ErrorCode> {
        match self {
            Self::Error { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Serialize to a single JSON line.
    pub fn to_json(&self) -> String {
        // Variants hold only strings, codes and JSON values.
        serde_json::to_string(self).unwrap_or_else(|e| {
            format!(r#"{{"status":"error","code":"READ_ERROR","message":"{e}"}}"#)
        })
    }
}

impl<T: Into<Value>> From<Result<T, BridgeError>> for MethodResponse {
    fn from(result: Result<T, BridgeError>) -> Self {
        match result {
            Ok(value) => Self::success(value),
            Err(e) => Self::error(e.code(), e.to_string()),
        }
    }
}
