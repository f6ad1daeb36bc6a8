//! JSON-RPC 2.0 envelopes exchanged over stdio.
//!
//! One request object per input line, one response object per output line.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::errors::AdbMcpError;

/// Protocol version tag carried by every envelope.
pub const JSONRPC_VERSION: &str = "2.0";

fn default_version() -> String {
    JSONRPC_VERSION.to_string()
}

/// A request received from the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    /// Protocol version; `"2.0"` when the client omits it.
    #[serde(default = "default_version")]
    pub jsonrpc: String,
    /// Request identifier, echoed verbatim. `Null` when absent.
    #[serde(default)]
    pub id: Value,
    /// The RPC method name.
    pub method: String,
    /// Optional parameters for the method.
    #[serde(default)]
    pub params: Option<Value>,
}

/// A response sent back to the client. Exactly one of `result` and `error`
/// is present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    /// Always `"2.0"`.
    pub jsonrpc: String,
    /// The identifier of the request this answers; `null` for parse errors.
    pub id: Value,
    /// Method result; present on success only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Failure detail; present on error only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    /// Creates a successful response.
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: default_version(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Creates an error response.
    pub fn error(id: Value, code: ErrorCode, message: String) -> Self {
        Self::error_with_data(id, code, message, None)
    }

    /// Creates an error response with structured detail.
    pub fn error_with_data(
        id: Value,
        code: ErrorCode,
        message: String,
        data: Option<Value>,
    ) -> Self {
        Self {
            jsonrpc: default_version(),
            id,
            result: None,
            error: Some(JsonRpcError {
                code: code.as_i32(),
                message,
                data,
            }),
        }
    }

    /// Reports a failed tool call under the code its error maps to.
    ///
    /// Execution failures are prefixed so the client can tell them apart from
    /// argument problems without inspecting the code.
    pub fn tool_error(id: Value, err: &AdbMcpError) -> Self {
        let code = err.error_code();
        let message = match code {
            ErrorCode::InternalError => format!("tool execution failed: {}", err),
            _ => err.to_string(),
        };
        Self::error_with_data(id, code, message, err.error_data())
    }
}

/// A JSON-RPC 2.0 error object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    /// Numeric code from `ErrorCode`.
    pub code: i32,
    /// Human-readable description, embedding the underlying cause.
    pub message: String,
    /// Structured detail such as the offending tool or argument name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// JSON-RPC error codes used by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// The line was not a valid JSON-RPC request.
    ParseError,
    /// Unknown method, or unknown tool on `call-tool`.
    MethodNotFound,
    /// Missing or ill-typed parameters or tool arguments.
    InvalidParams,
    /// The tool failed while running: launch, timeout, non-zero exit, panic.
    InternalError,
}

impl ErrorCode {
    /// Returns the numeric error code as defined by JSON-RPC 2.0.
    pub fn as_i32(self) -> i32 {
        match self {
            Self::ParseError => -32700,
            Self::MethodNotFound => -32601,
            Self::InvalidParams => -32602,
            Self::InternalError => -32603,
        }
    }
}

/// Wraps a tool's return value as a list of content items.
///
/// A string becomes one text item as-is; any other value is serialized to
/// compact JSON text first.
pub fn tool_result(value: Value) -> Value {
    let text = match value {
        Value::String(s) => s,
        other => other.to_string(),
    };
    json!({
        "content": [{ "type": "text", "text": text }]
    })
}
