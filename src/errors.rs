use std::time::Duration;

use serde_json::{json, Value};
use thiserror::Error;

use crate::mcp::transport::ErrorCode;

/// Errors that can occur while serving tool calls.
#[derive(Error, Debug)]
pub enum AdbMcpError {
    #[error("tool not found: {0}")]
    UnknownTool(String),

    #[error("missing required argument: {field}")]
    MissingArgument { field: String },

    #[error("invalid argument '{field}': expected {expected}")]
    InvalidArgument { field: String, expected: String },

    #[error("invalid arguments: {0}")]
    Arguments(String),

    #[error("{program} executable not found or not executable: {reason}")]
    Launch { program: String, reason: String },

    #[error("{program} command timed out after {timeout:?}")]
    Timeout { program: String, timeout: Duration },

    #[error("{program} command failed (exit {exit_code}): {detail}")]
    CommandFailed {
        program: String,
        exit_code: i32,
        detail: String,
    },

    #[error("{message} (path: {path})")]
    NotFound { message: String, path: String },

    #[error("config error: {message}")]
    Config { message: String },

    #[error("tool handler aborted: {0}")]
    Handler(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl AdbMcpError {
    /// Returns the JSON-RPC error code this error is reported under.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::UnknownTool(_) => ErrorCode::MethodNotFound,
            Self::MissingArgument { .. } | Self::InvalidArgument { .. } | Self::Arguments(_) => {
                ErrorCode::InvalidParams
            }
            _ => ErrorCode::InternalError,
        }
    }

    /// Structured detail attached to tool-layer errors.
    pub fn error_data(&self) -> Option<Value> {
        match self {
            Self::UnknownTool(name) => Some(json!({ "tool": name })),
            Self::MissingArgument { field } => Some(json!({ "field": field })),
            Self::InvalidArgument { field, expected } => {
                Some(json!({ "field": field, "expected": expected }))
            }
            _ => None,
        }
    }
}

/// Convenience alias for results using `AdbMcpError`.
pub type Result<T> = std::result::Result<T, AdbMcpError>;
