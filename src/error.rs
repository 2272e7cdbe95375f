//! Error types for the AniList MCP server

use std::io;

use thiserror::Error;

use crate::schema::ValidationViolation;

/// Result type alias for the AniList MCP server
pub type Result<T> = std::result::Result<T, Error>;

/// AniList MCP errors
#[derive(Error, Debug)]
pub enum Error {
    /// Tool arguments failed the declared schema
    #[error("Invalid arguments for {tool}: {}", summarize(.violations))]
    Validation {
        /// Tool the arguments were meant for
        tool: String,
        /// Every violation found, in schema order
        violations: Vec<ValidationViolation>,
    },

    /// AniList returned a non-success status or the request never completed
    #[error("AniList request failed{}: {message}", status_suffix(.status))]
    Upstream {
        /// HTTP status, when a response was received
        status: Option<u16>,
        /// Truncated upstream message
        message: String,
    },

    /// Missing or invalid configuration or credentials
    #[error("Configuration error: {0}")]
    Config(String),

    /// Protocol error
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// JSON-RPC error
    #[error("JSON-RPC error {code}: {message}")]
    JsonRpc {
        /// Error code
        code: i32,
        /// Error message
        message: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a JSON-RPC error
    pub fn json_rpc(code: i32, message: impl Into<String>) -> Self {
        Self::JsonRpc {
            code,
            message: message.into(),
        }
    }

    /// Create a validation error with a single violation
    pub fn invalid(
        tool: impl Into<String>,
        param: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Validation {
            tool: tool.into(),
            violations: vec![ValidationViolation::new(param, message)],
        }
    }

    /// Convert to JSON-RPC error code
    #[must_use]
    pub fn to_rpc_code(&self) -> i32 {
        match self {
            Self::JsonRpc { code, .. } => *code,
            Self::Json(_) => rpc_codes::PARSE_ERROR,
            Self::Protocol(_) => rpc_codes::INVALID_REQUEST,
            Self::Validation { .. } => rpc_codes::INVALID_PARAMS,
            Self::Upstream { .. } => rpc_codes::UPSTREAM_ERROR,
            Self::Config(_) => rpc_codes::CONFIGURATION_ERROR,
            _ => rpc_codes::INTERNAL_ERROR,
        }
    }
}

fn summarize(violations: &[ValidationViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[allow(clippy::ref_option)]
fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" ({s})")).unwrap_or_default()
}

/// Standard JSON-RPC error codes
pub mod rpc_codes {
    /// Parse error - Invalid JSON
    pub const PARSE_ERROR: i32 = -32700;
    /// Invalid Request - Not a valid Request object
    pub const INVALID_REQUEST: i32 = -32600;
    /// Method not found
    pub const METHOD_NOT_FOUND: i32 = -32601;
    /// Invalid params
    pub const INVALID_PARAMS: i32 = -32602;
    /// Internal error
    pub const INTERNAL_ERROR: i32 = -32603;
    /// AniList request failed
    pub const UPSTREAM_ERROR: i32 = -32000;
    /// Rate limited or unauthorized at the HTTP layer
    pub const ACCESS_DENIED: i32 = -32001;
    /// Tool needs credentials that were not supplied
    pub const CONFIGURATION_ERROR: i32 = -32002;
}
