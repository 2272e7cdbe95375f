//! JSON-RPC envelopes and the MCP results this server returns

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{Content, Info, ServerCapabilities, Tool};

const JSONRPC_VERSION: &str = "2.0";

/// Request id; MCP clients send either strings or integers
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    /// `"id": "abc"`
    String(String),
    /// `"id": 7`
    Number(i64),
}

impl RequestId {
    /// Read an id out of a raw JSON value; anything but a string or integer is no id
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(Self::String(s.clone())),
            Value::Number(n) => n.as_i64().map(Self::Number),
            _ => None,
        }
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::String(s) => f.write_str(s),
            Self::Number(n) => write!(f, "{n}"),
        }
    }
}

/// Reply to one request. Exactly one of `result` / `error` is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    /// Always `"2.0"`
    pub jsonrpc: String,
    /// Echoed request id; `null` when the request could not be read
    pub id: Option<RequestId>,
    /// Success payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Failure payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    /// Successful reply to `id`
    #[must_use]
    pub fn success(id: RequestId, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: Some(id),
            result: Some(result),
            error: None,
        }
    }

    /// Failed reply
    pub fn error(id: Option<RequestId>, code: i32, message: impl Into<String>) -> Self {
        Self::failure(id, JsonRpcError::new(code, message))
    }

    /// Failed reply carrying structured `data`
    pub fn error_with_data(
        id: Option<RequestId>,
        code: i32,
        message: impl Into<String>,
        data: Value,
    ) -> Self {
        let mut error = JsonRpcError::new(code, message);
        error.data = Some(data);
        Self::failure(id, error)
    }

    fn failure(id: Option<RequestId>, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }
}

/// `error` member of a failed reply
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    /// See [`crate::error::rpc_codes`]
    pub code: i32,
    /// One-line description
    pub message: String,
    /// Machine-readable details, e.g. validation violations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }
}

/// `initialize` result
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    /// Negotiated protocol version
    pub protocol_version: String,
    /// What this server offers
    pub capabilities: ServerCapabilities,
    /// Name and version of this server
    pub server_info: Info,
    /// Usage hints shown to the model
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

/// `tools/list` result; the catalogue is small enough for a single page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsListResult {
    /// Every tool definition
    pub tools: Vec<Tool>,
}

/// `tools/call` result
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolsCallResult {
    /// Human-readable rendering of the payload
    pub content: Vec<Content>,
    /// The payload itself
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structured_content: Option<Value>,
    /// Tool-level failure flag; failures here are sent as JSON-RPC errors instead
    #[serde(default)]
    pub is_error: bool,
}
