//! MCP method dispatch shared by the HTTP and stdio transports

use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::Error;
use crate::error::rpc_codes;
use crate::pipeline::ToolPipeline;
use crate::protocol::{
    Content, Info, InitializeResult, JsonRpcResponse, RequestId, ServerCapabilities,
    ToolsCallResult, ToolsCapability, ToolsListResult, negotiate_version,
};
use crate::schema::format_violations;
use crate::tools::{self, Caller, ToolName};

const INSTRUCTIONS: &str = "Anime data from AniList. search_anime, get_trending_anime, \
get_season_anime and get_character_info are public; get_user_list reads the list of \
the AniList user bound to your credentials; recommend_anime scores community \
recommendations against an optional taste profile.";

/// Handles parsed JSON-RPC messages
#[derive(Clone)]
pub struct McpHandler {
    pipeline: ToolPipeline,
}

impl McpHandler {
    /// Create a handler over `pipeline`
    pub fn new(pipeline: ToolPipeline) -> Self {
        Self { pipeline }
    }

    /// Tool pipeline behind this handler
    pub fn pipeline(&self) -> &ToolPipeline {
        &self.pipeline
    }

    /// Handle one raw JSON-RPC message.
    ///
    /// Returns `None` for notifications, which never get a response.
    pub async fn handle_message(&self, message: &Value, caller: &Caller) -> Option<JsonRpcResponse> {
        let (id, method, params) = match parse_request(message) {
            Ok(parsed) => parsed,
            Err(response) => return Some(response),
        };

        let Some(id) = id else {
            debug!(notification = %method, "Notification received");
            return None;
        };

        debug!(method = %method, id = %id, "MCP request");

        let response = match method.as_str() {
            "initialize" => Self::handle_initialize(id, params.as_ref()),
            "ping" => JsonRpcResponse::success(id, json!({})),
            "tools/list" => Self::handle_tools_list(id),
            "tools/call" => self.handle_tools_call(id, params.as_ref(), caller).await,
            _ => JsonRpcResponse::error(
                Some(id),
                rpc_codes::METHOD_NOT_FOUND,
                format!("Method not found: {method}"),
            ),
        };
        Some(response)
    }

    /// Handle initialize request with version negotiation
    pub fn handle_initialize(id: RequestId, params: Option<&Value>) -> JsonRpcResponse {
        let client_version = extract_client_version(params);
        let negotiated_version = negotiate_version(client_version);
        debug!(
            client = client_version,
            negotiated = negotiated_version,
            "Protocol version negotiation"
        );

        let result = InitializeResult {
            protocol_version: negotiated_version.to_string(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability {
                    list_changed: false,
                }),
            },
            server_info: Info {
                name: env!("CARGO_PKG_NAME").to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                title: Some("AniList MCP".to_string()),
            },
            instructions: Some(INSTRUCTIONS.to_string()),
        };
        to_success(id, &result)
    }

    /// Handle tools/list request
    pub fn handle_tools_list(id: RequestId) -> JsonRpcResponse {
        let result = ToolsListResult {
            tools: tools::definitions(),
        };
        to_success(id, &result)
    }

    /// Handle tools/call request
    pub async fn handle_tools_call(
        &self,
        id: RequestId,
        params: Option<&Value>,
        caller: &Caller,
    ) -> JsonRpcResponse {
        let (tool_name, arguments) = extract_tools_call_params(params);
        if tool_name.is_empty() {
            return JsonRpcResponse::error(
                Some(id),
                rpc_codes::INVALID_PARAMS,
                "tools/call requires a tool name",
            );
        }

        match self.pipeline.call(tool_name, &arguments, caller).await {
            Ok(content) => wrap_tool_success(id, content),
            Err(e) => {
                warn!(tool = %tool_name, error = %e, "Tool call failed");
                error_response(id, &e)
            }
        }
    }
}

fn to_success<T: serde::Serialize>(id: RequestId, result: &T) -> JsonRpcResponse {
    match serde_json::to_value(result) {
        Ok(value) => JsonRpcResponse::success(id, value),
        Err(e) => JsonRpcResponse::error(Some(id), rpc_codes::INTERNAL_ERROR, e.to_string()),
    }
}

fn wrap_tool_success(id: RequestId, content: Value) -> JsonRpcResponse {
    let result = ToolsCallResult {
        content: vec![Content::Text {
            text: serde_json::to_string_pretty(&content).unwrap_or_default(),
        }],
        structured_content: Some(content),
        is_error: false,
    };
    to_success(id, &result)
}

fn error_response(id: RequestId, error: &Error) -> JsonRpcResponse {
    let code = error.to_rpc_code();
    match error {
        Error::Validation { tool, violations } => JsonRpcResponse::error_with_data(
            Some(id),
            code,
            tool.parse::<ToolName>().map_or_else(
                |_| error.to_string(),
                |t| format_violations(violations, &t.input_schema()),
            ),
            json!({
                "tool": tool,
                "violations": violations
                    .iter()
                    .map(|v| json!({ "param": v.param, "message": v.message }))
                    .collect::<Vec<_>>(),
            }),
        ),
        Error::Upstream {
            status: Some(status),
            ..
        } => JsonRpcResponse::error_with_data(
            Some(id),
            code,
            error.to_string(),
            json!({ "status": status }),
        ),
        _ => JsonRpcResponse::error(Some(id), code, error.to_string()),
    }
}

fn extract_client_version(params: Option<&Value>) -> &str {
    params
        .and_then(|p| p.get("protocolVersion"))
        .and_then(Value::as_str)
        .unwrap_or("2024-11-05")
}

fn extract_tools_call_params(params: Option<&Value>) -> (&str, Value) {
    let tool_name = params
        .and_then(|p| p.get("name"))
        .and_then(Value::as_str)
        .unwrap_or("");
    let arguments = params
        .and_then(|p| p.get("arguments"))
        .cloned()
        .unwrap_or(json!({}));
    (tool_name, arguments)
}

/// Parse JSON-RPC request or notification
/// Returns (Option<RequestId>, method, params) - id is None for notifications
#[allow(clippy::result_large_err)]
fn parse_request(
    value: &Value,
) -> std::result::Result<(Option<RequestId>, String, Option<Value>), JsonRpcResponse> {
    let id = value.get("id").and_then(RequestId::from_value);

    if value.get("jsonrpc").and_then(Value::as_str) != Some("2.0") {
        return Err(JsonRpcResponse::error(
            id,
            rpc_codes::INVALID_REQUEST,
            "Invalid JSON-RPC version",
        ));
    }

    let method = value
        .get("method")
        .and_then(Value::as_str)
        .ok_or_else(|| {
            JsonRpcResponse::error(id.clone(), rpc_codes::INVALID_REQUEST, "Missing method")
        })?;

    if id.is_none() && !method.starts_with("notifications/") {
        return Err(JsonRpcResponse::error(
            None,
            rpc_codes::INVALID_REQUEST,
            "Missing id",
        ));
    }

    Ok((id, method.to_string(), value.get("params").cloned()))
}
