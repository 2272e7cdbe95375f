//! HTTP router and handlers

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Extension, Json, Router,
    body::{Body, to_bytes},
    extract::State,
    http::{Request, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::{Value, json};
use tower_http::{catch_panic::CatchPanicLayer, compression::CompressionLayer, trace::TraceLayer};
use tracing::warn;

use super::auth::{AuthenticatedClient, ResolvedAuthConfig, auth_middleware};
use super::mcp::McpHandler;
use crate::error::rpc_codes;

/// Shared application state
pub struct AppState {
    /// MCP dispatcher
    pub handler: McpHandler,
    /// Authentication configuration
    pub auth_config: Arc<ResolvedAuthConfig>,
    /// Maximum accepted request body (bytes)
    pub max_body_size: usize,
    /// Upper bound on one request's processing time
    pub request_timeout: Duration,
}

/// Create the router
pub fn create_router(state: Arc<AppState>) -> Router {
    let auth_config = Arc::clone(&state.auth_config);

    Router::new()
        .route("/health", get(health_handler))
        .route("/mcp", post(mcp_handler))
        // Authentication middleware (applied before other layers)
        .layer(middleware::from_fn_with_state(auth_config, auth_middleware))
        .layer(CatchPanicLayer::new())
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /health
async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "cache": state.handler.pipeline().cache_backend(),
    }))
}

/// POST /mcp
async fn mcp_handler(
    State(state): State<Arc<AppState>>,
    client: Option<Extension<AuthenticatedClient>>,
    request: Request<Body>,
) -> Response {
    let caller = client.map(|Extension(c)| c.caller()).unwrap_or_default();

    let body_bytes = match to_bytes(request.into_body(), state.max_body_size).await {
        Ok(bytes) => bytes,
        Err(e) => {
            return parse_error(StatusCode::PAYLOAD_TOO_LARGE, format!("Failed to read body: {e}"));
        }
    };

    let message: Value = match serde_json::from_slice(&body_bytes) {
        Ok(v) => v,
        Err(e) => return parse_error(StatusCode::BAD_REQUEST, format!("Invalid JSON: {e}")),
    };

    let handled = tokio::time::timeout(
        state.request_timeout,
        state.handler.handle_message(&message, &caller),
    )
    .await;

    match handled {
        Ok(Some(response)) => Json(response).into_response(),
        Ok(None) => StatusCode::ACCEPTED.into_response(),
        Err(_) => {
            warn!(timeout = ?state.request_timeout, "Request timed out");
            rpc_error(
                StatusCode::GATEWAY_TIMEOUT,
                rpc_codes::INTERNAL_ERROR,
                format!("Request timed out after {:?}", state.request_timeout),
            )
        }
    }
}

fn parse_error(status: StatusCode, message: String) -> Response {
    rpc_error(status, rpc_codes::PARSE_ERROR, message)
}

fn rpc_error(status: StatusCode, code: i32, message: String) -> Response {
    (
        status,
        Json(json!({
            "jsonrpc": "2.0",
            "error": {"code": code, "message": message},
            "id": null
        })),
    )
        .into_response()
}
