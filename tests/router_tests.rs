//! HTTP transport tests driven through the axum router

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use tower::ServiceExt;

use anilist_mcp::Result;
use anilist_mcp::cache::{MemoryCache, NullCache};
use anilist_mcp::config::{ApiKeyConfig, AuthConfig, Config};
use anilist_mcp::error::rpc_codes;
use anilist_mcp::gateway::{McpHandler, Server};
use anilist_mcp::pipeline::ToolPipeline;
use anilist_mcp::upstream::QueryExecutor;

/// Upstream double that answers every query with the same payload
#[derive(Default)]
struct StaticAniList {
    seen: Mutex<Vec<Value>>,
}

#[async_trait]
impl QueryExecutor for StaticAniList {
    async fn execute(&self, _query: &str, variables: Value) -> Result<Value> {
        self.seen.lock().unwrap().push(variables);
        Ok(json!({"Page": {"media": [{"id": 1}]}}))
    }
}

fn router(config: Config, upstream: Arc<StaticAniList>) -> Router {
    let pipeline = ToolPipeline::new(Arc::new(NullCache), upstream);
    Server::with_handler(config, McpHandler::new(pipeline)).router()
}

fn open_router() -> Router {
    router(Config::default(), Arc::new(StaticAniList::default()))
}

fn secured_config(rate_limit: u32) -> Config {
    Config {
        auth: AuthConfig {
            enabled: true,
            api_keys: vec![ApiKeyConfig {
                key: "test-key".to_string(),
                name: "desktop".to_string(),
                user_id: Some(42),
                rate_limit,
            }],
            ..AuthConfig::default()
        },
        ..Config::default()
    }
}

fn rpc(body: &Value) -> Request<Body> {
    Request::post("/mcp")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn rpc_with_key(body: &Value, key: &str) -> Request<Body> {
    Request::post("/mcp")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, format!("Bearer {key}"))
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_reports_version_and_cache() {
    let pipeline = ToolPipeline::new(
        Arc::new(MemoryCache::with_capacity(10)),
        Arc::new(StaticAniList::default()),
    );
    let app = Server::with_handler(Config::default(), McpHandler::new(pipeline)).router();

    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(body["cache"], "memory");
}

#[tokio::test]
async fn initialize_negotiates_version() {
    let response = open_router()
        .oneshot(rpc(&json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "initialize",
            "params": {
                "protocolVersion": "2025-03-26",
                "capabilities": {},
                "clientInfo": {"name": "test", "version": "0.0.1"}
            }
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["id"], 1);
    assert_eq!(body["result"]["protocolVersion"], "2025-03-26");
    assert_eq!(body["result"]["serverInfo"]["name"], "anilist-mcp");
    assert!(body["result"]["capabilities"]["tools"].is_object());
}

#[tokio::test]
async fn tools_list_returns_catalogue() {
    let response = open_router()
        .oneshot(rpc(&json!({"jsonrpc": "2.0", "id": "a", "method": "tools/list"})))
        .await
        .unwrap();

    let body = json_body(response).await;
    let names: Vec<&str> = body["result"]["tools"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|t| t["name"].as_str())
        .collect();
    assert_eq!(
        names,
        vec![
            "search_anime",
            "get_trending_anime",
            "get_season_anime",
            "get_user_list",
            "get_character_info",
            "recommend_anime",
        ]
    );
}

#[tokio::test]
async fn tools_call_returns_text_and_structured_content() {
    let response = open_router()
        .oneshot(rpc(&json!({
            "jsonrpc": "2.0",
            "id": 7,
            "method": "tools/call",
            "params": {"name": "get_trending_anime", "arguments": {"perPage": 5}}
        })))
        .await
        .unwrap();

    let body = json_body(response).await;
    let result = &body["result"];
    assert_eq!(result["structuredContent"], json!({"Page": {"media": [{"id": 1}]}}));
    assert_eq!(result["content"][0]["type"], "text");
    let text: Value = serde_json::from_str(result["content"][0]["text"].as_str().unwrap()).unwrap();
    assert_eq!(text, result["structuredContent"]);
}

#[tokio::test]
async fn invalid_tool_arguments_are_invalid_params() {
    let response = open_router()
        .oneshot(rpc(&json!({
            "jsonrpc": "2.0",
            "id": 8,
            "method": "tools/call",
            "params": {"name": "search_anime", "arguments": {"query": ""}}
        })))
        .await
        .unwrap();

    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], rpc_codes::INVALID_PARAMS);
}

#[tokio::test]
async fn unknown_method_is_method_not_found() {
    let response = open_router()
        .oneshot(rpc(&json!({"jsonrpc": "2.0", "id": 2, "method": "resources/list"})))
        .await
        .unwrap();

    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], rpc_codes::METHOD_NOT_FOUND);
}

#[tokio::test]
async fn notification_is_accepted_without_body() {
    let response = open_router()
        .oneshot(rpc(&json!({"jsonrpc": "2.0", "method": "notifications/initialized"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
}

#[tokio::test]
async fn malformed_json_is_parse_error() {
    let response = open_router()
        .oneshot(
            Request::post("/mcp")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], rpc_codes::PARSE_ERROR);
}

#[tokio::test]
async fn user_list_over_open_http_needs_credentials() {
    let response = open_router()
        .oneshot(rpc(&json!({
            "jsonrpc": "2.0",
            "id": 3,
            "method": "tools/call",
            "params": {"name": "get_user_list", "arguments": {}}
        })))
        .await
        .unwrap();

    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], rpc_codes::CONFIGURATION_ERROR);
}

#[tokio::test]
async fn missing_key_is_unauthorized() {
    let app = router(secured_config(0), Arc::new(StaticAniList::default()));

    let response = app
        .oneshot(rpc(&json!({"jsonrpc": "2.0", "id": 1, "method": "ping"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.headers()[header::WWW_AUTHENTICATE], "Bearer");
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], rpc_codes::ACCESS_DENIED);
}

#[tokio::test]
async fn wrong_key_is_unauthorized() {
    let app = router(secured_config(0), Arc::new(StaticAniList::default()));

    let response = app
        .oneshot(rpc_with_key(
            &json!({"jsonrpc": "2.0", "id": 1, "method": "ping"}),
            "nope",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn health_stays_public_with_auth_enabled() {
    let app = router(secured_config(0), Arc::new(StaticAniList::default()));

    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn api_key_identity_reaches_user_list() {
    let upstream = Arc::new(StaticAniList::default());
    let app = router(secured_config(0), Arc::clone(&upstream));

    let response = app
        .oneshot(rpc_with_key(
            &json!({
                "jsonrpc": "2.0",
                "id": 4,
                "method": "tools/call",
                "params": {"name": "get_user_list", "arguments": {"status": "COMPLETED"}}
            }),
            "test-key",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert!(body["result"].is_object(), "unexpected body: {body}");

    let seen = upstream.seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0]["userId"], 42);
    assert_eq!(seen[0]["status"], "COMPLETED");
}

#[tokio::test]
async fn rate_limited_client_gets_429() {
    let app = router(secured_config(1), Arc::new(StaticAniList::default()));
    let ping = json!({"jsonrpc": "2.0", "id": 1, "method": "ping"});

    let first = app
        .clone()
        .oneshot(rpc_with_key(&ping, "test-key"))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let second = app.oneshot(rpc_with_key(&ping, "test-key")).await.unwrap();
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(second.headers().contains_key(header::RETRY_AFTER));
}
