//! API-key authentication for the HTTP transport
//!
//! Each key names a client, may bind it to an AniList user (the identity
//! `get_user_list` reads), and may cap it at N requests per minute. Paths
//! listed as public skip all of this.

use std::num::NonZeroU32;
use std::sync::Arc;

use axum::{
    Json,
    body::Body,
    extract::State,
    http::{HeaderValue, Request, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
};
use serde_json::json;
use subtle::ConstantTimeEq;
use tracing::{debug, warn};

use crate::config::AuthConfig;
use crate::error::rpc_codes;
use crate::tools::Caller;

type MinuteLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Authentication settings with key references resolved and limiters built
#[derive(Debug)]
pub struct ResolvedAuthConfig {
    /// Whether `/mcp` requires a key
    pub enabled: bool,
    /// Accepted keys
    pub api_keys: Vec<ResolvedApiKey>,
    /// Path prefixes served without a key
    pub public_paths: Vec<String>,
}

/// One accepted key
#[derive(Debug, Clone)]
pub struct ResolvedApiKey {
    /// Secret presented as `Authorization: Bearer <key>`
    pub key: String,
    /// Client name used in logs
    pub name: String,
    /// AniList user bound to this key
    pub user_id: Option<i64>,
    limiter: Option<Arc<MinuteLimiter>>,
}

impl ResolvedApiKey {
    /// Key allowing `rate_limit` requests per minute (0 = unlimited)
    pub fn new(
        key: impl Into<String>,
        name: impl Into<String>,
        user_id: Option<i64>,
        rate_limit: u32,
    ) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            user_id,
            limiter: NonZeroU32::new(rate_limit)
                .map(|per_minute| Arc::new(RateLimiter::direct(Quota::per_minute(per_minute)))),
        }
    }

    /// Take one request from this key's budget; `false` once it is spent
    #[must_use]
    pub fn allow(&self) -> bool {
        self.limiter
            .as_ref()
            .is_none_or(|limiter| limiter.check().is_ok())
    }

    fn matches(&self, token: &str) -> bool {
        self.key.as_bytes().ct_eq(token.as_bytes()).into()
    }
}

impl ResolvedAuthConfig {
    /// Resolve `env:` key references and build per-key limiters
    pub fn from_config(config: &AuthConfig) -> Self {
        let api_keys: Vec<ResolvedApiKey> = config
            .api_keys
            .iter()
            .map(|k| {
                let name = if k.name.is_empty() { "unnamed" } else { k.name.as_str() };
                ResolvedApiKey::new(k.resolve_key(), name, k.user_id, k.rate_limit)
            })
            .collect();

        if config.enabled && api_keys.is_empty() {
            warn!("Authentication enabled without API keys; every /mcp request will be rejected");
        }

        Self {
            enabled: config.enabled,
            api_keys,
            public_paths: config.public_paths.clone(),
        }
    }

    /// Whether `path` is served without a key
    #[must_use]
    pub fn is_public_path(&self, path: &str) -> bool {
        self.public_paths
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()))
    }

    /// Find the key equal to `token`.
    ///
    /// Every key is compared, so the time taken does not depend on which
    /// one matched.
    #[must_use]
    pub fn find_key(&self, token: &str) -> Option<&ResolvedApiKey> {
        self.api_keys
            .iter()
            .fold(None, |found, key| match (found, key.matches(token)) {
                (None, true) => Some(key),
                (found, _) => found,
            })
    }
}

/// Identity attached to each `/mcp` request as an extension
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedClient {
    /// Client name
    pub name: String,
    /// AniList user the client acts as
    pub user_id: Option<i64>,
}

impl AuthenticatedClient {
    fn anonymous() -> Self {
        Self {
            name: "anonymous".to_string(),
            user_id: None,
        }
    }

    /// Identity passed to tool calls
    #[must_use]
    pub fn caller(&self) -> Caller {
        Caller {
            user_id: self.user_id,
        }
    }
}

impl From<&ResolvedApiKey> for AuthenticatedClient {
    fn from(key: &ResolvedApiKey) -> Self {
        Self {
            name: key.name.clone(),
            user_id: key.user_id,
        }
    }
}

/// Reject requests without a valid key, or over their key's rate limit
pub async fn auth_middleware(
    State(auth): State<Arc<ResolvedAuthConfig>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();

    if !auth.enabled || auth.is_public_path(&path) {
        request
            .extensions_mut()
            .insert(AuthenticatedClient::anonymous());
        return next.run(request).await;
    }

    let Some(token) = bearer_token(&request) else {
        warn!(path = %path, "Missing Authorization header");
        return reject(
            StatusCode::UNAUTHORIZED,
            "Missing Authorization header. Use: Authorization: Bearer <api-key>".to_string(),
        );
    };

    let Some(key) = auth.find_key(token) else {
        warn!(path = %path, "Invalid API key");
        return reject(StatusCode::UNAUTHORIZED, "Invalid API key".to_string());
    };

    if !key.allow() {
        warn!(client = %key.name, path = %path, "Rate limit exceeded");
        return reject(
            StatusCode::TOO_MANY_REQUESTS,
            format!(
                "Rate limit exceeded for client '{}'. Try again later.",
                key.name
            ),
        );
    }

    debug!(client = %key.name, path = %path, "Authenticated request");
    request
        .extensions_mut()
        .insert(AuthenticatedClient::from(key));
    next.run(request).await
}

fn bearer_token(request: &Request<Body>) -> Option<&str> {
    let value = request.headers().get(header::AUTHORIZATION)?.to_str().ok()?;
    value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))
}

fn reject(status: StatusCode, message: String) -> Response {
    let mut response = (
        status,
        Json(json!({
            "jsonrpc": "2.0",
            "error": { "code": rpc_codes::ACCESS_DENIED, "message": message },
            "id": null
        })),
    )
        .into_response();

    let headers = response.headers_mut();
    if status == StatusCode::UNAUTHORIZED {
        headers.insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
    } else {
        headers.insert(header::RETRY_AFTER, HeaderValue::from_static("60"));
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ApiKeyConfig;

    fn resolved(keys: Vec<ResolvedApiKey>, public_paths: &[&str]) -> ResolvedAuthConfig {
        ResolvedAuthConfig {
            enabled: true,
            api_keys: keys,
            public_paths: public_paths.iter().map(ToString::to_string).collect(),
        }
    }

    #[test]
    fn public_paths_match_by_prefix() {
        let auth = resolved(vec![], &["/health"]);

        assert!(auth.is_public_path("/health"));
        assert!(auth.is_public_path("/health/"));
        assert!(!auth.is_public_path("/mcp"));
        assert!(!auth.is_public_path("/"));
    }

    #[test]
    fn keys_map_to_clients() {
        let auth = resolved(
            vec![
                ResolvedApiKey::new("key1", "Client A", Some(5_000), 100),
                ResolvedApiKey::new("key2", "Client B", None, 0),
            ],
            &[],
        );

        let a = AuthenticatedClient::from(auth.find_key("key1").unwrap());
        assert_eq!(a.name, "Client A");
        assert_eq!(a.caller(), Caller::user(5_000));

        let b = AuthenticatedClient::from(auth.find_key("key2").unwrap());
        assert_eq!(b.caller(), Caller::anonymous());

        assert!(auth.find_key("wrong").is_none());
        assert!(auth.find_key("key").is_none());
        assert!(auth.find_key("").is_none());
    }

    #[test]
    fn per_minute_budget_runs_out() {
        let limited = ResolvedApiKey::new("k", "limited", None, 2);
        assert!(limited.allow());
        assert!(limited.allow());
        assert!(!limited.allow());

        let unlimited = ResolvedApiKey::new("k", "unlimited", None, 0);
        assert!((0..100).all(|_| unlimited.allow()));
    }

    #[test]
    fn from_config_resolves_keys() {
        let auth = AuthConfig {
            enabled: true,
            api_keys: vec![ApiKeyConfig {
                key: "literal-key".to_string(),
                name: String::new(),
                user_id: Some(9),
                rate_limit: 0,
            }],
            public_paths: vec!["/health".to_string()],
        };

        let resolved = ResolvedAuthConfig::from_config(&auth);
        let key = resolved.find_key("literal-key").unwrap();
        assert_eq!(key.name, "unnamed");
        assert_eq!(key.user_id, Some(9));
    }

    #[test]
    fn rejection_headers() {
        let unauthorized = reject(StatusCode::UNAUTHORIZED, "no".to_string());
        assert_eq!(unauthorized.headers()[header::WWW_AUTHENTICATE], "Bearer");

        let limited = reject(StatusCode::TOO_MANY_REQUESTS, "slow down".to_string());
        assert_eq!(limited.headers()[header::RETRY_AFTER], "60");
    }
}
