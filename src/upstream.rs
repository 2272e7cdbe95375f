//! AniList GraphQL executor
//!
//! One POST per call, no retries. Anything other than a 2xx response with a
//! usable `data` object becomes [`Error::Upstream`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, header};
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::config::AniListConfig;
use crate::{Error, Result};

/// Longest upstream error text carried into [`Error::Upstream`]
const MAX_ERROR_CHARS: usize = 500;

/// Runs a GraphQL query against the upstream API
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Execute `query` with `variables`, returning the GraphQL `data` object
    async fn execute(&self, query: &str, variables: Value) -> Result<Value>;
}

/// HTTP client for the AniList GraphQL endpoint
pub struct AniListClient {
    client: Client,
    endpoint: String,
}

impl AniListClient {
    /// Build a client from configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be constructed.
    pub fn new(config: &AniListConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.timeout.min(Duration::from_secs(10)))
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: config.api_url.clone(),
        })
    }

    /// Endpoint this client posts to
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn handle_response(response: Response) -> Result<Value> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(Error::Upstream {
                status: Some(status.as_u16()),
                message: truncate(&error_text),
            });
        }

        let mut body: Value = response.json().await.map_err(|e| Error::Upstream {
            status: Some(status.as_u16()),
            message: format!("Failed to parse response: {e}"),
        })?;

        extract_data(&mut body, status.as_u16())
    }
}

#[async_trait]
impl QueryExecutor for AniListClient {
    async fn execute(&self, query: &str, variables: Value) -> Result<Value> {
        debug!(endpoint = %self.endpoint, "AniList request");

        let response = self
            .client
            .post(&self.endpoint)
            .header(header::ACCEPT, "application/json")
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await
            .map_err(|e| Error::Upstream {
                status: e.status().map(|s| s.as_u16()),
                message: truncate(&e.to_string()),
            })?;

        let result = Self::handle_response(response).await;
        if let Err(ref e) = result {
            warn!(error = %e, "AniList request failed");
        }
        result
    }
}

/// Pull `data` out of a GraphQL response body.
///
/// A response carrying `errors` and no usable `data` is a failure even
/// under a 200 status.
fn extract_data(body: &mut Value, status: u16) -> Result<Value> {
    let data = body.get_mut("data").map(Value::take).unwrap_or(Value::Null);
    if !data.is_null() {
        return Ok(data);
    }

    let message = body
        .get("errors")
        .and_then(Value::as_array)
        .map(|errors| {
            errors
                .iter()
                .filter_map(|e| e.get("message").and_then(Value::as_str))
                .collect::<Vec<_>>()
                .join("; ")
        })
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| "Response contained no data".to_string());

    Err(Error::Upstream {
        status: Some(status),
        message: truncate(&message),
    })
}

fn truncate(text: &str) -> String {
    text.chars().take(MAX_ERROR_CHARS).collect()
}
