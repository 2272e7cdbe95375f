//! Server assembly and the HTTP listener

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, warn};

use super::auth::ResolvedAuthConfig;
use super::mcp::McpHandler;
use super::router::{AppState, create_router};
use super::stdio::run_stdio;
use crate::cache;
use crate::config::Config;
use crate::pipeline::ToolPipeline;
use crate::tools::Caller;
use crate::upstream::AniListClient;
use crate::{Error, Result};

/// AniList MCP server
pub struct Server {
    config: Config,
    handler: McpHandler,
}

impl Server {
    /// Build process-wide clients (cache backend, AniList client) from configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the cache backend or HTTP client cannot be constructed.
    pub fn from_config(config: Config) -> Result<Self> {
        let cache = cache::from_config(&config.cache)?;
        let upstream = Arc::new(AniListClient::new(&config.anilist)?);
        info!(endpoint = %upstream.endpoint(), "AniList client ready");

        let handler = McpHandler::new(ToolPipeline::new(cache, upstream));
        Ok(Self { config, handler })
    }

    /// Wrap an existing handler, e.g. one over test doubles
    pub fn with_handler(config: Config, handler: McpHandler) -> Self {
        Self { config, handler }
    }

    /// MCP dispatcher
    pub fn handler(&self) -> &McpHandler {
        &self.handler
    }

    /// Axum router for the HTTP transport
    pub fn router(&self) -> Router {
        let state = Arc::new(AppState {
            handler: self.handler.clone(),
            auth_config: Arc::new(ResolvedAuthConfig::from_config(&self.config.auth)),
            max_body_size: self.config.server.max_body_size,
            request_timeout: self.config.server.request_timeout,
        });
        create_router(state)
    }

    /// Serve HTTP until Ctrl-C or SIGTERM
    pub async fn run_http(self) -> Result<()> {
        let addr = SocketAddr::new(
            self.config
                .server
                .host
                .parse()
                .map_err(|e| Error::Config(format!("Invalid host: {e}")))?,
            self.config.server.port,
        );

        let app = self.router();
        let listener = TcpListener::bind(addr).await?;

        info!("============================================================");
        info!("ANILIST MCP v{}", env!("CARGO_PKG_VERSION"));
        info!("============================================================");
        info!(host = %self.config.server.host, port = %self.config.server.port, "Listening");
        info!(
            "  POST http://{}:{}/mcp  (JSON-RPC)",
            self.config.server.host, self.config.server.port
        );
        info!(cache = self.handler.pipeline().cache_backend(), "Response cache");
        if !self.handler.pipeline().cache_reachable().await {
            warn!("Cache backend unreachable, serving every call from AniList until it recovers");
        }

        if self.config.auth.enabled {
            info!(
                api_keys = self.config.auth.api_keys.len(),
                "AUTHENTICATION enabled"
            );
        } else {
            warn!("AUTHENTICATION disabled - get_user_list is unavailable over HTTP");
        }
        info!("============================================================");

        let shutdown_timeout = self.config.server.shutdown_timeout;
        let (stopping_tx, mut stopping_rx) = tokio::sync::watch::channel(false);
        let serve = axum::serve(listener, app).with_graceful_shutdown(async move {
            shutdown_signal().await;
            let _ = stopping_tx.send(true);
        });
        // In-flight requests get `shutdown_timeout` to finish once the signal arrives
        let drain_deadline = async move {
            let _ = stopping_rx.wait_for(|stopping| *stopping).await;
            tokio::time::sleep(shutdown_timeout).await;
        };

        tokio::select! {
            result = serve.into_future() => result.map_err(|e| Error::Internal(e.to_string()))?,
            () = drain_deadline => {
                warn!(timeout = ?shutdown_timeout, "Graceful shutdown timed out, dropping open connections");
            }
        }

        info!("Server stopped");
        Ok(())
    }

    /// Serve line-delimited JSON-RPC on stdin/stdout
    pub async fn run_stdio(self, user_id: Option<i64>) -> Result<()> {
        let caller = Caller {
            user_id: user_id.or(self.config.stdio.user_id),
        };
        info!(
            cache = self.handler.pipeline().cache_backend(),
            authenticated = caller.user_id.is_some(),
            "stdio transport ready"
        );
        if !self.handler.pipeline().cache_reachable().await {
            warn!("Cache backend unreachable, serving every call from AniList until it recovers");
        }
        run_stdio(&self.handler, caller, tokio::io::stdin(), tokio::io::stdout()).await
    }
}

/// Shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received");
}
