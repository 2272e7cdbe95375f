//! AniList MCP server
//!
//! Exposes AniList anime data to MCP clients as six tools, with every
//! argument validated against the tool's JSON Schema and public lookups
//! cached per tool.
//!
//! # Features
//!
//! - **Tools**: search, trending, seasonal, user list, character lookup and
//!   taste-scored recommendations
//! - **Caching**: Redis or in-process, keyed on the parameters that reach AniList
//! - **Transports**: Streamable HTTP (`POST /mcp`) with API-key auth, and stdio
//!
//! # Protocol Version
//!
//! Implements MCP protocol versions 2024-11-05, 2025-03-26 and 2025-06-18.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod gateway;
pub mod pipeline;
pub mod policy;
pub mod protocol;
pub mod recommend;
pub mod schema;
pub mod tools;
pub mod upstream;

pub use error::{Error, Result};

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Setup tracing/logging.
///
/// Always writes to stderr: stdout carries JSON-RPC in stdio mode.
pub fn setup_tracing(level: &str, format: Option<&str>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::registry().with(filter);

    let initialized = match format {
        Some("json") => subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
        _ => subscriber
            .with(fmt::layer().with_writer(std::io::stderr))
            .try_init(),
    };

    initialized.map_err(|e| Error::Internal(format!("Failed to install tracing subscriber: {e}")))
}
