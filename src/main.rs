//! AniList MCP server
//!
//! Serves AniList anime tools over MCP, on HTTP or stdio.

use std::path::Path;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use serde_json::Value;
use tracing::{error, info};

use anilist_mcp::{
    cli::{Cli, Command},
    config::Config,
    gateway::Server,
    setup_tracing,
    tools::{self, Caller},
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = setup_tracing(&cli.log_level, cli.log_format.as_deref()) {
        eprintln!("Failed to setup tracing: {e}");
        return ExitCode::FAILURE;
    }

    let config_path = cli.config.as_deref();
    let result = match cli.command {
        Some(Command::Tools) => print_tools(),
        Some(Command::Call {
            tool,
            args,
            user_id,
        }) => run_call(config_path, &tool, &args, user_id).await,
        Some(Command::Stdio { user_id }) => run_stdio(config_path, user_id).await,
        Some(Command::Serve { host, port }) => run_server(config_path, host, port).await,
        None => run_server(config_path, None, None).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    Config::load(path).context("Failed to load configuration")
}

/// Run the HTTP server
async fn run_server(
    config_path: Option<&Path>,
    host: Option<String>,
    port: Option<u16>,
) -> anyhow::Result<()> {
    let mut config = load_config(config_path)?;
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        port = config.server.port,
        cache = ?config.cache.backend,
        "Starting AniList MCP"
    );

    let server = Server::from_config(config).context("Failed to create server")?;
    server.run_http().await.context("Server error")?;

    info!("Shutdown complete");
    Ok(())
}

/// Run the stdio transport until stdin closes
async fn run_stdio(config_path: Option<&Path>, user_id: Option<i64>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let server = Server::from_config(config).context("Failed to create server")?;
    server
        .run_stdio(user_id)
        .await
        .context("stdio transport failed")
}

fn print_tools() -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(&tools::definitions())?;
    println!("{json}");
    Ok(())
}

/// Run one tool call through the full pipeline
async fn run_call(
    config_path: Option<&Path>,
    tool: &str,
    args: &str,
    user_id: Option<i64>,
) -> anyhow::Result<()> {
    let arguments: Value = serde_json::from_str(args).context("Invalid JSON arguments")?;
    let config = load_config(config_path)?;
    let caller = Caller {
        user_id: user_id.or(config.stdio.user_id),
    };

    let server = Server::from_config(config).context("Failed to create server")?;
    let result = server
        .handler()
        .pipeline()
        .call(tool, &arguments, &caller)
        .await
        .with_context(|| format!("{tool} failed"))?;

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
