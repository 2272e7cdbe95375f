//! Command-line interface

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// AniList MCP server - anime search, seasons, lists and recommendations over MCP
#[derive(Parser, Debug)]
#[command(name = "anilist-mcp")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file (YAML)
    #[arg(short, long, env = "ANILIST_MCP_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(
        long,
        default_value = "info",
        env = "ANILIST_MCP_LOG_LEVEL",
        global = true
    )]
    pub log_level: String,

    /// Log format (text, json)
    #[arg(long, env = "ANILIST_MCP_LOG_FORMAT", global = true)]
    pub log_format: Option<String>,

    /// Subcommand (optional - defaults to the HTTP server)
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve MCP over HTTP (default)
    Serve {
        /// Host to bind to
        #[arg(long, env = "ANILIST_MCP_HOST")]
        host: Option<String>,

        /// Port to listen on
        #[arg(short, long, env = "ANILIST_MCP_PORT")]
        port: Option<u16>,
    },

    /// Serve MCP over stdin/stdout
    Stdio {
        /// AniList user id that `get_user_list` acts as
        #[arg(long)]
        user_id: Option<i64>,
    },

    /// Print the tool catalogue as JSON
    Tools,

    /// Run a single tool call and print the result
    Call {
        /// Tool name, e.g. `search_anime`
        #[arg(required = true)]
        tool: String,

        /// Arguments as a JSON object
        #[arg(short, long, default_value = "{}")]
        args: String,

        /// AniList user id to act as
        #[arg(long)]
        user_id: Option<i64>,
    },
}
