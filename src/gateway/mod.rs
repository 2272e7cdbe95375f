//! MCP dispatch and transports

pub mod auth;
mod mcp;
mod router;
mod server;
mod stdio;

pub use auth::{AuthenticatedClient, ResolvedAuthConfig, auth_middleware};
pub use mcp::McpHandler;
pub use router::{AppState, create_router};
pub use server::Server;
pub use stdio::run_stdio;
