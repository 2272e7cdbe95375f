//! Line-delimited JSON-RPC over stdin/stdout
//!
//! One message per line in, one response per line out. Notifications get no
//! output line. Nothing but responses may be written to stdout; logs go to
//! stderr.

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, info};

use super::mcp::McpHandler;
use crate::Result;
use crate::error::rpc_codes;
use crate::protocol::JsonRpcResponse;
use crate::tools::Caller;

/// Serve requests from `input` until EOF, writing responses to `output`
pub async fn run_stdio<R, W>(
    handler: &McpHandler,
    caller: Caller,
    input: R,
    mut output: W,
) -> Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = BufReader::new(input).lines();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let response = match serde_json::from_str(line) {
            Ok(message) => handler.handle_message(&message, &caller).await,
            Err(e) => {
                debug!(error = %e, "Unparseable stdin line");
                Some(JsonRpcResponse::error(
                    None,
                    rpc_codes::PARSE_ERROR,
                    format!("Invalid JSON: {e}"),
                ))
            }
        };

        if let Some(response) = response {
            let mut encoded = serde_json::to_vec(&response)?;
            encoded.push(b'\n');
            output.write_all(&encoded).await?;
            output.flush().await?;
        }
    }

    info!("stdin closed, stopping");
    Ok(())
}
