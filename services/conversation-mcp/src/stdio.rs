//! Line-delimited JSON-RPC over stdin/stdout
//!
//! One JSON message (or batch) per line. Nothing but responses is written to
//! the output stream; logs go to stderr.

use mcp_core::RpcHandler;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info};

/// Serve until `reader` reaches EOF. A malformed line gets a parse error
/// response and the loop keeps reading.
pub async fn serve<R, W>(rpc: &RpcHandler, mut reader: R, mut writer: W) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut line = Vec::new();
    let mut handled = 0u64;
    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line).await? == 0 {
            break;
        }
        let frame = line.trim_ascii();
        if frame.is_empty() {
            continue;
        }
        handled += 1;
        let Some(response) = rpc.handle_bytes(frame).await else {
            continue;
        };
        let mut encoded = serde_json::to_string(&response)?;
        encoded.push('\n');
        writer.write_all(encoded.as_bytes()).await?;
        writer.flush().await?;
        debug!(handled, "stdio response written");
    }
    info!(handled, "stdin closed, stopping stdio transport");
    Ok(())
}
