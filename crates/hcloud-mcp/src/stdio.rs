//! Newline-delimited JSON-RPC over stdin/stdout.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::protocol::{JsonRpcResponse, McpServer};

/// Serve requests until `input` reaches EOF. Requests are handled one at a time.
///
/// A line that is not valid UTF-8 gets a parse error reply and the loop
/// carries on with the next line.
pub async fn serve(
    server: &McpServer,
    mut input: impl AsyncBufRead + Unpin,
    mut output: impl AsyncWrite + Unpin,
) -> std::io::Result<()> {
    let mut buf = Vec::new();

    loop {
        buf.clear();
        if input.read_until(b'\n', &mut buf).await? == 0 {
            break;
        }

        let line = match std::str::from_utf8(&buf) {
            Ok(line) => line.trim(),
            Err(e) => {
                tracing::warn!(error = %e, "discarding non-UTF-8 input line");
                write_response(&mut output, &JsonRpcResponse::parse_error()).await?;
                continue;
            }
        };
        if line.is_empty() {
            continue;
        }

        if let Some(response) = server.handle_message(line).await {
            write_response(&mut output, &response).await?;
        }
    }

    tracing::info!("stdin closed, shutting down");
    Ok(())
}

async fn write_response(
    writer: &mut (impl AsyncWrite + Unpin),
    response: &JsonRpcResponse,
) -> std::io::Result<()> {
    let mut line = serde_json::to_string(response)?;
    line.push('\n');
    writer.write_all(line.as_bytes()).await?;
    writer.flush().await
}
