mod config;
mod error;
mod http;
mod protocol;
mod stdio;

use std::process::ExitCode;
use std::sync::Arc;

use hcloud_api::HcloudClient;
use hcloud_tools::ToolRegistry;
use tokio::io::BufReader;
use tracing_subscriber::EnvFilter;

use crate::config::{McpConfig, Transport};
use crate::error::AppError;
use crate::protocol::McpServer;

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // stdout carries the protocol, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "hcloud-mcp stopped");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), AppError> {
    let config = McpConfig::from_env()?;

    let mut client = HcloudClient::new(config.hcloud_token.clone())?;
    if let Some(endpoint) = &config.hcloud_endpoint {
        client = client.with_base_url(endpoint);
    }
    tracing::info!(endpoint = client.base_url(), "Hetzner Cloud client ready");

    let registry = ToolRegistry::new(Arc::new(client));
    tracing::info!(tools = registry.len(), transport = %config.transport, "starting MCP server");

    let server = McpServer::new(registry);
    match config.transport {
        Transport::Stdio => {
            stdio::serve(&server, BufReader::new(tokio::io::stdin()), tokio::io::stdout()).await?
        }
        Transport::Http => http::serve(server, config.listen_addr).await?,
    }

    Ok(())
}
