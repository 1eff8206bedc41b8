//! JSON-RPC over HTTP: each `POST /mcp` body is one MCP message.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

use crate::protocol::McpServer;

pub fn router(server: Arc<McpServer>) -> Router {
    Router::new()
        .route("/mcp", post(handle_mcp))
        .route("/health", get(health))
        .with_state(server)
}

async fn handle_mcp(State(server): State<Arc<McpServer>>, body: String) -> Response {
    match server.handle_message(&body).await {
        Some(response) => axum::Json(response).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}

async fn health() -> &'static str {
    "ok"
}

pub async fn serve(server: McpServer, addr: SocketAddr) -> std::io::Result<()> {
    let app = router(Arc::new(server)).layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "serving MCP over HTTP");

    axum::serve(listener, app).await
}
