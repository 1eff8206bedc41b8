//! MCP (Model Context Protocol) request handling over JSON-RPC 2.0.
//!
//! Transport-agnostic: [`McpServer::handle_message`] takes one raw JSON
//! message and returns the response to send, or `None` for notifications.
//!
//! Supported methods:
//! - `initialize` -- protocol version, capabilities and server info
//! - `ping` -- empty result
//! - `tools/list` -- every registered Hetzner tool
//! - `tools/call` -- runs a tool through [`ToolRegistry`]

use hcloud_tools::ToolRegistry;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Value, json};

pub const LATEST_PROTOCOL_VERSION: &str = "2025-06-18";

const SERVER_NAME: &str = "hcloud-mcp";

const INSTRUCTIONS: &str = "Tools for managing Hetzner Cloud servers and SSH keys. \
Use hetzner_list_server_types, hetzner_list_images and hetzner_list_locations to pick \
valid values before calling hetzner_create_server. Mutating calls return the provider's \
action receipt immediately; check progress with hetzner_get_server.";

// Standard JSON-RPC error codes.
const PARSE_ERROR: i64 = -32700;
const INVALID_REQUEST: i64 = -32600;
const METHOD_NOT_FOUND: i64 = -32601;
const INVALID_PARAMS: i64 = -32602;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
    /// Absent for notifications. An explicit `null` is kept as `Some(Value::Null)`.
    #[serde(default, deserialize_with = "present")]
    pub id: Option<Value>,
}

fn present<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
    pub id: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
}

impl JsonRpcResponse {
    fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            result: Some(result),
            error: None,
            id,
        }
    }

    /// Reply to a message that is not valid JSON.
    pub fn parse_error() -> Self {
        Self::failure(Value::Null, PARSE_ERROR, "Parse error")
    }

    fn failure(id: Value, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
            }),
            id,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CallParams {
    name: String,
    #[serde(default)]
    arguments: Value,
}

/// MCP server state shared by all transports.
pub struct McpServer {
    registry: ToolRegistry,
}

impl McpServer {
    pub fn new(registry: ToolRegistry) -> Self {
        Self { registry }
    }

    /// Parse and handle one raw JSON-RPC message.
    pub async fn handle_message(&self, raw: &str) -> Option<JsonRpcResponse> {
        let value: Value = match serde_json::from_str(raw) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(error = %e, "unparseable JSON-RPC message");
                return Some(JsonRpcResponse::parse_error());
            }
        };

        // Valid JSON that is not a request object.
        let id = value.get("id").cloned().unwrap_or(Value::Null);
        match serde_json::from_value::<JsonRpcRequest>(value) {
            Ok(request) => self.handle(request).await,
            Err(e) => {
                tracing::warn!(error = %e, "malformed JSON-RPC request");
                Some(JsonRpcResponse::failure(id, INVALID_REQUEST, "Invalid Request"))
            }
        }
    }

    pub async fn handle(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        // Notifications get no response.
        let Some(id) = request.id else {
            tracing::debug!(method = %request.method, "notification");
            return None;
        };

        if request.jsonrpc != "2.0" {
            return Some(JsonRpcResponse::failure(
                id,
                INVALID_REQUEST,
                "jsonrpc must be \"2.0\"",
            ));
        }

        let response = match request.method.as_str() {
            "initialize" => self.handle_initialize(id, request.params),
            "ping" => JsonRpcResponse::success(id, json!({})),
            "tools/list" => self.handle_tools_list(id),
            "tools/call" => self.handle_tools_call(id, request.params).await,
            other => JsonRpcResponse::failure(
                id,
                METHOD_NOT_FOUND,
                format!("Method not found: {other}"),
            ),
        };
        Some(response)
    }

    fn handle_initialize(&self, id: Value, params: Option<Value>) -> JsonRpcResponse {
        let version = params
            .as_ref()
            .and_then(|p| p.get("protocolVersion"))
            .and_then(Value::as_str)
            .unwrap_or(LATEST_PROTOCOL_VERSION)
            .to_string();

        JsonRpcResponse::success(
            id,
            json!({
                "protocolVersion": version,
                "capabilities": {
                    "tools": { "listChanged": false }
                },
                "serverInfo": {
                    "name": SERVER_NAME,
                    "version": env!("CARGO_PKG_VERSION")
                },
                "instructions": INSTRUCTIONS
            }),
        )
    }

    fn handle_tools_list(&self, id: Value) -> JsonRpcResponse {
        JsonRpcResponse::success(id, json!({ "tools": self.registry.list() }))
    }

    async fn handle_tools_call(&self, id: Value, params: Option<Value>) -> JsonRpcResponse {
        let params: CallParams = match params.map(serde_json::from_value) {
            Some(Ok(p)) => p,
            Some(Err(e)) => {
                return JsonRpcResponse::failure(
                    id,
                    INVALID_PARAMS,
                    format!("Invalid tools/call params: {e}"),
                );
            }
            None => {
                return JsonRpcResponse::failure(id, INVALID_PARAMS, "Missing params for tools/call");
            }
        };

        match self.registry.call(&params.name, params.arguments).await {
            Ok(output) => JsonRpcResponse::success(
                id,
                json!({
                    "content": [{ "type": "text", "text": output.text }],
                    "isError": output.is_error
                }),
            ),
            Err(e) => JsonRpcResponse::failure(id, INVALID_PARAMS, e.to_string()),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use hcloud_api::HcloudClient;
    use std::sync::Arc;

    /// Server whose client points at a closed local port.
    pub(crate) fn offline_server() -> McpServer {
        let client = HcloudClient::new("test-token")
            .unwrap()
            .with_base_url("http://127.0.0.1:9");
        McpServer::new(ToolRegistry::new(Arc::new(client)))
    }

    async fn send(server: &McpServer, msg: Value) -> JsonRpcResponse {
        server.handle_message(&msg.to_string()).await.unwrap()
    }

    #[tokio::test]
    async fn initialize_echoes_client_version() {
        let server = offline_server();
        let resp = send(
            &server,
            json!({"jsonrpc": "2.0", "id": 1, "method": "initialize",
                   "params": {"protocolVersion": "2024-11-05"}}),
        )
        .await;
        let result = resp.result.unwrap();
        assert_eq!(result["protocolVersion"], "2024-11-05");
        assert_eq!(result["serverInfo"]["name"], "hcloud-mcp");
        assert_eq!(result["capabilities"]["tools"]["listChanged"], false);
    }

    #[tokio::test]
    async fn notifications_get_no_response() {
        let server = offline_server();
        let resp = server
            .handle_message(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
            .await;
        assert!(resp.is_none());
    }

    #[tokio::test]
    async fn tools_list_includes_schema_and_hints() {
        let server = offline_server();
        let resp = send(&server, json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"})).await;
        let tools = resp.result.unwrap()["tools"].as_array().unwrap().clone();
        assert_eq!(tools.len(), 15);

        let create = tools
            .iter()
            .find(|t| t["name"] == "hetzner_create_server")
            .unwrap();
        assert_eq!(create["title"], "Create Server");
        assert_eq!(create["inputSchema"]["additionalProperties"], false);
        assert_eq!(create["annotations"]["idempotentHint"], false);
    }

    #[tokio::test]
    async fn parse_error_has_null_id() {
        let server = offline_server();
        let resp = server.handle_message("{not json").await.unwrap();
        assert_eq!(resp.id, Value::Null);
        assert_eq!(resp.error.unwrap().code, PARSE_ERROR);
    }

    #[tokio::test]
    async fn null_id_is_a_request_not_a_notification() {
        let server = offline_server();
        let resp = server
            .handle_message(r#"{"jsonrpc":"2.0","id":null,"method":"ping"}"#)
            .await
            .unwrap();
        assert_eq!(resp.id, Value::Null);
        assert_eq!(resp.result, Some(json!({})));
    }

    #[tokio::test]
    async fn wrong_shape_is_invalid_request() {
        let server = offline_server();

        let resp = send(&server, json!({"jsonrpc": "2.0", "id": 8})).await;
        assert_eq!(resp.id, json!(8));
        assert_eq!(resp.error.unwrap().code, INVALID_REQUEST);

        let resp = server.handle_message("[1, 2]").await.unwrap();
        assert_eq!(resp.id, Value::Null);
        assert_eq!(resp.error.unwrap().code, INVALID_REQUEST);
    }

    #[tokio::test]
    async fn unknown_method_is_reported() {
        let server = offline_server();
        let resp = send(&server, json!({"jsonrpc": "2.0", "id": 3, "method": "resources/list"})).await;
        assert_eq!(resp.error.unwrap().code, METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn invalid_arguments_are_protocol_errors() {
        let server = offline_server();
        let resp = send(
            &server,
            json!({"jsonrpc": "2.0", "id": 4, "method": "tools/call", "params": {
                "name": "hetzner_create_server",
                "arguments": {"name": "my app", "server_type": "cx22", "image": "ubuntu-24.04"}
            }}),
        )
        .await;
        let err = resp.error.unwrap();
        assert_eq!(err.code, INVALID_PARAMS);
        assert!(err.message.contains("letters, digits and hyphens"));
    }

    #[tokio::test]
    async fn api_failures_are_tool_results() {
        let server = offline_server();
        let resp = send(
            &server,
            json!({"jsonrpc": "2.0", "id": 5, "method": "tools/call", "params": {
                "name": "hetzner_list_servers", "arguments": {}
            }}),
        )
        .await;
        let result = resp.result.unwrap();
        assert_eq!(result["isError"], true);
        assert_eq!(
            result["content"][0]["text"],
            "Error: Could not connect to the Hetzner Cloud API."
        );
    }
}
