//! Server tools: listing, lookup, creation, deletion and power actions.

use std::sync::Arc;

use async_trait::async_trait;
use hcloud_api::{
    Action, CreateServerRequest, CreateServerResponse, HcloudClient, Labels, SshKeyRef,
};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;

use crate::format::{format_action, format_server, format_servers, json_list, to_json};
use crate::tool::{
    ResponseFormat, Tool, ToolAnnotations, parse_args, require_positive_id, schema_for,
};
use crate::{Result, ToolError};

const MAX_SERVER_NAME_LEN: usize = 255;

pub const PASSWORD_NOTICE: &str = "Save this password now. It will not be shown again.";

pub fn tools() -> Vec<Arc<dyn Tool>> {
    vec![
        Arc::new(ListServers),
        Arc::new(GetServer),
        Arc::new(CreateServer),
        Arc::new(DeleteServer),
        Arc::new(ServerActionTool(PowerAction::PowerOn)),
        Arc::new(ServerActionTool(PowerAction::PowerOff)),
        Arc::new(ServerActionTool(PowerAction::Shutdown)),
        Arc::new(ServerActionTool(PowerAction::Reboot)),
    ]
}

/// Server names are hostnames: ASCII letters, digits and hyphens, 1-255 chars.
pub fn validate_server_name(name: &str) -> Result<()> {
    if name.is_empty() || name.len() > MAX_SERVER_NAME_LEN {
        return Err(ToolError::InvalidInput(format!(
            "server name must be 1-{MAX_SERVER_NAME_LEN} characters long"
        )));
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(ToolError::InvalidInput(format!(
            "server name may only contain letters, digits and hyphens: {name:?}"
        )));
    }
    Ok(())
}

// ── Inputs ──────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ListServersInput {
    /// Label selector to filter by, e.g. `env=prod` or `env in (prod,staging)`.
    #[serde(default)]
    pub label_selector: Option<String>,
    #[serde(default)]
    pub response_format: ResponseFormat,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct GetServerInput {
    /// Numeric server ID.
    pub server_id: i64,
    #[serde(default)]
    pub response_format: ResponseFormat,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateServerInput {
    /// Server name (letters, digits and hyphens).
    #[schemars(length(min = 1, max = 255), regex(pattern = r"^[A-Za-z0-9-]+$"))]
    pub name: String,
    /// Server type name or ID, e.g. `cx22`.
    pub server_type: String,
    /// Image name or ID, e.g. `ubuntu-24.04`.
    pub image: String,
    /// Location name, e.g. `fsn1`. The API picks one when omitted.
    #[serde(default)]
    pub location: Option<String>,
    /// SSH keys to install, by ID or name. Without keys a root password is generated.
    #[serde(default)]
    pub ssh_keys: Vec<SshKeyRef>,
    #[serde(default)]
    pub labels: Labels,
    /// Start the server once it is created.
    #[serde(default = "default_true")]
    pub start_after_create: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ServerIdInput {
    /// Numeric server ID.
    pub server_id: i64,
}

// ── Tools ───────────────────────────────────────────────────────────

pub struct ListServers;

#[async_trait]
impl Tool for ListServers {
    fn name(&self) -> &'static str {
        "hetzner_list_servers"
    }

    fn title(&self) -> &'static str {
        "List Servers"
    }

    fn description(&self) -> &'static str {
        "List all servers in the project with status, IP addresses, type and location. \
         Optionally filter by label selector."
    }

    fn annotations(&self) -> ToolAnnotations {
        ToolAnnotations::READ_ONLY
    }

    fn input_schema(&self) -> Value {
        schema_for::<ListServersInput>()
    }

    async fn call(&self, client: &HcloudClient, args: Value) -> Result<String> {
        let input: ListServersInput = parse_args(args)?;
        let servers = client.list_servers(input.label_selector.as_deref()).await?;

        Ok(match input.response_format {
            ResponseFormat::Markdown => format_servers(&servers),
            ResponseFormat::Json => json_list("servers", &servers)?,
        })
    }
}

pub struct GetServer;

#[async_trait]
impl Tool for GetServer {
    fn name(&self) -> &'static str {
        "hetzner_get_server"
    }

    fn title(&self) -> &'static str {
        "Get Server"
    }

    fn description(&self) -> &'static str {
        "Get details for one server by its numeric ID."
    }

    fn annotations(&self) -> ToolAnnotations {
        ToolAnnotations::READ_ONLY
    }

    fn input_schema(&self) -> Value {
        schema_for::<GetServerInput>()
    }

    async fn call(&self, client: &HcloudClient, args: Value) -> Result<String> {
        let input: GetServerInput = parse_args(args)?;
        let id = require_positive_id("server_id", input.server_id)?;
        let server = client.get_server(id).await?;

        Ok(match input.response_format {
            ResponseFormat::Markdown => format_server(&server),
            ResponseFormat::Json => to_json(&server)?,
        })
    }
}

pub struct CreateServer;

#[async_trait]
impl Tool for CreateServer {
    fn name(&self) -> &'static str {
        "hetzner_create_server"
    }

    fn title(&self) -> &'static str {
        "Create Server"
    }

    fn description(&self) -> &'static str {
        "Create a new server. Requires a name, a server type (see hetzner_list_server_types) \
         and an image (see hetzner_list_images). Servers created without SSH keys get a \
         one-time root password that is returned only in this response. Creating a server \
         incurs costs."
    }

    fn annotations(&self) -> ToolAnnotations {
        ToolAnnotations::CREATE
    }

    fn input_schema(&self) -> Value {
        schema_for::<CreateServerInput>()
    }

    async fn call(&self, client: &HcloudClient, args: Value) -> Result<String> {
        let input: CreateServerInput = parse_args(args)?;
        validate_server_name(&input.name)?;

        let req = CreateServerRequest {
            name: input.name,
            server_type: input.server_type,
            image: input.image,
            location: input.location,
            ssh_keys: input.ssh_keys,
            labels: input.labels,
            start_after_create: input.start_after_create,
        };

        let resp = client.create_server(&req).await?;
        tracing::info!(server_id = resp.server.id, name = %resp.server.name, "server created");

        Ok(render_created(&resp, &req.ssh_keys))
    }
}

/// Report a new server. Exactly one of the root password section or the
/// SSH key note is present, depending on whether keys were supplied.
pub fn render_created(resp: &CreateServerResponse, ssh_keys: &[SshKeyRef]) -> String {
    let mut out = format!(
        "# Server created\n\n{}\n\n{}",
        format_server(&resp.server),
        format_action(&resp.action)
    );

    if !resp.next_actions.is_empty() {
        let follow_ups: Vec<String> = resp
            .next_actions
            .iter()
            .map(|a| format!("{} (ID: {})", a.command, a.id))
            .collect();
        out.push_str(&format!("\n- **Follow-up actions**: {}", follow_ups.join(", ")));
    }

    if ssh_keys.is_empty() {
        let password = resp
            .root_password
            .as_deref()
            .unwrap_or("(not returned by the API)");
        out.push_str(&format!(
            "\n\n**Root password**: `{password}`\n\n{PASSWORD_NOTICE}"
        ));
    } else {
        let keys: Vec<String> = ssh_keys.iter().map(ToString::to_string).collect();
        out.push_str(&format!(
            "\n\n**Root password**: none. Log in with the configured SSH keys ({}).",
            keys.join(", ")
        ));
    }

    out
}

pub struct DeleteServer;

#[async_trait]
impl Tool for DeleteServer {
    fn name(&self) -> &'static str {
        "hetzner_delete_server"
    }

    fn title(&self) -> &'static str {
        "Delete Server"
    }

    fn description(&self) -> &'static str {
        "Permanently delete a server and all data on its disk. This cannot be undone."
    }

    fn annotations(&self) -> ToolAnnotations {
        ToolAnnotations::DESTRUCTIVE
    }

    fn input_schema(&self) -> Value {
        schema_for::<ServerIdInput>()
    }

    async fn call(&self, client: &HcloudClient, args: Value) -> Result<String> {
        let input: ServerIdInput = parse_args(args)?;
        let id = require_positive_id("server_id", input.server_id)?;
        let action = client.delete_server(id).await?;
        tracing::info!(server_id = id, action_id = action.id, "server deletion requested");

        Ok(render_action(&format!("Deletion of server {id} requested."), &action))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerAction {
    PowerOn,
    PowerOff,
    Shutdown,
    Reboot,
}

/// Power actions share one shape: a server ID in, an action receipt out.
pub struct ServerActionTool(pub PowerAction);

#[async_trait]
impl Tool for ServerActionTool {
    fn name(&self) -> &'static str {
        match self.0 {
            PowerAction::PowerOn => "hetzner_power_on_server",
            PowerAction::PowerOff => "hetzner_power_off_server",
            PowerAction::Shutdown => "hetzner_shutdown_server",
            PowerAction::Reboot => "hetzner_reboot_server",
        }
    }

    fn title(&self) -> &'static str {
        match self.0 {
            PowerAction::PowerOn => "Power On Server",
            PowerAction::PowerOff => "Power Off Server",
            PowerAction::Shutdown => "Shut Down Server",
            PowerAction::Reboot => "Reboot Server",
        }
    }

    fn description(&self) -> &'static str {
        match self.0 {
            PowerAction::PowerOn => "Start a server that is powered off.",
            PowerAction::PowerOff => {
                "Cut power to a server immediately. Unsaved data may be lost; \
                 prefer hetzner_shutdown_server for a clean shutdown."
            }
            PowerAction::Shutdown => {
                "Send an ACPI shutdown request so the operating system can stop cleanly."
            }
            PowerAction::Reboot => "Reset a server, like pressing its reset button.",
        }
    }

    fn annotations(&self) -> ToolAnnotations {
        match self.0 {
            PowerAction::PowerOff => ToolAnnotations {
                destructive: true,
                ..ToolAnnotations::STATE_CHANGE
            },
            _ => ToolAnnotations::STATE_CHANGE,
        }
    }

    fn input_schema(&self) -> Value {
        schema_for::<ServerIdInput>()
    }

    async fn call(&self, client: &HcloudClient, args: Value) -> Result<String> {
        let input: ServerIdInput = parse_args(args)?;
        let id = require_positive_id("server_id", input.server_id)?;

        let (action, verb) = match self.0 {
            PowerAction::PowerOn => (client.power_on_server(id).await?, "Power on"),
            PowerAction::PowerOff => (client.power_off_server(id).await?, "Power off"),
            PowerAction::Shutdown => (client.shutdown_server(id).await?, "Shutdown"),
            PowerAction::Reboot => (client.reboot_server(id).await?, "Reboot"),
        };
        tracing::info!(
            server_id = id,
            action_id = action.id,
            command = %action.command,
            "server action requested"
        );

        Ok(render_action(&format!("{verb} requested for server {id}."), &action))
    }
}

/// Actions are reported as issued; their completion is not awaited.
fn render_action(summary: &str, action: &Action) -> String {
    format!(
        "{summary}\n\n{}\n\nThe action runs in the background. \
         Use hetzner_get_server to check the server status.",
        format_action(action)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::fixtures::{action_json, server_json};
    use crate::{CallError, ToolRegistry};
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn registry(server: &MockServer) -> ToolRegistry {
        let client = HcloudClient::new("test-token")
            .unwrap()
            .with_base_url(server.uri());
        ToolRegistry::new(Arc::new(client))
    }

    fn created_response(root_password: Option<&str>) -> CreateServerResponse {
        serde_json::from_value(json!({
            "server": server_json(42, "my-app", json!({})),
            "action": action_json(1, "create_server"),
            "next_actions": [action_json(2, "start_server")],
            "root_password": root_password
        }))
        .unwrap()
    }

    #[test]
    fn names_follow_hostname_rules() {
        assert!(validate_server_name("my-app").is_ok());
        assert!(validate_server_name("web01").is_ok());
        assert!(validate_server_name("my app").is_err());
        assert!(validate_server_name("my_app").is_err());
        assert!(validate_server_name("").is_err());
        assert!(validate_server_name(&"a".repeat(256)).is_err());
        assert!(validate_server_name(&"a".repeat(255)).is_ok());
    }

    #[test]
    fn password_shown_when_no_keys() {
        let text = render_created(&created_response(Some("s3cret")), &[]);
        assert!(text.contains("**Root password**: `s3cret`"));
        assert!(text.contains(PASSWORD_NOTICE));
        assert!(text.contains("start_server (ID: 2)"));
    }

    #[test]
    fn password_absent_when_keys_given() {
        let keys = vec![SshKeyRef::ByName("laptop".into()), SshKeyRef::ById(7)];
        let text = render_created(&created_response(None), &keys);
        assert!(text.contains("**Root password**: none"));
        assert!(text.contains("(laptop, 7)"));
        assert!(!text.contains(PASSWORD_NOTICE));
    }

    #[tokio::test]
    async fn create_without_keys_reports_password() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/servers"))
            .and(body_json(json!({
                "name": "my-app",
                "server_type": "cx22",
                "image": "ubuntu-24.04",
                "start_after_create": true
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "server": server_json(42, "my-app", json!({})),
                "action": action_json(1, "create_server"),
                "next_actions": [],
                "root_password": "YItygq1v3GYjjMomLaKc"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let out = registry(&server)
            .call(
                "hetzner_create_server",
                json!({"name": "my-app", "server_type": "cx22", "image": "ubuntu-24.04"}),
            )
            .await
            .unwrap();

        assert!(!out.is_error);
        assert!(out.text.contains("`YItygq1v3GYjjMomLaKc`"));
        assert!(out.text.contains("It will not be shown again."));
    }

    #[tokio::test]
    async fn invalid_name_never_reaches_the_api() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let err = registry(&server)
            .call(
                "hetzner_create_server",
                json!({"name": "my app", "server_type": "cx22", "image": "ubuntu-24.04"}),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, CallError::InvalidArguments { .. }));
    }

    #[tokio::test]
    async fn unknown_argument_is_rejected() {
        let server = MockServer::start().await;
        let err = registry(&server)
            .call("hetzner_get_server", json!({"server_id": 1, "force": true}))
            .await
            .unwrap_err();
        assert!(matches!(err, CallError::InvalidArguments { .. }));
    }

    #[tokio::test]
    async fn large_listing_stays_bounded_in_both_formats() {
        let server = MockServer::start().await;
        let servers: Vec<Value> = (1..=200)
            .map(|id| server_json(id, &format!("web-{id}"), json!({"env": "prod"})))
            .collect();
        Mock::given(method("GET"))
            .and(path("/servers"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"servers": servers})))
            .mount(&server)
            .await;
        let registry = registry(&server);

        let out = registry
            .call("hetzner_list_servers", json!({"response_format": "json"}))
            .await
            .unwrap();
        assert!(!out.is_error);
        let parsed: Value = serde_json::from_str(&out.text).unwrap();
        assert_eq!(parsed["total"], 200);
        assert_eq!(parsed["truncated"], true);
        assert_eq!(parsed["servers"][0]["name"], "web-1");

        let out = registry
            .call("hetzner_list_servers", json!({}))
            .await
            .unwrap();
        assert!(out.text.starts_with("# Servers (200)"));
        assert!(out.text.contains("[Output truncated: showing 25000 of"));
    }

    #[tokio::test]
    async fn list_passes_label_selector_and_renders_json() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/servers"))
            .and(query_param("label_selector", "env=prod"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "servers": [server_json(42, "my-app", json!({"env": "prod"}))]
            })))
            .mount(&server)
            .await;

        let out = registry(&server)
            .call(
                "hetzner_list_servers",
                json!({"label_selector": "env=prod", "response_format": "json"}),
            )
            .await
            .unwrap();

        let parsed: Value = serde_json::from_str(&out.text).unwrap();
        assert_eq!(parsed["total"], 1);
        assert_eq!(parsed["servers"][0]["name"], "my-app");
        assert_eq!(parsed["servers"][0]["labels"]["env"], "prod");
    }

    #[tokio::test]
    async fn get_missing_server_is_normalized() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/servers/5"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "error": {"code": "not_found", "message": "server with ID '5' not found"}
            })))
            .mount(&server)
            .await;

        let out = registry(&server)
            .call("hetzner_get_server", json!({"server_id": 5}))
            .await
            .unwrap();

        assert!(out.is_error);
        assert_eq!(out.text, "Error: Resource not found. server with ID '5' not found");
    }

    #[tokio::test]
    async fn repeated_power_off_passes_provider_result_through() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/servers/42/actions/poweroff"))
            .respond_with(
                ResponseTemplate::new(201)
                    .set_body_json(json!({"action": action_json(13, "stop_server")})),
            )
            .expect(2)
            .mount(&server)
            .await;

        let registry = registry(&server);
        for _ in 0..2 {
            let out = registry
                .call("hetzner_power_off_server", json!({"server_id": 42}))
                .await
                .unwrap();
            assert!(!out.is_error);
            assert!(out.text.starts_with("Power off requested for server 42."));
            assert!(out.text.contains("- **Action**: stop_server (ID: 13)"));
        }
    }

    #[tokio::test]
    async fn delete_while_locked_reports_conflict() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/servers/42"))
            .respond_with(ResponseTemplate::new(409).set_body_json(json!({
                "error": {"code": "locked", "message": "server is locked"}
            })))
            .mount(&server)
            .await;

        let out = registry(&server)
            .call("hetzner_delete_server", json!({"server_id": 42}))
            .await
            .unwrap();

        assert!(out.is_error);
        assert!(out.text.starts_with("Error: Conflict."));
    }
}
