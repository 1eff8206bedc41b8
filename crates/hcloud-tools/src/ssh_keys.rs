//! SSH key tools.

use std::sync::Arc;

use async_trait::async_trait;
use hcloud_api::{CreateSshKeyRequest, HcloudClient, Labels};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;

use crate::format::{format_ssh_key, format_ssh_keys, json_list, to_json};
use crate::tool::{
    ResponseFormat, Tool, ToolAnnotations, parse_args, require_positive_id, schema_for,
};
use crate::{Result, ToolError};

pub fn tools() -> Vec<Arc<dyn Tool>> {
    vec![
        Arc::new(ListSshKeys),
        Arc::new(GetSshKey),
        Arc::new(CreateSshKey),
        Arc::new(DeleteSshKey),
    ]
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ListSshKeysInput {
    /// Label selector to filter by, e.g. `team=ops`.
    #[serde(default)]
    pub label_selector: Option<String>,
    #[serde(default)]
    pub response_format: ResponseFormat,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct GetSshKeyInput {
    /// Numeric SSH key ID.
    pub ssh_key_id: i64,
    #[serde(default)]
    pub response_format: ResponseFormat,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateSshKeyInput {
    /// Name for the key, unique within the project.
    #[schemars(length(min = 1))]
    pub name: String,
    /// Public key in OpenSSH format, e.g. `ssh-ed25519 AAAA... user@host`.
    #[schemars(length(min = 1))]
    pub public_key: String,
    #[serde(default)]
    pub labels: Labels,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct SshKeyIdInput {
    /// Numeric SSH key ID.
    pub ssh_key_id: i64,
}

impl CreateSshKeyInput {
    fn into_request(self) -> Result<CreateSshKeyRequest> {
        let name = self.name.trim();
        let public_key = self.public_key.trim();
        if name.is_empty() {
            return Err(ToolError::InvalidInput("name must not be empty".into()));
        }
        if public_key.is_empty() {
            return Err(ToolError::InvalidInput("public_key must not be empty".into()));
        }
        Ok(CreateSshKeyRequest {
            name: name.to_string(),
            public_key: public_key.to_string(),
            labels: self.labels,
        })
    }
}

pub struct ListSshKeys;

#[async_trait]
impl Tool for ListSshKeys {
    fn name(&self) -> &'static str {
        "hetzner_list_ssh_keys"
    }

    fn title(&self) -> &'static str {
        "List SSH Keys"
    }

    fn description(&self) -> &'static str {
        "List the SSH keys stored in the project. Optionally filter by label selector."
    }

    fn annotations(&self) -> ToolAnnotations {
        ToolAnnotations::READ_ONLY
    }

    fn input_schema(&self) -> Value {
        schema_for::<ListSshKeysInput>()
    }

    async fn call(&self, client: &HcloudClient, args: Value) -> Result<String> {
        let input: ListSshKeysInput = parse_args(args)?;
        let keys = client.list_ssh_keys(input.label_selector.as_deref()).await?;

        Ok(match input.response_format {
            ResponseFormat::Markdown => format_ssh_keys(&keys),
            ResponseFormat::Json => json_list("ssh_keys", &keys)?,
        })
    }
}

pub struct GetSshKey;

#[async_trait]
impl Tool for GetSshKey {
    fn name(&self) -> &'static str {
        "hetzner_get_ssh_key"
    }

    fn title(&self) -> &'static str {
        "Get SSH Key"
    }

    fn description(&self) -> &'static str {
        "Get one SSH key by its numeric ID, including its fingerprint and public key."
    }

    fn annotations(&self) -> ToolAnnotations {
        ToolAnnotations::READ_ONLY
    }

    fn input_schema(&self) -> Value {
        schema_for::<GetSshKeyInput>()
    }

    async fn call(&self, client: &HcloudClient, args: Value) -> Result<String> {
        let input: GetSshKeyInput = parse_args(args)?;
        let id = require_positive_id("ssh_key_id", input.ssh_key_id)?;
        let key = client.get_ssh_key(id).await?;

        Ok(match input.response_format {
            ResponseFormat::Markdown => format_ssh_key(&key),
            ResponseFormat::Json => to_json(&key)?,
        })
    }
}

pub struct CreateSshKey;

#[async_trait]
impl Tool for CreateSshKey {
    fn name(&self) -> &'static str {
        "hetzner_create_ssh_key"
    }

    fn title(&self) -> &'static str {
        "Create SSH Key"
    }

    fn description(&self) -> &'static str {
        "Upload a public SSH key so it can be installed on new servers."
    }

    fn annotations(&self) -> ToolAnnotations {
        ToolAnnotations::CREATE
    }

    fn input_schema(&self) -> Value {
        schema_for::<CreateSshKeyInput>()
    }

    async fn call(&self, client: &HcloudClient, args: Value) -> Result<String> {
        let input: CreateSshKeyInput = parse_args(args)?;
        let req = input.into_request()?;
        let key = client.create_ssh_key(&req).await?;
        tracing::info!(ssh_key_id = key.id, name = %key.name, "ssh key created");

        Ok(format!("# SSH key created\n\n{}", format_ssh_key(&key)))
    }
}

pub struct DeleteSshKey;

#[async_trait]
impl Tool for DeleteSshKey {
    fn name(&self) -> &'static str {
        "hetzner_delete_ssh_key"
    }

    fn title(&self) -> &'static str {
        "Delete SSH Key"
    }

    fn description(&self) -> &'static str {
        "Delete an SSH key from the project. Servers that already have the key installed \
         keep it."
    }

    fn annotations(&self) -> ToolAnnotations {
        ToolAnnotations::DESTRUCTIVE
    }

    fn input_schema(&self) -> Value {
        schema_for::<SshKeyIdInput>()
    }

    async fn call(&self, client: &HcloudClient, args: Value) -> Result<String> {
        let input: SshKeyIdInput = parse_args(args)?;
        let id = require_positive_id("ssh_key_id", input.ssh_key_id)?;
        client.delete_ssh_key(id).await?;
        tracing::info!(ssh_key_id = id, "ssh key deleted");

        Ok(format!(
            "SSH key {id} deleted. Servers already provisioned with it are not affected."
        ))
    }
}
