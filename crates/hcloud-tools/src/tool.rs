//! The [`Tool`] trait and the metadata every tool publishes.

use async_trait::async_trait;
use hcloud_api::HcloudClient;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Result, ToolError};

/// One Hetzner operation an agent can invoke.
///
/// `call` must decode its arguments before touching the network, so that
/// [`ToolError::InvalidInput`] is always returned without a request having
/// been sent.
#[async_trait]
pub trait Tool: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    /// Short human-readable title.
    fn title(&self) -> &'static str;

    fn description(&self) -> &'static str;

    fn annotations(&self) -> ToolAnnotations;

    /// JSON Schema for the arguments accepted by [`Tool::call`].
    fn input_schema(&self) -> Value;

    async fn call(&self, client: &HcloudClient, args: Value) -> Result<String>;
}

/// Behavioural hints published alongside each tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolAnnotations {
    pub read_only: bool,
    pub destructive: bool,
    pub idempotent: bool,
    pub open_world: bool,
}

impl ToolAnnotations {
    /// Catalog and lookup calls.
    pub const READ_ONLY: Self = Self {
        read_only: true,
        destructive: false,
        idempotent: true,
        open_world: true,
    };

    /// Creates something new on every call.
    pub const CREATE: Self = Self {
        read_only: false,
        destructive: false,
        idempotent: false,
        open_world: true,
    };

    /// Power state changes: repeating them converges on the same state.
    pub const STATE_CHANGE: Self = Self {
        read_only: false,
        destructive: false,
        idempotent: true,
        open_world: true,
    };

    pub const DESTRUCTIVE: Self = Self {
        read_only: false,
        destructive: true,
        idempotent: true,
        open_world: true,
    };
}

/// Listing entry for a registered tool, serialized in MCP `tools/list` shape.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolInfo {
    pub name: String,
    pub title: String,
    pub description: String,
    pub input_schema: Value,
    pub annotations: AnnotationsInfo,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnnotationsInfo {
    pub title: String,
    #[serde(rename = "readOnlyHint")]
    pub read_only_hint: bool,
    #[serde(rename = "destructiveHint")]
    pub destructive_hint: bool,
    #[serde(rename = "idempotentHint")]
    pub idempotent_hint: bool,
    #[serde(rename = "openWorldHint")]
    pub open_world_hint: bool,
}

impl ToolInfo {
    pub fn from_tool(tool: &dyn Tool) -> Self {
        let hints = tool.annotations();
        Self {
            name: tool.name().to_string(),
            title: tool.title().to_string(),
            description: tool.description().to_string(),
            input_schema: tool.input_schema(),
            annotations: AnnotationsInfo {
                title: tool.title().to_string(),
                read_only_hint: hints.read_only,
                destructive_hint: hints.destructive,
                idempotent_hint: hints.idempotent,
                open_world_hint: hints.open_world,
            },
        }
    }
}

/// Text result of a tool call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    pub text: String,
    pub is_error: bool,
}

impl ToolOutput {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: false,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: true,
        }
    }
}

/// Output style selected by the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ResponseFormat {
    /// Human-readable markdown, one block per entity.
    #[default]
    Markdown,
    /// Pretty-printed JSON of the raw entities.
    Json,
}

/// Decode tool arguments. A missing argument object counts as `{}`.
pub fn parse_args<T: DeserializeOwned>(args: Value) -> Result<T> {
    let args = if args.is_null() {
        Value::Object(Default::default())
    } else {
        args
    };
    serde_json::from_value(args).map_err(|e| ToolError::InvalidInput(e.to_string()))
}

pub fn schema_for<T: JsonSchema>() -> Value {
    serde_json::to_value(schemars::schema_for!(T))
        .unwrap_or_else(|_| serde_json::json!({"type": "object"}))
}

pub(crate) fn require_positive_id(field: &str, id: i64) -> Result<i64> {
    if id <= 0 {
        return Err(ToolError::InvalidInput(format!(
            "{field} must be a positive integer, got {id}"
        )));
    }
    Ok(id)
}
