use std::sync::Arc;

use hcloud_api::HcloudClient;
use serde_json::Value;
use tracing::{info, warn};

use crate::errors::describe_error;
use crate::tool::{Tool, ToolInfo, ToolOutput};
use crate::{ToolError, catalog, servers, ssh_keys};

/// Rejections that happen before a tool runs. The harness reports these as
/// protocol errors rather than tool results.
#[derive(Debug, thiserror::Error)]
pub enum CallError {
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("invalid arguments for {tool}: {message}")]
    InvalidArguments { tool: String, message: String },
}

/// All tools, bound to one shared API client.
#[derive(Clone)]
pub struct ToolRegistry {
    client: Arc<HcloudClient>,
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Registry with every Hetzner tool registered.
    pub fn new(client: Arc<HcloudClient>) -> Self {
        let mut registry = Self::empty(client);
        for tool in servers::tools()
            .into_iter()
            .chain(ssh_keys::tools())
            .chain(catalog::tools())
        {
            registry.register(tool);
        }
        registry
    }

    pub fn empty(client: Arc<HcloudClient>) -> Self {
        Self {
            client,
            tools: Vec::new(),
        }
    }

    /// Add a tool, replacing any existing tool with the same name.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.retain(|t| t.name() != tool.name());
        self.tools.push(tool);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.name() == name)
    }

    /// Tool listings in registration order.
    pub fn list(&self) -> Vec<ToolInfo> {
        self.tools.iter().map(|t| ToolInfo::from_tool(t.as_ref())).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Run a tool. API and rendering failures come back as an error-flagged
    /// [`ToolOutput`]; only unknown tools and bad arguments are `Err`.
    pub async fn call(&self, name: &str, args: Value) -> Result<ToolOutput, CallError> {
        let tool = self
            .get(name)
            .ok_or_else(|| CallError::UnknownTool(name.to_string()))?;

        info!(tool = name, "tool call");

        match tool.call(&self.client, args).await {
            Ok(text) => Ok(ToolOutput::success(text)),
            Err(ToolError::InvalidInput(message)) => {
                warn!(tool = name, %message, "rejected tool arguments");
                Err(CallError::InvalidArguments {
                    tool: name.to_string(),
                    message,
                })
            }
            Err(e) => {
                warn!(tool = name, error = %e, "tool call failed");
                Ok(ToolOutput::error(describe_error(&e)))
            }
        }
    }
}
