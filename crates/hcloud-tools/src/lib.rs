//! Hetzner Cloud operations exposed as agent tools.
//!
//! Each tool decodes its arguments, issues exactly one API call through
//! [`hcloud_api::HcloudClient`] and renders the result as text. Failures
//! never escape a tool call: they are normalized into one line by
//! [`errors::describe_error`] and flagged as errors.

pub mod catalog;
pub mod errors;
pub mod format;
pub mod registry;
pub mod servers;
pub mod ssh_keys;
pub mod tool;

pub use registry::{CallError, ToolRegistry};
pub use tool::{ResponseFormat, Tool, ToolAnnotations, ToolInfo, ToolOutput};

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error(transparent)]
    Api(#[from] hcloud_api::Error),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("failed to render output: {0}")]
    Render(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ToolError>;
