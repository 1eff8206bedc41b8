//! Normalizes every tool failure into a single human-readable line.

use hcloud_api::Error as ApiError;

use crate::ToolError;

/// Failure category, one per row of the message table in [`describe_error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Authentication,
    PermissionDenied,
    NotFound,
    Conflict,
    InvalidParameters,
    RateLimited,
    Unavailable,
    OtherStatus(u16),
    Timeout,
    Unreachable,
    Unknown,
}

pub fn classify(err: &ToolError) -> ErrorKind {
    match err {
        ToolError::Api(ApiError::Api { status, .. }) => match status.as_u16() {
            401 => ErrorKind::Authentication,
            403 => ErrorKind::PermissionDenied,
            404 => ErrorKind::NotFound,
            409 => ErrorKind::Conflict,
            422 => ErrorKind::InvalidParameters,
            429 => ErrorKind::RateLimited,
            503 => ErrorKind::Unavailable,
            other => ErrorKind::OtherStatus(other),
        },
        ToolError::Api(ApiError::Request(e)) if e.is_timeout() => ErrorKind::Timeout,
        ToolError::Api(ApiError::Request(e)) if e.is_connect() => ErrorKind::Unreachable,
        _ => ErrorKind::Unknown,
    }
}

/// Render a failure as the line returned to the agent.
pub fn describe_error(err: &ToolError) -> String {
    let detail = match err {
        ToolError::Api(api) => api.detail(),
        _ => None,
    };
    let with_detail = |base: &str| match &detail {
        Some(d) => format!("{base} {d}"),
        None => base.to_string(),
    };

    match classify(err) {
        ErrorKind::Authentication => {
            "Error: Authentication failed. Check that HCLOUD_TOKEN is a valid API token.".into()
        }
        ErrorKind::PermissionDenied => with_detail("Error: Permission denied."),
        ErrorKind::NotFound => with_detail("Error: Resource not found."),
        ErrorKind::Conflict => {
            "Error: Conflict. The resource is in a state that does not allow this operation."
                .into()
        }
        ErrorKind::InvalidParameters => with_detail("Error: Invalid request parameters."),
        ErrorKind::RateLimited => {
            "Error: Rate limit exceeded. Wait before sending more requests.".into()
        }
        ErrorKind::Unavailable => {
            "Error: Hetzner Cloud API is temporarily unavailable. Try again later.".into()
        }
        ErrorKind::OtherStatus(code) => with_detail(&format!(
            "Error: API request failed with status {code}."
        )),
        ErrorKind::Timeout => "Error: Request timed out. Try again.".into(),
        ErrorKind::Unreachable => "Error: Could not connect to the Hetzner Cloud API.".into(),
        ErrorKind::Unknown => format!("Error: Unexpected error: {err}"),
    }
}
