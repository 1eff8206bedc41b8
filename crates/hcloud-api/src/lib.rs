//! Typed Rust client for the Hetzner Cloud API.
//!
//! Covers the subset exposed as agent tools: servers (list, get, create,
//! delete, power actions), SSH keys (CRUD) and the read-only catalogs
//! (server types, images, locations).
//!
//! Every call is a single request. There is no retry, no pagination and
//! no polling of returned actions.

mod types;

use std::time::Duration;

use reqwest::Method;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::Serialize;
use serde::de::DeserializeOwned;

pub use reqwest::StatusCode;
pub use types::*;

pub const DEFAULT_BASE_URL: &str = "https://api.hetzner.cloud/v1";

/// Environment variable holding the API token.
pub const TOKEN_ENV: &str = "HCLOUD_TOKEN";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("HCLOUD_TOKEN is not set")]
    MissingToken,

    #[error("hcloud api request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("hcloud api {endpoint} returned {status}: {body}")]
    Api {
        endpoint: String,
        status: StatusCode,
        body: String,
    },

    #[error("hcloud api {endpoint} returned an unreadable body: {source}")]
    Decode {
        endpoint: String,
        source: serde_json::Error,
    },

    #[error("failed to encode request body: {0}")]
    Encode(serde_json::Error),
}

impl Error {
    /// HTTP status of an API error response, if this is one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// The provider's own error message, when the response body carried one.
    pub fn detail(&self) -> Option<String> {
        match self {
            Self::Api { body, .. } => serde_json::from_str::<ApiErrorBody>(body)
                .ok()
                .map(|b| b.error.message)
                .filter(|m| !m.trim().is_empty()),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

fn build_http(timeout: Duration) -> Result<reqwest::Client> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    Ok(reqwest::Client::builder()
        .timeout(timeout)
        .default_headers(headers)
        .build()?)
}

/// Client for the Hetzner Cloud REST API.
#[derive(Clone)]
pub struct HcloudClient {
    token: String,
    base_url: String,
    http: reqwest::Client,
}

impl HcloudClient {
    pub fn new(token: impl Into<String>) -> Result<Self> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(Error::MissingToken);
        }

        Ok(Self {
            token,
            base_url: DEFAULT_BASE_URL.to_string(),
            http: build_http(REQUEST_TIMEOUT)?,
        })
    }

    /// Replace the per-request timeout (30 s by default).
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.http = build_http(timeout)?;
        Ok(self)
    }

    /// Create from `HCLOUD_TOKEN`. Fails with [`Error::MissingToken`] when unset or empty.
    pub fn from_env() -> Result<Self> {
        let token = std::env::var(TOKEN_ENV).map_err(|_| Error::MissingToken)?;
        Self::new(token)
    }

    /// Point the client at a different API root (e.g. a local mock).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn auth(&self) -> String {
        format!("Bearer {}", self.token)
    }

    async fn check(resp: reqwest::Response, endpoint: &str) -> Result<reqwest::Response> {
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Api {
                endpoint: endpoint.to_string(),
                status,
                body,
            });
        }
        Ok(resp)
    }

    fn to_body<B: Serialize>(body: &B) -> Result<serde_json::Value> {
        serde_json::to_value(body).map_err(Error::Encode)
    }

    /// Perform one authenticated call and decode the JSON response into `T`.
    ///
    /// An empty success body (e.g. `204 No Content`) decodes as JSON `null`.
    pub async fn invoke<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
        query: &[(&str, String)],
    ) -> Result<T> {
        let endpoint = format!("{method} {path}");

        let mut builder = self
            .http
            .request(method, self.url(path))
            .header("Authorization", self.auth());
        if !query.is_empty() {
            builder = builder.query(query);
        }
        if let Some(body) = &body {
            builder = builder.json(body);
        }

        let resp = builder.send().await?;
        tracing::debug!(%endpoint, status = resp.status().as_u16(), "hcloud api response");

        let bytes = Self::check(resp, &endpoint).await?.bytes().await?;
        let raw: &[u8] = if bytes.iter().all(u8::is_ascii_whitespace) {
            b"null"
        } else {
            &bytes
        };

        serde_json::from_slice(raw).map_err(|source| Error::Decode { endpoint, source })
    }

    // ── Servers ─────────────────────────────────────────────────────

    pub async fn list_servers(&self, label_selector: Option<&str>) -> Result<Vec<Server>> {
        let mut query = Vec::new();
        if let Some(selector) = label_selector {
            query.push(("label_selector", selector.to_string()));
        }

        let list: ServerList = self.invoke(Method::GET, "/servers", None, &query).await?;
        Ok(list.servers)
    }

    pub async fn get_server(&self, id: i64) -> Result<Server> {
        let env: ServerEnvelope = self
            .invoke(Method::GET, &format!("/servers/{id}"), None, &[])
            .await?;
        Ok(env.server)
    }

    pub async fn create_server(&self, req: &CreateServerRequest) -> Result<CreateServerResponse> {
        self.invoke(Method::POST, "/servers", Some(Self::to_body(req)?), &[])
            .await
    }

    pub async fn delete_server(&self, id: i64) -> Result<Action> {
        let env: ActionEnvelope = self
            .invoke(Method::DELETE, &format!("/servers/{id}"), None, &[])
            .await?;
        Ok(env.action)
    }

    async fn server_action(&self, id: i64, action: &str) -> Result<Action> {
        let env: ActionEnvelope = self
            .invoke(
                Method::POST,
                &format!("/servers/{id}/actions/{action}"),
                None,
                &[],
            )
            .await?;
        Ok(env.action)
    }

    pub async fn power_on_server(&self, id: i64) -> Result<Action> {
        self.server_action(id, "poweron").await
    }

    /// Hard power-off, equivalent to pulling the plug.
    pub async fn power_off_server(&self, id: i64) -> Result<Action> {
        self.server_action(id, "poweroff").await
    }

    /// Graceful ACPI shutdown.
    pub async fn shutdown_server(&self, id: i64) -> Result<Action> {
        self.server_action(id, "shutdown").await
    }

    pub async fn reboot_server(&self, id: i64) -> Result<Action> {
        self.server_action(id, "reboot").await
    }

    // ── SSH keys ────────────────────────────────────────────────────

    pub async fn list_ssh_keys(&self, label_selector: Option<&str>) -> Result<Vec<SshKey>> {
        let mut query = Vec::new();
        if let Some(selector) = label_selector {
            query.push(("label_selector", selector.to_string()));
        }

        let list: SshKeyList = self.invoke(Method::GET, "/ssh_keys", None, &query).await?;
        Ok(list.ssh_keys)
    }

    pub async fn get_ssh_key(&self, id: i64) -> Result<SshKey> {
        let env: SshKeyEnvelope = self
            .invoke(Method::GET, &format!("/ssh_keys/{id}"), None, &[])
            .await?;
        Ok(env.ssh_key)
    }

    pub async fn create_ssh_key(&self, req: &CreateSshKeyRequest) -> Result<SshKey> {
        let env: SshKeyEnvelope = self
            .invoke(Method::POST, "/ssh_keys", Some(Self::to_body(req)?), &[])
            .await?;
        Ok(env.ssh_key)
    }

    pub async fn delete_ssh_key(&self, id: i64) -> Result<()> {
        self.invoke(Method::DELETE, &format!("/ssh_keys/{id}"), None, &[])
            .await
    }

    // ── Reference data ──────────────────────────────────────────────

    pub async fn list_server_types(&self) -> Result<Vec<ServerType>> {
        let list: ServerTypeList = self
            .invoke(Method::GET, "/server_types", None, &[])
            .await?;
        Ok(list.server_types)
    }

    pub async fn list_images(
        &self,
        image_type: Option<&str>,
        architecture: Option<&str>,
    ) -> Result<Vec<Image>> {
        let mut query = Vec::new();
        if let Some(t) = image_type {
            query.push(("type", t.to_string()));
        }
        if let Some(a) = architecture {
            query.push(("architecture", a.to_string()));
        }

        let list: ImageList = self.invoke(Method::GET, "/images", None, &query).await?;
        Ok(list.images)
    }

    pub async fn list_locations(&self) -> Result<Vec<Location>> {
        let list: LocationList = self.invoke(Method::GET, "/locations", None, &[]).await?;
        Ok(list.locations)
    }
}
