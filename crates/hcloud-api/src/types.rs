use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Free-form key/value labels attached to a resource.
pub type Labels = BTreeMap<String, String>;

// ── Servers ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Server {
    pub id: i64,
    pub name: String,
    pub status: ServerStatus,
    #[serde(default)]
    pub public_net: PublicNet,
    pub server_type: ServerType,
    pub datacenter: Datacenter,
    #[serde(default)]
    pub image: Option<Image>,
    #[serde(default)]
    pub labels: Labels,
    pub created: DateTime<Utc>,
}

impl Server {
    pub fn ipv4(&self) -> Option<&str> {
        self.public_net.ipv4.as_ref().map(|a| a.ip.as_str())
    }

    pub fn ipv6(&self) -> Option<&str> {
        self.public_net.ipv6.as_ref().map(|a| a.ip.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerStatus {
    Initializing,
    Starting,
    Running,
    Stopping,
    Off,
    Deleting,
    Migrating,
    Rebuilding,
    #[serde(other)]
    Unknown,
}

impl ServerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initializing => "initializing",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Stopping => "stopping",
            Self::Off => "off",
            Self::Deleting => "deleting",
            Self::Migrating => "migrating",
            Self::Rebuilding => "rebuilding",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ServerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Public network configuration. A missing address means "not yet assigned".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PublicNet {
    #[serde(default)]
    pub ipv4: Option<IpAddress>,
    #[serde(default)]
    pub ipv6: Option<IpAddress>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpAddress {
    pub ip: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Datacenter {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub location: Location,
}

/// Request body for `POST /servers`.
#[derive(Debug, Clone, Serialize)]
pub struct CreateServerRequest {
    pub name: String,
    pub server_type: String,
    pub image: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ssh_keys: Vec<SshKeyRef>,
    #[serde(skip_serializing_if = "Labels::is_empty")]
    pub labels: Labels,
    pub start_after_create: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateServerResponse {
    pub server: Server,
    pub action: Action,
    #[serde(default)]
    pub next_actions: Vec<Action>,
    /// Only set when the server was created without SSH keys.
    #[serde(default)]
    pub root_password: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ServerEnvelope {
    pub server: Server,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ServerList {
    pub servers: Vec<Server>,
}

// ── SSH keys ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SshKey {
    pub id: i64,
    pub name: String,
    pub fingerprint: String,
    pub public_key: String,
    #[serde(default)]
    pub labels: Labels,
    pub created: DateTime<Utc>,
}

/// An SSH key reference: the API accepts either the key's ID or its name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum SshKeyRef {
    ById(i64),
    ByName(String),
}

impl fmt::Display for SshKeyRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ById(id) => write!(f, "{id}"),
            Self::ByName(name) => f.write_str(name),
        }
    }
}

/// Request body for `POST /ssh_keys`.
#[derive(Debug, Clone, Serialize)]
pub struct CreateSshKeyRequest {
    pub name: String,
    pub public_key: String,
    #[serde(skip_serializing_if = "Labels::is_empty")]
    pub labels: Labels,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SshKeyEnvelope {
    pub ssh_key: SshKey,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SshKeyList {
    pub ssh_keys: Vec<SshKey>,
}

// ── Reference data ──────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerType {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub cores: u32,
    /// Memory in GB.
    pub memory: f64,
    /// Disk in GB.
    pub disk: u64,
    #[serde(default)]
    pub cpu_type: String,
    #[serde(default)]
    pub architecture: String,
    #[serde(default)]
    pub prices: Vec<ServerTypePrice>,
    #[serde(default)]
    pub deprecated: Option<bool>,
}

impl ServerType {
    pub fn is_deprecated(&self) -> bool {
        self.deprecated.unwrap_or(false)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerTypePrice {
    pub location: String,
    pub price_hourly: Price,
    pub price_monthly: Price,
}

/// Prices are decimal strings, e.g. `"0.0060000000"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Price {
    pub net: String,
    pub gross: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Image {
    pub id: i64,
    #[serde(rename = "type")]
    pub image_type: String,
    pub status: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub os_flavor: String,
    #[serde(default)]
    pub os_version: Option<String>,
    #[serde(default)]
    pub architecture: String,
    #[serde(default)]
    pub created: Option<DateTime<Utc>>,
}

impl Image {
    pub fn is_available(&self) -> bool {
        self.status == "available"
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub latitude: f64,
    #[serde(default)]
    pub longitude: f64,
    #[serde(default)]
    pub network_zone: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ServerTypeList {
    pub server_types: Vec<ServerType>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ImageList {
    pub images: Vec<Image>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct LocationList {
    pub locations: Vec<Location>,
}

// ── Actions ─────────────────────────────────────────────────────────

/// Receipt for an asynchronous provider-side operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    pub id: i64,
    pub command: String,
    pub status: ActionStatus,
    pub progress: u32,
    pub started: DateTime<Utc>,
    #[serde(default)]
    pub finished: Option<DateTime<Utc>>,
    #[serde(default)]
    pub error: Option<ActionError>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionStatus {
    Running,
    Success,
    Error,
}

impl fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Running => "running",
            Self::Success => "success",
            Self::Error => "error",
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionError {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ActionEnvelope {
    pub action: Action,
}

// ── Errors ──────────────────────────────────────────────────────────

/// Error envelope returned by the API on non-2xx responses.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
}
