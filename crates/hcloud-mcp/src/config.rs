use std::env;
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("HCLOUD_TOKEN must be set")]
    MissingToken,

    #[error("MCP_TRANSPORT must be \"stdio\" or \"http\", got {0:?}")]
    InvalidTransport(String),

    #[error("MCP_LISTEN_ADDR must be a valid socket address, got {value:?}")]
    InvalidListenAddr {
        value: String,
        source: std::net::AddrParseError,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Stdio,
    Http,
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Stdio => "stdio",
            Self::Http => "http",
        })
    }
}

impl FromStr for Transport {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, ConfigError> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stdio" => Ok(Self::Stdio),
            "http" => Ok(Self::Http),
            _ => Err(ConfigError::InvalidTransport(s.to_string())),
        }
    }
}

#[derive(Clone)]
pub struct McpConfig {
    pub hcloud_token: String,
    /// Overrides the API root, e.g. for a local mock.
    pub hcloud_endpoint: Option<String>,
    pub transport: Transport,
    pub listen_addr: SocketAddr,
}

impl McpConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let hcloud_token = lookup(hcloud_api::TOKEN_ENV)
            .filter(|t| !t.trim().is_empty())
            .ok_or(ConfigError::MissingToken)?;

        let hcloud_endpoint = lookup("HCLOUD_ENDPOINT").filter(|e| !e.trim().is_empty());

        let transport = match lookup("MCP_TRANSPORT") {
            Some(raw) => raw.parse::<Transport>()?,
            None => Transport::Stdio,
        };

        let raw_addr = lookup("MCP_LISTEN_ADDR").unwrap_or_else(|| "127.0.0.1:8080".into());
        let listen_addr = raw_addr
            .parse::<SocketAddr>()
            .map_err(|source| ConfigError::InvalidListenAddr {
                value: raw_addr.clone(),
                source,
            })?;

        Ok(Self {
            hcloud_token,
            hcloud_endpoint,
            transport,
            listen_addr,
        })
    }
}
