use crate::config::ConfigError;

/// Startup and transport failures. Any of these ends the process.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to build api client: {0}")]
    Client(#[from] hcloud_api::Error),

    #[error("transport error: {0}")]
    Io(#[from] std::io::Error),
}
