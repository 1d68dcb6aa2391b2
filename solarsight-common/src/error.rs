use thiserror::Error;

/// Common error type for SolarSight components.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TLS setup error: {0}")]
    Tls(String),

    #[error("Invalid topic: {0}")]
    Topic(String),
}

/// Result type alias using SolarSight's Error.
pub type Result<T> = std::result::Result<T, Error>;
