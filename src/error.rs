use thiserror::Error;

/// The transport could not even be created.
#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("invalid endpoint URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("unsupported scheme '{0}', expected ws or wss")]
    UnsupportedScheme(String),
    #[error("no async runtime to drive the connection")]
    NoRuntime,
}

/// Why an inbound frame was discarded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("Failed to parse message: {0}")]
    ParseError(String),
    #[error("Received non-conforming packet: {0}...")]
    NonConforming(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),
}
