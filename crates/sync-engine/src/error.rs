use crate::config::ConfigError;
use crate::sink::SinkError;
use connectors::error::ApiError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Vendor API error: {0}")]
    Api(#[from] ApiError),

    #[error("Sink error: {0}")]
    Sink(#[from] SinkError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}
