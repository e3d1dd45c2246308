use connectors::error::ApiError;
use model::participant::ParticipantError;
use sync_engine::config::ConfigError;
use sync_engine::error::SyncError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Failed to read input file: {0}")]
    InputRead(#[from] std::io::Error),

    #[error("Failed to parse the payload file as JSON: {0}")]
    PayloadParse(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Vendor API error: {0}")]
    Api(#[from] ApiError),

    #[error("Sync failed: {0}")]
    Sync(#[from] SyncError),

    #[error("Invalid participant: {0}")]
    Participant(#[from] ParticipantError),

    #[error("Failed to serialize data to JSON: {0}")]
    JsonSerialize(serde_json::Error),

    #[error(
        "Participant directory is not configured, set DIRECTORY_BASE_URL, DIRECTORY_PROJECT_ID and DIRECTORY_TOKEN"
    )]
    MissingDirectory,

    #[error("{0} is required when no participant directory is configured")]
    MissingFlag(&'static str),
}
