use model::participant::ParticipantError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// The service answered with a non-success HTTP status.
    #[error("Request failed with status {status}: {body}")]
    Status { status: u16, body: String },

    /// The request never produced a response (DNS, connect, timeout).
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The response body was not the JSON shape we expect.
    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    /// A date argument did not match any accepted format.
    #[error("Unrecognized date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),

    /// A directory record is missing a field the sync needs.
    #[error("Participant {participant_id} has no usable {field}")]
    MissingField {
        participant_id: String,
        field: String,
    },

    /// A directory record could not be turned into a valid participant.
    #[error("Invalid participant record: {0}")]
    Participant(#[from] ParticipantError),
}

impl ApiError {
    /// HTTP status of the failure, when one was received at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Transport(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
