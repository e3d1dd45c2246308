use crate::error::SyncError;
use crate::sink::SinkError;
use connectors::error::ApiError;
use tracing::warn;

/// How a failed day should be handled: hand the error back to the caller
/// for redelivery, or divert it to the dead-letter sink and move on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Retryable,
    NonRetryable,
}

const RETRYABLE_SERVICE_CODES: &[&str] = &[
    "Throttling",
    "ThrottlingException",
    "SlowDown",
    "ServiceUnavailable",
    "InternalServerError",
];

const RETRYABLE_MARKERS: &[&str] = &[
    "connection",
    "timed out",
    "timeout",
    "network",
    "dns",
    "unreachable",
];

const FATAL_MARKERS: &[&str] = &["validation", "invalid", "parse", "json", "schema", "format"];

/// Decides whether an error is worth retrying. Typed variants are
/// classified first; anything they cannot decide falls back to message
/// inspection, and unknown errors default to non-retryable so a single
/// bad payload cannot wedge a participant in a redelivery loop.
pub fn classify(error: &SyncError) -> Disposition {
    let typed = match error {
        SyncError::Api(api) => classify_api(api),
        SyncError::Sink(sink) => classify_sink(sink),
        SyncError::Serialization(_) => Some(Disposition::NonRetryable),
        SyncError::Config(_) => Some(Disposition::NonRetryable),
    };
    if let Some(disposition) = typed {
        return disposition;
    }
    if let Some(disposition) = classify_text(&error.to_string()) {
        return disposition;
    }
    warn!(error = %error, "unclassified error, treating as non-retryable");
    Disposition::NonRetryable
}

fn classify_api(error: &ApiError) -> Option<Disposition> {
    match error {
        ApiError::Status { status, .. } => Some(classify_status(*status)),
        ApiError::Transport(inner) => classify_transport(inner),
        ApiError::Decode(_) => Some(Disposition::NonRetryable),
        ApiError::InvalidDate(_) => Some(Disposition::NonRetryable),
        ApiError::MissingField { .. } => Some(Disposition::NonRetryable),
        ApiError::Participant(_) => Some(Disposition::NonRetryable),
    }
}

fn classify_sink(error: &SinkError) -> Option<Disposition> {
    match error {
        SinkError::Service { code, .. } => classify_service_code(code),
        SinkError::Arrow(_) => Some(Disposition::NonRetryable),
        SinkError::Parquet(_) => Some(Disposition::NonRetryable),
        SinkError::Serialization(_) => Some(Disposition::NonRetryable),
        SinkError::EmptyBatch => Some(Disposition::NonRetryable),
        // io errors carry no structure worth matching on, let the
        // message decide
        SinkError::Io(_) => None,
    }
}

fn classify_status(status: u16) -> Disposition {
    match status {
        429 => Disposition::Retryable,
        500.. => Disposition::Retryable,
        400..=499 => Disposition::NonRetryable,
        _ => Disposition::NonRetryable,
    }
}

fn classify_transport(error: &reqwest::Error) -> Option<Disposition> {
    if error.is_timeout() || error.is_connect() {
        return Some(Disposition::Retryable);
    }
    if let Some(status) = error.status() {
        return Some(classify_status(status.as_u16()));
    }
    None
}

fn classify_service_code(code: &str) -> Option<Disposition> {
    if RETRYABLE_SERVICE_CODES.contains(&code) {
        return Some(Disposition::Retryable);
    }
    if code.starts_with("Validation")
        || code.starts_with("InvalidParameter")
        || code.starts_with("AccessDenied")
    {
        return Some(Disposition::NonRetryable);
    }
    None
}

fn classify_text(message: &str) -> Option<Disposition> {
    let lower = message.to_lowercase();
    if RETRYABLE_MARKERS.iter().any(|marker| lower.contains(marker)) {
        return Some(Disposition::Retryable);
    }
    if FATAL_MARKERS.iter().any(|marker| lower.contains(marker)) {
        return Some(Disposition::NonRetryable);
    }
    None
}
