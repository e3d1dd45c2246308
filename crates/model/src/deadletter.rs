use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A failure that was classified non-retryable and diverted out of the
/// sync path. Delivered to the dead-letter sink so humans see the payload
/// and context, while the run itself reports success to stop redelivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeadLetter {
    pub id: String,
    /// Operation that failed, e.g. `metrics_fetch` or `record_upload`.
    pub operation: String,
    pub error_message: String,
    /// Context of the failure: participant, date, metric, payload slice.
    pub error_data: HashMap<String, serde_json::Value>,
    /// Component that produced the letter.
    pub source: String,
    pub timestamp: DateTime<Utc>,
}

impl DeadLetter {
    pub fn new(operation: impl Into<String>, error_message: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            operation: operation.into(),
            error_message: error_message.into(),
            error_data: HashMap::new(),
            source: "sync-engine".to_string(),
            timestamp: Utc::now(),
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    pub fn with_participant(mut self, participant_id: &str) -> Self {
        self.error_data.insert(
            "participant_id".to_string(),
            serde_json::Value::String(participant_id.to_string()),
        );
        self
    }

    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.error_data.insert(
            "date".to_string(),
            serde_json::Value::String(date.format("%Y-%m-%d").to_string()),
        );
        self
    }

    pub fn with_data(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.error_data.insert(key.into(), value);
        self
    }
}
