pub mod parquet;

use async_trait::async_trait;
use chrono::NaiveDate;
use model::records::FlatRecord;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Parquet error: {0}")]
    Parquet(#[from] ::parquet::errors::ParquetError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("service error {code}: {message}")]
    Service { code: String, message: String },

    #[error("refusing to upload an empty batch")]
    EmptyBatch,
}

/// Descriptive fields attached to every uploaded batch so a file can be
/// traced back to its participant and day without opening the data.
#[derive(Debug, Clone, Serialize)]
pub struct UploadMetadata {
    pub participant_id: String,
    pub participant_email: String,
    pub data_date: NaiveDate,
    pub metric_type: String,
    pub upload_timestamp: String,
    pub record_count: usize,
}

/// One metric type's rows for one participant-day.
#[derive(Debug, Clone)]
pub struct UploadBatch {
    /// Logical table the rows belong to, named after the metric type.
    pub table: String,
    /// Partition value, the participant id.
    pub partition_key: String,
    pub records: FlatRecord,
    pub metadata: UploadMetadata,
}

#[async_trait]
pub trait RecordSink: Send + Sync {
    async fn upload(&self, batch: &UploadBatch) -> Result<(), SinkError>;
}
