use crate::sink::SinkError;
use async_trait::async_trait;
use chrono::NaiveDate;
use model::metric::DailyMetrics;
use std::fs;
use std::path::PathBuf;
use tracing::debug;

/// Stores the untouched vendor payload for a participant-day so the
/// flattened tables can always be rebuilt from source.
#[async_trait]
pub trait PayloadArchive: Send + Sync {
    async fn store(
        &self,
        participant_id: &str,
        date: NaiveDate,
        payload: &DailyMetrics,
    ) -> Result<(), SinkError>;
}

/// Filesystem archive laid out alongside the parquet dataset, one JSON
/// document per participant-day at
/// `<root>/<database>/raw_json/pid=<participant>/<date>.json`.
pub struct FsPayloadArchive {
    root: PathBuf,
    database: String,
}

impl FsPayloadArchive {
    pub fn new(root: impl Into<PathBuf>, database: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            database: database.into(),
        }
    }

    fn day_path(&self, participant_id: &str, date: NaiveDate) -> PathBuf {
        self.root
            .join(&self.database)
            .join("raw_json")
            .join(format!("pid={participant_id}"))
            .join(format!("{date}.json"))
    }
}

#[async_trait]
impl PayloadArchive for FsPayloadArchive {
    async fn store(
        &self,
        participant_id: &str,
        date: NaiveDate,
        payload: &DailyMetrics,
    ) -> Result<(), SinkError> {
        let path = self.day_path(participant_id, date);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let body = serde_json::to_string(payload)?;
        fs::write(&path, body)?;
        debug!(participant_id, %date, path = %path.display(), "archived raw payload");
        Ok(())
    }
}
