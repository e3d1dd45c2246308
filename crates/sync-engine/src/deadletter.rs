use crate::sink::SinkError;
use async_trait::async_trait;
use model::deadletter::DeadLetter;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use tracing::{debug, warn};

#[async_trait]
pub trait DeadLetterSink: Send + Sync {
    async fn publish(&self, letter: &DeadLetter) -> Result<(), SinkError>;
}

/// Appends dead letters to a JSONL file, one letter per line.
pub struct JsonlDeadLetter {
    path: PathBuf,
}

impl JsonlDeadLetter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl DeadLetterSink for JsonlDeadLetter {
    async fn publish(&self, letter: &DeadLetter) -> Result<(), SinkError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let line = serde_json::to_string(letter)?;
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        writeln!(file, "{line}")?;
        debug!(id = %letter.id, operation = %letter.operation, "dead letter recorded");
        Ok(())
    }
}

/// Publishing a dead letter must never fail the run that diverted it, so
/// sink failures are logged and swallowed here.
pub async fn publish_or_log(sink: &dyn DeadLetterSink, letter: DeadLetter) {
    if let Err(error) = sink.publish(&letter).await {
        warn!(
            id = %letter.id,
            operation = %letter.operation,
            error = %error,
            "failed to publish dead letter"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn appends_one_line_per_letter() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("letters.jsonl");
        let sink = JsonlDeadLetter::new(&path);

        sink.publish(&DeadLetter::new("metrics_fetch", "boom"))
            .await
            .unwrap();
        sink.publish(&DeadLetter::new("record_upload", "bang"))
            .await
            .unwrap();

        let body = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = body.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: DeadLetter = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first.operation, "metrics_fetch");
    }

    #[tokio::test]
    async fn creates_missing_parent_directories() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/deeper/letters.jsonl");
        let sink = JsonlDeadLetter::new(&path);

        sink.publish(&DeadLetter::new("metrics_fetch", "boom"))
            .await
            .unwrap();

        assert!(path.exists());
    }

    #[tokio::test]
    async fn publish_or_log_swallows_sink_failures() {
        let dir = tempdir().unwrap();
        // a directory at the target path makes the open fail
        let sink = JsonlDeadLetter::new(dir.path());
        publish_or_log(&sink, DeadLetter::new("metrics_fetch", "boom")).await;
    }
}
