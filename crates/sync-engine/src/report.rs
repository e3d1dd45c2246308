use crate::metrics::MetricsSnapshot;
use chrono::NaiveDate;
use serde::Serialize;

/// What happened to a single day inside the sync window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DayOutcome {
    /// The anchor metric had no samples, the day is not ready yet.
    SkippedNoData,
    /// The anchor's newest sample is not past the stored watermark.
    SkippedCaughtUp,
    Processed,
    /// A non-retryable failure sent the day to the dead-letter sink and
    /// stopped the walk.
    Diverted,
}

#[derive(Debug, Clone, Serialize)]
pub struct DayReport {
    pub date: NaiveDate,
    pub outcome: DayOutcome,
    pub rows_uploaded: u64,
    pub batches_uploaded: u64,
}

impl DayReport {
    pub fn skipped(date: NaiveDate, outcome: DayOutcome) -> Self {
        DayReport {
            date,
            outcome,
            rows_uploaded: 0,
            batches_uploaded: 0,
        }
    }
}

/// Summary of one participant's sync run, printable as JSON.
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub participant_id: String,
    pub target_date: NaiveDate,
    pub dry_run: bool,
    pub days: Vec<DayReport>,
    pub totals: MetricsSnapshot,
    pub final_sync_date: Option<NaiveDate>,
    pub final_sync_epoch: i64,
    pub diverted: bool,
}

impl SyncReport {
    pub fn processed_days(&self) -> usize {
        self.days
            .iter()
            .filter(|day| day.outcome == DayOutcome::Processed)
            .count()
    }
}
