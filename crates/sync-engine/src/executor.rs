use crate::archive::PayloadArchive;
use crate::classify::{Disposition, classify};
use crate::config::SyncConfig;
use crate::deadletter::{DeadLetterSink, publish_or_log};
use crate::error::SyncError;
use crate::metrics::Metrics;
use crate::report::{DayOutcome, DayReport, SyncReport};
use crate::sink::{RecordSink, UploadBatch, UploadMetadata};
use crate::transform::flatten::{FlattenOptions, flatten};
use crate::transform::normalize::normalize_record;
use crate::watermark::WatermarkStore;
use crate::window::SyncWindow;
use chrono::{NaiveDate, Utc};
use connectors::metrics::provider::MetricsProvider;
use model::deadletter::DeadLetter;
use model::metric::{DailyMetrics, DaySummary, MetricEntry};
use model::participant::Participant;
use model::records::FlatRecord;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Column holding each sample's unix timestamp after flattening. Rows are
/// filtered against the watermark on this column.
pub const TIMESTAMP_COLUMN: &str = "object_values_timestamp";

/// Column stamped onto every record with the participant id.
pub const PARTICIPANT_COLUMN: &str = "pid";

const UPLOAD_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%:z";

pub struct SyncExecutorParams {
    pub provider: Arc<dyn MetricsProvider>,
    pub sink: Arc<dyn RecordSink>,
    pub archive: Arc<dyn PayloadArchive>,
    pub watermarks: Arc<dyn WatermarkStore>,
    pub dead_letters: Arc<dyn DeadLetterSink>,
    pub config: SyncConfig,
}

/// Walks a participant's day window, turning vendor payloads into
/// uploaded batches and advancing the watermark one landed day at a time.
pub struct SyncExecutor {
    provider: Arc<dyn MetricsProvider>,
    sink: Arc<dyn RecordSink>,
    archive: Arc<dyn PayloadArchive>,
    watermarks: Arc<dyn WatermarkStore>,
    dead_letters: Arc<dyn DeadLetterSink>,
    config: SyncConfig,
    metrics: Metrics,
}

#[derive(Debug, Default, Clone, Copy)]
struct DayStats {
    rows: u64,
    batches: u64,
}

impl SyncExecutor {
    pub fn new(params: SyncExecutorParams) -> Self {
        SyncExecutor {
            provider: params.provider,
            sink: params.sink,
            archive: params.archive,
            watermarks: params.watermarks,
            dead_letters: params.dead_letters,
            config: params.config,
            metrics: Metrics::new(),
        }
    }

    pub fn metrics(&self) -> Metrics {
        self.metrics.clone()
    }

    /// Syncs one participant from their resume date through `target`
    /// inclusive.
    ///
    /// Each day is guarded twice before any upload: a day whose anchor
    /// metric has no samples has not been delivered yet, and a day whose
    /// newest anchor sample is not past the stored watermark was already
    /// synced. Retryable failures abort the walk with an error so the
    /// caller's delivery mechanism can retry the whole run; non-retryable
    /// failures divert the day to the dead-letter sink and stop the walk
    /// with a success, keeping the watermark at the last landed day.
    pub async fn sync_participant(
        &self,
        participant: &Participant,
        target: NaiveDate,
    ) -> Result<SyncReport, SyncError> {
        let mut watermark = participant.watermark;
        let window = SyncWindow::new(watermark.resume_date(), target);
        info!(
            participant_id = %participant.id,
            resume = %watermark.resume_date(),
            target = %target,
            days = window.days(),
            dry_run = self.config.dry_run,
            "starting sync window"
        );

        let mut days = Vec::new();
        let mut diverted = false;
        for day in window {
            let payload = match self.provider.fetch(&participant.email, day).await {
                Ok(payload) => payload,
                Err(api_error) => {
                    let failure = SyncError::from(api_error);
                    match classify(&failure) {
                        Disposition::Retryable => {
                            warn!(
                                participant_id = %participant.id,
                                day = %day,
                                error = %failure,
                                "retryable fetch failure, handing the run back for redelivery"
                            );
                            return Err(failure);
                        }
                        Disposition::NonRetryable => {
                            self.divert(participant, day, "metrics_fetch", &failure).await;
                            days.push(DayReport::skipped(day, DayOutcome::Diverted));
                            diverted = true;
                            break;
                        }
                    }
                }
            };

            let summary = DaySummary::of(&payload);
            let Some(latest) = summary.anchor_latest(self.config.anchor) else {
                debug!(
                    participant_id = %participant.id,
                    day = %day,
                    anchor = %self.config.anchor,
                    "anchor metric has no samples, day not delivered yet"
                );
                self.metrics.increment_days_skipped(1);
                days.push(DayReport::skipped(day, DayOutcome::SkippedNoData));
                continue;
            };
            if latest <= watermark.sync_epoch {
                debug!(
                    participant_id = %participant.id,
                    day = %day,
                    latest,
                    sync_epoch = watermark.sync_epoch,
                    "anchor not past watermark, day already synced"
                );
                self.metrics.increment_days_skipped(1);
                days.push(DayReport::skipped(day, DayOutcome::SkippedCaughtUp));
                continue;
            }

            let stats = match self
                .process_day(participant, day, &payload, watermark.sync_epoch)
                .await
            {
                Ok(stats) => stats,
                Err(failure) => match classify(&failure) {
                    Disposition::Retryable => {
                        warn!(
                            participant_id = %participant.id,
                            day = %day,
                            error = %failure,
                            "retryable upload failure, handing the run back for redelivery"
                        );
                        return Err(failure);
                    }
                    Disposition::NonRetryable => {
                        self.divert(participant, day, "record_upload", &failure).await;
                        days.push(DayReport::skipped(day, DayOutcome::Diverted));
                        diverted = true;
                        break;
                    }
                },
            };

            watermark.advance(day, latest);
            if !self.config.dry_run && stats.rows > 0 {
                // best effort, a lost update just re-runs this day next
                // time and the caught-up guard de-duplicates it
                if let Err(store_error) = self
                    .watermarks
                    .update(&participant.id, day, &watermark)
                    .await
                {
                    warn!(
                        participant_id = %participant.id,
                        day = %day,
                        error = %store_error,
                        "failed to persist watermark"
                    );
                }
            }
            self.metrics.increment_days_processed(1);
            days.push(DayReport {
                date: day,
                outcome: DayOutcome::Processed,
                rows_uploaded: stats.rows,
                batches_uploaded: stats.batches,
            });
        }

        let report = SyncReport {
            participant_id: participant.id.clone(),
            target_date: target,
            dry_run: self.config.dry_run,
            days,
            totals: self.metrics.snapshot(),
            final_sync_date: watermark.sync_date,
            final_sync_epoch: watermark.sync_epoch,
            diverted,
        };
        info!(
            participant_id = %participant.id,
            processed = report.processed_days(),
            rows = report.totals.rows_uploaded,
            dead_letters = report.totals.dead_letters,
            diverted,
            "sync window finished"
        );
        Ok(report)
    }

    /// Archives the raw payload, then flattens, normalizes, filters and
    /// uploads one batch per whitelisted metric type.
    async fn process_day(
        &self,
        participant: &Participant,
        day: NaiveDate,
        payload: &DailyMetrics,
        sync_epoch: i64,
    ) -> Result<DayStats, SyncError> {
        if !self.config.dry_run {
            self.archive.store(&participant.id, day, payload).await?;
        }

        let mut stats = DayStats::default();
        for entry in &payload.metric_data {
            if entry.metric_kind().is_none() {
                debug!(metric = %entry.kind, "metric type not whitelisted, skipping");
                continue;
            }
            for piece in entry.explode() {
                let Some(kind) = piece.metric_kind() else {
                    continue;
                };
                // a continuous metric that delivered an empty sample list
                // has no rows, only summary-shaped entries go through
                // without samples
                let has_values_key = piece.object.get("values").is_some();
                if has_values_key && piece.samples().is_empty() {
                    continue;
                }
                let records = self.build_records(participant, &piece, sync_epoch)?;
                let rows = records.row_count();
                if rows == 0 {
                    debug!(
                        participant_id = %participant.id,
                        day = %day,
                        metric = %kind,
                        "no rows past the watermark"
                    );
                    continue;
                }

                if !self.config.dry_run {
                    let batch = UploadBatch {
                        table: kind.name().to_string(),
                        partition_key: participant.id.clone(),
                        metadata: UploadMetadata {
                            participant_id: participant.id.clone(),
                            participant_email: participant.email.clone(),
                            data_date: day,
                            metric_type: kind.name().to_string(),
                            upload_timestamp: Utc::now()
                                .with_timezone(&participant.timezone)
                                .format(UPLOAD_TIME_FORMAT)
                                .to_string(),
                            record_count: rows,
                        },
                        records,
                    };
                    self.sink.upload(&batch).await?;
                }
                stats.rows += rows as u64;
                stats.batches += 1;
                self.metrics.increment_rows(rows as u64);
                self.metrics.increment_batches(1);
            }
        }
        Ok(stats)
    }

    /// One metric entry to a filtered columnar record: stamp the
    /// participant id, flatten to a uniform table, derive ISO timestamp
    /// columns, then drop rows at or before the watermark.
    fn build_records(
        &self,
        participant: &Participant,
        entry: &MetricEntry,
        sync_epoch: i64,
    ) -> Result<FlatRecord, SyncError> {
        let payload = serde_json::to_value(entry)?;
        let options = FlattenOptions::new()
            .with_fill(true)
            .with_inject(PARTICIPANT_COLUMN, serde_json::Value::String(participant.id.clone()));
        let mut records = flatten(&payload, &options);
        records = normalize_record(&records, Some(&participant.timezone));
        records.retain_rows_after(TIMESTAMP_COLUMN, sync_epoch);
        records.drop_empty_columns();
        Ok(records)
    }

    async fn divert(
        &self,
        participant: &Participant,
        day: NaiveDate,
        operation: &str,
        failure: &SyncError,
    ) {
        error!(
            participant_id = %participant.id,
            day = %day,
            operation,
            error = %failure,
            "non-retryable failure, diverting day to dead letters"
        );
        self.metrics.increment_dead_letters(1);
        let letter = DeadLetter::new(operation, failure.to_string())
            .with_participant(&participant.id)
            .with_date(day);
        publish_or_log(self.dead_letters.as_ref(), letter).await;
    }
}
