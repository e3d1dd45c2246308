use async_trait::async_trait;
use chrono::NaiveDate;
use connectors::error::ApiError;
use connectors::metrics::fixture::FixtureMetrics;
use connectors::metrics::provider::MetricsProvider;
use model::deadletter::DeadLetter;
use model::metric::{DailyMetrics, MetricEntry};
use model::participant::{Participant, Watermark};
use model::value::Value;
use serde_json::json;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use sync_engine::archive::FsPayloadArchive;
use sync_engine::config::SyncConfig;
use sync_engine::deadletter::JsonlDeadLetter;
use sync_engine::error::SyncError;
use sync_engine::executor::{PARTICIPANT_COLUMN, SyncExecutor, SyncExecutorParams};
use sync_engine::report::DayOutcome;
use sync_engine::sink::parquet::ParquetDataset;
use sync_engine::sink::{RecordSink, SinkError, UploadBatch};
use sync_engine::watermark::{MemoryWatermarkStore, WatermarkStore};
use tempfile::TempDir;

// 2025-09-01T08:00:00Z and friends, spelled out so watermark assertions
// stay readable
const SEP1_0800: i64 = 1_756_713_600;
const SEP2_0715: i64 = 1_756_797_300;
const SEP2_0800: i64 = 1_756_800_000;
const SEP2_0900: i64 = 1_756_803_600;
const SEP3_0800: i64 = 1_756_886_400;
const SEP3_0900: i64 = 1_756_890_000;

fn date(s: &str) -> NaiveDate {
    s.parse().unwrap()
}

fn series(timestamps: &[i64]) -> serde_json::Value {
    let samples: Vec<_> = timestamps
        .iter()
        .map(|ts| json!({"timestamp": ts, "value": 36.4}))
        .collect();
    json!({"values": samples})
}

fn day_payload(temp: &[i64], hr: &[i64]) -> DailyMetrics {
    DailyMetrics {
        metric_data: vec![
            MetricEntry::new("temp", series(temp)),
            MetricEntry::new("hr", series(hr)),
        ],
        latest_time_zone: None,
    }
}

#[derive(Clone)]
enum DayScript {
    Deliver(DailyMetrics),
    Fail(u16, &'static str),
}

struct ScriptedProvider {
    days: HashMap<NaiveDate, DayScript>,
}

impl ScriptedProvider {
    fn new(days: Vec<(NaiveDate, DayScript)>) -> Self {
        Self {
            days: days.into_iter().collect(),
        }
    }
}

#[async_trait]
impl MetricsProvider for ScriptedProvider {
    async fn fetch(&self, _email: &str, day: NaiveDate) -> Result<DailyMetrics, ApiError> {
        match self.days.get(&day) {
            Some(DayScript::Deliver(payload)) => Ok(payload.clone()),
            Some(DayScript::Fail(status, body)) => Err(ApiError::Status {
                status: *status,
                body: body.to_string(),
            }),
            None => Ok(DailyMetrics::default()),
        }
    }
}

/// Store double for a directory that rejects every update.
struct RejectingStore;

#[async_trait]
impl WatermarkStore for RejectingStore {
    async fn update(
        &self,
        _participant_id: &str,
        _day: NaiveDate,
        _watermark: &Watermark,
    ) -> Result<(), ApiError> {
        Err(ApiError::Status {
            status: 500,
            body: "directory unavailable".to_string(),
        })
    }
}

#[derive(Default)]
struct RecordingSink {
    batches: Mutex<Vec<UploadBatch>>,
}

impl RecordingSink {
    fn batches(&self) -> Vec<UploadBatch> {
        self.batches.lock().unwrap().clone()
    }
}

#[async_trait]
impl RecordSink for RecordingSink {
    async fn upload(&self, batch: &UploadBatch) -> Result<(), SinkError> {
        self.batches.lock().unwrap().push(batch.clone());
        Ok(())
    }
}

struct Harness {
    executor: SyncExecutor,
    sink: Arc<RecordingSink>,
    store: Arc<MemoryWatermarkStore>,
    dead_letter_path: PathBuf,
    data_dir: TempDir,
}

fn harness(provider: Arc<dyn MetricsProvider>, config: SyncConfig) -> Harness {
    let data_dir = tempfile::tempdir().unwrap();
    let sink = Arc::new(RecordingSink::default());
    let store = Arc::new(MemoryWatermarkStore::new());
    let dead_letter_path = data_dir.path().join("dead_letters.jsonl");
    let executor = SyncExecutor::new(SyncExecutorParams {
        provider,
        sink: sink.clone(),
        archive: Arc::new(FsPayloadArchive::new(data_dir.path(), "wearables")),
        watermarks: store.clone(),
        dead_letters: Arc::new(JsonlDeadLetter::new(&dead_letter_path)),
        config,
    });
    Harness {
        executor,
        sink,
        store,
        dead_letter_path,
        data_dir,
    }
}

fn participant(start: &str) -> Participant {
    Participant::new(
        "p-01",
        "p1@example.org",
        "America/Phoenix",
        Watermark::new(date(start)),
    )
    .unwrap()
}

fn three_day_provider() -> Arc<ScriptedProvider> {
    Arc::new(ScriptedProvider::new(vec![
        // day 1: hr delivered but the anchor has no samples yet
        (
            date("2025-09-01"),
            DayScript::Deliver(day_payload(&[], &[SEP1_0800])),
        ),
        (
            date("2025-09-02"),
            DayScript::Deliver(day_payload(&[SEP2_0800, SEP2_0900], &[SEP2_0715])),
        ),
        // day 3: one temp sample at exactly the previous epoch must be
        // filtered, one new sample survives
        (
            date("2025-09-03"),
            DayScript::Deliver(day_payload(&[SEP2_0900, SEP3_0900], &[SEP3_0800])),
        ),
    ]))
}

#[tokio::test]
async fn walks_the_window_and_advances_the_watermark_per_landed_day() {
    let h = harness(three_day_provider(), SyncConfig::default());
    let report = h
        .executor
        .sync_participant(&participant("2025-09-01"), date("2025-09-03"))
        .await
        .unwrap();

    let outcomes: Vec<DayOutcome> = report.days.iter().map(|d| d.outcome).collect();
    assert_eq!(
        outcomes,
        vec![
            DayOutcome::SkippedNoData,
            DayOutcome::Processed,
            DayOutcome::Processed
        ]
    );
    assert_eq!(report.final_sync_date, Some(date("2025-09-03")));
    assert_eq!(report.final_sync_epoch, SEP3_0900);
    assert!(!report.diverted);

    // one batch per metric per processed day, temp before hr
    let batches = h.sink.batches();
    let tables: Vec<&str> = batches.iter().map(|b| b.table.as_str()).collect();
    assert_eq!(tables, vec!["temp", "hr", "temp", "hr"]);

    // day 2 temp: both samples are past epoch 0
    assert_eq!(batches[0].records.row_count(), 2);
    // day 3 temp: the sample at the old epoch is filtered out
    assert_eq!(batches[2].records.row_count(), 1);

    let pid = batches[0].records.get(PARTICIPANT_COLUMN).unwrap();
    assert_eq!(pid.len(), 2);
    assert!(pid.iter().all(|cell| *cell == Value::from("p-01")));
    assert!(
        batches[0]
            .records
            .get("object_values_timestamp_iso8601_tz")
            .is_some()
    );

    assert_eq!(batches[0].metadata.metric_type, "temp");
    assert_eq!(batches[0].metadata.data_date, date("2025-09-02"));
    assert_eq!(batches[0].metadata.record_count, 2);

    assert_eq!(report.totals.rows_uploaded, 5);
    assert_eq!(report.totals.batches_uploaded, 4);
    assert_eq!(report.totals.days_skipped, 1);

    // the watermark was persisted once per landed day
    assert_eq!(h.store.update_count(), 2);
    let stored = h.store.get("p-01").unwrap();
    assert_eq!(stored.sync_date, Some(date("2025-09-03")));
    assert_eq!(stored.sync_epoch, SEP3_0900);
}

#[tokio::test]
async fn rerunning_a_synced_window_uploads_nothing() {
    let h = harness(three_day_provider(), SyncConfig::default());
    let mut caught_up = participant("2025-09-01");
    caught_up.watermark.advance(date("2025-09-03"), SEP3_0900);

    let report = h
        .executor
        .sync_participant(&caught_up, date("2025-09-03"))
        .await
        .unwrap();

    assert_eq!(report.days.len(), 1);
    assert_eq!(report.days[0].outcome, DayOutcome::SkippedCaughtUp);
    assert!(h.sink.batches().is_empty());
    assert_eq!(h.store.update_count(), 0);
    assert_eq!(report.final_sync_epoch, SEP3_0900);
}

#[tokio::test]
async fn non_retryable_fetch_failure_diverts_the_day_and_stops_the_walk() {
    let provider = Arc::new(ScriptedProvider::new(vec![
        (
            date("2025-09-01"),
            DayScript::Deliver(day_payload(&[SEP1_0800], &[SEP1_0800])),
        ),
        (date("2025-09-02"), DayScript::Fail(422, "unprocessable")),
        (
            date("2025-09-03"),
            DayScript::Deliver(day_payload(&[SEP3_0900], &[SEP3_0800])),
        ),
    ]));
    let h = harness(provider, SyncConfig::default());

    let report = h
        .executor
        .sync_participant(&participant("2025-09-01"), date("2025-09-03"))
        .await
        .unwrap();

    assert!(report.diverted);
    let outcomes: Vec<DayOutcome> = report.days.iter().map(|d| d.outcome).collect();
    assert_eq!(outcomes, vec![DayOutcome::Processed, DayOutcome::Diverted]);

    // the walk stopped, day 3 was never fetched and the watermark stayed
    // at the last landed day
    let stored = h.store.get("p-01").unwrap();
    assert_eq!(stored.sync_date, Some(date("2025-09-01")));
    assert_eq!(h.store.update_count(), 1);

    let body = std::fs::read_to_string(&h.dead_letter_path).unwrap();
    let letters: Vec<DeadLetter> = body
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(letters.len(), 1);
    assert_eq!(letters[0].operation, "metrics_fetch");
    assert_eq!(letters[0].error_data.get("participant_id"), Some(&json!("p-01")));
    assert_eq!(letters[0].error_data.get("date"), Some(&json!("2025-09-02")));
}

#[tokio::test]
async fn retryable_fetch_failure_propagates_for_redelivery() {
    let provider = Arc::new(ScriptedProvider::new(vec![(
        date("2025-09-01"),
        DayScript::Fail(503, "unavailable"),
    )]));
    let h = harness(provider, SyncConfig::default());

    let error = h
        .executor
        .sync_participant(&participant("2025-09-01"), date("2025-09-02"))
        .await
        .unwrap_err();

    assert!(matches!(
        error,
        SyncError::Api(ApiError::Status { status: 503, .. })
    ));
    assert!(h.sink.batches().is_empty());
    assert_eq!(h.store.update_count(), 0);
    assert!(!h.dead_letter_path.exists());
}

#[tokio::test]
async fn watermark_persist_failure_does_not_interrupt_the_walk() {
    let data_dir = tempfile::tempdir().unwrap();
    let sink = Arc::new(RecordingSink::default());
    let dead_letter_path = data_dir.path().join("dead_letters.jsonl");
    let executor = SyncExecutor::new(SyncExecutorParams {
        provider: three_day_provider(),
        sink: sink.clone(),
        archive: Arc::new(FsPayloadArchive::new(data_dir.path(), "wearables")),
        watermarks: Arc::new(RejectingStore),
        dead_letters: Arc::new(JsonlDeadLetter::new(&dead_letter_path)),
        config: SyncConfig::default(),
    });

    let report = executor
        .sync_participant(&participant("2025-09-01"), date("2025-09-03"))
        .await
        .unwrap();

    // every landed day still uploads and the walk reaches the target
    assert!(!report.diverted);
    assert_eq!(report.processed_days(), 2);
    assert_eq!(sink.batches().len(), 4);
    assert_eq!(report.totals.rows_uploaded, 5);

    // the in-run watermark keeps advancing even though no persist landed
    assert_eq!(report.final_sync_date, Some(date("2025-09-03")));
    assert_eq!(report.final_sync_epoch, SEP3_0900);

    // a persist failure is not a day failure, nothing is dead-lettered
    assert!(!dead_letter_path.exists());
}

#[tokio::test]
async fn dry_run_counts_rows_without_touching_any_sink() {
    let h = harness(
        three_day_provider(),
        SyncConfig::default().with_dry_run(true),
    );
    let report = h
        .executor
        .sync_participant(&participant("2025-09-01"), date("2025-09-03"))
        .await
        .unwrap();

    assert!(report.dry_run);
    assert_eq!(report.processed_days(), 2);
    assert_eq!(report.totals.rows_uploaded, 5);
    assert!(h.sink.batches().is_empty());
    assert_eq!(h.store.update_count(), 0);
    assert!(!h.data_dir.path().join("wearables").exists());
    assert!(!h.dead_letter_path.exists());
    // the report still shows where the watermark would move
    assert_eq!(report.final_sync_date, Some(date("2025-09-03")));
}

#[tokio::test]
async fn fixture_payloads_land_as_parquet_partitions() {
    let data_dir = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryWatermarkStore::new());
    let executor = SyncExecutor::new(SyncExecutorParams {
        provider: Arc::new(FixtureMetrics::new()),
        sink: Arc::new(ParquetDataset::new(data_dir.path(), "wearables")),
        archive: Arc::new(FsPayloadArchive::new(data_dir.path(), "wearables")),
        watermarks: store.clone(),
        dead_letters: Arc::new(JsonlDeadLetter::new(
            data_dir.path().join("dead_letters.jsonl"),
        )),
        config: SyncConfig::default(),
    });

    let report = executor
        .sync_participant(&participant("2025-09-02"), date("2025-09-02"))
        .await
        .unwrap();

    assert_eq!(report.processed_days(), 1);
    // temp, hr, breath_rate plus the three exploded sleep summaries
    assert_eq!(report.totals.batches_uploaded, 6);

    let temp_partition = data_dir.path().join("wearables/temp/pid=p-01");
    let parts: Vec<_> = std::fs::read_dir(&temp_partition)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .collect();
    assert_eq!(parts.len(), 1);

    let file = std::fs::File::open(&parts[0]).unwrap();
    let builder =
        parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder::try_new(file).unwrap();
    let mut reader = builder.build().unwrap();
    let batch = reader.next().unwrap().unwrap();
    assert_eq!(batch.num_rows(), 6);
    assert!(batch.schema().column_with_name(PARTICIPANT_COLUMN).is_some());

    assert!(data_dir.path().join("wearables/sleep_hrv/pid=p-01").exists());
    assert!(
        data_dir
            .path()
            .join("wearables/raw_json/pid=p-01/2025-09-02.json")
            .exists()
    );

    // fixture temp samples run 06:00 to 06:50 UTC, the watermark lands on
    // the newest one
    let stored = store.get("p-01").unwrap();
    assert_eq!(stored.sync_date, Some(date("2025-09-02")));
    assert_eq!(stored.sync_epoch, 1_756_795_800);
}
