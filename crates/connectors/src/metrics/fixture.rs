use crate::error::ApiError;
use crate::metrics::provider::MetricsProvider;
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use model::metric::{DailyMetrics, MetricEntry};
use serde_json::json;

/// Deterministic stand-in for the vendor API: every date maps to the same
/// plausible payload shape, with sample timestamps derived from the date
/// so that anchor timestamps increase strictly across consecutive days.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixtureMetrics;

impl FixtureMetrics {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl MetricsProvider for FixtureMetrics {
    async fn fetch(&self, _email: &str, date: NaiveDate) -> Result<DailyMetrics, ApiError> {
        Ok(sample_day(date))
    }
}

/// Builds one day of fixture metrics: continuous temp/hr/breath series,
/// a compound sleep block and one deliberately unrecognized type.
pub fn sample_day(date: NaiveDate) -> DailyMetrics {
    let midnight = date.and_time(NaiveTime::MIN).and_utc().timestamp();
    let series = |start: i64, step: i64, values: &[f64]| -> serde_json::Value {
        let samples: Vec<_> = values
            .iter()
            .enumerate()
            .map(|(i, v)| json!({"timestamp": start + step * i as i64, "value": v}))
            .collect();
        json!({"values": samples})
    };

    let temp = series(midnight + 6 * 3600, 600, &[36.2, 36.25, 36.3, 36.3, 36.4, 36.45]);
    let hr = series(midnight + 6 * 3600, 900, &[58.0, 61.0, 64.0, 60.0]);
    let breath = series(midnight + 6 * 3600, 1200, &[13.0, 14.0, 13.5]);
    let sleep = json!({
        "bedtime_start": midnight + 3600,
        "bedtime_end": midnight + 7 * 3600,
        "hrv_summary": {"avg": 62, "min": 38, "max": 104},
        "stage_summary": {"deep_sec": 5580, "rem_sec": 4620, "light_sec": 9840, "awake_sec": 1320},
        "rhr_summary": {"avg": 54, "min": 49},
        "vendor_extras": {"score": 87}
    });

    DailyMetrics {
        metric_data: vec![
            MetricEntry::new("temp", temp),
            MetricEntry::new("hr", hr),
            MetricEntry::new("breath_rate", breath),
            MetricEntry::new("sleep", sleep),
            MetricEntry::new("vendor_lab", json!({"panel": "experimental"})),
        ],
        latest_time_zone: Some("America/Phoenix".to_string()),
    }
}
