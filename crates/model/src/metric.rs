use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Whitelisted metric types. Vendor entries whose `type` does not map to
/// one of these are skipped before flattening.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    Temp,
    Hr,
    Hrv,
    Steps,
    BreathRate,
    Spo2,
    NightRhr,
    Motion,
    Sleep,
    SleepHrv,
    SleepStages,
    SleepRhr,
}

/// The continuous sensor whose samples drive the watermark. A day without
/// anchor samples is treated as not yet delivered by the vendor.
pub const ANCHOR_METRIC: MetricKind = MetricKind::Temp;

/// Sub-objects of the sleep payload that become independent metrics,
/// keyed by their nested key in the sleep object.
const SLEEP_SUB_METRICS: &[(&str, MetricKind)] = &[
    ("hrv_summary", MetricKind::SleepHrv),
    ("stage_summary", MetricKind::SleepStages),
    ("rhr_summary", MetricKind::SleepRhr),
];

impl MetricKind {
    pub fn from_name(name: &str) -> Option<MetricKind> {
        match name {
            "temp" => Some(MetricKind::Temp),
            "hr" => Some(MetricKind::Hr),
            "hrv" => Some(MetricKind::Hrv),
            "steps" => Some(MetricKind::Steps),
            "breath_rate" => Some(MetricKind::BreathRate),
            "spo2" => Some(MetricKind::Spo2),
            "night_rhr" => Some(MetricKind::NightRhr),
            "motion" => Some(MetricKind::Motion),
            "sleep" => Some(MetricKind::Sleep),
            "sleep_hrv" => Some(MetricKind::SleepHrv),
            "sleep_stages" => Some(MetricKind::SleepStages),
            "sleep_rhr" => Some(MetricKind::SleepRhr),
            _ => None,
        }
    }

    /// Destination table name for this metric.
    pub fn name(&self) -> &'static str {
        match self {
            MetricKind::Temp => "temp",
            MetricKind::Hr => "hr",
            MetricKind::Hrv => "hrv",
            MetricKind::Steps => "steps",
            MetricKind::BreathRate => "breath_rate",
            MetricKind::Spo2 => "spo2",
            MetricKind::NightRhr => "night_rhr",
            MetricKind::Motion => "motion",
            MetricKind::Sleep => "sleep",
            MetricKind::SleepHrv => "sleep_hrv",
            MetricKind::SleepStages => "sleep_stages",
            MetricKind::SleepRhr => "sleep_rhr",
        }
    }

    /// Compound metrics carry nested sub-metrics instead of samples.
    pub fn is_compound(&self) -> bool {
        matches!(self, MetricKind::Sleep)
    }

    pub fn sleep_submetric(key: &str) -> Option<MetricKind> {
        SLEEP_SUB_METRICS
            .iter()
            .find(|(name, _)| *name == key)
            .map(|(_, kind)| *kind)
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Envelope returned by the vendor metrics endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsResponse {
    pub data: DailyMetrics,
}

/// One participant-day of vendor data.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DailyMetrics {
    #[serde(default)]
    pub metric_data: Vec<MetricEntry>,
    #[serde(default)]
    pub latest_time_zone: Option<String>,
}

/// A single metric block. `kind` stays a raw string because the vendor
/// adds types we do not recognize; the whitelist check happens at use.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricEntry {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub object: serde_json::Value,
}

impl MetricEntry {
    pub fn new(kind: impl Into<String>, object: serde_json::Value) -> Self {
        Self {
            kind: kind.into(),
            object,
        }
    }

    pub fn metric_kind(&self) -> Option<MetricKind> {
        MetricKind::from_name(&self.kind)
    }

    /// Samples of a continuous metric, empty for compound or summary
    /// shapes.
    pub fn samples(&self) -> &[serde_json::Value] {
        self.object
            .get("values")
            .and_then(|v| v.as_array())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Splits a compound sleep entry into its whitelisted sub-metrics.
    /// Each sub-object becomes an independent entry that inherits the
    /// parent's `bedtime_start` / `bedtime_end` bounds. Non-compound
    /// entries come back unchanged.
    pub fn explode(&self) -> Vec<MetricEntry> {
        if self.metric_kind() != Some(MetricKind::Sleep) {
            return vec![self.clone()];
        }
        let Some(object) = self.object.as_object() else {
            return Vec::new();
        };
        let bedtime_start = object.get("bedtime_start").cloned();
        let bedtime_end = object.get("bedtime_end").cloned();

        let mut entries = Vec::new();
        for (key, value) in object {
            let Some(kind) = MetricKind::sleep_submetric(key) else {
                continue;
            };
            let Some(sub) = value.as_object() else {
                continue;
            };
            let mut sub = sub.clone();
            if let Some(start) = &bedtime_start {
                sub.insert("bedtime_start".to_string(), start.clone());
            }
            if let Some(end) = &bedtime_end {
                sub.insert("bedtime_end".to_string(), end.clone());
            }
            entries.push(MetricEntry::new(kind.name(), serde_json::Value::Object(sub)));
        }
        entries
    }
}

/// Per-metric sample count and newest sample timestamp for one day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricStat {
    pub count: usize,
    pub latest: Option<i64>,
}

/// Summary of a day's payload, keyed by the raw vendor type string.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DaySummary {
    per_metric: BTreeMap<String, MetricStat>,
}

impl DaySummary {
    pub fn of(metrics: &DailyMetrics) -> Self {
        let mut per_metric: BTreeMap<String, MetricStat> = BTreeMap::new();
        for entry in &metrics.metric_data {
            let stat = per_metric.entry(entry.kind.clone()).or_default();
            for sample in entry.samples() {
                stat.count += 1;
                if let Some(ts) = sample_timestamp(sample) {
                    stat.latest = Some(stat.latest.map_or(ts, |cur| cur.max(ts)));
                }
            }
        }
        Self { per_metric }
    }

    pub fn stat(&self, kind: MetricKind) -> MetricStat {
        self.per_metric.get(kind.name()).copied().unwrap_or_default()
    }

    pub fn metrics(&self) -> impl Iterator<Item = (&String, &MetricStat)> {
        self.per_metric.iter()
    }

    /// The anchor has data when it carries at least one sample with a
    /// usable timestamp.
    pub fn anchor_latest(&self, anchor: MetricKind) -> Option<i64> {
        let stat = self.stat(anchor);
        if stat.count == 0 { None } else { stat.latest }
    }
}

fn sample_timestamp(sample: &serde_json::Value) -> Option<i64> {
    let ts = sample.get("timestamp")?;
    ts.as_i64().or_else(|| ts.as_f64().map(|f| f as i64))
}
