use chrono::DateTime;
use chrono_tz::Tz;
use model::records::FlatRecord;

/// Key name fragments that mark a value as a unix timestamp.
const TIMESTAMP_MARKERS: &[&str] = &["timestamp", "_start", "_end"];

const UTC_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";
const LOCAL_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%:z";

pub fn is_timestamp_key(key: &str) -> bool {
    let lower = key.to_lowercase();
    TIMESTAMP_MARKERS.iter().any(|marker| lower.contains(marker))
}

/// Adds derived ISO-8601 fields next to every timestamp-like key in a
/// JSON structure: `<key>_iso8601` (UTC) always, `<key>_iso8601_tz`
/// (local offset) when a timezone is supplied. Children are processed
/// first, so nested timestamp keys gain their derived fields at their own
/// level. Pure: the input is never mutated.
pub fn normalize_value(value: &serde_json::Value, timezone: Option<&Tz>) -> serde_json::Value {
    match value {
        serde_json::Value::Object(map) => {
            let mut result = serde_json::Map::new();
            let mut derived: Vec<(String, serde_json::Value)> = Vec::new();
            for (key, child) in map {
                let processed = normalize_value(child, timezone);
                if is_timestamp_key(key) {
                    derived.push((format!("{key}_iso8601"), convert(&processed, None)));
                    if let Some(tz) = timezone {
                        derived.push((format!("{key}_iso8601_tz"), convert(&processed, Some(tz))));
                    }
                }
                result.insert(key.clone(), processed);
            }
            for (key, value) in derived {
                result.insert(key, value);
            }
            serde_json::Value::Object(result)
        }
        serde_json::Value::Array(items) => serde_json::Value::Array(
            items.iter().map(|item| normalize_value(item, timezone)).collect(),
        ),
        other => other.clone(),
    }
}

/// Normalizes a flattened record by round-tripping it through its JSON
/// shape, so derived columns line up with their source columns.
pub fn normalize_record(record: &FlatRecord, timezone: Option<&Tz>) -> FlatRecord {
    let map = record.to_json_map();
    match normalize_value(&serde_json::Value::Object(map), timezone) {
        serde_json::Value::Object(normalized) => FlatRecord::from_json_map(&normalized),
        _ => record.clone(),
    }
}

/// Converts a timestamp value (scalar or list) element-wise. Non-numeric
/// elements pass through unchanged; numeric elements that are out of the
/// representable range are preserved as their string rendering.
fn convert(value: &serde_json::Value, timezone: Option<&Tz>) -> serde_json::Value {
    match value {
        serde_json::Value::Array(items) => serde_json::Value::Array(
            items.iter().map(|item| convert_scalar(item, timezone)).collect(),
        ),
        other => convert_scalar(other, timezone),
    }
}

fn convert_scalar(value: &serde_json::Value, timezone: Option<&Tz>) -> serde_json::Value {
    let Some(epoch) = epoch_seconds(value) else {
        return value.clone();
    };
    match render(epoch, timezone) {
        Some(rendered) => serde_json::Value::String(rendered),
        None => serde_json::Value::String(value.to_string()),
    }
}

fn epoch_seconds(value: &serde_json::Value) -> Option<i64> {
    if !value.is_number() {
        return None;
    }
    value.as_i64().or_else(|| value.as_f64().map(|f| f as i64))
}

fn render(epoch: i64, timezone: Option<&Tz>) -> Option<String> {
    let utc = DateTime::from_timestamp(epoch, 0)?;
    Some(match timezone {
        Some(tz) => utc.with_timezone(tz).format(LOCAL_FORMAT).to_string(),
        None => utc.format(UTC_FORMAT).to_string(),
    })
}
