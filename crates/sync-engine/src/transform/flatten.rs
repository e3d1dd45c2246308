use model::records::FlatRecord;
use model::value::Value;

/// Options for [`flatten`]. Defaults: `_` separator, no fill, no injected
/// field.
#[derive(Debug, Clone, Default)]
pub struct FlattenOptions {
    separator: Option<String>,
    fill: bool,
    inject: Option<(String, serde_json::Value)>,
}

impl FlattenOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = Some(separator.into());
        self
    }

    /// Stretch the result into a uniform table (see [`FlatRecord::fill`]).
    pub fn with_fill(mut self, fill: bool) -> Self {
        self.fill = fill;
        self
    }

    /// Insert a field at the top level before flattening, so it shows up
    /// as a column on every row once fill is applied. Used to stamp the
    /// participant id onto records.
    pub fn with_inject(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.inject = Some((key.into(), value));
        self
    }

    fn separator(&self) -> &str {
        self.separator.as_deref().unwrap_or("_")
    }
}

/// Flattens a JSON payload into a columnar record. Pure: the input value
/// is never mutated.
///
/// - nested object keys are joined with the separator
///   (`object.values[].timestamp` becomes `object_values_timestamp`)
/// - a list of objects is transposed into one column per distinct key,
///   with missing keys padded by nulls so all columns share the list's
///   length
/// - a list of scalars (or mixed element types) is kept as-is
/// - a bare scalar becomes a one-element column
/// - an empty list becomes an empty column
pub fn flatten(payload: &serde_json::Value, options: &FlattenOptions) -> FlatRecord {
    let mut record = FlatRecord::new();
    let injected;
    let root = match (&options.inject, payload.as_object()) {
        (Some((key, value)), Some(map)) => {
            let mut map = map.clone();
            map.insert(key.clone(), value.clone());
            injected = serde_json::Value::Object(map);
            &injected
        }
        _ => payload,
    };

    flatten_into(&mut record, root, "", options.separator());
    if options.fill {
        record.fill();
    }
    record
}

fn flatten_into(record: &mut FlatRecord, value: &serde_json::Value, prefix: &str, separator: &str) {
    match value {
        serde_json::Value::Object(map) => {
            for (key, child) in map {
                let path = join(prefix, key, separator);
                flatten_into(record, child, &path, separator);
            }
        }
        serde_json::Value::Array(items) => {
            if !items.is_empty() && items.iter().all(serde_json::Value::is_object) {
                transpose(record, items, prefix, separator);
            } else {
                record.insert(prefix, items.iter().map(Value::from_json).collect());
            }
        }
        scalar => {
            record.insert(prefix, vec![Value::from_json(scalar)]);
        }
    }
}

/// One column per distinct key across all list elements, in first-seen
/// order, each of the list's length. Element values are taken verbatim;
/// nested structure inside a transposed list is not flattened further.
fn transpose(record: &mut FlatRecord, items: &[serde_json::Value], prefix: &str, separator: &str) {
    let mut keys: Vec<&String> = Vec::new();
    for item in items {
        if let Some(map) = item.as_object() {
            for key in map.keys() {
                if !keys.contains(&key) {
                    keys.push(key);
                }
            }
        }
    }

    for key in keys {
        let column: Vec<Value> = items
            .iter()
            .map(|item| {
                item.as_object()
                    .and_then(|map| map.get(key))
                    .map(Value::from_json)
                    .unwrap_or(Value::Null)
            })
            .collect();
        record.insert(join(prefix, key, separator), column);
    }
}

fn join(prefix: &str, key: &str, separator: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}{separator}{key}")
    }
}
