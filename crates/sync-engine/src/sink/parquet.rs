use crate::sink::{RecordSink, SinkError, UploadBatch};
use arrow::array::{ArrayRef, BooleanArray, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use model::value::Value;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::metadata::KeyValue;
use parquet::file::properties::WriterProperties;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Writes each batch as one snappy-compressed parquet part file under
/// `<root>/<database>/<table>/pid=<participant>/part-<uuid>.parquet`.
/// Parts are append-only, re-running a day adds new files rather than
/// rewriting old ones.
pub struct ParquetDataset {
    root: PathBuf,
    database: String,
}

impl ParquetDataset {
    pub fn new(root: impl Into<PathBuf>, database: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            database: database.into(),
        }
    }

    fn partition_dir(&self, table: &str, partition_key: &str) -> PathBuf {
        self.root
            .join(&self.database)
            .join(table)
            .join(format!("pid={partition_key}"))
    }

    fn write_part(&self, batch: &UploadBatch) -> Result<PathBuf, SinkError> {
        let rows = batch.records.row_count();
        if rows == 0 {
            return Err(SinkError::EmptyBatch);
        }

        let mut fields = Vec::new();
        let mut arrays: Vec<ArrayRef> = Vec::new();
        for (name, values) in batch.records.columns() {
            let data_type = column_type(values);
            fields.push(Field::new(name.clone(), data_type.clone(), true));
            arrays.push(build_array(&data_type, values));
        }
        let schema = Arc::new(Schema::new(fields));
        let record_batch = RecordBatch::try_new(schema.clone(), arrays)?;

        let dir = self.partition_dir(&batch.table, &batch.partition_key);
        fs::create_dir_all(&dir)?;
        let path = dir.join(format!("part-{}.parquet", Uuid::new_v4()));

        let properties = WriterProperties::builder()
            .set_compression(Compression::SNAPPY)
            .set_key_value_metadata(Some(batch_metadata(batch)))
            .build();
        let file = fs::File::create(&path)?;
        let mut writer = ArrowWriter::try_new(file, schema, Some(properties))?;
        writer.write(&record_batch)?;
        writer.close()?;
        Ok(path)
    }
}

#[async_trait]
impl RecordSink for ParquetDataset {
    async fn upload(&self, batch: &UploadBatch) -> Result<(), SinkError> {
        let path = self.write_part(batch)?;
        info!(
            table = %batch.table,
            partition = %batch.partition_key,
            rows = batch.records.row_count(),
            path = %path.display(),
            "wrote parquet part"
        );
        Ok(())
    }
}

fn batch_metadata(batch: &UploadBatch) -> Vec<KeyValue> {
    let meta = &batch.metadata;
    [
        ("participant_id", meta.participant_id.clone()),
        ("participant_email", meta.participant_email.clone()),
        ("data_date", meta.data_date.to_string()),
        ("metric_type", meta.metric_type.clone()),
        ("upload_timestamp", meta.upload_timestamp.clone()),
        ("record_count", meta.record_count.to_string()),
    ]
    .into_iter()
    .map(|(key, value)| KeyValue {
        key: key.to_string(),
        value: Some(value),
    })
    .collect()
}

/// Picks the narrowest arrow type that holds every non-null cell of a
/// column, falling back to strings for mixed or all-null columns.
fn column_type(values: &[Value]) -> DataType {
    let mut ints = false;
    let mut floats = false;
    let mut booleans = false;
    let mut other = false;
    for value in values {
        match value {
            Value::Null => {}
            Value::Int(_) => ints = true,
            Value::Float(_) => floats = true,
            Value::Boolean(_) => booleans = true,
            _ => other = true,
        }
    }
    if other || (booleans && (ints || floats)) {
        DataType::Utf8
    } else if booleans {
        DataType::Boolean
    } else if floats {
        DataType::Float64
    } else if ints {
        DataType::Int64
    } else {
        DataType::Utf8
    }
}

fn build_array(data_type: &DataType, values: &[Value]) -> ArrayRef {
    match data_type {
        DataType::Int64 => {
            let cells: Vec<Option<i64>> = values.iter().map(|v| v.as_i64()).collect();
            Arc::new(Int64Array::from(cells))
        }
        DataType::Float64 => {
            let cells: Vec<Option<f64>> = values.iter().map(|v| v.as_f64()).collect();
            Arc::new(Float64Array::from(cells))
        }
        DataType::Boolean => {
            let cells: Vec<Option<bool>> = values.iter().map(|v| v.as_bool()).collect();
            Arc::new(BooleanArray::from(cells))
        }
        _ => {
            let cells: Vec<Option<String>> = values
                .iter()
                .map(|v| (!v.is_null()).then(|| v.to_string()))
                .collect();
            Arc::new(StringArray::from(cells))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::UploadMetadata;
    use chrono::NaiveDate;
    use model::records::FlatRecord;
    use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
    use std::path::Path;
    use tempfile::tempdir;

    fn part_files(dir: &Path) -> Vec<PathBuf> {
        fs::read_dir(dir)
            .into_iter()
            .flatten()
            .flatten()
            .map(|entry| entry.path())
            .collect()
    }

    fn sample_batch() -> UploadBatch {
        let mut records = FlatRecord::new();
        records.insert("pid", vec![Value::from("p-1"), Value::from("p-1")]);
        records.insert(
            "object_values_timestamp",
            vec![Value::Int(1_735_711_200), Value::Int(1_735_711_260)],
        );
        records.insert("object_values_value", vec![Value::Float(36.2), Value::Null]);
        records.insert("object_flagged", vec![Value::Boolean(false), Value::Boolean(true)]);
        UploadBatch {
            table: "temp".to_string(),
            partition_key: "p-1".to_string(),
            records,
            metadata: UploadMetadata {
                participant_id: "p-1".to_string(),
                participant_email: "p1@example.org".to_string(),
                data_date: NaiveDate::from_ymd_opt(2025, 9, 2).unwrap(),
                metric_type: "temp".to_string(),
                upload_timestamp: "2025-09-02T06:50:00-07:00".to_string(),
                record_count: 2,
            },
        }
    }

    #[tokio::test]
    async fn writes_a_readable_part_file_with_metadata() {
        let dir = tempdir().unwrap();
        let dataset = ParquetDataset::new(dir.path(), "wearables");
        let batch = sample_batch();
        dataset.upload(&batch).await.unwrap();

        let partition = dir.path().join("wearables/temp/pid=p-1");
        let parts = part_files(&partition);
        assert_eq!(parts.len(), 1);

        let file = fs::File::open(&parts[0]).unwrap();
        let builder = ParquetRecordBatchReaderBuilder::try_new(file).unwrap();
        let key_values = builder
            .metadata()
            .file_metadata()
            .key_value_metadata()
            .unwrap()
            .clone();
        assert!(key_values
            .iter()
            .any(|kv| kv.key == "metric_type" && kv.value.as_deref() == Some("temp")));
        assert!(key_values
            .iter()
            .any(|kv| kv.key == "record_count" && kv.value.as_deref() == Some("2")));

        let mut reader = builder.build().unwrap();
        let read = reader.next().unwrap().unwrap();
        assert_eq!(read.num_rows(), 2);
        assert_eq!(read.num_columns(), 4);
    }

    #[tokio::test]
    async fn second_upload_appends_a_new_part() {
        let dir = tempdir().unwrap();
        let dataset = ParquetDataset::new(dir.path(), "wearables");
        let batch = sample_batch();
        dataset.upload(&batch).await.unwrap();
        dataset.upload(&batch).await.unwrap();

        let partition = dir.path().join("wearables/temp/pid=p-1");
        assert_eq!(part_files(&partition).len(), 2);
    }

    #[tokio::test]
    async fn empty_batches_are_rejected() {
        let dir = tempdir().unwrap();
        let dataset = ParquetDataset::new(dir.path(), "wearables");
        let mut batch = sample_batch();
        batch.records = FlatRecord::new();
        let error = dataset.upload(&batch).await.unwrap_err();
        assert!(matches!(error, SinkError::EmptyBatch));
    }

    #[test]
    fn column_types_follow_cell_contents() {
        assert_eq!(
            column_type(&[Value::Int(1), Value::Null, Value::Int(3)]),
            DataType::Int64
        );
        assert_eq!(
            column_type(&[Value::Int(1), Value::Float(2.5)]),
            DataType::Float64
        );
        assert_eq!(
            column_type(&[Value::Boolean(true), Value::Null]),
            DataType::Boolean
        );
        assert_eq!(
            column_type(&[Value::Int(1), Value::from("x")]),
            DataType::Utf8
        );
        assert_eq!(column_type(&[Value::Null, Value::Null]), DataType::Utf8);
    }
}
