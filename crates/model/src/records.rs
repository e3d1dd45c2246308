use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Columnar record produced by the flattener: one named column per flat
/// key, each holding the ordered cells for that key. Column order is the
/// sorted key order, which keeps sink schemas deterministic.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FlatRecord {
    columns: BTreeMap<String, Vec<Value>>,
}

impl FlatRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, cells: Vec<Value>) {
        self.columns.insert(name.into(), cells);
    }

    pub fn get(&self, name: &str) -> Option<&Vec<Value>> {
        self.columns.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    pub fn columns(&self) -> impl Iterator<Item = (&String, &Vec<Value>)> {
        self.columns.iter()
    }

    pub fn column_names(&self) -> impl Iterator<Item = &String> {
        self.columns.keys()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Row count of the record seen as a table: the longest column.
    pub fn row_count(&self) -> usize {
        self.columns.values().map(Vec::len).max().unwrap_or(0)
    }

    /// True when every non-empty column has the same length.
    pub fn is_uniform(&self) -> bool {
        let rows = self.row_count();
        self.columns
            .values()
            .all(|c| c.is_empty() || c.len() == rows)
    }

    /// Stretches columns to the longest column's length so the record can
    /// be treated as a uniform table: length-1 columns are broadcast,
    /// shorter columns are padded with nulls, empty columns stay empty.
    pub fn fill(&mut self) {
        let rows = self.row_count();
        for cells in self.columns.values_mut() {
            match cells.len() {
                0 => {}
                1 if rows > 1 => {
                    let cell = cells[0].clone();
                    cells.resize(rows, cell);
                }
                n if n < rows => cells.resize(rows, Value::Null),
                _ => {}
            }
        }
    }

    /// Keeps only the rows whose cell in `column` is a number strictly
    /// greater than `epoch`, and returns the surviving row count. Columns
    /// shorter than the filter column (including empty ones) are left in
    /// place. Absent filter column means nothing is dropped.
    pub fn retain_rows_after(&mut self, column: &str, epoch: i64) -> usize {
        let Some(cells) = self.columns.get(column) else {
            return self.row_count();
        };
        let keep: Vec<bool> = cells
            .iter()
            .map(|c| c.as_f64().is_some_and(|v| v > epoch as f64))
            .collect();
        for cells in self.columns.values_mut() {
            if cells.len() == keep.len() {
                let mut mask = keep.iter();
                cells.retain(|_| *mask.next().unwrap_or(&true));
            }
        }
        self.row_count()
    }

    /// Drops columns that carry no cells. A record whose lists were all
    /// empty in the vendor payload shrinks to nothing and is skipped.
    pub fn drop_empty_columns(&mut self) {
        self.columns.retain(|_, cells| !cells.is_empty());
    }

    pub fn to_json_map(&self) -> serde_json::Map<String, serde_json::Value> {
        self.columns
            .iter()
            .map(|(name, cells)| {
                let array = cells.iter().map(Value::to_json).collect();
                (name.clone(), serde_json::Value::Array(array))
            })
            .collect()
    }

    pub fn from_json_map(map: &serde_json::Map<String, serde_json::Value>) -> Self {
        let mut record = FlatRecord::new();
        for (name, value) in map {
            let cells = match value {
                serde_json::Value::Array(items) => {
                    items.iter().map(Value::from_json).collect()
                }
                other => vec![Value::from_json(other)],
            };
            record.insert(name.clone(), cells);
        }
        record
    }
}
