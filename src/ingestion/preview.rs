//! Bounded previews and full-dataset metadata.
//!
//! The preview is a prefix of the loaded rows; the metadata always describes the whole upload.
//! Every value passes through [`normalize`] on the way out so the preview only holds
//! JSON-native values.

use std::collections::HashSet;
use std::mem::size_of;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::config::IntakeLimits;
use crate::types::{DataType, Loaded, LoadedTable, Record, RecordSet, Value};

/// Top-level JSON layout, reported in metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StructureType {
    List,
    Dict,
}

/// Ordered column name to type label mapping.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ColumnTypes(pub Vec<(String, DataType)>);

impl ColumnTypes {
    pub fn get(&self, column: &str) -> Option<DataType> {
        self.0.iter().find(|(name, _)| name == column).map(|(_, t)| *t)
    }
}

impl Serialize for ColumnTypes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, data_type) in &self.0 {
            map.serialize_entry(name, data_type.label())?;
        }
        map.end()
    }
}

/// Summary of the full dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    pub total_rows: usize,
    pub total_columns: usize,
    pub columns: Vec<String>,
    /// CSV only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dtypes: Option<ColumnTypes>,
    /// Approximate in-memory size of the loaded data, in KiB.
    pub memory_usage: f64,
    /// JSON only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub structure_type: Option<StructureType>,
}

/// Preview rows plus metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Preview {
    /// An array of row objects, or a single object for JSON object uploads.
    pub data: serde_json::Value,
    pub metadata: Metadata,
}

impl Preview {
    /// Number of rows/elements in the preview (1 for a JSON object).
    pub fn len(&self) -> usize {
        match &self.data {
            serde_json::Value::Array(items) => items.len(),
            _ => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Map a loaded value to a JSON-native one.
///
/// Integers beyond `u64` become their exact decimal string; non-finite floats become `null`.
pub fn normalize(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Int64(n) => serde_json::Value::from(*n),
        Value::UInt64(n) => serde_json::Value::from(*n),
        Value::Float64(f) => serde_json::Number::from_f64(*f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::BigNumber(s) | Value::Utf8(s) => serde_json::Value::String(s.clone()),
        Value::List(items) => serde_json::Value::Array(items.iter().map(normalize).collect()),
    }
}

/// Build the preview and metadata for loaded content.
pub fn summarize(loaded: &Loaded, limits: &IntakeLimits) -> Preview {
    match loaded {
        Loaded::Table(table) => summarize_table(table, limits.csv_preview_rows),
        Loaded::Records(RecordSet::List(records)) => {
            summarize_records(records, limits.json_preview_items)
        }
        Loaded::Records(RecordSet::Object(record)) => summarize_object(record),
    }
}

fn summarize_table(table: &LoadedTable, cap: usize) -> Preview {
    let names = table.column_names();
    let data = table
        .rows
        .iter()
        .take(cap)
        .map(|row| {
            let obj = names
                .iter()
                .zip(row)
                .map(|(name, value)| (name.clone(), normalize(value)))
                .collect::<serde_json::Map<_, _>>();
            serde_json::Value::Object(obj)
        })
        .collect();

    let dtypes = table
        .schema
        .fields
        .iter()
        .map(|f| (f.name.clone(), f.data_type))
        .collect();

    let cells: usize = table.rows.iter().flatten().map(value_size).sum();
    let headers: usize = names.iter().map(|n| string_size(n)).sum();
    let index = table.row_count() * size_of::<u64>();

    Preview {
        data: serde_json::Value::Array(data),
        metadata: Metadata {
            total_rows: table.row_count(),
            total_columns: table.column_count(),
            columns: names,
            dtypes: Some(ColumnTypes(dtypes)),
            memory_usage: kib(cells + headers + index),
            structure_type: None,
        },
    }
}

fn summarize_records(records: &[Record], cap: usize) -> Preview {
    let mut seen = HashSet::new();
    let mut columns = Vec::new();
    for key in records.iter().flat_map(Record::keys) {
        if seen.insert(key) {
            columns.push(key.to_owned());
        }
    }

    let data = records
        .iter()
        .take(cap)
        .map(|r| serde_json::Value::Object(record_to_json(r)))
        .collect();

    let bytes: usize = records.iter().map(record_size).sum();

    Preview {
        data: serde_json::Value::Array(data),
        metadata: Metadata {
            total_rows: records.len(),
            total_columns: columns.len(),
            columns,
            dtypes: None,
            memory_usage: kib(bytes),
            structure_type: Some(StructureType::List),
        },
    }
}

fn summarize_object(record: &Record) -> Preview {
    Preview {
        data: serde_json::Value::Object(record_to_json(record)),
        metadata: Metadata {
            total_rows: 1,
            total_columns: record.len(),
            columns: record.keys().map(str::to_owned).collect(),
            dtypes: None,
            memory_usage: kib(record_size(record)),
            structure_type: Some(StructureType::Dict),
        },
    }
}

fn record_to_json(record: &Record) -> serde_json::Map<String, serde_json::Value> {
    record
        .fields
        .iter()
        .map(|(k, v)| (k.clone(), normalize(v)))
        .collect()
}

fn record_size(record: &Record) -> usize {
    record
        .fields
        .iter()
        .map(|(k, v)| string_size(k) + value_size(v))
        .sum()
}

fn value_size(value: &Value) -> usize {
    match value {
        Value::Null | Value::Int64(_) | Value::UInt64(_) | Value::Float64(_) => size_of::<u64>(),
        Value::Bool(_) => size_of::<bool>(),
        Value::BigNumber(s) | Value::Utf8(s) => string_size(s),
        Value::List(items) => size_of::<Vec<Value>>() + items.iter().map(value_size).sum::<usize>(),
    }
}

fn string_size(s: &str) -> usize {
    size_of::<String>() + s.len()
}

fn kib(bytes: usize) -> f64 {
    bytes as f64 / 1024.0
}
