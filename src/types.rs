//! Core data model types for intake.
//!
//! An upload arrives as a [`RawUpload`], is loaded either into a [`LoadedTable`] (CSV) or a
//! [`RecordSet`] (JSON), and both shapes carry scalar [`Value`]s.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The two supported upload kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Csv,
    Json,
}

impl FileKind {
    /// Parse a kind from a file extension (case-insensitive, without the dot).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "csv" => Some(Self::Csv),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    /// Infer the kind from the text after the filename's last dot.
    ///
    /// A bare `.csv` counts as a CSV upload even though paths treat it as a dotfile.
    pub fn from_filename(filename: &str) -> Option<Self> {
        filename
            .rsplit_once('.')
            .and_then(|(_, ext)| Self::from_extension(ext))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FileKind::Csv => "csv",
            FileKind::Json => "json",
        }
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named byte buffer as received from a client.
///
/// Consumed once by [`crate::ingestion::ingest`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawUpload {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub content_type: Option<String>,
}

impl RawUpload {
    pub fn new(filename: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
            filename: filename.into(),
            content_type: None,
        }
    }

    /// Attach the declared content type.
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Byte length of the upload.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Column type tag inferred at load time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    /// Whole numbers.
    Integer,
    /// Numbers with a fractional part (or a mix of integers and floats).
    Float,
    /// `true` / `false`.
    Boolean,
    /// Anything else.
    Text,
}

impl DataType {
    pub fn label(&self) -> &'static str {
        match self {
            DataType::Integer => "integer",
            DataType::Float => "float",
            DataType::Boolean => "boolean",
            DataType::Text => "text",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A single named, typed column in a [`Schema`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub data_type: DataType,
}

impl Field {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

/// Ordered column list of a [`LoadedTable`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Schema {
    pub fields: Vec<Field>,
}

impl Schema {
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    /// Iterate column names in order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Returns the index of a column by name, if present.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// A loaded cell or record value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Missing/empty value.
    Null,
    Bool(bool),
    Int64(i64),
    Float64(f64),
    /// An integer above `i64::MAX` that still fits in a `u64`.
    UInt64(u64),
    /// An integer outside both the `i64` and `u64` ranges, kept as its exact decimal text.
    BigNumber(String),
    Utf8(String),
    /// A list of scalars (JSON only).
    List(Vec<Value>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

/// In-memory CSV table.
///
/// Rows are stored as `Vec<Vec<Value>>` in the same order as the [`Schema`] fields, so every row
/// carries exactly the header's column set.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedTable {
    pub schema: Schema,
    pub rows: Vec<Vec<Value>>,
}

impl LoadedTable {
    pub fn new(schema: Schema, rows: Vec<Vec<Value>>) -> Self {
        Self { schema, rows }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.schema.len()
    }

    /// Column names in header order.
    pub fn column_names(&self) -> Vec<String> {
        self.schema.field_names().map(str::to_owned).collect()
    }

    /// Look up a cell by row index and column name.
    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.schema.index_of(column)?;
        self.rows.get(row).and_then(|r| r.get(idx))
    }
}

/// A flat JSON mapping with keys in document order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    pub fields: Vec<(String, Value)>,
}

impl Record {
    pub fn new(fields: Vec<(String, Value)>) -> Self {
        Self { fields }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Loaded JSON content.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordSet {
    /// A top-level array of flat objects.
    List(Vec<Record>),
    /// A single top-level flat object.
    Object(Record),
}

/// Output of the loader for either kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Loaded {
    Table(LoadedTable),
    Records(RecordSet),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_from_filename_is_case_insensitive() {
        assert_eq!(FileKind::from_filename("Report.CSV"), Some(FileKind::Csv));
        assert_eq!(FileKind::from_filename("data.Json"), Some(FileKind::Json));
        assert_eq!(FileKind::from_filename("archive.tar.gz"), None);
        assert_eq!(FileKind::from_filename("no_extension"), None);
    }

    #[test]
    fn kind_from_bare_extension_filename() {
        assert_eq!(FileKind::from_filename(".csv"), Some(FileKind::Csv));
        assert_eq!(FileKind::from_filename(".JSON"), Some(FileKind::Json));
        assert_eq!(FileKind::from_filename("csv"), None);
        assert_eq!(FileKind::from_filename("report.csv.bak"), None);
    }

    #[test]
    fn table_lookup_by_column_name() {
        let table = LoadedTable::new(
            Schema::new(vec![
                Field::new("id", DataType::Integer),
                Field::new("name", DataType::Text),
            ]),
            vec![vec![Value::Int64(1), Value::Utf8("Ada".to_string())]],
        );
        assert_eq!(table.get(0, "name"), Some(&Value::Utf8("Ada".to_string())));
        assert_eq!(table.get(0, "missing"), None);
        assert_eq!(table.get(1, "id"), None);
        assert_eq!(table.column_names(), vec!["id", "name"]);
    }
}
