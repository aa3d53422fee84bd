//! CSV parsing and loading.
//!
//! Rules:
//!
//! - The first record is the header.
//! - Every record must have as many fields as the header.
//! - Whitespace-only lines are skipped, the same lines delimiter detection ignores.
//! - Column types are inferred once per column from its non-missing cells.

use crate::error::{IntakeError, IntakeResult};
use crate::types::{DataType, Field, FileKind, LoadedTable, Schema, Value};

use super::delimiter::Delimiter;

/// Cell spellings that load as [`Value::Null`].
const MISSING_MARKERS: &[&str] = &[
    "NA", "N/A", "n/a", "NaN", "nan", "NULL", "null", "None", "<NA>", "#N/A",
];

/// Record/column counts of a fully parsed CSV document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsvShape {
    /// Data records after the header.
    pub rows: usize,
    pub columns: usize,
}

fn reader(text: &str, delimiter: Delimiter) -> csv::Reader<&[u8]> {
    // Field counts are checked in `data_records` so whitespace-only lines can be skipped first.
    csv::ReaderBuilder::new()
        .delimiter(delimiter.as_byte())
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes())
}

/// Data records after the header, minus whitespace-only lines.
///
/// Every remaining record must have exactly `columns` fields.
fn data_records<R: std::io::Read>(
    rdr: &mut csv::Reader<R>,
    columns: usize,
) -> impl Iterator<Item = IntakeResult<csv::StringRecord>> + '_ {
    rdr.records().filter_map(move |record| match record {
        Err(err) => Some(Err(unparsable(err))),
        Ok(record) if is_blank_line(&record) => None,
        Ok(record) if record.len() != columns => Some(Err(ragged(&record, columns))),
        Ok(record) => Some(Ok(record)),
    })
}

fn is_blank_line(record: &csv::StringRecord) -> bool {
    record.len() == 1 && record.get(0).is_some_and(|f| f.trim().is_empty())
}

/// Parse the whole document and count records without keeping them.
pub fn scan_csv(text: &str, delimiter: Delimiter) -> IntakeResult<CsvShape> {
    let mut rdr = reader(text, delimiter);
    let columns = rdr.headers().map_err(unparsable)?.len();

    let mut rows = 0;
    for record in data_records(&mut rdr, columns) {
        record?;
        rows += 1;
    }
    Ok(CsvShape { rows, columns })
}

/// Load CSV text into a [`LoadedTable`].
pub fn load_csv(text: &str, delimiter: Delimiter) -> IntakeResult<LoadedTable> {
    let mut rdr = reader(text, delimiter);
    let headers = dedupe_headers(rdr.headers().map_err(unparsable)?.iter());

    let records = data_records(&mut rdr, headers.len()).collect::<IntakeResult<Vec<_>>>()?;

    let fields: Vec<Field> = headers
        .into_iter()
        .enumerate()
        .map(|(idx, name)| {
            let data_type = infer_column_type(records.iter().map(|r| r.get(idx).unwrap_or("")));
            Field::new(name, data_type)
        })
        .collect();

    let rows = records
        .iter()
        .map(|record| {
            fields
                .iter()
                .enumerate()
                .map(|(idx, field)| convert_cell(record.get(idx).unwrap_or(""), field.data_type))
                .collect()
        })
        .collect();

    Ok(LoadedTable::new(Schema::new(fields), rows))
}

/// Pick a single type tag for a column.
///
/// Missing cells are skipped. A column with no remaining cells is [`DataType::Text`].
pub fn infer_column_type<'a>(values: impl IntoIterator<Item = &'a str>) -> DataType {
    let mut seen = false;
    let mut all_int = true;
    let mut all_num = true;
    let mut all_bool = true;

    for raw in values {
        let v = raw.trim();
        if is_missing(v) {
            continue;
        }
        seen = true;

        let int = is_integer(v);
        all_int &= int;
        all_num &= int || parse_float(v).is_some();
        all_bool &= parse_bool(v).is_some();
        if !all_num && !all_bool {
            return DataType::Text;
        }
    }

    match (seen, all_int, all_num, all_bool) {
        (false, ..) => DataType::Text,
        (true, true, _, _) => DataType::Integer,
        (true, false, true, _) => DataType::Float,
        (true, false, false, true) => DataType::Boolean,
        _ => DataType::Text,
    }
}

fn convert_cell(raw: &str, data_type: DataType) -> Value {
    let trimmed = raw.trim();
    if is_missing(trimmed) {
        return Value::Null;
    }

    match data_type {
        DataType::Integer => match (trimmed.parse::<i64>(), trimmed.parse::<u64>()) {
            (Ok(n), _) => Value::Int64(n),
            (_, Ok(n)) => Value::UInt64(n),
            _ => Value::BigNumber(trimmed.trim_start_matches('+').to_owned()),
        },
        DataType::Float => parse_float(trimmed)
            .map(Value::Float64)
            .unwrap_or_else(|| Value::Utf8(raw.to_owned())),
        DataType::Boolean => parse_bool(trimmed)
            .map(Value::Bool)
            .unwrap_or_else(|| Value::Utf8(raw.to_owned())),
        DataType::Text => Value::Utf8(raw.to_owned()),
    }
}

fn is_missing(trimmed: &str) -> bool {
    trimmed.is_empty() || MISSING_MARKERS.contains(&trimmed)
}

fn is_integer(s: &str) -> bool {
    let digits = s.strip_prefix(['+', '-']).unwrap_or(s);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

fn parse_float(s: &str) -> Option<f64> {
    s.parse::<f64>().ok().filter(|f| f.is_finite())
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.to_ascii_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

/// Make header names unique: blanks become `Unnamed: <idx>`, repeats get `.1`, `.2`, ...
fn dedupe_headers<'a>(raw: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for (idx, name) in raw.enumerate() {
        let base = if name.trim().is_empty() {
            format!("Unnamed: {idx}")
        } else {
            name.to_owned()
        };

        let mut candidate = base.clone();
        let mut n = 1;
        while out.contains(&candidate) {
            candidate = format!("{base}.{n}");
            n += 1;
        }
        out.push(candidate);
    }
    out
}

fn ragged(record: &csv::StringRecord, expected: usize) -> IntakeError {
    let len = record.len();
    let message = match record.position() {
        Some(p) => format!("line {} has {len} fields, expected {expected}", p.line()),
        None => format!("a record has {len} fields, expected {expected}"),
    };
    IntakeError::Unparsable {
        kind: FileKind::Csv,
        message,
    }
}

fn unparsable(err: csv::Error) -> IntakeError {
    let message = match err.position() {
        Some(p) => format!("malformed record at line {}", p.line()),
        None => "malformed csv".to_string(),
    };
    IntakeError::Unparsable {
        kind: FileKind::Csv,
        message,
    }
}
