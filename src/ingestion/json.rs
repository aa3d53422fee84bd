//! JSON parsing, shape checks and loading.
//!
//! Supported inputs:
//! - A JSON array of flat objects: `[{"a":1}, {"a":2}]`
//! - A single flat object: `{"a": 1, "tags": ["x", "y"]}`
//!
//! A flat object's values are scalars or lists of scalars. Nested objects are rejected.

use serde::Serialize;
use serde_json::Map;

use crate::error::{IntakeError, IntakeResult};
use crate::types::{FileKind, Record, RecordSet, Value};

/// Top-level shape of a valid JSON document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum JsonDetails {
    /// Array of objects with `items` elements.
    List { items: usize },
    /// Single object with `keys` keys.
    Dict { keys: usize },
}

/// Parse `text` as a single JSON value.
pub fn parse_json(text: &str) -> IntakeResult<serde_json::Value> {
    serde_json::from_str(text).map_err(|e| {
        let what = match e.classify() {
            serde_json::error::Category::Eof => "unexpected end of input",
            _ => "invalid JSON",
        };
        IntakeError::Unparsable {
            kind: FileKind::Json,
            message: format!("{what} at line {}, column {}", e.line(), e.column()),
        }
    })
}

/// Check emptiness and shape of a parsed document.
pub fn classify(value: &serde_json::Value) -> IntakeResult<JsonDetails> {
    match value {
        serde_json::Value::Array(items) => {
            if items.is_empty() {
                return Err(IntakeError::Empty {
                    kind: FileKind::Json,
                });
            }
            for (idx, item) in items.iter().enumerate() {
                let serde_json::Value::Object(map) = item else {
                    return Err(IntakeError::UnsupportedStructure(format!(
                        "element {idx} is not an object; expected a list of objects"
                    )));
                };
                check_flat(map)
                    .map_err(|e| IntakeError::UnsupportedStructure(format!("element {idx}: {e}")))?;
            }
            Ok(JsonDetails::List { items: items.len() })
        }
        serde_json::Value::Object(map) => {
            if map.is_empty() {
                return Err(IntakeError::Empty {
                    kind: FileKind::Json,
                });
            }
            check_flat(map).map_err(IntakeError::UnsupportedStructure)?;
            Ok(JsonDetails::Dict { keys: map.len() })
        }
        _ => Err(IntakeError::UnsupportedStructure(
            "top-level value must be an object or a list of objects".to_string(),
        )),
    }
}

fn check_flat(map: &Map<String, serde_json::Value>) -> Result<(), String> {
    for (key, value) in map {
        match value {
            serde_json::Value::Object(_) => {
                return Err(format!("field '{key}' holds a nested object"));
            }
            serde_json::Value::Array(items) if items.iter().any(is_compound) => {
                return Err(format!("field '{key}' holds a list of objects or lists"));
            }
            _ => {}
        }
    }
    Ok(())
}

fn is_compound(value: &serde_json::Value) -> bool {
    matches!(
        value,
        serde_json::Value::Object(_) | serde_json::Value::Array(_)
    )
}

/// Load JSON text into a [`RecordSet`].
pub fn load_json(text: &str) -> IntakeResult<RecordSet> {
    match parse_json(text)? {
        serde_json::Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(idx, item)| match item {
                serde_json::Value::Object(map) => to_record(map),
                _ => Err(IntakeError::UnsupportedStructure(format!(
                    "element {idx} is not an object; expected a list of objects"
                ))),
            })
            .collect::<IntakeResult<Vec<_>>>()
            .map(RecordSet::List),
        serde_json::Value::Object(map) => to_record(&map).map(RecordSet::Object),
        _ => Err(IntakeError::UnsupportedStructure(
            "top-level value must be an object or a list of objects".to_string(),
        )),
    }
}

fn to_record(map: &Map<String, serde_json::Value>) -> IntakeResult<Record> {
    let fields = map
        .iter()
        .map(|(key, value)| {
            to_value(value)
                .map(|v| (key.clone(), v))
                .ok_or_else(|| IntakeError::UnsupportedStructure(format!("field '{key}' is nested")))
        })
        .collect::<IntakeResult<Vec<_>>>()?;
    Ok(Record::new(fields))
}

/// Convert a scalar or a list of scalars; `None` for anything nested.
fn to_value(value: &serde_json::Value) -> Option<Value> {
    match value {
        serde_json::Value::Array(items) => items
            .iter()
            .map(to_scalar)
            .collect::<Option<Vec<_>>>()
            .map(Value::List),
        other => to_scalar(other),
    }
}

fn to_scalar(value: &serde_json::Value) -> Option<Value> {
    match value {
        serde_json::Value::Null => Some(Value::Null),
        serde_json::Value::Bool(b) => Some(Value::Bool(*b)),
        serde_json::Value::Number(n) => Some(if let Some(i) = n.as_i64() {
            Value::Int64(i)
        } else if let Some(u) = n.as_u64() {
            Value::UInt64(u)
        } else {
            Value::Float64(n.as_f64().unwrap_or(f64::NAN))
        }),
        serde_json::Value::String(s) => Some(Value::Utf8(s.clone())),
        serde_json::Value::Array(_) | serde_json::Value::Object(_) => None,
    }
}
