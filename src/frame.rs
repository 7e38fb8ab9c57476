//! Tabular frames returned to the dashboard.
//!
//! A [`Frame`] is an ordered list of named, typed columns. Frames are built
//! from any uniform list of serialisable records: every record becomes one
//! row and every distinct (flattened) field becomes one column.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::error::SentryError;

/// Largest integer magnitude an `f64` holds exactly.
const MAX_EXACT_INT: u64 = 1 << 53;

/// Whether `value` is a number that survives conversion to `f64` unchanged.
fn is_exact_number(value: &Value) -> bool {
    let Value::Number(n) = value else {
        return false;
    };
    n.is_f64()
        || n.as_u64().is_some_and(|u| u <= MAX_EXACT_INT)
        || n.as_i64().is_some_and(|i| i.unsigned_abs() <= MAX_EXACT_INT)
}

/// Values of one column. Cells are nullable.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "values", rename_all = "lowercase")]
pub enum FieldValues {
    Bool(Vec<Option<bool>>),
    Number(Vec<Option<f64>>),
    String(Vec<Option<String>>),
    Time(Vec<Option<DateTime<Utc>>>),
    Json(Vec<Option<Value>>),
}

impl FieldValues {
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Bool(v) => v.len(),
            Self::Number(v) => v.len(),
            Self::String(v) => v.len(),
            Self::Time(v) => v.len(),
            Self::Json(v) => v.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Pick the narrowest column type able to hold every non-null cell.
    ///
    /// Integers too large for an `f64` keep the column as JSON.
    fn infer(cells: Vec<Value>) -> Self {
        let present = || cells.iter().filter(|c| !c.is_null());
        if present().all(Value::is_boolean) && present().next().is_some() {
            return Self::Bool(cells.iter().map(Value::as_bool).collect());
        }
        if present().all(is_exact_number) && present().next().is_some() {
            return Self::Number(cells.iter().map(Value::as_f64).collect());
        }
        if present().all(Value::is_string) {
            let times: Option<Vec<Option<DateTime<Utc>>>> = cells
                .iter()
                .map(|c| match c {
                    Value::String(s) => DateTime::parse_from_rfc3339(s)
                        .ok()
                        .map(|t| Some(t.with_timezone(&Utc))),
                    _ => Some(None),
                })
                .collect();
            return match times {
                Some(times) if present().next().is_some() => Self::Time(times),
                _ => Self::String(
                    cells
                        .into_iter()
                        .map(|c| match c {
                            Value::String(s) => Some(s),
                            _ => None,
                        })
                        .collect(),
                ),
            };
        }
        Self::Json(
            cells
                .into_iter()
                .map(|c| if c.is_null() { None } else { Some(c) })
                .collect(),
        )
    }
}

/// A named column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Field {
    pub name: String,
    #[serde(flatten)]
    pub values: FieldValues,
}

/// Provenance attached to a frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FrameMeta {
    /// Path and query string sent to the remote API.
    #[serde(rename = "executedQueryString")]
    pub executed_query_string: String,
    /// Base URL the query was sent to.
    #[serde(rename = "sourceURL", skip_serializing_if = "String::is_empty")]
    pub source_url: String,
    /// Echo of the decoded query.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Frame {
    pub name: String,
    pub ref_id: String,
    pub fields: Vec<Field>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<FrameMeta>,
}

/// Flatten `object` into `(dotted.path, leaf)` pairs.
///
/// Non-empty nested objects are descended into; arrays, scalars and empty
/// objects are leaves.
fn flatten_into(prefix: &str, object: Map<String, Value>, out: &mut Vec<(String, Value)>) {
    for (key, value) in object {
        let name = if prefix.is_empty() {
            key
        } else {
            format!("{prefix}.{key}")
        };
        match value {
            Value::Object(inner) if !inner.is_empty() => flatten_into(&name, inner, out),
            other => out.push((name, other)),
        }
    }
}

impl Frame {
    /// An empty frame; used to carry metadata on error responses.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Build a frame with one row per record and one column per distinct
    /// field, in first-seen order.
    ///
    /// # Errors
    ///
    /// Returns [`SentryError::Frame`] when a record does not serialise to a
    /// JSON object.
    pub fn from_records<T: Serialize>(
        name: impl Into<String>,
        records: &[T],
    ) -> Result<Self, SentryError> {
        let mut order: Vec<String> = Vec::new();
        let mut columns: HashMap<String, Vec<Value>> = HashMap::new();
        for (row, record) in records.iter().enumerate() {
            let value = serde_json::to_value(record)
                .map_err(|e| SentryError::Frame(format!("row {row}: {e}").into()))?;
            let Value::Object(object) = value else {
                return Err(SentryError::Frame(
                    format!("row {row} is not an object").into(),
                ));
            };
            let mut leaves = Vec::new();
            flatten_into("", object, &mut leaves);
            for (key, leaf) in leaves {
                let cells = columns.entry(key.clone()).or_insert_with(|| {
                    order.push(key);
                    Vec::new()
                });
                cells.resize(row + 1, Value::Null);
                if let Some(cell) = cells.get_mut(row) {
                    *cell = leaf;
                }
            }
        }
        let fields = order
            .into_iter()
            .map(|name| {
                let mut cells = columns.remove(&name).unwrap_or_default();
                cells.resize(records.len(), Value::Null);
                Field {
                    name,
                    values: FieldValues::infer(cells),
                }
            })
            .collect();
        Ok(Self {
            name: name.into(),
            ref_id: String::new(),
            fields,
            meta: None,
        })
    }

    #[must_use]
    pub fn with_ref_id(mut self, ref_id: impl Into<String>) -> Self {
        self.ref_id = ref_id.into();
        self
    }

    #[must_use]
    pub fn with_meta(mut self, meta: FrameMeta) -> Self {
        self.meta = Some(meta);
        self
    }

    /// Number of rows; zero for a frame without columns.
    #[must_use]
    pub fn rows(&self) -> usize {
        self.fields.first().map_or(0, |f| f.values.len())
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }
}
