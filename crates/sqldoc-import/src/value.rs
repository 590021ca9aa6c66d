//! Document values and relational column-type dispatch.
//!
//! The coercion table maps a column's declared relational kind and the raw
//! driver value onto one of the document value kinds. Dispatch is total:
//! a kind with no dedicated rule passes the driver value through unmodified
//! as [`Value::Opaque`].

use base64::Engine;
use serde::ser::SerializeSeq;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// A document: ordered mapping from field name to value.
pub type Document = BTreeMap<String, Value>;

/// Declared relational type of a column, as reported by source metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    /// SQL ARRAY.
    Array,
    /// 64-bit integer (BIGINT).
    BigInt,
    /// BOOLEAN.
    Boolean,
    /// Binary large object (BLOB / bytea).
    Blob,
    /// Double-precision float.
    Double,
    /// Single-precision float.
    Float,
    /// 32-bit integer.
    Integer,
    /// String with national character set (NVARCHAR).
    NString,
    /// Character data (VARCHAR / TEXT).
    String,
    /// 8-bit integer, widened to integer.
    TinyInt,
    /// 16-bit integer, widened to integer.
    SmallInt,
    /// Calendar date.
    Date,
    /// Date and time.
    Timestamp,
    /// Anything the dispatch table does not cover.
    Other,
}

/// Raw value as produced by the relational driver, before coercion.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// SQL NULL.
    Null,
    /// Integer of any width.
    Int(i64),
    /// Floating-point number.
    Float(f64),
    /// Boolean.
    Bool(bool),
    /// Character data, including the textual form of dates.
    Text(String),
    /// Raw bytes.
    Bytes(Vec<u8>),
    /// Structured data already decoded by the driver (JSON, arrays).
    Json(serde_json::Value),
}

impl SqlValue {
    fn into_json(self) -> serde_json::Value {
        match self {
            Self::Null => serde_json::Value::Null,
            Self::Int(i) => serde_json::json!(i),
            Self::Float(f) => serde_json::json!(f),
            Self::Bool(b) => serde_json::json!(b),
            Self::Text(s) => serde_json::json!(s),
            Self::Bytes(b) => serde_json::json!(base64::engine::general_purpose::STANDARD.encode(b)),
            Self::Json(v) => v,
        }
    }
}

/// A coerced document value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Absent / SQL NULL.
    Null,
    /// 64-bit integer.
    Integer(i64),
    /// Double-precision float.
    Float(f64),
    /// Boolean.
    Bool(bool),
    /// Text.
    Text(String),
    /// Binary blob, serialized as base64 text.
    Binary(Vec<u8>),
    /// Date or timestamp in its textual form.
    DateTime(String),
    /// Array of values.
    Array(Vec<Value>),
    /// Driver value passed through unmodified.
    Opaque(serde_json::Value),
}

impl Value {
    /// String form of the value, used for identifier derivation and
    /// date-field parsing.
    #[must_use]
    pub fn to_text(&self) -> String {
        match self {
            Self::Null => "null".to_string(),
            Self::Integer(i) => i.to_string(),
            Self::Float(f) => f.to_string(),
            Self::Bool(b) => b.to_string(),
            Self::Text(s) | Self::DateTime(s) => s.clone(),
            Self::Binary(b) => base64::engine::general_purpose::STANDARD.encode(b),
            Self::Array(_) | Self::Opaque(_) => {
                serde_json::to_string(self).unwrap_or_default()
            }
        }
    }

    /// Whether the value counts as present for key derivation purposes.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null) || matches!(self, Self::Opaque(serde_json::Value::Null))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_none(),
            Self::Integer(i) => serializer.serialize_i64(*i),
            Self::Float(f) => serializer.serialize_f64(*f),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Text(s) | Self::DateTime(s) => serializer.serialize_str(s),
            Self::Binary(b) => {
                serializer.serialize_str(&base64::engine::general_purpose::STANDARD.encode(b))
            }
            Self::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Opaque(v) => v.serialize(serializer),
        }
    }
}

/// Coerce a raw driver value according to the column's declared kind.
///
/// Total over all `(kind, raw)` pairs: a NULL stays NULL, a mismatched
/// driver value falls through to the opaque passthrough rather than failing.
#[must_use]
pub fn coerce(kind: ColumnKind, raw: SqlValue) -> Value {
    if matches!(raw, SqlValue::Null) {
        return Value::Null;
    }
    match kind {
        ColumnKind::Array => match raw {
            SqlValue::Json(serde_json::Value::Array(items)) => {
                Value::Array(items.into_iter().map(Value::Opaque).collect())
            }
            other => Value::Opaque(other.into_json()),
        },
        ColumnKind::BigInt | ColumnKind::Integer | ColumnKind::SmallInt | ColumnKind::TinyInt => {
            match raw {
                SqlValue::Int(i) => Value::Integer(i),
                SqlValue::Bool(b) => Value::Integer(i64::from(b)),
                SqlValue::Text(ref s) => s
                    .parse::<i64>()
                    .map_or_else(|_| Value::Opaque(raw.clone().into_json()), Value::Integer),
                other => Value::Opaque(other.into_json()),
            }
        }
        ColumnKind::Boolean => match raw {
            SqlValue::Bool(b) => Value::Bool(b),
            SqlValue::Int(i) => Value::Bool(i != 0),
            other => Value::Opaque(other.into_json()),
        },
        ColumnKind::Blob => match raw {
            SqlValue::Bytes(b) => Value::Binary(b),
            SqlValue::Text(s) => Value::Binary(s.into_bytes()),
            other => Value::Opaque(other.into_json()),
        },
        ColumnKind::Double | ColumnKind::Float => match raw {
            SqlValue::Float(f) => Value::Float(f),
            SqlValue::Int(i) => Value::Float(i as f64),
            SqlValue::Text(ref s) => s
                .parse::<f64>()
                .map_or_else(|_| Value::Opaque(raw.clone().into_json()), Value::Float),
            other => Value::Opaque(other.into_json()),
        },
        ColumnKind::NString | ColumnKind::String => match raw {
            SqlValue::Text(s) => Value::Text(s),
            SqlValue::Int(i) => Value::Text(i.to_string()),
            SqlValue::Float(f) => Value::Text(f.to_string()),
            SqlValue::Bool(b) => Value::Text(b.to_string()),
            other => Value::Opaque(other.into_json()),
        },
        ColumnKind::Date | ColumnKind::Timestamp => match raw {
            SqlValue::Text(s) => Value::DateTime(s),
            other => Value::DateTime(other.into_json().to_string()),
        },
        ColumnKind::Other => Value::Opaque(raw.into_json()),
    }
}
