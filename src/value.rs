//! Field values and value kinds.
//!
//! Every field a model declares has a [`ValueKind`]; records hold [`Value`]s.
//! Only the storable kinds are ever written to tabular backends, the rest are
//! metadata (`Json`) or live in stream storage (`Stream`).

use std::cmp::Ordering;
use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The closed set of value kinds a field can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueKind {
    ShortString,
    LongString,
    Guid,
    Int,
    Long,
    Double,
    Bytes,
    Bool,
    DateTime,
    /// Binary payload kept in stream storage, never in a table column.
    Stream,
    /// Nested structure carried as metadata only.
    Json,
}

impl ValueKind {
    pub const ALL: [ValueKind; 11] = [
        ValueKind::ShortString,
        ValueKind::LongString,
        ValueKind::Guid,
        ValueKind::Int,
        ValueKind::Long,
        ValueKind::Double,
        ValueKind::Bytes,
        ValueKind::Bool,
        ValueKind::DateTime,
        ValueKind::Stream,
        ValueKind::Json,
    ];

    /// Whether fields of this kind are persisted by tabular providers.
    pub fn is_stored(self) -> bool {
        matches!(
            self,
            ValueKind::ShortString
                | ValueKind::LongString
                | ValueKind::Guid
                | ValueKind::Int
                | ValueKind::Long
                | ValueKind::Double
                | ValueKind::Bytes
                | ValueKind::Bool
                | ValueKind::DateTime
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            ValueKind::ShortString => "ShortString",
            ValueKind::LongString => "LongString",
            ValueKind::Guid => "Guid",
            ValueKind::Int => "Int",
            ValueKind::Long => "Long",
            ValueKind::Double => "Double",
            ValueKind::Bytes => "Bytes",
            ValueKind::Bool => "Bool",
            ValueKind::DateTime => "DateTime",
            ValueKind::Stream => "Stream",
            ValueKind::Json => "Json",
        }
    }

    pub fn from_name(name: &str) -> Option<ValueKind> {
        ValueKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.name().eq_ignore_ascii_case(name))
    }

    /// Convert a loosely typed value into this kind.
    ///
    /// `Null` stays `Null`. Returns `None` when the value cannot represent
    /// this kind (e.g. `"abc"` as a Guid).
    pub fn coerce(self, value: Value) -> Option<Value> {
        if value.is_null() {
            return Some(Value::Null);
        }
        match self {
            ValueKind::ShortString | ValueKind::LongString => match value {
                Value::String(_) => Some(value),
                Value::Json(serde_json::Value::String(text)) => Some(Value::String(text)),
                Value::Json(json) => Some(Value::String(json.to_string())),
                other => Some(Value::String(other.to_string())),
            },
            ValueKind::Guid => match value {
                Value::Guid(_) => Some(value),
                Value::String(text) => Uuid::parse_str(text.trim()).ok().map(Value::Guid),
                _ => None,
            },
            ValueKind::Int => match value {
                Value::Int(_) => Some(value),
                Value::Long(n) => i32::try_from(n).ok().map(Value::Int),
                Value::Double(n) if n.fract() == 0.0 => {
                    let n = n as i64;
                    i32::try_from(n).ok().map(Value::Int)
                }
                Value::Bool(flag) => Some(Value::Int(flag as i32)),
                Value::String(text) => text.trim().parse().ok().map(Value::Int),
                _ => None,
            },
            ValueKind::Long => match value {
                Value::Long(_) => Some(value),
                Value::Int(n) => Some(Value::Long(n as i64)),
                Value::Double(n) if n.fract() == 0.0 => Some(Value::Long(n as i64)),
                Value::Bool(flag) => Some(Value::Long(flag as i64)),
                Value::String(text) => text.trim().parse().ok().map(Value::Long),
                _ => None,
            },
            ValueKind::Double => match value {
                Value::Double(_) => Some(value),
                Value::Int(n) => Some(Value::Double(n as f64)),
                Value::Long(n) => Some(Value::Double(n as f64)),
                Value::String(text) => text.trim().parse().ok().map(Value::Double),
                _ => None,
            },
            ValueKind::Bool => match value {
                Value::Bool(_) => Some(value),
                Value::Int(n) => Some(Value::Bool(n != 0)),
                Value::Long(n) => Some(Value::Bool(n != 0)),
                Value::String(text) => match text.trim().to_ascii_lowercase().as_str() {
                    "true" | "yes" | "1" => Some(Value::Bool(true)),
                    "false" | "no" | "0" => Some(Value::Bool(false)),
                    _ => None,
                },
                _ => None,
            },
            ValueKind::DateTime => match value {
                Value::DateTime(_) => Some(value),
                Value::String(text) => parse_datetime(&text).map(Value::DateTime),
                _ => None,
            },
            ValueKind::Bytes => match value {
                Value::Bytes(_) => Some(value),
                Value::Stream(bytes) => Some(Value::Bytes(bytes)),
                Value::String(text) => STANDARD.decode(text.trim()).ok().map(Value::Bytes),
                _ => None,
            },
            ValueKind::Stream => match value {
                Value::Stream(_) => Some(value),
                Value::Bytes(bytes) => Some(Value::Stream(bytes)),
                Value::String(text) => STANDARD.decode(text.trim()).ok().map(Value::Stream),
                _ => None,
            },
            ValueKind::Json => Some(Value::Json(value.to_json())),
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn parse_datetime(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.with_timezone(&Utc));
    }
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .map(|naive| naive.and_utc())
}

/// A single field value.
///
/// Serializes externally tagged (`{"Guid": "..."}`) so typed values survive a
/// text round trip; byte payloads are base64 encoded. Non-finite doubles are
/// written as `"NaN"`, `"inf"` or `"-inf"` in human-readable formats.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum Value {
    #[default]
    Null,
    String(String),
    Guid(Uuid),
    Int(i32),
    Long(i64),
    Double(#[serde(with = "text_double")] f64),
    Bytes(#[serde(with = "base64_bytes")] Vec<u8>),
    Bool(bool),
    DateTime(DateTime<Utc>),
    Stream(#[serde(with = "base64_bytes")] Vec<u8>),
    Json(serde_json::Value),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The kind this value naturally carries. Strings report `ShortString`.
    pub fn kind(&self) -> Option<ValueKind> {
        match self {
            Value::Null => None,
            Value::String(_) => Some(ValueKind::ShortString),
            Value::Guid(_) => Some(ValueKind::Guid),
            Value::Int(_) => Some(ValueKind::Int),
            Value::Long(_) => Some(ValueKind::Long),
            Value::Double(_) => Some(ValueKind::Double),
            Value::Bytes(_) => Some(ValueKind::Bytes),
            Value::Bool(_) => Some(ValueKind::Bool),
            Value::DateTime(_) => Some(ValueKind::DateTime),
            Value::Stream(_) => Some(ValueKind::Stream),
            Value::Json(_) => Some(ValueKind::Json),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_guid(&self) -> Option<Uuid> {
        match self {
            Value::Guid(id) => Some(*id),
            Value::String(text) => Uuid::parse_str(text.trim()).ok(),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n as i64),
            Value::Long(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Long(n) => Some(*n as f64),
            Value::Double(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(flag) => Some(*flag),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(bytes) | Value::Stream(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Change-tracking comparison.
    ///
    /// Two values differ when exactly one is null, when their variants differ,
    /// when equality fails, or (for byte payloads) when length or any byte
    /// differs.
    pub fn differs(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => false,
            (Value::Null, _) | (_, Value::Null) => true,
            (Value::Bytes(a), Value::Bytes(b)) | (Value::Stream(a), Value::Stream(b)) => {
                a.len() != b.len() || a.iter().zip(b.iter()).any(|(x, y)| x != y)
            }
            _ if std::mem::discriminant(self) != std::mem::discriminant(other) => true,
            _ => self != other,
        }
    }

    /// Lookup comparison used for key matching and `=` filters.
    ///
    /// Guids compare by parsed value, so differently cased or formatted
    /// string forms of the same Guid match. Numeric variants compare by value.
    pub fn matches(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Guid(a), Value::Guid(b)) => a == b,
            (Value::Guid(id), Value::String(text)) | (Value::String(text), Value::Guid(id)) => {
                Uuid::parse_str(text.trim()).map(|parsed| parsed == *id).unwrap_or(false)
            }
            (Value::String(a), Value::String(b)) => match (self.as_guid(), other.as_guid()) {
                (Some(x), Some(y)) => x == y,
                _ => a == b,
            },
            _ => match (self.as_f64(), other.as_f64()) {
                (Some(a), Some(b)) => a == b,
                _ => !self.differs(other),
            },
        }
    }

    /// Ordering used for sorting and range filters. Null sorts first;
    /// values of unrelated kinds are unordered.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Null, Value::Null) => Some(Ordering::Equal),
            (Value::Null, _) => Some(Ordering::Less),
            (_, Value::Null) => Some(Ordering::Greater),
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            (Value::Guid(_), _) | (_, Value::Guid(_)) => {
                match (self.as_guid(), other.as_guid()) {
                    (Some(a), Some(b)) => Some(a.cmp(&b)),
                    _ => None,
                }
            }
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::DateTime(a), Value::DateTime(b)) => Some(a.cmp(b)),
            (Value::Bytes(a), Value::Bytes(b)) => Some(a.cmp(b)),
            _ => match (self.as_f64(), other.as_f64()) {
                (Some(a), Some(b)) => a.partial_cmp(&b),
                _ => None,
            },
        }
    }

    /// Whether this value leaves a key part undefined.
    pub fn is_empty_key(&self) -> bool {
        match self {
            Value::Null => true,
            Value::String(text) => text.is_empty(),
            Value::Guid(id) => id.is_nil(),
            _ => false,
        }
    }

    /// Best-effort conversion from a JSON scalar.
    pub fn from_json(json: &serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(flag) => Value::Bool(*flag),
            serde_json::Value::Number(number) => match number.as_i64() {
                Some(n) => Value::Long(n),
                None => number.as_f64().map(Value::Double).unwrap_or(Value::Null),
            },
            serde_json::Value::String(text) => Value::String(text.clone()),
            other => Value::Json(other.clone()),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(flag) => serde_json::Value::Bool(*flag),
            Value::Int(n) => serde_json::Value::from(*n),
            Value::Long(n) => serde_json::Value::from(*n),
            Value::Double(n) => serde_json::Value::from(*n),
            Value::Json(json) => json.clone(),
            other => serde_json::Value::String(other.to_string()),
        }
    }
}

/// Key-text rendering: Guids lowercase hyphenated, datetimes RFC 3339,
/// bytes base64, null as the empty string.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::String(text) => f.write_str(text),
            Value::Guid(id) => write!(f, "{}", id.hyphenated()),
            Value::Int(n) => write!(f, "{}", n),
            Value::Long(n) => write!(f, "{}", n),
            Value::Double(n) => write!(f, "{}", n),
            Value::Bytes(bytes) | Value::Stream(bytes) => f.write_str(&STANDARD.encode(bytes)),
            Value::Bool(flag) => write!(f, "{}", flag),
            Value::DateTime(at) => f.write_str(&at.to_rfc3339()),
            Value::Json(json) => write!(f, "{}", json),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<&String> for Value {
    fn from(value: &String) -> Self {
        Value::String(value.clone())
    }
}

impl From<Uuid> for Value {
    fn from(value: Uuid) -> Self {
        Value::Guid(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Long(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Double(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Value::Bytes(value)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Self {
        Value::DateTime(value)
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        Value::Json(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        STANDARD.decode(text).map_err(serde::de::Error::custom)
    }
}

mod text_double {
    use std::fmt;

    use serde::de::{self, Visitor};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() || !serializer.is_human_readable() {
            serializer.serialize_f64(*value)
        } else if value.is_nan() {
            serializer.serialize_str("NaN")
        } else if value.is_sign_positive() {
            serializer.serialize_str("inf")
        } else {
            serializer.serialize_str("-inf")
        }
    }

    struct DoubleVisitor;

    impl Visitor<'_> for DoubleVisitor {
        type Value = f64;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a number or one of \"NaN\", \"inf\", \"-inf\"")
        }

        fn visit_f64<E: de::Error>(self, value: f64) -> Result<f64, E> {
            Ok(value)
        }

        fn visit_i64<E: de::Error>(self, value: i64) -> Result<f64, E> {
            Ok(value as f64)
        }

        fn visit_u64<E: de::Error>(self, value: u64) -> Result<f64, E> {
            Ok(value as f64)
        }

        fn visit_str<E: de::Error>(self, value: &str) -> Result<f64, E> {
            match value {
                "NaN" => Ok(f64::NAN),
                "inf" => Ok(f64::INFINITY),
                "-inf" => Ok(f64::NEG_INFINITY),
                other => Err(E::invalid_value(de::Unexpected::Str(other), &self)),
            }
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        if deserializer.is_human_readable() {
            deserializer.deserialize_any(DoubleVisitor)
        } else {
            f64::deserialize(deserializer)
        }
    }
}
