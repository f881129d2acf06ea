//! Typed cell values.
//!
//! Equality and hashing are exact and include the variant, so `Int(123)` and
//! `Text("123")` never match. Float values are wrapped in `OrderedFloat` to
//! get a total order and a stable hash.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use ordered_float::OrderedFloat;
use serde::{Serialize, Serializer};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(OrderedFloat<f64>),
    Text(String),
    Timestamp(NaiveDateTime),
}

impl Value {
    pub fn float(v: f64) -> Self {
        Self::Float(OrderedFloat(v))
    }

    pub fn text(v: impl Into<String>) -> Self {
        Self::Text(v.into())
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Text(_) => "text",
            Self::Timestamp(_) => "timestamp",
        }
    }

    /// Interpret as a point in time for temporal comparisons.
    ///
    /// `Null` yields `Ok(None)`. Text is parsed with [`parse_timestamp`]; any
    /// other variant is rejected with the offending type name.
    pub fn to_timestamp(&self) -> Result<Option<NaiveDateTime>, String> {
        match self {
            Self::Null => Ok(None),
            Self::Timestamp(ts) => Ok(Some(*ts)),
            Self::Text(s) => parse_timestamp(s)
                .map(Some)
                .ok_or_else(|| format!("cannot parse timestamp '{s}'")),
            other => Err(format!("expected timestamp, found {}", other.type_name())),
        }
    }
}

/// Parse the timestamp shapes warehouses commonly export.
///
/// Accepts RFC 3339 (normalized to UTC), `YYYY-MM-DD HH:MM:SS[.fff]`,
/// `YYYY-MM-DDTHH:MM:SS[.fff]` and bare dates (midnight).
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%.f", TIMESTAMP_FORMAT] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(ts);
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(v) => write!(f, "{}", v.0),
            Self::Text(s) => f.write_str(s),
            Self::Timestamp(ts) => write!(f, "{}", ts.format(TIMESTAMP_FORMAT)),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Int(i) => serializer.serialize_i64(*i),
            Self::Float(v) => serializer.serialize_f64(v.0),
            Self::Text(s) => serializer.serialize_str(s),
            Self::Timestamp(ts) => {
                serializer.collect_str(&ts.format(TIMESTAMP_FORMAT))
            }
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Self::Timestamp(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Self::Null)
    }
}
