//! Attribute value types.
//!
//! [`AttrValue`] is the canonical in-memory representation of every attribute,
//! whatever its declared type. The stored (blob) representation is always a
//! [`serde_json::Value`]; converting between the two is the job of the
//! attribute types in [`crate::types`], not of this module.

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use serde_json::Value as Json;

/// Runtime representation of an attribute value.
///
/// Values produced by a cast are canonical for their type: a boolean attribute
/// only ever holds `Bool` or `Null`, a datetime attribute `DateTime` or `Null`,
/// and so on. Untyped attributes may hold anything, including raw `Json`.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    /// Absent/null value
    Null,

    Bool(bool),

    Integer(i64),

    Float(f64),

    /// Exact decimal (e.g. money); stored as a string to keep precision
    Decimal(Decimal),

    String(String),

    /// UTC timestamp; stored as RFC 3339
    DateTime(DateTime<Utc>),

    /// List value of an array attribute
    List(Vec<AttrValue>),

    /// Structured payload with no narrower type (objects, mixed data)
    Json(Json),
}

impl AttrValue {
    pub fn is_null(&self) -> bool {
        matches!(self, AttrValue::Null)
    }

    /// Check if this value is "present".
    ///
    /// - Null: false
    /// - Bool: the boolean value itself
    /// - String: false when empty or whitespace only
    /// - List: true if non-empty
    /// - Json: false for null, blank strings and empty containers
    /// - numbers and timestamps: always true
    pub fn is_truthy(&self) -> bool {
        match self {
            AttrValue::Null => false,
            AttrValue::Bool(v) => *v,
            AttrValue::String(s) => !s.trim().is_empty(),
            AttrValue::List(v) => !v.is_empty(),
            AttrValue::Json(json) => match json {
                Json::Null => false,
                Json::Bool(b) => *b,
                Json::String(s) => !s.trim().is_empty(),
                Json::Array(a) => !a.is_empty(),
                Json::Object(o) => !o.is_empty(),
                Json::Number(_) => true,
            },
            AttrValue::Integer(_)
            | AttrValue::Float(_)
            | AttrValue::Decimal(_)
            | AttrValue::DateTime(_) => true,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttrValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            AttrValue::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttrValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            AttrValue::Decimal(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            AttrValue::DateTime(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[AttrValue]> {
        match self {
            AttrValue::List(v) => Some(v),
            _ => None,
        }
    }

    /// Untyped view of a stored JSON value.
    ///
    /// Objects stay `Json`; arrays become `List` so that list-valued payloads
    /// compare equal regardless of how they were produced.
    pub fn from_json(json: &Json) -> Self {
        match json {
            Json::Null => AttrValue::Null,
            Json::Bool(b) => AttrValue::Bool(*b),
            Json::Number(n) => match n.as_i64() {
                Some(i) => AttrValue::Integer(i),
                None => n.as_f64().map(AttrValue::Float).unwrap_or(AttrValue::Null),
            },
            Json::String(s) => AttrValue::String(s.clone()),
            Json::Array(items) => AttrValue::List(items.iter().map(AttrValue::from_json).collect()),
            Json::Object(_) => AttrValue::Json(json.clone()),
        }
    }

    /// Untyped stored form of this value.
    ///
    /// Non-finite floats have no JSON form and are stored as null.
    pub fn to_json(&self) -> Json {
        match self {
            AttrValue::Null => Json::Null,
            AttrValue::Bool(b) => Json::Bool(*b),
            AttrValue::Integer(i) => Json::from(*i),
            AttrValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(Json::Number)
                .unwrap_or(Json::Null),
            AttrValue::Decimal(d) => Json::String(d.to_string()),
            AttrValue::String(s) => Json::String(s.clone()),
            AttrValue::DateTime(t) => Json::String(t.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            AttrValue::List(items) => Json::Array(items.iter().map(AttrValue::to_json).collect()),
            AttrValue::Json(json) => json.clone(),
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Null => Ok(()),
            AttrValue::Bool(b) => write!(f, "{}", b),
            AttrValue::Integer(i) => write!(f, "{}", i),
            AttrValue::Float(v) => write!(f, "{}", v),
            AttrValue::Decimal(d) => write!(f, "{}", d),
            AttrValue::String(s) => f.write_str(s),
            AttrValue::DateTime(t) => f.write_str(&t.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            AttrValue::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
            AttrValue::Json(json) => write!(f, "{}", json),
        }
    }
}

impl From<bool> for AttrValue {
    fn from(v: bool) -> Self {
        AttrValue::Bool(v)
    }
}

impl From<i64> for AttrValue {
    fn from(v: i64) -> Self {
        AttrValue::Integer(v)
    }
}

impl From<i32> for AttrValue {
    fn from(v: i32) -> Self {
        AttrValue::Integer(v.into())
    }
}

impl From<f64> for AttrValue {
    fn from(v: f64) -> Self {
        AttrValue::Float(v)
    }
}

impl From<Decimal> for AttrValue {
    fn from(v: Decimal) -> Self {
        AttrValue::Decimal(v)
    }
}

impl From<&str> for AttrValue {
    fn from(v: &str) -> Self {
        AttrValue::String(v.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(v: String) -> Self {
        AttrValue::String(v)
    }
}

impl From<DateTime<Utc>> for AttrValue {
    fn from(v: DateTime<Utc>) -> Self {
        AttrValue::DateTime(v)
    }
}

impl From<Json> for AttrValue {
    fn from(v: Json) -> Self {
        AttrValue::from_json(&v)
    }
}

impl<T: Into<AttrValue>> From<Vec<T>> for AttrValue {
    fn from(v: Vec<T>) -> Self {
        AttrValue::List(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<AttrValue>> From<Option<T>> for AttrValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(AttrValue::Null)
    }
}
