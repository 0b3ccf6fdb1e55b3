//! Built-in primitive types.
//!
//! These follow the casting rules form-backed records conventionally use:
//! blank strings read as null, `"f"`/`"off"`/`"0"` are false, numbers are parsed
//! out of strings, timestamps are truncated to the configured precision.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, SubsecRound, TimeZone, Utc};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde_json::Value as Json;

use super::PrimitiveType;
use crate::value::AttrValue;

const FALSE_VALUES: &[&str] = &["0", "f", "F", "false", "FALSE", "off", "OFF"];

/// Default fractional-second digits kept by [`DateTimeType`].
pub const DEFAULT_DATETIME_PRECISION: u16 = 6;

#[derive(Debug, Clone, Copy, Default)]
pub struct BooleanType;

impl PrimitiveType for BooleanType {
    fn name(&self) -> &'static str {
        "boolean"
    }

    fn cast(&self, value: AttrValue) -> AttrValue {
        match value {
            AttrValue::Null => AttrValue::Null,
            AttrValue::Bool(b) => AttrValue::Bool(b),
            AttrValue::String(s) if s.is_empty() => AttrValue::Null,
            AttrValue::String(s) => AttrValue::Bool(!FALSE_VALUES.contains(&s.as_str())),
            AttrValue::Integer(i) => AttrValue::Bool(i != 0),
            AttrValue::Float(f) => AttrValue::Bool(f != 0.0),
            AttrValue::Decimal(d) => AttrValue::Bool(!d.is_zero()),
            AttrValue::Json(Json::Null) => AttrValue::Null,
            AttrValue::Json(Json::Bool(b)) => AttrValue::Bool(b),
            AttrValue::DateTime(_) | AttrValue::List(_) | AttrValue::Json(_) => {
                AttrValue::Bool(true)
            }
        }
    }

    fn deserialize(&self, stored: &Json) -> AttrValue {
        self.cast(AttrValue::from_json(stored))
    }

    fn serialize(&self, value: &AttrValue) -> Json {
        match self.cast(value.clone()) {
            AttrValue::Bool(b) => Json::Bool(b),
            _ => Json::Null,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StringType;

impl PrimitiveType for StringType {
    fn name(&self) -> &'static str {
        "string"
    }

    fn cast(&self, value: AttrValue) -> AttrValue {
        match value {
            AttrValue::Null | AttrValue::Json(Json::Null) => AttrValue::Null,
            AttrValue::String(s) => AttrValue::String(s),
            AttrValue::Bool(true) => AttrValue::String("t".to_string()),
            AttrValue::Bool(false) => AttrValue::String("f".to_string()),
            AttrValue::Json(Json::String(s)) => AttrValue::String(s),
            other => AttrValue::String(other.to_string()),
        }
    }

    fn deserialize(&self, stored: &Json) -> AttrValue {
        match stored {
            Json::String(s) => AttrValue::String(s.clone()),
            other => self.cast(AttrValue::from_json(other)),
        }
    }

    fn serialize(&self, value: &AttrValue) -> Json {
        match self.cast(value.clone()) {
            AttrValue::String(s) => Json::String(s),
            _ => Json::Null,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct IntegerType;

impl PrimitiveType for IntegerType {
    fn name(&self) -> &'static str {
        "integer"
    }

    fn cast(&self, value: AttrValue) -> AttrValue {
        let cast = match value {
            AttrValue::Integer(i) => Some(i),
            AttrValue::Bool(b) => Some(i64::from(b)),
            AttrValue::Float(f) if f.is_finite() => Some(f.trunc() as i64),
            AttrValue::Decimal(d) => d.trunc().to_i64(),
            AttrValue::String(s) => parse_integer(&s),
            AttrValue::DateTime(t) => Some(t.timestamp()),
            AttrValue::Json(json) => return self.deserialize(&json),
            _ => None,
        };
        cast.map(AttrValue::Integer).unwrap_or(AttrValue::Null)
    }

    fn deserialize(&self, stored: &Json) -> AttrValue {
        match stored {
            Json::Object(_) | Json::Array(_) => AttrValue::Null,
            other => self.cast(AttrValue::from_json(other)),
        }
    }

    fn serialize(&self, value: &AttrValue) -> Json {
        match self.cast(value.clone()) {
            AttrValue::Integer(i) => Json::from(i),
            _ => Json::Null,
        }
    }
}

fn parse_integer(s: &str) -> Option<i64> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<i64>().ok().or_else(|| {
        trimmed
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .map(|f| f.trunc() as i64)
    })
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FloatType;

impl PrimitiveType for FloatType {
    fn name(&self) -> &'static str {
        "float"
    }

    fn cast(&self, value: AttrValue) -> AttrValue {
        let cast = match value {
            AttrValue::Float(f) => Some(f),
            AttrValue::Integer(i) => Some(i as f64),
            AttrValue::Bool(b) => Some(if b { 1.0 } else { 0.0 }),
            AttrValue::Decimal(d) => d.to_f64(),
            AttrValue::String(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    trimmed.parse::<f64>().ok()
                }
            }
            AttrValue::Json(json) => return self.deserialize(&json),
            _ => None,
        };
        cast.map(AttrValue::Float).unwrap_or(AttrValue::Null)
    }

    fn deserialize(&self, stored: &Json) -> AttrValue {
        match stored {
            Json::Number(n) => n.as_f64().map(AttrValue::Float).unwrap_or(AttrValue::Null),
            Json::Object(_) | Json::Array(_) => AttrValue::Null,
            other => self.cast(AttrValue::from_json(other)),
        }
    }

    fn serialize(&self, value: &AttrValue) -> Json {
        match self.cast(value.clone()) {
            AttrValue::Float(f) => AttrValue::Float(f).to_json(),
            _ => Json::Null,
        }
    }
}

/// Exact decimal, stored as a JSON string.
#[derive(Debug, Clone, Copy, Default)]
pub struct DecimalType {
    /// Digits kept after the decimal point; `None` keeps the input's scale.
    pub scale: Option<u32>,
}

impl DecimalType {
    pub fn with_scale(scale: u32) -> Self {
        Self { scale: Some(scale) }
    }

    fn rounded(&self, d: Decimal) -> Decimal {
        match self.scale {
            Some(scale) => d.round_dp(scale),
            None => d,
        }
    }
}

fn parse_decimal(s: &str) -> Option<Decimal> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }
    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .ok()
}

impl PrimitiveType for DecimalType {
    fn name(&self) -> &'static str {
        "decimal"
    }

    fn cast(&self, value: AttrValue) -> AttrValue {
        let cast = match value {
            AttrValue::Decimal(d) => Some(d),
            AttrValue::Integer(i) => Some(Decimal::from(i)),
            AttrValue::Float(f) => Decimal::from_f64(f),
            AttrValue::Bool(b) => Some(Decimal::from(i64::from(b))),
            AttrValue::String(s) => parse_decimal(&s),
            AttrValue::Json(json) => return self.deserialize(&json),
            _ => None,
        };
        cast.map(|d| AttrValue::Decimal(self.rounded(d)))
            .unwrap_or(AttrValue::Null)
    }

    fn deserialize(&self, stored: &Json) -> AttrValue {
        match stored {
            // Parse the literal text so no binary float rounding creeps in
            Json::Number(n) => parse_decimal(&n.to_string())
                .map(|d| AttrValue::Decimal(self.rounded(d)))
                .unwrap_or(AttrValue::Null),
            Json::String(s) => self.cast(AttrValue::String(s.clone())),
            Json::Bool(b) => self.cast(AttrValue::Bool(*b)),
            _ => AttrValue::Null,
        }
    }

    fn serialize(&self, value: &AttrValue) -> Json {
        match self.cast(value.clone()) {
            AttrValue::Decimal(d) => Json::String(d.to_string()),
            _ => Json::Null,
        }
    }
}

/// UTC timestamp, stored as an RFC 3339 string.
#[derive(Debug, Clone, Copy)]
pub struct DateTimeType {
    /// Fractional-second digits kept on cast (0..=9).
    pub precision: u16,
}

impl Default for DateTimeType {
    fn default() -> Self {
        Self {
            precision: DEFAULT_DATETIME_PRECISION,
        }
    }
}

impl DateTimeType {
    pub fn with_precision(precision: u16) -> Self {
        Self {
            precision: precision.min(9),
        }
    }
}

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(t) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(t.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

impl PrimitiveType for DateTimeType {
    fn name(&self) -> &'static str {
        "datetime"
    }

    fn cast(&self, value: AttrValue) -> AttrValue {
        let cast = match value {
            AttrValue::DateTime(t) => Some(t),
            AttrValue::String(s) => parse_datetime(&s),
            AttrValue::Integer(secs) => DateTime::from_timestamp(secs, 0),
            AttrValue::Float(f) if f.is_finite() => {
                let secs = f.floor();
                let nanos = ((f - secs) * 1e9).round() as u32;
                DateTime::from_timestamp(secs as i64, nanos.min(999_999_999))
            }
            AttrValue::Json(Json::String(s)) => parse_datetime(&s),
            _ => None,
        };
        cast.map(|t| AttrValue::DateTime(t.trunc_subsecs(self.precision)))
            .unwrap_or(AttrValue::Null)
    }

    fn deserialize(&self, stored: &Json) -> AttrValue {
        self.cast(AttrValue::from_json(stored))
    }

    fn serialize(&self, value: &AttrValue) -> Json {
        match self.cast(value.clone()) {
            AttrValue::DateTime(t) => Json::String(t.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            _ => Json::Null,
        }
    }
}

/// Untyped pass-through: cast is the identity.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValueType;

impl PrimitiveType for ValueType {
    fn name(&self) -> &'static str {
        "value"
    }

    fn cast(&self, value: AttrValue) -> AttrValue {
        value
    }

    fn deserialize(&self, stored: &Json) -> AttrValue {
        AttrValue::from_json(stored)
    }

    fn serialize(&self, value: &AttrValue) -> Json {
        value.to_json()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn boolean_false_tokens() {
        for token in ["0", "f", "F", "false", "FALSE", "off", "OFF"] {
            assert_eq!(BooleanType.cast(token.into()), AttrValue::Bool(false), "{token}");
        }
        assert_eq!(BooleanType.cast("yes".into()), AttrValue::Bool(true));
        assert_eq!(BooleanType.cast("t".into()), AttrValue::Bool(true));
    }

    #[test]
    fn boolean_blank_is_null() {
        assert_eq!(BooleanType.cast("".into()), AttrValue::Null);
        assert_eq!(BooleanType.cast(AttrValue::Null), AttrValue::Null);
    }

    #[test]
    fn boolean_numbers() {
        assert_eq!(BooleanType.cast(0.into()), AttrValue::Bool(false));
        assert_eq!(BooleanType.cast(1.into()), AttrValue::Bool(true));
        assert_eq!(BooleanType.deserialize(&json!("0")), AttrValue::Bool(false));
    }

    #[test]
    fn string_renders_scalars() {
        assert_eq!(StringType.cast(42.into()), AttrValue::from("42"));
        assert_eq!(StringType.cast(true.into()), AttrValue::from("t"));
        assert_eq!(StringType.cast(false.into()), AttrValue::from("f"));
        assert_eq!(StringType.cast(AttrValue::Null), AttrValue::Null);
    }

    #[test]
    fn integer_parses_strings() {
        assert_eq!(IntegerType.cast("12".into()), AttrValue::Integer(12));
        assert_eq!(IntegerType.cast(" 7 ".into()), AttrValue::Integer(7));
        assert_eq!(IntegerType.cast("3.9".into()), AttrValue::Integer(3));
        assert_eq!(IntegerType.cast("abc".into()), AttrValue::Null);
        assert_eq!(IntegerType.cast("".into()), AttrValue::Null);
    }

    #[test]
    fn integer_truncates_floats() {
        assert_eq!(IntegerType.cast(2.7.into()), AttrValue::Integer(2));
        assert_eq!(IntegerType.cast(f64::NAN.into()), AttrValue::Null);
    }

    #[test]
    fn float_casts() {
        assert_eq!(FloatType.cast("1.25".into()), AttrValue::Float(1.25));
        assert_eq!(FloatType.cast(2.into()), AttrValue::Float(2.0));
        assert_eq!(FloatType.deserialize(&json!(3)), AttrValue::Float(3.0));
    }

    #[test]
    fn decimal_keeps_precision() {
        let ty = DecimalType::default();
        let value = ty.cast("0.42".into());
        assert_eq!(value, AttrValue::Decimal(Decimal::from_str("0.42").unwrap()));
        assert_eq!(ty.serialize(&value), json!("0.42"));
        assert_eq!(ty.deserialize(&json!("0.42")), value);
    }

    #[test]
    fn decimal_rounds_to_scale() {
        let ty = DecimalType::with_scale(2);
        assert_eq!(
            ty.cast("9.999".into()),
            AttrValue::Decimal(Decimal::from_str("10.00").unwrap())
        );
    }

    #[test]
    fn decimal_from_json_number_uses_literal() {
        let ty = DecimalType::default();
        assert_eq!(
            ty.deserialize(&json!(0.1)),
            AttrValue::Decimal(Decimal::from_str("0.1").unwrap())
        );
    }

    #[test]
    fn datetime_parses_common_formats() {
        let expected = Utc.with_ymd_and_hms(2024, 1, 15, 14, 30, 0).unwrap();
        let ty = DateTimeType::default();
        assert_eq!(ty.cast("2024-01-15T14:30:00Z".into()), AttrValue::DateTime(expected));
        assert_eq!(ty.cast("2024-01-15 14:30:00".into()), AttrValue::DateTime(expected));
        assert_eq!(ty.cast("garbage".into()), AttrValue::Null);
    }

    #[test]
    fn datetime_from_epoch_seconds() {
        let ty = DateTimeType::default();
        assert_eq!(
            ty.cast(0.into()),
            AttrValue::DateTime(DateTime::from_timestamp(0, 0).unwrap())
        );
    }

    #[test]
    fn datetime_truncates_to_precision() {
        let t = DateTime::from_timestamp(1, 123_456_789).unwrap();
        let cast = DateTimeType::default().cast(t.into());
        assert_eq!(cast, AttrValue::DateTime(DateTime::from_timestamp(1, 123_456_000).unwrap()));

        let cast = DateTimeType::with_precision(0).cast(t.into());
        assert_eq!(cast, AttrValue::DateTime(DateTime::from_timestamp(1, 0).unwrap()));
    }

    #[test]
    fn datetime_serializes_rfc3339() {
        let ty = DateTimeType::default();
        let t = DateTime::from_timestamp(0, 0).unwrap();
        assert_eq!(ty.serialize(&t.into()), json!("1970-01-01T00:00:00Z"));
    }

    #[test]
    fn value_type_is_identity() {
        let payload = AttrValue::Json(json!({"a": 1}));
        assert_eq!(ValueType.cast(payload.clone()), payload);
        assert_eq!(ValueType.deserialize(&json!({"a": 1})), payload);
    }
}
