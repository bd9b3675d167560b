//! Casting of loosely typed JSON input to schema field kinds
//!
//! Request bodies and query operands arrive as whatever JSON (or text) the
//! client sent. Casting turns them into the canonical stored form: numbers as
//! JSON numbers, dates as millisecond RFC 3339 UTC strings, booleans as JSON
//! booleans. `null` casts to `null` for every kind.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde_json::{Number, Value};
use thiserror::Error;

use super::model::{format_date, FieldKind};
use crate::ids::TourId;

/// A value that does not fit its field kind
#[derive(Debug, Clone, PartialEq, Error)]
#[error("Cast to {kind} failed for value \"{}\" at path \"{path}\"", display_value(.value))]
pub struct CastError {
    pub kind: FieldKind,
    pub value: Value,
    pub path: String,
}

impl CastError {
    pub fn new(kind: FieldKind, value: &Value, path: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.clone(),
            path: path.into(),
        }
    }

    /// The offending value as the client sent it
    pub fn value_text(&self) -> String {
        display_value(&self.value)
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Cast `value` to `kind` for the field at `path`
///
/// ```rust
/// use serde_json::json;
/// use tour_service::tour::{cast_value, FieldKind};
///
/// assert_eq!(cast_value(FieldKind::Number, &json!(" 42 "), "price").unwrap(), json!(42));
/// assert_eq!(
///     cast_value(FieldKind::Date, &json!("2021-06-19"), "startDates").unwrap(),
///     json!("2021-06-19T00:00:00.000Z")
/// );
/// assert!(cast_value(FieldKind::Number, &json!("cheap"), "price").is_err());
/// ```
pub fn cast_value(kind: FieldKind, value: &Value, path: &str) -> Result<Value, CastError> {
    if value.is_null() {
        return Ok(Value::Null);
    }
    let fail = || CastError::new(kind, value, path);

    match kind {
        FieldKind::Id => match value {
            Value::String(s) if s.parse::<TourId>().is_ok() => Ok(value.clone()),
            _ => Err(fail()),
        },
        FieldKind::String => match value {
            Value::String(_) => Ok(value.clone()),
            Value::Number(n) => Ok(Value::String(n.to_string())),
            Value::Bool(b) => Ok(Value::String(b.to_string())),
            _ => Err(fail()),
        },
        FieldKind::Number => cast_number(value).map(Value::Number).ok_or_else(fail),
        FieldKind::Date => cast_date(value)
            .map(|date| Value::String(format_date(&date)))
            .ok_or_else(fail),
        FieldKind::Boolean => cast_bool(value).map(Value::Bool).ok_or_else(fail),
        FieldKind::StringArray | FieldKind::DateArray => {
            let element = kind.element();
            match value {
                Value::Array(items) => items
                    .iter()
                    .map(|item| cast_value(element, item, path).map_err(|_| fail()))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Value::Array),
                scalar => cast_value(element, scalar, path)
                    .map(|v| Value::Array(vec![v]))
                    .map_err(|_| fail()),
            }
        }
    }
}

/// Numbers and numeric strings; integers stay integers
pub fn cast_number(value: &Value) -> Option<Number> {
    match value {
        Value::Number(n) => Some(n.clone()),
        Value::String(s) => parse_number(s.trim()),
        Value::Bool(b) => Some(Number::from(u8::from(*b))),
        _ => None,
    }
}

fn parse_number(text: &str) -> Option<Number> {
    if text.is_empty() {
        return None;
    }
    if let Ok(int) = text.parse::<i64>() {
        return Some(Number::from(int));
    }
    let is_numeric = text
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E'));
    if !is_numeric {
        return None;
    }
    text.parse::<f64>().ok().and_then(Number::from_f64)
}

/// RFC 3339 timestamps, `YYYY-MM-DD` dates (midnight UTC), or epoch milliseconds
pub fn cast_date(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => parse_date(s.trim()),
        Value::Number(n) => n
            .as_i64()
            .and_then(|millis| Utc.timestamp_millis_opt(millis).single()),
        _ => None,
    }
}

/// Parse a date string in any accepted form
pub fn parse_date(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(date) = DateTime::parse_from_rfc3339(text) {
        return Some(date.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn cast_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim() {
            "true" | "1" | "yes" => Some(true),
            "false" | "0" | "no" => Some(false),
            _ => None,
        },
        Value::Number(n) => match n.as_i64() {
            Some(1) => Some(true),
            Some(0) => Some(false),
            _ => None,
        },
        _ => None,
    }
}
