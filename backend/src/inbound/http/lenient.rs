//! Forgiving field decoders for the legacy device wire format.
//!
//! Field devices in circulation send numbers either as JSON numbers or as
//! numeric strings, booleans as `0`/`1` and dates in several text forms.
//! Each decoder accepts any JSON value and falls back to the field default
//! instead of failing the whole body, so one sloppy field never loses a
//! batch. Use them with `#[serde(default, deserialize_with = "...")]`.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::warn;

fn number_from(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        Value::Bool(flag) => Some(f64::from(u8::from(*flag))),
        _ => None,
    };
    parsed.filter(|number| number.is_finite())
}

fn text_from(value: Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

/// Numeric field defaulting to `0`.
pub fn number<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(number_from(&value).unwrap_or_default())
}

/// Numeric field that stays absent when missing or unusable.
pub fn optional_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(number_from(&value))
}

/// Boolean field defaulting to `false`.
pub fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let flag = match value {
        Value::Bool(flag) => flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => {
            let text = text.trim();
            text == "1" || text.eq_ignore_ascii_case("true")
        }
        _ => false,
    };
    Ok(flag)
}

/// Text field; numbers are kept in their JSON spelling.
pub fn optional_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(text_from(value))
}

/// Calendar date in `YYYY-MM-DD` form.
pub fn optional_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(text_from(value).and_then(|text| parse_date(&text)))
}

/// Time of day in `HH:MM` or `HH:MM:SS` form.
pub fn optional_time<'de, D>(deserializer: D) -> Result<Option<NaiveTime>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(text_from(value).and_then(|text| parse_time(&text)))
}

/// Instant in RFC 3339, or a naive `YYYY-MM-DD HH:MM:SS` read as UTC.
///
/// Unparseable values are logged and dropped so the receipt time applies.
pub fn optional_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let Some(text) = text_from(value) else {
        return Ok(None);
    };
    let parsed = parse_timestamp(&text);
    if parsed.is_none() && !text.trim().is_empty() {
        warn!(timestamp = %text, "ignoring unparseable device timestamp");
    }
    Ok(parsed)
}

fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    // Some devices send a full datetime in the date field.
    let date_part = text.get(..10).unwrap_or(text);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

fn parse_time(text: &str) -> Option<NaiveTime> {
    let text = text.trim();
    NaiveTime::parse_from_str(text, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(text, "%H:%M"))
        .ok()
}

fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(instant) = DateTime::parse_from_rfc3339(text) {
        return Some(instant.with_timezone(&Utc));
    }
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .map(|naive| naive.and_utc())
}
