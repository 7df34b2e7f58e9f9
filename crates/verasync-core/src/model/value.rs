// Lenient readers for hub JSON.
//
// Luup is inconsistent about scalar types: `"status":"1"` and
// `"status":1` both occur, sometimes for the same device across polls.

use chrono::{DateTime, Utc};
use serde_json::Value;

use super::entity::JsonObject;

pub(crate) fn int(fields: &JsonObject, key: &str) -> Option<i64> {
    match fields.get(key)? {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(truncate)),
        Value::String(s) => s.trim().parse().ok(),
        Value::Bool(b) => Some(i64::from(*b)),
        _ => None,
    }
}

pub(crate) fn id(fields: &JsonObject, key: &str) -> Option<u32> {
    int(fields, key).and_then(|v| u32::try_from(v).ok())
}

/// Reference to another entity; Luup uses `0` for "none".
pub(crate) fn reference(fields: &JsonObject, key: &str) -> Option<u32> {
    id(fields, key).filter(|v| *v != 0)
}

pub(crate) fn float(fields: &JsonObject, key: &str) -> Option<f64> {
    match fields.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub(crate) fn text(fields: &JsonObject, key: &str) -> Option<String> {
    match fields.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

pub(crate) fn flag(fields: &JsonObject, key: &str) -> bool {
    match fields.get(key) {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) if s.eq_ignore_ascii_case("true") => true,
        _ => int(fields, key).is_some_and(|v| v != 0),
    }
}

/// Percentage (0..=100), clamped.
pub(crate) fn percent(fields: &JsonObject, key: &str) -> u8 {
    int(fields, key).map_or(0, |v| u8::try_from(v.clamp(0, 100)).unwrap_or(100))
}

/// Unix timestamp in seconds.
pub(crate) fn timestamp(fields: &JsonObject, key: &str) -> Option<DateTime<Utc>> {
    int(fields, key)
        .filter(|secs| *secs > 0)
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
}

#[allow(clippy::cast_possible_truncation, clippy::as_conversions)]
fn truncate(f: f64) -> i64 {
    f as i64
}
