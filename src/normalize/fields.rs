// Field-level helpers: ordered preference lookup, lenient scalar coercion,
// timestamp parsing and defensive truncation
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::{Map, Value};

/// Return the first present, non-null value among `keys`, in order.
pub fn first_available<'a>(record: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| record.get(*key))
        .find(|value| !value.is_null())
}

/// Coerce a JSON value to a string. Numbers and bools are rendered,
/// nulls and containers are rejected.
pub fn to_string_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Coerce a JSON value to f64, accepting numbers and numeric strings.
pub fn to_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Coerce a JSON value to bool, accepting bools, numbers and the usual
/// string spellings. Anything else is false.
pub fn to_bool(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_i64().unwrap_or(0) != 0,
        Value::String(s) => {
            let lower = s.to_ascii_lowercase();
            lower == "true" || lower == "1"
        }
        _ => false,
    }
}

/// Truncate to at most `max` characters, respecting char boundaries.
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

/// Resolve a timestamp field that may be a plain value or a nested
/// `{"$date": ...}` wrapper, returning the raw string.
pub fn timestamp_string(record: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    let value = first_available(record, keys)?;
    let unwrapped = match value {
        Value::Object(obj) => obj.get("$date").filter(|v| !v.is_null())?,
        other => other,
    };
    to_string_value(unwrapped)
}

/// Parse an ISO-like timestamp string. Accepts RFC 3339, date-time with
/// and without seconds, and a bare date.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.naive_utc());
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(ts);
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}
