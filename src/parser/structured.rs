use super::timestamp::{epoch_to_datetime, parse_timestamp};
use crate::level::{Level, level_from_number, normalize_level};
use crate::parser::entities::{FieldValue, LogRecord};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

const TIMESTAMP_KEYS: [&str; 5] = ["@timestamp", "timestamp", "ts", "time", "datetime"];
const LEVEL_KEYS: [&str; 4] = ["level", "severity", "priority", "loglevel"];
const MESSAGE_KEYS: [&str; 5] = ["message", "msg", "text", "content", "description"];
const SOURCE_KEYS: [&str; 3] = ["source", "logger", "component"];
const SERVICE_KEYS: [&str; 3] = ["service", "service_name", "app"];
const HOST_KEYS: [&str; 2] = ["host", "hostname"];

/// Whether a trimmed line should be decoded as a key/value record
pub fn looks_structured(trimmed: &str) -> bool {
    trimmed.starts_with('{') && trimmed.ends_with('}')
}

/// Decodes a structured line into its top-level object
pub fn decode_object(text: &str, lenient: bool) -> Result<Map<String, Value>, String> {
    let value = if lenient {
        json5::from_str::<Value>(text).map_err(|e| format!("Invalid JSON5: {e}"))?
    } else {
        serde_json::from_str::<Value>(text).map_err(|e| format!("Invalid JSON: {e}"))?
    };

    match value {
        Value::Object(map) => Ok(map),
        other => Err(format!("Expected a JSON object, found {}", json_kind(&other))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Builds a record from a decoded object.
///
/// Keys consumed for timestamp, level and message are not repeated in the
/// structured fields; label keys (source, service, host) are.
pub fn record_from_object(
    obj: &Map<String, Value>,
    raw: &str,
    file: &str,
    reference: DateTime<Utc>,
) -> LogRecord {
    let mut consumed: Vec<&str> = Vec::with_capacity(3);

    let timestamp = TIMESTAMP_KEYS
        .iter()
        .find_map(|key| {
            let parsed = match obj.get(*key)? {
                Value::String(s) => parse_timestamp(s, reference),
                Value::Number(n) => n.as_f64().and_then(epoch_to_datetime),
                _ => None,
            };
            parsed.map(|ts| (*key, ts))
        })
        .map(|(key, ts)| {
            consumed.push(key);
            ts
        })
        .unwrap_or(reference);

    let level = LEVEL_KEYS
        .iter()
        .find_map(|key| {
            let level = match obj.get(*key)? {
                Value::String(s) => normalize_level(s),
                Value::Number(n) => level_from_number(n.as_f64()?),
                _ => return None,
            };
            Some((*key, level))
        })
        .map(|(key, level)| {
            consumed.push(key);
            level
        })
        .unwrap_or(Level::Info);

    let message = MESSAGE_KEYS
        .iter()
        .find_map(|key| {
            let text = match obj.get(*key)? {
                Value::String(s) => s.clone(),
                Value::Null => return None,
                other => other.to_string(),
            };
            Some((*key, text))
        })
        .map(|(key, text)| {
            consumed.push(key);
            text
        })
        .unwrap_or_else(|| Value::Object(obj.clone()).to_string());

    let mut record = LogRecord::new(timestamp, level, message, file, raw);
    record.source = first_label(obj, &SOURCE_KEYS);
    record.service = first_label(obj, &SERVICE_KEYS);
    record.host = first_label(obj, &HOST_KEYS);

    for (key, value) in obj {
        if consumed.contains(&key.as_str()) {
            continue;
        }
        if let Some(field) = field_value(value) {
            record.fields.insert(key.clone(), field);
        }
    }

    record
}

fn first_label(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match obj.get(*key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// Nested arrays and objects are kept as compact JSON text; nulls are dropped
fn field_value(value: &Value) -> Option<FieldValue> {
    match value {
        Value::Null => None,
        Value::Bool(b) => Some(FieldValue::Bool(*b)),
        Value::Number(n) => n.as_f64().map(FieldValue::Number),
        Value::String(s) => Some(FieldValue::String(s.clone())),
        nested => Some(FieldValue::String(nested.to_string())),
    }
}
