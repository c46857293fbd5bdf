use crate::level::Level;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Session-unique identifier of a record
pub type RecordId = Uuid;

/// A typed scalar carried in a record's structured fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Bool(bool),
    Date(DateTime<Utc>),
    String(String),
}

impl FieldValue {
    /// Numeric view of the value; dates become epoch milliseconds
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            FieldValue::Date(d) => Some(d.timestamp_millis() as f64),
            FieldValue::String(s) => parse_number(s),
            FieldValue::Bool(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Number(n) => write!(f, "{n}"),
            FieldValue::Bool(b) => write!(f, "{b}"),
            FieldValue::Date(d) => f.write_str(&d.to_rfc3339_opts(SecondsFormat::Millis, true)),
            FieldValue::String(s) => f.write_str(s),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::String(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::String(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Number(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(value: DateTime<Utc>) -> Self {
        FieldValue::Date(value)
    }
}

/// Parses a finite decimal number; rejects `inf`, `NaN` and digit-free strings
pub fn parse_number(s: &str) -> Option<f64> {
    let s = s.trim();
    if !s.bytes().any(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// A normalized log record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    pub id: RecordId,
    pub timestamp: DateTime<Utc>,
    pub level: Level,
    pub message: String,
    /// Name of the file the record was read from
    pub file: String,
    /// The original, unaltered line
    pub raw: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, FieldValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    /// 1-indexed line in the origin file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_number: Option<usize>,
}

impl LogRecord {
    /// Creates a record with a fresh id and no fields or labels
    pub fn new(
        timestamp: DateTime<Utc>,
        level: Level,
        message: impl Into<String>,
        file: impl Into<String>,
        raw: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp,
            level,
            message: message.into(),
            file: file.into(),
            raw: raw.into(),
            fields: BTreeMap::new(),
            source: None,
            service: None,
            host: None,
            line_number: None,
        }
    }

    pub fn with_line_number(mut self, line_number: usize) -> Self {
        self.line_number = Some(line_number);
        self
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service = Some(service.into());
        self
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    fn label(&self, label: Option<&str>, name: &str) -> Option<FieldValue> {
        label
            .map(FieldValue::from)
            .or_else(|| self.fields.get(name).cloned())
    }

    /// Resolves a field name against the record.
    ///
    /// The standard attributes are looked up directly; any other name
    /// resolves against the structured fields. Unset labels fall back to a
    /// structured field of the same name.
    pub fn field(&self, name: &str) -> Option<FieldValue> {
        match name {
            "timestamp" => Some(FieldValue::Date(self.timestamp)),
            "level" => Some(FieldValue::String(self.level.as_str().to_string())),
            "message" => Some(FieldValue::String(self.message.clone())),
            "file" => Some(FieldValue::String(self.file.clone())),
            "source" => self.label(self.source.as_deref(), name),
            "service" => self.label(self.service.as_deref(), name),
            "host" => self.label(self.host.as_deref(), name),
            "line" => self.line_number.map(|n| FieldValue::Number(n as f64)),
            _ => self.fields.get(name).cloned(),
        }
    }
}

/// A line that looked structured but could not be decoded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("line {line_number}: {reason}")]
pub struct ParseError {
    pub line_number: usize,
    pub raw: String,
    pub reason: String,
}

impl ParseError {
    pub fn new(line_number: usize, raw: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            line_number,
            raw: raw.into(),
            reason: reason.into(),
        }
    }
}

/// The output of one ingestion pass
#[derive(Debug, Clone, Default, Serialize)]
pub struct ParsedBatch {
    pub records: Vec<LogRecord>,
    pub errors: Vec<ParseError>,
    /// Errors not kept because the error cap was reached
    pub dropped_errors: usize,
    pub total_lines: usize,
    pub file_name: String,
    pub file_size: usize,
}

impl ParsedBatch {
    pub fn new(file_name: impl Into<String>, file_size: usize) -> Self {
        Self {
            file_name: file_name.into(),
            file_size,
            ..Self::default()
        }
    }

    /// Records an error unless `max_errors` have already been kept
    pub fn push_error(&mut self, error: ParseError, max_errors: usize) {
        if self.errors.len() < max_errors {
            self.errors.push(error);
        } else {
            self.dropped_errors += 1;
        }
    }

    pub fn error_count(&self) -> usize {
        self.errors.len() + self.dropped_errors
    }
}
