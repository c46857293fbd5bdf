use crate::config::{ParserRules, default_config};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::fs;
use std::path::Path;
use thiserror::Error;

mod entities;
pub mod patterns;
mod structured;
pub mod timestamp;

pub use entities::{FieldValue, LogRecord, ParseError, ParsedBatch, RecordId, parse_number};
pub use patterns::{LineMatch, LinePattern};
pub use timestamp::{epoch_to_datetime, find_timestamp, parse_timestamp};

/// Errors reading log input from disk
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Failed to read log file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Turns raw log text into normalized records
#[derive(Debug, Clone)]
pub struct LogParser {
    rules: ParserRules,
    reference_time: Option<DateTime<Utc>>,
}

impl Default for LogParser {
    fn default() -> Self {
        Self::new(default_config().parser.clone())
    }
}

impl LogParser {
    pub fn new(rules: ParserRules) -> Self {
        Self {
            rules,
            reference_time: None,
        }
    }

    /// Pins the ingestion time used for lines without a usable timestamp
    pub fn with_reference_time(mut self, now: DateTime<Utc>) -> Self {
        self.reference_time = Some(now);
        self
    }

    fn now(&self) -> DateTime<Utc> {
        self.reference_time.unwrap_or_else(Utc::now)
    }

    /// Parses one line; blank lines and undecodable structured lines yield `None`
    pub fn parse_line(&self, raw: &str, file: &str, line_number: usize) -> Option<LogRecord> {
        self.try_parse_line(raw, file, line_number).ok().flatten()
    }

    /// Parses one line, surfacing structured-decode failures.
    ///
    /// Free-text lines always produce a record; the only error path is a
    /// line that looks like a key/value object but does not decode as one.
    pub fn try_parse_line(
        &self,
        raw: &str,
        file: &str,
        line_number: usize,
    ) -> Result<Option<LogRecord>, ParseError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }

        let now = self.now();

        if structured::looks_structured(trimmed) {
            let obj = structured::decode_object(trimmed, self.rules.lenient_json)
                .map_err(|reason| ParseError::new(line_number, raw, reason))?;
            let record = structured::record_from_object(&obj, raw, file, now)
                .with_line_number(line_number);
            return Ok(Some(record));
        }

        let (found, pattern) = patterns::match_line(trimmed, now);
        tracing::trace!(
            line_number,
            pattern = pattern.map(|p| p.name()).unwrap_or("fallback"),
            "matched free-text line"
        );

        let mut record = LogRecord::new(
            found.timestamp.unwrap_or(now),
            found.level,
            found.message,
            file,
            raw,
        )
        .with_line_number(line_number);

        if self.rules.extract_key_values {
            record.fields = patterns::extract_key_values(&record.message);
        }

        Ok(Some(record))
    }

    /// Parses a whole document.
    ///
    /// A document that is a JSON array is read element by element; anything
    /// else is read line by line. Errors past `max_errors` are only counted.
    pub fn parse_batch(&self, text: &str, file: &str) -> ParsedBatch {
        if let Some(batch) = self.parse_json_array(text, file) {
            return batch;
        }

        let mut batch = ParsedBatch::new(file, text.len());
        self.parse_lines_into(&mut batch, text.lines(), 1);
        batch
    }

    /// Parses `lines` into `batch`, numbering them from `first_line_number`
    pub fn parse_lines_into<'a>(
        &self,
        batch: &mut ParsedBatch,
        lines: impl IntoIterator<Item = &'a str>,
        first_line_number: usize,
    ) {
        let file = batch.file_name.clone();
        for (offset, line) in lines.into_iter().enumerate() {
            let line_number = first_line_number + offset;
            batch.total_lines += 1;
            match self.try_parse_line(line, &file, line_number) {
                Ok(Some(record)) => batch.records.push(record),
                Ok(None) => {}
                Err(error) => {
                    tracing::debug!(%error, "skipping undecodable structured line");
                    batch.push_error(error, self.rules.max_errors);
                }
            }
        }
    }

    /// Parses a document that is a JSON array of objects; `None` for anything else
    pub fn parse_json_array(&self, text: &str, file: &str) -> Option<ParsedBatch> {
        let trimmed = text.trim();
        if !(trimmed.starts_with('[') && trimmed.ends_with(']')) {
            return None;
        }
        let Ok(Value::Array(items)) = serde_json::from_str::<Value>(trimmed) else {
            return None;
        };

        let now = self.now();
        let mut batch = ParsedBatch::new(file, text.len());
        batch.total_lines = items.len();

        for (idx, item) in items.iter().enumerate() {
            let line_number = idx + 1;
            let raw = item.to_string();
            match item {
                Value::Object(obj) => {
                    let record = structured::record_from_object(obj, &raw, file, now)
                        .with_line_number(line_number);
                    batch.records.push(record);
                }
                _ => batch.push_error(
                    ParseError::new(line_number, raw, "Array element is not a JSON object"),
                    self.rules.max_errors,
                ),
            }
        }

        Some(batch)
    }
}

/// Parses a single line with the default rules
pub fn parse_line(raw: &str, file: &str, line_number: usize) -> Option<LogRecord> {
    LogParser::default().parse_line(raw, file, line_number)
}

/// Parses a whole document with the default rules
pub fn parse_batch(text: &str, file: &str) -> ParsedBatch {
    LogParser::default().parse_batch(text, file)
}

/// Reads and parses a log file; the batch is named after the file name
pub fn parse_log_file(path: impl AsRef<Path>, parser: &LogParser) -> Result<ParsedBatch, IngestError> {
    let path = path.as_ref();
    let file = read_log_file(path)?;
    let mut batch = parser.parse_batch(&file.text, &file_label(path));
    batch.file_size = file.size;
    Ok(batch)
}

/// Text of a log file, with invalid UTF-8 replaced
#[derive(Debug, Clone)]
pub struct LogFile {
    pub text: String,
    /// Size on disk in bytes, before decoding
    pub size: usize,
}

pub fn read_log_file(path: &Path) -> Result<LogFile, IngestError> {
    let bytes = fs::read(path).map_err(|source| IngestError::Read {
        path: path.display().to_string(),
        source,
    })?;
    Ok(LogFile {
        text: String::from_utf8_lossy(&bytes).into_owned(),
        size: bytes.len(),
    })
}

/// The name records from `path` are attributed to
pub fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn parser() -> LogParser {
        LogParser::default().with_reference_time(Utc.with_ymd_and_hms(2025, 10, 19, 12, 0, 0).unwrap())
    }

    #[test]
    fn test_blank_lines_yield_nothing() {
        assert!(parser().parse_line("   \t", "a.log", 1).is_none());
        assert!(matches!(parser().try_parse_line("", "a.log", 1), Ok(None)));
    }

    #[test]
    fn test_structured_failure_is_an_error_not_text() {
        let err = parser()
            .try_parse_line("{\"level\": \"error\",}", "a.log", 7)
            .unwrap_err();
        assert_eq!(err.line_number, 7);
        assert!(err.reason.starts_with("Invalid JSON"));
    }

    #[test]
    fn test_raw_is_preserved_verbatim() {
        let line = "  2025-10-01T12:00:00Z INFO started  ";
        let record = parser().parse_line(line, "a.log", 3).unwrap();
        assert_eq!(record.raw, line);
        assert_eq!(record.message, "started");
        assert_eq!(record.line_number, Some(3));
    }

    #[test]
    fn test_error_cap() {
        let mut rules = ParserRules::default();
        rules.max_errors = 2;
        let parser = LogParser::new(rules);
        let text = "{bad}\n{bad}\n{bad}\nINFO: fine\n";
        let batch = parser.parse_batch(text, "a.log");

        assert_eq!(batch.errors.len(), 2);
        assert_eq!(batch.dropped_errors, 1);
        assert_eq!(batch.records.len(), 1);
        assert_eq!(batch.total_lines, 4);
    }
}
