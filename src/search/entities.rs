use crate::level::Level;
use crate::parser::LogRecord;
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Value counts per aggregated field: field → value → count
pub type Aggregations = BTreeMap<String, BTreeMap<String, usize>>;

#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchResult {
    /// Matches, newest first
    pub records: Vec<LogRecord>,
    /// Number of matches before any limit was applied
    pub total: usize,
    #[serde(rename = "elapsed_ms", serialize_with = "serialize_millis")]
    pub elapsed: Duration,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aggregations: Option<Aggregations>,
}

impl SearchResult {
    pub fn empty(elapsed: Duration) -> Self {
        Self {
            elapsed,
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }
}

fn serialize_millis<S: Serializer>(elapsed: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(elapsed.as_secs_f64() * 1000.0)
}

/// Inferred type of a field across the records that carry it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Number,
    Date,
    Boolean,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Number => "number",
            FieldType::Date => "date",
            FieldType::Boolean => "boolean",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldSuggestion {
    pub field: String,
    pub field_type: FieldType,
    /// Number of distinct values currently held
    pub cardinality: usize,
    /// Most frequent values first
    pub examples: Vec<String>,
}

/// Summary of the indexed record set
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IndexStats {
    pub total_entries: usize,
    pub level_counts: BTreeMap<Level, usize>,
    pub file_counts: BTreeMap<String, usize>,
    pub earliest: Option<DateTime<Utc>>,
    pub latest: Option<DateTime<Utc>>,
    pub distinct_terms: usize,
    pub field_count: usize,
}
