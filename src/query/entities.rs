use crate::parser::{FieldValue, parse_number, parse_timestamp};
use chrono::{DateTime, Duration, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Comparison applied by a [`QueryFilter`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterOperator {
    Equals,
    Contains,
    StartsWith,
    EndsWith,
    Gt,
    Gte,
    Lt,
    Lte,
    Range,
    Exists,
}

impl FilterOperator {
    pub fn symbol(&self) -> &'static str {
        match self {
            FilterOperator::Equals => ":",
            FilterOperator::Contains => "contains",
            FilterOperator::StartsWith => "startsWith",
            FilterOperator::EndsWith => "endsWith",
            FilterOperator::Gt => ">",
            FilterOperator::Gte => ">=",
            FilterOperator::Lt => "<",
            FilterOperator::Lte => "<=",
            FilterOperator::Range => "range",
            FilterOperator::Exists => "exists",
        }
    }
}

/// The comparison value of a filter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Scalar(FieldValue),
    Range(FieldValue, FieldValue),
    None,
}

impl FilterValue {
    pub fn as_scalar(&self) -> Option<&FieldValue> {
        match self {
            FilterValue::Scalar(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterValue::Scalar(v) => write!(f, "{v}"),
            FilterValue::Range(low, high) => write!(f, "[{low} TO {high}]"),
            FilterValue::None => Ok(()),
        }
    }
}

/// Coerces a query literal: number first, then instant, else string.
///
/// Digit-only literals are numbers, so they are never read as epoch instants.
pub fn coerce_literal(literal: &str, reference: DateTime<Utc>) -> FieldValue {
    if let Some(n) = parse_number(literal) {
        return FieldValue::Number(n);
    }
    if let Some(ts) = parse_timestamp(literal, reference) {
        return FieldValue::Date(ts);
    }
    FieldValue::String(literal.to_string())
}

/// A single field-scoped predicate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryFilter {
    pub field: String,
    pub operator: FilterOperator,
    pub value: FilterValue,
    #[serde(default)]
    pub negate: bool,
}

impl QueryFilter {
    pub fn new(field: impl Into<String>, operator: FilterOperator, value: FilterValue) -> Self {
        Self {
            field: field.into(),
            operator,
            value,
            negate: false,
        }
    }

    pub fn equals(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self::new(field, FilterOperator::Equals, FilterValue::Scalar(value.into()))
    }

    pub fn range(
        field: impl Into<String>,
        low: impl Into<FieldValue>,
        high: impl Into<FieldValue>,
    ) -> Self {
        Self::new(
            field,
            FilterOperator::Range,
            FilterValue::Range(low.into(), high.into()),
        )
    }

    pub fn exists(field: impl Into<String>) -> Self {
        Self::new(field, FilterOperator::Exists, FilterValue::None)
    }

    pub fn negated(mut self) -> Self {
        self.negate = !self.negate;
        self
    }
}

impl fmt::Display for QueryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negate {
            write!(f, "NOT ")?;
        }
        match self.operator {
            FilterOperator::Equals => write!(f, "{}:{}", self.field, self.value),
            FilterOperator::Range => write!(f, "{}:{}", self.field, self.value),
            FilterOperator::Exists => write!(f, "{}:*", self.field),
            FilterOperator::Contains => write!(f, "{}:*{}*", self.field, self.value),
            FilterOperator::StartsWith => write!(f, "{}:{}*", self.field, self.value),
            FilterOperator::EndsWith => write!(f, "{}:*{}", self.field, self.value),
            op => write!(f, "{}:{}{}", self.field, op.symbol(), self.value),
        }
    }
}

/// Named time window, resolved against a reference time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
pub enum TimePreset {
    #[value(name = "15m")]
    #[serde(rename = "15m")]
    Last15Minutes,
    #[value(name = "1h")]
    #[serde(rename = "1h")]
    LastHour,
    #[value(name = "24h")]
    #[serde(rename = "24h")]
    Last24Hours,
    #[value(name = "7d")]
    #[serde(rename = "7d")]
    Last7Days,
    #[value(name = "30d")]
    #[serde(rename = "30d")]
    Last30Days,
    #[value(name = "all")]
    #[serde(rename = "all")]
    All,
}

impl TimePreset {
    fn span(&self) -> Option<Duration> {
        match self {
            TimePreset::Last15Minutes => Some(Duration::minutes(15)),
            TimePreset::LastHour => Some(Duration::hours(1)),
            TimePreset::Last24Hours => Some(Duration::hours(24)),
            TimePreset::Last7Days => Some(Duration::days(7)),
            TimePreset::Last30Days => Some(Duration::days(30)),
            TimePreset::All => None,
        }
    }
}

/// Inclusive time window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    /// Informational only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preset: Option<TimePreset>,
}

impl Default for TimeRange {
    fn default() -> Self {
        Self::all()
    }
}

impl TimeRange {
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self {
            from,
            to,
            preset: None,
        }
    }

    /// Covers every representable instant
    pub fn all() -> Self {
        Self {
            from: DateTime::<Utc>::MIN_UTC,
            to: DateTime::<Utc>::MAX_UTC,
            preset: Some(TimePreset::All),
        }
    }

    pub fn from_preset(preset: TimePreset, now: DateTime<Utc>) -> Self {
        match preset.span() {
            Some(span) => Self {
                from: now - span,
                to: now,
                preset: Some(preset),
            },
            None => Self::all(),
        }
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.from <= instant && instant <= self.to
    }
}

/// Everything `LogIndex::search` needs to evaluate a query
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchQuery {
    pub text: String,
    /// Combined with AND
    pub filters: Vec<QueryFilter>,
    pub time_range: TimeRange,
    pub fuzzy: bool,
    pub case_sensitive: bool,
    /// Fields to count values of over the full match set
    pub aggregate_by: Vec<String>,
    /// Caps the returned records; the total still counts every match
    pub limit: Option<usize>,
}

impl SearchQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn filter(mut self, filter: QueryFilter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn time_range(mut self, range: TimeRange) -> Self {
        self.time_range = range;
        self
    }

    pub fn fuzzy(mut self, fuzzy: bool) -> Self {
        self.fuzzy = fuzzy;
        self
    }

    pub fn case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    pub fn aggregate_by(mut self, field: impl Into<String>) -> Self {
        self.aggregate_by.push(field.into());
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Output of the query-language parser
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParsedQuery {
    pub filters: Vec<QueryFilter>,
    /// Residual free text, space-joined in encounter order
    pub text: String,
}

impl ParsedQuery {
    /// Builds a search over every instant from this parse result
    pub fn into_search_query(self) -> SearchQuery {
        SearchQuery {
            text: self.text,
            filters: self.filters,
            ..SearchQuery::default()
        }
    }
}
