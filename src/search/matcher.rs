use crate::level::{Level, level_from_number};
use crate::parser::{FieldValue, LogRecord, parse_timestamp};
use crate::query::{FilterOperator, FilterValue, QueryFilter};
use chrono::{DateTime, Utc};
use std::cmp::Ordering;

/// True when the record satisfies every filter
pub fn matches_all(record: &LogRecord, filters: &[QueryFilter], case_sensitive: bool) -> bool {
    filters
        .iter()
        .all(|filter| matches_filter(record, filter, case_sensitive))
}

/// Evaluates one filter against a record.
///
/// A field the record does not carry satisfies every operator except
/// `exists`, whichever way the filter is negated.
pub fn matches_filter(record: &LogRecord, filter: &QueryFilter, case_sensitive: bool) -> bool {
    let Some(actual) = record.field(&filter.field) else {
        return match filter.operator {
            FilterOperator::Exists => filter.negate,
            _ => true,
        };
    };

    let outcome = if filter.field == "level" {
        compare_levels(record.level, filter.operator, &filter.value)
            .unwrap_or_else(|| evaluate(&actual, filter.operator, &filter.value, case_sensitive))
    } else {
        evaluate(&actual, filter.operator, &filter.value, case_sensitive)
    };

    outcome != filter.negate
}

fn evaluate(
    actual: &FieldValue,
    operator: FilterOperator,
    expected: &FilterValue,
    case_sensitive: bool,
) -> bool {
    match operator {
        FilterOperator::Exists => true,
        FilterOperator::Equals => expected
            .as_scalar()
            .is_some_and(|e| values_equal(actual, e, case_sensitive)),
        FilterOperator::Contains | FilterOperator::StartsWith | FilterOperator::EndsWith => expected
            .as_scalar()
            .is_some_and(|e| text_matches(operator, actual, e, case_sensitive)),
        FilterOperator::Gt | FilterOperator::Gte | FilterOperator::Lt | FilterOperator::Lte => {
            let Some(expected) = expected.as_scalar() else {
                return false;
            };
            match (comparable_number(actual), comparable_number(expected)) {
                (Some(a), Some(e)) => a
                    .partial_cmp(&e)
                    .is_some_and(|ord| ordering_satisfies(operator, ord)),
                _ => false,
            }
        }
        FilterOperator::Range => match expected {
            FilterValue::Range(low, high) => {
                match (
                    comparable_number(actual),
                    comparable_number(low),
                    comparable_number(high),
                ) {
                    (Some(a), Some(lo), Some(hi)) => lo <= a && a <= hi,
                    _ => false,
                }
            }
            _ => false,
        },
    }
}

fn ordering_satisfies(operator: FilterOperator, ord: Ordering) -> bool {
    match operator {
        FilterOperator::Gt => ord == Ordering::Greater,
        FilterOperator::Gte => ord != Ordering::Less,
        FilterOperator::Lt => ord == Ordering::Less,
        FilterOperator::Lte => ord != Ordering::Greater,
        _ => false,
    }
}

/// Level filters compare by severity after normalizing both sides.
///
/// Returns `None` when the filter value is not a recognizable level, so
/// the generic string rules apply.
fn compare_levels(actual: Level, operator: FilterOperator, expected: &FilterValue) -> Option<bool> {
    match (operator, expected) {
        (FilterOperator::Equals, FilterValue::Scalar(v)) => Some(actual == level_of(v)?),
        (
            FilterOperator::Gt | FilterOperator::Gte | FilterOperator::Lt | FilterOperator::Lte,
            FilterValue::Scalar(v),
        ) => Some(ordering_satisfies(operator, actual.cmp(&level_of(v)?))),
        (FilterOperator::Range, FilterValue::Range(low, high)) => {
            let (low, high) = (level_of(low)?, level_of(high)?);
            Some(low <= actual && actual <= high)
        }
        _ => None,
    }
}

fn level_of(value: &FieldValue) -> Option<Level> {
    match value {
        FieldValue::String(s) => s.parse::<Level>().ok(),
        FieldValue::Number(n) => Some(level_from_number(*n)),
        _ => None,
    }
}

/// Numeric view used by comparisons; instants become epoch milliseconds
fn comparable_number(value: &FieldValue) -> Option<f64> {
    value
        .as_number()
        .or_else(|| as_instant(value).map(|ts| ts.timestamp_millis() as f64))
}

fn as_instant(value: &FieldValue) -> Option<DateTime<Utc>> {
    match value {
        FieldValue::Date(d) => Some(*d),
        FieldValue::String(s) => parse_timestamp(s, Utc::now()),
        _ => None,
    }
}

fn values_equal(actual: &FieldValue, expected: &FieldValue, case_sensitive: bool) -> bool {
    if let (Some(a), Some(e)) = (actual.as_number(), expected.as_number()) {
        return a == e;
    }
    if let (Some(a), Some(e)) = (as_instant(actual), as_instant(expected)) {
        return a == e;
    }
    let (a, e) = (actual.to_string(), expected.to_string());
    if case_sensitive {
        a == e
    } else {
        a.to_lowercase() == e.to_lowercase()
    }
}

fn text_matches(
    operator: FilterOperator,
    actual: &FieldValue,
    expected: &FieldValue,
    case_sensitive: bool,
) -> bool {
    let (mut haystack, mut needle) = (actual.to_string(), expected.to_string());
    if !case_sensitive {
        haystack = haystack.to_lowercase();
        needle = needle.to_lowercase();
    }
    match operator {
        FilterOperator::Contains => haystack.contains(&needle),
        FilterOperator::StartsWith => haystack.starts_with(&needle),
        FilterOperator::EndsWith => haystack.ends_with(&needle),
        _ => false,
    }
}
