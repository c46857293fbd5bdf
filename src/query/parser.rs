use super::entities::{FilterOperator, FilterValue, ParsedQuery, QueryFilter, coerce_literal};
use super::tokenizer::{OperatorToken, Token, tokenize};
use crate::parser::FieldValue;
use chrono::{DateTime, Utc};
use regex::Regex;
use std::sync::LazyLock;

static RANGE_SEPARATOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s+TO\s+").expect("valid range separator regex"));

/// Parses a query string with the current time as the date reference
pub fn parse_query(input: &str) -> ParsedQuery {
    parse_query_at(input, Utc::now())
}

/// Parses a query string.
///
/// Never fails: anything that does not form a filter expression degrades to
/// free text. `AND`/`OR` are consumed without effect, so every filter and
/// the free text combine by conjunction.
pub fn parse_query_at(input: &str, reference: DateTime<Utc>) -> ParsedQuery {
    let tokens = tokenize(input);
    let mut filters = Vec::new();
    let mut text: Vec<String> = Vec::new();
    let mut negate_next = false;
    let mut i = 0;

    while i < tokens.len() {
        match &tokens[i] {
            Token::Not => {
                negate_next = true;
                i += 1;
            }
            Token::And | Token::Or | Token::Paren(_) | Token::Operator(_) => {
                i += 1;
            }
            Token::Text(word) | Token::Value(word) | Token::Range(word) => {
                text.push(word.clone());
                negate_next = false;
                i += 1;
            }
            Token::Field(field) => {
                let (expression, consumed) = parse_field_expression(field, &tokens[i + 1..]);
                i += 1 + consumed;
                match expression {
                    FieldExpression::Filter(mut filter) => {
                        filter.negate = negate_next;
                        filters.push(coerce_filter(filter, reference));
                    }
                    FieldExpression::Text(words) => text.extend(words),
                }
                negate_next = false;
            }
        }
    }

    ParsedQuery {
        filters,
        text: text.join(" "),
    }
}

enum FieldExpression {
    /// A filter whose scalar value is still an uncoerced string
    Filter(QueryFilter),
    Text(Vec<String>),
}

/// Reads `Operator [Operator] Value|Text` after a field token.
///
/// Returns the expression and the number of tokens consumed after the field.
fn parse_field_expression(field: &str, rest: &[Token]) -> (FieldExpression, usize) {
    let mut consumed = 0;
    let mut operator = FilterOperator::Equals;
    let mut saw_operator = false;

    while let Some(Token::Operator(op)) = rest.get(consumed) {
        // a comparison after `:` overrides equality; a repeated `:` changes nothing
        if *op != OperatorToken::Colon || !saw_operator {
            operator = map_operator(*op);
        }
        saw_operator = true;
        consumed += 1;
    }

    let (raw, quoted) = match rest.get(consumed) {
        Some(Token::Range(literal)) if saw_operator => {
            consumed += 1;
            // the range literal wins over whatever operator preceded it
            return match split_range(literal) {
                Some((low, high)) => (
                    FieldExpression::Filter(QueryFilter::range(field, low, high)),
                    consumed,
                ),
                None => (FieldExpression::Text(vec![literal.clone()]), consumed),
            };
        }
        Some(Token::Value(v)) if saw_operator => (v.clone(), true),
        Some(Token::Text(v)) if saw_operator => (v.clone(), false),
        _ => return (FieldExpression::Text(vec![field.to_string()]), consumed),
    };
    consumed += 1;

    if !quoted
        && operator == FilterOperator::Equals
        && let Some(filter) = wildcard_filter(field, &raw)
    {
        return (FieldExpression::Filter(filter), consumed);
    }

    (
        FieldExpression::Filter(QueryFilter::new(
            field,
            operator,
            FilterValue::Scalar(FieldValue::String(raw)),
        )),
        consumed,
    )
}

fn map_operator(op: OperatorToken) -> FilterOperator {
    match op {
        OperatorToken::Colon => FilterOperator::Equals,
        OperatorToken::Gt => FilterOperator::Gt,
        OperatorToken::Gte => FilterOperator::Gte,
        OperatorToken::Lt => FilterOperator::Lt,
        OperatorToken::Lte => FilterOperator::Lte,
    }
}

/// `[X TO Y]` with exactly two non-empty parts
fn split_range(literal: &str) -> Option<(String, String)> {
    let inner = literal.strip_prefix('[')?.strip_suffix(']')?.trim();
    let parts: Vec<&str> = RANGE_SEPARATOR_RE.split(inner).collect();
    match parts.as_slice() {
        [low, high] if !low.trim().is_empty() && !high.trim().is_empty() => {
            Some((low.trim().to_string(), high.trim().to_string()))
        }
        _ => None,
    }
}

/// `*` → exists, `*x*` → contains, `x*` → startsWith, `*x` → endsWith
fn wildcard_filter(field: &str, raw: &str) -> Option<QueryFilter> {
    if raw == "*" {
        return Some(QueryFilter::exists(field));
    }
    let leading = raw.starts_with('*');
    let trailing = raw.ends_with('*') && raw.len() > 1;
    let core = raw.trim_matches('*');
    if core.is_empty() || core.contains('*') {
        return None;
    }
    let operator = match (leading, trailing) {
        (true, true) => FilterOperator::Contains,
        (false, true) => FilterOperator::StartsWith,
        (true, false) => FilterOperator::EndsWith,
        (false, false) => return None,
    };
    Some(QueryFilter::new(
        field,
        operator,
        FilterValue::Scalar(FieldValue::String(core.to_string())),
    ))
}

/// Coerces string literals of comparison and range filters.
///
/// String-matching operators keep their literal as text.
fn coerce_filter(mut filter: QueryFilter, reference: DateTime<Utc>) -> QueryFilter {
    let keeps_text = matches!(
        filter.operator,
        FilterOperator::Contains | FilterOperator::StartsWith | FilterOperator::EndsWith
    );
    if keeps_text {
        return filter;
    }

    filter.value = match filter.value {
        FilterValue::Scalar(FieldValue::String(s)) => {
            FilterValue::Scalar(coerce_literal(&s, reference))
        }
        FilterValue::Range(FieldValue::String(low), FieldValue::String(high)) => {
            FilterValue::Range(coerce_literal(&low, reference), coerce_literal(&high, reference))
        }
        other => other,
    };
    filter
}
