//! Query language parsing
//!
//! A query is a mix of field filters and free text. Filters and text
//! combine with AND; `AND`/`OR` keywords are accepted but do not change
//! the evaluation.
//!
//! # Syntax
//!
//! ```text
//! timeout database                  free text
//! level:ERROR                       equality
//! message:"connection reset"        equality with a phrase
//! status:[500 TO 599]               inclusive range
//! latency:>250  latency:<=1000      comparisons (>, >=, <, <=)
//! NOT level:DEBUG                   negated filter
//! user:*                            field is present
//! path:/api*  host:*prod*  file:*.gz   starts with / contains / ends with
//! ```
//!
//! Values are read as numbers when possible, then as timestamps, else as
//! strings. Malformed expressions fall back to free text; parsing never
//! fails.

pub mod entities;
pub mod parser;
pub mod tokenizer;

pub use entities::{
    FilterOperator, FilterValue, ParsedQuery, QueryFilter, SearchQuery, TimePreset, TimeRange,
    coerce_literal,
};
pub use parser::{parse_query, parse_query_at};
pub use tokenizer::{OperatorToken, Token, tokenize};
