//! Timestamp recognition for log lines and structured fields.
//!
//! Recognized forms:
//!
//! ```text
//! 2025-10-01T12:00:00Z            RFC 3339 / ISO 8601, optional fraction and offset
//! 2025-10-01 12:00:00,123         space separator, comma fraction (log4j)
//! 2025-10-01                      date only, midnight UTC
//! 2025/10/01 12:00:00             slash delimited, year first
//! 10/01/2025 12:00:00             slash delimited, month first
//! 01/Oct/2025:12:00:00 +0000      Apache common log format
//! Oct  1 12:00:00                 syslog, year inferred
//! 1759320000 / 1759320000123      epoch seconds / milliseconds
//! ```
//!
//! Timestamps without an offset are taken as UTC.

use crate::parser::entities::parse_number;
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use regex::Regex;
use std::sync::LazyLock;

/// Regex fragment for every textual timestamp form, most specific first
pub(crate) const TEXT_TIMESTAMP: &str = concat!(
    r"\d{4}-\d{2}-\d{2}[T ]\d{2}:\d{2}:\d{2}(?:[.,]\d+)?(?:Z|[+-]\d{2}:?\d{2})?",
    r"|\d{4}/\d{2}/\d{2}[T ]\d{2}:\d{2}:\d{2}(?:\.\d+)?",
    r"|\d{1,2}/\d{1,2}/\d{4}[T ]\d{2}:\d{2}:\d{2}(?:\.\d+)?",
    r"|\d{2}/[A-Z][a-z]{2}/\d{4}:\d{2}:\d{2}:\d{2}\s[+-]\d{4}",
    r"|(?:Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Oct|Nov|Dec)\s+\d{1,2}\s\d{2}:\d{2}:\d{2}(?:\.\d+)?",
    r"|\d{4}-\d{2}-\d{2}",
);

/// Epoch seconds or milliseconds, only trusted at the start of a line
pub(crate) const EPOCH_TIMESTAMP: &str = r"\d{10}(?:\d{3})?(?:\.\d+)?";

static SCAN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?:^|\b)(?:{TEXT_TIMESTAMP})")).expect("valid timestamp scan regex")
});
static COMMA_FRACTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{2}:\d{2}:\d{2}),(\d+)").expect("valid comma fraction regex"));
static SYSLOG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Z][a-z]{2})\s+(\d{1,2})\s+(\d{2}):(\d{2}):(\d{2})(?:\.(\d+))?$")
        .expect("valid syslog timestamp regex")
});

const OFFSET_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f %z",
    "%d/%b/%Y:%H:%M:%S %z",
];

const NAIVE_FORMATS: [&str; 7] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S%.f",
    "%Y/%m/%dT%H:%M:%S%.f",
    "%m/%d/%Y %H:%M:%S%.f",
    "%m/%d/%YT%H:%M:%S%.f",
    "%d/%b/%Y:%H:%M:%S",
];

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%Y/%m/%d"];

const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Parses a complete timestamp string.
///
/// `reference` is the ingestion time, used to infer the year of syslog
/// timestamps. Returns `None` for anything unrecognized.
pub fn parse_timestamp(input: &str, reference: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let s = input.trim().trim_start_matches('[').trim_end_matches(']').trim();
    if s.is_empty() {
        return None;
    }

    if s.bytes().all(|b| b.is_ascii_digit() || b == b'.') {
        return parse_number(s).and_then(epoch_to_datetime);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    let normalized = COMMA_FRACTION_RE.replace(s, "$1.$2");
    let normalized = match normalized.strip_suffix('Z') {
        Some(stripped) => format!("{stripped}+00:00"),
        None => normalized.into_owned(),
    };

    for format in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(&normalized, format) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(&normalized, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(&normalized, format) {
            return date.and_hms_opt(0, 0, 0).map(|naive| Utc.from_utc_datetime(&naive));
        }
    }

    parse_syslog(&normalized, reference)
}

/// Converts an epoch number: below 10^12 it counts seconds, otherwise milliseconds
pub fn epoch_to_datetime(value: f64) -> Option<DateTime<Utc>> {
    if !value.is_finite() || value < 0.0 {
        return None;
    }
    let millis = if value < 1e12 { value * 1000.0 } else { value };
    DateTime::from_timestamp_millis(millis.round() as i64)
}

/// Finds the first textual timestamp anywhere in `text`.
///
/// Bare epoch numbers are not considered; inside free text they are far
/// more often identifiers than times.
pub fn find_timestamp(text: &str, reference: DateTime<Utc>) -> Option<DateTime<Utc>> {
    SCAN_RE
        .find_iter(text)
        .find_map(|m| parse_timestamp(m.as_str(), reference))
}

/// Syslog timestamps carry no year. The reference year is assumed unless that
/// places the instant more than a day after the reference, in which case the
/// line is taken to be from the previous year.
fn parse_syslog(s: &str, reference: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let caps = SYSLOG_RE.captures(s)?;
    let month = MONTHS.iter().position(|m| *m == &caps[1])? as u32 + 1;
    let day: u32 = caps[2].parse().ok()?;
    let hour: u32 = caps[3].parse().ok()?;
    let minute: u32 = caps[4].parse().ok()?;
    let second: u32 = caps[5].parse().ok()?;
    let millis: u32 = caps
        .get(6)
        .map(|m| {
            let digits: String = m.as_str().chars().chain("000".chars()).take(3).collect();
            digits.parse().unwrap_or(0)
        })
        .unwrap_or(0);

    let build = |year: i32| {
        NaiveDate::from_ymd_opt(year, month, day)
            .and_then(|d| d.and_hms_milli_opt(hour, minute, second, millis))
            .map(|naive| Utc.from_utc_datetime(&naive))
    };

    let candidate = build(reference.year())?;
    if candidate > reference + Duration::days(1) {
        build(reference.year() - 1)
    } else {
        Some(candidate)
    }
}
