use super::timestamp::{EPOCH_TIMESTAMP, TEXT_TIMESTAMP, find_timestamp, parse_timestamp};
use crate::level::{Level, normalize_level};
use crate::parser::entities::{FieldValue, parse_number};
use chrono::{DateTime, Utc};
use regex::{Captures, Regex};
use std::collections::BTreeMap;
use std::sync::LazyLock;

/// Level keywords, longer spellings first so alternation prefers them
const LEVEL_WORD: &str = r"(?i:TRACE|VERBOSE|DEBUG|INFORMATION|INFO|NOTICE|WARNING|WARN|ERROR|ERR|SEVERE|FATAL|CRITICAL|CRIT|PANIC|EMERG)";

/// What may follow a bare level: `:` or `|`, a spaced ` - `, whitespace or the line end.
/// A level glued to a word (`Error-prone`) is not a level column.
const AFTER_LEVEL: &str = r"(?:\s*[:|]\s*|\s+-\s+|\s+|$)";

fn build(pattern: String) -> Regex {
    Regex::new(&pattern).expect("valid line pattern regex")
}

static TS_LEVEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    build(format!(
        r"^\[?(?P<ts>{TEXT_TIMESTAMP}|{EPOCH_TIMESTAMP})\]?\s+(?P<level>{LEVEL_WORD}){AFTER_LEVEL}(?P<msg>.*)$"
    ))
});
static TS_BRACKET_LEVEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    build(format!(
        r"^\[?(?P<ts>{TEXT_TIMESTAMP}|{EPOCH_TIMESTAMP})\]?\s+\[\s*(?P<level>{LEVEL_WORD})\s*\]\s*[:|-]?\s*(?P<msg>.*)$"
    ))
});
static LEVEL_TS_RE: LazyLock<Regex> = LazyLock::new(|| {
    build(format!(
        r"^\[?(?P<level>{LEVEL_WORD})\]?\s+\[?(?P<ts>{TEXT_TIMESTAMP})(?:\]|\s+|$)\s*(?:[:|]\s*|-\s+)?(?P<msg>.*)$"
    ))
});
static LEVEL_DELIMITED_RE: LazyLock<Regex> = LazyLock::new(|| {
    build(format!(
        r"^\[?\s*(?P<level>{LEVEL_WORD})(?:\s*\]|\s*[:|]|\s+-\s)\s*(?P<msg>.*)$"
    ))
});
static LEVEL_SCAN_RE: LazyLock<Regex> =
    LazyLock::new(|| build(format!(r"\b(?P<level>{LEVEL_WORD})\b")));
static KEY_VALUE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:^|\s)(?P<key>[A-Za-z_][\w.-]*)=(?P<value>"(?:[^"\\]|\\.)*"|[^\s"]+)"#)
        .expect("valid key value regex")
});

/// What a free-text matcher extracted from a line.
///
/// `timestamp` is `None` when the line carries none, or when the captured
/// text turned out not to be a valid instant; callers substitute the
/// ingestion time.
#[derive(Debug, Clone, PartialEq)]
pub struct LineMatch {
    pub timestamp: Option<DateTime<Utc>>,
    pub level: Level,
    pub message: String,
}

/// One entry of the free-text cascade
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinePattern {
    /// `2025-10-01T12:00:00Z ERROR message`
    TimestampLevel,
    /// `2025-10-01T12:00:00Z [ERROR] message`
    TimestampBracketedLevel,
    /// `ERROR 2025-10-01T12:00:00Z message`
    LevelTimestamp,
    /// `ERROR: message`, `[ERROR] message`
    LevelDelimited,
}

/// Matchers in the order they are tried; the first match wins
pub const CASCADE: [LinePattern; 4] = [
    LinePattern::TimestampLevel,
    LinePattern::TimestampBracketedLevel,
    LinePattern::LevelTimestamp,
    LinePattern::LevelDelimited,
];

impl LinePattern {
    pub fn name(&self) -> &'static str {
        match self {
            LinePattern::TimestampLevel => "timestamp-level",
            LinePattern::TimestampBracketedLevel => "timestamp-bracketed-level",
            LinePattern::LevelTimestamp => "level-timestamp",
            LinePattern::LevelDelimited => "level-delimited",
        }
    }

    fn regex(&self) -> &'static Regex {
        match self {
            LinePattern::TimestampLevel => &TS_LEVEL_RE,
            LinePattern::TimestampBracketedLevel => &TS_BRACKET_LEVEL_RE,
            LinePattern::LevelTimestamp => &LEVEL_TS_RE,
            LinePattern::LevelDelimited => &LEVEL_DELIMITED_RE,
        }
    }

    pub fn try_match(&self, line: &str, reference: DateTime<Utc>) -> Option<LineMatch> {
        let caps = self.regex().captures(line)?;
        Some(line_match(&caps, reference))
    }
}

fn line_match(caps: &Captures<'_>, reference: DateTime<Utc>) -> LineMatch {
    LineMatch {
        timestamp: caps
            .name("ts")
            .and_then(|ts| parse_timestamp(ts.as_str(), reference)),
        level: caps
            .name("level")
            .map(|level| normalize_level(level.as_str()))
            .unwrap_or(Level::Info),
        message: caps
            .name("msg")
            .map(|msg| msg.as_str().trim().to_string())
            .unwrap_or_default(),
    }
}

/// Runs the cascade over a trimmed line, falling back to a keyword scan.
///
/// The fallback never fails: the level is the first level keyword found
/// anywhere in the line (INFO if none), the timestamp the first textual
/// timestamp found, and the message the whole line.
pub fn match_line(line: &str, reference: DateTime<Utc>) -> (LineMatch, Option<LinePattern>) {
    for pattern in CASCADE {
        if let Some(found) = pattern.try_match(line, reference) {
            return (found, Some(pattern));
        }
    }

    let level = LEVEL_SCAN_RE
        .captures(line)
        .and_then(|caps| caps.name("level").map(|m| normalize_level(m.as_str())))
        .unwrap_or(Level::Info);

    let fallback = LineMatch {
        timestamp: find_timestamp(line, reference),
        level,
        message: line.to_string(),
    };
    (fallback, None)
}

/// Lifts logfmt-style `key=value` pairs out of a message
pub fn extract_key_values(message: &str) -> BTreeMap<String, FieldValue> {
    let mut fields = BTreeMap::new();

    for caps in KEY_VALUE_RE.captures_iter(message) {
        let key = caps["key"].to_string();
        let raw_value = &caps["value"];

        let value = if let Some(quoted) = raw_value
            .strip_prefix('"')
            .and_then(|v| v.strip_suffix('"'))
        {
            FieldValue::String(quoted.replace("\\\"", "\"").replace("\\\\", "\\"))
        } else if let Some(n) = parse_number(raw_value) {
            FieldValue::Number(n)
        } else if raw_value.eq_ignore_ascii_case("true") {
            FieldValue::Bool(true)
        } else if raw_value.eq_ignore_ascii_case("false") {
            FieldValue::Bool(false)
        } else {
            FieldValue::String(raw_value.to_string())
        };

        fields.insert(key, value);
    }

    fields
}
