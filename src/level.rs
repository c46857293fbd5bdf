use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Canonical severity of a log record, ordered from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Level {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
}

impl Level {
    pub const ALL: [Level; 6] = [
        Level::Trace,
        Level::Debug,
        Level::Info,
        Level::Warn,
        Level::Error,
        Level::Fatal,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Trace => "TRACE",
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
            Level::Fatal => "FATAL",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned by the strict [`FromStr`] implementation for unknown tokens
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown log level: '{0}'")]
pub struct UnknownLevel(pub String);

impl FromStr for Level {
    type Err = UnknownLevel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        lookup_alias(s).ok_or_else(|| UnknownLevel(s.to_string()))
    }
}

fn lookup_alias(token: &str) -> Option<Level> {
    let level = match token.trim().to_ascii_lowercase().as_str() {
        "trace" | "trc" | "verbose" | "finest" | "finer" | "t" => Level::Trace,
        "debug" | "dbg" | "fine" | "d" => Level::Debug,
        "info" | "inf" | "information" | "informational" | "notice" | "i" => Level::Info,
        "warn" | "warning" | "wrn" | "w" => Level::Warn,
        "error" | "err" | "eror" | "severe" | "e" => Level::Error,
        "fatal" | "critical" | "crit" | "panic" | "emerg" | "emergency" | "alert" | "ftl"
        | "f" => Level::Fatal,
        _ => return None,
    };
    Some(level)
}

/// Maps any level token onto one of the six canonical levels.
///
/// Matching is case-insensitive and tolerant of surrounding whitespace.
/// Unrecognized tokens normalize to [`Level::Info`].
pub fn normalize_level(token: &str) -> Level {
    lookup_alias(token).unwrap_or(Level::Info)
}

/// Maps a numeric level as emitted by structured loggers.
///
/// Values of 10 and above follow the pino/bunyan scale (10 trace .. 60 fatal),
/// values 0-7 are syslog severities (0 emergency .. 7 debug).
pub fn level_from_number(n: f64) -> Level {
    if !n.is_finite() || n < 0.0 {
        return Level::Info;
    }
    if n >= 10.0 {
        return match n as u64 {
            0..=19 => Level::Trace,
            20..=29 => Level::Debug,
            30..=39 => Level::Info,
            40..=49 => Level::Warn,
            50..=59 => Level::Error,
            _ => Level::Fatal,
        };
    }
    match n as u64 {
        0..=2 => Level::Fatal,
        3 => Level::Error,
        4 => Level::Warn,
        5 | 6 => Level::Info,
        _ => Level::Debug,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aliases_are_case_insensitive() {
        assert_eq!(normalize_level("WARNING"), Level::Warn);
        assert_eq!(normalize_level("warning"), Level::Warn);
        assert_eq!(normalize_level(" Critical "), Level::Fatal);
        assert_eq!(normalize_level("err"), Level::Error);
        assert_eq!(normalize_level("notice"), Level::Info);
    }

    #[test]
    fn test_unknown_token_defaults_to_info() {
        assert_eq!(normalize_level("banana"), Level::Info);
        assert_eq!(normalize_level(""), Level::Info);
        assert!("banana".parse::<Level>().is_err());
    }

    #[test]
    fn test_normalize_is_idempotent() {
        for level in Level::ALL {
            assert_eq!(normalize_level(level.as_str()), level);
        }
    }

    #[test]
    fn test_numeric_levels() {
        assert_eq!(level_from_number(30.0), Level::Info);
        assert_eq!(level_from_number(50.0), Level::Error);
        assert_eq!(level_from_number(60.0), Level::Fatal);
        assert_eq!(level_from_number(3.0), Level::Error);
        assert_eq!(level_from_number(7.0), Level::Debug);
    }

    #[test]
    fn test_levels_are_ordered() {
        assert!(Level::Trace < Level::Debug);
        assert!(Level::Error < Level::Fatal);
        assert_eq!(Level::ALL.iter().max(), Some(&Level::Fatal));
    }
}
