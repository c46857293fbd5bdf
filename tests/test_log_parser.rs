use chrono::{DateTime, TimeZone, Utc};
use logsift::config::ParserRules;
use logsift::level::Level;
use logsift::parser::{FieldValue, LogParser, parse_log_file};
use std::fs;
use tempfile::tempdir;

fn reference() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 10, 19, 12, 0, 0).unwrap()
}

fn parser() -> LogParser {
    LogParser::default().with_reference_time(reference())
}

#[test]
fn test_iso_timestamp_round_trips() {
    let ts = Utc.with_ymd_and_hms(2025, 10, 1, 12, 0, 0).unwrap() + chrono::Duration::milliseconds(123);
    let line = format!("{} ERROR Connection refused", ts.to_rfc3339());
    let record = parser().parse_line(&line, "app.log", 1).expect("record");

    assert_eq!(record.timestamp, ts);
    assert_eq!(record.level, Level::Error);
    assert_eq!(record.message, "Connection refused");
}

#[test]
fn test_cascade_shapes() {
    let p = parser();

    let bracketed = p
        .parse_line("2025-10-01 12:00:00,250 [WARN] disk almost full", "a.log", 1)
        .unwrap();
    assert_eq!(bracketed.level, Level::Warn);
    assert_eq!(bracketed.message, "disk almost full");
    assert_eq!(
        bracketed.timestamp,
        Utc.with_ymd_and_hms(2025, 10, 1, 12, 0, 0).unwrap() + chrono::Duration::milliseconds(250)
    );

    let level_first = p
        .parse_line("ERROR 2025-10-01T08:00:00Z payment declined", "a.log", 2)
        .unwrap();
    assert_eq!(level_first.level, Level::Error);
    assert_eq!(level_first.message, "payment declined");

    let delimited = p.parse_line("DEBUG: cache warmed", "a.log", 3).unwrap();
    assert_eq!(delimited.level, Level::Debug);
    assert_eq!(delimited.message, "cache warmed");
    assert_eq!(delimited.timestamp, reference());
}

#[test]
fn test_apache_and_syslog_timestamps() {
    let p = parser();

    let clf = p
        .parse_line(
            r#"127.0.0.1 - - [01/Oct/2025:13:55:36 +0200] "GET /index.html HTTP/1.1" 200"#,
            "access.log",
            1,
        )
        .unwrap();
    assert_eq!(clf.timestamp, Utc.with_ymd_and_hms(2025, 10, 1, 11, 55, 36).unwrap());
    assert_eq!(clf.level, Level::Info);

    let syslog = p
        .parse_line("Oct  5 06:25:01 web1 CRON[123]: error in job", "syslog", 2)
        .unwrap();
    assert_eq!(syslog.timestamp, Utc.with_ymd_and_hms(2025, 10, 5, 6, 25, 1).unwrap());
    assert_eq!(syslog.level, Level::Error);
}

#[test]
fn test_syslog_in_the_future_belongs_to_last_year() {
    let record = parser()
        .parse_line("Dec 30 23:59:59 host kernel: panic", "syslog", 1)
        .unwrap();
    assert_eq!(record.timestamp, Utc.with_ymd_and_hms(2024, 12, 30, 23, 59, 59).unwrap());
    assert_eq!(record.level, Level::Fatal);
}

#[test]
fn test_unrecognized_line_keeps_whole_text() {
    let line = "something happened without any markers";
    let record = parser().parse_line(line, "a.log", 4).unwrap();
    assert_eq!(record.level, Level::Info);
    assert_eq!(record.message, line);
    assert_eq!(record.timestamp, reference());
}

#[test]
fn test_structured_line() {
    let line = r#"{"ts": 1759320000, "severity": "err", "msg": "upstream timeout", "service": "api", "latency_ms": 1500, "retry": true, "ctx": {"a": 1}, "gone": null}"#;
    let record = parser().parse_line(line, "api.jsonl", 1).unwrap();

    assert_eq!(record.timestamp, Utc.with_ymd_and_hms(2025, 10, 1, 12, 0, 0).unwrap());
    assert_eq!(record.level, Level::Error);
    assert_eq!(record.message, "upstream timeout");
    assert_eq!(record.service.as_deref(), Some("api"));
    assert_eq!(record.fields.get("latency_ms"), Some(&FieldValue::Number(1500.0)));
    assert_eq!(record.fields.get("retry"), Some(&FieldValue::Bool(true)));
    assert_eq!(
        record.fields.get("ctx"),
        Some(&FieldValue::String(r#"{"a":1}"#.to_string()))
    );
    assert!(!record.fields.contains_key("gone"));
    assert!(!record.fields.contains_key("msg"));
    assert!(record.fields.contains_key("service"));
    assert_eq!(record.raw, line);
}

#[test]
fn test_structured_numeric_level_and_missing_message() {
    let line = r#"{"level": 50, "user": "bob"}"#;
    let record = parser().parse_line(line, "pino.log", 1).unwrap();
    assert_eq!(record.level, Level::Error);
    assert_eq!(record.message, r#"{"level":50,"user":"bob"}"#);
}

#[test]
fn test_lenient_json_accepts_json5() {
    let line = "{level: 'warn', msg: 'trailing comma',}";
    assert!(parser().try_parse_line(line, "a.log", 1).is_err());

    let rules = ParserRules {
        lenient_json: true,
        ..ParserRules::default()
    };
    let record = LogParser::new(rules).parse_line(line, "a.log", 1).unwrap();
    assert_eq!(record.level, Level::Warn);
    assert_eq!(record.message, "trailing comma");
}

#[test]
fn test_logfmt_pairs_become_fields() {
    let record = parser()
        .parse_line(
            r#"2025-10-01T12:00:00Z INFO request done status=200 path="/api/v1" cached=false"#,
            "a.log",
            1,
        )
        .unwrap();
    assert_eq!(record.fields.get("status"), Some(&FieldValue::Number(200.0)));
    assert_eq!(record.fields.get("path"), Some(&FieldValue::from("/api/v1")));
    assert_eq!(record.fields.get("cached"), Some(&FieldValue::Bool(false)));
}

#[test]
fn test_batch_mixes_records_and_errors() {
    let text = concat!(
        "{\"level\":\"info\",\"msg\":\"ok\"}\n",
        "\n",
        "{not json}\n",
        "2025-10-01T12:00:00Z WARN plain line\n",
    );
    let batch = parser().parse_batch(text, "mixed.log");

    assert_eq!(batch.total_lines, 4);
    assert_eq!(batch.records.len(), 2);
    assert_eq!(batch.errors.len(), 1);
    assert_eq!(batch.errors[0].line_number, 3);
    assert_eq!(batch.errors[0].raw, "{not json}");
    assert_eq!(batch.file_name, "mixed.log");
    assert_eq!(batch.file_size, text.len());
    assert_eq!(batch.records[1].line_number, Some(4));
}

#[test]
fn test_batch_ids_are_unique() {
    let text = "INFO: a\nINFO: a\nINFO: a\n";
    let batch = parser().parse_batch(text, "a.log");
    let mut ids: Vec<_> = batch.records.iter().map(|r| r.id).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 3);
}

#[test]
fn test_json_array_document() {
    let text = r#"[
        {"timestamp": "2025-10-01T10:00:00Z", "level": "error", "message": "a"},
        "not an object",
        {"timestamp": "2025-10-01T11:00:00Z", "level": "info", "message": "b"}
    ]"#;
    let batch = parser().parse_batch(text, "dump.json");

    assert_eq!(batch.records.len(), 2);
    assert_eq!(batch.errors.len(), 1);
    assert_eq!(batch.errors[0].line_number, 2);
    assert_eq!(batch.records[1].line_number, Some(3));
}

#[test]
fn test_parse_log_file_uses_file_name() {
    let dir = tempdir().expect("temp dir");
    let path = dir.path().join("service.log");
    fs::write(&path, "ERROR: boom\n").expect("write log");

    let batch = parse_log_file(&path, &parser()).expect("parse file");
    assert_eq!(batch.file_name, "service.log");
    assert_eq!(batch.records[0].file, "service.log");

    let missing = parse_log_file(dir.path().join("missing.log"), &parser());
    assert!(missing.is_err());
}

#[test]
fn test_file_size_counts_bytes_on_disk() {
    let dir = tempdir().expect("temp dir");
    let path = dir.path().join("latin1.log");
    let bytes = b"WARN: caf\xe9 closed\nINFO: \xff\xfe done\n";
    fs::write(&path, bytes).expect("write log");

    let batch = parse_log_file(&path, &parser()).expect("parse file");
    assert_eq!(batch.file_size, bytes.len());
    assert_eq!(batch.records.len(), 2);
    assert!(batch.records[0].message.contains('\u{fffd}'));
}
