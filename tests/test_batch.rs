use logsift::batch::{BatchCoordinator, BatchProgress};
use logsift::config::{AppConfig, IngestRules, ParserRules};
use logsift::parser::LogParser;
use logsift::query::{SearchQuery, parse_query};
use logsift::search::LogIndex;
use std::fs;
use tempfile::tempdir;

fn lines(count: usize) -> String {
    (0..count)
        .map(|i| format!("2025-10-01T12:{:02}:{:02}Z INFO request {i} served", i / 60, i % 60))
        .collect::<Vec<_>>()
        .join("\n")
}

#[test]
fn test_ingest_indexes_every_line() {
    let coordinator = BatchCoordinator::new(LogParser::default(), IngestRules { chunk_lines: 100 });
    let mut index = LogIndex::default();
    let mut updates: Vec<BatchProgress> = Vec::new();

    let report = coordinator.ingest(&mut index, &lines(250), "web.log", |p| updates.push(p.clone()));

    assert_eq!(report.indexed, 250);
    assert_eq!(report.total_lines, 250);
    assert_eq!(index.len(), 250);
    assert_eq!(updates.len(), 3);
    assert!(updates.windows(2).all(|w| w[0].processed < w[1].processed));
    assert_eq!(updates.last().unwrap().fraction(), 1.0);
    assert_eq!(updates[0].file_name, "web.log");
}

#[test]
fn test_error_cap_spans_chunks() {
    let config = AppConfig {
        parser: ParserRules {
            max_errors: 3,
            ..ParserRules::default()
        },
        ingest: IngestRules { chunk_lines: 2 },
        ..AppConfig::default()
    };
    let coordinator = BatchCoordinator::from_config(&config);
    let text = "{bad\n{bad}\nWARN: fine\n{bad}\n{bad}\n{bad}";
    let mut index = LogIndex::default();

    let report = coordinator.ingest(&mut index, text, "broken.log", |_| {});

    assert_eq!(report.errors.len(), 3);
    assert_eq!(report.dropped_errors, 1);
    assert_eq!(report.error_count(), 4);
    // "{bad" is not a closed object, so it is read as free text
    assert_eq!(report.indexed, 2);
    assert_eq!(
        report.errors.iter().map(|e| e.line_number).collect::<Vec<_>>(),
        vec![2, 4, 5]
    );
}

#[test]
fn test_files_accumulate_in_one_index() {
    let dir = tempdir().expect("temp dir");
    let api = dir.path().join("api.log");
    let worker = dir.path().join("worker.log");
    fs::write(&api, "ERROR: api failed\nINFO: api ok\n").expect("write api log");
    fs::write(&worker, "{\"level\":\"error\",\"msg\":\"job failed\"}\n").expect("write worker log");

    let coordinator = BatchCoordinator::default();
    let mut index = LogIndex::default();
    coordinator.ingest_file(&mut index, &api, |_| {}).expect("ingest api");
    coordinator.ingest_file(&mut index, &worker, |_| {}).expect("ingest worker");

    let failures = index.search(&parse_query("level:error").into_search_query());
    assert_eq!(failures.total, 2);

    let from_worker = index.search(&parse_query("file:worker.log").into_search_query());
    assert_eq!(from_worker.total, 1);
    assert_eq!(from_worker.records[0].message, "job failed");

    assert_eq!(index.search(&SearchQuery::new()).total, 3);
}

#[test]
fn test_missing_file_is_an_error() {
    let dir = tempdir().expect("temp dir");
    let mut index = LogIndex::default();
    let result = BatchCoordinator::default().ingest_file(&mut index, &dir.path().join("nope.log"), |_| {});
    assert!(result.is_err());
    assert!(index.is_empty());
}

#[test]
fn test_report_size_is_bytes_on_disk() {
    let dir = tempdir().expect("temp dir");
    let path = dir.path().join("binary.log");
    let bytes = b"ERROR: bad byte \x80 here\n";
    fs::write(&path, bytes).expect("write log");

    let mut index = LogIndex::default();
    let report = BatchCoordinator::default()
        .ingest_file(&mut index, &path, |_| {})
        .expect("ingest");
    assert_eq!(report.file_size, bytes.len());
    assert_eq!(report.indexed, 1);
}
