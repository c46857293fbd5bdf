use chrono::{DateTime, Duration, TimeZone, Utc};
use logsift::config::IndexRules;
use logsift::level::Level;
use logsift::parser::{LogParser, LogRecord};
use logsift::query::{
    FilterOperator, FilterValue, QueryFilter, SearchQuery, TimePreset, TimeRange, parse_query,
};
use logsift::search::{FieldType, LogIndex};
use std::collections::BTreeSet;

fn at(hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 10, 1, hour, 0, 0).unwrap()
}

fn record(hour: u32, level: Level, message: &str) -> LogRecord {
    LogRecord::new(at(hour), level, message, "app.log", message)
}

fn sample_index() -> LogIndex {
    let mut index = LogIndex::default();
    index.add_entries([
        record(1, Level::Info, "user login succeeded")
            .with_service("auth")
            .with_field("user", "alice"),
        record(2, Level::Error, "database connection timeout")
            .with_service("orders")
            .with_field("latency", 1200.0),
        record(3, Level::Debug, "cache refreshed").with_service("orders"),
        record(4, Level::Warn, "slow database query")
            .with_service("orders")
            .with_field("latency", 800.0),
        record(5, Level::Error, "payment declined")
            .with_service("billing")
            .with_field("user", "bob"),
    ]);
    index
}

fn messages(index: &LogIndex, query: &SearchQuery) -> Vec<String> {
    index
        .search(query)
        .records
        .into_iter()
        .map(|r| r.message)
        .collect()
}

#[test]
fn test_time_range_is_inclusive_and_newest_first() {
    let mut index = LogIndex::default();
    index.add_entries([
        record(1, Level::Info, "t1"),
        record(2, Level::Info, "t2"),
        record(3, Level::Info, "t3"),
    ]);

    let query = SearchQuery::new().time_range(TimeRange::new(at(1), at(2)));
    let result = index.search(&query);

    assert_eq!(result.total, 2);
    assert_eq!(messages(&index, &query), vec!["t2", "t1"]);
}

#[test]
fn test_level_filter_and_negation_partition() {
    let index = sample_index();
    let errors = index.search(&parse_query("level:ERROR").into_search_query());
    let others = index.search(&parse_query("NOT level:ERROR").into_search_query());

    assert_eq!(errors.total, 2);
    assert_eq!(others.total, 3);

    let a: BTreeSet<_> = errors.records.iter().map(|r| r.id).collect();
    let b: BTreeSet<_> = others.records.iter().map(|r| r.id).collect();
    assert!(a.is_disjoint(&b));
    assert_eq!(a.len() + b.len(), index.len());
}

#[test]
fn test_fuzzy_toggle() {
    let index = sample_index();
    let exact = SearchQuery::new().text("databse");

    assert_eq!(index.search(&exact).total, 0);
    assert_eq!(index.search(&exact.clone().fuzzy(true)).total, 2);
}

#[test]
fn test_prefix_matching() {
    let index = sample_index();
    assert_eq!(
        messages(&index, &SearchQuery::new().text("data")),
        vec!["slow database query", "database connection timeout"]
    );
}

#[test]
fn test_text_and_filters_intersect() {
    let index = sample_index();
    let query = parse_query("database service:orders latency:>1000").into_search_query();
    assert_eq!(messages(&index, &query), vec!["database connection timeout"]);
}

#[test]
fn test_text_matches_labels() {
    let index = sample_index();
    assert_eq!(
        messages(&index, &SearchQuery::new().text("billing")),
        vec!["payment declined"]
    );
}

#[test]
fn test_absent_field_matches_vacuously() {
    let index = sample_index();

    let with_user = index.search(&parse_query("user:alice").into_search_query());
    // records without a user field pass the filter
    assert_eq!(with_user.total, 4);

    let has_user = index.search(&parse_query("user:*").into_search_query());
    assert_eq!(has_user.total, 2);
    let lacks_user = index.search(&parse_query("NOT user:*").into_search_query());
    assert_eq!(lacks_user.total, 3);
}

#[test]
fn test_level_comparison_uses_severity() {
    let index = sample_index();
    let query = SearchQuery::new().filter(QueryFilter::new(
        "level",
        FilterOperator::Gte,
        FilterValue::Scalar("warn".into()),
    ));
    assert_eq!(index.search(&query).total, 3);
}

#[test]
fn test_message_wildcards() {
    let index = sample_index();
    assert_eq!(
        messages(&index, &parse_query("message:*database*").into_search_query()),
        vec!["slow database query", "database connection timeout"]
    );
    assert_eq!(
        messages(&index, &parse_query("message:payment*").into_search_query()),
        vec!["payment declined"]
    );
}

#[test]
fn test_preset_range() {
    let mut index = LogIndex::default();
    let now = Utc::now();
    let mut recent = record(0, Level::Info, "recent");
    recent.timestamp = now - Duration::minutes(5);
    let mut old = record(0, Level::Info, "old");
    old.timestamp = now - Duration::hours(3);
    index.add_entries([recent, old]);

    let last_hour = TimeRange::from_preset(TimePreset::LastHour, Utc::now());
    assert_eq!(
        messages(&index, &SearchQuery::new().time_range(last_hour)),
        vec!["recent"]
    );
    let all = TimeRange::from_preset(TimePreset::All, Utc::now());
    assert_eq!(index.search(&SearchQuery::new().time_range(all)).total, 2);
}

#[test]
fn test_cardinality_equals_distinct_values() {
    let index = sample_index();
    let suggestions = index.get_field_suggestions();

    let names: Vec<_> = suggestions.iter().map(|s| s.field.as_str()).collect();
    assert_eq!(
        names,
        vec!["file", "latency", "level", "message", "service", "timestamp", "user"]
    );

    let service = suggestions.iter().find(|s| s.field == "service").unwrap();
    assert_eq!(service.cardinality, 3);
    assert_eq!(service.examples[0], "orders");

    let level = suggestions.iter().find(|s| s.field == "level").unwrap();
    assert_eq!(level.cardinality, 4);

    let latency = suggestions.iter().find(|s| s.field == "latency").unwrap();
    assert_eq!(latency.field_type, FieldType::Number);
    assert_eq!(latency.cardinality, 2);
}

#[test]
fn test_examples_are_capped() {
    let rules = IndexRules {
        max_examples: 3,
        ..IndexRules::default()
    };
    let mut index = LogIndex::new(rules);
    index.add_entries((0..8).map(|i| record(i, Level::Info, "x").with_field("n", i as f64)));

    let n = index
        .get_field_suggestions()
        .into_iter()
        .find(|s| s.field == "n")
        .unwrap();
    assert_eq!(n.cardinality, 8);
    assert_eq!(n.examples.len(), 3);
}

#[test]
fn test_parsed_records_are_searchable() {
    let parser = LogParser::default();
    let batch = parser.parse_batch(
        concat!(
            "{\"timestamp\":\"2025-10-01T10:00:00Z\",\"level\":\"error\",\"msg\":\"db down\",\"host\":\"db-1\"}\n",
            "2025-10-01T11:00:00Z INFO db recovered host=db-1\n",
        ),
        "mixed.log",
    );
    let mut index = LogIndex::default();
    index.add_entries(batch.records);

    let result = index.search(&parse_query("host:db-1 db").into_search_query());
    assert_eq!(result.total, 2);
    assert_eq!(result.records[0].message, "db recovered host=db-1");

    let stats = index.get_stats();
    assert_eq!(stats.level_counts.get(&Level::Error), Some(&1));
    assert_eq!(stats.file_counts.get("mixed.log"), Some(&2));
}
