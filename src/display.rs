use crate::batch::IngestReport;
use crate::level::Level;
use crate::search::{FieldSuggestion, IndexStats, SearchResult};
use chrono::{DateTime, SecondsFormat, Utc};
use colored::Colorize;
use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color, ContentArrangement, Table};
use serde::Serialize;
use std::fmt::Write as _;

const MESSAGE_WIDTH: usize = 100;
const ERROR_PREVIEW: usize = 10;

pub fn create_styled_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(headers.iter().map(|h| Cell::new(h)));
    table
}

fn level_color(level: Level) -> Color {
    match level {
        Level::Trace => Color::DarkGrey,
        Level::Debug => Color::Blue,
        Level::Info => Color::Green,
        Level::Warn => Color::Yellow,
        Level::Error => Color::Red,
        Level::Fatal => Color::Magenta,
    }
}

fn level_cell(level: Level) -> Cell {
    let cell = Cell::new(level.as_str());
    if colored::control::SHOULD_COLORIZE.should_colorize() {
        cell.fg(level_color(level))
    } else {
        cell
    }
}

fn format_instant(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn truncate_string(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}

fn plural(count: usize, one: &str, many: &str) -> String {
    format!("{count} {}", if count == 1 { one } else { many })
}

pub fn format_search_text(result: &SearchResult) -> String {
    let mut out = String::new();
    let shown = if result.records.len() < result.total {
        format!(" (showing {})", result.records.len())
    } else {
        String::new()
    };
    let _ = writeln!(
        out,
        "{} {}{} in {:.2} ms",
        "SEARCH".bold(),
        plural(result.total, "match", "matches").green().bold(),
        shown,
        result.elapsed.as_secs_f64() * 1000.0
    );

    if result.is_empty() {
        let _ = writeln!(out, "No matching log entries found.");
        return out;
    }

    if !result.records.is_empty() {
        let mut table = create_styled_table(&["Timestamp", "Level", "Origin", "Message"]);
        for record in &result.records {
            let origin = match record.line_number {
                Some(line) => format!("{}:{line}", record.file),
                None => record.file.clone(),
            };
            table.add_row(vec![
                Cell::new(format_instant(record.timestamp)),
                level_cell(record.level),
                Cell::new(origin),
                Cell::new(truncate_string(&record.message.replace('\n', "\\n"), MESSAGE_WIDTH)),
            ]);
        }
        let _ = writeln!(out, "{table}");
    }

    if let Some(aggregations) = &result.aggregations {
        for (field, counts) in aggregations {
            let _ = writeln!(out, "\n{} {}", "COUNT BY".bold(), field.cyan());
            let mut rows: Vec<_> = counts.iter().collect();
            rows.sort_by(|a, b| b.1.cmp(a.1));
            let mut table = create_styled_table(&["Value", "Count"]);
            for (value, count) in rows {
                table.add_row(vec![Cell::new(value), Cell::new(count)]);
            }
            let _ = writeln!(out, "{table}");
        }
    }

    out
}

pub fn format_fields_text(suggestions: &[FieldSuggestion]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} {}",
        "FIELDS".bold(),
        plural(suggestions.len(), "field", "fields")
    );
    if suggestions.is_empty() {
        return out;
    }

    let mut table = create_styled_table(&["Field", "Type", "Distinct", "Examples"]);
    for suggestion in suggestions {
        table.add_row(vec![
            Cell::new(&suggestion.field),
            Cell::new(suggestion.field_type),
            Cell::new(suggestion.cardinality),
            Cell::new(truncate_string(&suggestion.examples.join(", "), MESSAGE_WIDTH)),
        ]);
    }
    let _ = writeln!(out, "{table}");
    out
}

pub fn format_stats_text(stats: &IndexStats) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", "=".repeat(60).bright_white());
    let _ = writeln!(out, "{}", "LOG INDEX SUMMARY".bold().bright_white());
    let _ = writeln!(out, "{}", "=".repeat(60).bright_white());
    let _ = writeln!(
        out,
        "Total entries:  {}",
        stats.total_entries.to_string().green().bold()
    );
    let _ = writeln!(out, "Indexed terms:  {}", stats.distinct_terms);
    let _ = writeln!(out, "Known fields:   {}", stats.field_count);

    if let (Some(earliest), Some(latest)) = (stats.earliest, stats.latest) {
        let _ = writeln!(out, "Earliest:       {}", format_instant(earliest).cyan());
        let _ = writeln!(out, "Latest:         {}", format_instant(latest).cyan());
    }

    if !stats.level_counts.is_empty() {
        let _ = writeln!(out, "\n{}", "LEVELS".bold());
        let mut table = create_styled_table(&["Level", "Count", "Percent"]);
        for (level, count) in stats.level_counts.iter().rev() {
            table.add_row(vec![
                level_cell(*level),
                Cell::new(count),
                Cell::new(format!("{:.1}%", percent(*count, stats.total_entries))),
            ]);
        }
        let _ = writeln!(out, "{table}");
    }

    if !stats.file_counts.is_empty() {
        let _ = writeln!(out, "\n{}", "FILES".bold());
        let mut table = create_styled_table(&["File", "Count"]);
        for (file, count) in &stats.file_counts {
            table.add_row(vec![Cell::new(file), Cell::new(count)]);
        }
        let _ = writeln!(out, "{table}");
    }

    out
}

fn percent(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 * 100.0 / total as f64
    }
}

pub fn format_ingest_text(report: &IngestReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} {}", "PARSE".bold(), report.file_name.cyan());
    let _ = writeln!(out, "Size:     {} bytes", report.file_size);
    let _ = writeln!(out, "Lines:    {}", report.total_lines);
    let _ = writeln!(
        out,
        "Records:  {}",
        report.indexed.to_string().green().bold()
    );

    let error_count = report.error_count();
    if error_count == 0 {
        let _ = writeln!(out, "Errors:   0");
        return out;
    }
    let _ = writeln!(out, "Errors:   {}", error_count.to_string().red().bold());
    if report.dropped_errors > 0 {
        let _ = writeln!(
            out,
            "          ({} not recorded past the error limit)",
            report.dropped_errors
        );
    }

    let mut table = create_styled_table(&["Line", "Reason", "Content"]);
    for error in report.errors.iter().take(ERROR_PREVIEW) {
        table.add_row(vec![
            Cell::new(error.line_number),
            Cell::new(&error.reason),
            Cell::new(truncate_string(error.raw.trim(), 60)),
        ]);
    }
    let _ = writeln!(out, "{table}");
    if report.errors.len() > ERROR_PREVIEW {
        let _ = writeln!(out, "... +{} more", report.errors.len() - ERROR_PREVIEW);
    }
    out
}

pub fn format_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value)
        .unwrap_or_else(|_| "{\"error\":\"failed to serialize output\"}".to_string())
}
