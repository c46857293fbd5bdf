pub mod batch;
pub mod cli;
pub mod config;
pub mod display;
pub mod level;
pub mod parser;
pub mod query;
pub mod search;

use anyhow::{Context, bail};
use chrono::{DateTime, Utc};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

pub use batch::{BatchCoordinator, BatchProgress, IngestReport};
pub use cli::{ColorMode, Commands, OutputFormat, cli_parse};
pub use config::{AppConfig, load_config};
pub use level::{Level, normalize_level};
pub use parser::{
    FieldValue, LogParser, LogRecord, ParseError, ParsedBatch, parse_batch, parse_line,
    parse_log_file,
};
pub use query::{
    FilterOperator, FilterValue, ParsedQuery, QueryFilter, SearchQuery, TimePreset, TimeRange,
    parse_query,
};
pub use search::{FieldSuggestion, IndexStats, LogIndex, SearchError, SearchResult};

/// Installs the stderr diagnostics subscriber.
///
/// `RUST_LOG` wins when set; otherwise each `-v` raises the crate's level
/// from warn through info and debug to trace.
pub fn init_logging(verbosity: u8) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(match verbosity {
            0 => "warn",
            1 => "logsift=info",
            2 => "logsift=debug",
            _ => "logsift=trace",
        })
    });
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn apply_color_mode(mode: ColorMode) {
    match mode {
        ColorMode::Always => colored::control::set_override(true),
        ColorMode::Never => colored::control::set_override(false),
        ColorMode::Auto => {}
    }
}

fn progress_bar(visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new(0);
    if let Ok(style) =
        ProgressStyle::with_template("{msg:20!} [{bar:30}] {pos}/{len} lines ({elapsed})")
    {
        bar.set_style(style.progress_chars("=> "));
    }
    bar
}

/// Parses every file into one index, drawing progress on stderr when asked
fn build_index(
    files: &[PathBuf],
    config: &AppConfig,
    show_progress: bool,
) -> anyhow::Result<(LogIndex, Vec<IngestReport>)> {
    let coordinator = BatchCoordinator::from_config(config);
    let mut index = LogIndex::new(config.index.clone());
    let mut reports = Vec::with_capacity(files.len());
    let bar = progress_bar(show_progress);

    for file in files {
        let report = coordinator
            .ingest_file(&mut index, file, |progress| {
                bar.set_message(progress.file_name.clone());
                bar.set_length(progress.total as u64);
                bar.set_position(progress.processed as u64);
            })
            .with_context(|| format!("Failed to ingest '{}'", file.display()))?;
        if report.error_count() > 0 {
            tracing::warn!(
                file = %report.file_name,
                errors = report.error_count(),
                "some lines could not be parsed"
            );
        }
        reports.push(report);
    }

    bar.finish_and_clear();
    Ok((index, reports))
}

fn parse_instant(flag: &str, value: &str, now: DateTime<Utc>) -> anyhow::Result<DateTime<Utc>> {
    match parser::parse_timestamp(value, now) {
        Some(ts) => Ok(ts),
        None => bail!("Unrecognized timestamp for {flag}: '{value}'"),
    }
}

fn resolve_time_range(
    from: Option<&str>,
    to: Option<&str>,
    last: Option<TimePreset>,
) -> anyhow::Result<TimeRange> {
    let now = Utc::now();
    if let Some(preset) = last {
        return Ok(TimeRange::from_preset(preset, now));
    }
    if from.is_none() && to.is_none() {
        return Ok(TimeRange::all());
    }
    let from = match from {
        Some(value) => parse_instant("--from", value, now)?,
        None => DateTime::<Utc>::MIN_UTC,
    };
    let to = match to {
        Some(value) => parse_instant("--to", value, now)?,
        None => DateTime::<Utc>::MAX_UTC,
    };
    if from > to {
        bail!("--from must not be later than --to");
    }
    Ok(TimeRange::new(from, to))
}

pub fn run() -> anyhow::Result<()> {
    let cli = cli_parse();
    init_logging(cli.verbose);
    apply_color_mode(cli.color);

    let config = load_config(cli.config.as_deref()).context("Failed to load config")?;
    if let Some(path) = &cli.config {
        tracing::info!(path = %path.display(), "using config file");
    }
    let text_output = cli.format == OutputFormat::Text;

    match &cli.command {
        Commands::Parse { file } => {
            let parser = LogParser::new(config.parser.clone());
            let batch = parse_log_file(file, &parser)
                .with_context(|| format!("Failed to parse '{}'", file.display()))?;
            if text_output {
                print!("{}", display::format_ingest_text(&IngestReport::from_parsed(&batch)));
            } else {
                println!("{}", display::format_json(&batch));
            }
        }
        Commands::Search {
            files,
            query,
            from,
            to,
            last,
            fuzzy,
            case_sensitive,
            limit,
            count_by,
        } => {
            let time_range = resolve_time_range(from.as_deref(), to.as_deref(), *last)?;
            let parsed = parse_query(query);
            tracing::debug!(
                filters = %parsed
                    .filters
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(" "),
                text = %parsed.text,
                "parsed query"
            );

            let mut search = parsed
                .into_search_query()
                .time_range(time_range)
                .fuzzy(*fuzzy)
                .case_sensitive(*case_sensitive);
            for field in count_by {
                search = search.aggregate_by(field.clone());
            }
            if let Some(limit) = limit {
                search = search.limit(*limit);
            }

            let (index, _) = build_index(files, &config, text_output)?;
            let result = index.search(&search);
            if text_output {
                print!("{}", display::format_search_text(&result));
            } else {
                println!("{}", display::format_json(&result));
            }
        }
        Commands::Fields { files } => {
            let (index, _) = build_index(files, &config, text_output)?;
            let suggestions = index.get_field_suggestions();
            if text_output {
                print!("{}", display::format_fields_text(&suggestions));
            } else {
                println!("{}", display::format_json(&suggestions));
            }
        }
        Commands::Stats { files } => {
            let (index, reports) = build_index(files, &config, text_output)?;
            let stats = index.get_stats();
            if text_output {
                print!("{}", display::format_stats_text(&stats));
            } else {
                println!(
                    "{}",
                    display::format_json(&serde_json::json!({
                        "stats": stats,
                        "files": reports,
                    }))
                );
            }
        }
    }

    Ok(())
}
