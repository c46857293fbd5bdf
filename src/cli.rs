use crate::query::TimePreset;
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Parse log files and search them with a field-aware query language
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format
    #[arg(short = 'F', long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    pub format: OutputFormat,

    /// When to use colors in text output
    #[arg(long, value_enum, default_value_t = ColorMode::Auto, global = true)]
    pub color: ColorMode,

    /// Increase diagnostic logging on stderr (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// TOML file with parser, index and ingest settings
    #[arg(long, env = "LOGSIFT_CONFIG", global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Parse one file and report records, line count and errors
    Parse {
        /// Log file to parse
        file: PathBuf,
    },
    /// Search one or more files
    Search {
        /// Log files to search
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Query, e.g. 'level:ERROR NOT service:auth timeout'
        #[arg(short, long, default_value = "")]
        query: String,

        /// Only records at or after this instant
        #[arg(long)]
        from: Option<String>,

        /// Only records at or before this instant
        #[arg(long)]
        to: Option<String>,

        /// Only records within this window before now
        #[arg(long, value_enum, conflicts_with_all = ["from", "to"])]
        last: Option<TimePreset>,

        /// Match text terms within a small edit distance
        #[arg(long)]
        fuzzy: bool,

        /// Match text and filter values with exact case
        #[arg(long)]
        case_sensitive: bool,

        /// Show at most this many records
        #[arg(short = 'n', long)]
        limit: Option<usize>,

        /// Count matches per value of this field (repeatable)
        #[arg(long = "count-by")]
        count_by: Vec<String>,
    },
    /// List known fields with their type, cardinality and example values
    Fields {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Summarize levels, files and time span
    Stats {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    Auto,
    Always,
    Never,
}

pub fn cli_parse() -> Cli {
    Cli::parse()
}
