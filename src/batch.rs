use crate::config::{AppConfig, IngestRules};
use crate::parser::{IngestError, LogParser, ParseError, ParsedBatch, file_label, read_log_file};
use crate::search::LogIndex;
use serde::Serialize;
use std::path::Path;

/// Progress of one ingestion, reported after every chunk
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchProgress {
    pub file_name: String,
    /// Units processed so far: lines, or elements of a JSON array document
    pub processed: usize,
    pub total: usize,
    pub indexed: usize,
    pub errors: usize,
}

impl BatchProgress {
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.processed as f64 / self.total as f64
        }
    }

    pub fn is_done(&self) -> bool {
        self.processed >= self.total
    }
}

/// Outcome of ingesting one document into an index
#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestReport {
    pub file_name: String,
    pub file_size: usize,
    pub total_lines: usize,
    pub indexed: usize,
    pub errors: Vec<ParseError>,
    pub dropped_errors: usize,
}

impl IngestReport {
    fn from_batch(batch: ParsedBatch, indexed: usize) -> Self {
        Self {
            file_name: batch.file_name,
            file_size: batch.file_size,
            total_lines: batch.total_lines,
            indexed,
            errors: batch.errors,
            dropped_errors: batch.dropped_errors,
        }
    }

    /// Summarizes a parsed batch as if all its records had been indexed
    pub fn from_parsed(batch: &ParsedBatch) -> Self {
        Self {
            file_name: batch.file_name.clone(),
            file_size: batch.file_size,
            total_lines: batch.total_lines,
            indexed: batch.records.len(),
            errors: batch.errors.clone(),
            dropped_errors: batch.dropped_errors,
        }
    }

    pub fn error_count(&self) -> usize {
        self.errors.len() + self.dropped_errors
    }
}

/// Parses documents and feeds the records to a [`LogIndex`] in chunks
#[derive(Debug, Clone)]
pub struct BatchCoordinator {
    parser: LogParser,
    rules: IngestRules,
}

impl Default for BatchCoordinator {
    fn default() -> Self {
        Self::new(LogParser::default(), IngestRules::default())
    }
}

impl BatchCoordinator {
    pub fn new(parser: LogParser, rules: IngestRules) -> Self {
        Self { parser, rules }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            LogParser::new(config.parser.clone()),
            config.ingest.clone(),
        )
    }

    fn chunk_size(&self) -> usize {
        self.rules.chunk_lines.max(1)
    }

    /// Parses `text` and adds its records to `index`.
    ///
    /// `progress` is called once per chunk and once more at the end, so it
    /// always sees a final report even for empty input.
    pub fn ingest(
        &self,
        index: &mut LogIndex,
        text: &str,
        file: &str,
        mut progress: impl FnMut(&BatchProgress),
    ) -> IngestReport {
        if let Some(batch) = self.parser.parse_json_array(text, file) {
            return self.ingest_parsed(index, batch, progress);
        }

        let lines: Vec<&str> = text.lines().collect();
        let mut batch = ParsedBatch::new(file, text.len());
        let mut indexed = 0;

        let mut report = |batch: &ParsedBatch, indexed: usize| {
            progress(&BatchProgress {
                file_name: batch.file_name.clone(),
                processed: batch.total_lines,
                total: lines.len(),
                indexed,
                errors: batch.error_count(),
            })
        };

        for (chunk_idx, chunk) in lines.chunks(self.chunk_size()).enumerate() {
            let first_line = chunk_idx * self.chunk_size() + 1;
            self.parser
                .parse_lines_into(&mut batch, chunk.iter().copied(), first_line);
            indexed += batch.records.len();
            index.add_entries(batch.records.drain(..));
            report(&batch, indexed);
        }
        if lines.is_empty() {
            report(&batch, indexed);
        }

        tracing::info!(
            file,
            lines = batch.total_lines,
            indexed,
            errors = batch.error_count(),
            "ingested log text"
        );
        IngestReport::from_batch(batch, indexed)
    }

    fn ingest_parsed(
        &self,
        index: &mut LogIndex,
        mut batch: ParsedBatch,
        mut progress: impl FnMut(&BatchProgress),
    ) -> IngestReport {
        let records = std::mem::take(&mut batch.records);
        let total = batch.total_lines;
        let errors = batch.error_count();
        let mut indexed = 0;

        let mut chunks = records.chunks(self.chunk_size()).peekable();
        if chunks.peek().is_none() {
            progress(&BatchProgress {
                file_name: batch.file_name.clone(),
                processed: total,
                total,
                indexed,
                errors,
            });
        }
        for chunk in chunks {
            indexed += chunk.len();
            index.add_entries(chunk.iter().cloned());
            let processed = if indexed == records.len() {
                total
            } else {
                indexed
            };
            progress(&BatchProgress {
                file_name: batch.file_name.clone(),
                processed,
                total,
                indexed,
                errors,
            });
        }

        tracing::info!(
            file = %batch.file_name,
            elements = total,
            indexed,
            errors,
            "ingested JSON array document"
        );
        IngestReport::from_batch(batch, indexed)
    }

    /// Reads a file and ingests it under its file name
    pub fn ingest_file(
        &self,
        index: &mut LogIndex,
        path: &Path,
        progress: impl FnMut(&BatchProgress),
    ) -> Result<IngestReport, IngestError> {
        let file = read_log_file(path)?;
        let mut report = self.ingest(index, &file.text, &file_label(path), progress);
        report.file_size = file.size;
        Ok(report)
    }
}
