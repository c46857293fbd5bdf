use crate::config::{IndexRules, default_config};
use crate::parser::{LogRecord, RecordId};
use crate::query::SearchQuery;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::time::Instant;
use thiserror::Error;

mod entities;
mod field_stats;
pub mod matcher;
pub mod text_index;

pub use entities::{Aggregations, FieldSuggestion, FieldType, IndexStats, SearchResult};
pub use field_stats::FieldStats;
pub use text_index::TextIndex;

/// Internal evaluation faults; `LogIndex::search` turns them into empty results
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Text index references unknown record {0}")]
    DanglingPosting(RecordId),
}

#[derive(Debug, Clone)]
struct Slot {
    /// Insertion sequence, used to keep sorting stable
    seq: u64,
    record: LogRecord,
}

/// In-memory record set with text, filter and time-range search
#[derive(Debug, Clone)]
pub struct LogIndex {
    rules: IndexRules,
    records: HashMap<RecordId, Slot>,
    next_seq: u64,
    text: TextIndex,
    stats: FieldStats,
}

impl Default for LogIndex {
    fn default() -> Self {
        Self::new(default_config().index.clone())
    }
}

impl LogIndex {
    pub fn new(rules: IndexRules) -> Self {
        Self {
            text: TextIndex::new(rules.clone()),
            rules,
            records: HashMap::new(),
            next_seq: 0,
            stats: FieldStats::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: &RecordId) -> Option<&LogRecord> {
        self.records.get(id).map(|slot| &slot.record)
    }

    /// Adds records; a record whose id is already held replaces the old one
    pub fn add_entries(&mut self, records: impl IntoIterator<Item = LogRecord>) {
        let before = self.records.len();
        for record in records {
            if self.records.contains_key(&record.id) {
                self.remove_one(&record.id);
            }
            self.text.insert(&record);
            self.stats.add(&record);
            let seq = self.next_seq;
            self.next_seq += 1;
            self.records.insert(record.id, Slot { seq, record });
        }
        tracing::debug!(
            added = self.records.len().saturating_sub(before),
            total = self.records.len(),
            "indexed records"
        );
    }

    /// Removes the given ids; unknown ids are ignored. Returns how many were removed.
    pub fn remove_entries<'a>(&mut self, ids: impl IntoIterator<Item = &'a RecordId>) -> usize {
        let removed = ids.into_iter().filter(|id| self.remove_one(id)).count();
        tracing::debug!(removed, total = self.records.len(), "removed records");
        removed
    }

    fn remove_one(&mut self, id: &RecordId) -> bool {
        let Some(slot) = self.records.remove(id) else {
            return false;
        };
        self.text.remove(id);
        self.stats.remove(&slot.record);
        true
    }

    pub fn clear(&mut self) {
        self.records.clear();
        self.text.clear();
        self.stats.clear();
        self.next_seq = 0;
    }

    /// Runs a query; evaluation faults are logged and yield an empty result
    pub fn search(&self, query: &SearchQuery) -> SearchResult {
        let started = Instant::now();
        match self.try_search(query) {
            Ok(result) => result,
            Err(error) => {
                tracing::warn!(%error, "search failed; returning no results");
                SearchResult::empty(started.elapsed())
            }
        }
    }

    /// Runs a query.
    ///
    /// Candidates are narrowed by time range, then by every filter, then by
    /// the free text. Text matches are ordered by score before the final
    /// stable sort by timestamp, so equal timestamps keep the better match
    /// first.
    pub fn try_search(&self, query: &SearchQuery) -> Result<SearchResult, SearchError> {
        let started = Instant::now();

        let text_hits = self.text.search(&query.text, query.fuzzy);
        if let Some(hits) = &text_hits
            && let Some(id) = hits.keys().find(|id| !self.records.contains_key(*id))
        {
            return Err(SearchError::DanglingPosting(*id));
        }
        let verbatim_terms: Vec<&str> = if query.case_sensitive && !query.fuzzy {
            text_index::split_terms(&query.text).collect()
        } else {
            Vec::new()
        };

        let mut matched: Vec<(&Slot, f64)> = self
            .records
            .values()
            .filter(|slot| query.time_range.contains(slot.record.timestamp))
            .filter(|slot| matcher::matches_all(&slot.record, &query.filters, query.case_sensitive))
            .filter_map(|slot| match &text_hits {
                None => Some((slot, 0.0)),
                Some(hits) => hits.get(&slot.record.id).map(|score| (slot, *score)),
            })
            .filter(|(slot, _)| contains_verbatim(&slot.record, &verbatim_terms))
            .collect();

        matched.sort_by(|(a, a_score), (b, b_score)| {
            b_score
                .partial_cmp(a_score)
                .unwrap_or(Ordering::Equal)
                .then(a.seq.cmp(&b.seq))
        });
        matched.sort_by(|(a, _), (b, _)| b.record.timestamp.cmp(&a.record.timestamp));

        let total = matched.len();
        let aggregations = (!query.aggregate_by.is_empty())
            .then(|| aggregate(matched.iter().map(|(slot, _)| &slot.record), &query.aggregate_by));

        let records: Vec<LogRecord> = matched
            .into_iter()
            .take(query.limit.unwrap_or(usize::MAX))
            .map(|(slot, _)| slot.record.clone())
            .collect();

        let elapsed = started.elapsed();
        tracing::debug!(
            total,
            returned = records.len(),
            filters = query.filters.len(),
            elapsed_ms = elapsed.as_secs_f64() * 1000.0,
            "search finished"
        );

        Ok(SearchResult {
            records,
            total,
            elapsed,
            aggregations,
        })
    }

    /// Type, cardinality and example values for every known field, sorted by name
    pub fn get_field_suggestions(&self) -> Vec<FieldSuggestion> {
        self.stats.suggestions(self.rules.max_examples)
    }

    pub fn get_stats(&self) -> IndexStats {
        let mut stats = IndexStats {
            total_entries: self.records.len(),
            distinct_terms: self.text.term_count(),
            field_count: self.stats.len(),
            ..IndexStats::default()
        };
        for slot in self.records.values() {
            let record = &slot.record;
            *stats.level_counts.entry(record.level).or_default() += 1;
            *stats.file_counts.entry(record.file.clone()).or_default() += 1;
            stats.earliest = Some(stats.earliest.map_or(record.timestamp, |t| t.min(record.timestamp)));
            stats.latest = Some(stats.latest.map_or(record.timestamp, |t| t.max(record.timestamp)));
        }
        stats
    }
}

fn contains_verbatim(record: &LogRecord, terms: &[&str]) -> bool {
    terms.iter().all(|term| {
        text_index::IndexedField::ALL
            .iter()
            .filter_map(|field| field.text(record))
            .any(|text| text.contains(term))
    })
}

fn aggregate<'a>(records: impl Iterator<Item = &'a LogRecord>, fields: &[String]) -> Aggregations {
    let mut aggregations: Aggregations = fields
        .iter()
        .map(|field| (field.clone(), BTreeMap::new()))
        .collect();
    for record in records {
        for (field, counts) in aggregations.iter_mut() {
            if let Some(value) = record.field(field) {
                *counts.entry(value.to_string()).or_default() += 1;
            }
        }
    }
    aggregations
}
