//! Inverted index over the searchable text of each record.
//!
//! Terms are lower-cased runs of alphanumerics and `_`. A query term
//! matches an indexed term exactly, as a prefix, or (when fuzzy matching
//! is requested) within a bounded edit distance.

use crate::config::IndexRules;
use crate::parser::{LogRecord, RecordId};
use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;

const EXACT_WEIGHT: f64 = 1.0;
const PREFIX_WEIGHT: f64 = 0.5;
const FUZZY_WEIGHT: f64 = 0.3;

/// Record attributes that feed the text index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexedField {
    Message,
    Level,
    File,
    Source,
    Service,
    Host,
}

impl IndexedField {
    pub const ALL: [IndexedField; 6] = [
        IndexedField::Message,
        IndexedField::Level,
        IndexedField::File,
        IndexedField::Source,
        IndexedField::Service,
        IndexedField::Host,
    ];

    pub fn text<'a>(&self, record: &'a LogRecord) -> Option<&'a str> {
        match self {
            IndexedField::Message => Some(&record.message),
            IndexedField::Level => Some(record.level.as_str()),
            IndexedField::File => Some(&record.file),
            IndexedField::Source => record.source.as_deref(),
            IndexedField::Service => record.service.as_deref(),
            IndexedField::Host => record.host.as_deref(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Posting {
    id: RecordId,
    field: IndexedField,
    count: u32,
}

/// Splits text into index terms
pub fn split_terms(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|t| !t.is_empty())
}

pub fn index_terms(text: &str) -> Vec<String> {
    split_terms(text).map(str::to_lowercase).collect()
}

#[derive(Debug, Clone)]
pub struct TextIndex {
    rules: IndexRules,
    postings: BTreeMap<String, Vec<Posting>>,
    terms_by_record: HashMap<RecordId, Vec<String>>,
}

impl TextIndex {
    pub fn new(rules: IndexRules) -> Self {
        Self {
            rules,
            postings: BTreeMap::new(),
            terms_by_record: HashMap::new(),
        }
    }

    pub fn insert(&mut self, record: &LogRecord) {
        let mut record_terms = Vec::new();
        for field in IndexedField::ALL {
            let Some(text) = field.text(record) else {
                continue;
            };
            let mut counts: HashMap<String, u32> = HashMap::new();
            for term in index_terms(text) {
                *counts.entry(term).or_default() += 1;
            }
            for (term, count) in counts {
                self.postings.entry(term.clone()).or_default().push(Posting {
                    id: record.id,
                    field,
                    count,
                });
                record_terms.push(term);
            }
        }
        record_terms.sort();
        record_terms.dedup();
        self.terms_by_record.insert(record.id, record_terms);
    }

    pub fn remove(&mut self, id: &RecordId) {
        let Some(terms) = self.terms_by_record.remove(id) else {
            return;
        };
        for term in terms {
            if let Some(list) = self.postings.get_mut(&term) {
                list.retain(|p| p.id != *id);
                if list.is_empty() {
                    self.postings.remove(&term);
                }
            }
        }
    }

    pub fn clear(&mut self) {
        self.postings.clear();
        self.terms_by_record.clear();
    }

    pub fn term_count(&self) -> usize {
        self.postings.len()
    }

    /// Scores every record matching all terms of `text`.
    ///
    /// Returns `None` when `text` holds no terms, meaning no text
    /// restriction applies.
    pub fn search(&self, text: &str, fuzzy: bool) -> Option<HashMap<RecordId, f64>> {
        let terms = index_terms(text);
        if terms.is_empty() {
            return None;
        }

        let mut combined: Option<HashMap<RecordId, f64>> = None;
        for term in &terms {
            let scores = self.term_scores(term, fuzzy);
            combined = Some(match combined {
                None => scores,
                Some(mut current) => {
                    current.retain(|id, _| scores.contains_key(id));
                    for (id, score) in current.iter_mut() {
                        *score += scores[id];
                    }
                    current
                }
            });
            if combined.as_ref().is_some_and(HashMap::is_empty) {
                break;
            }
        }
        combined
    }

    fn term_scores(&self, term: &str, fuzzy: bool) -> HashMap<RecordId, f64> {
        let mut scores = HashMap::new();

        if let Some(postings) = self.postings.get(term) {
            self.accumulate(&mut scores, postings, EXACT_WEIGHT);
        }

        let term_len = term.chars().count();
        let allows_prefix = term_len >= self.rules.prefix_min_len;
        if allows_prefix {
            let after = (Bound::Excluded(term.to_string()), Bound::Unbounded);
            for (_, postings) in self
                .postings
                .range::<String, _>(after)
                .take_while(|(candidate, _)| candidate.starts_with(term))
            {
                self.accumulate(&mut scores, postings, PREFIX_WEIGHT);
            }
        }

        if fuzzy {
            let max_edits = self.max_edits(term_len);
            if max_edits > 0 {
                for (candidate, postings) in &self.postings {
                    if candidate == term || (allows_prefix && candidate.starts_with(term)) {
                        continue;
                    }
                    if bounded_levenshtein(term, candidate, max_edits).is_some() {
                        self.accumulate(&mut scores, postings, FUZZY_WEIGHT);
                    }
                }
            }
        }

        scores
    }

    fn max_edits(&self, term_len: usize) -> usize {
        let scaled = (term_len as f64 * self.rules.fuzziness).round() as usize;
        scaled.max(1).min(self.rules.max_edit_distance)
    }

    fn accumulate(&self, scores: &mut HashMap<RecordId, f64>, postings: &[Posting], weight: f64) {
        for posting in postings {
            let boost = self.boost(posting.field);
            *scores.entry(posting.id).or_default() += boost * weight * f64::from(posting.count);
        }
    }

    fn boost(&self, field: IndexedField) -> f64 {
        match field {
            IndexedField::Message => self.rules.message_boost,
            IndexedField::Level => self.rules.level_boost,
            _ => self.rules.label_boost,
        }
    }
}

/// Edit distance between `a` and `b` if it is at most `max`
pub fn bounded_levenshtein(a: &str, b: &str, max: usize) -> Option<usize> {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.len().abs_diff(b.len()) > max {
        return None;
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        let mut row_min = curr[0];
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
            row_min = row_min.min(curr[j + 1]);
        }
        if row_min > max {
            return None;
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    let distance = prev[b.len()];
    (distance <= max).then_some(distance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::Level;
    use chrono::Utc;

    fn record(message: &str) -> LogRecord {
        LogRecord::new(Utc::now(), Level::Info, message, "app.log", message)
    }

    #[test]
    fn test_levenshtein_bounds() {
        assert_eq!(bounded_levenshtein("timeout", "timeout", 2), Some(0));
        assert_eq!(bounded_levenshtein("timeot", "timeout", 2), Some(1));
        assert_eq!(bounded_levenshtein("kitten", "sitting", 3), Some(3));
        assert_eq!(bounded_levenshtein("kitten", "sitting", 2), None);
        assert_eq!(bounded_levenshtein("a", "abcd", 2), None);
    }

    #[test]
    fn test_split_terms_keeps_underscore() {
        assert_eq!(
            index_terms("Conn_Pool exhausted: retry=3"),
            vec!["conn_pool", "exhausted", "retry", "3"]
        );
    }

    #[test]
    fn test_exact_outranks_prefix() {
        let mut index = TextIndex::new(IndexRules::default());
        let exact = record("error occurred");
        let prefix = record("errors occurred");
        index.insert(&exact);
        index.insert(&prefix);

        let hits = index.search("error", false).unwrap();
        assert_eq!(hits.len(), 2);
        assert!(hits[&exact.id] > hits[&prefix.id]);
    }

    #[test]
    fn test_terms_combine_with_and() {
        let mut index = TextIndex::new(IndexRules::default());
        let both = record("database error");
        let one = record("database ok");
        index.insert(&both);
        index.insert(&one);

        let hits = index.search("error database", false).unwrap();
        assert_eq!(hits.len(), 1);
        assert!(hits.contains_key(&both.id));
    }

    #[test]
    fn test_fuzzy_only_when_requested() {
        let mut index = TextIndex::new(IndexRules::default());
        let rec = record("connection timeout");
        index.insert(&rec);

        assert!(index.search("timeot", false).unwrap().is_empty());
        assert!(index.search("timeot", true).unwrap().contains_key(&rec.id));
    }

    #[test]
    fn test_short_terms_skip_prefix() {
        let mut rules = IndexRules::default();
        rules.prefix_min_len = 3;
        let mut index = TextIndex::new(rules);
        index.insert(&record("error"));
        assert!(index.search("er", false).unwrap().is_empty());
    }

    #[test]
    fn test_remove_drops_postings() {
        let mut index = TextIndex::new(IndexRules::default());
        let rec = record("unique_token here");
        index.insert(&rec);
        let before = index.term_count();
        index.remove(&rec.id);

        assert!(index.term_count() < before);
        assert!(index.search("unique_token", false).unwrap().is_empty());
    }

    #[test]
    fn test_blank_text_is_unrestricted() {
        let index = TextIndex::new(IndexRules::default());
        assert!(index.search("  -- ", false).is_none());
    }
}
