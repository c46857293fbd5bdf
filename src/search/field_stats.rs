use super::entities::{FieldSuggestion, FieldType};
use crate::parser::{FieldValue, LogRecord, parse_number, parse_timestamp};
use chrono::Utc;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default)]
struct FieldStat {
    counts: BTreeMap<String, usize>,
    last_value: Option<FieldValue>,
}

impl FieldStat {
    fn inferred_type(&self) -> FieldType {
        match &self.last_value {
            Some(FieldValue::Number(_)) => FieldType::Number,
            Some(FieldValue::Bool(_)) => FieldType::Boolean,
            Some(FieldValue::Date(_)) => FieldType::Date,
            _ => infer_from_text(self.counts.keys().map(String::as_str)),
        }
    }

    fn examples(&self, max: usize) -> Vec<String> {
        let mut ranked: Vec<(&String, &usize)> = self.counts.iter().collect();
        // counts iterate by value, so the sort keeps value order among ties
        ranked.sort_by(|a, b| b.1.cmp(a.1));
        ranked
            .into_iter()
            .take(max)
            .map(|(value, _)| value.clone())
            .collect()
    }
}

fn infer_from_text<'a>(values: impl Iterator<Item = &'a str> + Clone) -> FieldType {
    if values.clone().all(|v| parse_number(v).is_some()) {
        return FieldType::Number;
    }
    let now = Utc::now();
    if values.clone().all(|v| parse_timestamp(v, now).is_some()) {
        return FieldType::Date;
    }
    if values.clone().all(|v| v == "true" || v == "false") {
        return FieldType::Boolean;
    }
    FieldType::String
}

/// The attributes a record contributes to field statistics
fn observed_fields(record: &LogRecord) -> Vec<(&str, FieldValue)> {
    let mut observed = vec![
        ("timestamp", FieldValue::Date(record.timestamp)),
        ("level", FieldValue::from(record.level.as_str())),
        ("message", FieldValue::from(record.message.as_str())),
        ("file", FieldValue::from(record.file.as_str())),
    ];
    let labels = [
        ("source", &record.source),
        ("service", &record.service),
        ("host", &record.host),
    ];
    for (name, value) in labels {
        if let Some(value) = value {
            observed.push((name, FieldValue::from(value.as_str())));
        }
    }
    // structured records also keep their label keys as fields
    for (name, value) in &record.fields {
        if !observed.iter().any(|(seen, _)| *seen == name.as_str()) {
            observed.push((name.as_str(), value.clone()));
        }
    }
    observed
}

/// Running value frequencies per field
#[derive(Debug, Clone, Default)]
pub struct FieldStats {
    fields: BTreeMap<String, FieldStat>,
}

impl FieldStats {
    pub fn add(&mut self, record: &LogRecord) {
        for (name, value) in observed_fields(record) {
            let stat = self.fields.entry(name.to_string()).or_default();
            *stat.counts.entry(value.to_string()).or_default() += 1;
            stat.last_value = Some(value);
        }
    }

    pub fn remove(&mut self, record: &LogRecord) {
        for (name, value) in observed_fields(record) {
            let Some(stat) = self.fields.get_mut(name) else {
                continue;
            };
            let key = value.to_string();
            if let Some(count) = stat.counts.get_mut(&key) {
                *count -= 1;
                if *count == 0 {
                    stat.counts.remove(&key);
                    // the sampled value is gone; infer from what remains
                    if stat.last_value.as_ref().is_some_and(|last| last.to_string() == key) {
                        stat.last_value = None;
                    }
                }
            }
            if stat.counts.is_empty() {
                self.fields.remove(name);
            }
        }
    }

    pub fn clear(&mut self) {
        self.fields.clear();
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn cardinality(&self, field: &str) -> Option<usize> {
        self.fields.get(field).map(|stat| stat.counts.len())
    }

    /// Suggestions sorted by field name
    pub fn suggestions(&self, max_examples: usize) -> Vec<FieldSuggestion> {
        self.fields
            .iter()
            .map(|(name, stat)| FieldSuggestion {
                field: name.clone(),
                field_type: stat.inferred_type(),
                cardinality: stat.counts.len(),
                examples: stat.examples(max_examples),
            })
            .collect()
    }
}
