//! Per-load term frequency accumulation for autocomplete.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::search::sanitize::normalize_term;

/// Terms this short or shorter are not suggested.
const MIN_SUGGESTED_LEN: usize = 3;

/// Trailing sentence punctuation removed before normalisation.
const TRAILING_PUNCTUATION: &[char] = &['.', ',', ';', ':', '!', '?', '\'', '"', ')', ']', '}'];

/// A row of the `_autocomplete` index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermRecord {
    pub term: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    pub frequency: u64,
}

/// Counts keyed on `(term, language)`. An absent language is the empty string.
#[derive(Debug, Default, Clone)]
pub struct TermFrequencies {
    counts: HashMap<(String, String), u64>,
}

impl TermFrequencies {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tokenise a body value on whitespace and count every usable term.
    pub fn record_text(&mut self, text: &str, language: Option<&str>) {
        let language = language.unwrap_or_default();
        for token in text.split_whitespace() {
            let term = normalize_term(token.trim_end_matches(TRAILING_PUNCTUATION));
            if term.chars().count() > MIN_SUGGESTED_LEN {
                *self
                    .counts
                    .entry((term, language.to_string()))
                    .or_insert(0) += 1;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn frequency(&self, term: &str, language: Option<&str>) -> u64 {
        self.counts
            .get(&(term.to_string(), language.unwrap_or_default().to_string()))
            .copied()
            .unwrap_or(0)
    }

    /// Drain into records, ordered by term then language for stable batches.
    pub fn into_records(self) -> Vec<TermRecord> {
        let mut records: Vec<TermRecord> = self
            .counts
            .into_iter()
            .map(|((term, language), frequency)| TermRecord {
                term,
                language: (!language.is_empty()).then_some(language),
                frequency,
            })
            .collect();
        records.sort_by(|a, b| a.term.cmp(&b.term).then_with(|| a.language.cmp(&b.language)));
        records
    }
}
