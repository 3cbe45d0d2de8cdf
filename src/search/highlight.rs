//! Match snippets for search results.
//!
//! Each whole-word occurrence of a query term inside a textual body becomes a
//! `highlighting` annotation whose target is a `TextQuoteSelector` over the
//! source annotation.

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use super::response::AnnotationPage;
use super::sanitize::normalize_term;
use crate::iiif::{document_id, textual_bodies};

pub const DEFAULT_SNIPPET_LENGTH: usize = 25;

const ELLIPSIS: &str = "...";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighlightPage {
    #[serde(rename = "type")]
    pub kind: String,
    pub items: Vec<HighlightMatch>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighlightMatch {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub motivation: String,
    pub target: SpecificResource,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecificResource {
    #[serde(rename = "type")]
    pub kind: String,
    pub source: String,
    pub selector: Vec<TextQuoteSelector>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextQuoteSelector {
    #[serde(rename = "type")]
    pub kind: String,
    pub prefix: String,
    pub exact: String,
    pub suffix: String,
}

fn term_pattern(term: &str) -> Option<Regex> {
    RegexBuilder::new(&format!(r"\b{}\b", regex::escape(term)))
        .case_insensitive(true)
        .build()
        .ok()
}

/// Up to `limit` characters immediately before a match.
fn leading_context(before: &str, limit: usize) -> String {
    let count = before.chars().count();
    if count <= limit {
        return before.to_string();
    }
    let kept: String = before.chars().skip(count - limit).collect();
    format!("{ELLIPSIS}{kept}")
}

/// Up to `limit` characters immediately after a match.
fn trailing_context(after: &str, limit: usize) -> String {
    if after.chars().count() <= limit {
        return after.to_string();
    }
    let kept: String = after.chars().take(limit).collect();
    format!("{kept}{ELLIPSIS}")
}

/// Replace `page.annotations` with one page of highlight matches.
///
/// Match ids are numbered from 1 across the whole page: items in order, then
/// query terms in order, then occurrences in document order.
pub fn highlight_terms(page: &mut AnnotationPage, query: &str, snippet_length: usize) {
    let patterns: Vec<Regex> = query
        .split_whitespace()
        .map(normalize_term)
        .filter(|term| !term.is_empty())
        .filter_map(|term| term_pattern(&term))
        .collect();

    let mut counter = 1usize;
    let mut matches = Vec::new();
    for item in &page.items {
        let bodies = textual_bodies(item);
        if bodies.is_empty() {
            continue;
        }
        let source = document_id(item).unwrap_or_default();
        for pattern in &patterns {
            for body in &bodies {
                let text = body.value.as_str();
                for found in pattern.find_iter(text) {
                    matches.push(HighlightMatch {
                        id: format!("{source}/match-{counter}"),
                        kind: "Annotation".into(),
                        motivation: "highlighting".into(),
                        target: SpecificResource {
                            kind: "SpecificResource".into(),
                            source: source.to_string(),
                            selector: vec![TextQuoteSelector {
                                kind: "TextQuoteSelector".into(),
                                prefix: leading_context(&text[..found.start()], snippet_length),
                                exact: found.as_str().to_string(),
                                suffix: trailing_context(&text[found.end()..], snippet_length),
                            }],
                        },
                    });
                    counter += 1;
                }
            }
        }
    }

    page.annotations = Some(vec![HighlightPage {
        kind: "AnnotationPage".into(),
        items: matches,
    }]);
}
