//! Term normalisation and untrusted query validation.
//!
//! Everything here is pure. User input passes through these checks before
//! any of it is spliced into an engine query.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{AnnoSearchError, Result};

pub const MAX_QUERY_LENGTH: usize = 500;
pub const MAX_AUTOCOMPLETE_LENGTH: usize = 100;
pub const MAX_TERMS: usize = 20;
pub const MAX_OPERATORS: usize = 10;
pub const MAX_PARENTHESES: usize = 20;
pub const MIN_TERM_LENGTH: usize = 3;

/// Longest logical index id whose `_autocomplete` engine index still fits the
/// engine's 255-character id limit.
pub const MAX_INDEX_ID_LENGTH: usize = 242;

/// Two-letter terms that are still worth searching for.
pub const SHORT_TERM_WHITELIST: &[&str] = &["uk", "ai", "us"];

/// Characters stripped from normalised terms.
const STRIPPED_CHARS: &[char] = &[
    '{', '}', '[', ']', '(', ')', '~', '*', '?', '\\', '+', '"', '`', '\'',
];

/// Characters rejected outright in user queries.
const SPECIAL_CHARS: &[char] = &['{', '}', '[', ']', '(', ')', '~', '*', '?', '\\', '+', '`'];

/// Engine query-language metacharacters escaped inside quoted clauses.
const ESCAPED_CHARS: &[char] = &[
    '\\', '"', '\'', '+', '~', '*', '?', '{', '}', '[', ']', '(', ')',
];

static INDEX_ID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"^[a-zA-Z][a-zA-Z0-9_\-\.]{{2,{}}}$",
        MAX_INDEX_ID_LENGTH - 1
    ))
    .expect("index id regex")
});

static OPERATOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(AND|OR|NOT)\b").expect("operator regex"));

/// Lowercase a token and strip punctuation and engine metacharacters.
///
/// Idempotent: once the ends are alphanumeric, nothing further is removed.
pub fn normalize_term(term: &str) -> String {
    term.trim()
        .to_lowercase()
        .trim_matches(|c: char| !c.is_alphanumeric())
        .chars()
        .filter(|c| !STRIPPED_CHARS.contains(c))
        .collect()
}

/// Backslash-escape engine metacharacters. Each character is escaped once,
/// so an existing backslash is never double-escaped by a later pass.
pub fn escape_quickwit_query(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if ESCAPED_CHARS.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Check a logical index id before it becomes part of an engine URL path.
pub fn validate_index_id(index_id: &str) -> Result<()> {
    if !INDEX_ID_RE.is_match(index_id) {
        return Err(AnnoSearchError::validation(format!(
            "Invalid index parameter: {index_id}"
        )));
    }
    Ok(())
}

pub fn validate_no_special_chars(input: &str) -> Result<()> {
    if input.contains(SPECIAL_CHARS) {
        return Err(AnnoSearchError::validation(
            "Query contains invalid special characters",
        ));
    }
    Ok(())
}

/// Reject queries that would be expensive for the engine.
///
/// Checks run in a fixed order: operators, then parentheses, then terms.
pub fn validate_query_complexity(input: &str) -> Result<()> {
    if OPERATOR_RE.find_iter(input).count() > MAX_OPERATORS {
        return Err(AnnoSearchError::validation(
            "Query has too many boolean operators",
        ));
    }
    let parentheses = input.chars().filter(|c| matches!(c, '(' | ')')).count();
    if parentheses > MAX_PARENTHESES {
        return Err(AnnoSearchError::validation("Query has too many parentheses"));
    }
    if input.split_whitespace().count() > MAX_TERMS {
        return Err(AnnoSearchError::validation("Query has too many terms"));
    }
    Ok(())
}

/// Validate the `q` parameter of a search request. Returns the trimmed query.
pub fn validate_search_query_parameter(query: &str) -> Result<String> {
    let query = query.trim();
    if query.is_empty() {
        return Err(AnnoSearchError::validation("Missing query parameter"));
    }
    if query.chars().count() > MAX_QUERY_LENGTH {
        return Err(AnnoSearchError::validation(format!(
            "Query parameter is too long: maximum is {MAX_QUERY_LENGTH} characters"
        )));
    }
    validate_no_special_chars(query)?;
    validate_query_complexity(query)?;

    let terms: Vec<&str> = query.split_whitespace().collect();
    if terms.len() > MAX_TERMS {
        return Err(AnnoSearchError::validation("Query has too many terms"));
    }
    for term in terms {
        let normalized = normalize_term(term);
        if normalized.is_empty() {
            return Err(AnnoSearchError::validation(format!(
                "Query contains an invalid term: {term}"
            )));
        }
        if normalized.chars().count() < MIN_TERM_LENGTH
            && !SHORT_TERM_WHITELIST.contains(&normalized.as_str())
        {
            return Err(AnnoSearchError::validation(format!(
                "Query term is too short: {term}"
            )));
        }
    }
    Ok(query.to_string())
}

/// Validate the `q` parameter of an autocomplete request: a single prefix.
pub fn validate_autocomplete_query_parameter(query: &str) -> Result<String> {
    let query = query.trim();
    if query.chars().count() > MAX_AUTOCOMPLETE_LENGTH {
        return Err(AnnoSearchError::validation(format!(
            "Query parameter is too long: maximum is {MAX_AUTOCOMPLETE_LENGTH} characters"
        )));
    }
    validate_no_special_chars(query)?;
    if query.chars().any(char::is_whitespace) {
        return Err(AnnoSearchError::validation(
            "Autocomplete query must be a single term",
        ));
    }
    let normalized = normalize_term(query);
    if normalized.is_empty() {
        return Err(AnnoSearchError::validation("Missing query parameter"));
    }
    if normalized.chars().count() < MIN_TERM_LENGTH {
        return Err(AnnoSearchError::validation(format!(
            "Autocomplete query must be at least {MIN_TERM_LENGTH} characters"
        )));
    }
    Ok(query.to_string())
}
