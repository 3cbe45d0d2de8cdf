//! Translation of validated user queries into the engine query language, and
//! the search/autocomplete orchestration built on it.

use chrono::DateTime;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::highlight::highlight_terms;
use super::response::{
    AnnotationPage, SearchContext, TermPage, make_autocomplete_response, make_search_response,
};
use super::sanitize::{
    escape_quickwit_query, validate_autocomplete_query_parameter, validate_index_id,
    validate_search_query_parameter,
};
use crate::config::AnnoSearchConfig;
use crate::engine::{EngineSearchRequest, QuickwitClient, annotations_index, autocomplete_index};
use crate::error::{AnnoSearchError, Result};

/// Motivations accepted as a search filter.
pub const MOTIVATIONS: &[&str] = &[
    "painting",
    "supplementing",
    "contextualizing",
    "contentState",
    "highlighting",
    "commenting",
    "tagging",
];

static INSTANT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}Z$").expect("instant regex")
});

static USER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(https?|ftp)://[^\s/$.?#].[^\s]*$").expect("user regex"));

pub fn validate_page(page: i64) -> Result<usize> {
    usize::try_from(page)
        .map_err(|_| AnnoSearchError::validation(format!("Invalid page number: {page}")))
}

/// Parse a raw `page` parameter. Absent or blank means the first page.
pub fn parse_page(raw: Option<&str>) -> Result<i64> {
    match raw.map(str::trim) {
        None | Some("") => Ok(0),
        Some(raw) => raw
            .parse::<i64>()
            .map_err(|_| AnnoSearchError::validation(format!("Invalid page number: {raw}"))),
    }
}

pub fn validate_max_hits(max_hits: usize) -> Result<()> {
    if max_hits == 0 {
        return Err(AnnoSearchError::validation(
            "Invalid maxHits value: must be a positive integer",
        ));
    }
    Ok(())
}

pub fn validate_offset(page: usize, max_hits: usize) -> Result<usize> {
    page.checked_mul(max_hits)
        .ok_or_else(|| AnnoSearchError::validation("Invalid offset: page is out of range"))
}

pub fn validate_motivation(motivation: Option<&str>) -> Result<()> {
    match motivation {
        Some(m) if !MOTIVATIONS.contains(&m) => Err(AnnoSearchError::validation(format!(
            "Invalid motivation: {m}. Must be one of: {}",
            MOTIVATIONS.join(", ")
        ))),
        _ => Ok(()),
    }
}

/// Split a `date` parameter into `(start, end)` pairs.
///
/// Each space-separated range is `start/end`, both RFC 3339 UTC instants to
/// the second, with `start <= end`.
pub fn validate_date_ranges(date: Option<&str>) -> Result<Vec<(&str, &str)>> {
    let Some(date) = date else {
        return Ok(Vec::new());
    };
    date.split_whitespace()
        .map(|range| {
            let invalid = || AnnoSearchError::validation(format!("Invalid date range: {range}"));
            let (start, end) = range.split_once('/').ok_or_else(invalid)?;
            if !INSTANT_RE.is_match(start) || !INSTANT_RE.is_match(end) {
                return Err(invalid());
            }
            let from = DateTime::parse_from_rfc3339(start).map_err(|_| invalid())?;
            let to = DateTime::parse_from_rfc3339(end).map_err(|_| invalid())?;
            if from > to {
                return Err(invalid());
            }
            Ok((start, end))
        })
        .collect()
}

pub fn validate_user(user: Option<&str>) -> Result<Vec<&str>> {
    let Some(user) = user else {
        return Ok(Vec::new());
    };
    user.split_whitespace()
        .map(|uri| {
            if USER_RE.is_match(uri) {
                Ok(uri)
            } else {
                Err(AnnoSearchError::validation(format!("Invalid user URI: {uri}")))
            }
        })
        .collect()
}

/// Build the engine query for a validated search.
///
/// Every query term is a quoted phrase on `body.value`; filters are appended
/// with `AND` and alternatives inside a filter are `OR`-joined.
pub fn build_search_query(
    q: &str,
    motivation: Option<&str>,
    date_ranges: &[(&str, &str)],
    users: &[&str],
) -> String {
    let mut query = q
        .split_whitespace()
        .map(|term| format!("(body.value:\"{}\")", escape_quickwit_query(term)))
        .collect::<Vec<_>>()
        .join(" AND ");

    if let Some(motivation) = motivation {
        query.push_str(&format!(
            " AND motivation:\"{}\"",
            escape_quickwit_query(motivation)
        ));
    }
    if !date_ranges.is_empty() {
        let ranges = date_ranges
            .iter()
            .map(|(start, end)| format!("created:[{start} TO {end}]"))
            .collect::<Vec<_>>()
            .join(" OR ");
        query.push_str(&format!(" AND ({ranges})"));
    }
    if !users.is_empty() {
        let creators = users
            .iter()
            .map(|user| {
                let user = escape_quickwit_query(user);
                format!("creator:\"{user}\" OR creator.id:\"{user}\"")
            })
            .collect::<Vec<_>>()
            .join(" OR ");
        query.push_str(&format!(" AND ({creators})"));
    }
    query
}

/// Prefix query over the term index. Stored terms are lowercase, so the
/// prefix is too.
pub fn build_autocomplete_query(q: &str) -> String {
    format!("term:{}*", escape_quickwit_query(&q.to_lowercase()))
}

/// Search request parameters as received from a caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchParams {
    pub q: String,
    #[serde(default)]
    pub motivation: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub page: i64,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Runs searches against the engine and shapes the answers.
#[derive(Debug, Clone)]
pub struct SearchClient {
    engine: QuickwitClient,
    search_url: String,
    max_hits: usize,
    snippet_length: usize,
}

impl SearchClient {
    pub fn new(
        engine: QuickwitClient,
        search_url: impl Into<String>,
        max_hits: usize,
        snippet_length: usize,
    ) -> Self {
        Self {
            engine,
            search_url: search_url.into(),
            max_hits,
            snippet_length,
        }
    }

    pub fn from_config(config: &AnnoSearchConfig) -> Result<Self> {
        Ok(Self::new(
            QuickwitClient::from_config(config)?,
            config.search_url(),
            config.max_hits,
            config.snippet_length,
        ))
    }

    /// Validate, query the annotations index, shape and highlight.
    pub async fn search_index(&self, index_id: &str, params: &SearchParams) -> Result<AnnotationPage> {
        validate_index_id(index_id)?;
        let q = validate_search_query_parameter(&params.q)?;
        let page = validate_page(params.page)?;
        validate_max_hits(self.max_hits)?;
        let date = non_empty(&params.date);
        let date_ranges = validate_date_ranges(date)?;
        let start_offset = validate_offset(page, self.max_hits)?;
        let motivation = non_empty(&params.motivation);
        validate_motivation(motivation)?;
        let user = non_empty(&params.user);
        let users = validate_user(user)?;

        let request = EngineSearchRequest {
            query: build_search_query(&q, motivation, &date_ranges, &users),
            max_hits: self.max_hits,
            start_offset,
            sort_by: None,
        };
        info!(index = index_id, page, max_hits = self.max_hits, "search");
        let engine_response = self
            .engine
            .search(&annotations_index(index_id), &request)
            .await?;

        let ctx = SearchContext {
            index_id,
            search_url: &self.search_url,
            q: &q,
            motivation,
            date,
            user,
            max_hits: self.max_hits,
            page,
        };
        let mut response = make_search_response(&ctx, engine_response);
        highlight_terms(&mut response, &q, self.snippet_length);
        Ok(response)
    }

    /// Prefix search over the term index, most frequent first. `ignored`
    /// names the caller's parameters that autocomplete does not apply.
    pub async fn search_autocomplete(
        &self,
        index_id: &str,
        q: &str,
        ignored: &[String],
    ) -> Result<TermPage> {
        validate_index_id(index_id)?;
        let q = validate_autocomplete_query_parameter(q)?;
        validate_max_hits(self.max_hits)?;

        let request = EngineSearchRequest {
            query: build_autocomplete_query(&q),
            max_hits: self.max_hits,
            start_offset: 0,
            sort_by: Some("frequency".into()),
        };
        info!(index = index_id, max_hits = self.max_hits, "autocomplete");
        let engine_response = self
            .engine
            .search(&autocomplete_index(index_id), &request)
            .await?;
        make_autocomplete_response(index_id, &self.search_url, &q, engine_response, ignored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_terms_are_quoted_and_anded() {
        assert_eq!(
            build_search_query("annotation text", None, &[], &[]),
            r#"(body.value:"annotation") AND (body.value:"text")"#
        );
    }

    #[test]
    fn filters_are_appended() {
        let query = build_search_query(
            "london",
            Some("commenting"),
            &[
                ("2023-01-01T00:00:00Z", "2023-06-30T00:00:00Z"),
                ("2024-01-01T00:00:00Z", "2024-02-01T00:00:00Z"),
            ],
            &["https://example.org/u/1"],
        );
        assert_eq!(
            query,
            "(body.value:\"london\") AND motivation:\"commenting\" \
             AND (created:[2023-01-01T00:00:00Z TO 2023-06-30T00:00:00Z] OR created:[2024-01-01T00:00:00Z TO 2024-02-01T00:00:00Z]) \
             AND (creator:\"https://example.org/u/1\" OR creator.id:\"https://example.org/u/1\")"
        );
    }

    #[test]
    fn quotes_inside_terms_are_escaped() {
        assert_eq!(
            build_search_query("o\"brien", None, &[], &[]),
            r#"(body.value:"o\"brien")"#
        );
    }

    #[test]
    fn autocomplete_query_is_prefix() {
        assert_eq!(build_autocomplete_query("anno"), "term:anno*");
        assert_eq!(build_autocomplete_query("Anno"), "term:anno*");
        assert_eq!(build_autocomplete_query("ÉMILE"), "term:émile*");
    }

    #[test]
    fn page_must_be_non_negative() {
        assert_eq!(validate_page(2).unwrap(), 2);
        assert!(validate_page(-1).is_err());
        assert_eq!(parse_page(None).unwrap(), 0);
        assert_eq!(parse_page(Some("3")).unwrap(), 3);
        assert!(parse_page(Some("two")).is_err());
    }

    #[test]
    fn offset_overflow_is_rejected() {
        assert_eq!(validate_offset(2, 20).unwrap(), 40);
        assert!(validate_offset(usize::MAX, 20).is_err());
    }

    #[test]
    fn motivation_enum() {
        assert!(validate_motivation(None).is_ok());
        assert!(validate_motivation(Some("contentState")).is_ok());
        assert!(validate_motivation(Some("describing")).is_err());
    }

    #[test]
    fn date_ranges() {
        let ranges = validate_date_ranges(Some(
            "2023-01-01T00:00:00Z/2023-12-31T23:59:59Z 2024-01-01T00:00:00Z/2024-01-02T00:00:00Z",
        ))
        .unwrap();
        assert_eq!(ranges.len(), 2);
        assert_eq!(ranges[0].1, "2023-12-31T23:59:59Z");

        for bad in [
            "2023-01-01T00:00:00Z",
            "2023-01-01/2023-02-01",
            "2023-02-01T00:00:00Z/2023-01-01T00:00:00Z",
            "2023-13-01T00:00:00Z/2023-14-01T00:00:00Z",
        ] {
            assert!(validate_date_ranges(Some(bad)).is_err(), "{bad}");
        }
    }

    #[test]
    fn user_uris() {
        assert_eq!(
            validate_user(Some("https://a.org/u ftp://b.org/x")).unwrap(),
            vec!["https://a.org/u", "ftp://b.org/x"]
        );
        assert!(validate_user(Some("not-a-uri")).is_err());
        assert!(validate_user(None).unwrap().is_empty());
    }

    #[test]
    fn blank_filters_are_absent() {
        assert_eq!(non_empty(&Some("  ".into())), None);
        assert_eq!(non_empty(&Some(" tagging ".into())), Some("tagging"));
    }
}
