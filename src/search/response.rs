//! Shaping engine hits into IIIF Content Search 2.0 documents.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::highlight::HighlightPage;
use crate::engine::EngineSearchResponse;
use crate::error::Result;
use crate::load::TermRecord;

pub const SEARCH_CONTEXT: &str = "http://iiif.io/api/search/2/context.json";

/// A page of search results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationPage {
    #[serde(rename = "@context")]
    pub context: String,
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "partOf", default, skip_serializing_if = "Option::is_none")]
    pub part_of: Option<PartOf>,
    #[serde(rename = "startIndex")]
    pub start_index: u64,
    pub items: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prev: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<Vec<HighlightPage>>,
}

/// The result set as a whole; only emitted when it spans several pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartOf {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub total: u64,
    pub first: PageRef,
    pub last: PageRef,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRef {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl PageRef {
    fn annotation_page(id: String) -> Self {
        Self {
            id,
            kind: "AnnotationPage".into(),
        }
    }
}

/// Autocomplete response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermPage {
    #[serde(rename = "@context")]
    pub context: String,
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ignored: Option<Vec<String>>,
    pub items: Vec<TermItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermItem {
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    pub total: u64,
    pub service: Vec<ServiceRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceRef {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// Everything a search response id is derived from.
#[derive(Debug, Clone, Copy)]
pub struct SearchContext<'a> {
    pub index_id: &'a str,
    pub search_url: &'a str,
    pub q: &'a str,
    pub motivation: Option<&'a str>,
    pub date: Option<&'a str>,
    pub user: Option<&'a str>,
    pub max_hits: usize,
    pub page: usize,
}

impl SearchContext<'_> {
    /// The query URL without a page number. Filters appear in a fixed order.
    pub fn canonical_id(&self) -> String {
        let mut id = format!(
            "{}/{}/search?q={}",
            self.search_url,
            self.index_id,
            urlencoding::encode(self.q)
        );
        for (name, value) in [
            ("motivation", self.motivation),
            ("date", self.date),
            ("user", self.user),
        ] {
            if let Some(value) = value {
                id.push_str(&format!("&{name}={}", urlencoding::encode(value)));
            }
        }
        id
    }
}

fn page_id(canonical: &str, page: usize) -> String {
    format!("{canonical}&page={page}")
}

pub fn make_search_response(ctx: &SearchContext<'_>, engine: EngineSearchResponse) -> AnnotationPage {
    let max_hits = ctx.max_hits.max(1) as u64;
    let total_pages = engine.num_hits.div_ceil(max_hits) as usize;
    let canonical = ctx.canonical_id();

    let part_of = (total_pages > 1).then(|| PartOf {
        id: canonical.clone(),
        kind: "AnnotationCollection".into(),
        total: engine.num_hits,
        first: PageRef::annotation_page(page_id(&canonical, 0)),
        last: PageRef::annotation_page(page_id(&canonical, total_pages - 1)),
    });
    let next = (ctx.page + 1 < total_pages).then(|| page_id(&canonical, ctx.page + 1));
    let prev = (ctx.page > 0).then(|| page_id(&canonical, ctx.page - 1));

    AnnotationPage {
        context: SEARCH_CONTEXT.into(),
        id: page_id(&canonical, ctx.page),
        kind: "AnnotationPage".into(),
        part_of,
        start_index: (ctx.page * ctx.max_hits) as u64,
        items: engine.hits,
        next,
        prev,
        annotations: None,
    }
}

/// Hits must be term records; anything else is a parse failure.
pub fn make_autocomplete_response(
    index_id: &str,
    search_url: &str,
    q: &str,
    engine: EngineSearchResponse,
    ignored: &[String],
) -> Result<TermPage> {
    let items = engine
        .hits
        .into_iter()
        .map(|hit| {
            let record: TermRecord = serde_json::from_value(hit)?;
            Ok(TermItem {
                service: vec![ServiceRef {
                    id: format!(
                        "{search_url}/{index_id}/search?q={}",
                        urlencoding::encode(&record.term)
                    ),
                    kind: "SearchService2".into(),
                }],
                value: record.term,
                language: record.language,
                total: record.frequency,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(TermPage {
        context: SEARCH_CONTEXT.into(),
        id: format!(
            "{search_url}/{index_id}/autocomplete?q={}",
            urlencoding::encode(q)
        ),
        kind: "TermPage".into(),
        ignored: (!ignored.is_empty()).then(|| ignored.to_vec()),
        items,
    })
}
