//! Crawl of IIIF Manifests, Collections and W3C AnnotationCollections.
//!
//! All mutable state of a load (seen-id sets, the term accumulator, the
//! summary counters) lives on one [`Loader`] value, so loads never share
//! anything and can run concurrently in one process.

use std::collections::HashSet;

use indicatif::ProgressBar;
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use super::fetch::SourceFetcher;
use super::terms::TermFrequencies;
use crate::engine::{IngestSink, annotations_index, autocomplete_index, ingest_data};
use crate::error::{AnnoSearchError, Result};
use crate::iiif::{
    Document, Embedded, SourceKind, annotation_collection_first, annotation_page_source,
    collection_manifests, collection_subcollections, declared_type, document_id,
    manifest_annotation_pages, page_annotations, page_next, part_of, target_with_part_of,
    textual_bodies,
};
use crate::search::sanitize::validate_index_id;

/// Term records per autocomplete ingest request.
pub const TERM_BATCH_SIZE: usize = 1000;

/// Counters reported at the end of a load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadSummary {
    pub manifests: usize,
    pub collections: usize,
    pub pages: usize,
    pub annotations: usize,
    pub skipped_pages: usize,
    pub skipped_annotations: usize,
    pub terms: usize,
}

/// Lazy, finite sequence of annotation pages. Each call yields the next page,
/// fetching it if it is only referenced; the sequence ends at a page without
/// a `next` link.
#[derive(Debug)]
pub struct PageCursor {
    pending: Option<Embedded>,
}

impl PageCursor {
    pub fn new(start: Embedded) -> Self {
        Self {
            pending: Some(start),
        }
    }

    pub async fn next_page<F: SourceFetcher>(&mut self, fetcher: &F) -> Result<Option<Value>> {
        let Some(source) = self.pending.take() else {
            return Ok(None);
        };
        let page = match source {
            Embedded::Inline(page) => page,
            Embedded::Reference(uri) => {
                let page = fetcher.fetch_json(&uri).await?;
                // Untyped pages are taken as they come.
                if declared_type(&page).is_none() {
                    page
                } else {
                    Document::parse(page)?.into_annotation_page()?
                }
            }
        };
        self.pending = page_next(&page).map(Embedded::Reference);
        Ok(Some(page))
    }

    /// Abandon the rest of the chain.
    pub fn stop(&mut self) {
        self.pending = None;
    }
}

/// De-duplication state scoped to one manifest or annotation collection.
#[derive(Debug, Default)]
struct SeenIds {
    pages: HashSet<String>,
    annotations: HashSet<String>,
}

pub struct Loader<'a, F, S> {
    fetcher: &'a F,
    sink: &'a S,
    index_id: String,
    commit: bool,
    terms: TermFrequencies,
    summary: LoadSummary,
    progress: ProgressBar,
}

impl<'a, F: SourceFetcher, S: IngestSink> Loader<'a, F, S> {
    pub fn new(fetcher: &'a F, sink: &'a S, index_id: impl Into<String>, commit: bool) -> Self {
        Self {
            fetcher,
            sink,
            index_id: index_id.into(),
            commit,
            terms: TermFrequencies::new(),
            summary: LoadSummary::default(),
            progress: ProgressBar::hidden(),
        }
    }

    /// Tick `progress` once per ingested annotation.
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    pub async fn run(mut self, uri: &str, kind: SourceKind) -> Result<LoadSummary> {
        validate_index_id(&self.index_id)?;
        if uri.trim().is_empty() {
            return Err(AnnoSearchError::validation("Invalid uri parameter"));
        }

        let annotations = annotations_index(&self.index_id);
        let published = self.sink.num_published_docs(&annotations).await?;
        if published > 0 {
            return Err(AnnoSearchError::validation(format!(
                "Index {annotations} already contains {published} documents; delete and re-initialise it before loading"
            )));
        }

        info!(index = %self.index_id, uri, kind = %kind, "load_start");
        if let Err(err) = self.traverse(uri, kind).await {
            warn!(
                index = %self.index_id,
                pages = self.summary.pages,
                annotations = self.summary.annotations,
                "load aborted; batches already ingested remain in the engine"
            );
            self.progress.abandon();
            return Err(err);
        }
        self.flush_terms().await?;
        self.progress.finish_and_clear();

        info!(
            index = %self.index_id,
            manifests = self.summary.manifests,
            pages = self.summary.pages,
            annotations = self.summary.annotations,
            terms = self.summary.terms,
            "load_finished"
        );
        Ok(self.summary)
    }

    async fn traverse(&mut self, uri: &str, kind: SourceKind) -> Result<()> {
        match kind {
            SourceKind::Manifest => self.process_manifest(uri).await,
            SourceKind::Collection => self.process_collection(uri).await,
            SourceKind::AnnotationCollection => self.process_annotation_collection(uri).await,
        }
    }

    async fn fetch_expecting(&self, uri: &str, kind: SourceKind) -> Result<Value> {
        Document::parse(self.fetcher.fetch_json(uri).await?)?.expect(kind)
    }

    async fn process_manifest(&mut self, uri: &str) -> Result<()> {
        let manifest = self.fetch_expecting(uri, SourceKind::Manifest).await?;
        let provenance = part_of(uri, SourceKind::Manifest);
        let mut seen = SeenIds::default();

        for entry in manifest_annotation_pages(&manifest) {
            let Some(source) = annotation_page_source(&entry) else {
                warn!(manifest = uri, "annotation page without id or items skipped");
                self.summary.skipped_pages += 1;
                continue;
            };
            if let Embedded::Reference(page_uri) = &source
                && seen.pages.contains(page_uri)
            {
                warn!(manifest = uri, page = %page_uri, "duplicate annotation page skipped");
                self.summary.skipped_pages += 1;
                continue;
            }
            self.drain_pages(PageCursor::new(source), &provenance, &mut seen)
                .await?;
        }

        self.summary.manifests += 1;
        Ok(())
    }

    /// Depth-first over nested collections. A collection that lists
    /// manifests has them loaded; only a collection without manifests is
    /// descended into.
    async fn process_collection(&mut self, uri: &str) -> Result<()> {
        let mut seen_collections: HashSet<String> = HashSet::new();
        let mut stack = vec![Embedded::Reference(uri.to_string())];

        while let Some(entry) = stack.pop() {
            let (collection, fetched_from) = match entry {
                Embedded::Inline(collection) => (collection, None),
                Embedded::Reference(collection_uri) => {
                    if seen_collections.contains(&collection_uri) {
                        warn!(collection = %collection_uri, "collection already processed");
                        continue;
                    }
                    let collection = self
                        .fetch_expecting(&collection_uri, SourceKind::Collection)
                        .await?;
                    (collection, Some(collection_uri))
                }
            };

            let ids: Vec<String> = document_id(&collection)
                .map(str::to_string)
                .into_iter()
                .chain(fetched_from)
                .collect();
            if ids.iter().any(|id| seen_collections.contains(id)) {
                warn!(collection = ?ids.first(), "collection already processed");
                continue;
            }
            seen_collections.extend(ids);
            self.summary.collections += 1;

            let manifests = collection_manifests(&collection);
            if !manifests.is_empty() {
                for manifest in manifests {
                    let manifest_id = document_id(manifest)
                        .ok_or_else(|| AnnoSearchError::validation("Manifest ID is null"))?
                        .to_string();
                    self.process_manifest(&manifest_id).await?;
                }
                continue;
            }

            // Reversed so the first member is popped first.
            stack.extend(collection_subcollections(&collection).into_iter().rev());
        }
        Ok(())
    }

    async fn process_annotation_collection(&mut self, uri: &str) -> Result<()> {
        let collection = self
            .fetch_expecting(uri, SourceKind::AnnotationCollection)
            .await?;
        let first = annotation_collection_first(&collection)
            .ok_or_else(|| AnnoSearchError::parse("AnnotationCollection has no first page"))?;
        let provenance = part_of(uri, SourceKind::AnnotationCollection);
        let mut seen = SeenIds::default();
        self.drain_pages(PageCursor::new(first), &provenance, &mut seen)
            .await
    }

    async fn drain_pages(
        &mut self,
        mut cursor: PageCursor,
        provenance: &Value,
        seen: &mut SeenIds,
    ) -> Result<()> {
        while let Some(page) = cursor.next_page(self.fetcher).await? {
            if let Some(id) = document_id(&page)
                && !seen.pages.insert(id.to_string())
            {
                warn!(page = id, "duplicate annotation page skipped");
                self.summary.skipped_pages += 1;
                cursor.stop();
                continue;
            }
            self.process_page(&page, provenance, &mut seen.annotations)
                .await?;
        }
        Ok(())
    }

    async fn process_page(
        &mut self,
        page: &Value,
        provenance: &Value,
        seen_annotations: &mut HashSet<String>,
    ) -> Result<()> {
        let mut batch = Vec::new();
        for annotation in page_annotations(page) {
            if let Some(id) = document_id(annotation)
                && !seen_annotations.insert(id.to_string())
            {
                warn!(annotation = id, "duplicate annotation skipped");
                self.summary.skipped_annotations += 1;
                continue;
            }
            for body in textual_bodies(annotation) {
                self.terms.record_text(&body.value, body.language.as_deref());
            }
            batch.push(with_provenance(annotation, provenance));
        }

        self.summary.pages += 1;
        ingest_data(self.sink, &annotations_index(&self.index_id), &batch, self.commit).await?;
        self.summary.annotations += batch.len();
        self.progress.inc(batch.len() as u64);
        Ok(())
    }

    async fn flush_terms(&mut self) -> Result<()> {
        let terms = std::mem::take(&mut self.terms);
        self.summary.terms = terms.len();
        let index = autocomplete_index(&self.index_id);
        for chunk in terms.into_records().chunks(TERM_BATCH_SIZE) {
            ingest_data(self.sink, &index, chunk, self.commit).await?;
        }
        Ok(())
    }
}

fn with_provenance(annotation: &Value, provenance: &Value) -> Value {
    let mut record = annotation.clone();
    let target = target_with_part_of(annotation.get("target"), provenance);
    if let Some(obj) = record.as_object_mut() {
        obj.insert("target".into(), target);
    }
    record
}

/// Load one source document graph into `index_id`.
pub async fn load_index<F: SourceFetcher, S: IngestSink>(
    fetcher: &F,
    sink: &S,
    index_id: &str,
    uri: &str,
    kind: SourceKind,
    commit: bool,
) -> Result<LoadSummary> {
    Loader::new(fetcher, sink, index_id, commit).run(uri, kind).await
}
