use std::time::Duration;

use annosearch::engine::QuickwitClient;
use annosearch::error::AnnoSearchError;
use annosearch::iiif::SourceKind;
use annosearch::load::{HttpFetcher, load_index};
use annosearch::search::{SearchClient, SearchParams};
use serde_json::json;

#[test]
fn errors_log_kind_and_message() {
    let trace = TestTracing::new();
    let _guard = trace.install();

    AnnoSearchError::validation("Missing query parameter").log();

    let out = trace.output();
    assert!(out.contains("ERROR"));
    assert!(out.contains("annosearch_error"));
    assert!(out.contains("validation"));
    assert!(out.contains("Missing query parameter"));
}

#[tokio::test]
async fn load_logs_batches_skips_and_summary() {
    let trace = TestTracing::new();
    let _guard = trace.install();

    let engine = MockEngine::start(MockState::default()).await;
    let collection = engine.doc_url("collection.json");
    engine.state.documents.lock().unwrap().insert(
        "collection.json".into(),
        json!({
            "id": collection,
            "type": "AnnotationCollection",
            "first": {
                "id": "https://example.org/page/1",
                "type": "AnnotationPage",
                "items": [
                    {"id": "https://example.org/a/1", "type": "Annotation", "body": {"type": "TextualBody", "value": "Annotation one"}, "target": "https://example.org/c/1"},
                    {"id": "https://example.org/a/1", "type": "Annotation", "body": {"type": "TextualBody", "value": "Annotation one"}, "target": "https://example.org/c/1"},
                    {"id": "https://example.org/a/2", "type": "Annotation", "body": {"type": "TextualBody", "value": "Annotation two"}, "target": "https://example.org/c/1"}
                ]
            }
        }),
    );
    let client = QuickwitClient::new(engine.engine_url(), Duration::from_secs(5)).unwrap();
    let fetcher = HttpFetcher::new(client.http().clone());

    load_index(&fetcher, &client, "demo", &collection, SourceKind::AnnotationCollection, false)
        .await
        .unwrap();

    let out = trace.output();
    assert!(out.contains("load_start"));
    assert!(out.contains("duplicate annotation skipped"));
    assert!(out.contains("ingested batch"));
    assert!(out.contains("records=2"));
    assert!(out.contains("load_finished"));
}

#[tokio::test]
async fn search_logs_index_and_page() {
    let trace = TestTracing::new();
    let _guard = trace.install();

    let engine = MockEngine::start(MockState::default().with_annotations(annotation_corpus(3))).await;
    let client = QuickwitClient::new(engine.engine_url(), Duration::from_secs(5)).unwrap();
    let search = SearchClient::new(client, "http://localhost:3000", 20, 25);

    let params = SearchParams {
        q: "annotation".into(),
        ..Default::default()
    };
    search.search_index("demo", &params).await.unwrap();

    let out = trace.output();
    assert!(out.contains("search"));
    assert!(out.contains("page=0"));
    assert!(out.contains("max_hits=20"));
}

// Re-export util module so tests can find helpers without extra path noise.
mod util;
use util::{MockEngine, MockState, TestTracing, annotation_corpus};
