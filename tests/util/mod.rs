use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};

/// Captures tracing output for tests.
#[allow(dead_code)]
pub struct TestTracing {
    buffer: Arc<Mutex<Vec<u8>>>,
}

#[allow(dead_code)]
impl TestTracing {
    pub fn new() -> Self {
        Self {
            buffer: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        let writer = self.buffer.clone();
        let make_writer = move || TestWriter(writer.clone());
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .without_time()
            .with_writer(make_writer)
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    pub fn output(&self) -> String {
        let buf = self.buffer.lock().unwrap();
        String::from_utf8_lossy(&buf).to_string()
    }
}

struct TestWriter(Arc<Mutex<Vec<u8>>>);

impl std::io::Write for TestWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let mut guard = self.0.lock().unwrap();
        guard.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// One ingest request as the mock engine received it.
#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct Ingested {
    pub index: String,
    pub payload: String,
    pub commit: Option<String>,
}

#[allow(dead_code)]
impl Ingested {
    pub fn records(&self) -> Vec<Value> {
        self.payload
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }
}

/// Shared state of the mock engine and document host.
#[allow(dead_code)]
#[derive(Clone, Default)]
pub struct MockState {
    pub annotations: Arc<Mutex<Vec<Value>>>,
    pub terms: Arc<Mutex<Vec<Value>>>,
    pub published: Arc<Mutex<u64>>,
    pub ingested: Arc<Mutex<Vec<Ingested>>>,
    pub queries: Arc<Mutex<Vec<Value>>>,
    pub documents: Arc<Mutex<HashMap<String, Value>>>,
}

#[allow(dead_code)]
impl MockState {
    pub fn with_annotations(self, annotations: Vec<Value>) -> Self {
        *self.annotations.lock().unwrap() = annotations;
        self
    }

    pub fn with_terms(self, terms: Vec<Value>) -> Self {
        *self.terms.lock().unwrap() = terms;
        self
    }

    pub fn with_document(self, path: &str, doc: Value) -> Self {
        self.documents.lock().unwrap().insert(path.to_string(), doc);
        self
    }

    pub fn ingested(&self) -> Vec<Ingested> {
        self.ingested.lock().unwrap().clone()
    }

    pub fn last_query(&self) -> Value {
        self.queries.lock().unwrap().last().cloned().unwrap_or(Value::Null)
    }
}

const KNOWN_INDEXES: &[&str] = &["demo_annotations", "demo_autocomplete"];

fn unknown_index(index: &str) -> (StatusCode, Json<Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "message": format!("could not find index `{index}`") })),
    )
}

/// Only the filters the tests exercise are interpreted.
fn matches(doc: &Value, query: &str) -> bool {
    if let Some(rest) = query.split("motivation:\"").nth(1) {
        let motivation = rest.split('"').next().unwrap_or_default();
        return doc["motivation"] == motivation;
    }
    if let Some(prefix) = query.strip_prefix("term:").and_then(|q| q.strip_suffix('*')) {
        return doc["term"].as_str().is_some_and(|t| t.starts_with(prefix));
    }
    true
}

async fn search(
    State(state): State<MockState>,
    Path(index): Path<String>,
    Json(request): Json<Value>,
) -> (StatusCode, Json<Value>) {
    state
        .queries
        .lock()
        .unwrap()
        .push(json!({ "index": index, "request": request.clone() }));
    let corpus = match index.as_str() {
        "demo_annotations" => state.annotations.lock().unwrap().clone(),
        "demo_autocomplete" => state.terms.lock().unwrap().clone(),
        _ => return unknown_index(&index),
    };
    let query = request["query"].as_str().unwrap_or_default();
    let max_hits = request["max_hits"].as_u64().unwrap_or(20) as usize;
    let offset = request["start_offset"].as_u64().unwrap_or(0) as usize;

    let hits: Vec<Value> = corpus.into_iter().filter(|doc| matches(doc, query)).collect();
    let page: Vec<Value> = hits.iter().skip(offset).take(max_hits).cloned().collect();
    (
        StatusCode::OK,
        Json(json!({ "num_hits": hits.len(), "hits": page })),
    )
}

async fn ingest(
    State(state): State<MockState>,
    Path(index): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    payload: String,
) -> (StatusCode, Json<Value>) {
    if !KNOWN_INDEXES.contains(&index.as_str()) {
        return unknown_index(&index);
    }
    let lines = payload.lines().count();
    state.ingested.lock().unwrap().push(Ingested {
        index,
        payload,
        commit: params.get("commit").cloned(),
    });
    (
        StatusCode::OK,
        Json(json!({ "num_docs_for_processing": lines })),
    )
}

async fn describe(
    State(state): State<MockState>,
    Path(index): Path<String>,
) -> (StatusCode, Json<Value>) {
    if !KNOWN_INDEXES.contains(&index.as_str()) {
        return unknown_index(&index);
    }
    let published = *state.published.lock().unwrap();
    (
        StatusCode::OK,
        Json(json!({ "index_id": index, "num_published_docs": published })),
    )
}

async fn document(
    State(state): State<MockState>,
    Path(path): Path<String>,
) -> (StatusCode, Json<Value>) {
    match state.documents.lock().unwrap().get(&path) {
        Some(doc) => (StatusCode::OK, Json(doc.clone())),
        None => (StatusCode::NOT_FOUND, Json(json!({ "message": "no such document" }))),
    }
}

/// A Quickwit-like engine plus a static IIIF document host on one ephemeral port.
#[allow(dead_code)]
pub struct MockEngine {
    pub addr: SocketAddr,
    pub state: MockState,
}

#[allow(dead_code)]
impl MockEngine {
    pub async fn start(state: MockState) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = Router::new()
            .route("/api/v1/:index/search", post(search))
            .route("/api/v1/:index/ingest", post(ingest))
            .route("/api/v1/indexes/:index/describe", get(describe))
            .route("/iiif/*path", get(document))
            .with_state(state.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Self { addr, state }
    }

    pub fn engine_url(&self) -> String {
        format!("http://{}/api/v1/", self.addr)
    }

    pub fn doc_url(&self, path: &str) -> String {
        format!("http://{}/iiif/{path}", self.addr)
    }
}

/// `n` annotations; every fifth one is `highlighting`, the rest `commenting`.
#[allow(dead_code)]
pub fn annotation_corpus(n: usize) -> Vec<Value> {
    (0..n)
        .map(|i| {
            let motivation = if i % 5 == 0 { "highlighting" } else { "commenting" };
            json!({
                "id": format!("https://example.org/anno/{i}"),
                "type": "Annotation",
                "motivation": motivation,
                "body": {
                    "type": "TextualBody",
                    "value": format!("Annotation text number {i} for the search tests"),
                    "format": "text/plain",
                    "language": "en"
                },
                "target": {
                    "id": "https://example.org/canvas/1",
                    "partOf": { "id": "https://example.org/manifest", "type": "Manifest" }
                }
            })
        })
        .collect()
}
