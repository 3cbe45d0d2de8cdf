use std::time::Duration;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::config::AnnoSearchConfig;
use crate::error::{AnnoSearchError, Result};

/// Body of `POST /{index}/search`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineSearchRequest {
    pub query: String,
    pub max_hits: usize,
    pub start_offset: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineSearchResponse {
    pub num_hits: u64,
    #[serde(default)]
    pub hits: Vec<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct IndexDescription {
    #[serde(default)]
    num_published_docs: u64,
}

/// Thin async client over the engine REST API.
#[derive(Debug, Clone)]
pub struct QuickwitClient {
    http: reqwest::Client,
    base_url: String,
}

impl QuickwitClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AnnoSearchError::application(format!("HTTP client setup failed: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }

    pub fn from_config(config: &AnnoSearchConfig) -> Result<Self> {
        Self::new(config.quickwit_base_url.clone(), config.request_timeout())
    }

    /// The underlying HTTP client, shared with the document fetcher.
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }

    pub async fn create_index(&self, index_config: &Value) -> Result<Value> {
        debug!(index = ?index_config.get("index_id"), "engine create_index");
        let response = self
            .http
            .post(self.url("indexes"))
            .json(index_config)
            .send()
            .await?;
        Ok(check_status(response).await?.json().await?)
    }

    pub async fn delete_index(&self, index_id: &str) -> Result<Value> {
        debug!(index = index_id, "engine delete_index");
        let response = self
            .http
            .delete(self.url(&format!("indexes/{index_id}")))
            .send()
            .await?;
        Ok(check_status(response).await?.json().await?)
    }

    pub async fn num_published_docs(&self, index_id: &str) -> Result<u64> {
        debug!(index = index_id, "engine describe");
        let response = self
            .http
            .get(self.url(&format!("indexes/{index_id}/describe")))
            .send()
            .await?;
        let description: IndexDescription = check_status(response).await?.json().await?;
        Ok(description.num_published_docs)
    }

    /// Post an NDJSON payload. Any non-200 answer or an empty body is a
    /// validation failure of the batch.
    pub async fn ingest_ndjson(&self, index_id: &str, payload: String, commit: bool) -> Result<Value> {
        let path = if commit {
            format!("{index_id}/ingest?commit=force")
        } else {
            format!("{index_id}/ingest")
        };
        debug!(index = index_id, bytes = payload.len(), commit, "engine ingest");
        let response = self
            .http
            .post(self.url(&path))
            .header(reqwest::header::CONTENT_TYPE, "application/x-ndjson")
            .body(payload)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if status != StatusCode::OK {
            return Err(AnnoSearchError::validation(format!(
                "Failed to ingest data: engine answered {status}: {}",
                engine_message(&body)
            )));
        }
        if body.trim().is_empty() {
            return Err(AnnoSearchError::validation(
                "No response data received from engine",
            ));
        }
        Ok(serde_json::from_str(&body)?)
    }

    pub async fn search(&self, index_id: &str, request: &EngineSearchRequest) -> Result<EngineSearchResponse> {
        debug!(
            index = index_id,
            query = %request.query,
            max_hits = request.max_hits,
            start_offset = request.start_offset,
            "engine search"
        );
        let response = self
            .http
            .post(self.url(&format!("{index_id}/search")))
            .json(request)
            .send()
            .await?;
        Ok(check_status(response).await?.json().await?)
    }
}

/// Map an engine status to the error taxonomy.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = engine_message(&body);
    Err(match status {
        StatusCode::NOT_FOUND => AnnoSearchError::not_found(format!("Index not found: {message}")),
        s if s.is_server_error() => {
            AnnoSearchError::network(format!("Engine unavailable ({s}): {message}"))
        }
        s => AnnoSearchError::application(format!("Engine request failed ({s}): {message}")),
    })
}

/// Engine errors come back as `{"message": ...}`; fall back to the raw body.
fn engine_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}
