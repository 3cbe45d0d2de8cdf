use serde_json::Value;
use tracing::debug;

use crate::error::{AnnoSearchError, Result};

/// Retrieves source documents by URI.
#[allow(async_fn_in_trait)]
pub trait SourceFetcher {
    async fn fetch_json(&self, uri: &str) -> Result<Value>;
}

/// Plain unauthenticated HTTP GET of JSON-LD documents.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    http: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }
}

impl SourceFetcher for HttpFetcher {
    async fn fetch_json(&self, uri: &str) -> Result<Value> {
        debug!(uri, "fetch document");
        let response = self.http.get(uri).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AnnoSearchError::network(format!(
                "HTTP error fetching {uri}: status {status}"
            )));
        }
        Ok(response.json().await?)
    }
}
