//! Bulk ingestion as newline-delimited JSON.

use serde::Serialize;
use tracing::info;

use super::client::QuickwitClient;
use crate::error::Result;

/// Destination for loaded records. The engine client is the production
/// implementation; tests substitute an in-memory recorder.
#[allow(async_fn_in_trait)]
pub trait IngestSink {
    /// Published document count of an engine index.
    async fn num_published_docs(&self, index_id: &str) -> Result<u64>;

    /// Submit one NDJSON payload.
    async fn ingest_ndjson(&self, index_id: &str, payload: String, commit: bool) -> Result<()>;
}

impl IngestSink for QuickwitClient {
    async fn num_published_docs(&self, index_id: &str) -> Result<u64> {
        QuickwitClient::num_published_docs(self, index_id).await
    }

    async fn ingest_ndjson(&self, index_id: &str, payload: String, commit: bool) -> Result<()> {
        QuickwitClient::ingest_ndjson(self, index_id, payload, commit).await?;
        Ok(())
    }
}

/// One compact JSON object per line, newline terminated.
pub fn to_ndjson<T: Serialize>(records: &[T]) -> Result<String> {
    let mut payload = String::new();
    for record in records {
        payload.push_str(&serde_json::to_string(record)?);
        payload.push('\n');
    }
    Ok(payload)
}

/// Serialise and submit a batch. Empty batches are not sent.
pub async fn ingest_data<S, T>(sink: &S, index_id: &str, records: &[T], commit: bool) -> Result<()>
where
    S: IngestSink,
    T: Serialize,
{
    if records.is_empty() {
        return Ok(());
    }
    let payload = to_ndjson(records)?;
    sink.ingest_ndjson(index_id, payload, commit).await?;
    info!(index = index_id, records = records.len(), commit, "ingested batch");
    Ok(())
}
