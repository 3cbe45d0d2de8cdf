//! Outbound side: the Quickwit REST protocol.
//!
//! - **[`client`]**: typed HTTP client for index lifecycle, ingest and search.
//! - **[`index_config`]**: the two index definitions created per logical index.
//! - **[`ingest`]**: NDJSON batching and the `IngestSink` seam used by the loader.

pub mod client;
pub mod index_config;
pub mod ingest;

pub use client::{EngineSearchRequest, EngineSearchResponse, QuickwitClient};
pub use ingest::{IngestSink, ingest_data, to_ndjson};

/// Engine index holding flattened annotation records.
pub fn annotations_index(index_id: &str) -> String {
    format!("{index_id}_annotations")
}

/// Engine index holding autocomplete term records.
pub fn autocomplete_index(index_id: &str) -> String {
    format!("{index_id}_autocomplete")
}
