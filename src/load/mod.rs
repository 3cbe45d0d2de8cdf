//! Inbound side: crawling source documents into the engine.
//!
//! - **[`fetch`]**: `SourceFetcher` seam and its HTTP implementation.
//! - **[`terms`]**: per-load term frequency accumulator for autocomplete.
//! - **[`walker`]**: the crawl itself and the lazy annotation page cursor.

pub mod fetch;
pub mod terms;
pub mod walker;

pub use fetch::{HttpFetcher, SourceFetcher};
pub use terms::{TermFrequencies, TermRecord};
pub use walker::{LoadSummary, Loader, PageCursor, load_index};
