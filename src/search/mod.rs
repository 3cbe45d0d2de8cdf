//! Search layer facade.
//!
//! - **[`sanitize`]**: term normalisation and untrusted input validation.
//! - **[`query`]**: engine query construction and the `SearchClient`.
//! - **[`response`]**: IIIF AnnotationPage / TermPage shaping and pagination.
//! - **[`highlight`]**: `TextQuoteSelector` match snippets.

pub mod highlight;
pub mod query;
pub mod response;
pub mod sanitize;

pub use query::{SearchClient, SearchParams};
pub use response::{AnnotationPage, TermPage};
