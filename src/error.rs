//! Error types for the OCR search core.

use thiserror::Error;

/// Failures while querying the search backend for one target document.
///
/// None of these reach the HTTP layer: the affected page gets an empty
/// match list and sibling pages are processed as usual.
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("OCR search index or field not configured")]
    ConfigurationMissing,

    #[error("search backend unavailable: {0}")]
    BackendUnavailable(#[from] reqwest::Error),

    #[error("search query failed ({status}): {body}")]
    QueryFailed { status: u16, body: String },

    #[error("malformed search response: {0}")]
    Decode(#[from] serde_json::Error),
}
