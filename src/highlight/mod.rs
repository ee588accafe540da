//! OCR highlight normalization.
//!
//! Reshapes the raw highlight section of a search response into per-page
//! boxes in relative (0..1) coordinates plus deduplicated text excerpts.

pub mod aggregate;
pub mod normalize;
pub mod page;
pub mod types;

pub use aggregate::{PageMatches, SnippetAggregator};
pub use page::{harvest_page_hints, PageHints};
pub use types::OcrHighlighting;
