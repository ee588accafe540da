//! Per-document aggregation of highlight snippets into viewer matches.

use indexmap::IndexSet;
use serde::Serialize;
use serde_json::Value;

use super::normalize::{normalize, HighlightBox};
use super::page::{resolve_page, PageHints};
use super::types::{Diagnostics, OcrHighlighting, Snippet};

const EXCERPT_SEPARATOR: &str = " ... ";
const MATCH_OPEN: &str = "{{{";
const MATCH_CLOSE: &str = "}}}";

/// Boxes of one page.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PageAnnotation {
    pub page: u32,
    pub boxes: Vec<HighlightBox>,
}

/// Everything matched in one engine document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchResult {
    /// Always exactly one annotation.
    pub par: Vec<PageAnnotation>,
    pub text: String,
}

/// Matches for one queried target document.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PageMatches {
    pub matches: Vec<MatchResult>,
}

/// Aggregated matches plus what had to be degraded to produce them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Aggregation {
    pub matches: PageMatches,
    pub diagnostics: Diagnostics,
}

/// Turns the highlight section of a search response into [`PageMatches`].
#[derive(Debug, Clone)]
pub struct SnippetAggregator {
    field_name: String,
}

impl SnippetAggregator {
    /// `field_name` is the backend field whose snippets are read.
    pub fn new(field_name: impl Into<String>) -> Self {
        Self {
            field_name: field_name.into(),
        }
    }

    /// Aggregate every highlighted engine document, in backend order.
    ///
    /// Documents without snippets under the configured field are omitted.
    /// All boxes of a document land in a single [`PageAnnotation`] whose
    /// page is the one resolved for its last snippet.
    pub fn aggregate(
        &self,
        term: &str,
        result_count: u64,
        highlighting: Option<&OcrHighlighting>,
        hints: &PageHints,
    ) -> Aggregation {
        let mut aggregation = Aggregation::default();
        if result_count == 0 {
            return aggregation;
        }
        let Some(highlighting) = highlighting.filter(|h| !h.is_empty()) else {
            return aggregation;
        };

        for (doc_id, fields) in highlighting {
            let snippets = match fields
                .get(&self.field_name)
                .and_then(|field| field.get("snippets"))
                .and_then(Value::as_array)
            {
                Some(snippets) if !snippets.is_empty() => snippets,
                _ => continue,
            };

            let result = self.aggregate_document(
                term,
                doc_id,
                snippets,
                hints,
                &mut aggregation.diagnostics,
            );
            aggregation.matches.matches.push(result);
        }

        aggregation
    }

    fn aggregate_document(
        &self,
        term: &str,
        doc_id: &str,
        snippets: &[Value],
        hints: &PageHints,
        diagnostics: &mut Diagnostics,
    ) -> MatchResult {
        let mut annotation = PageAnnotation::default();
        let mut excerpts: IndexSet<String> = IndexSet::new();

        for raw in snippets {
            let snippet = Snippet::from_value(raw, diagnostics);
            annotation.page = resolve_page(&snippet, doc_id, hints);
            let (width, height) = snippet.dimensions();

            for highlight in &snippet.highlights {
                let excerpt =
                    mark_matches(snippet.region_text(highlight.parent_region_idx, diagnostics));
                annotation.boxes.push(normalize(
                    highlight,
                    width,
                    height,
                    annotation.page,
                    diagnostics,
                ));
                excerpts.insert(excerpt);
            }
        }

        let text = if excerpts.is_empty() {
            term.to_string()
        } else {
            join_excerpts(excerpts)
        };

        MatchResult {
            par: vec![annotation],
            text,
        }
    }
}

/// Replace `<em>` markup with the plain-text match delimiters.
pub fn mark_matches(region_text: &str) -> String {
    region_text
        .replace("<em>", MATCH_OPEN)
        .replace("</em>", MATCH_CLOSE)
}

/// Join distinct excerpts in first-seen order.
pub fn join_excerpts<I, S>(excerpts: I) -> String
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    excerpts
        .into_iter()
        .map(Into::into)
        .collect::<IndexSet<String>>()
        .into_iter()
        .collect::<Vec<_>>()
        .join(EXCERPT_SEPARATOR)
}
