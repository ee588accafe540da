//! OCR search orchestration across the pages of a work.
//!
//! Resolves which documents to query for a request, queries each one, and
//! keys the aggregated matches by page sequence index. A failure on one page
//! only empties that page.

use futures::stream::{self, StreamExt};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::SearchIndex;
use crate::content::{ContentItem, ContentTree};
use crate::error::SearchError;
use crate::highlight::{harvest_page_hints, PageHints, PageMatches, SnippetAggregator};
use crate::solr::{CountQuery, OcrQuery, SearchBackend};

/// Matches keyed by 0-based page sequence index.
pub type AnnotationsList = BTreeMap<usize, PageMatches>;

/// Which pages of a work a request targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageSelection {
    All,
    Index(usize),
}

impl PageSelection {
    /// `"all"` or a non-negative integer.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.eq_ignore_ascii_case("all") {
            Some(Self::All)
        } else {
            raw.parse().ok().map(Self::Index)
        }
    }
}

/// OCR search service shared by all requests.
pub struct OcrSearch {
    backend: Arc<dyn SearchBackend>,
    index: SearchIndex,
    limit: usize,
    concurrency: usize,
}

impl OcrSearch {
    pub fn new(
        backend: Arc<dyn SearchBackend>,
        index: SearchIndex,
        limit: usize,
        concurrency: usize,
    ) -> Self {
        Self {
            backend,
            index,
            limit,
            concurrency: concurrency.max(1),
        }
    }

    /// Search `term` in `node` or in its pages.
    pub async fn search(
        &self,
        tree: &dyn ContentTree,
        node: &ContentItem,
        term: &str,
        selection: PageSelection,
    ) -> AnnotationsList {
        let children = tree.children(&node.id);
        info!(
            "OCR search for {:?} in node {} ({} pages, {:?}) via {}",
            term,
            node.id,
            children.len(),
            selection,
            self.backend.name()
        );

        match selection {
            PageSelection::All if children.is_empty() => {
                AnnotationsList::from([(0, self.page_matches(term, node).await)])
            }
            PageSelection::All => {
                let lookups: Vec<_> = children
                    .iter()
                    .map(|child| self.page_matches(term, child))
                    .collect();
                let pages: Vec<PageMatches> = stream::iter(lookups)
                    .buffered(self.concurrency)
                    .collect()
                    .await;
                pages.into_iter().enumerate().collect()
            }
            PageSelection::Index(idx) => {
                // Out-of-range pages fall back to the work itself.
                let target = children.get(idx).unwrap_or(node);
                AnnotationsList::from([(idx, self.page_matches(term, target).await)])
            }
        }
    }

    /// Matches for one target document; failures yield no matches.
    pub async fn page_matches(&self, term: &str, item: &ContentItem) -> PageMatches {
        match self.try_page_matches(term, item).await {
            Ok(matches) => matches,
            Err(SearchError::ConfigurationMissing) => {
                debug!("OCR search skipped for {}: no index or field configured", item.id);
                PageMatches::default()
            }
            Err(e) => {
                warn!("OCR search failed for {}: {}", item.id, e);
                PageMatches::default()
            }
        }
    }

    async fn try_page_matches(
        &self,
        term: &str,
        item: &ContentItem,
    ) -> Result<PageMatches, SearchError> {
        let (index_id, field) = self
            .index
            .selection()
            .ok_or(SearchError::ConfigurationMissing)?;
        let solr_field = self.index.language_field_name(field, &item.langcode);

        let mut stored_fields = vec!["id".to_string()];
        stored_fields.extend(self.index.sequence_field.iter().cloned());

        let query = OcrQuery {
            index: index_id.to_string(),
            term: term.to_string(),
            field: solr_field.clone(),
            id_field: self.index.id_field.clone(),
            search_api_id: item.search_api_id(),
            stored_fields,
            limit: self.limit,
        };
        let response = self.backend.query(&query).await?;

        let hints = match &self.index.sequence_field {
            Some(sequence_field) => harvest_page_hints(&response.response.docs, sequence_field),
            None => PageHints::new(),
        };

        let aggregation = SnippetAggregator::new(solr_field).aggregate(
            term,
            response.result_count(),
            response.ocr_highlighting.as_ref(),
            &hints,
        );
        if !aggregation.diagnostics.is_clean() {
            debug!(
                "Degraded highlight data for {}: {:?}",
                item.id, aggregation.diagnostics
            );
        }

        Ok(aggregation.matches)
    }

    /// Number of indexed OCR documents for `node` and its pages.
    ///
    /// Items are counted against the OCR field of their own language, one
    /// backend query per language. A failed query contributes nothing.
    pub async fn count(&self, tree: &dyn ContentTree, node: &ContentItem) -> u64 {
        let Some((index_id, field)) = self.index.selection() else {
            return 0;
        };

        let mut by_language: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for item in std::iter::once(node.clone()).chain(tree.children(&node.id)) {
            by_language
                .entry(item.langcode.clone())
                .or_default()
                .push(item.search_api_id());
        }

        let mut total = 0;
        for (langcode, search_api_ids) in by_language {
            let query = CountQuery {
                index: index_id.to_string(),
                field: self.index.language_field_name(field, &langcode),
                id_field: self.index.id_field.clone(),
                search_api_ids,
            };
            match self.backend.count(&query).await {
                Ok(count) => total += count,
                Err(e) => warn!("OCR count failed for {} ({}): {}", node.id, langcode, e),
            }
        }
        total
    }
}
