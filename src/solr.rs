//! Search backend abstraction and the Solr implementation.
//!
//! The OCR highlighting plugin adds an `ocrHighlighting` section to select
//! responses; it is decoded with document order intact so relevance order
//! survives into the match list.

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::SearchError;
use crate::highlight::OcrHighlighting;

/// Highlighted full-text query against one target document.
#[derive(Debug, Clone, PartialEq)]
pub struct OcrQuery {
    pub index: String,
    pub term: String,
    /// Backend field holding the OCR text.
    pub field: String,
    /// Field the target document is filtered on.
    pub id_field: String,
    /// Value of `id_field`, `entity:node/<id>:<lang>`.
    pub search_api_id: String,
    /// Stored fields to return per result.
    pub stored_fields: Vec<String>,
    pub limit: usize,
}

/// Count of OCR-bearing documents among a set of target documents.
#[derive(Debug, Clone, PartialEq)]
pub struct CountQuery {
    pub index: String,
    pub field: String,
    pub id_field: String,
    pub search_api_ids: Vec<String>,
}

/// Decoded select response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub response: ResultSet,
    #[serde(default, rename = "ocrHighlighting")]
    pub ocr_highlighting: Option<OcrHighlighting>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResultSet {
    #[serde(default, rename = "numFound")]
    pub num_found: u64,
    /// Stored field values per result.
    #[serde(default)]
    pub docs: Vec<Map<String, Value>>,
}

impl SearchResponse {
    pub fn result_count(&self) -> u64 {
        self.response.num_found
    }
}

/// Executes OCR queries. Implementations must be shareable across requests.
#[async_trait::async_trait]
pub trait SearchBackend: Send + Sync {
    fn name(&self) -> &str;
    async fn query(&self, query: &OcrQuery) -> Result<SearchResponse, SearchError>;
    async fn count(&self, query: &CountQuery) -> Result<u64, SearchError>;
}

/// Solr select client.
#[derive(Clone)]
pub struct SolrClient {
    client: reqwest::Client,
    base_url: String,
}

impl SolrClient {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    async fn select(
        &self,
        index: &str,
        params: &[(&str, String)],
    ) -> Result<SearchResponse, SearchError> {
        let url = format!("{}/{}/select", self.base_url, index);
        let resp = self.client.get(&url).query(params).send().await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(SearchError::QueryFailed { status, body });
        }

        let raw = resp.text().await?;
        debug!("SolrClient: {} returned {} bytes", url, raw.len());
        Ok(serde_json::from_str(&raw)?)
    }
}

#[async_trait::async_trait]
impl SearchBackend for SolrClient {
    fn name(&self) -> &str {
        "solr"
    }

    async fn query(&self, query: &OcrQuery) -> Result<SearchResponse, SearchError> {
        self.select(&query.index, &select_params(query)).await
    }

    async fn count(&self, query: &CountQuery) -> Result<u64, SearchError> {
        if query.search_api_ids.is_empty() {
            return Ok(0);
        }
        let response = self.select(&query.index, &count_params(query)).await?;
        Ok(response.result_count())
    }
}

/// Request parameters for a highlighted OCR query.
pub fn select_params(query: &OcrQuery) -> Vec<(&'static str, String)> {
    let mut fields = vec!["id".to_string()];
    fields.extend(
        query
            .stored_fields
            .iter()
            .filter(|f| f.as_str() != "id")
            .cloned(),
    );

    vec![
        ("q", query.term.clone()),
        ("defType", "edismax".to_string()),
        ("qf", query.field.clone()),
        (
            "fq",
            format!("{}:{}", query.id_field, quote_phrase(&query.search_api_id)),
        ),
        ("sort", "score desc".to_string()),
        ("start", "0".to_string()),
        ("rows", query.limit.to_string()),
        ("fl", fields.join(",")),
        ("hl", "true".to_string()),
        ("hl.ocr.fl", query.field.clone()),
        ("hl.ocr.absoluteHighlights", "true".to_string()),
        ("wt", "json".to_string()),
    ]
}

/// Request parameters for counting OCR documents.
pub fn count_params(query: &CountQuery) -> Vec<(&'static str, String)> {
    let ids = query
        .search_api_ids
        .iter()
        .map(|id| quote_phrase(id))
        .collect::<Vec<_>>()
        .join(" OR ");

    vec![
        ("q", format!("{}:[* TO *]", query.field)),
        ("fq", format!("{}:({})", query.id_field, ids)),
        ("rows", "0".to_string()),
        ("wt", "json".to_string()),
    ]
}

fn quote_phrase(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}


#[cfg(test)]
mod tests {
    use super::*;

    fn query() -> OcrQuery {
        OcrQuery {
            index: "ocr".to_string(),
            term: "bar".to_string(),
            field: "tm_X3b_en_ocr_text".to_string(),
            id_field: "ss_search_api_id".to_string(),
            search_api_id: "entity:node/12:en".to_string(),
            stored_fields: vec!["id".to_string(), "its_sequence".to_string()],
            limit: 500,
        }
    }

    fn param<'a>(params: &'a [(&'static str, String)], key: &str) -> Option<&'a str> {
        params
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_select_params() {
        let params = select_params(&query());

        assert_eq!(param(&params, "q"), Some("bar"));
        assert_eq!(param(&params, "qf"), Some("tm_X3b_en_ocr_text"));
        assert_eq!(param(&params, "hl.ocr.fl"), Some("tm_X3b_en_ocr_text"));
        assert_eq!(param(&params, "hl.ocr.absoluteHighlights"), Some("true"));
        assert_eq!(
            param(&params, "fq"),
            Some(r#"ss_search_api_id:"entity:node/12:en""#)
        );
        assert_eq!(param(&params, "rows"), Some("500"));
        assert_eq!(param(&params, "fl"), Some("id,its_sequence"));
    }

    #[test]
    fn test_count_params() {
        let params = count_params(&CountQuery {
            index: "ocr".to_string(),
            field: "tm_X3b_en_ocr_text".to_string(),
            id_field: "ss_search_api_id".to_string(),
            search_api_ids: vec!["entity:node/1:en".to_string(), "a\"b".to_string()],
        });

        assert_eq!(param(&params, "q"), Some("tm_X3b_en_ocr_text:[* TO *]"));
        assert_eq!(
            param(&params, "fq"),
            Some(r#"ss_search_api_id:("entity:node/1:en" OR "a\"b")"#)
        );
        assert_eq!(param(&params, "rows"), Some("0"));
    }

    #[test]
    fn test_response_keeps_highlight_order() {
        let raw = r#"{
            "response": {"numFound": 2, "docs": [{"id": "b"}, {"id": "a"}]},
            "ocrHighlighting": {
                "b": {"f": {"snippets": []}},
                "a": {"f": {"snippets": []}}
            }
        }"#;

        let response: SearchResponse = serde_json::from_str(raw).unwrap();

        assert_eq!(response.result_count(), 2);
        assert_eq!(response.response.docs.len(), 2);
        let ids: Vec<_> = response.ocr_highlighting.unwrap().keys().cloned().collect();
        assert_eq!(ids, ["b", "a"]);
    }

    #[test]
    fn test_response_without_highlighting() {
        let response: SearchResponse =
            serde_json::from_str(r#"{"response": {"numFound": 0, "docs": []}}"#).unwrap();
        assert!(response.ocr_highlighting.is_none());

        let response: SearchResponse =
            serde_json::from_str(r#"{"ocrHighlighting": null}"#).unwrap();
        assert!(response.ocr_highlighting.is_none());
        assert_eq!(response.result_count(), 0);
    }
}
