//! Service configuration.
//!
//! Settings are read once from the environment (`.env` is honored) and shared
//! read-only across requests. An unset index or OCR field is not a startup
//! error: searches simply return no matches.

use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_SOLR_URL: &str = "http://localhost:8983/solr";
const DEFAULT_ID_FIELD: &str = "ss_search_api_id";
const DEFAULT_FIELD_TEMPLATE: &str = "tm_X3b_{lang}_{field}";
const DEFAULT_LIMIT: usize = 500;
const DEFAULT_CONCURRENCY: usize = 4;
const DEFAULT_CONTENT_TREE_PATH: &str = "content/tree.json";

/// Everything the search core and its collaborators read at runtime.
#[derive(Debug, Clone)]
pub struct Settings {
    pub bind_addr: String,
    pub solr_url: String,
    pub index: SearchIndex,
    pub limit: usize,
    pub concurrency: usize,
    pub content_tree_path: PathBuf,
}

/// The selected index and the fields the OCR search reads from it.
#[derive(Debug, Clone, Default)]
pub struct SearchIndex {
    /// Selected index (Solr core) id.
    pub index_id: Option<String>,
    /// Machine name of the field holding OCR highlight content.
    pub ocr_field: Option<String>,
    /// Field holding `entity:node/<id>:<lang>`.
    pub id_field: String,
    /// Optional parent-sequence field used for page hints.
    pub sequence_field: Option<String>,
    /// Language-specific backend field naming (`{lang}`, `{field}`).
    pub field_template: String,
}

impl Settings {
    /// Read settings from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Read settings through `lookup`, which maps a variable name to its value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let vars = Vars(lookup);
        let limit = vars.parse("OCR_SEARCH_LIMIT", DEFAULT_LIMIT)?;
        let concurrency = vars
            .parse("OCR_SEARCH_CONCURRENCY", DEFAULT_CONCURRENCY)?
            .max(1);

        Ok(Self {
            bind_addr: vars.or("BIND_ADDR", DEFAULT_BIND_ADDR),
            solr_url: vars
                .or("SOLR_URL", DEFAULT_SOLR_URL)
                .trim_end_matches('/')
                .to_string(),
            index: SearchIndex {
                index_id: vars.non_empty("SOLR_OCR_INDEX"),
                ocr_field: vars.non_empty("SOLR_OCR_FIELD"),
                id_field: vars.or("SOLR_ID_FIELD", DEFAULT_ID_FIELD),
                sequence_field: vars.non_empty("SOLR_SEQUENCE_FIELD"),
                field_template: vars.or("SOLR_FIELD_TEMPLATE", DEFAULT_FIELD_TEMPLATE),
            },
            limit,
            concurrency,
            content_tree_path: PathBuf::from(
                vars.or("CONTENT_TREE_PATH", DEFAULT_CONTENT_TREE_PATH),
            ),
        })
    }
}

impl SearchIndex {
    /// Build an index selection with default id field and naming template.
    #[cfg(test)]
    pub fn new(index_id: impl Into<String>, ocr_field: impl Into<String>) -> Self {
        Self {
            index_id: Some(index_id.into()),
            ocr_field: Some(ocr_field.into()),
            id_field: DEFAULT_ID_FIELD.to_string(),
            sequence_field: None,
            field_template: DEFAULT_FIELD_TEMPLATE.to_string(),
        }
    }

    /// The index id and OCR field, or `None` if either is missing.
    pub fn selection(&self) -> Option<(&str, &str)> {
        let index = self.index_id.as_deref().filter(|s| !s.is_empty())?;
        let field = self.ocr_field.as_deref().filter(|s| !s.is_empty())?;
        Some((index, field))
    }

    /// Backend field name of `field` for documents in language `langcode`.
    pub fn language_field_name(&self, field: &str, langcode: &str) -> String {
        self.field_template
            .replace("{lang}", langcode)
            .replace("{field}", field)
    }
}

struct Vars<F>(F);

impl<F: Fn(&str) -> Option<String>> Vars<F> {
    fn non_empty(&self, name: &str) -> Option<String> {
        (self.0)(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn or(&self, name: &str, default: &str) -> String {
        self.non_empty(name)
            .unwrap_or_else(|| default.to_string())
    }

    fn parse(&self, name: &str, default: usize) -> Result<usize> {
        match self.non_empty(name) {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("{} must be a non-negative integer, got {:?}", name, raw)),
            None => Ok(default),
        }
    }
}
