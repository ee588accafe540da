//! Page number resolution for highlighted snippets.

use serde_json::{Map, Value};
use std::collections::HashMap;

use super::types::Snippet;

/// Page sequence numbers harvested from the backend, keyed by engine
/// document id. Values are 1-based like page ids.
pub type PageHints = HashMap<String, i64>;

/// Resolve the 0-based page of `snippet`, found in engine document `doc_id`.
///
/// A hint for the document wins; otherwise the digits of `pages[0].id` are
/// used. Either way the number is rebased from 1-based, and anything
/// non-positive collapses to page 0.
pub fn resolve_page(snippet: &Snippet, doc_id: &str, hints: &PageHints) -> u32 {
    let raw = hints
        .get(doc_id)
        .copied()
        .unwrap_or_else(|| page_id_number(snippet.page_id()));
    rebase(raw)
}

/// Number formed by the ASCII digits of a page id (`"page_12"` is 12).
/// Empty or overflowing digit runs are 0.
pub fn page_id_number(id: &str) -> i64 {
    let digits: String = id.chars().filter(char::is_ascii_digit).collect();
    digits.parse().unwrap_or(0)
}

fn rebase(raw: i64) -> u32 {
    if raw > 0 {
        u32::try_from(raw - 1).unwrap_or(u32::MAX)
    } else {
        0
    }
}

/// Collect page hints from stored document fields.
///
/// Only positive values of `sequence_field` are kept; for multi-valued
/// fields the first value counts.
pub fn harvest_page_hints(documents: &[Map<String, Value>], sequence_field: &str) -> PageHints {
    documents
        .iter()
        .filter_map(|doc| {
            let id = doc.get("id")?.as_str()?;
            let value = match doc.get(sequence_field)? {
                Value::Array(values) => values.first()?,
                other => other,
            };
            let sequence = match value {
                Value::Number(n) => n.as_i64()?,
                Value::String(s) => s.trim().parse().ok()?,
                _ => return None,
            };
            (sequence > 0).then(|| (id.to_string(), sequence))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::highlight::types::{Diagnostics, PageGeometry};
    use serde_json::json;

    fn snippet_on(id: &str) -> Snippet {
        Snippet {
            page: Some(PageGeometry {
                id: id.to_string(),
                width: 100.0,
                height: 100.0,
            }),
            ..Snippet::default()
        }
    }

    #[test]
    fn test_page_ids_are_rebased() {
        let hints = PageHints::new();
        assert_eq!(resolve_page(&snippet_on("5"), "doc", &hints), 4);
        assert_eq!(resolve_page(&snippet_on("page_12"), "doc", &hints), 11);
        assert_eq!(resolve_page(&snippet_on("1"), "doc", &hints), 0);
    }

    #[test]
    fn test_malformed_page_ids_collapse_to_zero() {
        let hints = PageHints::new();
        assert_eq!(resolve_page(&snippet_on("0"), "doc", &hints), 0);
        assert_eq!(resolve_page(&snippet_on("p"), "doc", &hints), 0);
        assert_eq!(resolve_page(&snippet_on(""), "doc", &hints), 0);
        assert_eq!(
            resolve_page(&snippet_on("99999999999999999999999"), "doc", &hints),
            0
        );

        let mut diagnostics = Diagnostics::default();
        let pageless = Snippet::from_value(&json!({}), &mut diagnostics);
        assert_eq!(resolve_page(&pageless, "doc", &hints), 0);
    }

    #[test]
    fn test_hint_overrides_page_id() {
        let hints = PageHints::from([("doc-a".to_string(), 3)]);
        let snippet = snippet_on("9");

        assert_eq!(resolve_page(&snippet, "doc-a", &hints), 2);
        assert_eq!(resolve_page(&snippet, "doc-b", &hints), 8);
        // Same input, same answer.
        assert_eq!(resolve_page(&snippet, "doc-a", &hints), 2);
    }

    #[test]
    fn test_harvest_page_hints() {
        let docs: Vec<Map<String, Value>> = serde_json::from_value(json!([
            {"id": "a", "its_sequence": [4, 7]},
            {"id": "b", "its_sequence": "2"},
            {"id": "c", "its_sequence": 0},
            {"id": "d"},
            {"its_sequence": 5}
        ]))
        .unwrap();

        let hints = harvest_page_hints(&docs, "its_sequence");

        assert_eq!(hints.len(), 2);
        assert_eq!(hints.get("a"), Some(&4));
        assert_eq!(hints.get("b"), Some(&2));
    }
}
