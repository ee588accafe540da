//! Content tree used to find the pages of a paged work.
//!
//! The store is loaded from a JSON array of items. A page is any item whose
//! `member_of` lists its parent; pages are ordered by weight, then by
//! last-modified time.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{info, warn};

/// One content item (a work or one of its pages).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: String,
    #[serde(default = "default_langcode")]
    pub langcode: String,
    /// Parents this item is a member of.
    #[serde(default)]
    pub member_of: Vec<String>,
    #[serde(default)]
    pub weight: i64,
    /// Last-modified timestamp.
    #[serde(default)]
    pub changed: i64,
}

fn default_langcode() -> String {
    "und".to_string()
}

impl ContentItem {
    #[cfg(test)]
    pub fn new(id: impl Into<String>, langcode: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            langcode: langcode.into(),
            member_of: Vec::new(),
            weight: 0,
            changed: 0,
        }
    }

    #[cfg(test)]
    pub fn member_of(mut self, parent: impl Into<String>) -> Self {
        self.member_of.push(parent.into());
        self
    }

    #[cfg(test)]
    pub fn weighted(mut self, weight: i64, changed: i64) -> Self {
        self.weight = weight;
        self.changed = changed;
        self
    }

    /// Value of the search index id field for this item.
    pub fn search_api_id(&self) -> String {
        format!("entity:node/{}:{}", self.id, self.langcode)
    }
}

/// Read access to the content tree.
pub trait ContentTree: Send + Sync {
    fn item(&self, id: &str) -> Option<ContentItem>;

    /// Ordered pages of `id`; empty when it is not a paged work.
    fn children(&self, id: &str) -> Vec<ContentItem>;
}

/// In-memory content tree.
#[derive(Debug, Clone, Default)]
pub struct ContentStore {
    inner: Arc<RwLock<HashMap<String, ContentItem>>>,
}

impl ContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load items from a JSON file. A missing file gives an empty store.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!("Content tree {:?} not found, starting empty", path);
            return Ok(Self::new());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read content tree: {:?}", path))?;
        let items: Vec<ContentItem> = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse content tree: {:?}", path))?;

        let store = Self::from_items(items);
        if store.is_empty() {
            warn!("Content tree {:?} has no items", path);
        } else {
            info!("Loaded {} content items from {:?}", store.len(), path);
        }
        Ok(store)
    }

    pub fn from_items(items: impl IntoIterator<Item = ContentItem>) -> Self {
        let store = Self::new();
        for item in items {
            store.insert(item);
        }
        store
    }

    pub fn insert(&self, item: ContentItem) {
        let mut items = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        tracing::debug!("ContentStore: stored '{}'", item.id);
        items.insert(item.id.clone(), item);
    }

    pub fn len(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ContentTree for ContentStore {
    fn item(&self, id: &str) -> Option<ContentItem> {
        let items = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        items.get(id).cloned()
    }

    fn children(&self, id: &str) -> Vec<ContentItem> {
        let items = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        let mut children: Vec<ContentItem> = items
            .values()
            .filter(|item| item.member_of.iter().any(|parent| parent == id))
            .cloned()
            .collect();
        children.sort_by(|a, b| {
            (a.weight, a.changed, &a.id).cmp(&(b.weight, b.changed, &b.id))
        });
        children
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_children_sorted_by_weight_then_changed() {
        let store = ContentStore::from_items([
            ContentItem::new("book", "en"),
            ContentItem::new("p3", "en").member_of("book").weighted(2, 10),
            ContentItem::new("p1", "en").member_of("book").weighted(1, 50),
            ContentItem::new("p2", "en").member_of("book").weighted(2, 5),
            ContentItem::new("elsewhere", "en").member_of("other").weighted(0, 0),
        ]);

        let ids: Vec<_> = store.children("book").into_iter().map(|c| c.id).collect();
        assert_eq!(ids, ["p1", "p2", "p3"]);
        assert!(store.children("p1").is_empty());
        assert!(store.children("missing").is_empty());
    }

    #[test]
    fn test_items_parse_with_defaults() {
        let items: Vec<ContentItem> =
            serde_json::from_str(r#"[{"id": "7"}, {"id": "8", "langcode": "es", "member_of": ["7"], "weight": 3}]"#)
                .unwrap();
        let store = ContentStore::from_items(items);

        assert_eq!(store.len(), 2);
        assert_eq!(store.item("7").unwrap().langcode, "und");
        assert_eq!(store.item("8").unwrap().search_api_id(), "entity:node/8:es");
        assert_eq!(store.children("7").len(), 1);
    }

    #[test]
    fn test_missing_file_gives_empty_store() {
        let store = ContentStore::load_from_file(Path::new("does/not/exist.json")).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("ocr-search-tree-{}.json", std::process::id()));
        std::fs::write(&path, r#"[{"id": "1", "langcode": "en"}, {"id": "2", "member_of": ["1"]}]"#)
            .unwrap();

        let store = ContentStore::load_from_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(store.len(), 2);
        assert_eq!(store.children("1")[0].id, "2");
    }
}
