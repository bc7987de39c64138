//! Per-page-view cache of override records, keyed by selector

use crate::adapter::PersistenceAdapter;
use crate::model::{OverrideId, OverrideRecord};
use folio_common::PageSlug;
use folio_dom::{Document, NodeId};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Default)]
pub struct OverrideStore {
    page: Option<PageSlug>,
    records: BTreeMap<String, OverrideRecord>,
}

impl OverrideStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from already-fetched records
    pub fn from_records(page: PageSlug, records: Vec<OverrideRecord>) -> Self {
        let mut store = Self::new();
        store.replace(page, records);
        store
    }

    pub fn page(&self) -> Option<&PageSlug> {
        self.page.as_ref()
    }

    /// Replace the cache with every active override for `page`
    ///
    /// A failed fetch leaves the cache empty; the page then renders with
    /// its default content.
    pub async fn load(&mut self, adapter: &dyn PersistenceAdapter, page: &PageSlug) -> usize {
        match adapter.load_overrides(page).await {
            Ok(records) => self.replace(page.clone(), records),
            Err(err) => {
                warn!(page = %page, error = %err, "Failed to load overrides");
                self.page = Some(page.clone());
                self.records.clear();
                0
            }
        }
    }

    fn replace(&mut self, page: PageSlug, records: Vec<OverrideRecord>) -> usize {
        self.records.clear();

        for record in records {
            if !record.is_active {
                continue;
            }
            if record.target_page != page {
                debug!(id = %record.id, page = %record.target_page, "Skipping override for another page");
                continue;
            }
            if let Some(previous) = self.records.get(&record.target_selector) {
                warn!(
                    selector = %record.target_selector,
                    kept = %record.id,
                    dropped = %previous.id,
                    "Duplicate active overrides for one selector"
                );
            }
            self.records.insert(record.target_selector.clone(), record);
        }

        info!(page = %page, overrides = self.records.len(), "Loaded overrides");
        self.page = Some(page);
        self.records.len()
    }

    pub fn get(&self, selector: &str) -> Option<&OverrideRecord> {
        self.records.get(selector)
    }

    pub fn find_by_id(&self, id: &OverrideId) -> Option<&OverrideRecord> {
        self.records.values().find(|record| &record.id == id)
    }

    /// Reverse lookup: the record whose stored selector currently
    /// resolves to `node`
    pub fn find_by_element(&self, doc: &Document, node: NodeId) -> Option<&OverrideRecord> {
        self.records.values().find(|record| {
            match doc.query_selector_all(&record.target_selector) {
                Ok(matches) => matches.contains(&node),
                Err(err) => {
                    debug!(selector = %record.target_selector, error = %err, "Unparseable stored selector");
                    false
                }
            }
        })
    }

    /// Like [`find_by_element`](Self::find_by_element), but first trusts
    /// the record id the applier left in `managed_attr`. That id survives
    /// edits that change what the stored selector matches on.
    pub fn find_managed(
        &self,
        doc: &Document,
        node: NodeId,
        managed_attr: &str,
    ) -> Option<&OverrideRecord> {
        doc.attr(node, managed_attr)
            .and_then(|id| self.find_by_id(&OverrideId::new(id)))
            .or_else(|| self.find_by_element(doc, node))
    }

    /// Insert or update after a confirmed save
    ///
    /// `previous_selector` is the key the element was stored under
    /// before; when it differs from the new one the stale entry goes.
    pub fn upsert(&mut self, record: OverrideRecord, previous_selector: Option<&str>) {
        if let Some(previous) = previous_selector {
            if previous != record.target_selector {
                debug!(from = %previous, to = %record.target_selector, "Override selector moved");
                self.records.remove(previous);
            }
        }
        // The same id may still sit under another key
        self.records
            .retain(|key, existing| existing.id != record.id || *key == record.target_selector);
        self.records.insert(record.target_selector.clone(), record);
    }

    pub fn remove(&mut self, id: &OverrideId) -> Option<OverrideRecord> {
        let key = self
            .records
            .iter()
            .find(|(_, record)| &record.id == id)
            .map(|(key, _)| key.clone())?;
        self.records.remove(&key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &OverrideRecord> {
        self.records.values()
    }

    pub fn selectors(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::MemoryAdapter;
    use crate::model::{ContentType, OverrideType};

    fn record(id: &str, selector: &str) -> OverrideRecord {
        OverrideRecord {
            id: OverrideId::new(id),
            target_page: PageSlug::from("index"),
            target_selector: selector.to_string(),
            content_type: ContentType::Text,
            text: Some(id.to_string()),
            image: None,
            is_button: false,
            original_content: None,
            override_type: OverrideType::Replace,
            is_active: true,
            created_at: None,
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn test_load_replaces_contents() {
        let page = PageSlug::from("index");
        let mut store = OverrideStore::from_records(page.clone(), vec![record("old", "x")]);

        let adapter = MemoryAdapter::new();
        assert_eq!(store.load(&adapter, &page).await, 0);
        assert!(store.get("x").is_none());
        assert_eq!(store.page(), Some(&page));
    }

    #[tokio::test]
    async fn test_load_failure_leaves_store_empty() {
        let page = PageSlug::from("index");
        let mut store = OverrideStore::from_records(page.clone(), vec![record("old", "x")]);

        let adapter = MemoryAdapter::new();
        adapter.set_offline(true);
        assert_eq!(store.load(&adapter, &page).await, 0);
        assert!(store.is_empty());
    }

    #[test]
    fn test_inactive_and_foreign_records_are_skipped() {
        let mut inactive = record("1", "a");
        inactive.is_active = false;
        let mut foreign = record("2", "b");
        foreign.target_page = PageSlug::from("about");

        let store = OverrideStore::from_records(
            PageSlug::from("index"),
            vec![inactive, foreign, record("3", "c")],
        );
        assert_eq!(store.selectors().collect::<Vec<_>>(), vec!["c"]);
    }

    #[test]
    fn test_find_by_element() {
        let doc = Document::parse(r#"<p data-block-id="p1">a</p><p data-block-id="p2">b</p>"#);
        let store = OverrideStore::from_records(
            PageSlug::from("index"),
            vec![record("1", r#"[data-block-id="p2"]"#), record("2", "[[broken")],
        );
        let p2 = doc.query_selector("[data-block-id=p2]").unwrap().unwrap();
        let p1 = doc.query_selector("[data-block-id=p1]").unwrap().unwrap();

        assert_eq!(store.find_by_element(&doc, p2).map(|r| r.id.as_str()), Some("1"));
        assert!(store.find_by_element(&doc, p1).is_none());
    }

    #[test]
    fn test_upsert_moves_selector() {
        let mut store = OverrideStore::from_records(PageSlug::from("index"), vec![record("1", "old")]);

        store.upsert(record("1", "new"), Some("old"));
        assert!(store.get("old").is_none());
        assert_eq!(store.get("new").map(|r| r.id.as_str()), Some("1"));
        assert_eq!(store.len(), 1);

        // Same id without a previous key still replaces the stale entry
        store.upsert(record("1", "newer"), None);
        assert_eq!(store.selectors().collect::<Vec<_>>(), vec!["newer"]);
    }

    #[test]
    fn test_remove_by_id() {
        let mut store = OverrideStore::from_records(
            PageSlug::from("index"),
            vec![record("1", "a"), record("2", "b")],
        );
        assert_eq!(store.remove(&OverrideId::new("1")).map(|r| r.target_selector), Some("a".to_string()));
        assert!(store.remove(&OverrideId::new("1")).is_none());
        assert_eq!(store.len(), 1);
        assert!(store.find_by_id(&OverrideId::new("2")).is_some());
    }

    #[test]
    fn test_find_managed_prefers_recorded_id() {
        let doc = Document::parse(
            r#"<nav data-nav><a href="/moved.html" data-override-managed="7">Moved</a></nav>"#,
        );
        let link = doc.query_selector("a").unwrap().unwrap();
        let store = OverrideStore::from_records(
            PageSlug::from("index"),
            vec![record("7", r#"[data-nav] a[href="/contact.html"]"#)],
        );

        assert!(store.find_by_element(&doc, link).is_none());
        let found = store.find_managed(&doc, link, "data-override-managed").unwrap();
        assert_eq!(found.id.as_str(), "7");
    }
}
