//! # Section order overlay
//!
//! Rearranges whole top-level sections after content overrides have
//! been applied. Independent of the override store: keyed by page only.
//!
//! Replaying an order appends each listed section to the end of its
//! parent, in list order. Sections missing from the list keep their
//! relative position ahead of the ordered ones.

use crate::adapter::PersistenceAdapter;
use crate::errors::{AdapterError, OverrideError, OverrideResult};
use crate::model::SectionOrder;
use crate::selector::SelectorEngine;
use folio_common::PageSlug;
use folio_dom::{Document, NodeId};
use tracing::{debug, info, warn};

/// Drag-and-drop capability, supplied by the host
pub trait ReorderProvider {
    /// Start accepting drags of `sections` inside `container`
    fn enable(&mut self, doc: &mut Document, container: NodeId, sections: &[NodeId]);

    fn disable(&mut self, doc: &mut Document, container: NodeId);
}

pub struct SectionOrderOverlay {
    engine: SelectorEngine,
    order: Option<SectionOrder>,
    provider: Option<Box<dyn ReorderProvider>>,
    active: bool,
}

impl SectionOrderOverlay {
    pub fn new(engine: SelectorEngine) -> Self {
        Self {
            engine,
            order: None,
            provider: None,
            active: false,
        }
    }

    pub fn with_provider(mut self, provider: Box<dyn ReorderProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn order(&self) -> Option<&SectionOrder> {
        self.order.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Fetch the stored order for `page`. Failures leave document order
    /// in place.
    pub async fn load(&mut self, adapter: &dyn PersistenceAdapter, page: &PageSlug) -> usize {
        self.order = match adapter.get_section_order(page).await {
            Ok(order) if !order.order.is_empty() => Some(order),
            Ok(_) => None,
            Err(err) => {
                warn!(page = %page, error = %err, "Failed to load section order");
                None
            }
        };
        self.order.as_ref().map(|o| o.order.len()).unwrap_or(0)
    }

    pub fn set_order(&mut self, order: SectionOrder) {
        self.order = (!order.order.is_empty()).then_some(order);
    }

    /// Replay the loaded order. Returns the number of sections moved.
    pub fn apply_order(&self, doc: &mut Document) -> usize {
        match &self.order {
            Some(order) => self.replay(doc, &order.order),
            None => 0,
        }
    }

    /// Append the listed sections to their parent in list order
    pub fn replay(&self, doc: &mut Document, order: &[String]) -> usize {
        let sections = self.engine.top_level_sections(doc);
        let mut moved = 0;

        for id in order {
            let found = sections.iter().copied().find(|section| {
                doc.attr(*section, self.engine.section_id_attr()) == Some(id.as_str())
            });
            let Some(section) = found else {
                debug!(section = %id, "Ordered section not on page");
                continue;
            };
            let Some(parent) = doc.parent(section) else {
                continue;
            };
            if doc.append_child(parent, section).is_ok() {
                moved += 1;
            }
        }

        debug!(moved, "Applied section order");
        moved
    }

    /// Section ids in current document order
    pub fn current_order(&self, doc: &Document) -> Vec<String> {
        self.engine
            .top_level_sections(doc)
            .into_iter()
            .filter_map(|section| doc.attr(section, self.engine.section_id_attr()))
            .map(str::to_string)
            .collect()
    }

    /// Move section `id` before section `before` (or to the end)
    pub fn move_section(
        &self,
        doc: &mut Document,
        id: &str,
        before: Option<&str>,
    ) -> OverrideResult<()> {
        let find = |doc: &Document, id: &str| {
            self.engine
                .top_level_sections(doc)
                .into_iter()
                .find(|section| doc.attr(*section, self.engine.section_id_attr()) == Some(id))
        };

        let section =
            find(doc, id).ok_or_else(|| OverrideError::NotEditable(format!("section '{}'", id)))?;
        let parent = doc
            .parent(section)
            .ok_or_else(|| OverrideError::NotEditable(format!("section '{}'", id)))?;
        let reference = match before {
            Some(before) => Some(
                find(doc, before)
                    .ok_or_else(|| OverrideError::NotEditable(format!("section '{}'", before)))?,
            ),
            None => None,
        };

        doc.insert_before(parent, section, reference)?;
        Ok(())
    }

    /// Enable drag-and-drop on the main region
    pub fn activate(&mut self, doc: &mut Document) -> OverrideResult<()> {
        if self.active {
            return Ok(());
        }
        let main = self.engine.main_region(doc).ok_or_else(|| {
            OverrideError::MissingMainRegion(self.engine.main_region_source().to_string())
        })?;
        let sections = self.engine.top_level_sections(doc);

        if let Some(provider) = self.provider.as_mut() {
            provider.enable(doc, main, &sections);
        }
        self.active = true;
        debug!(sections = sections.len(), "Section reordering enabled");
        Ok(())
    }

    pub fn deactivate(&mut self, doc: &mut Document) {
        if !self.active {
            return;
        }
        if let (Some(provider), Some(main)) = (self.provider.as_mut(), self.engine.main_region(doc))
        {
            provider.disable(doc, main);
        }
        self.active = false;
    }

    /// Persist `order` after a drop. The cached order only changes once
    /// the adapter confirms.
    pub async fn persist(
        &mut self,
        adapter: &dyn PersistenceAdapter,
        page: &PageSlug,
        order: Vec<String>,
    ) -> Result<SectionOrder, AdapterError> {
        let saved = adapter.set_section_order(page, &order).await?;
        info!(page = %page, sections = saved.order.len(), "Saved section order");
        self.set_order(saved.clone());
        Ok(saved)
    }
}

/// Append dynamically generated section markup to the main region
pub fn inject_sections(
    doc: &mut Document,
    engine: &SelectorEngine,
    markup: &str,
) -> OverrideResult<Vec<NodeId>> {
    let main = engine
        .main_region(doc)
        .ok_or_else(|| OverrideError::MissingMainRegion(engine.main_region_source().to_string()))?;
    Ok(doc.append_html(main, markup)?)
}
