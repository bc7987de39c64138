//! # Override application
//!
//! One pure function per content type, each a full overwrite of the
//! target's properties, so applying the same record twice is a no-op.

use crate::config::EngineConfig;
use crate::model::{ContentType, OverrideRecord, OverrideType};
use crate::selector::SelectorEngine;
use crate::store::OverrideStore;
use folio_dom::{attr_equals, Document, NodeId};
use tracing::{debug, warn};

/// Outcome of one application pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassReport {
    /// Selectors that resolved, with the number of elements touched
    pub applied: Vec<(String, usize)>,
    /// Selectors that matched nothing
    pub unresolved: Vec<String>,
}

impl PassReport {
    pub fn is_complete(&self) -> bool {
        self.unresolved.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct Applier {
    managed_attr: String,
    button_classes: Vec<String>,
    engine: SelectorEngine,
}

impl Applier {
    pub fn new(config: &EngineConfig, engine: SelectorEngine) -> Self {
        Self {
            managed_attr: config.managed_attr.clone(),
            button_classes: config.button_classes.clone(),
            engine,
        }
    }

    pub fn engine(&self) -> &SelectorEngine {
        &self.engine
    }

    pub fn managed_attr(&self) -> &str {
        &self.managed_attr
    }

    /// Apply `record` to a single element
    pub fn apply_to(&self, doc: &mut Document, node: NodeId, record: &OverrideRecord) {
        if record.override_type != OverrideType::Replace {
            debug!(id = %record.id, "Skipping unsupported override type");
            return;
        }

        match record.content_type {
            ContentType::Text => apply_text(doc, node, record),
            ContentType::Html => apply_html(doc, node, record),
            ContentType::Image => apply_image(doc, node, record),
            ContentType::Link => apply_link(doc, node, record, &self.button_classes),
        }

        doc.set_attr(node, &self.managed_attr, record.id.as_str());
    }

    /// Elements `record` applies to: whatever its selector resolves to,
    /// plus elements already carrying its id in the managed attribute.
    /// The latter keeps a nav link reachable after its `href` was edited.
    pub fn targets(&self, doc: &Document, record: &OverrideRecord) -> Vec<NodeId> {
        let mut targets = match doc.query_selector_all(&record.target_selector) {
            Ok(targets) => targets,
            Err(err) => {
                warn!(selector = %record.target_selector, error = %err, "Stored selector does not parse");
                Vec::new()
            }
        };

        if targets.len() > 1 && !self.engine.is_nav_scoped(&record.target_selector) {
            warn!(
                selector = %record.target_selector,
                matches = targets.len(),
                "Content selector matched several elements; duplicate persistent ids?"
            );
        }

        let managed = attr_equals(&self.managed_attr, record.id.as_str());
        for node in doc.query_selector_all(&managed).unwrap_or_default() {
            if !targets.contains(&node) {
                targets.push(node);
            }
        }
        targets
    }

    /// Resolve `record` and apply it to every match
    ///
    /// Returns the number of elements touched.
    pub fn apply_record(&self, doc: &mut Document, record: &OverrideRecord) -> usize {
        let targets = self.targets(doc, record);
        for node in &targets {
            self.apply_to(doc, *node, record);
        }
        targets.len()
    }

    /// One pass over every cached record
    pub fn apply_all(&self, doc: &mut Document, store: &OverrideStore) -> PassReport {
        self.apply_some(doc, store.iter())
    }

    pub fn apply_some<'r>(
        &self,
        doc: &mut Document,
        records: impl IntoIterator<Item = &'r OverrideRecord>,
    ) -> PassReport {
        let mut report = PassReport::default();
        for record in records {
            match self.apply_record(doc, record) {
                0 => report.unresolved.push(record.target_selector.clone()),
                n => report.applied.push((record.target_selector.clone(), n)),
            }
        }
        report
    }
}

pub fn apply_text(doc: &mut Document, node: NodeId, record: &OverrideRecord) {
    doc.set_text_content(node, record.text.as_deref().unwrap_or_default());
}

pub fn apply_html(doc: &mut Document, node: NodeId, record: &OverrideRecord) {
    doc.set_inner_html(node, record.text.as_deref().unwrap_or_default());
}

pub fn apply_image(doc: &mut Document, node: NodeId, record: &OverrideRecord) {
    let Some(img) = self_or_descendant(doc, node, "img") else {
        debug!(id = %record.id, "No img under image override target");
        return;
    };
    if let Some(src) = &record.image {
        doc.set_attr(img, "src", src);
    }
    if let Some(alt) = &record.text {
        doc.set_attr(img, "alt", alt);
    }
}

pub fn apply_link(
    doc: &mut Document,
    node: NodeId,
    record: &OverrideRecord,
    button_classes: &[String],
) {
    let Some(anchor) = self_or_descendant(doc, node, "a") else {
        debug!(id = %record.id, "No anchor under link override target");
        return;
    };
    if let Some(href) = record.href() {
        doc.set_attr(anchor, "href", href);
    }
    if let Some(text) = &record.text {
        doc.set_text_content(anchor, text);
    }
    for class in button_classes {
        doc.set_class(anchor, class, record.is_button);
    }
}

/// `node` itself if it has `tag`, else its first descendant that does
pub fn self_or_descendant(doc: &Document, node: NodeId, tag: &str) -> Option<NodeId> {
    if doc.tag(node) == Some(tag) {
        return Some(node);
    }
    doc.descendants(node).find(|child| doc.tag(*child) == Some(tag))
}
