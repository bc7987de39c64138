//! Markup diagnostics
//!
//! Duplicate or missing persistent ids are authoring defects the engine
//! cannot prevent at runtime; these checks surface them.

use crate::selector::SelectorEngine;
use crate::store::OverrideStore;
use folio_dom::Document;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiagnosticLevel {
    Error,
    Warning,
    Info,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub level: DiagnosticLevel,

    /// Check that produced this diagnostic
    pub rule: String,

    pub message: String,

    /// Selector locating the offending element(s), when there is one
    pub selector: Option<String>,

    pub suggestion: Option<String>,
}

impl Diagnostic {
    pub fn error(rule: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level: DiagnosticLevel::Error,
            rule: rule.into(),
            message: message.into(),
            selector: None,
            suggestion: None,
        }
    }

    pub fn warning(rule: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level: DiagnosticLevel::Warning,
            ..Self::error(rule, message)
        }
    }

    pub fn with_selector(mut self, selector: impl Into<String>) -> Self {
        self.selector = Some(selector.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

pub const DUPLICATE_ID: &str = "duplicate-persistent-id";
pub const MISSING_ID: &str = "missing-persistent-id";
pub const UNRESOLVED_OVERRIDE: &str = "unresolved-override";
pub const AMBIGUOUS_OVERRIDE: &str = "ambiguous-override";

/// Persistent ids used by more than one element, per namespace
pub fn duplicate_ids(doc: &Document, engine: &SelectorEngine) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    for attr in [
        engine.block_id_attr(),
        engine.button_id_attr(),
        engine.section_id_attr(),
    ] {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for node in doc.descendants(doc.root()) {
            if let Some(id) = doc.attr(node, attr) {
                *counts.entry(id).or_default() += 1;
            }
        }

        for (id, count) in counts.into_iter().filter(|(_, count)| *count > 1) {
            diagnostics.push(
                Diagnostic::error(
                    DUPLICATE_ID,
                    format!("{} '{}' is used by {} elements", attr, id, count),
                )
                .with_selector(folio_dom::attr_equals(attr, id))
                .with_suggestion("Give each element its own id, e.g. with `folio assign-ids`"),
            );
        }
    }

    diagnostics
}

/// Editable elements outside the navigation that cannot be saved
pub fn missing_ids(doc: &Document, engine: &SelectorEngine) -> Vec<Diagnostic> {
    engine
        .editable_candidates(doc)
        .into_iter()
        .filter(|node| engine.nav_anchor(doc, *node).is_none())
        .filter(|node| !doc.has_attr(*node, engine.id_attr_for(doc, *node)))
        .map(|node| {
            let tag = doc.tag(node).unwrap_or_default();
            let mut text = doc.text_content(node).trim().to_string();
            if text.chars().count() > 40 {
                text = text.chars().take(40).collect::<String>() + "...";
            }
            Diagnostic::warning(
                MISSING_ID,
                format!("<{}> \"{}\" has no {}", tag, text, engine.id_attr_for(doc, node)),
            )
            .with_suggestion("Run `folio assign-ids` on this page")
        })
        .collect()
}

/// Stored overrides that no longer resolve, or resolve too widely
pub fn override_targets(
    doc: &Document,
    engine: &SelectorEngine,
    store: &OverrideStore,
) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    for record in store.iter() {
        let selector = &record.target_selector;
        let matches = match doc.query_selector_all(selector) {
            Ok(matches) => matches.len(),
            Err(err) => {
                diagnostics.push(
                    Diagnostic::error(UNRESOLVED_OVERRIDE, format!("Override {} has an invalid selector: {}", record.id, err))
                        .with_selector(selector.clone()),
                );
                continue;
            }
        };

        if matches == 0 {
            diagnostics.push(
                Diagnostic::warning(
                    UNRESOLVED_OVERRIDE,
                    format!("Override {} matches nothing on this page", record.id),
                )
                .with_selector(selector.clone())
                .with_suggestion("Restore the element's id or delete the override"),
            );
        } else if matches > 1 && !engine.is_nav_scoped(selector) {
            diagnostics.push(
                Diagnostic::error(
                    AMBIGUOUS_OVERRIDE,
                    format!("Override {} matches {} elements", record.id, matches),
                )
                .with_selector(selector.clone()),
            );
        }
    }

    diagnostics
}

/// Every check; override checks run only when a store is given
pub fn lint_document(
    doc: &Document,
    engine: &SelectorEngine,
    store: Option<&OverrideStore>,
) -> Vec<Diagnostic> {
    let mut diagnostics = duplicate_ids(doc, engine);
    diagnostics.extend(missing_ids(doc, engine));
    if let Some(store) = store {
        diagnostics.extend(override_targets(doc, engine, store));
    }
    diagnostics
}
