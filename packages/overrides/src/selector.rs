//! # Selector engine
//!
//! Derives the selector an override is stored under. Selectors are built
//! only from attributes already present in the markup, never from
//! position or text, so they keep resolving after edits and reloads.
//!
//! ```text
//! nav anchor        →  [data-nav] a[href="/contact.html"]
//! block in section  →  [data-section-id="S"] [data-block-id="X"]
//! link anywhere     →  [data-button-id="Y"]
//! ```
//!
//! Links and buttons use their own id namespace so a link nested inside
//! a text block never shares an id with its container.

use crate::config::EngineConfig;
use crate::errors::SelectorError;
use crate::ids::IdGenerator;
use crate::model::ContentType;
use folio_dom::{attr_equals, Document, NodeId, Selector};
use tracing::debug;

const HEADINGS: &[&str] = &["h1", "h2", "h3", "h4", "h5", "h6"];

#[derive(Debug, Clone)]
pub struct SelectorEngine {
    block_id_attr: String,
    button_id_attr: String,
    section_id_attr: String,
    content_type_attr: String,
    nav_alternatives: Vec<String>,
    nav_region: Selector,
    main_region: Selector,
    editable: Selector,
}

impl SelectorEngine {
    pub fn new(config: &EngineConfig) -> Result<Self, SelectorError> {
        let nav_region = Selector::parse(&config.nav_region)?;
        let nav_alternatives = config
            .nav_region
            .split(',')
            .map(|alt| alt.trim().to_string())
            .filter(|alt| !alt.is_empty())
            .collect();

        Ok(Self {
            block_id_attr: config.block_id_attr.clone(),
            button_id_attr: config.button_id_attr.clone(),
            section_id_attr: config.section_id_attr.clone(),
            content_type_attr: config.content_type_attr.clone(),
            nav_alternatives,
            nav_region,
            main_region: Selector::parse(&config.main_region)?,
            editable: Selector::parse(&config.editable)?,
        })
    }

    pub fn block_id_attr(&self) -> &str {
        &self.block_id_attr
    }

    pub fn button_id_attr(&self) -> &str {
        &self.button_id_attr
    }

    pub fn section_id_attr(&self) -> &str {
        &self.section_id_attr
    }

    /// Classify an element
    ///
    /// Images and anchors map to their own types. Every other element is
    /// `text` unless it explicitly opts into raw markup with
    /// `data-content-type="html"`.
    pub fn element_type(&self, doc: &Document, node: NodeId) -> Option<ContentType> {
        let tag = doc.tag(node)?;
        let content_type = match tag {
            "img" => ContentType::Image,
            "a" => ContentType::Link,
            _ if HEADINGS.contains(&tag) => ContentType::Text,
            _ if doc
                .attr(node, &self.content_type_attr)
                .map(|v| v.eq_ignore_ascii_case("html"))
                .unwrap_or(false) =>
            {
                ContentType::Html
            }
            _ => ContentType::Text,
        };
        Some(content_type)
    }

    /// Id namespace used by `node`
    pub fn id_attr_for(&self, doc: &Document, node: NodeId) -> &str {
        match doc.tag(node) {
            Some("a") | Some("button") => &self.button_id_attr,
            _ => &self.block_id_attr,
        }
    }

    pub fn in_nav_region(&self, doc: &Document, node: NodeId) -> bool {
        doc.closest_with(node, &self.nav_region).is_some()
    }

    /// The navigation anchor `node` belongs to, if any
    pub fn nav_anchor(&self, doc: &Document, node: NodeId) -> Option<NodeId> {
        let region = doc.closest_with(node, &self.nav_region)?;
        let anchor = std::iter::once(node)
            .chain(doc.ancestors(node))
            .take_while(|candidate| *candidate != region)
            .find(|candidate| doc.tag(*candidate) == Some("a"))?;
        doc.has_attr(anchor, "href").then_some(anchor)
    }

    /// The element a click on `node` edits: its navigation anchor, or
    /// the nearest editable candidate enclosing it
    pub fn edit_target(&self, doc: &Document, node: NodeId) -> Option<NodeId> {
        if let Some(anchor) = self.nav_anchor(doc, node) {
            return Some(anchor);
        }
        std::iter::once(node)
            .filter(|node| doc.is_element(*node))
            .chain(doc.ancestors(node))
            .find(|candidate| self.is_editable_candidate(doc, *candidate))
    }

    /// Derive the stable selector for `node`
    ///
    /// Fails when the element carries no persistent id: a selector made
    /// up on the spot would not survive the next reload.
    pub fn stable_selector(&self, doc: &Document, node: NodeId) -> Result<String, SelectorError> {
        let tag = doc.tag(node).ok_or(SelectorError::NotAnElement)?;

        if let Some(anchor) = self.nav_anchor(doc, node) {
            let href = doc.attr(anchor, "href").unwrap_or_default();
            return Ok(self.nav_selector(href));
        }

        let attr = self.id_attr_for(doc, node);
        let id = doc
            .attr(node, attr)
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| SelectorError::MissingPersistentId {
                tag: tag.to_string(),
                attr: attr.to_string(),
            })?;

        let own = attr_equals(attr, id);
        Ok(match self.section_of(doc, node) {
            Some(section) => format!("{} {}", attr_equals(&self.section_id_attr, section), own),
            None => own,
        })
    }

    /// Selector for every navigation anchor pointing at `href`
    pub fn nav_selector(&self, href: &str) -> String {
        let anchor = format!("a{}", attr_equals("href", href));
        self.nav_alternatives
            .iter()
            .map(|alt| format!("{} {}", alt, anchor))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Whether `selector` came from the navigation path (and may
    /// legitimately match several elements)
    pub fn is_nav_scoped(&self, selector: &str) -> bool {
        self.nav_alternatives
            .first()
            .map(|alt| selector.starts_with(&format!("{} a[href=", alt)))
            .unwrap_or(false)
    }

    /// Persistent id of the nearest enclosing section
    pub fn section_of<'d>(&self, doc: &'d Document, node: NodeId) -> Option<&'d str> {
        doc.ancestors(node)
            .find_map(|ancestor| doc.attr(ancestor, &self.section_id_attr))
            .filter(|id| !id.trim().is_empty())
    }

    pub fn main_region_source(&self) -> &str {
        self.main_region.as_str()
    }

    pub fn main_region(&self, doc: &Document) -> Option<NodeId> {
        doc.select_within(doc.root(), &self.main_region).next()
    }

    /// Sections inside the main region that are not nested in another
    /// section, in document order
    pub fn top_level_sections(&self, doc: &Document) -> Vec<NodeId> {
        let Some(main) = self.main_region(doc) else {
            return Vec::new();
        };

        doc.descendants(main)
            .filter(|node| doc.has_attr(*node, &self.section_id_attr))
            .filter(|node| {
                !doc.ancestors(*node)
                    .take_while(|ancestor| *ancestor != main)
                    .any(|ancestor| doc.has_attr(ancestor, &self.section_id_attr))
            })
            .collect()
    }

    pub fn is_editable_candidate(&self, doc: &Document, node: NodeId) -> bool {
        self.editable.matches(doc, node) || self.nav_anchor(doc, node) == Some(node)
    }

    /// Every element the visual editor may target, in document order
    pub fn editable_candidates(&self, doc: &Document) -> Vec<NodeId> {
        doc.descendants(doc.root())
            .filter(|node| doc.is_element(*node))
            .filter(|node| !matches!(doc.tag(*node), Some("script" | "style")))
            .filter(|node| self.is_editable_candidate(doc, *node))
            .collect()
    }

    /// Attach persistent ids to candidates and main-region sections that
    /// lack them. Meant for authoring/render time only.
    pub fn assign_persistent_ids(&self, doc: &mut Document, ids: &mut dyn IdGenerator) -> usize {
        let mut assigned = 0;

        if let Some(main) = self.main_region(doc) {
            for section in doc.element_children(main) {
                if doc.tag(section) == Some("section")
                    && !doc.has_attr(section, &self.section_id_attr)
                {
                    let id = ids.next_id();
                    debug!(section = %id, "Assigning section id");
                    doc.set_attr(section, &self.section_id_attr, &id);
                    assigned += 1;
                }
            }
        }

        for node in self.editable_candidates(doc) {
            if self.nav_anchor(doc, node).is_some() {
                continue;
            }
            let attr = self.id_attr_for(doc, node).to_string();
            if !doc.has_attr(node, &attr) {
                let id = ids.next_id();
                debug!(attr = %attr, id = %id, "Assigning persistent id");
                doc.set_attr(node, &attr, &id);
                assigned += 1;
            }
        }

        assigned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::SequentialIds;

    const PAGE: &str = concat!(
        r#"<header><nav data-nav><a href="/contact.html"><span>Contact</span></a><h4>Menu</h4></nav></header>"#,
        r#"<main>"#,
        r#"<section data-section-id="hero"><h1 data-block-id="h1">Hi</h1>"#,
        r#"<p data-block-id="p1">Read <a data-button-id="b1" href="/contact.html">contact</a></p>"#,
        r#"<img data-block-id="i1" src="/a.png"><div data-block-id="d1" data-content-type="html"><b>x</b></div></section>"#,
        r#"<p data-block-id="loose">Unsectioned</p><p>no id</p>"#,
        r#"</main>"#,
        r#"<footer><nav><a href="/contact.html">Contact</a></nav></footer>"#,
    );

    fn engine() -> SelectorEngine {
        SelectorEngine::new(&EngineConfig::default()).unwrap()
    }

    fn find(doc: &Document, selector: &str) -> NodeId {
        doc.query_selector(selector).unwrap().unwrap()
    }

    #[test]
    fn test_element_types() {
        let doc = Document::parse(PAGE);
        let engine = engine();
        assert_eq!(engine.element_type(&doc, find(&doc, "h1")), Some(ContentType::Text));
        assert_eq!(engine.element_type(&doc, find(&doc, "img")), Some(ContentType::Image));
        assert_eq!(
            engine.element_type(&doc, find(&doc, "[data-button-id=b1]")),
            Some(ContentType::Link)
        );
        assert_eq!(engine.element_type(&doc, find(&doc, "[data-block-id=p1]")), Some(ContentType::Text));
        assert_eq!(engine.element_type(&doc, find(&doc, "div")), Some(ContentType::Html));
    }

    #[test]
    fn test_scoped_selector_round_trips() {
        let doc = Document::parse(PAGE);
        let engine = engine();

        for id in ["[data-block-id=p1]", "[data-button-id=b1]", "img", "h1"] {
            let node = find(&doc, id);
            let selector = engine.stable_selector(&doc, node).unwrap();
            assert!(selector.starts_with(r#"[data-section-id="hero"] "#), "{}", selector);
            assert_eq!(doc.query_selector_all(&selector).unwrap(), vec![node]);
        }
    }

    #[test]
    fn test_unsectioned_selector() {
        let doc = Document::parse(PAGE);
        let engine = engine();
        let node = find(&doc, "[data-block-id=loose]");
        assert_eq!(
            engine.stable_selector(&doc, node).unwrap(),
            r#"[data-block-id="loose"]"#
        );
    }

    #[test]
    fn test_nav_selector_uses_href_and_targets_anchor() {
        let doc = Document::parse(PAGE);
        let engine = engine();
        let span = find(&doc, "nav span");
        let anchor = find(&doc, "[data-nav] a");

        let selector = engine.stable_selector(&doc, span).unwrap();
        assert_eq!(selector, r#"[data-nav] a[href="/contact.html"]"#);
        assert!(engine.is_nav_scoped(&selector));
        assert_eq!(engine.edit_target(&doc, span), Some(anchor));
        assert_eq!(doc.query_selector_all(&selector).unwrap(), vec![anchor]);
    }

    #[test]
    fn test_main_link_with_same_href_does_not_collide() {
        let doc = Document::parse(PAGE);
        let engine = engine();
        let main_link = find(&doc, "[data-button-id=b1]");
        let selector = engine.stable_selector(&doc, main_link).unwrap();
        assert!(!engine.is_nav_scoped(&selector));
        assert_eq!(doc.query_selector_all(&selector).unwrap(), vec![main_link]);
    }

    #[test]
    fn test_missing_id_fails_loudly() {
        let doc = Document::parse(PAGE);
        let engine = engine();
        let bare = doc.element_children(find(&doc, "main")).last().copied().unwrap();
        assert_eq!(doc.text_content(bare), "no id");

        let err = engine.stable_selector(&doc, bare).unwrap_err();
        assert_eq!(
            err,
            SelectorError::MissingPersistentId {
                tag: "p".to_string(),
                attr: "data-block-id".to_string(),
            }
        );
        assert!(matches!(
            engine.stable_selector(&doc, doc.root()),
            Err(SelectorError::NotAnElement)
        ));
    }

    #[test]
    fn test_multi_region_nav_selector() {
        let config = EngineConfig {
            nav_region: ".desktop-nav, .mobile-nav".to_string(),
            ..EngineConfig::default()
        };
        let engine = SelectorEngine::new(&config).unwrap();
        let doc = Document::parse(
            r#"<nav class="desktop-nav"><a href="/x">X</a></nav><nav class="mobile-nav"><a href="/x">X</a></nav><main><a href="/x" data-button-id="m">X</a></main>"#,
        );
        let anchor = find(&doc, ".mobile-nav a");
        let selector = engine.stable_selector(&doc, anchor).unwrap();
        assert_eq!(doc.query_selector_all(&selector).unwrap().len(), 2);
        assert!(engine.is_nav_scoped(&selector));
    }

    #[test]
    fn test_assign_persistent_ids() {
        let mut doc = Document::parse(
            r#"<nav data-nav><a href="/">Home</a></nav><main><section><h2>T</h2><p>Body <a href="/x">x</a></p></section></main>"#,
        );
        let engine = engine();
        let assigned = engine.assign_persistent_ids(&mut doc, &mut SequentialIds::new("id"));

        assert_eq!(assigned, 4);
        assert_eq!(
            doc.to_html(),
            concat!(
                r#"<nav data-nav><a href="/">Home</a></nav><main><section data-section-id="id-1">"#,
                r#"<h2 data-block-id="id-2">T</h2><p data-block-id="id-3">Body <a href="/x" data-button-id="id-4">x</a></p>"#,
                r#"</section></main>"#
            )
        );

        // Second run is a no-op
        assert_eq!(engine.assign_persistent_ids(&mut doc, &mut SequentialIds::new("z")), 0);
    }

    #[test]
    fn test_top_level_sections() {
        let doc = Document::parse(
            r#"<main><section data-section-id="a"><div data-section-id="inner"></div></section><div><section data-section-id="b"></section></div></main><section data-section-id="outside"></section>"#,
        );
        let engine = engine();
        let ids: Vec<_> = engine
            .top_level_sections(&doc)
            .into_iter()
            .map(|node| doc.attr(node, "data-section-id").unwrap().to_string())
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
    }
}
