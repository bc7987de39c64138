//! # Document
//!
//! Arena-backed tree. Every node ever created stays in the arena; tree
//! edits only rewrite parent/child links.

use crate::error::DomError;
use crate::html;
use crate::node::{ElementData, Node, NodeData, NodeId};
use crate::selector::Selector;

#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
}

impl Document {
    /// Create an empty document (root only)
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::new(NodeData::Document)],
            root: NodeId(0),
        }
    }

    /// Parse a full page or fragment into a new document
    pub fn parse(markup: &str) -> Self {
        let mut doc = Self::new();
        let root = doc.root;
        html::parse_into(&mut doc, root, markup);
        doc
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of nodes ever allocated (attached or not)
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    pub(crate) fn alloc(&mut self, data: NodeData) -> NodeId {
        self.nodes.push(Node::new(data));
        NodeId(self.nodes.len() - 1)
    }

    /// Link a freshly allocated node under `parent` (parser fast path)
    pub(crate) fn attach(&mut self, parent: NodeId, child: NodeId) {
        self.node_mut(child).parent = Some(parent);
        self.node_mut(parent).children.push(child);
    }

    // ---- node creation ----

    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.alloc(NodeData::Element(ElementData::new(tag)))
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.alloc(NodeData::Text(text.to_string()))
    }

    // ---- tree structure ----

    pub fn data(&self, id: NodeId) -> &NodeData {
        &self.node(id).data
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    pub fn element_children(&self, id: NodeId) -> Vec<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .filter(|child| self.is_element(*child))
            .collect()
    }

    /// Pre-order walk of the subtree below `id` (excluding `id`)
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        Descendants {
            doc: self,
            stack: self.children(id).iter().rev().copied().collect(),
        }
    }

    /// Element ancestors of `id`, nearest first
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |current| self.parent(*current))
            .filter(move |node| self.is_element(*node))
    }

    /// Whether `id` is reachable from the document root
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut current = id;
        loop {
            if current == self.root {
                return true;
            }
            match self.parent(current) {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    fn is_inclusive_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    /// Detach `id` from its parent. The subtree stays intact.
    pub fn remove(&mut self, id: NodeId) {
        if let Some(parent) = self.node(id).parent {
            self.node_mut(parent).children.retain(|child| *child != id);
            self.node_mut(id).parent = None;
        }
    }

    /// Append `child` as the last child of `parent`, moving it if needed
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.insert_before(parent, child, None)
    }

    /// Insert `child` before `reference` (or at the end when `None`)
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> Result<(), DomError> {
        if !self.node(parent).can_have_children() {
            return Err(DomError::NotAContainer(
                self.tag(parent).unwrap_or("#non-element").to_string(),
            ));
        }
        if self.is_inclusive_ancestor(child, parent) {
            return Err(DomError::CycleDetected);
        }
        if let Some(reference) = reference {
            if reference == child {
                return Ok(());
            }
            if self.parent(reference) != Some(parent) {
                return Err(DomError::ReferenceNotChild);
            }
        }

        self.remove(child);

        let index = match reference {
            Some(reference) => self
                .children(parent)
                .iter()
                .position(|c| *c == reference)
                .ok_or(DomError::ReferenceNotChild)?,
            None => self.children(parent).len(),
        };

        self.node_mut(parent).children.insert(index, child);
        self.node_mut(child).parent = Some(parent);
        Ok(())
    }

    /// Detach every child of `id`
    pub fn clear_children(&mut self, id: NodeId) {
        let children = std::mem::take(&mut self.node_mut(id).children);
        for child in children {
            self.node_mut(child).parent = None;
        }
    }

    // ---- elements and attributes ----

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.node(id).data, NodeData::Element(_))
    }

    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        match &self.node(id).data {
            NodeData::Element(element) => Some(element),
            _ => None,
        }
    }

    fn element_mut(&mut self, id: NodeId) -> Option<&mut ElementData> {
        match &mut self.node_mut(id).data {
            NodeData::Element(element) => Some(element),
            _ => None,
        }
    }

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|e| e.tag.as_str())
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id).and_then(|e| e.attr(name))
    }

    pub fn has_attr(&self, id: NodeId, name: &str) -> bool {
        self.attr(id, name).is_some()
    }

    /// Set an attribute; a no-op on non-element nodes
    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        if let Some(element) = self.element_mut(id) {
            element.set_attr(name, value);
        }
    }

    pub fn remove_attr(&mut self, id: NodeId, name: &str) -> Option<String> {
        self.element_mut(id).and_then(|e| e.remove_attr(name))
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.element(id).map(|e| e.has_class(class)).unwrap_or(false)
    }

    pub fn add_class(&mut self, id: NodeId, class: &str) {
        if self.element(id).is_none() || self.has_class(id, class) {
            return;
        }
        let value = match self.attr(id, "class") {
            Some(existing) if !existing.trim().is_empty() => {
                format!("{} {}", existing.trim(), class)
            }
            _ => class.to_string(),
        };
        self.set_attr(id, "class", &value);
    }

    pub fn remove_class(&mut self, id: NodeId, class: &str) {
        if !self.has_class(id, class) {
            return;
        }
        let value = self
            .element(id)
            .map(|e| e.classes().filter(|c| *c != class).collect::<Vec<_>>().join(" "))
            .unwrap_or_default();
        if value.is_empty() {
            self.remove_attr(id, "class");
        } else {
            self.set_attr(id, "class", &value);
        }
    }

    /// Add or remove `class` depending on `on`
    pub fn set_class(&mut self, id: NodeId, class: &str, on: bool) {
        if on {
            self.add_class(id, class);
        } else {
            self.remove_class(id, class);
        }
    }

    // ---- content ----

    /// Concatenated text of every descendant text node
    pub fn text_content(&self, id: NodeId) -> String {
        match &self.node(id).data {
            NodeData::Text(text) | NodeData::Comment(text) => text.clone(),
            _ => self
                .descendants(id)
                .filter_map(|node| match self.data(node) {
                    NodeData::Text(text) => Some(text.as_str()),
                    _ => None,
                })
                .collect(),
        }
    }

    /// Replace all children with a single text node (no markup parsing)
    pub fn set_text_content(&mut self, id: NodeId, text: &str) {
        if let NodeData::Text(existing) | NodeData::Comment(existing) = &mut self.node_mut(id).data
        {
            *existing = text.to_string();
            return;
        }

        if self.node(id).can_have_children() {
            self.clear_children(id);
            if !text.is_empty() {
                let child = self.create_text(text);
                self.attach(id, child);
            }
        }
    }

    pub fn inner_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        html::serialize_children(self, id, &mut out);
        out
    }

    /// Replace all children with the parsed `markup`
    pub fn set_inner_html(&mut self, id: NodeId, markup: &str) -> Vec<NodeId> {
        if !self.node(id).can_have_children() {
            return Vec::new();
        }
        self.clear_children(id);
        html::parse_into(self, id, markup)
    }

    /// Parse `markup` and append it to `parent`
    pub fn append_html(&mut self, parent: NodeId, markup: &str) -> Result<Vec<NodeId>, DomError> {
        if !self.node(parent).can_have_children() {
            return Err(DomError::NotAContainer(
                self.tag(parent).unwrap_or("#non-element").to_string(),
            ));
        }
        Ok(html::parse_into(self, parent, markup))
    }

    pub fn outer_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        html::serialize_node(self, id, &mut out);
        out
    }

    /// Serialize the whole document
    pub fn to_html(&self) -> String {
        self.outer_html(self.root)
    }

    // ---- selectors ----

    /// Whether element `id` matches `selector`
    pub fn matches(&self, id: NodeId, selector: &str) -> Result<bool, DomError> {
        let selector = Selector::parse(selector)?;
        Ok(selector.matches(self, id))
    }

    /// Nearest inclusive ancestor matching `selector`
    pub fn closest(&self, id: NodeId, selector: &str) -> Result<Option<NodeId>, DomError> {
        let selector = Selector::parse(selector)?;
        Ok(self.closest_with(id, &selector))
    }

    pub fn closest_with(&self, id: NodeId, selector: &Selector) -> Option<NodeId> {
        std::iter::once(id)
            .filter(|node| self.is_element(*node))
            .chain(self.ancestors(id))
            .find(|node| selector.matches(self, *node))
    }

    pub fn query_selector(&self, selector: &str) -> Result<Option<NodeId>, DomError> {
        let selector = Selector::parse(selector)?;
        let first = self.select_within(self.root, &selector).next();
        Ok(first)
    }

    /// Every attached element matching `selector`, in document order
    pub fn query_selector_all(&self, selector: &str) -> Result<Vec<NodeId>, DomError> {
        let selector = Selector::parse(selector)?;
        let matches = self.select_within(self.root, &selector).collect();
        Ok(matches)
    }

    /// Matching elements strictly inside `scope`
    pub fn query_selector_all_within(
        &self,
        scope: NodeId,
        selector: &str,
    ) -> Result<Vec<NodeId>, DomError> {
        let selector = Selector::parse(selector)?;
        let matches = self.select_within(scope, &selector).collect();
        Ok(matches)
    }

    pub fn select_within<'a>(
        &'a self,
        scope: NodeId,
        selector: &'a Selector,
    ) -> impl Iterator<Item = NodeId> + 'a {
        self.descendants(scope)
            .filter(move |node| self.is_element(*node) && selector.matches(self, *node))
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

/// Pre-order iterator returned by [`Document::descendants`]
pub struct Descendants<'a> {
    doc: &'a Document,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let next = self.stack.pop()?;
        self.stack
            .extend(self.doc.children(next).iter().rev().copied());
        Some(next)
    }
}
