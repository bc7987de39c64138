use std::fmt;

/// Handle to a node inside a [`crate::Document`]
///
/// Two handles are equal iff they refer to the same node, which is how
/// element identity is compared throughout folio. Handles are only
/// meaningful for the document that created them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Node payload
#[derive(Debug, Clone, PartialEq)]
pub enum NodeData {
    /// Document root (exactly one per document)
    Document,

    /// HTML element
    Element(ElementData),

    /// Text node (stored decoded)
    Text(String),

    /// Comment node
    Comment(String),

    /// `<!DOCTYPE ...>` declaration, stored verbatim
    Doctype(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ElementData {
    /// Lowercase tag name
    pub tag: String,

    /// Attributes in source order
    pub attributes: Vec<(String, String)>,
}

impl ElementData {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            attributes: Vec::new(),
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn set_attr(&mut self, name: &str, value: &str) {
        match self.attributes.iter_mut().find(|(key, _)| key == name) {
            Some((_, existing)) => {
                if existing != value {
                    *existing = value.to_string();
                }
            }
            None => self
                .attributes
                .push((name.to_string(), value.to_string())),
        }
    }

    pub fn remove_attr(&mut self, name: &str) -> Option<String> {
        let index = self.attributes.iter().position(|(key, _)| key == name)?;
        Some(self.attributes.remove(index).1)
    }

    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.attr("class").unwrap_or_default().split_ascii_whitespace()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes().any(|c| c == class)
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Node {
    pub data: NodeData,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

impl Node {
    pub fn new(data: NodeData) -> Self {
        Self {
            data,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn can_have_children(&self) -> bool {
        match &self.data {
            NodeData::Document => true,
            NodeData::Element(element) => !crate::html::is_void_element(&element.tag),
            _ => false,
        }
    }
}
