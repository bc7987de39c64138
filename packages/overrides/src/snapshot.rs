//! Capture and restore of an element's observable content

use crate::apply::self_or_descendant;
use crate::model::{ContentType, OriginalContent};
use folio_dom::{Document, NodeId};

/// Snapshot the parts of `node` an override of `content_type` mutates
pub fn capture(
    doc: &Document,
    node: NodeId,
    content_type: ContentType,
    button_classes: &[String],
) -> OriginalContent {
    match content_type {
        ContentType::Text => OriginalContent::Markup(doc.text_content(node)),
        ContentType::Html => OriginalContent::Markup(doc.inner_html(node)),
        ContentType::Image => {
            let img = self_or_descendant(doc, node, "img").unwrap_or(node);
            OriginalContent::Image {
                src: doc.attr(img, "src").unwrap_or_default().to_string(),
                alt: doc.attr(img, "alt").map(str::to_string),
            }
        }
        ContentType::Link => {
            let anchor = self_or_descendant(doc, node, "a").unwrap_or(node);
            let is_button = !button_classes.is_empty()
                && button_classes.iter().all(|class| doc.has_class(anchor, class));
            OriginalContent::Link {
                href: doc.attr(anchor, "href").unwrap_or_default().to_string(),
                text: doc.text_content(anchor),
                is_button: Some(is_button),
            }
        }
    }
}

/// Put a captured snapshot back
///
/// Returns `false` when the snapshot shape does not fit `content_type`.
pub fn restore(
    doc: &mut Document,
    node: NodeId,
    content_type: ContentType,
    original: &OriginalContent,
    button_classes: &[String],
) -> bool {
    match (content_type, original) {
        (ContentType::Text, OriginalContent::Markup(text)) => {
            doc.set_text_content(node, text);
        }
        (ContentType::Html, OriginalContent::Markup(markup)) => {
            doc.set_inner_html(node, markup);
        }
        (ContentType::Image, OriginalContent::Image { src, alt }) => {
            let img = self_or_descendant(doc, node, "img").unwrap_or(node);
            doc.set_attr(img, "src", src);
            match alt {
                Some(alt) => doc.set_attr(img, "alt", alt),
                None => {
                    doc.remove_attr(img, "alt");
                }
            }
        }
        (ContentType::Link, OriginalContent::Link { href, text, is_button }) => {
            let anchor = self_or_descendant(doc, node, "a").unwrap_or(node);
            doc.set_attr(anchor, "href", href);
            doc.set_text_content(anchor, text);
            if let Some(is_button) = is_button {
                for class in button_classes {
                    doc.set_class(anchor, class, *is_button);
                }
            }
        }
        _ => return false,
    }
    true
}
