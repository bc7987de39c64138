//! HTML fragment lexing, tree building and serialization
//!
//! The parser is deliberately lenient: it never fails. Unknown end tags
//! are dropped, unclosed elements are closed at end of input and a stray
//! `<` is kept as text. Text and attribute values are stored decoded and
//! re-escaped on output, which makes `parse → serialize` a fixed point.

use crate::document::Document;
use crate::node::{ElementData, NodeData, NodeId};
use logos::{Lexer, Logos};
use tracing::trace;

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

/// Elements that never have children or an end tag
pub fn is_void_element(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag)
}

fn is_raw_text_element(tag: &str) -> bool {
    RAW_TEXT_ELEMENTS.contains(&tag)
}

/// Markup tokens
#[derive(Logos, Debug, Clone, PartialEq)]
enum Token<'src> {
    #[token("<!--", lex_comment)]
    Comment(&'src str),

    #[regex(r"<![dD][oO][cC][tT][yY][pP][eE][^>]*>", |lex| lex.slice())]
    Doctype(&'src str),

    #[regex(r#"<[a-zA-Z][a-zA-Z0-9:_-]*([^>"']|"[^"]*"|'[^']*')*>"#, |lex| lex.slice())]
    StartTag(&'src str),

    #[regex(r"</[a-zA-Z][a-zA-Z0-9:_-]*[ \t\r\n]*>", |lex| lex.slice())]
    EndTag(&'src str),

    #[regex(r"[^<]+", |lex| lex.slice())]
    Text(&'src str),

    #[token("<")]
    Lt,
}

fn lex_comment<'src>(lex: &mut Lexer<'src, Token<'src>>) -> &'src str {
    let rest = lex.remainder();
    match rest.find("-->") {
        Some(end) => {
            lex.bump(end + 3);
            &rest[..end]
        }
        None => {
            lex.bump(rest.len());
            rest
        }
    }
}

/// Parse `html` and append the resulting nodes to `parent`
///
/// Returns the top-level nodes created, in order.
pub fn parse_into(doc: &mut Document, parent: NodeId, html: &str) -> Vec<NodeId> {
    let mut created = Vec::new();
    let mut stack: Vec<(NodeId, String)> = Vec::new();
    let mut lexer = Token::lexer(html);

    while let Some(token) = lexer.next() {
        let current = stack.last().map(|(id, _)| *id).unwrap_or(parent);

        let node = match token {
            Ok(Token::Text(text)) => Some(doc.alloc(NodeData::Text(decode_entities(text)))),
            Ok(Token::Lt) | Err(_) => Some(doc.alloc(NodeData::Text(lexer.slice().to_string()))),
            Ok(Token::Comment(body)) => Some(doc.alloc(NodeData::Comment(body.to_string()))),
            Ok(Token::Doctype(raw)) => {
                let body = raw[2..raw.len() - 1].to_string();
                Some(doc.alloc(NodeData::Doctype(body)))
            }
            Ok(Token::EndTag(raw)) => {
                let name = raw[2..raw.len() - 1].trim().to_ascii_lowercase();
                match stack.iter().rposition(|(_, tag)| *tag == name) {
                    Some(index) => stack.truncate(index),
                    None => trace!(tag = %name, "Ignoring unmatched end tag"),
                }
                None
            }
            Ok(Token::StartTag(raw)) => {
                let (element, self_closing) = parse_tag(raw);
                let tag = element.tag.clone();
                let id = doc.alloc(NodeData::Element(element));
                doc.attach(current, id);
                if current == parent {
                    created.push(id);
                }

                if is_raw_text_element(&tag) && !self_closing {
                    let rest = lexer.remainder();
                    let close = format!("</{}", tag);
                    let end = find_ascii_case_insensitive(rest, &close).unwrap_or(rest.len());
                    if end > 0 {
                        let text = doc.alloc(NodeData::Text(rest[..end].to_string()));
                        doc.attach(id, text);
                    }
                    let after = rest[end..].find('>').map(|i| end + i + 1).unwrap_or(rest.len());
                    lexer.bump(after);
                } else if !self_closing && !is_void_element(&tag) {
                    stack.push((id, tag));
                }
                None
            }
        };

        if let Some(id) = node {
            doc.attach(current, id);
            if current == parent {
                created.push(id);
            }
        }
    }

    created
}

fn find_ascii_case_insensitive(haystack: &str, needle: &str) -> Option<usize> {
    let needle = needle.as_bytes();
    haystack
        .as_bytes()
        .windows(needle.len())
        .position(|window| window.eq_ignore_ascii_case(needle))
}

/// Split a raw start tag (`<a href="x" hidden>`) into element data
fn parse_tag(raw: &str) -> (ElementData, bool) {
    let inner = &raw[1..raw.len() - 1];
    let (inner, self_closing) = match inner.strip_suffix('/') {
        Some(rest) => (rest, true),
        None => (inner, false),
    };

    let name_end = inner
        .find(|c: char| c.is_ascii_whitespace() || c == '/')
        .unwrap_or(inner.len());
    let mut element = ElementData::new(&inner[..name_end]);

    let mut chars = inner[name_end..].char_indices().peekable();
    let rest = &inner[name_end..];

    loop {
        while let Some((_, c)) = chars.peek() {
            if c.is_ascii_whitespace() || *c == '/' {
                chars.next();
            } else {
                break;
            }
        }

        let Some(&(start, _)) = chars.peek() else {
            break;
        };

        let mut name_end = rest.len();
        while let Some(&(i, c)) = chars.peek() {
            if c.is_ascii_whitespace() || c == '=' || c == '/' {
                name_end = i;
                break;
            }
            chars.next();
        }
        let name = rest[start..name_end].to_ascii_lowercase();

        while let Some((_, c)) = chars.peek() {
            if c.is_ascii_whitespace() {
                chars.next();
            } else {
                break;
            }
        }

        let mut value = String::new();
        if let Some((_, '=')) = chars.peek() {
            chars.next();
            while let Some((_, c)) = chars.peek() {
                if c.is_ascii_whitespace() {
                    chars.next();
                } else {
                    break;
                }
            }

            match chars.peek().map(|(_, c)| *c) {
                Some(quote @ ('"' | '\'')) => {
                    chars.next();
                    for (_, c) in chars.by_ref() {
                        if c == quote {
                            break;
                        }
                        value.push(c);
                    }
                }
                Some(_) => {
                    while let Some(&(_, c)) = chars.peek() {
                        if c.is_ascii_whitespace() {
                            break;
                        }
                        value.push(c);
                        chars.next();
                    }
                }
                None => {}
            }
        }

        if !name.is_empty() && element.attr(&name).is_none() {
            element.attributes.push((name, decode_entities(&value)));
        }
    }

    (element, self_closing)
}

/// Decode the character references folio cares about
pub fn decode_entities(input: &str) -> String {
    if !input.contains('&') {
        return input.to_string();
    }

    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];

        let decoded = rest.find(';').filter(|end| *end <= 10).and_then(|end| {
            let entity = &rest[1..end];
            let ch = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "nbsp" => Some('\u{a0}'),
                _ => entity.strip_prefix('#').and_then(|num| {
                    let code = match num.strip_prefix(['x', 'X']) {
                        Some(hex) => u32::from_str_radix(hex, 16).ok(),
                        None => num.parse::<u32>().ok(),
                    };
                    code.and_then(char::from_u32)
                }),
            };
            ch.map(|c| (c, end))
        });

        match decoded {
            Some((c, end)) => {
                out.push(c);
                rest = &rest[end + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }

    out.push_str(rest);
    out
}

pub fn escape_text(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn escape_attr(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// Serialize `node` and its subtree
pub fn serialize_node(doc: &Document, node: NodeId, out: &mut String) {
    match doc.data(node) {
        NodeData::Document => serialize_children(doc, node, out),
        NodeData::Text(text) => {
            let raw_parent = doc
                .parent(node)
                .and_then(|p| doc.tag(p))
                .map(is_raw_text_element)
                .unwrap_or(false);
            if raw_parent {
                out.push_str(text);
            } else {
                out.push_str(&escape_text(text));
            }
        }
        NodeData::Comment(body) => {
            out.push_str("<!--");
            out.push_str(body);
            out.push_str("-->");
        }
        NodeData::Doctype(body) => {
            out.push_str("<!");
            out.push_str(body);
            out.push('>');
        }
        NodeData::Element(element) => {
            out.push('<');
            out.push_str(&element.tag);
            for (name, value) in &element.attributes {
                out.push(' ');
                out.push_str(name);
                if value.is_empty() {
                    continue;
                }
                out.push_str("=\"");
                out.push_str(&escape_attr(value));
                out.push('"');
            }
            out.push('>');

            if is_void_element(&element.tag) {
                return;
            }

            serialize_children(doc, node, out);
            out.push_str("</");
            out.push_str(&element.tag);
            out.push('>');
        }
    }
}

pub fn serialize_children(doc: &Document, node: NodeId, out: &mut String) {
    for child in doc.children(node) {
        serialize_node(doc, *child, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_entities() {
        assert_eq!(decode_entities("a &amp; b"), "a & b");
        assert_eq!(decode_entities("&lt;p&gt;"), "<p>");
        assert_eq!(decode_entities("&#65;&#x42;"), "AB");
        assert_eq!(decode_entities("AT&T"), "AT&T");
        assert_eq!(decode_entities("&bogus;"), "&bogus;");
    }

    #[test]
    fn test_parse_tag_attributes() {
        let (element, self_closing) =
            parse_tag(r#"<A HREF="/x?a=1&amp;b=2" data-block-id='b1' hidden>"#);
        assert!(!self_closing);
        assert_eq!(element.tag, "a");
        assert_eq!(element.attr("href"), Some("/x?a=1&b=2"));
        assert_eq!(element.attr("data-block-id"), Some("b1"));
        assert_eq!(element.attr("hidden"), Some(""));
    }

    #[test]
    fn test_parse_self_closing_and_unquoted() {
        let (element, self_closing) = parse_tag("<img src=/a.png alt=logo/>");
        assert!(self_closing);
        assert_eq!(element.attr("src"), Some("/a.png"));
        assert_eq!(element.attr("alt"), Some("logo"));
    }

    #[test]
    fn test_quoted_gt_inside_attribute() {
        let doc = Document::parse(r#"<p title="a > b">x</p>"#);
        let p = doc.query_selector("p").unwrap().unwrap();
        assert_eq!(doc.attr(p, "title"), Some("a > b"));
        assert_eq!(doc.text_content(p), "x");
    }

    #[test]
    fn test_raw_text_elements() {
        let html = "<script>if (a < b && c) { go(); }</script><p>after</p>";
        let doc = Document::parse(html);
        let script = doc.query_selector("script").unwrap().unwrap();
        assert_eq!(doc.text_content(script), "if (a < b && c) { go(); }");
        assert_eq!(doc.to_html(), html);
    }

    #[test]
    fn test_comment_and_doctype_round_trip() {
        let html = "<!DOCTYPE html><html><body><!-- note --><p>x</p></body></html>";
        let doc = Document::parse(html);
        assert_eq!(doc.to_html(), html);
    }

    #[test]
    fn test_stray_angle_bracket_is_text() {
        let doc = Document::parse("<p>1 < 2</p>");
        let p = doc.query_selector("p").unwrap().unwrap();
        assert_eq!(doc.text_content(p), "1 < 2");
        assert_eq!(doc.inner_html(p), "1 &lt; 2");
    }

    #[test]
    fn test_unmatched_end_tag_ignored() {
        let doc = Document::parse("<div><span>a</b></span></div>");
        assert_eq!(doc.to_html(), "<div><span>a</span></div>");
    }

    #[test]
    fn test_unclosed_elements_close_at_end() {
        let doc = Document::parse("<ul><li>one<li>two");
        assert_eq!(doc.to_html(), "<ul><li>one<li>two</li></li></ul>");
    }
}
