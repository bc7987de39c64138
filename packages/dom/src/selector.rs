//! CSS selector subset
//!
//! Supported: type (`a`), universal (`*`), id (`#x`), class (`.x`),
//! attribute presence (`[x]`) and equality (`[x="v"]`, `[x=v]`),
//! descendant (` `) and child (`>`) combinators, and comma lists.
//!
//! Matching runs right to left, the way browsers do it: the rightmost
//! compound must match the candidate, then combinators walk up.

use crate::document::Document;
use crate::error::DomError;
use crate::node::NodeId;
use logos::{Lexer, Logos};
use std::fmt;

#[derive(Logos, Debug, Clone, PartialEq)]
enum Token {
    #[regex(r"[a-zA-Z0-9_-]+", |lex| lex.slice().to_string())]
    Ident(String),

    #[regex(r"#[a-zA-Z0-9_-]+", |lex| lex.slice()[1..].to_string())]
    Hash(String),

    #[regex(r#""([^"\\]|\\.)*""#, unquote)]
    #[regex(r"'([^'\\]|\\.)*'", unquote)]
    Str(String),

    #[token(".")]
    Dot,

    #[token("*")]
    Star,

    #[token("[")]
    LBracket,

    #[token("]")]
    RBracket,

    #[token("=")]
    Eq,

    #[token(">")]
    Gt,

    #[token(",")]
    Comma,

    #[regex(r"[ \t\r\n]+")]
    Space,
}

fn unquote(lex: &mut Lexer<Token>) -> String {
    let slice = lex.slice();
    let body = &slice[1..slice.len() - 1];
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(escaped) = chars.next() {
                out.push(escaped);
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Quote `value` for use inside an attribute selector
pub fn escape_attr_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

/// `[name="value"]`
pub fn attr_equals(name: &str, value: &str) -> String {
    format!("[{}={}]", name, escape_attr_value(value))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct AttrSelector {
    name: String,
    value: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    ids: Vec<String>,
    classes: Vec<String>,
    attrs: Vec<AttrSelector>,
}

impl Compound {
    fn matches(&self, doc: &Document, node: NodeId) -> bool {
        let Some(element) = doc.element(node) else {
            return false;
        };

        if let Some(tag) = &self.tag {
            if element.tag != *tag {
                return false;
            }
        }

        self.ids.iter().all(|id| element.attr("id") == Some(id.as_str()))
            && self.classes.iter().all(|class| element.has_class(class))
            && self.attrs.iter().all(|attr| match (&attr.value, element.attr(&attr.name)) {
                (_, None) => false,
                (None, Some(_)) => true,
                (Some(expected), Some(actual)) => expected == actual,
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Complex {
    compounds: Vec<Compound>,
    /// `combinators[i]` joins `compounds[i]` and `compounds[i + 1]`
    combinators: Vec<Combinator>,
}

impl Complex {
    fn matches(&self, doc: &Document, node: NodeId) -> bool {
        self.matches_at(doc, node, self.compounds.len() - 1)
    }

    fn matches_at(&self, doc: &Document, node: NodeId, index: usize) -> bool {
        if !self.compounds[index].matches(doc, node) {
            return false;
        }
        if index == 0 {
            return true;
        }

        match self.combinators[index - 1] {
            Combinator::Child => doc
                .parent(node)
                .filter(|parent| doc.is_element(*parent))
                .map(|parent| self.matches_at(doc, parent, index - 1))
                .unwrap_or(false),
            Combinator::Descendant => doc
                .ancestors(node)
                .any(|ancestor| self.matches_at(doc, ancestor, index - 1)),
        }
    }
}

/// Parsed selector list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    source: String,
    alternatives: Vec<Complex>,
}

impl Selector {
    pub fn parse(source: &str) -> Result<Self, DomError> {
        let mut tokens = Vec::new();
        let mut lexer = Token::lexer(source);
        while let Some(token) = lexer.next() {
            match token {
                Ok(token) => tokens.push(token),
                Err(_) => {
                    return Err(DomError::invalid_selector(
                        source,
                        format!("unexpected '{}'", lexer.slice()),
                    ))
                }
            }
        }

        let mut parser = Parser {
            source,
            tokens,
            pos: 0,
        };
        let alternatives = parser.parse_list()?;

        Ok(Self {
            source: source.to_string(),
            alternatives,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Whether element `node` matches any alternative
    pub fn matches(&self, doc: &Document, node: NodeId) -> bool {
        doc.is_element(node) && self.alternatives.iter().any(|alt| alt.matches(doc, node))
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn skip_space(&mut self) -> bool {
        let mut skipped = false;
        while let Some(Token::Space) = self.peek() {
            self.pos += 1;
            skipped = true;
        }
        skipped
    }

    fn error(&self, reason: impl Into<String>) -> DomError {
        DomError::invalid_selector(self.source, reason)
    }

    fn parse_list(&mut self) -> Result<Vec<Complex>, DomError> {
        let mut alternatives = vec![self.parse_complex()?];
        while let Some(Token::Comma) = self.peek() {
            self.pos += 1;
            alternatives.push(self.parse_complex()?);
        }
        if self.pos < self.tokens.len() {
            return Err(self.error("trailing input"));
        }
        Ok(alternatives)
    }

    fn parse_complex(&mut self) -> Result<Complex, DomError> {
        self.skip_space();
        let mut compounds = vec![self.parse_compound()?];
        let mut combinators = Vec::new();

        loop {
            let had_space = self.skip_space();
            match self.peek() {
                None | Some(Token::Comma) => break,
                Some(Token::Gt) => {
                    self.pos += 1;
                    self.skip_space();
                    combinators.push(Combinator::Child);
                }
                Some(_) if had_space => combinators.push(Combinator::Descendant),
                Some(token) => return Err(self.error(format!("unexpected {:?}", token))),
            }
            compounds.push(self.parse_compound()?);
        }

        Ok(Complex {
            compounds,
            combinators,
        })
    }

    fn parse_compound(&mut self) -> Result<Compound, DomError> {
        let mut compound = Compound::default();
        let mut consumed = false;

        match self.peek() {
            Some(Token::Ident(tag)) => {
                compound.tag = Some(tag.to_ascii_lowercase());
                self.pos += 1;
                consumed = true;
            }
            Some(Token::Star) => {
                self.pos += 1;
                consumed = true;
            }
            _ => {}
        }

        loop {
            match self.peek() {
                Some(Token::Hash(id)) => {
                    compound.ids.push(id.clone());
                    self.pos += 1;
                }
                Some(Token::Dot) => {
                    self.pos += 1;
                    match self.next() {
                        Some(Token::Ident(class)) => compound.classes.push(class),
                        _ => return Err(self.error("expected class name after '.'")),
                    }
                }
                Some(Token::LBracket) => {
                    self.pos += 1;
                    compound.attrs.push(self.parse_attr()?);
                }
                _ => break,
            }
            consumed = true;
        }

        if !consumed {
            return Err(self.error("expected a selector"));
        }
        Ok(compound)
    }

    fn parse_attr(&mut self) -> Result<AttrSelector, DomError> {
        self.skip_space();
        let name = match self.next() {
            Some(Token::Ident(name)) => name.to_ascii_lowercase(),
            _ => return Err(self.error("expected attribute name")),
        };
        self.skip_space();

        let value = match self.next() {
            Some(Token::RBracket) => return Ok(AttrSelector { name, value: None }),
            Some(Token::Eq) => {
                self.skip_space();
                match self.next() {
                    Some(Token::Str(value)) | Some(Token::Ident(value)) => value,
                    _ => return Err(self.error("expected attribute value")),
                }
            }
            _ => return Err(self.error("expected ']' or '='")),
        };

        self.skip_space();
        match self.next() {
            Some(Token::RBracket) => Ok(AttrSelector {
                name,
                value: Some(value),
            }),
            _ => Err(self.error("expected ']'")),
        }
    }
}
