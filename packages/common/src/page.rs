//! Page slugs
//!
//! Overrides and section orders are keyed by a normalized page slug, so
//! `/about/`, `/about/index.html` and `about.html` all address the same
//! page.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Normalized identifier of a page
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageSlug(String);

impl PageSlug {
    /// Slug used for the site root
    pub const INDEX: &'static str = "index";

    /// Normalize a request path or file path into a slug
    ///
    /// Query strings and fragments are dropped, `.html`/`.htm` extensions
    /// and trailing `index` segments are removed, and the empty path maps
    /// to `index`.
    pub fn from_path(path: &str) -> Self {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let path = path.replace('\\', "/");

        let mut segments: Vec<&str> = path
            .split('/')
            .filter(|s| !s.is_empty() && *s != ".")
            .collect();

        if let Some(last) = segments.pop() {
            let stem = last
                .strip_suffix(".html")
                .or_else(|| last.strip_suffix(".htm"))
                .unwrap_or(last);
            if stem != Self::INDEX || segments.is_empty() {
                segments.push(stem);
            }
        }

        if segments.is_empty() {
            return Self(Self::INDEX.to_string());
        }

        Self(segments.join("/").to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PageSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PageSlug {
    fn from(path: &str) -> Self {
        Self::from_path(path)
    }
}

impl AsRef<str> for PageSlug {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
