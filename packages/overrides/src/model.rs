//! # Data model
//!
//! Wire shapes shared with the persistence layer. Field names follow the
//! JSON contract (`camelCase`).
//!
//! The `image` field doubles as a link's destination. That overload is
//! part of the stored format and is kept as-is.

use chrono::{DateTime, Utc};
use folio_common::PageSlug;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// How an override mutates its target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    /// Plain text, never interpreted as markup
    Text,
    /// Raw markup (explicit opt-in only)
    Html,
    /// `img` source and alt text
    Image,
    /// Anchor destination, label and button styling
    Link,
}

impl ContentType {
    pub fn as_str(self) -> &'static str {
        match self {
            ContentType::Text => "text",
            ContentType::Html => "html",
            ContentType::Image => "image",
            ContentType::Link => "link",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(ContentType::Text),
            "html" => Ok(ContentType::Html),
            "image" => Ok(ContentType::Image),
            "link" => Ok(ContentType::Link),
            other => Err(format!("unknown content type '{}'", other)),
        }
    }
}

/// Mutation strategy. Only `replace` is applied today.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OverrideType {
    #[default]
    Replace,
    #[serde(other)]
    Unsupported,
}

/// Server-assigned override identifier
///
/// Accepts either a JSON string or number on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct OverrideId(String);

impl OverrideId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OverrideId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for OverrideId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Str(String),
            Int(i64),
        }

        Ok(match Repr::deserialize(deserializer)? {
            Repr::Str(s) => OverrideId(s),
            Repr::Int(n) => OverrideId(n.to_string()),
        })
    }
}

/// Pre-edit content of an element, captured once when its override is
/// first created
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OriginalContent {
    /// Text or markup, depending on the override's content type
    Markup(String),

    Image {
        src: String,
        #[serde(default)]
        alt: Option<String>,
    },

    Link {
        href: String,
        text: String,
        #[serde(default, rename = "isButton", skip_serializing_if = "Option::is_none")]
        is_button: Option<bool>,
    },
}

/// A persisted content mutation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverrideRecord {
    pub id: OverrideId,
    pub target_page: PageSlug,
    pub target_selector: String,
    pub content_type: ContentType,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub is_button: bool,
    #[serde(default)]
    pub original_content: Option<OriginalContent>,
    #[serde(default)]
    pub override_type: OverrideType,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_active() -> bool {
    true
}

impl OverrideRecord {
    /// Build a fresh record from a save payload
    pub fn from_payload(id: OverrideId, payload: &SavePayload, now: DateTime<Utc>) -> Self {
        Self {
            id,
            target_page: payload.target_page.clone(),
            target_selector: payload.target_selector.clone(),
            content_type: payload.content_type,
            text: payload.text.clone(),
            image: payload.image.clone(),
            is_button: payload.is_button,
            original_content: payload.original_content.clone(),
            override_type: payload.override_type,
            is_active: true,
            created_at: Some(now),
            updated_at: Some(now),
        }
    }

    /// Overwrite the mutable fields from `payload`
    ///
    /// `original_content` and `created_at` are never touched here.
    pub fn update_from(&mut self, payload: &SavePayload, now: DateTime<Utc>) {
        self.target_selector = payload.target_selector.clone();
        self.content_type = payload.content_type;
        self.text = payload.text.clone();
        self.image = payload.image.clone();
        self.is_button = payload.is_button;
        self.override_type = payload.override_type;
        self.updated_at = Some(now);
    }

    /// The link destination (stored in `image`)
    pub fn href(&self) -> Option<&str> {
        self.image.as_deref()
    }
}

/// Body of a save request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavePayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<OverrideId>,
    pub target_page: PageSlug,
    pub target_selector: String,
    pub content_type: ContentType,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub is_button: bool,
    /// Ignored by the server on update
    #[serde(default)]
    pub original_content: Option<OriginalContent>,
    #[serde(default)]
    pub override_type: OverrideType,
}

impl SavePayload {
    /// Record shape used for optimistic application before the server
    /// has answered
    pub fn provisional_record(&self) -> OverrideRecord {
        OverrideRecord {
            id: self.id.clone().unwrap_or_else(|| OverrideId::new("pending")),
            target_page: self.target_page.clone(),
            target_selector: self.target_selector.clone(),
            content_type: self.content_type,
            text: self.text.clone(),
            image: self.image.clone(),
            is_button: self.is_button,
            original_content: self.original_content.clone(),
            override_type: self.override_type,
            is_active: true,
            created_at: None,
            updated_at: None,
        }
    }
}

/// New content typed in by an editor
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentEdit {
    pub text: Option<String>,
    pub image: Option<String>,
    pub is_button: bool,
}

impl ContentEdit {
    /// Text or markup body
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn image(src: impl Into<String>, alt: Option<String>) -> Self {
        Self {
            text: alt,
            image: Some(src.into()),
            is_button: false,
        }
    }

    pub fn link(text: impl Into<String>, href: impl Into<String>, is_button: bool) -> Self {
        Self {
            text: Some(text.into()),
            image: Some(href.into()),
            is_button,
        }
    }
}

/// Persisted order of top-level sections on a page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionOrder {
    pub page: PageSlug,
    #[serde(default)]
    pub order: Vec<String>,
}

impl SectionOrder {
    pub fn new(page: PageSlug, order: Vec<String>) -> Self {
        Self { page, order }
    }

    pub fn empty(page: PageSlug) -> Self {
        Self {
            page,
            order: Vec::new(),
        }
    }
}

/// File handed to the upload endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedImage {
    pub url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminStatus {
    pub is_admin: bool,
}
