use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Engine configuration
///
/// Every field has a default, so a partial JSON object is enough.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    /// Persistent id attribute for non-link content
    pub block_id_attr: String,

    /// Persistent id attribute for links and buttons
    pub button_id_attr: String,

    /// Persistent id attribute for top-level sections
    pub section_id_attr: String,

    /// Flag set on elements that currently carry an applied override
    pub managed_attr: String,

    /// Attribute that opts an element into raw-markup (`html`) overrides
    pub content_type_attr: String,

    /// Selector of the primary navigation region(s)
    pub nav_region: String,

    /// Selector of the main content region holding reorderable sections
    pub main_region: String,

    /// Selector of elements that may be edited in place
    pub editable: String,

    /// Classes toggled on links saved with `isButton`
    pub button_classes: Vec<String>,

    pub retry: RetryPolicy,

    /// How often admin status is re-checked during a session
    pub admin_poll_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            block_id_attr: "data-block-id".to_string(),
            button_id_attr: "data-button-id".to_string(),
            section_id_attr: "data-section-id".to_string(),
            managed_attr: "data-override-managed".to_string(),
            content_type_attr: "data-content-type".to_string(),
            nav_region: "[data-nav]".to_string(),
            main_region: "main".to_string(),
            editable: "h1, h2, h3, h4, h5, h6, p, li, blockquote, figcaption, img, a, button, [data-editable]"
                .to_string(),
            button_classes: vec!["btn".to_string(), "btn-primary".to_string()],
            retry: RetryPolicy::default(),
            admin_poll_secs: 600,
        }
    }
}

impl EngineConfig {
    pub fn admin_poll_interval(&self) -> Duration {
        Duration::from_secs(self.admin_poll_secs.max(1))
    }
}

/// Bounded retry used while overrides wait for late content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RetryPolicy {
    pub interval_ms: u64,
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            interval_ms: 100,
            max_attempts: 50,
        }
    }
}

impl RetryPolicy {
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval_ms: interval.as_millis() as u64,
            max_attempts,
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.max(1))
    }

    /// At least one attempt is always made
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Wall time of a fully exhausted budget
    pub fn budget(&self) -> Duration {
        self.interval() * self.attempts().saturating_sub(1)
    }
}
