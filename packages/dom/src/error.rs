//! Error types for the document model

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomError {
    #[error("Invalid selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("Node cannot have children: {0}")]
    NotAContainer(String),

    #[error("Inserting node would create a cycle")]
    CycleDetected,

    #[error("Reference node is not a child of the target parent")]
    ReferenceNotChild,
}

impl DomError {
    pub(crate) fn invalid_selector(selector: &str, reason: impl Into<String>) -> Self {
        DomError::InvalidSelector {
            selector: selector.to_string(),
            reason: reason.into(),
        }
    }
}
