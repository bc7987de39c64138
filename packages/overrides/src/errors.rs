//! Error types for the override engine

use folio_dom::DomError;
use thiserror::Error;

/// Selector derivation failures
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SelectorError {
    /// The element has no persistent id, so any selector would not
    /// survive a reload
    #[error("<{tag}> has no persistent '{attr}' attribute; add one to the markup before editing")]
    MissingPersistentId { tag: String, attr: String },

    #[error("Node is not an element")]
    NotAnElement,

    #[error("Invalid selector configuration: {0}")]
    Config(#[from] DomError),
}

/// Persistence failures. All of them are recoverable.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AdapterError {
    #[error("Request failed: {0}")]
    Transport(String),

    #[error("Server returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Could not decode response: {0}")]
    Decode(String),

    #[error("Override not found: {0}")]
    NotFound(String),

    #[error("Another active override already targets '{0}'")]
    Conflict(String),
}

impl AdapterError {
    /// Whether the server refused the caller's credentials
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, AdapterError::Status { status: 401 | 403, .. })
    }
}

/// Edit session state violations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    #[error("Editing requires admin rights")]
    NotAuthorized,

    #[error("Edit mode is off")]
    NotEditing,

    #[error("No element is selected")]
    NoActiveEditor,

    #[error("The selected element is no longer on the page")]
    StaleEditor,

    #[error("A save is already in progress")]
    SaveInFlight,
}

#[derive(Error, Debug)]
pub enum OverrideError {
    #[error("Document error: {0}")]
    Dom(#[from] DomError),

    #[error("Selector error: {0}")]
    Selector(#[from] SelectorError),

    #[error("Persistence error: {0}")]
    Adapter(#[from] AdapterError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Element is not editable: {0}")]
    NotEditable(String),

    #[error("No override to restore for {0}")]
    NothingToRestore(String),

    #[error("Page runtime has not been initialized")]
    NotInitialized,

    #[error("Main region '{0}' not found")]
    MissingMainRegion(String),
}

pub type OverrideResult<T> = Result<T, OverrideError>;
