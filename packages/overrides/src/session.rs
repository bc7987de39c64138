//! # Edit session
//!
//! ```text
//! Viewing ──toggle──▶ Editing ──select──▶ ElementSelected
//!    ▲                  │  ▲                    │
//!    └─────toggle───────┘  └─save/cancel/restore┘
//! ```
//!
//! At most one active editor exists. Selecting another element drops
//! the previous selection without saving.

use crate::errors::SessionError;
use crate::model::{ContentType, OriginalContent};
use crate::selector::SelectorEngine;
use folio_dom::{Document, NodeId};
use tokio::sync::broadcast;
use tracing::{debug, info};

/// Marks elements that show an edit affordance while edit mode is on
pub const AFFORDANCE_ATTR: &str = "data-edit-affordance";

/// Marks links whose navigation is suspended while edit mode is on
pub const DISABLED_LINK_ATTR: &str = "data-edit-disabled";

const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditState {
    Viewing,
    Editing,
    ElementSelected,
}

/// The element currently targeted for editing
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveEditor {
    pub element: NodeId,
    /// Stable selector, if one could be derived at selection time
    pub selector: Option<String>,
    pub content_type: ContentType,
    /// Content as it was when the element was selected
    pub original_snapshot: OriginalContent,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    AuthorizationChanged(bool),
    EditModeChanged(bool),
    ActiveEditorChanged(Option<NodeId>),
    SaveStarted(NodeId),
    SaveFinished { element: NodeId, ok: bool },
}

#[derive(Debug)]
pub struct EditSession {
    authorized: bool,
    edit_mode: bool,
    active: Option<ActiveEditor>,
    saving: bool,
    decorated: Vec<NodeId>,
    disabled_links: Vec<NodeId>,
    events: broadcast::Sender<SessionEvent>,
}

impl Default for EditSession {
    fn default() -> Self {
        Self::new()
    }
}

impl EditSession {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            authorized: false,
            edit_mode: false,
            active: None,
            saving: false,
            decorated: Vec::new(),
            disabled_links: Vec::new(),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    pub fn state(&self) -> EditState {
        match (self.edit_mode, &self.active) {
            (false, _) => EditState::Viewing,
            (true, None) => EditState::Editing,
            (true, Some(_)) => EditState::ElementSelected,
        }
    }

    pub fn is_authorized(&self) -> bool {
        self.authorized
    }

    pub fn is_editing(&self) -> bool {
        self.edit_mode
    }

    pub fn is_saving(&self) -> bool {
        self.saving
    }

    pub fn active_editor(&self) -> Option<&ActiveEditor> {
        self.active.as_ref()
    }

    /// Record the latest admin check. Losing authorization while in
    /// edit mode leaves edit mode.
    pub fn set_authorized(&mut self, doc: &mut Document, authorized: bool) {
        if self.authorized == authorized {
            return;
        }
        self.authorized = authorized;
        info!(authorized, "Editor authorization changed");
        self.emit(SessionEvent::AuthorizationChanged(authorized));

        if !authorized && self.edit_mode {
            self.leave_edit_mode(doc);
        }
    }

    /// Flip edit mode, returning the new mode
    pub fn toggle_edit_mode(
        &mut self,
        doc: &mut Document,
        engine: &SelectorEngine,
    ) -> Result<bool, SessionError> {
        if self.edit_mode {
            self.leave_edit_mode(doc);
            return Ok(false);
        }
        if !self.authorized {
            return Err(SessionError::NotAuthorized);
        }

        for node in engine.editable_candidates(doc) {
            doc.set_attr(node, AFFORDANCE_ATTR, "true");
            self.decorated.push(node);

            if doc.tag(node) == Some("a") && doc.has_attr(node, "href") {
                doc.set_attr(node, DISABLED_LINK_ATTR, "true");
                doc.set_attr(node, "aria-disabled", "true");
                self.disabled_links.push(node);
            }
        }

        self.edit_mode = true;
        debug!(candidates = self.decorated.len(), "Entered edit mode");
        self.emit(SessionEvent::EditModeChanged(true));
        Ok(true)
    }

    fn leave_edit_mode(&mut self, doc: &mut Document) {
        for node in self.decorated.drain(..) {
            doc.remove_attr(node, AFFORDANCE_ATTR);
        }
        for node in self.disabled_links.drain(..) {
            doc.remove_attr(node, DISABLED_LINK_ATTR);
            doc.remove_attr(node, "aria-disabled");
        }

        self.edit_mode = false;
        self.clear_active_editor();
        debug!("Left edit mode");
        self.emit(SessionEvent::EditModeChanged(false));
    }

    /// Make `editor` the single active editor
    pub fn set_active_editor(&mut self, editor: ActiveEditor) -> Result<(), SessionError> {
        if !self.edit_mode {
            return Err(SessionError::NotEditing);
        }
        if self.saving {
            return Err(SessionError::SaveInFlight);
        }

        let element = editor.element;
        if let Some(previous) = self.active.replace(editor) {
            if previous.element != element {
                debug!(previous = %previous.element, "Discarding previous selection");
            }
        }
        self.emit(SessionEvent::ActiveEditorChanged(Some(element)));
        Ok(())
    }

    pub fn clear_active_editor(&mut self) {
        if self.active.take().is_some() {
            self.emit(SessionEvent::ActiveEditorChanged(None));
        }
    }

    /// Confirm the active editor exists and is still in the document
    ///
    /// A detached target clears the selection.
    pub fn validate(&mut self, doc: &Document) -> Result<&ActiveEditor, SessionError> {
        let attached = match &self.active {
            Some(active) => doc.is_attached(active.element),
            None => return Err(SessionError::NoActiveEditor),
        };

        if !attached {
            debug!("Active editor was detached; clearing selection");
            self.clear_active_editor();
            return Err(SessionError::StaleEditor);
        }

        self.active.as_ref().ok_or(SessionError::NoActiveEditor)
    }

    /// Lock the active editor for a save
    pub fn begin_save(&mut self) -> Result<NodeId, SessionError> {
        if self.saving {
            return Err(SessionError::SaveInFlight);
        }
        let element = self
            .active
            .as_ref()
            .map(|active| active.element)
            .ok_or(SessionError::NoActiveEditor)?;

        self.saving = true;
        self.emit(SessionEvent::SaveStarted(element));
        Ok(element)
    }

    /// Unlock after a save. A successful save ends the selection; a
    /// failed one keeps it so the user can retry.
    pub fn finish_save(&mut self, ok: bool) {
        if !self.saving {
            return;
        }
        self.saving = false;

        if let Some(element) = self.active.as_ref().map(|active| active.element) {
            self.emit(SessionEvent::SaveFinished { element, ok });
        }
        if ok {
            self.clear_active_editor();
        }
    }
}
