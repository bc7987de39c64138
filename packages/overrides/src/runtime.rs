//! # Page runtime
//!
//! Wires the engine together for one page view:
//!
//! ```text
//! sections ready ─▶ load store ─▶ apply (with retry) ─▶ overrides applied
//!                                                            │
//!                         admin check ◀─ section order ◀─────┘
//! ```
//!
//! Everything here runs on one thread. The document is shared through
//! `Rc<RefCell<_>>` and is never borrowed across an await, so injected
//! content can land between retry ticks.

use crate::adapter::PersistenceAdapter;
use crate::admin::AdminGate;
use crate::apply::{Applier, PassReport};
use crate::config::EngineConfig;
use crate::errors::{OverrideError, OverrideResult, SessionError};
use crate::model::{
    ContentEdit, ContentType, ImageUpload, OverrideRecord, OverrideType, SavePayload,
    SectionOrder, UploadedImage,
};
use crate::notify::{Notice, Notifier};
use crate::retry::{apply_until_resolved, ApplyOutcome};
use crate::section_order::{ReorderProvider, SectionOrderOverlay};
use crate::selector::SelectorEngine;
use crate::session::{ActiveEditor, EditSession};
use crate::signal::Signal;
use crate::snapshot;
use crate::store::OverrideStore;
use folio_common::PageSlug;
use folio_dom::{Document, NodeId};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

pub type SharedDocument = Rc<RefCell<Document>>;

/// What `init` needs to know about the page being shown
#[derive(Debug, Clone)]
pub struct PageContext {
    pub page: PageSlug,
    /// Fired by whatever injects dynamic sections once it is done
    pub sections_ready: Signal,
}

impl PageContext {
    pub fn new(page: PageSlug) -> Self {
        Self {
            page,
            sections_ready: Signal::new(),
        }
    }

    /// For pages without dynamic sections
    pub fn ready(page: PageSlug) -> Self {
        Self {
            page,
            sections_ready: Signal::fired(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitReport {
    pub page: PageSlug,
    pub overrides: usize,
    pub outcome: ApplyOutcome,
    pub sections_moved: usize,
    pub is_admin: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreOutcome {
    /// The element shows its original content again
    Restored,
    /// The override is gone but the page must be reloaded to show the
    /// original content
    ReloadRequired,
}

pub struct PageRuntime {
    config: EngineConfig,
    document: SharedDocument,
    adapter: Arc<dyn PersistenceAdapter>,
    notifier: Box<dyn Notifier>,
    applier: Applier,
    store: OverrideStore,
    session: EditSession,
    overlay: SectionOrderOverlay,
    admin: AdminGate,
    page: Option<PageSlug>,
    overrides_applied: Signal,
}

impl PageRuntime {
    pub fn new(
        config: EngineConfig,
        document: SharedDocument,
        adapter: Arc<dyn PersistenceAdapter>,
        notifier: Box<dyn Notifier>,
    ) -> OverrideResult<Self> {
        let engine = SelectorEngine::new(&config)?;
        let overlay = SectionOrderOverlay::new(engine.clone());
        let applier = Applier::new(&config, engine);

        Ok(Self {
            config,
            document,
            adapter,
            notifier,
            applier,
            store: OverrideStore::new(),
            session: EditSession::new(),
            overlay,
            admin: AdminGate::new(),
            page: None,
            overrides_applied: Signal::new(),
        })
    }

    pub fn with_reorder_provider(mut self, provider: Box<dyn ReorderProvider>) -> Self {
        self.overlay = self.overlay.with_provider(provider);
        self
    }

    pub fn document(&self) -> SharedDocument {
        Rc::clone(&self.document)
    }

    pub fn engine(&self) -> &SelectorEngine {
        self.applier.engine()
    }

    pub fn store(&self) -> &OverrideStore {
        &self.store
    }

    pub fn session(&self) -> &EditSession {
        &self.session
    }

    pub fn overlay(&self) -> &SectionOrderOverlay {
        &self.overlay
    }

    pub fn admin_gate(&self) -> &AdminGate {
        &self.admin
    }

    /// Fires once, when the first application pass (with retries) ends
    pub fn overrides_applied(&self) -> Signal {
        self.overrides_applied.clone()
    }

    /// Bring the page up
    ///
    /// Overrides are loaded only after `sections_ready` fires. Cancelling
    /// before that leaves the page untouched and the runtime
    /// uninitialized. The completion signal fires even if some selectors
    /// never resolved.
    pub async fn init(&mut self, ctx: &PageContext, cancel: &CancellationToken) -> InitReport {
        let page = ctx.page.clone();

        tokio::select! {
            biased;
            _ = ctx.sections_ready.wait() => {}
            _ = cancel.cancelled() => {
                debug!(page = %page, "Cancelled while waiting for sections");
                return InitReport {
                    page,
                    overrides: 0,
                    outcome: ApplyOutcome {
                        cancelled: true,
                        ..ApplyOutcome::default()
                    },
                    sections_moved: 0,
                    is_admin: false,
                };
            }
        }

        self.page = Some(page.clone());
        let overrides = self.store.load(self.adapter.as_ref(), &page).await;

        let outcome = apply_until_resolved(
            &self.document,
            &self.store,
            &self.applier,
            &self.config.retry,
            cancel,
        )
        .await;

        if !self.overrides_applied.fire() {
            debug!(page = %page, "Overrides-applied signal already fired");
        }

        self.overlay.load(self.adapter.as_ref(), &page).await;
        let sections_moved = self.overlay.apply_order(&mut self.document.borrow_mut());

        let is_admin = self.check_admin().await;

        info!(
            page = %page,
            overrides,
            applied = outcome.applied.len(),
            unresolved = outcome.unresolved.len(),
            sections_moved,
            "Page initialized"
        );

        InitReport {
            page,
            overrides,
            outcome,
            sections_moved,
            is_admin,
        }
    }

    /// One more application pass, e.g. after new content was injected
    pub fn reapply(&mut self) -> PassReport {
        self.applier
            .apply_all(&mut self.document.borrow_mut(), &self.store)
    }

    /// Ask the backend for admin status and update the session
    pub async fn check_admin(&mut self) -> bool {
        let is_admin = self.admin.refresh(self.adapter.as_ref()).await;
        self.apply_authorization(is_admin);
        is_admin
    }

    /// Poll admin status until cancelled, deauthorizing on expiry
    pub async fn watch_admin(&mut self, cancel: &CancellationToken) {
        let interval = self.config.admin_poll_interval();
        let admin = self.admin.clone();
        let adapter = Arc::clone(&self.adapter);
        let mut changes = admin.subscribe();

        let poll = admin.poll(adapter.as_ref(), interval, cancel);
        let sync = async {
            while changes.changed().await.is_ok() {
                let is_admin = *changes.borrow_and_update();
                self.apply_authorization(is_admin);
            }
        };

        tokio::select! {
            _ = poll => {}
            _ = sync => {}
        }
    }

    fn apply_authorization(&mut self, is_admin: bool) {
        let mut doc = self.document.borrow_mut();
        self.session.set_authorized(&mut doc, is_admin);
        if !is_admin {
            self.overlay.deactivate(&mut doc);
        }
    }

    fn fail<T>(&self, err: OverrideError) -> OverrideResult<T> {
        self.notifier.notify(Notice::error(err.to_string()));
        Err(err)
    }

    pub fn toggle_edit_mode(&mut self) -> OverrideResult<bool> {
        let toggled = {
            let mut doc = self.document.borrow_mut();
            let toggled = self
                .session
                .toggle_edit_mode(&mut doc, self.applier.engine());

            match toggled {
                Ok(true) => {
                    if let Err(err) = self.overlay.activate(&mut doc) {
                        debug!(error = %err, "Section reordering unavailable");
                    }
                }
                Ok(false) => self.overlay.deactivate(&mut doc),
                Err(_) => {}
            }
            toggled
        };

        toggled.or_else(|err| self.fail(err.into()))
    }

    /// Make the element under `node` the active editor
    pub fn select(&mut self, node: NodeId) -> OverrideResult<NodeId> {
        let editor = {
            let doc = self.document.borrow();
            let engine = self.applier.engine();

            let Some(target) = engine.edit_target(&doc, node) else {
                let tag = doc.tag(node).unwrap_or("#text").to_string();
                drop(doc);
                return self.fail(OverrideError::NotEditable(tag));
            };
            let content_type = engine.element_type(&doc, target).unwrap_or(ContentType::Text);

            ActiveEditor {
                element: target,
                selector: engine.stable_selector(&doc, target).ok(),
                content_type,
                original_snapshot: snapshot::capture(
                    &doc,
                    target,
                    content_type,
                    &self.config.button_classes,
                ),
            }
        };

        let target = editor.element;
        match self.session.set_active_editor(editor) {
            Ok(()) => Ok(target),
            Err(err) => self.fail(err.into()),
        }
    }

    pub fn cancel_edit(&mut self) {
        self.session.clear_active_editor();
    }

    fn validated_editor(&mut self) -> OverrideResult<ActiveEditor> {
        let validated = self
            .session
            .validate(&self.document.borrow())
            .map(Clone::clone);

        match validated {
            Ok(editor) => Ok(editor),
            Err(SessionError::StaleEditor) => {
                self.notifier.notify(Notice::info(
                    "The selected element is no longer on the page; select it again",
                ));
                Err(SessionError::StaleEditor.into())
            }
            Err(err) => self.fail(err.into()),
        }
    }

    /// Save `edit` for the active editor
    ///
    /// The change is applied to the page right away and rolled back if
    /// the backend refuses it. The store only changes after the backend
    /// confirms.
    pub async fn save(&mut self, edit: ContentEdit) -> OverrideResult<OverrideRecord> {
        let Some(page) = self.page.clone() else {
            return self.fail(OverrideError::NotInitialized);
        };
        let editor = self.validated_editor()?;
        let element = editor.element;
        let content_type = editor.content_type;

        let (selector, existing) = {
            let doc = self.document.borrow();
            let selector = match self.applier.engine().stable_selector(&doc, element) {
                Ok(selector) => selector,
                Err(err) => {
                    drop(doc);
                    return self.fail(err.into());
                }
            };
            let existing = self
                .store
                .find_managed(&doc, element, self.applier.managed_attr())
                .or_else(|| self.store.get(&selector))
                .cloned();
            // A nav link is keyed by the href it had when first saved,
            // which is what the next page load renders
            let selector = match &existing {
                Some(record) if self.applier.engine().is_nav_scoped(&record.target_selector) => {
                    record.target_selector.clone()
                }
                _ => selector,
            };
            (selector, existing)
        };

        let original = existing
            .as_ref()
            .and_then(|record| record.original_content.clone())
            .unwrap_or(editor.original_snapshot);

        let payload = SavePayload {
            id: existing.as_ref().map(|record| record.id.clone()),
            target_page: page,
            target_selector: selector,
            content_type,
            text: edit.text,
            image: edit.image,
            is_button: content_type == ContentType::Link && edit.is_button,
            original_content: Some(original),
            override_type: OverrideType::Replace,
        };

        if let Err(err) = self.session.begin_save() {
            return self.fail(err.into());
        }

        let (rollback, managed_before) = {
            let mut doc = self.document.borrow_mut();
            let rollback =
                snapshot::capture(&doc, element, content_type, &self.config.button_classes);
            let managed_before = doc
                .attr(element, self.applier.managed_attr())
                .map(str::to_string);
            self.applier
                .apply_to(&mut doc, element, &payload.provisional_record());
            (rollback, managed_before)
        };

        match self.adapter.save_override(&payload).await {
            Ok(record) => {
                let previous = existing.map(|record| record.target_selector);
                self.store.upsert(record.clone(), previous.as_deref());
                {
                    // The edited element may no longer match the stored
                    // selector; it still has to carry the confirmed id
                    let mut doc = self.document.borrow_mut();
                    self.applier.apply_to(&mut doc, element, &record);
                    self.applier.apply_record(&mut doc, &record);
                }
                self.session.finish_save(true);

                info!(id = %record.id, selector = %record.target_selector, "Saved override");
                self.notifier.notify(Notice::success("Changes saved"));
                Ok(record)
            }
            Err(err) => {
                {
                    let mut doc = self.document.borrow_mut();
                    snapshot::restore(
                        &mut doc,
                        element,
                        content_type,
                        &rollback,
                        &self.config.button_classes,
                    );
                    match &managed_before {
                        Some(id) => doc.set_attr(element, self.applier.managed_attr(), id),
                        None => {
                            doc.remove_attr(element, self.applier.managed_attr());
                        }
                    }
                }
                self.session.finish_save(false);
                self.fail(err.into())
            }
        }
    }

    /// Delete the active editor's override and show the original content
    pub async fn restore(&mut self) -> OverrideResult<RestoreOutcome> {
        if self.page.is_none() {
            return self.fail(OverrideError::NotInitialized);
        }
        let editor = self.validated_editor()?;
        let element = editor.element;

        let record = {
            let doc = self.document.borrow();
            self.store
                .find_managed(&doc, element, self.applier.managed_attr())
                .cloned()
                .or_else(|| {
                    editor
                        .selector
                        .as_deref()
                        .and_then(|selector| self.store.get(selector))
                        .cloned()
                })
        };
        let Some(record) = record else {
            let what = editor
                .selector
                .unwrap_or_else(|| format!("node {}", element));
            return self.fail(OverrideError::NothingToRestore(what));
        };

        if let Err(err) = self.session.begin_save() {
            return self.fail(err.into());
        }

        if let Err(err) = self.adapter.delete_override(&record.id).await {
            self.session.finish_save(false);
            return self.fail(err.into());
        }

        self.store.remove(&record.id);
        let outcome = self.put_back_original(&record);
        self.session.finish_save(true);

        match outcome {
            RestoreOutcome::Restored => {
                self.notifier.notify(Notice::success("Original content restored"))
            }
            RestoreOutcome::ReloadRequired => self.notifier.notify(Notice::info(
                "Override removed; reload the page to see the original content",
            )),
        }
        info!(id = %record.id, ?outcome, "Restored override");
        Ok(outcome)
    }

    fn put_back_original(&mut self, record: &OverrideRecord) -> RestoreOutcome {
        let Some(original) = &record.original_content else {
            return RestoreOutcome::ReloadRequired;
        };

        let mut doc = self.document.borrow_mut();
        let targets = self.applier.targets(&doc, record);
        if targets.is_empty() {
            return RestoreOutcome::ReloadRequired;
        }

        let mut restored = true;
        for node in targets {
            restored &= snapshot::restore(
                &mut doc,
                node,
                record.content_type,
                original,
                &self.config.button_classes,
            );
            doc.remove_attr(node, self.applier.managed_attr());
        }

        if restored {
            RestoreOutcome::Restored
        } else {
            RestoreOutcome::ReloadRequired
        }
    }

    pub async fn upload_image(&mut self, file: ImageUpload) -> OverrideResult<UploadedImage> {
        match self.adapter.upload_image(&file).await {
            Ok(uploaded) => {
                info!(url = %uploaded.url, "Uploaded image");
                self.notifier.notify(Notice::success("Image uploaded"));
                Ok(uploaded)
            }
            Err(err) => self.fail(err.into()),
        }
    }

    /// Persist the section order currently in the document (after a drop)
    pub async fn on_sections_reordered(&mut self) -> OverrideResult<SectionOrder> {
        let Some(page) = self.page.clone() else {
            return self.fail(OverrideError::NotInitialized);
        };
        if !self.admin.is_admin() {
            return self.fail(SessionError::NotAuthorized.into());
        }

        let order = self.overlay.current_order(&self.document.borrow());
        match self
            .overlay
            .persist(self.adapter.as_ref(), &page, order)
            .await
        {
            Ok(saved) => {
                self.notifier.notify(Notice::success("Section order saved"));
                Ok(saved)
            }
            Err(err) => self.fail(err.into()),
        }
    }

    /// Move a section the way a drop would, then persist
    ///
    /// Refused without admin rights or outside edit mode. If the backend
    /// rejects the new order the previous one is put back.
    pub async fn move_section(
        &mut self,
        id: &str,
        before: Option<&str>,
    ) -> OverrideResult<SectionOrder> {
        if self.page.is_none() {
            return self.fail(OverrideError::NotInitialized);
        }
        if !self.admin.is_admin() {
            return self.fail(SessionError::NotAuthorized.into());
        }
        if !self.overlay.is_active() {
            return self.fail(SessionError::NotEditing.into());
        }

        let previous = self.overlay.current_order(&self.document.borrow());
        let moved = self
            .overlay
            .move_section(&mut self.document.borrow_mut(), id, before);
        if let Err(err) = moved {
            return self.fail(err);
        }

        let saved = self.on_sections_reordered().await;
        if saved.is_err() {
            self.overlay
                .replay(&mut self.document.borrow_mut(), &previous);
            debug!(sections = previous.len(), "Reverted unsaved section move");
        }
        saved
    }
}
