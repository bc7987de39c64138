//! # Folio Overrides
//!
//! Persisted content overrides for static pages: admins edit a page in
//! place, each edit is stored as an override keyed by (page, selector),
//! and every later page view replays the overrides onto the markup.
//!
//! ## Flow
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌──────────────┐   ┌───────────────┐
//! │ selector     │ → │ store        │ → │ apply/retry  │ → │ section order │
//! │ stable ids   │   │ load(page)   │   │ bounded      │   │ overlay       │
//! └──────────────┘   └──────────────┘   └──────────────┘   └───────────────┘
//!                           ↑
//!                    ┌──────────────┐      ┌──────────────┐
//!                    │ adapter      │  ←   │ session      │
//!                    │ persistence  │      │ edit / save  │
//!                    └──────────────┘      └──────────────┘
//! ```
//!
//! [`runtime::PageRuntime`] ties the pieces together for one page view.

pub mod adapter;
pub mod admin;
pub mod apply;
pub mod config;
pub mod diagnostics;
pub mod errors;
pub mod ids;
pub mod model;
pub mod notify;
pub mod retry;
pub mod runtime;
pub mod section_order;
pub mod selector;
pub mod session;
pub mod signal;
pub mod snapshot;
pub mod store;

#[cfg(test)]
mod tests_scenarios;

pub use adapter::{AdapterResult, MemoryAdapter, MemorySnapshot, PersistenceAdapter};
pub use admin::AdminGate;
pub use apply::{Applier, PassReport};
pub use config::{EngineConfig, RetryPolicy};
pub use diagnostics::{lint_document, Diagnostic, DiagnosticLevel};
pub use errors::{AdapterError, OverrideError, OverrideResult, SelectorError, SessionError};
pub use ids::{IdGenerator, SequentialIds, UuidGenerator};
pub use model::{
    AdminStatus, ContentEdit, ContentType, ImageUpload, OriginalContent, OverrideId,
    OverrideRecord, OverrideType, SavePayload, SectionOrder, UploadedImage,
};
pub use notify::{Notice, NoticeLevel, Notifier, RecordingNotifier, TracingNotifier};
pub use retry::{apply_until_resolved, ApplyOutcome};
pub use runtime::{InitReport, PageContext, PageRuntime, RestoreOutcome, SharedDocument};
pub use section_order::{inject_sections, ReorderProvider, SectionOrderOverlay};
pub use selector::SelectorEngine;
pub use session::{ActiveEditor, EditSession, EditState, SessionEvent};
pub use signal::Signal;
pub use store::OverrideStore;
