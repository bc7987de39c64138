//! # Folio DOM
//!
//! Owned, arena-backed document tree used as the live page model.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ html: markup text → nodes (logos lexer)     │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ document: arena of nodes                    │
//! │  - stable NodeId handles (identity)         │
//! │  - attach / detach / move                   │
//! │  - attributes, classes, text, markup        │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ selector: CSS subset → matching NodeIds     │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! Nodes are never freed while the document lives. Removing a node only
//! detaches it, so a `NodeId` held by an editor stays valid and
//! [`Document::is_attached`] tells whether it is still part of the page.

mod document;
mod error;
pub mod html;
mod node;
pub mod selector;

pub use document::{Descendants, Document};
pub use error::DomError;
pub use node::{ElementData, NodeData, NodeId};
pub use selector::{attr_equals, escape_attr_value, Selector};
