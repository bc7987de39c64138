//! Shared pieces of the folio crates: page slugs and the file system seam.

pub mod error;
pub mod filesystem;
pub mod page;

pub use error::*;
pub use filesystem::*;
pub use page::*;
