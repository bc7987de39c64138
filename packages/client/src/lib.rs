//! # Folio Client
//!
//! [`HttpAdapter`] implements the override engine's persistence contract
//! over the site's REST API.

mod http;

pub use http::HttpAdapter;
