//! Product catalog client
//!
//! Remote, read-only lookups of product metadata and stock levels.

pub mod client;
mod error;
mod http;

pub use client::ProductCatalog;
pub use error::CatalogError;
pub use http::HttpCatalog;
