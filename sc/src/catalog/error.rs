//! Catalog error types

use std::time::Duration;
use thiserror::Error;

use crate::domain::ProductId;

/// Errors that can occur while talking to the catalog API
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Product {0} not found in catalog")]
    NotFound(ProductId),

    #[error("API error {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}
