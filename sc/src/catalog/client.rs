//! ProductCatalog trait definition

use async_trait::async_trait;

use super::CatalogError;
use crate::domain::{Product, ProductId, StockRecord};

/// Read-only access to the storefront's product catalog
///
/// Both lookups are idempotent and have no side effects on the cart.
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    /// Product metadata (`GET /products/:id`)
    async fn product(&self, id: ProductId) -> Result<Product, CatalogError>;

    /// Current stock level (`GET /stock/:id`)
    async fn stock(&self, id: ProductId) -> Result<StockRecord, CatalogError>;
}
