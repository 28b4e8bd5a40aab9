//! Catalog records

use serde::{Deserialize, Serialize};

/// Numeric product identifier used by the catalog API
pub type ProductId = u64;

/// Product metadata returned by `GET /products/:id`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    pub price: f64,
    /// Image URL
    pub image: String,
}

/// Available stock returned by `GET /stock/:id`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockRecord {
    #[serde(default)]
    pub id: ProductId,
    pub amount: u32,
}
