//! Cart snapshot and line-items
//!
//! A `Cart` is immutable from the outside: every change produces a new
//! snapshot, which the state manager commits to storage before swapping it in.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::product::{Product, ProductId};

/// Reasons a persisted snapshot is rejected
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("Snapshot is not valid UTF-8: {0}")]
    Encoding(#[from] std::str::Utf8Error),

    #[error("Snapshot is not a list of cart items: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Product {0} has amount 0")]
    ZeroAmount(ProductId),

    #[error("Product {0} appears more than once")]
    DuplicateId(ProductId),
}

/// One product in the cart with the quantity the shopper wants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLineItem {
    pub id: ProductId,
    pub title: String,
    pub price: f64,
    pub image: String,
    pub amount: u32,
}

impl CartLineItem {
    /// New line-item for a product with amount 1
    pub fn from_product(product: &Product) -> Self {
        Self {
            id: product.id,
            title: product.title.clone(),
            price: product.price,
            image: product.image.clone(),
            amount: 1,
        }
    }

    /// `price * amount`
    pub fn subtotal(&self) -> f64 {
        self.price * f64::from(self.amount)
    }
}

/// Ordered list of line-items, unique by product id
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Cart {
    items: Vec<CartLineItem>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a cart from line-items, enforcing amount >= 1 and unique ids
    pub fn from_items(items: Vec<CartLineItem>) -> Result<Self, SnapshotError> {
        let mut seen = HashSet::with_capacity(items.len());
        for item in &items {
            if item.amount == 0 {
                return Err(SnapshotError::ZeroAmount(item.id));
            }
            if !seen.insert(item.id) {
                return Err(SnapshotError::DuplicateId(item.id));
            }
        }
        Ok(Self { items })
    }

    /// Parse and validate a persisted JSON snapshot
    pub fn from_snapshot(json: &str) -> Result<Self, SnapshotError> {
        let items: Vec<CartLineItem> = serde_json::from_str(json)?;
        Self::from_items(items)
    }

    /// Decode raw stored bytes, then parse them as `from_snapshot` does
    pub fn from_snapshot_bytes(bytes: &[u8]) -> Result<Self, SnapshotError> {
        Self::from_snapshot(std::str::from_utf8(bytes)?)
    }

    /// Serialize to the persisted JSON form
    pub fn to_snapshot(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn items(&self) -> &[CartLineItem] {
        &self.items
    }

    pub fn get(&self, id: ProductId) -> Option<&CartLineItem> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn contains(&self, id: ProductId) -> bool {
        self.get(id).is_some()
    }

    /// Quantity held for a product, 0 when absent
    pub fn amount_of(&self, id: ProductId) -> u32 {
        self.get(id).map(|item| item.amount).unwrap_or(0)
    }

    /// Number of distinct products
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Sum of all amounts
    pub fn total_units(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.amount)).sum()
    }

    /// Sum of all subtotals
    pub fn total(&self) -> f64 {
        self.items.iter().map(CartLineItem::subtotal).sum()
    }

    /// Snapshot with one more unit of `product`, appending it if absent
    pub fn with_added(&self, product: &Product) -> Self {
        let mut items = self.items.clone();
        match items.iter_mut().find(|item| item.id == product.id) {
            Some(item) => item.amount += 1,
            None => items.push(CartLineItem::from_product(product)),
        }
        Self { items }
    }

    /// Snapshot without `id`, or None if it is not in the cart
    pub fn without(&self, id: ProductId) -> Option<Self> {
        if !self.contains(id) {
            return None;
        }
        let items = self.items.iter().filter(|item| item.id != id).cloned().collect();
        Some(Self { items })
    }

    /// Snapshot with `id` set to `amount`, or None if it is not in the cart
    pub fn with_amount(&self, id: ProductId, amount: u32) -> Option<Self> {
        debug_assert!(amount > 0);
        let mut items = self.items.clone();
        let item = items.iter_mut().find(|item| item.id == id)?;
        item.amount = amount;
        Some(Self { items })
    }
}
