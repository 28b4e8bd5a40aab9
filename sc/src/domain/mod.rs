//! Domain types for ShopCart
//!
//! Product and stock records as served by the catalog API, and the cart
//! snapshot that is persisted locally.

mod cart;
mod product;

pub use cart::{Cart, CartLineItem, SnapshotError};
pub use product::{Product, ProductId, StockRecord};
