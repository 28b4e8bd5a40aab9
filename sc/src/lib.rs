//! ShopCart - storefront shopping-cart state
//!
//! Keeps the list of products a shopper intends to buy, validates quantities
//! against the backend's stock endpoint and persists every committed change to
//! a local key-value store.
//!
//! # Architecture
//!
//! ```text
//!  consumers ──► CartManager (handle, Clone)
//!                    │ mpsc
//!                    ▼
//!               actor task ──► ProductCatalog  (GET /products/:id, GET /stock/:id)
//!                    │    └──► CartStorage     ("@RocketShoes:cart" → JSON)
//!                    ▼
//!               broadcast<CartEvent>
//! ```
//!
//! # Example
//!
//! ```ignore
//! use shopcart::{CartManager, FileStorage, HttpCatalog};
//!
//! let catalog = HttpCatalog::new("http://localhost:3333", Duration::from_secs(10))?;
//! let storage = FileStorage::open(".shopcart")?;
//! let cart = CartManager::spawn(Arc::new(catalog), Box::new(storage), "@RocketShoes:cart")?;
//!
//! cart.add_product(42).await?;
//! cart.update_product_amount(42, 3).await?;
//! println!("total: {:.2}", cart.cart().await?.total());
//! ```

pub mod catalog;
pub mod cli;
pub mod config;
pub mod domain;
pub mod notify;
pub mod state;
pub mod storage;

pub use catalog::{CatalogError, HttpCatalog, ProductCatalog};
pub use config::Config;
pub use domain::{Cart, CartLineItem, Product, ProductId, StockRecord};
pub use notify::{Notification, Operation};
pub use state::{CartError, CartEvent, CartManager, CartResponse, ErrorKind};
pub use storage::{CartStorage, FileStorage, MemoryStorage, StorageError};

/// Storage key the storefront has always used for the cart snapshot
pub const DEFAULT_STORAGE_KEY: &str = "@RocketShoes:cart";
