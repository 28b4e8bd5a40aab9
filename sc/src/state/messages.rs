//! Cart manager messages
//!
//! Commands and responses for the actor pattern.

use thiserror::Error;
use tokio::sync::oneshot;

use crate::catalog::CatalogError;
use crate::domain::{Cart, ProductId, SnapshotError};
use crate::storage::StorageError;

/// Errors from cart operations
#[derive(Debug, Error)]
pub enum CartError {
    #[error("Product {product_id}: requested {requested}, only {available} in stock")]
    OutOfStock {
        product_id: ProductId,
        requested: u64,
        available: u32,
    },

    #[error("Product {0} is not in the cart")]
    NotFound(ProductId),

    #[error("Catalog request failed: {0}")]
    Transport(#[from] CatalogError),

    #[error("Persisted cart is malformed: {0}")]
    MalformedPersistence(#[from] SnapshotError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Channel error")]
    ChannelError,
}

/// Failure category, the unit user-facing messages are keyed on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    OutOfStock,
    NotFound,
    Transport,
    MalformedPersistence,
    Storage,
    Internal,
}

impl CartError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CartError::OutOfStock { .. } => ErrorKind::OutOfStock,
            CartError::NotFound(_) => ErrorKind::NotFound,
            CartError::Transport(_) => ErrorKind::Transport,
            CartError::MalformedPersistence(_) => ErrorKind::MalformedPersistence,
            CartError::Storage(_) => ErrorKind::Storage,
            CartError::ChannelError => ErrorKind::Internal,
        }
    }

    pub fn is_out_of_stock(&self) -> bool {
        self.kind() == ErrorKind::OutOfStock
    }
}

/// Response from cart operations
pub type CartResponse<T> = Result<T, CartError>;

/// Commands sent to the CartManager actor
#[derive(Debug)]
pub enum CartCommand {
    GetCart {
        reply: oneshot::Sender<Cart>,
    },
    AddProduct {
        product_id: ProductId,
        reply: oneshot::Sender<CartResponse<()>>,
    },
    RemoveProduct {
        product_id: ProductId,
        reply: oneshot::Sender<CartResponse<()>>,
    },
    UpdateAmount {
        product_id: ProductId,
        amount: u32,
        reply: oneshot::Sender<CartResponse<()>>,
    },
    /// Replies once the actor has released its storage
    Shutdown { reply: oneshot::Sender<()> },
}

/// Broadcast after every committed mutation, carrying the new snapshot
#[derive(Debug, Clone)]
pub enum CartEvent {
    ProductAdded { product_id: ProductId, cart: Cart },
    ProductRemoved { product_id: ProductId, cart: Cart },
    AmountUpdated { product_id: ProductId, amount: u32, cart: Cart },
}

impl CartEvent {
    pub fn product_id(&self) -> ProductId {
        match self {
            CartEvent::ProductAdded { product_id, .. }
            | CartEvent::ProductRemoved { product_id, .. }
            | CartEvent::AmountUpdated { product_id, .. } => *product_id,
        }
    }

    /// Snapshot after the mutation
    pub fn cart(&self) -> &Cart {
        match self {
            CartEvent::ProductAdded { cart, .. }
            | CartEvent::ProductRemoved { cart, .. }
            | CartEvent::AmountUpdated { cart, .. } => cart,
        }
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            CartEvent::ProductAdded { .. } => "ProductAdded",
            CartEvent::ProductRemoved { .. } => "ProductRemoved",
            CartEvent::AmountUpdated { .. } => "AmountUpdated",
        }
    }
}
