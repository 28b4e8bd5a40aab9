//! CartManager - actor that owns the cart snapshot
//!
//! Commands are handled one at a time, remote reads included, so overlapping
//! calls for the same product cannot lose an update. A commit writes storage
//! first and only then swaps the in-memory snapshot and broadcasts the event.

use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::catalog::ProductCatalog;
use crate::domain::{Cart, ProductId};
use crate::storage::CartStorage;

use super::messages::{CartCommand, CartError, CartEvent, CartResponse};

/// Capacity of the command queue
const COMMAND_CAPACITY: usize = 64;

/// Capacity of the event broadcast channel
const EVENT_CAPACITY: usize = 64;

/// Read the persisted snapshot under `key`
///
/// A missing key is an empty cart. An unparseable or invalid snapshot is
/// `MalformedPersistence`.
pub fn load_cart(storage: &dyn CartStorage, key: &str) -> CartResponse<Cart> {
    debug!(%key, "load_cart: called");
    match storage.get(key)? {
        Some(bytes) => Ok(Cart::from_snapshot_bytes(&bytes)?),
        None => {
            debug!("load_cart: no snapshot, starting empty");
            Ok(Cart::new())
        }
    }
}

/// Handle to send commands to the cart actor
#[derive(Clone)]
pub struct CartManager {
    tx: mpsc::Sender<CartCommand>,
    event_tx: broadcast::Sender<CartEvent>,
}

impl CartManager {
    /// Load the persisted cart and spawn the actor
    ///
    /// A malformed snapshot is logged and replaced by an empty cart. A storage
    /// read failure is returned, so an intact snapshot is never overwritten by
    /// a cart that failed to load.
    pub fn spawn(
        catalog: Arc<dyn ProductCatalog>,
        storage: Box<dyn CartStorage>,
        key: impl Into<String>,
    ) -> CartResponse<Self> {
        let key = key.into();
        debug!(%key, "spawn: called");

        let cart = match load_cart(storage.as_ref(), &key) {
            Ok(cart) => cart,
            Err(CartError::MalformedPersistence(e)) => {
                warn!(error = %e, %key, "Discarding malformed cart snapshot");
                Cart::new()
            }
            Err(e) => return Err(e),
        };
        info!(items = cart.len(), units = cart.total_units(), "Cart loaded");

        let (tx, rx) = mpsc::channel(COMMAND_CAPACITY);
        let (event_tx, _) = broadcast::channel(EVENT_CAPACITY);

        let actor = CartActor {
            cart,
            catalog,
            storage,
            key,
            event_tx: event_tx.clone(),
        };
        tokio::spawn(actor.run(rx));

        Ok(Self { tx, event_tx })
    }

    /// Subscribe to committed mutations
    pub fn subscribe(&self) -> broadcast::Receiver<CartEvent> {
        self.event_tx.subscribe()
    }

    /// Current snapshot
    pub async fn cart(&self) -> CartResponse<Cart> {
        debug!("cart: called");
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(CartCommand::GetCart { reply: reply_tx })
            .await
            .map_err(|_| CartError::ChannelError)?;
        reply_rx.await.map_err(|_| CartError::ChannelError)
    }

    /// Add one unit of a product, checking stock first
    pub async fn add_product(&self, product_id: ProductId) -> CartResponse<()> {
        debug!(%product_id, "add_product: called");
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(CartCommand::AddProduct {
                product_id,
                reply: reply_tx,
            })
            .await
            .map_err(|_| CartError::ChannelError)?;
        reply_rx.await.map_err(|_| CartError::ChannelError)?
    }

    /// Remove a product and all its units
    pub async fn remove_product(&self, product_id: ProductId) -> CartResponse<()> {
        debug!(%product_id, "remove_product: called");
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(CartCommand::RemoveProduct {
                product_id,
                reply: reply_tx,
            })
            .await
            .map_err(|_| CartError::ChannelError)?;
        reply_rx.await.map_err(|_| CartError::ChannelError)?
    }

    /// Set the quantity of a product already in the cart
    ///
    /// Amounts of zero or less are ignored: nothing is fetched, written or broadcast.
    pub async fn update_product_amount(&self, product_id: ProductId, amount: i64) -> CartResponse<()> {
        debug!(%product_id, %amount, "update_product_amount: called");
        if amount <= 0 {
            debug!("update_product_amount: non-positive amount, ignoring");
            return Ok(());
        }
        // Anything past u32 can never be in stock
        let amount = u32::try_from(amount).unwrap_or(u32::MAX);

        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(CartCommand::UpdateAmount {
                product_id,
                amount,
                reply: reply_tx,
            })
            .await
            .map_err(|_| CartError::ChannelError)?;
        reply_rx.await.map_err(|_| CartError::ChannelError)?
    }

    /// Stop the actor and wait until it has dropped its storage
    ///
    /// Later calls return `ChannelError`.
    pub async fn shutdown(&self) -> CartResponse<()> {
        debug!("shutdown: called");
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(CartCommand::Shutdown { reply: reply_tx })
            .await
            .map_err(|_| CartError::ChannelError)?;
        reply_rx.await.map_err(|_| CartError::ChannelError)
    }
}

struct CartActor {
    cart: Cart,
    catalog: Arc<dyn ProductCatalog>,
    storage: Box<dyn CartStorage>,
    key: String,
    event_tx: broadcast::Sender<CartEvent>,
}

impl CartActor {
    async fn run(mut self, mut rx: mpsc::Receiver<CartCommand>) {
        debug!("CartManager actor started");
        let mut shutdown_reply = None;

        while let Some(cmd) = rx.recv().await {
            match cmd {
                CartCommand::GetCart { reply } => {
                    let _ = reply.send(self.cart.clone());
                }

                CartCommand::AddProduct { product_id, reply } => {
                    debug!(%product_id, "run: AddProduct command");
                    let result = self.add_product(product_id).await;
                    let _ = reply.send(result);
                }

                CartCommand::RemoveProduct { product_id, reply } => {
                    debug!(%product_id, "run: RemoveProduct command");
                    let result = self.remove_product(product_id);
                    let _ = reply.send(result);
                }

                CartCommand::UpdateAmount {
                    product_id,
                    amount,
                    reply,
                } => {
                    debug!(%product_id, %amount, "run: UpdateAmount command");
                    let result = self.update_amount(product_id, amount).await;
                    let _ = reply.send(result);
                }

                CartCommand::Shutdown { reply } => {
                    info!("CartManager shutting down");
                    shutdown_reply = Some(reply);
                    break;
                }
            }
        }

        // Release storage and its lock before acknowledging
        drop(rx);
        drop(self);
        debug!("CartManager actor stopped");
        if let Some(reply) = shutdown_reply {
            let _ = reply.send(());
        }
    }

    async fn add_product(&mut self, product_id: ProductId) -> CartResponse<()> {
        let (product, stock) = tokio::try_join!(self.catalog.product(product_id), self.catalog.stock(product_id))?;

        let held = self.cart.amount_of(product_id);
        if held >= stock.amount {
            debug!(%product_id, held, available = stock.amount, "add_product: out of stock");
            return Err(CartError::OutOfStock {
                product_id,
                requested: u64::from(held) + 1,
                available: stock.amount,
            });
        }

        let next = self.cart.with_added(&product);
        self.commit(next, |cart| CartEvent::ProductAdded { product_id, cart })
    }

    fn remove_product(&mut self, product_id: ProductId) -> CartResponse<()> {
        let next = self.cart.without(product_id).ok_or(CartError::NotFound(product_id))?;
        self.commit(next, |cart| CartEvent::ProductRemoved { product_id, cart })
    }

    async fn update_amount(&mut self, product_id: ProductId, amount: u32) -> CartResponse<()> {
        let stock = self.catalog.stock(product_id).await?;
        if amount > stock.amount {
            debug!(%product_id, amount, available = stock.amount, "update_amount: out of stock");
            return Err(CartError::OutOfStock {
                product_id,
                requested: u64::from(amount),
                available: stock.amount,
            });
        }

        let next = self
            .cart
            .with_amount(product_id, amount)
            .ok_or(CartError::NotFound(product_id))?;
        self.commit(next, |cart| CartEvent::AmountUpdated {
            product_id,
            amount,
            cart,
        })
    }

    /// Persist `next`, then make it current and broadcast
    fn commit(&mut self, next: Cart, event: impl FnOnce(Cart) -> CartEvent) -> CartResponse<()> {
        let json = next.to_snapshot().map_err(crate::storage::StorageError::from)?;
        self.storage.set(&self.key, &json)?;

        self.cart = next;
        info!(items = self.cart.len(), units = self.cart.total_units(), "Cart committed");

        let event = event(self.cart.clone());
        debug!(event_type = event.event_type(), product_id = event.product_id(), "commit: broadcasting");
        // No subscribers is fine
        let _ = self.event_tx.send(event);
        Ok(())
    }
}
