//! Integration tests for shopcart
//!
//! These exercise the cart manager against file-backed storage and a scripted
//! catalog, including restarts.

use std::collections::HashMap;
use std::fs;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use proptest::prelude::*;
use tempfile::TempDir;

use shopcart::state::load_cart;
use shopcart::storage::key_file_name;
use shopcart::{
    Cart, CartError, CartManager, CartStorage, CatalogError, FileStorage, Notification, Operation, Product,
    ProductCatalog, ProductId, StockRecord, StorageError,
};

const KEY: &str = "@RocketShoes:cart";

/// Catalog answering from a fixed table of (product, stock)
struct ScriptedCatalog {
    products: HashMap<ProductId, (Product, u32)>,
}

impl ScriptedCatalog {
    fn new(entries: &[(ProductId, f64, u32)]) -> Self {
        let products = entries
            .iter()
            .map(|&(id, price, stock)| {
                let product = Product {
                    id,
                    title: format!("Tênis {}", id),
                    price,
                    image: format!("https://rocketseat-cdn.s3-sa-east-1.amazonaws.com/{}.jpg", id),
                };
                (id, (product, stock))
            })
            .collect();
        Self { products }
    }
}

#[async_trait]
impl ProductCatalog for ScriptedCatalog {
    async fn product(&self, id: ProductId) -> Result<Product, CatalogError> {
        self.products
            .get(&id)
            .map(|(product, _)| product.clone())
            .ok_or(CatalogError::NotFound(id))
    }

    async fn stock(&self, id: ProductId) -> Result<StockRecord, CatalogError> {
        self.products
            .get(&id)
            .map(|(_, amount)| StockRecord { id, amount: *amount })
            .ok_or(CatalogError::NotFound(id))
    }
}

fn spawn(temp: &TempDir, catalog: ScriptedCatalog) -> CartManager {
    let storage = FileStorage::open(temp.path()).expect("Failed to open storage");
    CartManager::spawn(Arc::new(catalog), Box::new(storage), KEY).expect("Failed to load cart")
}

/// Read the snapshot file directly; the running manager holds the storage lock
fn reload(temp: &TempDir) -> Cart {
    let bytes = fs::read(temp.path().join(key_file_name(KEY))).expect("Snapshot file should exist");
    Cart::from_snapshot_bytes(&bytes).expect("Snapshot should load")
}

fn write_snapshot(temp: &TempDir, json: &str) {
    let storage = FileStorage::open(temp.path()).expect("Failed to open storage");
    storage.set(KEY, json).expect("Failed to write snapshot");
}

// =============================================================================
// Persistence
// =============================================================================

#[tokio::test]
async fn test_persisted_snapshot_matches_memory_after_each_mutation() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let manager = spawn(&temp, ScriptedCatalog::new(&[(1, 179.9, 3), (2, 139.9, 2), (3, 99.9, 1)]));

    manager.add_product(2).await.unwrap();
    assert_eq!(reload(&temp), manager.cart().await.unwrap());

    manager.add_product(1).await.unwrap();
    manager.add_product(3).await.unwrap();
    assert_eq!(reload(&temp), manager.cart().await.unwrap());

    manager.update_product_amount(1, 3).await.unwrap();
    assert_eq!(reload(&temp), manager.cart().await.unwrap());

    manager.remove_product(2).await.unwrap();
    let cart = manager.cart().await.unwrap();
    assert_eq!(reload(&temp), cart);

    let ids: Vec<_> = cart.items().iter().map(|item| item.id).collect();
    assert_eq!(ids, vec![1, 3]);
}

#[tokio::test]
async fn test_cart_survives_restart() {
    let temp = TempDir::new().expect("Failed to create temp dir");

    let manager = spawn(&temp, ScriptedCatalog::new(&[(5, 50.0, 10)]));
    manager.add_product(5).await.unwrap();
    manager.update_product_amount(5, 4).await.unwrap();
    let before = manager.cart().await.unwrap();
    manager.shutdown().await.unwrap();

    let restarted = spawn(&temp, ScriptedCatalog::new(&[(5, 50.0, 10)]));
    let after = restarted.cart().await.unwrap();
    assert_eq!(after, before);
    assert_eq!(after.total(), 200.0);
}

#[tokio::test]
async fn test_malformed_file_starts_empty_and_is_overwritten() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    write_snapshot(&temp, r#"[{"id": "one"}]"#);

    {
        let storage = FileStorage::open(temp.path()).unwrap();
        assert!(matches!(
            load_cart(&storage, KEY),
            Err(CartError::MalformedPersistence(_))
        ));
    }

    let manager = spawn(&temp, ScriptedCatalog::new(&[(1, 10.0, 1)]));
    assert!(manager.cart().await.unwrap().is_empty());

    manager.add_product(1).await.unwrap();
    assert_eq!(reload(&temp).amount_of(1), 1);
}

#[tokio::test]
async fn test_snapshot_written_by_storefront_loads() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    write_snapshot(
        &temp,
        r#"[{"id":1,"title":"Tênis de Caminhada Leve Confortável","price":179.9,"image":"https://example.com/1.jpg","amount":2}]"#,
    );

    let manager = spawn(&temp, ScriptedCatalog::new(&[(1, 179.9, 3)]));
    let cart = manager.cart().await.unwrap();
    assert_eq!(cart.amount_of(1), 2);
    assert_eq!(cart.items()[0].title, "Tênis de Caminhada Leve Confortável");
}

#[tokio::test]
async fn test_non_utf8_file_starts_empty() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    fs::write(temp.path().join(key_file_name(KEY)), [0xff, 0xfe, b'[', b']']).unwrap();

    let manager = spawn(&temp, ScriptedCatalog::new(&[(1, 10.0, 1)]));
    assert!(manager.cart().await.unwrap().is_empty());
}

// =============================================================================
// Sessions sharing a storage directory
// =============================================================================

#[tokio::test]
async fn test_storage_is_exclusive_while_manager_runs() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let manager = spawn(&temp, ScriptedCatalog::new(&[(1, 10.0, 5)]));

    assert!(matches!(FileStorage::try_open(temp.path()), Err(StorageError::Busy(_))));

    manager.shutdown().await.unwrap();
    assert!(FileStorage::try_open(temp.path()).is_ok());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_overlapping_sessions_do_not_lose_updates() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let first = spawn(&temp, ScriptedCatalog::new(&[(1, 10.0, 5)]));

    // Second session starts while the first still holds the directory
    let path = temp.path().to_path_buf();
    let waiting = tokio::task::spawn_blocking(move || FileStorage::open(path));
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!waiting.is_finished());

    first.add_product(1).await.unwrap();
    first.shutdown().await.unwrap();

    let storage = waiting.await.unwrap().expect("Failed to open storage");
    let second = CartManager::spawn(Arc::new(ScriptedCatalog::new(&[(1, 10.0, 5)])), Box::new(storage), KEY)
        .expect("Failed to load cart");
    assert_eq!(second.cart().await.unwrap().amount_of(1), 1);
    second.add_product(1).await.unwrap();
    second.shutdown().await.unwrap();

    assert_eq!(reload(&temp).amount_of(1), 2);
}

// =============================================================================
// Operations
// =============================================================================

#[tokio::test]
async fn test_failures_map_to_one_notification_each() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let manager = spawn(&temp, ScriptedCatalog::new(&[(1, 10.0, 1)]));

    manager.add_product(1).await.unwrap();

    let result = manager.add_product(1).await;
    let notification = Notification::for_result(Operation::Add, &result).unwrap();
    assert_eq!(notification.message, "Quantidade solicitada fora de estoque");

    let result = manager.add_product(999).await;
    let notification = Notification::for_result(Operation::Add, &result).unwrap();
    assert_eq!(notification.message, "Erro na adição do produto");

    let result = manager.remove_product(999).await;
    let notification = Notification::for_result(Operation::Remove, &result).unwrap();
    assert_eq!(notification.message, "Erro na remoção do produto");

    let result = manager.update_product_amount(999, 1).await;
    let notification = Notification::for_result(Operation::UpdateAmount, &result).unwrap();
    assert_eq!(notification.message, "Erro na alteração de quantidade do produto");
}

#[tokio::test]
async fn test_subscribers_see_only_committed_snapshots() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let manager = spawn(&temp, ScriptedCatalog::new(&[(1, 10.0, 1)]));
    let mut rx = manager.subscribe();

    manager.add_product(1).await.unwrap();
    assert!(manager.add_product(1).await.is_err());
    assert!(manager.remove_product(2).await.is_err());
    manager.remove_product(1).await.unwrap();

    let first = rx.recv().await.unwrap();
    assert_eq!(first.cart().amount_of(1), 1);
    let second = rx.recv().await.unwrap();
    assert!(second.cart().is_empty());
    assert!(rx.try_recv().is_err());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn prop_repeated_add_increments_amount(initial in 1u32..5, n in 0u32..6) {
        let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        let temp = TempDir::new().unwrap();

        let amount = rt.block_on(async {
            let manager = spawn(&temp, ScriptedCatalog::new(&[(9, 1.0, initial + n)]));
            manager.add_product(9).await.unwrap();
            manager.update_product_amount(9, i64::from(initial)).await.unwrap();

            for _ in 0..n {
                manager.add_product(9).await.unwrap();
            }
            let amount = manager.cart().await.unwrap().amount_of(9);

            // One past stock always fails and changes nothing
            assert!(manager.add_product(9).await.unwrap_err().is_out_of_stock());
            assert_eq!(manager.cart().await.unwrap().amount_of(9), amount);
            amount
        });

        prop_assert_eq!(amount, initial + n);
    }
}
