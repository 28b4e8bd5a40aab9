//! ShopCart - storefront shopping cart
//!
//! CLI entry point: loads the persisted cart, applies one operation and
//! reports the outcome.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use tracing::{debug, info};

use shopcart::cli::{Cli, Command};
use shopcart::config::Config;
use shopcart::{Cart, CartError, CartManager, FileStorage, HttpCatalog, Notification, Operation};

fn parse_level(level: &str) -> tracing::Level {
    match level.to_uppercase().as_str() {
        "TRACE" => tracing::Level::TRACE,
        "DEBUG" => tracing::Level::DEBUG,
        "INFO" => tracing::Level::INFO,
        "WARN" | "WARNING" => tracing::Level::WARN,
        "ERROR" => tracing::Level::ERROR,
        _ => {
            eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", level);
            tracing::Level::INFO
        }
    }
}

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("shopcart")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Priority: CLI --log-level > config file > INFO
    let level = cli_log_level
        .or(config_log_level)
        .map(parse_level)
        .unwrap_or(tracing::Level::INFO);

    let log_file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("sc.log"))
        .context("Failed to open log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    setup_logging(cli.log_level.as_deref(), config.log_level.as_deref()).context("Failed to setup logging")?;
    info!(base_url = %config.catalog.base_url, storage = %config.storage.path.display(), "shopcart starting");

    // Waits while another sc process holds the storage directory
    let storage_path = config.storage.path.clone();
    let storage = tokio::task::spawn_blocking(move || FileStorage::open(storage_path))
        .await
        .context("Storage open task failed")?
        .context("Failed to open cart storage")?;
    let catalog = HttpCatalog::from_config(&config.catalog).context("Failed to create catalog client")?;
    let manager = CartManager::spawn(Arc::new(catalog), Box::new(storage), config.storage.key.clone())
        .context("Failed to load cart")?;

    debug!(command = ?cli.command, "main: dispatching command");
    let outcome = match cli.command {
        Command::List => {
            let cart = manager.cart().await?;
            print_cart(&cart);
            None
        }
        Command::Add { product_id } => {
            let result = manager.add_product(product_id).await;
            report(Operation::Add, result, format!("Added product {}", product_id))
        }
        Command::Remove { product_id } => {
            let result = manager.remove_product(product_id).await;
            report(Operation::Remove, result, format!("Removed product {}", product_id))
        }
        Command::Update { product_id, amount } => {
            let result = manager.update_product_amount(product_id, amount).await;
            let success = if amount <= 0 {
                format!("Ignored non-positive amount for product {}", product_id)
            } else {
                format!("Product {} amount set to {}", product_id, amount)
            };
            report(Operation::UpdateAmount, result, success)
        }
    };

    let _ = manager.shutdown().await;

    if let Some(notification) = outcome {
        eprintln!("{} {}", "✗".red(), notification.message.red());
        std::process::exit(1);
    }

    Ok(())
}

/// Print the success line, or hand back the notification for a failure
fn report(operation: Operation, result: Result<(), CartError>, success: String) -> Option<Notification> {
    match result {
        Ok(()) => {
            println!("{} {}", "✓".green(), success);
            None
        }
        Err(e) => {
            debug!(%operation, error = %e, "report: operation failed");
            Some(Notification::for_error(operation, &e))
        }
    }
}

fn print_cart(cart: &Cart) {
    if cart.is_empty() {
        println!("Cart is empty");
        return;
    }

    for item in cart.items() {
        println!(
            "{:>6}  {}  x{}  {:.2}  {}",
            item.id.to_string().yellow(),
            item.title,
            item.amount,
            item.price,
            format!("{:.2}", item.subtotal()).cyan()
        );
    }
    println!(
        "{} products, {} units, total {}",
        cart.len(),
        cart.total_units(),
        format!("{:.2}", cart.total()).green()
    );
}
