//! CLI argument parsing for shopcart

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::domain::ProductId;

#[derive(Parser, Debug)]
#[command(name = "sc")]
#[command(author, version, about = "Storefront shopping cart", long_about = None)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show the cart with subtotals and total
    List,

    /// Add one unit of a product
    Add {
        /// Product ID
        #[arg(required = true)]
        product_id: ProductId,
    },

    /// Remove a product from the cart
    Remove {
        /// Product ID
        #[arg(required = true)]
        product_id: ProductId,
    },

    /// Set the quantity of a product already in the cart
    Update {
        /// Product ID
        #[arg(required = true)]
        product_id: ProductId,

        /// New quantity (zero or less is ignored)
        #[arg(required = true, allow_negative_numbers = true)]
        amount: i64,
    },
}
