//! Cart state with actor pattern
//!
//! CartManager owns the current cart snapshot and processes commands via
//! channels, committing each change to storage before broadcasting it.

mod manager;
mod messages;

pub use manager::{CartManager, load_cart};
pub use messages::{CartCommand, CartError, CartEvent, CartResponse, ErrorKind};
