//! User-facing notifications
//!
//! Maps the outcome of a cart operation to the single message the storefront
//! shows. Computing a result and displaying it are kept apart: the state
//! manager returns `CartError`, this module turns it into text.

use std::fmt;

use crate::state::{CartError, ErrorKind};

/// Cart operation a notification is about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Add,
    Remove,
    UpdateAmount,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Add => write!(f, "add"),
            Self::Remove => write!(f, "remove"),
            Self::UpdateAmount => write!(f, "update"),
        }
    }
}

pub const OUT_OF_STOCK_MESSAGE: &str = "Quantidade solicitada fora de estoque";
pub const ADD_FAILED_MESSAGE: &str = "Erro na adição do produto";
pub const REMOVE_FAILED_MESSAGE: &str = "Erro na remoção do produto";
pub const UPDATE_FAILED_MESSAGE: &str = "Erro na alteração de quantidade do produto";

/// One message for one failed operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub operation: Operation,
    pub kind: ErrorKind,
    pub message: &'static str,
}

impl Notification {
    pub fn for_error(operation: Operation, error: &CartError) -> Self {
        let kind = error.kind();
        let message = match (kind, operation) {
            (ErrorKind::OutOfStock, _) => OUT_OF_STOCK_MESSAGE,
            (_, Operation::Add) => ADD_FAILED_MESSAGE,
            (_, Operation::Remove) => REMOVE_FAILED_MESSAGE,
            (_, Operation::UpdateAmount) => UPDATE_FAILED_MESSAGE,
        };
        Self {
            operation,
            kind,
            message,
        }
    }

    /// Notification for an operation result, None on success
    pub fn for_result<T>(operation: Operation, result: &Result<T, CartError>) -> Option<Self> {
        result.as_ref().err().map(|e| Self::for_error(operation, e))
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message)
    }
}
