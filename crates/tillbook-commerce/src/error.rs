//! Commerce error types.

use thiserror::Error;
use tillbook_store::StoreError;

use crate::checkout::PartialCheckout;

/// Errors that can occur in point-of-sale operations.
#[derive(Error, Debug)]
pub enum CommerceError {
    /// Input failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Not enough stock to cover a decrement.
    #[error("Insufficient stock for {item_name}: requested {requested}, available {available}")]
    InsufficientStock {
        item_name: String,
        requested: i64,
        available: i64,
    },

    /// No stock row (or catalog entry) for the item.
    #[error("Item not found: {0}")]
    ItemNotFound(String),

    /// The item exists but is not active in the catalog.
    #[error("Item is not available for sale: {0}")]
    ItemNotPurchasable(String),

    /// The store failed or timed out.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// Stock was decremented but the ledger append failed afterwards.
    #[error(
        "Stock for {item_name} was decremented by {quantity} but the order line was not recorded: {reason}"
    )]
    OrphanedStockDecrement {
        item_name: String,
        quantity: i64,
        reason: String,
    },

    /// Some lines of a checkout were written and others were not.
    #[error(
        "Checkout {} partially failed: {} line(s) committed, {} not attempted",
        .0.transaction_id,
        .0.committed.len(),
        .0.not_attempted.len()
    )]
    PartialCheckoutFailure(Box<PartialCheckout>),

    /// Invalid checkout state transition.
    #[error("Invalid checkout transition from {from} to {to}")]
    InvalidCheckoutTransition { from: String, to: String },

    /// Arithmetic overflow.
    #[error("Arithmetic overflow in money calculation")]
    Overflow,

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl CommerceError {
    /// Short machine-readable code for the error kind.
    pub fn code(&self) -> &'static str {
        match self {
            CommerceError::Validation(_) => "validation",
            CommerceError::InsufficientStock { .. } => "insufficient_stock",
            CommerceError::ItemNotFound(_) => "item_not_found",
            CommerceError::ItemNotPurchasable(_) => "item_not_purchasable",
            CommerceError::StoreUnavailable(_) => "store_unavailable",
            CommerceError::OrphanedStockDecrement { .. } => "orphaned_stock_decrement",
            CommerceError::PartialCheckoutFailure(_) => "partial_checkout_failure",
            CommerceError::InvalidCheckoutTransition { .. } => "invalid_checkout_transition",
            CommerceError::Overflow => "overflow",
            CommerceError::Serialization(_) => "serialization",
        }
    }

    /// The item the error is about, when there is one.
    pub fn item_name(&self) -> Option<&str> {
        match self {
            CommerceError::InsufficientStock { item_name, .. }
            | CommerceError::OrphanedStockDecrement { item_name, .. } => Some(item_name),
            CommerceError::ItemNotFound(name) | CommerceError::ItemNotPurchasable(name) => {
                Some(name)
            }
            _ => None,
        }
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        CommerceError::Validation(message.into())
    }
}

impl From<StoreError> for CommerceError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::RowNotFound { .. } => CommerceError::ItemNotFound(e.to_string()),
            StoreError::Schema(_) | StoreError::Serialization(_) => {
                CommerceError::Serialization(e.to_string())
            }
            _ => CommerceError::StoreUnavailable(e.to_string()),
        }
    }
}

impl From<serde_json::Error> for CommerceError {
    fn from(e: serde_json::Error) -> Self {
        CommerceError::Serialization(e.to_string())
    }
}
