//! Store error types.

use std::time::Duration;

use thiserror::Error;

use crate::{RowKey, Sheet};

/// Errors that can occur when talking to the tabular store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The backing store could not be reached or refused the operation.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// A store call did not complete within its budget.
    #[error("Store {operation} on {sheet} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        sheet: Sheet,
        after: Duration,
    },

    /// No row with the given key exists in the sheet.
    #[error("Row {key} not found in {sheet}")]
    RowNotFound { sheet: Sheet, key: RowKey },

    /// A record did not have the shape expected by the caller.
    #[error("Schema error: {0}")]
    Schema(String),

    /// Failed to convert a row to or from a typed value.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Filesystem failure in a file-backed store.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Whether the error came from the transport rather than the data.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            StoreError::Unavailable(_) | StoreError::Timeout { .. } | StoreError::Io(_)
        )
    }
}
