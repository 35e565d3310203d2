//! The tabular store contract.

use std::sync::Arc;

use async_trait::async_trait;

use crate::{Record, Row, RowKey, Sheet, StoreError};

/// A row-oriented store of named sheets.
///
/// The contract is deliberately narrow: full-sheet reads, single-row
/// append, update and delete. There are no multi-row transactions, no
/// conditional writes and no secondary indexes; callers that need
/// read-check-write semantics must serialize access themselves.
#[async_trait]
pub trait TabularStore: Send + Sync {
    /// Read every row of a sheet, in position order.
    async fn read_all(&self, sheet: Sheet) -> Result<Vec<Row>, StoreError>;

    /// Append a row and return its newly assigned key.
    async fn append(&self, sheet: Sheet, record: Record) -> Result<RowKey, StoreError>;

    /// Replace the cells of an existing row.
    async fn update(&self, sheet: Sheet, key: RowKey, record: Record) -> Result<(), StoreError>;

    /// Delete a row. Positions of later rows shift down by one.
    async fn delete(&self, sheet: Sheet, key: RowKey) -> Result<(), StoreError>;
}

#[async_trait]
impl<T: TabularStore + ?Sized> TabularStore for Arc<T> {
    async fn read_all(&self, sheet: Sheet) -> Result<Vec<Row>, StoreError> {
        (**self).read_all(sheet).await
    }

    async fn append(&self, sheet: Sheet, record: Record) -> Result<RowKey, StoreError> {
        (**self).append(sheet, record).await
    }

    async fn update(&self, sheet: Sheet, key: RowKey, record: Record) -> Result<(), StoreError> {
        (**self).update(sheet, key, record).await
    }

    async fn delete(&self, sheet: Sheet, key: RowKey) -> Result<(), StoreError> {
        (**self).delete(sheet, key).await
    }
}
