//! Per-call timeouts for store operations.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;

use crate::{Record, Row, RowKey, Sheet, StoreError, TabularStore};

/// Timeout budgets for store calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreTimeouts {
    /// Budget for a full-sheet read.
    pub read: Duration,
    /// Budget for a single-row append, update or delete.
    pub write: Duration,
}

impl StoreTimeouts {
    /// Create a new timeout configuration.
    pub fn new(read: Duration, write: Duration) -> Self {
        Self { read, write }
    }

    /// Use the same budget for every call.
    pub fn uniform(budget: Duration) -> Self {
        Self {
            read: budget,
            write: budget,
        }
    }
}

impl Default for StoreTimeouts {
    fn default() -> Self {
        Self {
            read: Duration::from_secs(10),
            write: Duration::from_secs(5),
        }
    }
}

/// Wraps a store and bounds every call by a timeout.
///
/// An elapsed timeout is reported as [`StoreError::Timeout`] and the
/// call is never re-issued: a write that timed out may still have been
/// applied, and replaying it could double-decrement stock.
#[derive(Debug)]
pub struct TimedStore<S> {
    inner: S,
    timeouts: StoreTimeouts,
}

impl<S: TabularStore> TimedStore<S> {
    /// Wrap a store.
    pub fn new(inner: S, timeouts: StoreTimeouts) -> Self {
        Self { inner, timeouts }
    }

    /// Get the wrapped store.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    async fn bounded<T>(
        &self,
        operation: &'static str,
        sheet: Sheet,
        budget: Duration,
        call: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, StoreError> {
        match tokio::time::timeout(budget, call).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(operation, sheet = %sheet, ?budget, "store call timed out");
                Err(StoreError::Timeout {
                    operation,
                    sheet,
                    after: budget,
                })
            }
        }
    }
}

#[async_trait]
impl<S: TabularStore> TabularStore for TimedStore<S> {
    async fn read_all(&self, sheet: Sheet) -> Result<Vec<Row>, StoreError> {
        self.bounded("read", sheet, self.timeouts.read, self.inner.read_all(sheet))
            .await
    }

    async fn append(&self, sheet: Sheet, record: Record) -> Result<RowKey, StoreError> {
        self.bounded("append", sheet, self.timeouts.write, self.inner.append(sheet, record))
            .await
    }

    async fn update(&self, sheet: Sheet, key: RowKey, record: Record) -> Result<(), StoreError> {
        self.bounded(
            "update",
            sheet,
            self.timeouts.write,
            self.inner.update(sheet, key, record),
        )
        .await
    }

    async fn delete(&self, sheet: Sheet, key: RowKey) -> Result<(), StoreError> {
        self.bounded("delete", sheet, self.timeouts.write, self.inner.delete(sheet, key))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Store whose appends never finish.
    struct Stalled {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TabularStore for Stalled {
        async fn read_all(&self, _sheet: Sheet) -> Result<Vec<Row>, StoreError> {
            Ok(Vec::new())
        }

        async fn append(&self, _sheet: Sheet, _record: Record) -> Result<RowKey, StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            std::future::pending().await
        }

        async fn update(&self, _: Sheet, _: RowKey, _: Record) -> Result<(), StoreError> {
            Ok(())
        }

        async fn delete(&self, _: Sheet, _: RowKey) -> Result<(), StoreError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_timeout_is_reported_not_retried() {
        let store = TimedStore::new(
            Stalled {
                calls: AtomicUsize::new(0),
            },
            StoreTimeouts::uniform(Duration::from_millis(20)),
        );

        let err = store.append(Sheet::Order, Record::new()).await.unwrap_err();
        assert!(matches!(err, StoreError::Timeout { operation: "append", .. }));
        assert!(err.is_transient());
        assert_eq!(store.inner().calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fast_calls_pass_through() {
        let store = TimedStore::new(MemoryStore::new(), StoreTimeouts::default());
        store.append(Sheet::Stock, Record::new().with("item_name", "Kopi")).await.unwrap();
        assert_eq!(store.read_all(Sheet::Stock).await.unwrap().len(), 1);
    }
}
