//! Stock ledger over the "Stock" sheet.
//!
//! The store has no transactions, so a decrement is a read, a check and
//! a write. [`StockLedger`] serializes that sequence per item name with
//! an in-process async lock. Two processes writing the same sheet can
//! still race; nothing here can prevent that.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tillbook_store::{lenient, Record, RowKey, Sheet, TabularStore};
use tokio::sync::OwnedMutexGuard;

use crate::repo::{cells, read_sheet, Keyed};
use crate::CommerceError;

/// One stock row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockEntry {
    pub item_name: String,
    #[serde(deserialize_with = "lenient::int")]
    pub quantity: i64,
    #[serde(default, deserialize_with = "cells::optional_timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl StockEntry {
    /// Classify the quantity against a low-stock threshold.
    pub fn status(&self, low_stock_threshold: i64) -> StockStatus {
        StockStatus::classify(self.quantity, low_stock_threshold)
    }
}

/// Availability bucket of a stock quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StockStatus {
    /// Nothing left.
    Out,
    /// Below the threshold.
    Low,
    Available,
}

impl StockStatus {
    /// `Out` at zero (or below), `Low` under the threshold, else `Available`.
    pub fn classify(quantity: i64, low_stock_threshold: i64) -> Self {
        if quantity <= 0 {
            StockStatus::Out
        } else if quantity < low_stock_threshold {
            StockStatus::Low
        } else {
            StockStatus::Available
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StockStatus::Out => "out",
            StockStatus::Low => "low",
            StockStatus::Available => "available",
        }
    }
}

impl fmt::Display for StockStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Current quantity of an item and where it lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockLevel {
    pub quantity: i64,
    pub key: RowKey,
    pub position: usize,
}

/// A stock row with its status, as listed to operators.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StockView {
    #[serde(flatten)]
    pub entry: Keyed<StockEntry>,
    pub status: StockStatus,
}

/// Per-item async locks.
#[derive(Clone, Default)]
struct ItemLocks {
    inner: Arc<Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>>,
}

impl ItemLocks {
    async fn acquire(&self, item_name: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            map.entry(item_name.to_string()).or_default().clone()
        };
        lock.lock_owned().await
    }
}

/// Reads and mutates stock quantities.
///
/// Clones share the same locks, so every writer of one process should
/// go through clones of a single ledger.
#[derive(Clone)]
pub struct StockLedger {
    store: Arc<dyn TabularStore>,
    locks: ItemLocks,
}

impl StockLedger {
    pub fn new(store: Arc<dyn TabularStore>) -> Self {
        Self {
            store,
            locks: ItemLocks::default(),
        }
    }

    /// All stock rows in sheet order.
    pub async fn list(&self) -> Result<Vec<Keyed<StockEntry>>, CommerceError> {
        read_sheet(self.store.as_ref(), Sheet::Stock).await
    }

    /// All stock rows with their status.
    pub async fn list_with_status(&self, low_stock_threshold: i64) -> Result<Vec<StockView>, CommerceError> {
        Ok(self
            .list()
            .await?
            .into_iter()
            .map(|entry| StockView {
                status: entry.value.status(low_stock_threshold),
                entry,
            })
            .collect())
    }

    /// Status of one item.
    pub async fn stock_status(
        &self,
        item_name: &str,
        low_stock_threshold: i64,
    ) -> Result<StockStatus, CommerceError> {
        let level = self.get_quantity(item_name).await?;
        Ok(StockStatus::classify(level.quantity, low_stock_threshold))
    }

    /// Current quantity of an item. The first matching row wins.
    pub async fn get_quantity(&self, item_name: &str) -> Result<StockLevel, CommerceError> {
        self.find(item_name).await.map(|(level, _)| level)
    }

    async fn find(&self, item_name: &str) -> Result<(StockLevel, Record), CommerceError> {
        let rows = self.store.read_all(Sheet::Stock).await?;
        for row in rows {
            let entry: StockEntry = row.deserialize()?;
            if entry.item_name == item_name {
                let level = StockLevel {
                    quantity: entry.quantity,
                    key: row.key,
                    position: row.position,
                };
                return Ok((level, row.record));
            }
        }
        Err(CommerceError::ItemNotFound(item_name.to_string()))
    }

    /// Add `delta` to an item's quantity and return the new quantity.
    ///
    /// A negative delta that would take the quantity below zero fails
    /// with [`CommerceError::InsufficientStock`] and writes nothing.
    #[tracing::instrument(skip(self, item_name), fields(item = %item_name))]
    pub async fn apply_delta(&self, item_name: &str, delta: i64) -> Result<i64, CommerceError> {
        let _guard = self.locks.acquire(item_name).await;

        let (level, record) = self.find(item_name).await?;
        let updated = level.quantity.checked_add(delta).ok_or(CommerceError::Overflow)?;
        if delta < 0 && updated < 0 {
            tracing::debug!(available = level.quantity, requested = -delta, "insufficient stock");
            return Err(CommerceError::InsufficientStock {
                item_name: item_name.to_string(),
                requested: -delta,
                available: level.quantity,
            });
        }

        self.write(level.key, record, item_name, updated).await?;
        tracing::info!(key = %level.key, before = level.quantity, after = updated, "stock adjusted");
        Ok(updated)
    }

    /// Append a zero-quantity row for a new item.
    ///
    /// Not idempotent: calling it twice leaves two rows for the item.
    pub async fn initialize(&self, item_name: &str) -> Result<RowKey, CommerceError> {
        self.add_entry(item_name, 0).await
    }

    /// Append a stock row with a starting quantity.
    #[tracing::instrument(skip(self, item_name), fields(item = %item_name))]
    pub async fn add_entry(&self, item_name: &str, quantity: i64) -> Result<RowKey, CommerceError> {
        if item_name.trim().is_empty() {
            return Err(CommerceError::validation("item_name is required"));
        }
        if quantity < 0 {
            return Err(CommerceError::validation("quantity must not be negative"));
        }
        let entry = StockEntry {
            item_name: item_name.to_string(),
            quantity,
            updated_at: Some(Utc::now()),
        };
        let key = self
            .store
            .append(Sheet::Stock, Record::from_serialize(&entry)?)
            .await?;
        tracing::info!(key = %key, quantity, "stock row added");
        Ok(key)
    }

    /// Overwrite the quantity of the row with `key`.
    ///
    /// The row must currently hold `item_name`.
    #[tracing::instrument(skip(self, item_name), fields(item = %item_name))]
    pub async fn set_quantity(
        &self,
        key: RowKey,
        item_name: &str,
        quantity: i64,
    ) -> Result<StockEntry, CommerceError> {
        if quantity < 0 {
            return Err(CommerceError::validation("quantity must not be negative"));
        }
        let _guard = self.locks.acquire(item_name).await;

        let row = self
            .store
            .read_all(Sheet::Stock)
            .await?
            .into_iter()
            .find(|r| r.key == key)
            .ok_or_else(|| CommerceError::ItemNotFound(format!("stock row {key}")))?;
        let current: StockEntry = row.deserialize()?;
        if current.item_name != item_name {
            return Err(CommerceError::validation(format!(
                "stock row {key} holds {}, not {item_name}",
                current.item_name
            )));
        }

        let entry = self.write(key, row.record, item_name, quantity).await?;
        tracing::info!(key = %key, before = current.quantity, after = quantity, "stock overwritten");
        Ok(entry)
    }

    async fn write(
        &self,
        key: RowKey,
        mut record: Record,
        item_name: &str,
        quantity: i64,
    ) -> Result<StockEntry, CommerceError> {
        let entry = StockEntry {
            item_name: item_name.to_string(),
            quantity,
            updated_at: Some(Utc::now()),
        };
        // Keep any extra columns the row carries.
        for (column, value) in Record::from_serialize(&entry)?.iter() {
            record.set(column, value.clone());
        }
        self.store.update(Sheet::Stock, key, record).await?;
        Ok(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tillbook_store::{record, MemoryStore};

    async fn ledger_with(rows: &[(&str, i64)]) -> StockLedger {
        let store = MemoryStore::new();
        for (name, qty) in rows {
            store
                .append(Sheet::Stock, record! { "item_name" => *name, "quantity" => *qty, "updated_at" => "" })
                .await
                .unwrap();
        }
        StockLedger::new(Arc::new(store))
    }

    #[test]
    fn test_stock_status_thresholds() {
        assert_eq!(StockStatus::classify(0, 10), StockStatus::Out);
        assert_eq!(StockStatus::classify(9, 10), StockStatus::Low);
        assert_eq!(StockStatus::classify(10, 10), StockStatus::Available);
        assert_eq!(StockStatus::classify(1, 1), StockStatus::Available);
    }

    #[tokio::test]
    async fn test_apply_delta_decrements() {
        let ledger = ledger_with(&[("Kopi", 5)]).await;
        assert_eq!(ledger.apply_delta("Kopi", -2).await.unwrap(), 3);
        assert_eq!(ledger.get_quantity("Kopi").await.unwrap().quantity, 3);
        assert_eq!(ledger.apply_delta("Kopi", 4).await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_apply_delta_rejects_overdraw() {
        let ledger = ledger_with(&[("Kopi", 1)]).await;
        let err = ledger.apply_delta("Kopi", -2).await.unwrap_err();
        match err {
            CommerceError::InsufficientStock {
                item_name,
                requested,
                available,
            } => {
                assert_eq!(item_name, "Kopi");
                assert_eq!(requested, 2);
                assert_eq!(available, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(ledger.get_quantity("Kopi").await.unwrap().quantity, 1);
    }

    #[tokio::test]
    async fn test_unknown_item() {
        let ledger = ledger_with(&[]).await;
        assert!(matches!(
            ledger.apply_delta("Roti", -1).await,
            Err(CommerceError::ItemNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_first_row_wins_on_duplicates() {
        let ledger = ledger_with(&[("Teh", 4), ("Teh", 50)]).await;
        let level = ledger.get_quantity("Teh").await.unwrap();
        assert_eq!(level.quantity, 4);
        assert_eq!(level.position, 0);
    }

    #[tokio::test]
    async fn test_update_keeps_extra_columns() {
        let store = Arc::new(MemoryStore::new());
        store
            .append(
                Sheet::Stock,
                record! { "item_name" => "Teh", "quantity" => "8", "shelf" => "B2" },
            )
            .await
            .unwrap();
        let ledger = StockLedger::new(store.clone());
        ledger.apply_delta("Teh", -3).await.unwrap();

        let rows = store.read_all(Sheet::Stock).await.unwrap();
        assert_eq!(rows[0].get("shelf").and_then(|v| v.as_text()), Some("B2"));
        assert_eq!(rows[0].get("quantity").and_then(|v| v.as_integer()), Some(5));
    }

    #[tokio::test]
    async fn test_set_quantity_checks_row_owner() {
        let ledger = ledger_with(&[("Kopi", 5), ("Teh", 2)]).await;
        let teh = ledger.get_quantity("Teh").await.unwrap();

        let entry = ledger.set_quantity(teh.key, "Teh", 20).await.unwrap();
        assert_eq!(entry.quantity, 20);
        assert_eq!(ledger.get_quantity("Teh").await.unwrap().quantity, 20);

        assert!(matches!(
            ledger.set_quantity(teh.key, "Kopi", 1).await,
            Err(CommerceError::Validation(_))
        ));
        assert!(matches!(
            ledger.set_quantity(RowKey(99), "Teh", 1).await,
            Err(CommerceError::ItemNotFound(_))
        ));
        assert!(matches!(
            ledger.set_quantity(teh.key, "Teh", -1).await,
            Err(CommerceError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_concurrent_decrements_never_go_negative() {
        let ledger = ledger_with(&[("Kopi", 5)]).await;
        let attempts = (0..12).map(|_| {
            let ledger = ledger.clone();
            async move { ledger.apply_delta("Kopi", -1).await }
        });
        let results = futures::future::join_all(attempts).await;

        let ok = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(ok, 5);
        assert!(results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| matches!(e, CommerceError::InsufficientStock { .. })));
        assert_eq!(ledger.get_quantity("Kopi").await.unwrap().quantity, 0);
    }

    #[tokio::test]
    async fn test_list_with_status() {
        let ledger = ledger_with(&[("Kopi", 0), ("Teh", 3), ("Roti", 30)]).await;
        let statuses: Vec<_> = ledger
            .list_with_status(10)
            .await
            .unwrap()
            .into_iter()
            .map(|v| v.status)
            .collect();
        assert_eq!(
            statuses,
            vec![StockStatus::Out, StockStatus::Low, StockStatus::Available]
        );
    }
}
