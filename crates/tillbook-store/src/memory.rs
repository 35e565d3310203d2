//! In-process tabular store.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::{Record, Row, RowKey, Sheet, StoreError, TabularStore};

/// A stored row: its key and cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRow {
    pub key: RowKey,
    pub record: Record,
}

/// Full contents of a store, suitable for persisting.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Next key to hand out.
    pub next_key: u64,
    /// Rows per sheet, in position order.
    #[serde(default)]
    pub sheets: BTreeMap<Sheet, Vec<StoredRow>>,
}

impl Snapshot {
    fn rows(&self, sheet: Sheet) -> &[StoredRow] {
        self.sheets.get(&sheet).map(Vec::as_slice).unwrap_or(&[])
    }

    fn locate(&self, sheet: Sheet, key: RowKey) -> Result<usize, StoreError> {
        self.rows(sheet)
            .iter()
            .position(|r| r.key == key)
            .ok_or(StoreError::RowNotFound { sheet, key })
    }

    pub(crate) fn read_all(&self, sheet: Sheet) -> Vec<Row> {
        self.rows(sheet)
            .iter()
            .enumerate()
            .map(|(position, r)| Row {
                key: r.key,
                position,
                record: r.record.clone(),
            })
            .collect()
    }

    pub(crate) fn append(&mut self, sheet: Sheet, record: Record) -> RowKey {
        self.next_key += 1;
        let key = RowKey(self.next_key);
        self.sheets
            .entry(sheet)
            .or_default()
            .push(StoredRow { key, record });
        key
    }

    pub(crate) fn update(
        &mut self,
        sheet: Sheet,
        key: RowKey,
        record: Record,
    ) -> Result<(), StoreError> {
        let index = self.locate(sheet, key)?;
        if let Some(rows) = self.sheets.get_mut(&sheet) {
            rows[index].record = record;
        }
        Ok(())
    }

    pub(crate) fn delete(&mut self, sheet: Sheet, key: RowKey) -> Result<(), StoreError> {
        let index = self.locate(sheet, key)?;
        if let Some(rows) = self.sheets.get_mut(&sheet) {
            rows.remove(index);
        }
        Ok(())
    }
}

/// Tabular store held in memory.
///
/// Each call takes the lock for its own duration only, so it exposes
/// the same interleavings a remote store would.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Snapshot>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store from previously captured contents.
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        Self {
            inner: RwLock::new(snapshot),
        }
    }

    /// Capture the current contents.
    pub async fn snapshot(&self) -> Snapshot {
        self.inner.read().await.clone()
    }

    /// Number of rows in a sheet.
    pub async fn len(&self, sheet: Sheet) -> usize {
        self.inner.read().await.rows(sheet).len()
    }
}

#[async_trait]
impl TabularStore for MemoryStore {
    async fn read_all(&self, sheet: Sheet) -> Result<Vec<Row>, StoreError> {
        Ok(self.inner.read().await.read_all(sheet))
    }

    async fn append(&self, sheet: Sheet, record: Record) -> Result<RowKey, StoreError> {
        let key = self.inner.write().await.append(sheet, record);
        tracing::trace!(sheet = %sheet, key = %key, "row appended");
        Ok(key)
    }

    async fn update(&self, sheet: Sheet, key: RowKey, record: Record) -> Result<(), StoreError> {
        self.inner.write().await.update(sheet, key, record)
    }

    async fn delete(&self, sheet: Sheet, key: RowKey) -> Result<(), StoreError> {
        self.inner.write().await.delete(sheet, key)
    }
}
