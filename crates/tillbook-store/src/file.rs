//! JSON-file backed tabular store.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};

use crate::{Record, Row, RowKey, Sheet, Snapshot, StoreError, TabularStore};

/// A tabular store persisted to a JSON file after every mutation.
///
/// A mutation is applied to a copy of the contents, written through a
/// temporary sibling and renamed into place. Only then does it become
/// visible to readers, so a failed write leaves both the file and the
/// in-memory rows as they were.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    rows: RwLock<Snapshot>,
    // One mutation at a time, so the file never lags a later write.
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    /// Open a store file, starting empty when it does not exist yet.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let snapshot = match tokio::fs::read(&path).await {
            Ok(bytes) if bytes.is_empty() => Snapshot::default(),
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Snapshot::default(),
            Err(e) => return Err(e.into()),
        };
        tracing::debug!(path = %path.display(), "opened store file");
        Ok(Self {
            path,
            rows: RwLock::new(snapshot),
            write_lock: Mutex::new(()),
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Capture the current contents.
    pub async fn snapshot(&self) -> Snapshot {
        self.rows.read().await.clone()
    }

    async fn persist(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(snapshot)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }

    async fn commit<T>(
        &self,
        change: impl FnOnce(&mut Snapshot) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut next = self.rows.read().await.clone();
        let out = change(&mut next)?;
        if let Err(e) = self.persist(&next).await {
            tracing::warn!(path = %self.path.display(), error = %e, "store file not written");
            return Err(e);
        }
        *self.rows.write().await = next;
        Ok(out)
    }
}

#[async_trait]
impl TabularStore for JsonFileStore {
    async fn read_all(&self, sheet: Sheet) -> Result<Vec<Row>, StoreError> {
        Ok(self.rows.read().await.read_all(sheet))
    }

    async fn append(&self, sheet: Sheet, record: Record) -> Result<RowKey, StoreError> {
        self.commit(|rows| Ok(rows.append(sheet, record))).await
    }

    async fn update(&self, sheet: Sheet, key: RowKey, record: Record) -> Result<(), StoreError> {
        self.commit(|rows| rows.update(sheet, key, record)).await
    }

    async fn delete(&self, sheet: Sheet, key: RowKey) -> Result<(), StoreError> {
        self.commit(|rows| rows.delete(sheet, key)).await
    }
}
