//! Row-oriented tabular store adapter for Tillbook.
//!
//! Models a spreadsheet-like backing store: named sheets of flat rows,
//! full-sheet reads, and single-row append / update / delete. Nothing
//! here is transactional; see [`TabularStore`] for the contract.
//!
//! # Example
//!
//! ```rust,ignore
//! use tillbook_store::{record, MemoryStore, Sheet, TabularStore};
//!
//! let store = MemoryStore::new();
//! let key = store
//!     .append(Sheet::Stock, record! { "item_name" => "Kopi Susu", "quantity" => 12i64 })
//!     .await?;
//!
//! for row in store.read_all(Sheet::Stock).await? {
//!     println!("{} at {}: {:?}", row.key, row.position, row.get("quantity"));
//! }
//! ```

mod error;
mod file;
mod memory;
mod store;
mod timeout;
mod types;

pub use error::StoreError;
pub use file::JsonFileStore;
pub use memory::{MemoryStore, Snapshot, StoredRow};
pub use store::TabularStore;
pub use timeout::{StoreTimeouts, TimedStore};
pub use types::{lenient, Record, Row, RowKey, Sheet, Value};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{record, Record, Row, RowKey, Sheet, StoreError, TabularStore, Value};
}

/// Build a [`Record`] from column/value pairs.
///
/// # Example
///
/// ```rust,ignore
/// use tillbook_store::record;
///
/// let row = record! { "item_name" => "Teh", "quantity" => 0i64 };
/// ```
#[macro_export]
macro_rules! record {
    () => {
        $crate::Record::new()
    };
    ($($column:expr => $value:expr),+ $(,)?) => {
        $crate::Record::new()$(.with($column, $value))+
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_macro() {
        let r = record! { "item_name" => "Teh", "quantity" => 3i64 };
        assert_eq!(r.columns(), &["item_name", "quantity"]);
        assert_eq!(record!().len(), 0);
    }
}
