//! Purchased supplies, recorded on the "Shopping List" sheet.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tillbook_store::{lenient, Record, Sheet, TabularStore};

use crate::repo::{read_sheet, Keyed};
use crate::{CommerceError, Money, ShoppingBatchId};

/// Expense category of a purchase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShoppingCategory {
    /// Labor.
    Karyawan,
    /// Ingredients.
    Bahan,
    /// Operational.
    Operasional,
}

impl ShoppingCategory {
    pub const ALL: [ShoppingCategory; 3] = [
        ShoppingCategory::Karyawan,
        ShoppingCategory::Bahan,
        ShoppingCategory::Operasional,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ShoppingCategory::Karyawan => "Karyawan",
            ShoppingCategory::Bahan => "Bahan",
            ShoppingCategory::Operasional => "Operasional",
        }
    }
}

impl fmt::Display for ShoppingCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShoppingCategory {
    type Err = CommerceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                CommerceError::validation(format!(
                    "invalid category {s:?}, expected one of Karyawan, Bahan, Operasional"
                ))
            })
    }
}

/// One purchase row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShoppingListEntry {
    pub shopping_id: ShoppingBatchId,
    pub shopping_date: DateTime<Utc>,
    #[serde(alias = "item_shopping")]
    pub item: String,
    pub category: ShoppingCategory,
    #[serde(deserialize_with = "lenient::int")]
    pub quantity: i64,
    #[serde(default)]
    pub unit: String,
    /// Amount paid for the whole line.
    pub price: Money,
}

/// A purchase to record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPurchase {
    pub item: String,
    pub category: ShoppingCategory,
    pub quantity: i64,
    pub unit: String,
    pub price: Money,
}

impl NewPurchase {
    fn validate(&self) -> Result<(), CommerceError> {
        if self.item.trim().is_empty() {
            return Err(CommerceError::validation("item is required"));
        }
        if self.unit.trim().is_empty() {
            return Err(CommerceError::validation("unit is required"));
        }
        if self.quantity <= 0 {
            return Err(CommerceError::validation("quantity must be greater than zero"));
        }
        if !self.price.is_positive() {
            return Err(CommerceError::validation("price must be greater than zero"));
        }
        Ok(())
    }
}

/// Shopping list access.
#[derive(Clone)]
pub struct ShoppingList {
    store: Arc<dyn TabularStore>,
    id_prefix: String,
}

impl ShoppingList {
    pub fn new(store: Arc<dyn TabularStore>, id_prefix: impl Into<String>) -> Self {
        Self {
            store,
            id_prefix: id_prefix.into(),
        }
    }

    /// All purchases in sheet order.
    pub async fn list(&self) -> Result<Vec<Keyed<ShoppingListEntry>>, CommerceError> {
        read_sheet(self.store.as_ref(), Sheet::ShoppingList).await
    }

    /// Record a purchase, joining `batch` when given or starting a new one.
    #[tracing::instrument(skip(self, purchase), fields(item = %purchase.item))]
    pub async fn record(
        &self,
        purchase: NewPurchase,
        batch: Option<ShoppingBatchId>,
    ) -> Result<ShoppingListEntry, CommerceError> {
        purchase.validate()?;
        let shopping_id = batch
            .filter(|b| !b.as_str().trim().is_empty())
            .unwrap_or_else(|| ShoppingBatchId::generate(&self.id_prefix));

        let entry = ShoppingListEntry {
            shopping_id,
            shopping_date: Utc::now(),
            item: purchase.item,
            category: purchase.category,
            quantity: purchase.quantity,
            unit: purchase.unit,
            price: purchase.price,
        };
        let key = self
            .store
            .append(Sheet::ShoppingList, Record::from_serialize(&entry)?)
            .await?;
        tracing::info!(key = %key, shopping_id = %entry.shopping_id, price = entry.price.amount(), "purchase recorded");
        Ok(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tillbook_store::MemoryStore;

    fn purchase(item: &str, category: ShoppingCategory, price: i64) -> NewPurchase {
        NewPurchase {
            item: item.to_string(),
            category,
            quantity: 2,
            unit: "kg".to_string(),
            price: Money::new(price),
        }
    }

    #[test]
    fn test_category_parsing() {
        assert_eq!("bahan".parse::<ShoppingCategory>().unwrap(), ShoppingCategory::Bahan);
        assert_eq!(
            "Operasional".parse::<ShoppingCategory>().unwrap(),
            ShoppingCategory::Operasional
        );
        assert!("Sewa".parse::<ShoppingCategory>().is_err());
    }

    #[tokio::test]
    async fn test_record_generates_batch_id() {
        let list = ShoppingList::new(Arc::new(MemoryStore::new()), "RTN");
        let entry = list
            .record(purchase("Gula", ShoppingCategory::Bahan, 30000), None)
            .await
            .unwrap();
        assert!(entry.shopping_id.as_str().starts_with("RTN-SHOP-"));

        let second = list
            .record(
                purchase("Susu", ShoppingCategory::Bahan, 45000),
                Some(entry.shopping_id.clone()),
            )
            .await
            .unwrap();
        assert_eq!(second.shopping_id, entry.shopping_id);

        let rows = list.list().await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].value, second);
    }

    #[tokio::test]
    async fn test_record_validates() {
        let list = ShoppingList::new(Arc::new(MemoryStore::new()), "RTN");
        let mut bad = purchase("Gula", ShoppingCategory::Bahan, 0);
        assert!(list.record(bad.clone(), None).await.is_err());
        bad.price = Money::new(1000);
        bad.unit = String::new();
        assert!(list.record(bad, None).await.is_err());
        assert!(list.list().await.unwrap().is_empty());
    }
}
