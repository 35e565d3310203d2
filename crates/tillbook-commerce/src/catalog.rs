//! Catalog items and their cost components.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tillbook_store::{Record, Sheet, TabularStore};

use crate::repo::{read_sheet, Keyed};
use crate::stock::StockLedger;
use crate::{CommerceError, Money};

/// Catalog item status. Only active items can be sold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    /// Not yet on sale.
    #[default]
    Draft,
    /// On sale.
    Active,
}

impl ItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Draft => "draft",
            ItemStatus::Active => "active",
        }
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A sellable item with its per-unit cost components.
///
/// Older sheets use the Indonesian column names (`hpp`, `operasional`,
/// `worker`, `marketing`, `hpj`); those are accepted on read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
    /// Item name. Unique by convention only.
    pub item_name: String,
    /// Free-form category.
    #[serde(default)]
    pub category: String,
    /// Base cost of goods.
    #[serde(default, alias = "hpp")]
    pub base_cost: Money,
    /// Operational cost share.
    #[serde(default, alias = "operasional")]
    pub operational_cost: Money,
    /// Labor cost share.
    #[serde(default, alias = "worker")]
    pub labor_cost: Money,
    /// Marketing cost share.
    #[serde(default, alias = "marketing")]
    pub marketing_cost: Money,
    /// Selling price.
    #[serde(default, alias = "hpj")]
    pub sale_price: Money,
    /// Net sales per unit.
    #[serde(default)]
    pub net_sales: Money,
    #[serde(default)]
    pub status: ItemStatus,
}

impl CatalogItem {
    /// Create a draft item with no costs.
    pub fn new(item_name: impl Into<String>, sale_price: Money) -> Self {
        Self {
            item_name: item_name.into(),
            category: String::new(),
            base_cost: Money::zero(),
            operational_cost: Money::zero(),
            labor_cost: Money::zero(),
            marketing_cost: Money::zero(),
            sale_price,
            net_sales: Money::zero(),
            status: ItemStatus::Draft,
        }
    }

    /// Set the category.
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// Set the four cost components.
    pub fn with_costs(mut self, base: Money, operational: Money, labor: Money, marketing: Money) -> Self {
        self.base_cost = base;
        self.operational_cost = operational;
        self.labor_cost = labor;
        self.marketing_cost = marketing;
        self
    }

    /// Set the status.
    pub fn with_status(mut self, status: ItemStatus) -> Self {
        self.status = status;
        self
    }

    /// Check if the item can be sold.
    pub fn is_active(&self) -> bool {
        self.status == ItemStatus::Active
    }

    /// Sum of the four cost components per unit.
    pub fn unit_cost(&self) -> Result<Money, CommerceError> {
        Money::try_sum([
            self.base_cost,
            self.operational_cost,
            self.labor_cost,
            self.marketing_cost,
        ])
        .ok_or(CommerceError::Overflow)
    }

    fn validate(&self) -> Result<(), CommerceError> {
        if self.item_name.trim().is_empty() {
            return Err(CommerceError::validation("item_name is required"));
        }
        let amounts = [
            ("base_cost", self.base_cost),
            ("operational_cost", self.operational_cost),
            ("labor_cost", self.labor_cost),
            ("marketing_cost", self.marketing_cost),
            ("sale_price", self.sale_price),
        ];
        for (field, amount) in amounts {
            if amount.is_negative() {
                return Err(CommerceError::validation(format!("{field} must not be negative")));
            }
        }
        Ok(())
    }
}

/// Outcome of creating a catalog item.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreatedItem {
    pub item: Keyed<CatalogItem>,
    /// Set when the item was stored but its stock row was not.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stock_warning: Option<String>,
}

/// Catalog access over the "Master Item" sheet.
#[derive(Clone)]
pub struct Catalog {
    store: Arc<dyn TabularStore>,
}

impl Catalog {
    pub fn new(store: Arc<dyn TabularStore>) -> Self {
        Self { store }
    }

    /// All catalog items in sheet order.
    pub async fn list(&self) -> Result<Vec<Keyed<CatalogItem>>, CommerceError> {
        read_sheet(self.store.as_ref(), Sheet::MasterItem).await
    }

    /// Active items only.
    pub async fn list_active(&self) -> Result<Vec<Keyed<CatalogItem>>, CommerceError> {
        let mut items = self.list().await?;
        items.retain(|i| i.value.is_active());
        Ok(items)
    }

    /// Find an item by name. The first matching row wins.
    pub async fn find(&self, item_name: &str) -> Result<Keyed<CatalogItem>, CommerceError> {
        self.list()
            .await?
            .into_iter()
            .find(|i| i.value.item_name == item_name)
            .ok_or_else(|| CommerceError::ItemNotFound(item_name.to_string()))
    }

    /// Add an item and a zero-quantity stock row for it.
    ///
    /// When `net_sales` is zero it is filled in as the sale price minus
    /// the unit cost. A failure to create the stock row is logged and
    /// reported on the result; the item itself stays.
    #[tracing::instrument(skip(self, ledger, item), fields(item = %item.item_name))]
    pub async fn create(
        &self,
        ledger: &StockLedger,
        mut item: CatalogItem,
    ) -> Result<CreatedItem, CommerceError> {
        item.validate()?;
        let existing = self.list().await?;
        if existing.iter().any(|i| i.value.item_name == item.item_name) {
            return Err(CommerceError::validation(format!(
                "item {} already exists",
                item.item_name
            )));
        }
        if item.net_sales.is_zero() {
            item.net_sales = item
                .sale_price
                .try_subtract(item.unit_cost()?)
                .ok_or(CommerceError::Overflow)?;
        }

        let record = Record::from_serialize(&item)?;
        let key = self.store.append(Sheet::MasterItem, record).await?;
        tracing::info!(key = %key, status = %item.status, "catalog item created");

        let stock_warning = match ledger.initialize(&item.item_name).await {
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(error = %e, "stock row not created for new item");
                Some(format!("Item created, but stock row failed: {e}"))
            }
        };

        Ok(CreatedItem {
            item: Keyed {
                key,
                position: existing.len(),
                value: item,
            },
            stock_warning,
        })
    }
}
