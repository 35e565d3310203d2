//! Point-of-sale domain for Tillbook.
//!
//! This crate records sales against a non-transactional tabular store
//! and reports on them:
//!
//! - **Catalog**: items, prices and per-unit cost components
//! - **Stock**: quantities with a serialized check-then-decrement
//! - **Ledger**: one appended row per order line
//! - **Checkout**: cart, payment and sequential settlement with partial-failure reports
//! - **Analytics**: revenue, cost and profit over a date window
//! - **Shopping**: supply purchases
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tillbook_commerce::prelude::*;
//! use tillbook_store::MemoryStore;
//!
//! let store: Arc<dyn TabularStore> = Arc::new(MemoryStore::new());
//! let stock = StockLedger::new(store.clone());
//! let writer = OrderLineWriter::new(store.clone(), stock.clone());
//!
//! let kopi = Catalog::new(store.clone()).find("Kopi Susu").await?.value;
//! let available = stock.get_quantity("Kopi Susu").await?.quantity;
//!
//! let mut session = CheckoutSession::new("RTN");
//! session.add_line(&kopi, 2, available)?;
//! session.checkout("Sari", None)?;
//! session.select_payment(PaymentSelection::Cash { tendered: Money::new(50000) })?;
//!
//! let receipt = session.settle(&writer, "").await?;
//! println!("{} change {}", receipt.transaction_id, receipt.change());
//! ```

pub mod error;
pub mod ids;
pub mod money;

pub mod analytics;
pub mod catalog;
pub mod checkout;
pub mod config;
pub mod ledger;
pub mod repo;
pub mod shopping;
pub mod stock;

pub use error::CommerceError;
pub use ids::*;
pub use money::Money;
pub use repo::Keyed;

/// Shared handle to the backing store.
pub type SharedStore = std::sync::Arc<dyn tillbook_store::TabularStore>;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::error::CommerceError;
    pub use crate::ids::*;
    pub use crate::money::Money;
    pub use crate::repo::Keyed;
    pub use crate::SharedStore;
    pub use tillbook_store::TabularStore;

    // Catalog and stock
    pub use crate::catalog::{Catalog, CatalogItem, CreatedItem, ItemStatus};
    pub use crate::stock::{StockEntry, StockLedger, StockLevel, StockStatus, StockView};

    // Ledger
    pub use crate::ledger::{LineRequest, OrderLine, OrderLineWriter, Payment, PaymentMethod};

    // Checkout
    pub use crate::checkout::{
        AddOutcome, Cart, CartLine, CheckoutSession, CheckoutState, Compensation, FailedLine,
        PartialCheckout, PaymentSelection, Receipt, ReceiptLine,
    };

    // Analytics
    pub use crate::analytics::{
        build_report, group_orders, Analytics, CostBreakdown, DateWindow, LedgerSnapshot,
        LogicalOrder, PaymentFilter, Report, SupplyExpenses, TopItem,
    };

    // Shopping
    pub use crate::shopping::{NewPurchase, ShoppingCategory, ShoppingList, ShoppingListEntry};

    pub use crate::config::LedgerSettings;
}
