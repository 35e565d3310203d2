//! Settings shared by the domain services.

use serde::{Deserialize, Serialize};

/// Defaults for id generation, stock status and reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerSettings {
    /// Prefix of generated transaction ids.
    pub transaction_prefix: String,
    /// Prefix of generated shopping batch ids (`<prefix>-SHOP-...`).
    pub shopping_prefix: String,
    /// Quantities below this are reported as low stock.
    pub low_stock_threshold: i64,
    /// Number of top sellers included in a report.
    pub top_n: usize,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            transaction_prefix: "RTN".to_string(),
            shopping_prefix: "RTN".to_string(),
            low_stock_threshold: 10,
            top_n: 5,
        }
    }
}
