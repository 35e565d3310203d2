//! Receipts and partial-failure reports.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::checkout::CartLine;
use crate::error::CommerceError;
use crate::ids::TransactionId;
use crate::ledger::{OrderLine, Payment};
use crate::money::Money;

/// One line of a receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReceiptLine {
    pub item_name: String,
    pub quantity: i64,
    pub unit_price: Money,
    pub subtotal: Money,
}

/// A completed checkout, as data. Printing is up to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Receipt {
    pub transaction_id: TransactionId,
    pub created_at: DateTime<Utc>,
    pub cashier: String,
    pub customer: Option<String>,
    pub lines: Vec<ReceiptLine>,
    pub total: Money,
    pub payment: Payment,
    pub note: String,
}

impl Receipt {
    /// Rebuild a receipt from the ledger lines of one transaction.
    ///
    /// Returns `None` for an empty slice. Shared fields are taken from
    /// the first line.
    pub fn from_lines(lines: &[OrderLine]) -> Result<Option<Self>, CommerceError> {
        let Some(first) = lines.first() else {
            return Ok(None);
        };
        let total = Money::try_sum(lines.iter().map(|l| l.line_total)).ok_or(CommerceError::Overflow)?;
        Ok(Some(Self {
            transaction_id: first.transaction_id.clone(),
            created_at: first.created_at,
            cashier: first.cashier.clone(),
            customer: first.customer.clone(),
            lines: lines
                .iter()
                .map(|l| ReceiptLine {
                    item_name: l.item_name.clone(),
                    quantity: l.quantity,
                    unit_price: l.line_total.try_divide(l.quantity).unwrap_or_default(),
                    subtotal: l.line_total,
                })
                .collect(),
            total,
            payment: first.payment(),
            note: first.note.clone(),
        }))
    }

    /// Change owed to the customer.
    pub fn change(&self) -> Money {
        self.payment.change
    }
}

/// A line whose write failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedLine {
    pub item_name: String,
    pub quantity: i64,
    /// Error kind, see [`CommerceError::code`].
    pub code: String,
    pub reason: String,
}

/// A recorded step that would undo part of a partial checkout.
///
/// Compensations are reported to the operator and never applied
/// automatically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Compensation {
    /// Add `quantity` back to the item's stock.
    RestoreStock { item_name: String, quantity: i64 },
}

/// State of a checkout that stopped after some lines were written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartialCheckout {
    pub transaction_id: TransactionId,
    /// Lines in the ledger.
    pub committed: Vec<OrderLine>,
    pub failed: FailedLine,
    /// Lines after the failure, never sent.
    pub not_attempted: Vec<CartLine>,
    pub compensations: Vec<Compensation>,
}
