//! The order ledger: one appended row per order line.
//!
//! A logical order is every line sharing a transaction id. Lines are
//! written one at a time; see [`OrderLineWriter::write_line`] for what
//! happens when a write fails halfway.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tillbook_store::{lenient, Record, Sheet, TabularStore};

use crate::repo::{cells, read_sheet, Keyed};
use crate::stock::StockLedger;
use crate::{CommerceError, Money, TransactionId};

/// How an order was paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PaymentMethod {
    #[default]
    #[serde(alias = "cash", alias = "CASH")]
    Cash,
    #[serde(rename = "QRIS", alias = "qris", alias = "Qris")]
    Qris,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "Cash",
            PaymentMethod::Qris => "QRIS",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = CommerceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cash" => Ok(PaymentMethod::Cash),
            "qris" => Ok(PaymentMethod::Qris),
            other => Err(CommerceError::validation(format!(
                "unknown payment method: {other}"
            ))),
        }
    }
}

/// Settled payment of a transaction, copied onto each of its lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub method: PaymentMethod,
    pub tendered: Money,
    pub change: Money,
}

impl Payment {
    /// Cash payment; `tendered` must cover `total`.
    pub fn cash(tendered: Money, total: Money) -> Result<Self, CommerceError> {
        if tendered < total {
            return Err(CommerceError::validation(format!(
                "cash tendered {tendered} is less than the total {total}"
            )));
        }
        let change = tendered.try_subtract(total).ok_or(CommerceError::Overflow)?;
        Ok(Self {
            method: PaymentMethod::Cash,
            tendered,
            change,
        })
    }

    /// Exact cash: tendered equals the total, no change.
    pub fn exact_cash(total: Money) -> Self {
        Self {
            method: PaymentMethod::Cash,
            tendered: total,
            change: Money::zero(),
        }
    }

    /// QRIS always settles the exact total.
    pub fn qris(total: Money) -> Self {
        Self {
            method: PaymentMethod::Qris,
            tendered: total,
            change: Money::zero(),
        }
    }

    /// A payment settled for a whole transaction, stored on each of its
    /// lines as given. `change` must not exceed `tendered`.
    pub fn recorded(
        method: PaymentMethod,
        tendered: Money,
        change: Money,
    ) -> Result<Self, CommerceError> {
        if tendered.is_negative() || change.is_negative() {
            return Err(CommerceError::validation("payment amounts must not be negative"));
        }
        if change > tendered {
            return Err(CommerceError::validation(format!(
                "change {change} is more than the tendered {tendered}"
            )));
        }
        Ok(Self {
            method,
            tendered,
            change,
        })
    }
}

/// One row of the "Order" sheet.
///
/// Rows written by the older web register use its column names
/// (`order_id`, `quantity_item`, `total_amount`, ...); both are read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    #[serde(alias = "order_id")]
    pub transaction_id: TransactionId,
    pub created_at: DateTime<Utc>,
    pub item_name: String,
    #[serde(alias = "quantity_item", deserialize_with = "lenient::int")]
    pub quantity: i64,
    #[serde(alias = "total_amount")]
    pub line_total: Money,
    #[serde(alias = "cashier_name")]
    pub cashier: String,
    #[serde(
        default,
        alias = "customer_name",
        deserialize_with = "cells::optional_text"
    )]
    pub customer: Option<String>,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    #[serde(default, alias = "cash_paid")]
    pub tendered: Money,
    #[serde(default)]
    pub change: Money,
    #[serde(default, alias = "notes_order")]
    pub note: String,
}

impl OrderLine {
    /// The payment recorded on this line.
    pub fn payment(&self) -> Payment {
        Payment {
            method: self.payment_method,
            tendered: self.tendered,
            change: self.change,
        }
    }
}

/// Everything needed to write one order line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineRequest {
    pub transaction_id: TransactionId,
    pub item_name: String,
    pub quantity: i64,
    pub unit_price: Money,
    pub cashier: String,
    pub customer: Option<String>,
    pub payment: Payment,
    pub note: String,
}

impl LineRequest {
    fn validate(&self) -> Result<(), CommerceError> {
        if self.transaction_id.as_str().trim().is_empty() {
            return Err(CommerceError::validation("transaction_id is required"));
        }
        if self.item_name.trim().is_empty() {
            return Err(CommerceError::validation("item_name is required"));
        }
        if self.cashier.trim().is_empty() {
            return Err(CommerceError::validation("cashier is required"));
        }
        if self.quantity <= 0 {
            return Err(CommerceError::validation("quantity must be greater than zero"));
        }
        if self.unit_price.is_negative() {
            return Err(CommerceError::validation("unit_price must not be negative"));
        }
        if self.payment.tendered.is_negative() || self.payment.change.is_negative() {
            return Err(CommerceError::validation("payment amounts must not be negative"));
        }
        Ok(())
    }
}

/// Read the whole order ledger in sheet order.
pub async fn read_order_lines(
    store: &dyn TabularStore,
) -> Result<Vec<Keyed<OrderLine>>, CommerceError> {
    read_sheet(store, Sheet::Order).await
}

/// Writes order lines: stock first, then the ledger row.
#[derive(Clone)]
pub struct OrderLineWriter {
    store: Arc<dyn TabularStore>,
    stock: StockLedger,
}

impl OrderLineWriter {
    pub fn new(store: Arc<dyn TabularStore>, stock: StockLedger) -> Self {
        Self { store, stock }
    }

    /// The stock ledger this writer decrements.
    pub fn stock(&self) -> &StockLedger {
        &self.stock
    }

    /// All order lines.
    pub async fn list(&self) -> Result<Vec<Keyed<OrderLine>>, CommerceError> {
        read_order_lines(self.store.as_ref()).await
    }

    /// Validate, decrement stock, then append the line.
    ///
    /// If the stock decrement fails nothing is appended. If the append
    /// fails after the decrement succeeded, the stock stays decremented
    /// and [`CommerceError::OrphanedStockDecrement`] is returned; it is
    /// not undone here.
    #[tracing::instrument(
        skip(self, request),
        fields(
            transaction_id = %request.transaction_id,
            item = %request.item_name,
            quantity = request.quantity
        )
    )]
    pub async fn write_line(&self, request: LineRequest) -> Result<OrderLine, CommerceError> {
        request.validate()?;
        let line_total = request
            .unit_price
            .try_multiply(request.quantity)
            .ok_or(CommerceError::Overflow)?;

        let line = OrderLine {
            transaction_id: request.transaction_id,
            created_at: Utc::now(),
            item_name: request.item_name,
            quantity: request.quantity,
            line_total,
            cashier: request.cashier,
            customer: request.customer.filter(|c| !c.trim().is_empty()),
            payment_method: request.payment.method,
            tendered: request.payment.tendered,
            change: request.payment.change,
            note: request.note,
        };
        let record = Record::from_serialize(&line)?;

        self.stock.apply_delta(&line.item_name, -line.quantity).await?;

        let appended = self.store.append(Sheet::Order, record).await;
        match appended {
            Ok(key) => {
                tracing::info!(key = %key, line_total = line_total.amount(), "order line recorded");
                Ok(line)
            }
            Err(e) => {
                tracing::error!(error = %e, "stock decremented but order line not recorded");
                Err(CommerceError::OrphanedStockDecrement {
                    item_name: line.item_name,
                    quantity: line.quantity,
                    reason: e.to_string(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tillbook_store::{record, MemoryStore};

    async fn setup(stock: &[(&str, i64)]) -> (Arc<MemoryStore>, OrderLineWriter) {
        let store = Arc::new(MemoryStore::new());
        for (name, qty) in stock {
            store
                .append(Sheet::Stock, record! { "item_name" => *name, "quantity" => *qty })
                .await
                .unwrap();
        }
        let shared: Arc<dyn TabularStore> = store.clone();
        let writer = OrderLineWriter::new(shared.clone(), StockLedger::new(shared));
        (store, writer)
    }

    fn request(item: &str, quantity: i64, unit_price: i64) -> LineRequest {
        let total = Money::new(quantity * unit_price);
        LineRequest {
            transaction_id: TransactionId::new("RTN-TEST1"),
            item_name: item.to_string(),
            quantity,
            unit_price: Money::new(unit_price),
            cashier: "Sari".to_string(),
            customer: Some(String::new()),
            payment: Payment::exact_cash(total),
            note: String::new(),
        }
    }

    #[test]
    fn test_payment_rules() {
        let cash = Payment::cash(Money::new(30000), Money::new(25000)).unwrap();
        assert_eq!(cash.change, Money::new(5000));
        assert!(Payment::cash(Money::new(20000), Money::new(25000)).is_err());

        let qris = Payment::qris(Money::new(25000));
        assert_eq!(qris.tendered, Money::new(25000));
        assert_eq!(qris.change, Money::zero());
    }

    #[test]
    fn test_recorded_payment_keeps_transaction_amounts() {
        let paid = Payment::recorded(PaymentMethod::Cash, Money::new(30000), Money::new(5000))
            .unwrap();
        assert_eq!(paid.tendered, Money::new(30000));
        assert_eq!(paid.change, Money::new(5000));

        assert!(Payment::recorded(PaymentMethod::Cash, Money::new(5000), Money::new(6000)).is_err());
        assert!(Payment::recorded(PaymentMethod::Qris, Money::new(-1), Money::zero()).is_err());
    }

    #[test]
    fn test_payment_method_parsing() {
        assert_eq!("qris".parse::<PaymentMethod>().unwrap(), PaymentMethod::Qris);
        assert_eq!(" Cash ".parse::<PaymentMethod>().unwrap(), PaymentMethod::Cash);
        assert!("card".parse::<PaymentMethod>().is_err());
        assert_eq!(serde_json::to_string(&PaymentMethod::Qris).unwrap(), "\"QRIS\"");
    }

    #[test]
    fn test_reads_legacy_order_rows() {
        let record = record! {
            "order_id" => "RTN-LX1",
            "created_at" => "2024-05-01T10:00:00.000Z",
            "item_name" => "Kopi",
            "quantity_item" => "2",
            "total_amount" => "20000",
            "cashier_name" => "Sari",
            "customer_name" => "",
            "payment_method" => "QRIS",
            "cash_paid" => "20000",
            "change" => "0",
            "notes_order" => "less sugar",
        };
        let line: OrderLine = record.deserialize().unwrap();
        assert_eq!(line.transaction_id.as_str(), "RTN-LX1");
        assert_eq!(line.quantity, 2);
        assert_eq!(line.line_total, Money::new(20000));
        assert_eq!(line.customer, None);
        assert_eq!(line.payment_method, PaymentMethod::Qris);
        assert_eq!(line.note, "less sugar");
    }

    #[tokio::test]
    async fn test_write_line_decrements_and_appends() {
        let (store, writer) = setup(&[("Kopi", 5)]).await;

        let line = writer.write_line(request("Kopi", 2, 10000)).await.unwrap();
        assert_eq!(line.line_total, Money::new(20000));
        assert_eq!(line.customer, None);

        assert_eq!(writer.stock().get_quantity("Kopi").await.unwrap().quantity, 3);
        let lines = writer.list().await.unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].value, line);
        assert_eq!(store.len(Sheet::Order).await, 1);
    }

    #[tokio::test]
    async fn test_insufficient_stock_appends_nothing() {
        let (store, writer) = setup(&[("Kopi", 1)]).await;
        let err = writer.write_line(request("Kopi", 2, 10000)).await.unwrap_err();
        assert!(matches!(err, CommerceError::InsufficientStock { .. }));
        assert_eq!(store.len(Sheet::Order).await, 0);
    }

    #[tokio::test]
    async fn test_validation_happens_before_stock() {
        let (_, writer) = setup(&[("Kopi", 5)]).await;

        let mut bad = request("Kopi", 0, 10000);
        assert!(matches!(
            writer.write_line(bad.clone()).await,
            Err(CommerceError::Validation(_))
        ));
        bad.quantity = 1;
        bad.cashier = " ".to_string();
        assert!(matches!(
            writer.write_line(bad).await,
            Err(CommerceError::Validation(_))
        ));
        assert_eq!(writer.stock().get_quantity("Kopi").await.unwrap().quantity, 5);
    }

    #[tokio::test]
    async fn test_line_total_overflow() {
        let (_, writer) = setup(&[("Kopi", 5)]).await;
        let mut req = request("Kopi", 2, 1);
        req.unit_price = Money::new(i64::MAX);
        assert!(matches!(
            writer.write_line(req).await,
            Err(CommerceError::Overflow)
        ));
    }
}
