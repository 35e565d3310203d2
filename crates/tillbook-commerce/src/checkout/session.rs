//! Checkout session state machine.

use std::fmt;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::catalog::CatalogItem;
use crate::checkout::{
    AddOutcome, Cart, CartLine, Compensation, FailedLine, PartialCheckout, Receipt, ReceiptLine,
};
use crate::error::CommerceError;
use crate::ids::TransactionId;
use crate::ledger::{LineRequest, OrderLine, OrderLineWriter, Payment};
use crate::money::Money;

/// States of a checkout session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutState {
    /// No lines.
    Empty,
    /// At least one line, still editable.
    Populated,
    /// Cart locked, waiting for a payment selection and settlement.
    AwaitingPayment,
    /// Lines are being written.
    Settling,
    Completed,
    Failed,
}

impl CheckoutState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckoutState::Empty => "empty",
            CheckoutState::Populated => "populated",
            CheckoutState::AwaitingPayment => "awaiting_payment",
            CheckoutState::Settling => "settling",
            CheckoutState::Completed => "completed",
            CheckoutState::Failed => "failed",
        }
    }
}

impl fmt::Display for CheckoutState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payment chosen by the cashier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "lowercase")]
pub enum PaymentSelection {
    Cash { tendered: Money },
    Qris,
}

/// One register checkout, from the first line to the receipt.
///
/// Settlement writes lines one by one through an [`OrderLineWriter`].
/// There is no rollback: when a line fails after others were written
/// the session ends in [`CheckoutState::Failed`] and the error carries
/// what was written and what would undo it.
#[derive(Debug, Clone)]
pub struct CheckoutSession {
    state: CheckoutState,
    cart: Cart,
    cashier: Option<String>,
    customer: Option<String>,
    payment: Option<Payment>,
    transaction_prefix: String,
}

impl CheckoutSession {
    /// Create an empty session generating ids with `transaction_prefix`.
    pub fn new(transaction_prefix: impl Into<String>) -> Self {
        Self {
            state: CheckoutState::Empty,
            cart: Cart::new(),
            cashier: None,
            customer: None,
            payment: None,
            transaction_prefix: transaction_prefix.into(),
        }
    }

    pub fn state(&self) -> CheckoutState {
        self.state
    }

    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    pub fn payment(&self) -> Option<&Payment> {
        self.payment.as_ref()
    }

    pub fn total(&self) -> Result<Money, CommerceError> {
        self.cart.total()
    }

    fn transition(&mut self, to: CheckoutState) {
        tracing::debug!(from = %self.state, to = %to, "checkout transition");
        self.state = to;
    }

    fn invalid(&self, to: &str) -> CommerceError {
        CommerceError::InvalidCheckoutTransition {
            from: self.state.as_str().to_string(),
            to: to.to_string(),
        }
    }

    fn require_editable(&self, action: &str) -> Result<(), CommerceError> {
        match self.state {
            CheckoutState::Empty | CheckoutState::Populated => Ok(()),
            _ => Err(self.invalid(action)),
        }
    }

    /// Add an item. See [`Cart::add`] for the stock clamp.
    pub fn add_line(
        &mut self,
        item: &CatalogItem,
        quantity: i64,
        available: i64,
    ) -> Result<AddOutcome, CommerceError> {
        self.require_editable("add_line")?;
        let outcome = self.cart.add(item, quantity, available)?;
        if self.state == CheckoutState::Empty {
            self.transition(CheckoutState::Populated);
        }
        Ok(outcome)
    }

    /// Remove a line. Removing the last one empties the session.
    pub fn remove_line(&mut self, item_name: &str) -> Result<CartLine, CommerceError> {
        if self.state != CheckoutState::Populated {
            return Err(self.invalid("remove_line"));
        }
        let removed = self.cart.remove(item_name)?;
        if self.cart.is_empty() {
            self.transition(CheckoutState::Empty);
        }
        Ok(removed)
    }

    /// Change the quantity of a line.
    pub fn set_quantity(
        &mut self,
        item_name: &str,
        quantity: i64,
        available: i64,
    ) -> Result<(), CommerceError> {
        if self.state != CheckoutState::Populated {
            return Err(self.invalid("set_quantity"));
        }
        self.cart.set_quantity(item_name, quantity, available)
    }

    /// Lock the cart and move to payment.
    pub fn checkout(
        &mut self,
        cashier: impl Into<String>,
        customer: Option<String>,
    ) -> Result<(), CommerceError> {
        if self.state != CheckoutState::Populated || self.cart.is_empty() {
            return Err(self.invalid(CheckoutState::AwaitingPayment.as_str()));
        }
        let cashier = cashier.into();
        if cashier.trim().is_empty() {
            return Err(CommerceError::validation("cashier is required"));
        }
        self.cashier = Some(cashier);
        self.customer = customer.filter(|c| !c.trim().is_empty());
        self.transition(CheckoutState::AwaitingPayment);
        Ok(())
    }

    /// Go back to editing the cart. Clears any payment selection.
    pub fn back_to_cart(&mut self) -> Result<(), CommerceError> {
        if self.state != CheckoutState::AwaitingPayment {
            return Err(self.invalid(CheckoutState::Populated.as_str()));
        }
        self.payment = None;
        self.transition(CheckoutState::Populated);
        Ok(())
    }

    /// Choose how the customer pays.
    pub fn select_payment(&mut self, selection: PaymentSelection) -> Result<Payment, CommerceError> {
        if self.state != CheckoutState::AwaitingPayment {
            return Err(self.invalid("select_payment"));
        }
        let total = self.cart.total()?;
        let payment = match selection {
            PaymentSelection::Cash { tendered } => Payment::cash(tendered, total)?,
            PaymentSelection::Qris => Payment::qris(total),
        };
        self.payment = Some(payment);
        Ok(payment)
    }

    /// Write every line under one new transaction id.
    ///
    /// Lines are written in cart order and the first failure stops the
    /// rest. If nothing was written the line's own error is returned;
    /// otherwise [`CommerceError::PartialCheckoutFailure`].
    pub async fn settle(
        &mut self,
        writer: &OrderLineWriter,
        note: &str,
    ) -> Result<Receipt, CommerceError> {
        if self.state != CheckoutState::AwaitingPayment {
            return Err(self.invalid(CheckoutState::Settling.as_str()));
        }
        let (Some(payment), Some(cashier)) = (self.payment, self.cashier.clone()) else {
            return Err(CommerceError::validation("select a payment before settling"));
        };
        let total = self.cart.total()?;

        let transaction_id = TransactionId::generate(&self.transaction_prefix);
        self.transition(CheckoutState::Settling);
        tracing::info!(
            transaction_id = %transaction_id,
            lines = self.cart.len(),
            total = total.amount(),
            method = %payment.method,
            "settling checkout"
        );

        let lines = self.cart.lines().to_vec();
        let mut committed: Vec<OrderLine> = Vec::with_capacity(lines.len());
        for (index, line) in lines.iter().enumerate() {
            let request = LineRequest {
                transaction_id: transaction_id.clone(),
                item_name: line.item_name.clone(),
                quantity: line.quantity,
                unit_price: line.unit_price,
                cashier: cashier.clone(),
                customer: self.customer.clone(),
                payment,
                note: note.to_string(),
            };
            match writer.write_line(request).await {
                Ok(written) => committed.push(written),
                Err(e) => {
                    self.transition(CheckoutState::Failed);
                    return Err(self.failure(transaction_id, committed, line, &lines[index + 1..], e));
                }
            }
        }

        let receipt = Receipt {
            transaction_id: transaction_id.clone(),
            created_at: committed.first().map(|l| l.created_at).unwrap_or_else(Utc::now),
            cashier,
            customer: self.customer.clone(),
            lines: committed
                .iter()
                .zip(&lines)
                .map(|(written, line)| ReceiptLine {
                    item_name: written.item_name.clone(),
                    quantity: written.quantity,
                    unit_price: line.unit_price,
                    subtotal: written.line_total,
                })
                .collect(),
            total,
            payment,
            note: note.to_string(),
        };
        self.cart.clear();
        self.transition(CheckoutState::Completed);
        tracing::info!(transaction_id = %transaction_id, "checkout completed");
        Ok(receipt)
    }

    fn failure(
        &self,
        transaction_id: TransactionId,
        committed: Vec<OrderLine>,
        failed_line: &CartLine,
        rest: &[CartLine],
        error: CommerceError,
    ) -> CommerceError {
        tracing::warn!(
            transaction_id = %transaction_id,
            item = %failed_line.item_name,
            committed = committed.len(),
            not_attempted = rest.len(),
            error = %error,
            "checkout stopped"
        );
        if committed.is_empty() {
            return error;
        }

        let mut compensations: Vec<Compensation> = committed
            .iter()
            .map(|l| Compensation::RestoreStock {
                item_name: l.item_name.clone(),
                quantity: l.quantity,
            })
            .collect();
        if let CommerceError::OrphanedStockDecrement { item_name, quantity, .. } = &error {
            compensations.push(Compensation::RestoreStock {
                item_name: item_name.clone(),
                quantity: *quantity,
            });
        }

        CommerceError::PartialCheckoutFailure(Box::new(PartialCheckout {
            transaction_id,
            committed,
            failed: FailedLine {
                item_name: failed_line.item_name.clone(),
                quantity: failed_line.quantity,
                code: error.code().to_string(),
                reason: error.to_string(),
            },
            not_attempted: rest.to_vec(),
            compensations,
        }))
    }

    /// Start over after a completed or failed settlement.
    pub fn reset(&mut self) -> Result<(), CommerceError> {
        match self.state {
            CheckoutState::Completed | CheckoutState::Failed => {
                self.cart.clear();
                self.cashier = None;
                self.customer = None;
                self.payment = None;
                self.transition(CheckoutState::Empty);
                Ok(())
            }
            _ => Err(self.invalid(CheckoutState::Empty.as_str())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ItemStatus;
    use crate::stock::StockLedger;
    use std::sync::Arc;
    use tillbook_store::{record, MemoryStore, Sheet, TabularStore};

    fn item(name: &str, price: i64) -> CatalogItem {
        CatalogItem::new(name, Money::new(price)).with_status(ItemStatus::Active)
    }

    async fn writer_with(stock: &[(&str, i64)]) -> OrderLineWriter {
        let store: Arc<dyn TabularStore> = Arc::new(MemoryStore::new());
        for (name, qty) in stock {
            store
                .append(Sheet::Stock, record! { "item_name" => *name, "quantity" => *qty })
                .await
                .unwrap();
        }
        OrderLineWriter::new(store.clone(), StockLedger::new(store))
    }

    #[test]
    fn test_editing_states() {
        let mut session = CheckoutSession::new("RTN");
        assert_eq!(session.state(), CheckoutState::Empty);
        assert!(session.remove_line("Kopi").is_err());

        session.add_line(&item("Kopi", 10000), 1, 5).unwrap();
        assert_eq!(session.state(), CheckoutState::Populated);

        session.remove_line("Kopi").unwrap();
        assert_eq!(session.state(), CheckoutState::Empty);
    }

    #[test]
    fn test_checkout_requires_lines_and_cashier() {
        let mut session = CheckoutSession::new("RTN");
        assert!(matches!(
            session.checkout("Sari", None),
            Err(CommerceError::InvalidCheckoutTransition { .. })
        ));

        session.add_line(&item("Kopi", 10000), 1, 5).unwrap();
        assert!(matches!(
            session.checkout(" ", None),
            Err(CommerceError::Validation(_))
        ));
        session.checkout("Sari", Some(String::new())).unwrap();
        assert_eq!(session.state(), CheckoutState::AwaitingPayment);

        // Cart is locked while awaiting payment.
        assert!(session.add_line(&item("Teh", 5000), 1, 5).is_err());
        session.back_to_cart().unwrap();
        session.add_line(&item("Teh", 5000), 1, 5).unwrap();
    }

    #[test]
    fn test_payment_selection() {
        let mut session = CheckoutSession::new("RTN");
        session.add_line(&item("Kopi", 10000), 2, 5).unwrap();
        session.add_line(&item("Roti", 5000), 1, 5).unwrap();
        session.checkout("Sari", None).unwrap();

        assert!(session
            .select_payment(PaymentSelection::Cash {
                tendered: Money::new(20000)
            })
            .is_err());
        let cash = session
            .select_payment(PaymentSelection::Cash {
                tendered: Money::new(30000),
            })
            .unwrap();
        assert_eq!(cash.change, Money::new(5000));

        let qris = session.select_payment(PaymentSelection::Qris).unwrap();
        assert_eq!(qris.tendered, Money::new(25000));
        assert_eq!(qris.change, Money::zero());
    }

    #[tokio::test]
    async fn test_settle_without_payment_is_rejected() {
        let writer = writer_with(&[("Kopi", 5)]).await;
        let mut session = CheckoutSession::new("RTN");
        session.add_line(&item("Kopi", 10000), 1, 5).unwrap();
        assert!(matches!(
            session.settle(&writer, "").await,
            Err(CommerceError::InvalidCheckoutTransition { .. })
        ));
        session.checkout("Sari", None).unwrap();
        assert!(matches!(
            session.settle(&writer, "").await,
            Err(CommerceError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_settle_success_and_reset() {
        let writer = writer_with(&[("Kopi", 5)]).await;
        let mut session = CheckoutSession::new("TB");
        session.add_line(&item("Kopi", 10000), 2, 5).unwrap();
        session.checkout("Sari", Some("Budi".into())).unwrap();
        session.select_payment(PaymentSelection::Qris).unwrap();

        let receipt = session.settle(&writer, "no ice").await.unwrap();
        assert!(receipt.transaction_id.as_str().starts_with("TB-"));
        assert_eq!(receipt.total, Money::new(20000));
        assert_eq!(receipt.customer.as_deref(), Some("Budi"));
        assert_eq!(receipt.lines[0].unit_price, Money::new(10000));
        assert_eq!(session.state(), CheckoutState::Completed);
        assert!(session.cart().is_empty());

        assert!(session.add_line(&item("Kopi", 10000), 1, 5).is_err());
        session.reset().unwrap();
        assert_eq!(session.state(), CheckoutState::Empty);
    }

    #[tokio::test]
    async fn test_first_line_failure_returns_specific_error() {
        let writer = writer_with(&[("Kopi", 0)]).await;
        let mut session = CheckoutSession::new("RTN");
        // The cart's view of stock was stale.
        session.add_line(&item("Kopi", 10000), 1, 5).unwrap();
        session.checkout("Sari", None).unwrap();
        session.select_payment(PaymentSelection::Qris).unwrap();

        let err = session.settle(&writer, "").await.unwrap_err();
        assert!(matches!(err, CommerceError::InsufficientStock { .. }));
        assert_eq!(session.state(), CheckoutState::Failed);
        assert_eq!(session.cart().len(), 1);
    }
}
