//! Register cart.

use serde::{Deserialize, Serialize};

use crate::catalog::CatalogItem;
use crate::error::CommerceError;
use crate::money::Money;

/// Maximum quantity allowed per cart line.
pub const MAX_QUANTITY_PER_ITEM: i64 = 9999;

/// One item in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub item_name: String,
    /// Price per unit at the time the line was added.
    pub unit_price: Money,
    pub quantity: i64,
}

impl CartLine {
    /// Unit price times quantity.
    pub fn subtotal(&self) -> Result<Money, CommerceError> {
        self.unit_price
            .try_multiply(self.quantity)
            .ok_or(CommerceError::Overflow)
    }
}

/// Result of adding to the cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddOutcome {
    /// Quantity of the line after the add.
    pub quantity: i64,
    /// Whether the request was cut down to the available stock.
    pub clamped: bool,
}

/// Lines waiting to be checked out, in the order they were added.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Number of distinct lines.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Total units across all lines.
    pub fn item_count(&self) -> i64 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    /// Sum of line subtotals.
    pub fn total(&self) -> Result<Money, CommerceError> {
        let subtotals = self
            .lines
            .iter()
            .map(CartLine::subtotal)
            .collect::<Result<Vec<_>, _>>()?;
        Money::try_sum(subtotals).ok_or(CommerceError::Overflow)
    }

    /// Find a line by item name.
    pub fn line(&self, item_name: &str) -> Option<&CartLine> {
        self.lines.iter().find(|l| l.item_name == item_name)
    }

    /// Add `quantity` of an item, merging with an existing line.
    ///
    /// The resulting quantity is cut down to `available`. When nothing
    /// more can be added the call fails with
    /// [`CommerceError::InsufficientStock`]. `available` is a snapshot;
    /// settlement checks stock again.
    pub fn add(
        &mut self,
        item: &CatalogItem,
        quantity: i64,
        available: i64,
    ) -> Result<AddOutcome, CommerceError> {
        if !item.is_active() {
            return Err(CommerceError::ItemNotPurchasable(item.item_name.clone()));
        }
        if quantity <= 0 {
            return Err(CommerceError::validation("quantity must be greater than zero"));
        }

        let current = self.line(&item.item_name).map(|l| l.quantity).unwrap_or(0);
        let wanted = current.checked_add(quantity).ok_or(CommerceError::Overflow)?;
        if wanted > MAX_QUANTITY_PER_ITEM {
            return Err(CommerceError::validation(format!(
                "quantity {wanted} exceeds the maximum of {MAX_QUANTITY_PER_ITEM}"
            )));
        }
        let granted = wanted.min(available);
        if granted <= current {
            return Err(CommerceError::InsufficientStock {
                item_name: item.item_name.clone(),
                requested: wanted,
                available: available.max(0),
            });
        }

        match self.lines.iter_mut().find(|l| l.item_name == item.item_name) {
            Some(line) => line.quantity = granted,
            None => self.lines.push(CartLine {
                item_name: item.item_name.clone(),
                unit_price: item.sale_price,
                quantity: granted,
            }),
        }
        Ok(AddOutcome {
            quantity: granted,
            clamped: granted < wanted,
        })
    }

    /// Set the quantity of an existing line. It must be between 1 and
    /// `available`.
    pub fn set_quantity(
        &mut self,
        item_name: &str,
        quantity: i64,
        available: i64,
    ) -> Result<(), CommerceError> {
        if quantity < 1 {
            return Err(CommerceError::validation("quantity must be at least 1"));
        }
        if quantity > available {
            return Err(CommerceError::InsufficientStock {
                item_name: item_name.to_string(),
                requested: quantity,
                available: available.max(0),
            });
        }
        let line = self
            .lines
            .iter_mut()
            .find(|l| l.item_name == item_name)
            .ok_or_else(|| CommerceError::ItemNotFound(item_name.to_string()))?;
        line.quantity = quantity;
        Ok(())
    }

    /// Remove a line.
    pub fn remove(&mut self, item_name: &str) -> Result<CartLine, CommerceError> {
        let index = self
            .lines
            .iter()
            .position(|l| l.item_name == item_name)
            .ok_or_else(|| CommerceError::ItemNotFound(item_name.to_string()))?;
        Ok(self.lines.remove(index))
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ItemStatus;

    fn item(name: &str, price: i64) -> CatalogItem {
        CatalogItem::new(name, Money::new(price)).with_status(ItemStatus::Active)
    }

    #[test]
    fn test_add_merges_lines() {
        let mut cart = Cart::new();
        cart.add(&item("Kopi", 10000), 1, 10).unwrap();
        let outcome = cart.add(&item("Kopi", 10000), 2, 10).unwrap();
        assert_eq!(outcome, AddOutcome { quantity: 3, clamped: false });
        assert_eq!(cart.len(), 1);
        assert_eq!(cart.total().unwrap(), Money::new(30000));
    }

    #[test]
    fn test_add_clamps_to_available() {
        let mut cart = Cart::new();
        let outcome = cart.add(&item("Kopi", 10000), 5, 3).unwrap();
        assert_eq!(outcome, AddOutcome { quantity: 3, clamped: true });

        let err = cart.add(&item("Kopi", 10000), 1, 3).unwrap_err();
        assert!(matches!(
            err,
            CommerceError::InsufficientStock { requested: 4, available: 3, .. }
        ));
        assert_eq!(cart.item_count(), 3);
    }

    #[test]
    fn test_add_rejects_draft_and_out_of_stock() {
        let mut cart = Cart::new();
        let draft = CatalogItem::new("Roti", Money::new(8000));
        assert!(matches!(
            cart.add(&draft, 1, 10),
            Err(CommerceError::ItemNotPurchasable(_))
        ));
        assert!(matches!(
            cart.add(&item("Teh", 5000), 1, 0),
            Err(CommerceError::InsufficientStock { .. })
        ));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_set_quantity_bounds() {
        let mut cart = Cart::new();
        cart.add(&item("Kopi", 10000), 1, 5).unwrap();
        assert!(cart.set_quantity("Kopi", 0, 5).is_err());
        assert!(cart.set_quantity("Kopi", 6, 5).is_err());
        cart.set_quantity("Kopi", 5, 5).unwrap();
        assert_eq!(cart.line("Kopi").map(|l| l.quantity), Some(5));
        assert!(matches!(
            cart.set_quantity("Teh", 1, 5),
            Err(CommerceError::ItemNotFound(_))
        ));
    }

    #[test]
    fn test_remove() {
        let mut cart = Cart::new();
        cart.add(&item("Kopi", 10000), 1, 5).unwrap();
        cart.add(&item("Teh", 5000), 1, 5).unwrap();
        let removed = cart.remove("Kopi").unwrap();
        assert_eq!(removed.item_name, "Kopi");
        assert_eq!(cart.lines()[0].item_name, "Teh");
        assert!(cart.remove("Kopi").is_err());
    }
}
