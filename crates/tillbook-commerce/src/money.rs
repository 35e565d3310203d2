//! Money type for representing monetary values.
//!
//! Amounts are whole units of the store currency (Rupiah has no minor
//! unit in practice). Arithmetic is checked: overflow is an error, never
//! a silent wrap.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use tillbook_store::lenient;

/// A monetary amount in the store currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Default)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Create a new Money value.
    pub const fn new(amount: i64) -> Self {
        Self(amount)
    }

    /// Zero.
    pub const fn zero() -> Self {
        Self(0)
    }

    /// The raw amount.
    pub const fn amount(&self) -> i64 {
        self.0
    }

    /// Check if this is zero.
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Check if this is positive.
    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Check if this is negative.
    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Add another amount, `None` on overflow.
    pub fn try_add(&self, other: Money) -> Option<Money> {
        self.0.checked_add(other.0).map(Money)
    }

    /// Subtract another amount, `None` on overflow.
    pub fn try_subtract(&self, other: Money) -> Option<Money> {
        self.0.checked_sub(other.0).map(Money)
    }

    /// Multiply by a quantity, `None` on overflow.
    pub fn try_multiply(&self, factor: i64) -> Option<Money> {
        self.0.checked_mul(factor).map(Money)
    }

    /// Integer division, `None` when dividing by zero.
    pub fn try_divide(&self, divisor: i64) -> Option<Money> {
        self.0.checked_div(divisor).map(Money)
    }

    /// Sum amounts, `None` on overflow.
    pub fn try_sum(iter: impl IntoIterator<Item = Money>) -> Option<Money> {
        iter.into_iter()
            .try_fold(Money::zero(), |acc, m| acc.try_add(m))
    }

    /// Share of `whole` as a percentage, 0 when `whole` is zero.
    pub fn percent_of(&self, whole: Money) -> f64 {
        if whole.is_zero() {
            return 0.0;
        }
        (self.0 as f64 / whole.0 as f64) * 100.0
    }

    /// Format with the currency symbol and id-ID digit grouping,
    /// e.g. `Rp 25.000`.
    pub fn display(&self) -> String {
        let digits = self.0.unsigned_abs().to_string();
        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, ch) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push('.');
            }
            grouped.push(ch);
        }
        let sign = if self.0 < 0 { "-" } else { "" };
        format!("{sign}Rp {grouped}")
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        lenient::int(deserializer).map(Money)
    }
}

impl From<i64> for Money {
    fn from(amount: i64) -> Self {
        Money(amount)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_display() {
        assert_eq!(Money::new(25000).display(), "Rp 25.000");
        assert_eq!(Money::new(1234567).display(), "Rp 1.234.567");
        assert_eq!(Money::new(500).display(), "Rp 500");
        assert_eq!(Money::new(-5000).display(), "-Rp 5.000");
        assert_eq!(Money::zero().display(), "Rp 0");
    }

    #[test]
    fn test_money_checked_arithmetic() {
        let a = Money::new(10000);
        assert_eq!(a.try_multiply(2), Some(Money::new(20000)));
        assert_eq!(a.try_add(Money::new(5000)), Some(Money::new(15000)));
        assert_eq!(a.try_subtract(Money::new(15000)), Some(Money::new(-5000)));
        assert_eq!(Money::new(i64::MAX).try_add(Money::new(1)), None);
        assert_eq!(Money::new(i64::MAX).try_multiply(2), None);
        assert_eq!(a.try_divide(0), None);
    }

    #[test]
    fn test_money_sum() {
        let total = Money::try_sum([Money::new(20000), Money::new(5000)]);
        assert_eq!(total, Some(Money::new(25000)));
        assert_eq!(Money::try_sum([Money::new(i64::MAX), Money::new(1)]), None);
    }

    #[test]
    fn test_money_deserializes_text_cells() {
        let m: Money = serde_json::from_str("\"15000\"").unwrap();
        assert_eq!(m, Money::new(15000));
        let m: Money = serde_json::from_str("15000").unwrap();
        assert_eq!(m, Money::new(15000));
    }

    #[test]
    fn test_percent_of() {
        assert_eq!(Money::new(0).percent_of(Money::zero()), 0.0);
        assert!((Money::new(25).percent_of(Money::new(100)) - 25.0).abs() < f64::EPSILON);
    }
}
