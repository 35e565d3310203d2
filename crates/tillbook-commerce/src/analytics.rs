//! Revenue, cost and profit reporting over the order ledger.
//!
//! The ledger is flat: one row per line, with order-level fields
//! repeated on every line. [`group_orders`] rebuilds logical orders and
//! [`build_report`] computes a [`Report`] from a [`LedgerSnapshot`]
//! without touching the store.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tillbook_store::{Sheet, TabularStore};

use crate::catalog::CatalogItem;
use crate::ledger::{read_order_lines, OrderLine, PaymentMethod};
use crate::repo::read_sheet;
use crate::shopping::{ShoppingCategory, ShoppingListEntry};
use crate::{CommerceError, Money, TransactionId};

/// Inclusive range of UTC calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    /// Create a window; `start` must not be after `end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, CommerceError> {
        if start > end {
            return Err(CommerceError::validation(format!(
                "window start {start} is after end {end}"
            )));
        }
        Ok(Self { start, end })
    }

    /// A single day.
    pub fn day(date: NaiveDate) -> Self {
        Self {
            start: date,
            end: date,
        }
    }

    /// Every representable day.
    pub fn all_time() -> Self {
        Self {
            start: NaiveDate::MIN,
            end: NaiveDate::MAX,
        }
    }

    /// Whether `at` falls on a day of the window.
    pub fn contains(&self, at: &DateTime<Utc>) -> bool {
        let day = at.date_naive();
        self.start <= day && day <= self.end
    }
}

/// Which payment methods a report covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentFilter {
    #[default]
    All,
    Cash,
    Qris,
}

impl PaymentFilter {
    pub fn matches(&self, method: PaymentMethod) -> bool {
        match self {
            PaymentFilter::All => true,
            PaymentFilter::Cash => method == PaymentMethod::Cash,
            PaymentFilter::Qris => method == PaymentMethod::Qris,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentFilter::All => "all",
            PaymentFilter::Cash => "cash",
            PaymentFilter::Qris => "qris",
        }
    }
}

impl fmt::Display for PaymentFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentFilter {
    type Err = CommerceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "all" => Ok(PaymentFilter::All),
            "cash" => Ok(PaymentFilter::Cash),
            "qris" => Ok(PaymentFilter::Qris),
            other => Err(CommerceError::validation(format!(
                "unknown payment filter: {other}"
            ))),
        }
    }
}

/// The lines of one transaction, grouped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogicalOrder {
    pub transaction_id: TransactionId,
    /// Timestamp of the first line.
    pub created_at: DateTime<Utc>,
    pub cashier: String,
    pub customer: Option<String>,
    pub payment_method: PaymentMethod,
    pub tendered: Money,
    pub change: Money,
    pub total: Money,
    pub item_count: i64,
    pub lines: Vec<OrderLine>,
}

/// Group ledger lines by transaction id, in order of first appearance.
///
/// Order-level fields come from the first line seen for each id.
pub fn group_orders(lines: &[OrderLine]) -> Result<Vec<LogicalOrder>, CommerceError> {
    let mut orders: Vec<LogicalOrder> = Vec::new();
    let mut index: HashMap<&TransactionId, usize> = HashMap::new();

    for line in lines {
        let slot = *index.entry(&line.transaction_id).or_insert_with(|| {
            orders.push(LogicalOrder {
                transaction_id: line.transaction_id.clone(),
                created_at: line.created_at,
                cashier: line.cashier.clone(),
                customer: line.customer.clone(),
                payment_method: line.payment_method,
                tendered: line.tendered,
                change: line.change,
                total: Money::zero(),
                item_count: 0,
                lines: Vec::new(),
            });
            orders.len() - 1
        });
        let order = &mut orders[slot];
        order.total = order
            .total
            .try_add(line.line_total)
            .ok_or(CommerceError::Overflow)?;
        order.item_count = order
            .item_count
            .checked_add(line.quantity)
            .ok_or(CommerceError::Overflow)?;
        order.lines.push(line.clone());
    }
    Ok(orders)
}

/// Everything a report is computed from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerSnapshot {
    pub lines: Vec<OrderLine>,
    pub catalog: Vec<CatalogItem>,
    pub shopping: Vec<ShoppingListEntry>,
}

/// Cost components summed over sold quantities.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CostBreakdown {
    pub base: Money,
    pub operational: Money,
    pub labor: Money,
    pub marketing: Money,
    pub net_sales: Money,
    /// Base + operational + labor + marketing.
    pub total: Money,
}

/// An item ranked by quantity sold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopItem {
    pub item_name: String,
    pub quantity: i64,
    pub revenue: Money,
}

/// Shopping list spend by category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SupplyExpenses {
    pub labor: Money,
    pub ingredients: Money,
    pub operational: Money,
    pub total: Money,
}

/// Sales report for a window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub window: DateWindow,
    pub payment_filter: PaymentFilter,
    pub total_revenue: Money,
    pub total_orders: usize,
    pub total_items: i64,
    pub average_order_value: Money,
    pub cash_revenue: Money,
    pub qris_revenue: Money,
    pub costs: CostBreakdown,
    pub profit: Money,
    /// Profit as a percentage of revenue, 0 without revenue.
    pub margin_percent: f64,
    pub top_items: Vec<TopItem>,
    /// Items sold that have no catalog entry; they add no cost.
    pub unmatched_items: Vec<String>,
    pub supply_expenses: SupplyExpenses,
}

fn add(a: Money, b: Money) -> Result<Money, CommerceError> {
    a.try_add(b).ok_or(CommerceError::Overflow)
}

fn times(a: Money, quantity: i64) -> Result<Money, CommerceError> {
    a.try_multiply(quantity).ok_or(CommerceError::Overflow)
}

/// Compute a report. Pure: the same snapshot always gives the same report.
pub fn build_report(
    snapshot: &LedgerSnapshot,
    window: DateWindow,
    filter: PaymentFilter,
    top_n: usize,
) -> Result<Report, CommerceError> {
    let lines: Vec<OrderLine> = snapshot
        .lines
        .iter()
        .filter(|l| window.contains(&l.created_at) && filter.matches(l.payment_method))
        .cloned()
        .collect();
    let orders = group_orders(&lines)?;

    let mut total_revenue = Money::zero();
    let mut cash_revenue = Money::zero();
    let mut qris_revenue = Money::zero();
    for order in &orders {
        total_revenue = add(total_revenue, order.total)?;
        match order.payment_method {
            PaymentMethod::Cash => cash_revenue = add(cash_revenue, order.total)?,
            PaymentMethod::Qris => qris_revenue = add(qris_revenue, order.total)?,
        }
    }
    let total_items = lines
        .iter()
        .try_fold(0i64, |acc, l| acc.checked_add(l.quantity))
        .ok_or(CommerceError::Overflow)?;
    let average_order_value = i64::try_from(orders.len())
        .ok()
        .and_then(|n| total_revenue.try_divide(n))
        .unwrap_or_default();

    // First catalog row wins for duplicated names.
    let mut catalog: HashMap<&str, &CatalogItem> = HashMap::new();
    for item in &snapshot.catalog {
        catalog.entry(item.item_name.as_str()).or_insert(item);
    }

    let mut costs = CostBreakdown::default();
    let mut unmatched_items: Vec<String> = Vec::new();
    let mut sold: Vec<TopItem> = Vec::new();
    let mut sold_index: HashMap<&str, usize> = HashMap::new();
    for line in &lines {
        match catalog.get(line.item_name.as_str()) {
            Some(item) => {
                costs.base = add(costs.base, times(item.base_cost, line.quantity)?)?;
                costs.operational = add(costs.operational, times(item.operational_cost, line.quantity)?)?;
                costs.labor = add(costs.labor, times(item.labor_cost, line.quantity)?)?;
                costs.marketing = add(costs.marketing, times(item.marketing_cost, line.quantity)?)?;
                costs.net_sales = add(costs.net_sales, times(item.net_sales, line.quantity)?)?;
            }
            None => {
                if !unmatched_items.contains(&line.item_name) {
                    unmatched_items.push(line.item_name.clone());
                }
            }
        }

        let slot = *sold_index.entry(line.item_name.as_str()).or_insert_with(|| {
            sold.push(TopItem {
                item_name: line.item_name.clone(),
                quantity: 0,
                revenue: Money::zero(),
            });
            sold.len() - 1
        });
        let entry = &mut sold[slot];
        entry.quantity = entry
            .quantity
            .checked_add(line.quantity)
            .ok_or(CommerceError::Overflow)?;
        entry.revenue = add(entry.revenue, line.line_total)?;
    }
    costs.total = Money::try_sum([costs.base, costs.operational, costs.labor, costs.marketing])
        .ok_or(CommerceError::Overflow)?;

    // Stable sort: ties keep first-appearance order.
    sold.sort_by(|a, b| b.quantity.cmp(&a.quantity));
    sold.truncate(top_n);

    let profit = total_revenue
        .try_subtract(costs.total)
        .ok_or(CommerceError::Overflow)?;

    let mut supply_expenses = SupplyExpenses::default();
    for entry in snapshot.shopping.iter().filter(|e| window.contains(&e.shopping_date)) {
        let bucket = match entry.category {
            ShoppingCategory::Karyawan => &mut supply_expenses.labor,
            ShoppingCategory::Bahan => &mut supply_expenses.ingredients,
            ShoppingCategory::Operasional => &mut supply_expenses.operational,
        };
        *bucket = add(*bucket, entry.price)?;
        supply_expenses.total = add(supply_expenses.total, entry.price)?;
    }

    Ok(Report {
        window,
        payment_filter: filter,
        total_revenue,
        total_orders: orders.len(),
        total_items,
        average_order_value,
        cash_revenue,
        qris_revenue,
        costs,
        profit,
        margin_percent: profit.percent_of(total_revenue),
        top_items: sold,
        unmatched_items,
        supply_expenses,
    })
}

/// Loads ledger snapshots and reports on them.
#[derive(Clone)]
pub struct Analytics {
    store: Arc<dyn TabularStore>,
    top_n: usize,
}

impl Analytics {
    pub fn new(store: Arc<dyn TabularStore>, top_n: usize) -> Self {
        Self { store, top_n }
    }

    /// Read the order, catalog and shopping sheets concurrently.
    pub async fn snapshot(&self) -> Result<LedgerSnapshot, CommerceError> {
        let store = self.store.as_ref();
        let (lines, catalog, shopping) = tokio::try_join!(
            read_order_lines(store),
            read_sheet::<CatalogItem, _>(store, Sheet::MasterItem),
            read_sheet::<ShoppingListEntry, _>(store, Sheet::ShoppingList)
        )?;
        Ok(LedgerSnapshot {
            lines: lines.into_iter().map(|k| k.value).collect(),
            catalog: catalog.into_iter().map(|k| k.value).collect(),
            shopping: shopping.into_iter().map(|k| k.value).collect(),
        })
    }

    /// Report over `window` for the payment methods in `filter`.
    #[tracing::instrument(skip(self), fields(start = %window.start, end = %window.end, filter = %filter))]
    pub async fn aggregate(
        &self,
        window: DateWindow,
        filter: PaymentFilter,
    ) -> Result<Report, CommerceError> {
        let snapshot = self.snapshot().await?;
        let report = build_report(&snapshot, window, filter, self.top_n)?;
        tracing::debug!(
            orders = report.total_orders,
            revenue = report.total_revenue.amount(),
            "report built"
        );
        Ok(report)
    }

    /// All logical orders in ledger order.
    pub async fn orders(&self) -> Result<Vec<LogicalOrder>, CommerceError> {
        let lines: Vec<OrderLine> = read_order_lines(self.store.as_ref())
            .await?
            .into_iter()
            .map(|k| k.value)
            .collect();
        group_orders(&lines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, day, hour, 0, 0).unwrap()
    }

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, day).unwrap()
    }

    fn line(tx: &str, when: DateTime<Utc>, item: &str, qty: i64, total: i64, method: PaymentMethod) -> OrderLine {
        OrderLine {
            transaction_id: TransactionId::new(tx),
            created_at: when,
            item_name: item.to_string(),
            quantity: qty,
            line_total: Money::new(total),
            cashier: "Sari".to_string(),
            customer: None,
            payment_method: method,
            tendered: Money::new(total),
            change: Money::zero(),
            note: String::new(),
        }
    }

    #[test]
    fn test_group_orders_keeps_first_seen_order() {
        let lines = vec![
            line("B", at(1, 9), "Kopi", 1, 10000, PaymentMethod::Cash),
            line("A", at(1, 10), "Teh", 2, 10000, PaymentMethod::Cash),
            line("B", at(1, 9), "Roti", 1, 8000, PaymentMethod::Cash),
        ];
        let orders = group_orders(&lines).unwrap();
        assert_eq!(orders.len(), 2);
        assert_eq!(orders[0].transaction_id.as_str(), "B");
        assert_eq!(orders[0].total, Money::new(18000));
        assert_eq!(orders[0].item_count, 2);
        assert_eq!(orders[1].lines.len(), 1);
    }

    #[test]
    fn test_window_is_inclusive_calendar_days() {
        let window = DateWindow::new(date(1), date(2)).unwrap();
        assert!(window.contains(&at(1, 0)));
        assert!(window.contains(&Utc.with_ymd_and_hms(2024, 5, 2, 23, 59, 59).unwrap()));
        assert!(!window.contains(&at(3, 0)));
        assert!(DateWindow::new(date(3), date(1)).is_err());
    }

    #[test]
    fn test_empty_report() {
        let report = build_report(
            &LedgerSnapshot::default(),
            DateWindow::all_time(),
            PaymentFilter::All,
            5,
        )
        .unwrap();
        assert_eq!(report.total_orders, 0);
        assert_eq!(report.average_order_value, Money::zero());
        assert_eq!(report.margin_percent, 0.0);
        assert!(report.top_items.is_empty());
    }

    #[test]
    fn test_costs_profit_and_unmatched() {
        let kopi = CatalogItem::new("Kopi", Money::new(10000)).with_costs(
            Money::new(3000),
            Money::new(1000),
            Money::new(1000),
            Money::new(500),
        );
        let snapshot = LedgerSnapshot {
            lines: vec![
                line("T1", at(1, 9), "Kopi", 2, 20000, PaymentMethod::Cash),
                line("T1", at(1, 9), "Misteri", 1, 7000, PaymentMethod::Cash),
            ],
            catalog: vec![kopi],
            shopping: Vec::new(),
        };
        let report = build_report(&snapshot, DateWindow::day(date(1)), PaymentFilter::All, 5).unwrap();

        assert_eq!(report.total_revenue, Money::new(27000));
        assert_eq!(report.costs.base, Money::new(6000));
        assert_eq!(report.costs.total, Money::new(11000));
        assert_eq!(report.profit, Money::new(16000));
        assert_eq!(report.unmatched_items, vec!["Misteri".to_string()]);
        assert_eq!(report.total_orders, 1);
        assert_eq!(report.total_items, 3);
    }

    #[test]
    fn test_top_items_ties_keep_first_appearance() {
        let snapshot = LedgerSnapshot {
            lines: vec![
                line("T1", at(1, 9), "Teh", 2, 10000, PaymentMethod::Cash),
                line("T2", at(1, 10), "Kopi", 2, 20000, PaymentMethod::Cash),
                line("T3", at(1, 11), "Roti", 5, 40000, PaymentMethod::Qris),
            ],
            ..Default::default()
        };
        let report = build_report(&snapshot, DateWindow::day(date(1)), PaymentFilter::All, 2).unwrap();
        let names: Vec<_> = report.top_items.iter().map(|t| t.item_name.as_str()).collect();
        assert_eq!(names, vec!["Roti", "Teh"]);
    }

    #[test]
    fn test_payment_filter_and_supply_expenses() {
        let snapshot = LedgerSnapshot {
            lines: vec![
                line("T1", at(1, 9), "Teh", 1, 5000, PaymentMethod::Cash),
                line("T2", at(1, 10), "Kopi", 1, 10000, PaymentMethod::Qris),
            ],
            catalog: Vec::new(),
            shopping: vec![
                ShoppingListEntry {
                    shopping_id: "RTN-SHOP-1".into(),
                    shopping_date: at(1, 7),
                    item: "Gula".into(),
                    category: ShoppingCategory::Bahan,
                    quantity: 1,
                    unit: "kg".into(),
                    price: Money::new(15000),
                },
                ShoppingListEntry {
                    shopping_id: "RTN-SHOP-2".into(),
                    shopping_date: at(9, 7),
                    item: "Gaji".into(),
                    category: ShoppingCategory::Karyawan,
                    quantity: 1,
                    unit: "org".into(),
                    price: Money::new(100000),
                },
            ],
        };
        let report = build_report(&snapshot, DateWindow::day(date(1)), PaymentFilter::Qris, 5).unwrap();
        assert_eq!(report.total_revenue, Money::new(10000));
        assert_eq!(report.cash_revenue, Money::zero());
        assert_eq!(report.supply_expenses.ingredients, Money::new(15000));
        assert_eq!(report.supply_expenses.labor, Money::zero());
        assert_eq!(report.supply_expenses.total, Money::new(15000));
    }

    #[test]
    fn test_payment_filter_parsing() {
        assert_eq!("QRIS".parse::<PaymentFilter>().unwrap(), PaymentFilter::Qris);
        assert_eq!("".parse::<PaymentFilter>().unwrap(), PaymentFilter::All);
        assert!("card".parse::<PaymentFilter>().is_err());
    }
}
