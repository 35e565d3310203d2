//! Sales report.

use anyhow::{Context as _, Result};
use chrono::{NaiveDate, Utc};
use tillbook_commerce::analytics::{DateWindow, PaymentFilter, Report};

use super::ReportArgs;
use crate::context::Context;
use crate::output::{truncate, Output};

/// Run the report command.
pub async fn run(args: ReportArgs, ctx: &Context) -> Result<()> {
    let window = window_from_args(&args, Utc::now().date_naive())?;
    let filter: PaymentFilter = args.payment.parse()?;

    let service = ctx.service().await?;
    let report = service.analytics().aggregate(window, filter).await?;

    if ctx.output.is_json() {
        ctx.output.json(&report);
    } else {
        print_report(&ctx.output, &report);
    }
    Ok(())
}

fn parse_date(value: &str, flag: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .with_context(|| format!("--{flag} must be YYYY-MM-DD, got '{value}'"))
}

/// Window for the flags given: `--all-time`, `--day`, a `--start`/`--end`
/// range with open sides, or today.
fn window_from_args(args: &ReportArgs, today: NaiveDate) -> Result<DateWindow> {
    if args.all_time {
        return Ok(DateWindow::all_time());
    }
    if let Some(day) = &args.day {
        return Ok(DateWindow::day(parse_date(day, "day")?));
    }
    if args.start.is_none() && args.end.is_none() {
        return Ok(DateWindow::day(today));
    }
    let open = DateWindow::all_time();
    let start = match &args.start {
        Some(s) => parse_date(s, "start")?,
        None => open.start,
    };
    let end = match &args.end {
        Some(e) => parse_date(e, "end")?,
        None => open.end,
    };
    Ok(DateWindow::new(start, end)?)
}

fn describe_window(window: &DateWindow) -> String {
    let open = DateWindow::all_time();
    match (window.start == open.start, window.end == open.end) {
        (true, true) => "all time".to_string(),
        (true, false) => format!("up to {}", window.end),
        (false, true) => format!("from {}", window.start),
        (false, false) if window.start == window.end => window.start.to_string(),
        (false, false) => format!("{} to {}", window.start, window.end),
    }
}

fn print_report(output: &Output, report: &Report) {
    output.header(&format!(
        "Report {} ({} payments)",
        describe_window(&report.window),
        report.payment_filter
    ));

    output.kv("Revenue", &report.total_revenue.to_string());
    output.kv("Orders", &report.total_orders.to_string());
    output.kv("Items sold", &report.total_items.to_string());
    output.kv("Average order", &report.average_order_value.to_string());
    output.kv("Cash", &report.cash_revenue.to_string());
    output.kv("QRIS", &report.qris_revenue.to_string());

    output.header("Costs");
    output.kv("Base", &report.costs.base.to_string());
    output.kv("Operational", &report.costs.operational.to_string());
    output.kv("Labor", &report.costs.labor.to_string());
    output.kv("Marketing", &report.costs.marketing.to_string());
    output.kv("Total cost", &report.costs.total.to_string());
    output.kv("Profit", &report.profit.to_string());
    output.kv("Margin", &format!("{:.1}%", report.margin_percent));

    if !report.top_items.is_empty() {
        output.header("Top sellers");
        let widths = [4, 24, 6, 12];
        output.table_header(&["#", "ITEM", "QTY", "REVENUE"], &widths);
        for (rank, item) in report.top_items.iter().enumerate() {
            output.table_row(
                &[
                    &(rank + 1).to_string(),
                    &truncate(&item.item_name, 24),
                    &item.quantity.to_string(),
                    &item.revenue.to_string(),
                ],
                &widths,
            );
        }
    }

    output.header("Supply purchases");
    output.kv("Labor", &report.supply_expenses.labor.to_string());
    output.kv("Ingredients", &report.supply_expenses.ingredients.to_string());
    output.kv("Operational", &report.supply_expenses.operational.to_string());
    output.kv("Total", &report.supply_expenses.total.to_string());

    if !report.unmatched_items.is_empty() {
        output.warn(&format!(
            "No catalog entry (counted at zero cost): {}",
            report.unmatched_items.join(", ")
        ));
    }
}
