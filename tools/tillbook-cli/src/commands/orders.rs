//! Order ledger browsing.

use anyhow::{bail, Result};
use tillbook_commerce::checkout::Receipt;
use tillbook_commerce::ledger::PaymentMethod;

use super::{OrdersArgs, OrdersCommand};
use crate::context::Context;
use crate::output::{truncate, Output};

/// Run the orders command.
pub async fn run(args: OrdersArgs, ctx: &Context) -> Result<()> {
    match args.command.unwrap_or(OrdersCommand::Grouped { limit: None }) {
        OrdersCommand::List { limit } => list_lines(limit, ctx).await,
        OrdersCommand::Grouped { limit } => list_grouped(limit, ctx).await,
        OrdersCommand::Receipt { transaction_id } => show_receipt(&transaction_id, ctx).await,
    }
}

fn last<T>(items: &[T], limit: Option<usize>) -> &[T] {
    let skip = limit.map_or(0, |n| items.len().saturating_sub(n));
    &items[skip..]
}

async fn list_lines(limit: Option<usize>, ctx: &Context) -> Result<()> {
    let service = ctx.service().await?;
    let lines = service.list_orders().await?;
    let shown = last(&lines, limit);

    if ctx.output.is_json() {
        ctx.output.json(&shown);
        return Ok(());
    }

    ctx.output.header(&format!("Order lines ({} of {})", shown.len(), lines.len()));
    if shown.is_empty() {
        ctx.output.info("No orders recorded yet");
        return Ok(());
    }

    let widths = [20, 17, 22, 5, 12, 6, 12];
    ctx.output
        .table_header(&["TRANSACTION", "TIME", "ITEM", "QTY", "TOTAL", "PAY", "CASHIER"], &widths);
    for line in shown {
        let line = &line.value;
        ctx.output.table_row(
            &[
                line.transaction_id.as_str(),
                &line.created_at.format("%Y-%m-%d %H:%M").to_string(),
                &truncate(&line.item_name, 22),
                &line.quantity.to_string(),
                &line.line_total.to_string(),
                line.payment_method.as_str(),
                &truncate(&line.cashier, 12),
            ],
            &widths,
        );
    }
    Ok(())
}

async fn list_grouped(limit: Option<usize>, ctx: &Context) -> Result<()> {
    let service = ctx.service().await?;
    let orders = service.grouped_orders().await?;
    let shown = last(&orders, limit);

    if ctx.output.is_json() {
        ctx.output.json(&shown);
        return Ok(());
    }

    ctx.output.header(&format!("Transactions ({} of {})", shown.len(), orders.len()));
    if shown.is_empty() {
        ctx.output.info("No orders recorded yet");
        return Ok(());
    }

    let widths = [20, 17, 6, 12, 6, 16];
    ctx.output
        .table_header(&["TRANSACTION", "TIME", "ITEMS", "TOTAL", "PAY", "CUSTOMER"], &widths);
    for order in shown {
        ctx.output.table_row(
            &[
                order.transaction_id.as_str(),
                &order.created_at.format("%Y-%m-%d %H:%M").to_string(),
                &order.item_count.to_string(),
                &order.total.to_string(),
                order.payment_method.as_str(),
                &truncate(order.customer.as_deref().unwrap_or("-"), 16),
            ],
            &widths,
        );
    }
    Ok(())
}

async fn show_receipt(transaction_id: &str, ctx: &Context) -> Result<()> {
    let service = ctx.service().await?;
    let receipt = match service.receipt(transaction_id).await {
        Ok(receipt) => receipt,
        Err(tillbook_service::ServiceError::NotFound(_)) => {
            bail!("No transaction {transaction_id} in the ledger")
        }
        Err(e) => return Err(e.into()),
    };
    print_receipt(&ctx.output, &receipt);
    Ok(())
}

/// Print a receipt, or its JSON in `--json` mode.
pub(crate) fn print_receipt(output: &Output, receipt: &Receipt) {
    if output.is_json() {
        output.json(receipt);
        return;
    }

    output.header(&format!("Receipt {}", receipt.transaction_id));
    output.kv("Date", &receipt.created_at.format("%Y-%m-%d %H:%M:%S UTC").to_string());
    output.kv("Cashier", &receipt.cashier);
    if let Some(customer) = &receipt.customer {
        output.kv("Customer", customer);
    }
    println!();

    let widths = [24, 5, 12, 12];
    output.table_header(&["ITEM", "QTY", "PRICE", "SUBTOTAL"], &widths);
    for line in &receipt.lines {
        output.table_row(
            &[
                &truncate(&line.item_name, 24),
                &line.quantity.to_string(),
                &line.unit_price.to_string(),
                &line.subtotal.to_string(),
            ],
            &widths,
        );
    }
    println!();

    output.kv("Total", &receipt.total.to_string());
    output.kv("Payment", receipt.payment.method.as_str());
    if receipt.payment.method == PaymentMethod::Cash {
        output.kv("Tendered", &receipt.payment.tendered.to_string());
        output.kv("Change", &receipt.change().to_string());
    }
    if !receipt.note.is_empty() {
        output.kv("Note", &receipt.note);
    }
}
