//! Stock inspection and adjustment.

use anyhow::{bail, Result};
use dialoguer::Confirm;
use tillbook_commerce::stock::StockStatus;
use tillbook_service::UpdateStockRequest;

use super::{StockArgs, StockCommand};
use crate::context::Context;
use crate::output::{status_badge, truncate};

/// Run the stock command.
pub async fn run(args: StockArgs, ctx: &Context) -> Result<()> {
    match args.command.unwrap_or(StockCommand::List) {
        StockCommand::List => list_stock(ctx).await,
        StockCommand::Set {
            row_key,
            item_name,
            quantity,
        } => set_stock(row_key, item_name, quantity, ctx).await,
        StockCommand::Init { item_name } => add_stock(&item_name, 0, ctx).await,
        StockCommand::Add {
            item_name,
            quantity,
        } => add_stock(&item_name, quantity, ctx).await,
    }
}

async fn list_stock(ctx: &Context) -> Result<()> {
    let service = ctx.service().await?;
    let rows = service.list_stock().await?;

    if ctx.output.is_json() {
        ctx.output.json(&rows);
        return Ok(());
    }

    ctx.output.header("Stock");
    if rows.is_empty() {
        ctx.output.info("No stock rows yet");
        return Ok(());
    }

    let widths = [6, 24, 8, 10, 17];
    ctx.output
        .table_header(&["KEY", "ITEM", "QTY", "STATUS", "UPDATED"], &widths);
    for row in &rows {
        let entry = &row.entry.value;
        let updated = entry
            .updated_at
            .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());
        ctx.output.table_row(
            &[
                &row.entry.key.to_string(),
                &truncate(&entry.item_name, 24),
                &entry.quantity.to_string(),
                // pad before styling so escape codes don't skew the column
                &status_badge_padded(row.status, 10),
                &updated,
            ],
            &widths,
        );
    }

    let low = rows.iter().filter(|r| r.status == StockStatus::Low).count();
    let out = rows.iter().filter(|r| r.status == StockStatus::Out).count();
    if low + out > 0 {
        ctx.output.warn(&format!("{low} low, {out} out of stock"));
    }
    Ok(())
}

fn status_badge_padded(status: StockStatus, width: usize) -> String {
    let pad = width.saturating_sub(status.as_str().len());
    format!("{}{}", status_badge(status), " ".repeat(pad))
}

async fn set_stock(row_key: u64, item_name: String, quantity: i64, ctx: &Context) -> Result<()> {
    if quantity < 0 {
        bail!("Quantity must not be negative");
    }
    let service = ctx.service().await?;

    let current = service
        .stock()
        .list()
        .await?
        .into_iter()
        .find(|row| row.key.0 == row_key);
    let Some(current) = current else {
        bail!("No stock row with key {row_key}");
    };
    if current.value.item_name != item_name {
        bail!(
            "Stock row {row_key} holds {}, not {item_name}",
            current.value.item_name
        );
    }

    if !ctx.assume_yes && !ctx.output.is_json() {
        ctx.output.warn(&format!(
            "This overwrites {item_name}: {} -> {quantity}",
            current.value.quantity
        ));
        let confirmed = Confirm::new()
            .with_prompt("Overwrite stock?")
            .default(false)
            .interact()?;
        if !confirmed {
            ctx.output.warn("Stock unchanged");
            return Ok(());
        }
    }

    let entry = service
        .update_stock(UpdateStockRequest {
            row_key: Some(row_key),
            item_name: Some(item_name),
            quantity: Some(quantity),
        })
        .await?;

    if ctx.output.is_json() {
        ctx.output.json(&entry);
    } else {
        ctx.output
            .success(&format!("{} set to {}", entry.item_name, entry.quantity));
    }
    Ok(())
}

async fn add_stock(item_name: &str, quantity: i64, ctx: &Context) -> Result<()> {
    let service = ctx.service().await?;
    let key = service.stock().add_entry(item_name, quantity).await?;

    if ctx.output.is_json() {
        ctx.output.json(&serde_json::json!({
            "key": key,
            "item_name": item_name,
            "quantity": quantity,
        }));
    } else {
        ctx.output
            .success(&format!("Stock row {key} created for {item_name} with {quantity}"));
    }
    Ok(())
}
