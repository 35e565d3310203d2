//! Supply purchases.

use anyhow::Result;
use tillbook_commerce::Money;
use tillbook_service::CreatePurchaseRequest;

use super::{ShoppingArgs, ShoppingCommand};
use crate::context::Context;
use crate::output::truncate;

/// Run the shopping command.
pub async fn run(args: ShoppingArgs, ctx: &Context) -> Result<()> {
    match args.command.unwrap_or(ShoppingCommand::List) {
        ShoppingCommand::List => list_purchases(ctx).await,
        ShoppingCommand::Add {
            item,
            category,
            quantity,
            unit,
            price,
            batch,
        } => {
            let request = CreatePurchaseRequest {
                shopping_id: batch,
                item: Some(item),
                category: Some(category),
                quantity: Some(quantity),
                unit: Some(unit),
                price: Some(Money::new(price)),
            };
            add_purchase(request, ctx).await
        }
    }
}

async fn list_purchases(ctx: &Context) -> Result<()> {
    let service = ctx.service().await?;
    let entries = service.list_shopping().await?;

    if ctx.output.is_json() {
        ctx.output.json(&entries);
        return Ok(());
    }

    ctx.output.header(&format!("Purchases ({})", entries.len()));
    let widths = [24, 11, 20, 12, 8, 8, 12];
    ctx.output.table_header(
        &["BATCH", "DATE", "ITEM", "CATEGORY", "QTY", "UNIT", "PRICE"],
        &widths,
    );
    for entry in &entries {
        let entry = &entry.value;
        ctx.output.table_row(
            &[
                entry.shopping_id.as_str(),
                &entry.shopping_date.format("%Y-%m-%d").to_string(),
                &truncate(&entry.item, 20),
                entry.category.as_str(),
                &entry.quantity.to_string(),
                &truncate(&entry.unit, 8),
                &entry.price.to_string(),
            ],
            &widths,
        );
    }

    let total = Money::try_sum(entries.iter().map(|e| e.value.price));
    if let Some(total) = total {
        ctx.output.kv("Total spent", &total.to_string());
    }
    Ok(())
}

async fn add_purchase(request: CreatePurchaseRequest, ctx: &Context) -> Result<()> {
    let service = ctx.service().await?;
    let entry = service.create_purchase(request).await?;

    if ctx.output.is_json() {
        ctx.output.json(&entry);
    } else {
        ctx.output.success(&format!(
            "Recorded {} {} {} for {} in batch {}",
            entry.quantity, entry.unit, entry.item, entry.price, entry.shopping_id
        ));
    }
    Ok(())
}
