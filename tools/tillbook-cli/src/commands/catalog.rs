//! Catalog management.

use anyhow::Result;
use tillbook_commerce::catalog::{CatalogItem, ItemStatus};
use tillbook_commerce::Money;

use super::{CatalogArgs, CatalogCommand};
use crate::context::Context;
use crate::output::truncate;

/// Run the catalog command.
pub async fn run(args: CatalogArgs, ctx: &Context) -> Result<()> {
    match args.command.unwrap_or(CatalogCommand::List { active: false }) {
        CatalogCommand::List { active } => list_items(active, ctx).await,
        CatalogCommand::Add {
            item_name,
            price,
            category,
            base_cost,
            operational_cost,
            labor_cost,
            marketing_cost,
            active,
        } => {
            let status = if active { ItemStatus::Active } else { ItemStatus::Draft };
            let item = CatalogItem::new(item_name, Money::new(price))
                .with_category(category)
                .with_costs(
                    Money::new(base_cost),
                    Money::new(operational_cost),
                    Money::new(labor_cost),
                    Money::new(marketing_cost),
                )
                .with_status(status);
            add_item(item, ctx).await
        }
    }
}

async fn list_items(active_only: bool, ctx: &Context) -> Result<()> {
    let service = ctx.service().await?;
    let items = if active_only {
        service.catalog().list_active().await?
    } else {
        service.list_items().await?
    };

    if ctx.output.is_json() {
        ctx.output.json(&items);
        return Ok(());
    }

    ctx.output.header(&format!("Catalog ({} items)", items.len()));
    let widths = [24, 14, 12, 12, 12, 7];
    ctx.output.table_header(
        &["ITEM", "CATEGORY", "PRICE", "UNIT COST", "NET", "STATUS"],
        &widths,
    );
    for item in &items {
        let item = &item.value;
        let unit_cost = item
            .unit_cost()
            .map(|c| c.to_string())
            .unwrap_or_else(|_| "overflow".to_string());
        ctx.output.table_row(
            &[
                &truncate(&item.item_name, 24),
                &truncate(&item.category, 14),
                &item.sale_price.to_string(),
                &unit_cost,
                &item.net_sales.to_string(),
                item.status.as_str(),
            ],
            &widths,
        );
    }
    Ok(())
}

async fn add_item(item: CatalogItem, ctx: &Context) -> Result<()> {
    let service = ctx.service().await?;
    let created = service.create_item(item).await?;

    if ctx.output.is_json() {
        ctx.output.json(&created);
        return Ok(());
    }

    let item = &created.item.value;
    ctx.output
        .success(&format!("Added {} ({})", item.item_name, item.status));
    ctx.output.kv("Price", &item.sale_price.to_string());
    ctx.output.kv("Net sales", &item.net_sales.to_string());
    match &created.stock_warning {
        Some(warning) => ctx.output.warn(warning),
        None => ctx.output.kv("Stock", "row created with 0"),
    }
    Ok(())
}
