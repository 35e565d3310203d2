//! Register checkout.

use anyhow::{bail, Context as _, Result};
use dialoguer::{Confirm, Input, Select};
use tillbook_commerce::checkout::{CheckoutSession, Compensation, PartialCheckout, PaymentSelection};
use tillbook_commerce::{CommerceError, Money};
use tillbook_service::PosService;

use super::{orders::print_receipt, parse_line_arg, CheckoutArgs};
use crate::context::Context;
use crate::output::{truncate, Output};

/// Run the checkout command.
pub async fn run(args: CheckoutArgs, ctx: &Context) -> Result<()> {
    let service = ctx.service().await?;
    let interactive = !ctx.assume_yes && !ctx.output.is_json();

    let requested = if args.items.is_empty() {
        if !interactive {
            bail!("No items given. Pass --item ITEM=QTY");
        }
        prompt_lines(&service).await?
    } else {
        args.items
            .iter()
            .map(|arg| parse_line_arg(arg))
            .collect::<Result<Vec<_>>>()?
    };

    let mut session = CheckoutSession::new(ctx.config.checkout.transaction_prefix.clone());
    for (name, quantity) in requested {
        let item = service
            .catalog()
            .find(&name)
            .await
            .with_context(|| format!("Cannot sell {name}"))?
            .value;
        let available = service.stock().get_quantity(&name).await?.quantity;
        let outcome = session.add_line(&item, quantity, available)?;
        if outcome.clamped {
            ctx.output.warn(&format!(
                "{name}: only {} in stock, cart holds {}",
                available, outcome.quantity
            ));
        }
    }

    let total = session.total()?;
    print_cart(&ctx.output, &session)?;

    let cashier = match args.cashier {
        Some(cashier) => cashier,
        None if interactive => Input::<String>::new().with_prompt("Cashier").interact_text()?,
        None => bail!("--cashier is required"),
    };
    session.checkout(cashier, args.customer)?;

    let selection = if args.qris {
        PaymentSelection::Qris
    } else if let Some(cash) = args.cash {
        PaymentSelection::Cash {
            tendered: Money::new(cash),
        }
    } else if interactive {
        prompt_payment(total)?
    } else {
        PaymentSelection::Cash { tendered: total }
    };
    let payment = session.select_payment(selection)?;

    if interactive {
        let confirmed = Confirm::new()
            .with_prompt(format!("Charge {} by {}?", total, payment.method))
            .default(true)
            .interact()?;
        if !confirmed {
            ctx.output.warn("Checkout cancelled, nothing recorded");
            return Ok(());
        }
    }

    let spinner = ctx.output.spinner(&format!("Recording {} line(s)", session.cart().len()));
    let settled = session.settle(service.writer(), &args.note).await;
    spinner.finish_and_clear();

    match settled {
        Ok(receipt) => {
            ctx.output.success(&format!("Recorded {}", receipt.transaction_id));
            print_receipt(&ctx.output, &receipt);
            Ok(())
        }
        Err(CommerceError::PartialCheckoutFailure(partial)) => {
            print_partial(&ctx.output, &partial);
            bail!(
                "Checkout {} stopped after {} of {} line(s)",
                partial.transaction_id,
                partial.committed.len(),
                partial.committed.len() + 1 + partial.not_attempted.len()
            )
        }
        Err(e) => Err(e).context("Checkout failed, nothing recorded"),
    }
}

async fn prompt_lines(service: &PosService) -> Result<Vec<(String, i64)>> {
    let items = service.catalog().list_active().await?;
    if items.is_empty() {
        bail!("No active items in the catalog");
    }
    let mut labels: Vec<String> = items
        .iter()
        .map(|i| format!("{} ({})", i.value.item_name, i.value.sale_price))
        .collect();
    labels.push("Done".to_string());

    let mut lines = Vec::new();
    loop {
        let choice = Select::new()
            .with_prompt("Add item")
            .items(&labels)
            .default(0)
            .interact()?;
        let Some(item) = items.get(choice) else {
            break;
        };
        let quantity: i64 = Input::new()
            .with_prompt(format!("Quantity of {}", item.value.item_name))
            .default(1)
            .interact_text()?;
        lines.push((item.value.item_name.clone(), quantity));
    }
    if lines.is_empty() {
        bail!("Nothing to sell");
    }
    Ok(lines)
}

fn prompt_payment(total: Money) -> Result<PaymentSelection> {
    let method = Select::new()
        .with_prompt("Payment")
        .items(&["Cash", "QRIS"][..])
        .default(0)
        .interact()?;
    if method == 1 {
        return Ok(PaymentSelection::Qris);
    }
    let tendered: i64 = Input::new()
        .with_prompt("Cash tendered")
        .default(total.amount())
        .interact_text()?;
    Ok(PaymentSelection::Cash {
        tendered: Money::new(tendered),
    })
}

fn print_cart(output: &Output, session: &CheckoutSession) -> Result<()> {
    if output.is_json() {
        return Ok(());
    }
    output.header("Cart");
    let widths = [24, 5, 12, 12];
    output.table_header(&["ITEM", "QTY", "PRICE", "SUBTOTAL"], &widths);
    for line in session.cart().lines() {
        output.table_row(
            &[
                &truncate(&line.item_name, 24),
                &line.quantity.to_string(),
                &line.unit_price.to_string(),
                &line.subtotal()?.to_string(),
            ],
            &widths,
        );
    }
    output.kv("Total", &session.total()?.to_string());
    Ok(())
}

fn print_partial(output: &Output, partial: &PartialCheckout) {
    if output.is_json() {
        output.json(partial);
        return;
    }

    output.header(&format!("Partial checkout {}", partial.transaction_id));
    for line in &partial.committed {
        output.success(&format!("{} x{} recorded", line.item_name, line.quantity));
    }
    output.error(&format!(
        "{} x{} failed ({}): {}",
        partial.failed.item_name, partial.failed.quantity, partial.failed.code, partial.failed.reason
    ));
    for line in &partial.not_attempted {
        output.warn(&format!("{} x{} not attempted", line.item_name, line.quantity));
    }
    if !partial.compensations.is_empty() {
        output.info("To reverse the stock taken by this checkout:");
        for step in &partial.compensations {
            let Compensation::RestoreStock { item_name, quantity } = step;
            output.list_item(&format!("add {quantity} back to {item_name}"));
        }
    }
}
