//! CLI command implementations.

pub mod catalog;
pub mod checkout;
pub mod config;
pub mod orders;
pub mod report;
pub mod request;
pub mod shopping;
pub mod stock;

use clap::{Args, Subcommand};

/// Arguments for the checkout command.
#[derive(Args)]
pub struct CheckoutArgs {
    /// Cashier name.
    #[arg(long)]
    pub cashier: Option<String>,

    /// Customer name.
    #[arg(long)]
    pub customer: Option<String>,

    /// Line to sell as `ITEM=QUANTITY` (repeatable). Prompts when omitted.
    #[arg(short, long = "item", value_name = "ITEM=QTY")]
    pub items: Vec<String>,

    /// Cash tendered.
    #[arg(long, conflicts_with = "qris")]
    pub cash: Option<i64>,

    /// Pay by QRIS.
    #[arg(long)]
    pub qris: bool,

    /// Order note.
    #[arg(long, default_value = "")]
    pub note: String,
}

/// Arguments for the orders command.
#[derive(Args)]
pub struct OrdersArgs {
    #[command(subcommand)]
    pub command: Option<OrdersCommand>,
}

#[derive(Subcommand)]
pub enum OrdersCommand {
    /// List every ledger line.
    List {
        /// Show only the last N lines.
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// List transactions with their lines grouped.
    Grouped {
        /// Show only the last N transactions.
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Rebuild the receipt of a transaction.
    Receipt {
        /// Transaction id.
        transaction_id: String,
    },
}

/// Arguments for the stock command.
#[derive(Args)]
pub struct StockArgs {
    #[command(subcommand)]
    pub command: Option<StockCommand>,
}

#[derive(Subcommand)]
pub enum StockCommand {
    /// List stock with its status.
    List,
    /// Overwrite the quantity of a stock row.
    Set {
        /// Row key, as shown by `stock list`.
        row_key: u64,
        /// Item name held by the row.
        item_name: String,
        /// New quantity.
        quantity: i64,
    },
    /// Create a zero-quantity row for an item.
    Init {
        item_name: String,
    },
    /// Create a stock row with a starting quantity.
    Add {
        item_name: String,
        quantity: i64,
    },
}

/// Arguments for the catalog command.
#[derive(Args)]
pub struct CatalogArgs {
    #[command(subcommand)]
    pub command: Option<CatalogCommand>,
}

#[derive(Subcommand)]
pub enum CatalogCommand {
    /// List catalog items.
    List {
        /// Only items that can be sold.
        #[arg(long)]
        active: bool,
    },
    /// Add an item together with its stock row.
    Add {
        /// Item name.
        item_name: String,
        /// Selling price.
        #[arg(long)]
        price: i64,
        #[arg(long, default_value = "")]
        category: String,
        #[arg(long, default_value_t = 0)]
        base_cost: i64,
        #[arg(long, default_value_t = 0)]
        operational_cost: i64,
        #[arg(long, default_value_t = 0)]
        labor_cost: i64,
        #[arg(long, default_value_t = 0)]
        marketing_cost: i64,
        /// Make the item sellable right away.
        #[arg(long)]
        active: bool,
    },
}

/// Arguments for the shopping command.
#[derive(Args)]
pub struct ShoppingArgs {
    #[command(subcommand)]
    pub command: Option<ShoppingCommand>,
}

#[derive(Subcommand)]
pub enum ShoppingCommand {
    /// List purchases.
    List,
    /// Record a purchase.
    Add {
        /// What was bought.
        item: String,
        /// karyawan, bahan or operasional.
        #[arg(long)]
        category: String,
        #[arg(long)]
        quantity: i64,
        #[arg(long)]
        unit: String,
        /// Amount paid for the whole line.
        #[arg(long)]
        price: i64,
        /// Join an existing batch instead of starting one.
        #[arg(long)]
        batch: Option<String>,
    },
}

/// Arguments for the report command.
#[derive(Args)]
pub struct ReportArgs {
    /// First day, YYYY-MM-DD.
    #[arg(long)]
    pub start: Option<String>,

    /// Last day, YYYY-MM-DD.
    #[arg(long)]
    pub end: Option<String>,

    /// Report a single day (defaults to today when no range is given).
    #[arg(long, conflicts_with_all = ["start", "end", "all_time"])]
    pub day: Option<String>,

    /// Report over the whole ledger.
    #[arg(long)]
    pub all_time: bool,

    /// all, cash or qris.
    #[arg(long, default_value = "all")]
    pub payment: String,
}

/// Arguments for the request command.
#[derive(Args)]
pub struct RequestArgs {
    /// GET, POST or PUT.
    pub method: String,

    /// Target such as `/api/report?payment=cash`.
    pub target: String,

    /// JSON body.
    #[arg(short, long)]
    pub body: Option<String>,
}

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration.
    Show,
    /// Initialize a new config file.
    Init {
        /// File to write; a `.json` name writes JSON.
        #[arg(default_value = "tillbook.toml")]
        path: String,
        /// Force overwrite existing config.
        #[arg(short, long)]
        force: bool,
    },
    /// Validate the config file.
    Validate,
}

/// Parse `ITEM=QTY`; a bare `ITEM` means one.
pub(crate) fn parse_line_arg(arg: &str) -> anyhow::Result<(String, i64)> {
    let (name, quantity) = match arg.rsplit_once('=') {
        Some((name, qty)) => {
            let qty = qty
                .trim()
                .parse::<i64>()
                .map_err(|_| anyhow::anyhow!("Invalid quantity in '{arg}'"))?;
            (name.trim(), qty)
        }
        None => (arg.trim(), 1),
    };
    if name.is_empty() {
        anyhow::bail!("Missing item name in '{arg}'");
    }
    Ok((name.to_string(), quantity))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_line_arg() {
        assert_eq!(parse_line_arg("Kopi Susu=2").unwrap(), ("Kopi Susu".to_string(), 2));
        assert_eq!(parse_line_arg("Teh").unwrap(), ("Teh".to_string(), 1));
        assert!(parse_line_arg("Teh=two").is_err());
        assert!(parse_line_arg("=2").is_err());
    }
}
