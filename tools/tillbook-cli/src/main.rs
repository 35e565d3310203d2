//! Tillbook CLI - register and back office for a small shop.
//!
//! Commands:
//! - `tillbook checkout` - Sell one or more items in a single transaction
//! - `tillbook orders` - Browse the order ledger and rebuild receipts
//! - `tillbook stock` - Inspect and adjust stock
//! - `tillbook catalog` - Manage sellable items
//! - `tillbook shopping` - Record supply purchases
//! - `tillbook report` - Revenue, cost and profit over a date range
//! - `tillbook request` - Send a raw request through the service router
//! - `tillbook config` - Manage configuration

mod commands;
mod config;
mod context;
mod logging;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{
    CatalogArgs, CheckoutArgs, ConfigArgs, OrdersArgs, ReportArgs, RequestArgs, ShoppingArgs,
    StockArgs,
};

/// Tillbook - point of sale over a spreadsheet-style store
#[derive(Parser)]
#[command(name = "tillbook")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use JSON output format
    #[arg(long, global = true)]
    json: bool,

    /// Answer yes to confirmation prompts
    #[arg(short, long, global = true)]
    yes: bool,

    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sell items in one transaction
    Checkout(CheckoutArgs),

    /// Browse recorded orders
    Orders(OrdersArgs),

    /// Inspect and adjust stock
    Stock(StockArgs),

    /// Manage catalog items
    Catalog(CatalogArgs),

    /// Record and list supply purchases
    Shopping(ShoppingArgs),

    /// Sales report over a date range
    Report(ReportArgs),

    /// Send a raw request through the service router
    Request(RequestArgs),

    /// Manage configuration
    Config(ConfigArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let output = output::Output::new(cli.verbose, cli.json);

    let config_path = cli.config.as_deref();
    let ctx = match context::Context::load(config_path, output.clone(), cli.yes) {
        Ok(ctx) => ctx,
        Err(e) => {
            output.error(&format!("{:#}", e));
            std::process::exit(1);
        }
    };

    if let Err(e) = logging::init(&ctx.config.logging, cli.verbose) {
        ctx.output.warn(&format!("{:#}", e));
    }
    if let Some(path) = &ctx.config_path {
        ctx.output.debug(&format!("Using config {}", path.display()));
    }

    let result = match cli.command {
        Commands::Checkout(args) => commands::checkout::run(args, &ctx).await,
        Commands::Orders(args) => commands::orders::run(args, &ctx).await,
        Commands::Stock(args) => commands::stock::run(args, &ctx).await,
        Commands::Catalog(args) => commands::catalog::run(args, &ctx).await,
        Commands::Shopping(args) => commands::shopping::run(args, &ctx).await,
        Commands::Report(args) => commands::report::run(args, &ctx).await,
        Commands::Request(args) => commands::request::run(args, &ctx).await,
        Commands::Config(args) => commands::config::run(args, &ctx).await,
    };

    if let Err(e) = result {
        tracing::error!(error = %format!("{:#}", e), "command failed");
        ctx.output.error(&format!("{:#}", e));
        std::process::exit(1);
    }

    Ok(())
}
