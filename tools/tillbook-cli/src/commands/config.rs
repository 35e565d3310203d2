//! Configuration management commands.

use anyhow::{bail, Result};

use super::{ConfigArgs, ConfigCommand};
use crate::config::{generate_default_config, TillConfig};
use crate::context::Context;

/// Run the config command.
pub async fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ConfigCommand::Show => show_config(ctx),
        ConfigCommand::Init { path, force } => init_config(&path, force, ctx),
        ConfigCommand::Validate => validate_config(ctx),
    }
}

fn show_config(ctx: &Context) -> Result<()> {
    if ctx.output.is_json() {
        ctx.output.json(&ctx.config);
        return Ok(());
    }

    ctx.output.header("Current Configuration");
    match &ctx.config_path {
        Some(path) => ctx.output.kv("file", &path.display().to_string()),
        None => ctx.output.kv("file", "(none found, using defaults)"),
    }

    let config = &ctx.config;
    ctx.output.info("[store]");
    ctx.output.kv("path", &config.store.path);
    ctx.output.kv("resolved", &ctx.store_path().display().to_string());
    ctx.output.kv("timeout_ms", &config.store.timeout_ms.to_string());

    ctx.output.info("[checkout]");
    ctx.output.kv("transaction_prefix", &config.checkout.transaction_prefix);
    ctx.output.kv("shopping_prefix", &config.checkout.shopping_prefix);

    ctx.output.info("[stock]");
    ctx.output.kv("low_stock_threshold", &config.stock.low_stock_threshold.to_string());

    ctx.output.info("[report]");
    ctx.output.kv("top_n", &config.report.top_n.to_string());

    ctx.output.info("[logging]");
    ctx.output.kv("level", &config.logging.level);
    ctx.output.kv("format", &format!("{:?}", config.logging.format).to_lowercase());

    Ok(())
}

fn init_config(path: &str, force: bool, ctx: &Context) -> Result<()> {
    let config_path = ctx.resolve_path(path);

    if config_path.exists() && !force {
        bail!(
            "Config file already exists: {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    if config_path.extension().is_some_and(|e| e == "json") {
        TillConfig::default().save(&config_path)?;
    } else {
        std::fs::write(&config_path, generate_default_config())?;
    }
    ctx.output.success(&format!("Created: {}", config_path.display()));

    Ok(())
}

fn validate_config(ctx: &Context) -> Result<()> {
    ctx.output.header("Validating configuration");
    if ctx.config_path.is_none() {
        ctx.output.warn("No config file found; checking defaults");
    }

    let (errors, warnings) = ctx.config.problems();

    if errors.is_empty() && warnings.is_empty() {
        ctx.output.success("Configuration is valid");
        return Ok(());
    }

    for error in &errors {
        ctx.output.error(&format!("Error: {}", error));
    }

    for warning in &warnings {
        ctx.output.warn(&format!("Warning: {}", warning));
    }

    if !errors.is_empty() {
        bail!("Configuration has {} error(s)", errors.len());
    }

    ctx.output.success("Configuration is valid (with warnings)");

    Ok(())
}
