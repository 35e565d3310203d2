//! CLI configuration.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tillbook_commerce::config::LedgerSettings;

/// File names searched for, in order, from the working directory up.
pub const CONFIG_NAMES: [&str; 3] = ["tillbook.toml", ".tillbook.toml", "tillbook.json"];

/// CLI configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TillConfig {
    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub checkout: CheckoutConfig,

    #[serde(default)]
    pub stock: StockConfig,

    #[serde(default)]
    pub report: ReportConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl TillConfig {
    /// Load config from a file. `.json` files are read as JSON, anything
    /// else as TOML.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        if is_json(path) {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display()))
        } else {
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse TOML config: {}", path.display()))
        }
    }

    /// Save config to a file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = if is_json(path) {
            serde_json::to_string_pretty(self)?
        } else {
            toml::to_string_pretty(self)?
        };

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))
    }

    /// Settings handed to the domain services.
    pub fn ledger_settings(&self) -> LedgerSettings {
        LedgerSettings {
            transaction_prefix: self.checkout.transaction_prefix.clone(),
            shopping_prefix: self.checkout.shopping_prefix.clone(),
            low_stock_threshold: self.stock.low_stock_threshold,
            top_n: self.report.top_n,
        }
    }

    /// Problems that make the config unusable, then ones worth a warning.
    pub fn problems(&self) -> (Vec<String>, Vec<String>) {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        if self.store.path.trim().is_empty() {
            errors.push("store.path is required".to_string());
        }
        if self.store.timeout_ms == 0 {
            errors.push("store.timeout_ms must be greater than zero".to_string());
        } else if self.store.timeout_ms < 100 {
            warnings.push(format!(
                "store.timeout_ms {} is very short; slow disks will time out",
                self.store.timeout_ms
            ));
        }
        if self.checkout.transaction_prefix.trim().is_empty() {
            errors.push("checkout.transaction_prefix is required".to_string());
        }
        if self.checkout.shopping_prefix.trim().is_empty() {
            errors.push("checkout.shopping_prefix is required".to_string());
        }
        if self.stock.low_stock_threshold < 0 {
            errors.push("stock.low_stock_threshold must not be negative".to_string());
        }
        if self.report.top_n == 0 {
            warnings.push("report.top_n is 0; reports will list no top sellers".to_string());
        }
        if let Err(e) = tracing_subscriber::EnvFilter::try_new(&self.logging.level) {
            errors.push(format!("logging.level '{}' is not a valid filter: {e}", self.logging.level));
        }

        (errors, warnings)
    }
}

fn is_json(path: &Path) -> bool {
    path.extension().is_some_and(|e| e == "json")
}

/// Backing store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Data file, relative to the working directory.
    #[serde(default = "default_store_path")]
    pub path: String,

    /// Budget for each store call, in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_store_path() -> String {
    "tillbook-data.json".to_string()
}

fn default_timeout_ms() -> u64 {
    10_000
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

/// Identifier prefixes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutConfig {
    #[serde(default = "default_prefix")]
    pub transaction_prefix: String,

    #[serde(default = "default_prefix")]
    pub shopping_prefix: String,
}

fn default_prefix() -> String {
    "RTN".to_string()
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            transaction_prefix: default_prefix(),
            shopping_prefix: default_prefix(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockConfig {
    /// Quantities below this show as low.
    #[serde(default = "default_low_stock_threshold")]
    pub low_stock_threshold: i64,
}

fn default_low_stock_threshold() -> i64 {
    10
}

impl Default for StockConfig {
    fn default() -> Self {
        Self {
            low_stock_threshold: default_low_stock_threshold(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Top sellers listed per report.
    #[serde(default = "default_top_n")]
    pub top_n: usize,
}

fn default_top_n() -> usize {
    5
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            top_n: default_top_n(),
        }
    }
}

/// Log output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive, e.g. `info` or `tillbook_commerce=debug`.
    /// `RUST_LOG` takes precedence.
    #[serde(default = "default_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,
}

fn default_level() -> String {
    "warn".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: LogFormat::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Generate a default tillbook.toml.
pub fn generate_default_config() -> String {
    r#"# Tillbook configuration

[store]
path = "tillbook-data.json"
timeout_ms = 10000

[checkout]
transaction_prefix = "RTN"
shopping_prefix = "RTN"

[stock]
low_stock_threshold = 10

[report]
top_n = 5

[logging]
# Overridden by RUST_LOG.
level = "warn"
format = "pretty"
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_config_parses_to_defaults() {
        let parsed: TillConfig = toml::from_str(&generate_default_config()).unwrap();
        assert_eq!(parsed, TillConfig::default());
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let parsed: TillConfig = toml::from_str("[stock]\nlow_stock_threshold = 3\n").unwrap();
        assert_eq!(parsed.stock.low_stock_threshold, 3);
        assert_eq!(parsed.store.timeout_ms, 10_000);
        assert_eq!(parsed.ledger_settings().low_stock_threshold, 3);
        assert_eq!(parsed.ledger_settings().top_n, 5);
    }

    #[test]
    fn test_json_config_round_trip_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tillbook.json");
        let mut config = TillConfig::default();
        config.logging.format = LogFormat::Json;
        config.save(&path).unwrap();

        let loaded = TillConfig::load(&path).unwrap();
        assert_eq!(loaded.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_problems() {
        let mut config = TillConfig::default();
        assert_eq!(config.problems(), (vec![], vec![]));

        config.store.timeout_ms = 0;
        config.report.top_n = 0;
        let (errors, warnings) = config.problems();
        assert_eq!(errors.len(), 1);
        assert_eq!(warnings.len(), 1);
    }
}
