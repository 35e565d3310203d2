//! CLI execution context.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, Result};
use tillbook_service::PosService;
use tillbook_store::{JsonFileStore, StoreTimeouts, TimedStore};

use crate::config::{TillConfig, CONFIG_NAMES};
use crate::output::Output;

/// Execution context for CLI commands.
pub struct Context {
    pub config: TillConfig,
    /// File the config came from, if any.
    pub config_path: Option<PathBuf>,
    pub output: Output,
    pub cwd: PathBuf,
    /// Skip confirmation prompts.
    pub assume_yes: bool,
}

impl Context {
    /// Load context from the given config file, or the nearest one found.
    pub fn load(config_path: Option<&str>, output: Output, assume_yes: bool) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current directory")?;

        let (config, config_path) = match config_path {
            Some(path) => {
                let path = cwd.join(path);
                (TillConfig::load(&path)?, Some(path))
            }
            None => match Self::find_config(&cwd) {
                Some((path, config)) => (config, Some(path)),
                None => (TillConfig::default(), None),
            },
        };

        Ok(Self {
            config,
            config_path,
            output,
            cwd,
            assume_yes,
        })
    }

    /// Find config file in directory tree.
    fn find_config(start: &Path) -> Option<(PathBuf, TillConfig)> {
        let mut current = start.to_path_buf();
        loop {
            for name in &CONFIG_NAMES {
                let config_path = current.join(name);
                if config_path.exists() {
                    if let Ok(config) = TillConfig::load(&config_path) {
                        return Some((config_path, config));
                    }
                }
            }

            if !current.pop() {
                break;
            }
        }

        None
    }

    /// Resolve a path relative to the working directory.
    pub fn resolve_path(&self, path: &str) -> PathBuf {
        if PathBuf::from(path).is_absolute() {
            PathBuf::from(path)
        } else {
            self.cwd.join(path)
        }
    }

    /// Data file of the store. A relative `store.path` is taken from the
    /// directory of the config file, so every subdirectory sees the same
    /// data.
    pub fn store_path(&self) -> PathBuf {
        let base = self
            .config_path
            .as_deref()
            .and_then(Path::parent)
            .unwrap_or(&self.cwd);
        base.join(&self.config.store.path)
    }

    /// Open the store and wire up the services.
    pub async fn service(&self) -> Result<PosService> {
        let path = self.store_path();
        let store = JsonFileStore::open(&path)
            .await
            .with_context(|| format!("Failed to open store: {}", path.display()))?;
        let timeouts = StoreTimeouts::uniform(Duration::from_millis(self.config.store.timeout_ms));
        let store = TimedStore::new(store, timeouts);

        tracing::debug!(path = %path.display(), timeout_ms = self.config.store.timeout_ms, "store opened");
        Ok(PosService::new(Arc::new(store), self.config.ledger_settings()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(config_path: Option<PathBuf>, cwd: &Path) -> Context {
        Context {
            config: TillConfig::default(),
            config_path,
            output: Output::new(false, true),
            cwd: cwd.to_path_buf(),
            assume_yes: true,
        }
    }

    #[test]
    fn test_store_path_follows_config_dir() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("reports").join("may");
        std::fs::create_dir_all(&nested).unwrap();
        let config_file = dir.path().join("tillbook.toml");
        std::fs::write(&config_file, crate::config::generate_default_config()).unwrap();

        let (found, config) = Context::find_config(&nested).unwrap();
        assert_eq!(found, config_file);
        let ctx = Context {
            config,
            ..context(Some(found), &nested)
        };
        assert_eq!(ctx.store_path(), dir.path().join("tillbook-data.json"));
    }

    #[test]
    fn test_store_path_without_config_uses_cwd() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(None, dir.path());
        assert_eq!(ctx.store_path(), dir.path().join("tillbook-data.json"));

        let mut ctx = context(Some(dir.path().join("tillbook.toml")), Path::new("/elsewhere"));
        ctx.config.store.path = "/var/lib/till.json".to_string();
        assert_eq!(ctx.store_path(), PathBuf::from("/var/lib/till.json"));
    }
}
