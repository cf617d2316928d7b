//! Engine configuration
//!
//! Settings come from `arbor.toml` at the project root, then environment
//! variables override individual fields:
//!
//! * `ARBOR_WORKERS`: size of the recompute worker pool
//! * `ARBOR_PARSER_WORKERS`: number of dedicated parser threads
//! * `ARBOR_UPDATE_POLICY`: `always` or `changed`

use std::path::Path;

use arbor_core::UpdatePolicy;
use arbor_indexer::ExtractorRules;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Config file looked up at the project root.
pub const CONFIG_FILE: &str = "arbor.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Recompute worker threads. Defaults to available parallelism.
    pub workers: Option<usize>,
    /// Parser threads. Defaults to available parallelism, at least 2.
    pub parser_workers: Option<usize>,
    pub update_policy: UpdatePolicy,
    pub rules: ExtractorRules,
}

impl EngineConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(EngineError::config)
    }

    /// Load `arbor.toml` from `root` if present, then apply environment
    /// overrides.
    pub fn load(root: &Path) -> Result<Self> {
        let path = root.join(CONFIG_FILE);
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(&path).map_err(|source| EngineError::ConfigIo {
                path: path.clone(),
                source,
            })?;
            tracing::info!("Loaded configuration from {}", path.display());
            Self::from_toml_str(&contents)?
        } else {
            tracing::debug!("No {} at {}, using defaults", CONFIG_FILE, root.display());
            Self::default()
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply `ARBOR_*` overrides read through `lookup`.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(value) = lookup("ARBOR_WORKERS") {
            self.workers = Some(parse_count("ARBOR_WORKERS", &value)?);
        }
        if let Some(value) = lookup("ARBOR_PARSER_WORKERS") {
            self.parser_workers = Some(parse_count("ARBOR_PARSER_WORKERS", &value)?);
        }
        if let Some(value) = lookup("ARBOR_UPDATE_POLICY") {
            self.update_policy = value.parse().map_err(EngineError::Config)?;
        }
        Ok(())
    }

    pub fn worker_count(&self) -> usize {
        self.workers.unwrap_or_else(default_parallelism).max(1)
    }

    pub fn parser_worker_count(&self) -> usize {
        self.parser_workers
            .unwrap_or_else(|| default_parallelism().max(2))
            .max(1)
    }
}

fn default_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(2)
}

fn parse_count(key: &str, value: &str) -> Result<usize> {
    match value.trim().parse::<usize>() {
        Ok(0) | Err(_) => Err(EngineError::Config(format!(
            "{} must be a positive integer, got `{}`",
            key, value
        ))),
        Ok(n) => Ok(n),
    }
}
