//! Engine settings loaded from an optional YAML file
//!
//! Every field has a default so the CLI works out of the box; a settings
//! file only needs to override what it changes.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default settings file name (looked up in the working directory)
pub const DEFAULT_SETTINGS_FILE: &str = "papertrade.yaml";

/// Cash deposited into a ledger when an account first trades
pub const DEFAULT_STARTING_CASH: u64 = 100_000;

/// Top-level engine settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Initial cash deposit for a newly created ledger
    pub starting_cash: Decimal,
    /// How often the pending-order sweep runs, in seconds
    pub sweep_interval_secs: u64,
    /// Market data source settings
    pub oracle: OracleSettings,
}

/// Market data source settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleSettings {
    /// Base URL of the quote provider, or "static" for the in-memory
    /// offline source (no quotes until prices are seeded)
    pub base_url: String,
    /// Bound on any single quote fetch; a timeout is treated as a fetch failure
    pub timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            starting_cash: Decimal::from(DEFAULT_STARTING_CASH),
            sweep_interval_secs: 30,
            oracle: OracleSettings::default(),
        }
    }
}

impl Default for OracleSettings {
    fn default() -> Self {
        Self {
            base_url: "https://query1.finance.yahoo.com".to_string(),
            timeout_secs: 10,
        }
    }
}

impl Settings {
    /// Load settings from the given file, or defaults if it doesn't exist
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => Path::new(DEFAULT_SETTINGS_FILE).to_path_buf(),
        };

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)
            .context(format!("Failed to read settings file: {:?}", path))?;
        let settings: Settings = serde_yaml::from_str(&content)
            .context(format!("Failed to parse settings file: {:?}", path))?;
        Ok(settings)
    }
}
