//! Engine configuration.
//!
//! Loaded from a TOML file (or built in code for tests); validated before an
//! engine is constructed from it.

use std::fs;
use std::path::Path;

use alloy_primitives::Address;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

/// How many factory entries an automatic (non-paginated) sync ingests at
/// most, the cost-bound analog of a per-call gas budget.
pub const AUTO_SYNC_PAGE: usize = 50;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZapConfig {
    /// Account the engine itself holds transient balances under.
    pub engine_address: Address,

    /// Sole account allowed to call administrative entry points.
    pub owner: Address,

    /// Wrapped form of the native coin; pre-registered as the first
    /// intermediate (hub) asset.
    pub wrapped_native: Address,

    /// Page size for automatic factory syncs.
    #[serde(default = "default_auto_sync_page")]
    pub auto_sync_page: usize,
}

fn default_auto_sync_page() -> usize {
    AUTO_SYNC_PAGE
}

impl ZapConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path.as_ref())
            .with_context(|| format!("reading config {}", path.as_ref().display()))?;
        let config: ZapConfig = toml::from_str(&raw).context("parsing config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.wrapped_native == Address::ZERO {
            bail!("wrapped_native must not be the native sentinel");
        }
        if self.engine_address == Address::ZERO {
            bail!("engine_address must not be the native sentinel");
        }
        if self.auto_sync_page == 0 {
            bail!("auto_sync_page must be > 0");
        }
        Ok(())
    }
}
