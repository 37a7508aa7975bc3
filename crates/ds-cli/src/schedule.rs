//! Prize schedule files.

use std::path::Path;

use anyhow::{Context, Result};
use ds_raffle::RaffleConfig;

/// Read a [`RaffleConfig`] from `.json`, or YAML for any other extension.
pub fn read_raffle_config(path: &Path) -> Result<RaffleConfig> {
    let bytes = std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("").to_ascii_lowercase();
    let cfg: RaffleConfig = if ext == "json" {
        serde_json::from_slice(&bytes).with_context(|| format!("invalid JSON in {}", path.display()))?
    } else {
        serde_yaml_ng::from_slice(&bytes).with_context(|| format!("invalid YAML in {}", path.display()))?
    };
    tracing::debug!(path = %path.display(), prizes = cfg.prizes.len(), "loaded prize schedule");
    Ok(cfg)
}
