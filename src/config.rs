use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use xdg::BaseDirectories;

/// エンジンのチューニング値。デフォルトはテストで検証された値。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Branch-list freshness horizon in seconds.
    pub branch_ttl_secs: u64,
    /// PR/CI status poll cadence in seconds.
    pub poll_interval_secs: u64,
    /// Quiet period after the last keystroke before the visible list is
    /// recomputed, in milliseconds.
    pub debounce_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            branch_ttl_secs: 10,
            poll_interval_secs: 30,
            debounce_ms: 150,
        }
    }
}

impl EngineConfig {
    pub fn branch_ttl(&self) -> Duration {
        Duration::from_secs(self.branch_ttl_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if config_path.exists() {
            let content = fs::read_to_string(&config_path).context("Failed to read config file")?;
            toml::from_str(&content).context("Failed to parse config file")
        } else {
            Ok(Self::default())
        }
    }

    fn config_path() -> PathBuf {
        BaseDirectories::with_prefix("sprig")
            .map(|dirs| dirs.get_config_home().join("config.toml"))
            .unwrap_or_else(|_| PathBuf::from("config.toml"))
    }
}
