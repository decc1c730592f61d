use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_CACHE_TTL_MS: u64 = 5_000;
const DEFAULT_POLL_INTERVAL_MS: u64 = 1_000;
const DEFAULT_HISTORY_CAPACITY: usize = 600;
const DEFAULT_PORT_LOOKUP_TIMEOUT_MS: u64 = 2_000;
const DEFAULT_THERMAL_BACKOFF_FACTOR: u32 = 2;
const DEFAULT_CANDIDATE_MIN_MEMORY_MB: u64 = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// How long a backend scan stays valid
    pub cache_ttl_ms: u64,
    /// Base delay between two polls
    pub poll_interval_ms: u64,
    /// Snapshots kept in history before the oldest is evicted
    pub history_capacity: usize,
    /// Upper bound on the external port lookup tool
    pub port_lookup_timeout_ms: u64,
    /// Poll interval multiplier under serious or critical thermal pressure
    pub thermal_backoff_factor: u32,
    pub candidate_min_memory_mb: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            cache_ttl_ms: DEFAULT_CACHE_TTL_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            port_lookup_timeout_ms: DEFAULT_PORT_LOOKUP_TIMEOUT_MS,
            thermal_backoff_factor: DEFAULT_THERMAL_BACKOFF_FACTOR,
            candidate_min_memory_mb: DEFAULT_CANDIDATE_MIN_MEMORY_MB,
        }
    }
}

impl MonitorConfig {
    /// Load from the user config directory, falling back to defaults when the
    /// file is missing or unreadable.
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;
        Self::load_from(&config_path)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Self::default());
        }

        let data = fs::read(config_path)
            .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

        if data.is_empty() {
            return Ok(Self::default());
        }

        // A corrupt or outdated file is not fatal
        Ok(serde_json::from_slice(&data).unwrap_or_else(|e| {
            log::warn!("Ignoring unreadable config {:?}: {}", config_path, e);
            Self::default()
        }))
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::get_config_path()?;
        self.save_to(&config_path)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let data = serde_json::to_vec_pretty(self).with_context(|| "Failed to serialize config")?;

        fs::write(config_path, data)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;

        Ok(())
    }

    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir =
            dirs::config_dir().with_context(|| "Could not determine config directory")?;

        Ok(config_dir.join("infermon").join("config.json"))
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn port_lookup_timeout(&self) -> Duration {
        Duration::from_millis(self.port_lookup_timeout_ms)
    }

    pub fn candidate_min_memory_bytes(&self) -> u64 {
        mib_to_bytes(self.candidate_min_memory_mb)
    }
}

/// MiB to bytes, saturating at `u64::MAX`
pub fn mib_to_bytes(mib: u64) -> u64 {
    mib.saturating_mul(1024 * 1024)
}
