use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::driver::DriverConfig;
use crate::models::ThresholdConfig;
use crate::sampler::{FallbackMode, SamplerConfig};

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub monitoring: MonitoringConfig,
    #[serde(default)]
    pub thresholds: ThresholdConfig,
    #[serde(default)]
    pub publishing: PublishingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonitoringConfig {
    #[serde(default = "default_sample_interval_ms")]
    pub sample_interval_ms: u64,
    /// Upper bound for a single metric read; a slower source counts as unavailable.
    #[serde(default = "default_source_timeout_ms")]
    pub source_timeout_ms: u64,
    /// How often to log driver stats (cycles, active issues, subscribers) at INFO level.
    #[serde(default = "default_stats_log_interval_secs")]
    pub stats_log_interval_secs: u64,
    /// Volume to watch for free space; unset watches the system volume.
    #[serde(default)]
    pub disk_mount: Option<PathBuf>,
    #[serde(default)]
    pub fallback: FallbackMode,
    #[serde(default = "default_max_stale_cycles")]
    pub max_stale_cycles: u32,
    #[serde(default = "default_auto_clear_on_recovery")]
    pub auto_clear_on_recovery: bool,
}

fn default_sample_interval_ms() -> u64 {
    2000
}

fn default_source_timeout_ms() -> u64 {
    1500
}

fn default_stats_log_interval_secs() -> u64 {
    60
}

fn default_max_stale_cycles() -> u32 {
    3
}

fn default_auto_clear_on_recovery() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct PublishingConfig {
    /// Max number of snapshots / issue events buffered per channel (slow WS clients may lag).
    #[serde(default = "default_broadcast_capacity")]
    pub broadcast_capacity: usize,
}

fn default_broadcast_capacity() -> usize {
    16
}

impl Default for PublishingConfig {
    fn default() -> Self {
        Self {
            broadcast_capacity: default_broadcast_capacity(),
        }
    }
}

impl MonitoringConfig {
    pub fn sampler_config(&self) -> SamplerConfig {
        SamplerConfig {
            source_timeout: Duration::from_millis(self.source_timeout_ms),
            fallback: self.fallback,
            max_stale_cycles: self.max_stale_cycles,
        }
    }
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        let s = std::fs::read_to_string(&path)?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn driver_config(&self) -> DriverConfig {
        DriverConfig {
            sample_interval: Duration::from_millis(self.monitoring.sample_interval_ms),
            auto_clear_on_recovery: self.monitoring.auto_clear_on_recovery,
            stats_log_interval: Duration::from_secs(self.monitoring.stats_log_interval_secs),
            snapshot_capacity: self.publishing.broadcast_capacity,
        }
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.server.port > 0,
            "server.port must be between 1 and 65535, got {}",
            self.server.port
        );
        anyhow::ensure!(!self.server.host.is_empty(), "server.host must be non-empty");
        anyhow::ensure!(
            self.monitoring.sample_interval_ms > 0,
            "monitoring.sample_interval_ms must be > 0, got {}",
            self.monitoring.sample_interval_ms
        );
        anyhow::ensure!(
            self.monitoring.source_timeout_ms > 0,
            "monitoring.source_timeout_ms must be > 0, got {}",
            self.monitoring.source_timeout_ms
        );
        anyhow::ensure!(
            self.monitoring.source_timeout_ms <= self.monitoring.sample_interval_ms,
            "monitoring.source_timeout_ms ({}) must not exceed monitoring.sample_interval_ms ({})",
            self.monitoring.source_timeout_ms,
            self.monitoring.sample_interval_ms
        );
        anyhow::ensure!(
            self.monitoring.stats_log_interval_secs > 0,
            "monitoring.stats_log_interval_secs must be > 0, got {}",
            self.monitoring.stats_log_interval_secs
        );
        anyhow::ensure!(
            self.publishing.broadcast_capacity > 0,
            "publishing.broadcast_capacity must be > 0, got {}",
            self.publishing.broadcast_capacity
        );
        self.thresholds.validate()?;
        Ok(())
    }
}
