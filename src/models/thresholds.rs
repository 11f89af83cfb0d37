// Threshold configuration that turns metrics into issues

use serde::{Deserialize, Serialize};

pub const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThresholdConfig {
    #[serde(default = "default_high_cpu_percent", alias = "high_cpu_percent")]
    pub high_cpu_percent: f64,
    #[serde(default = "default_high_temperature_celsius", alias = "high_temperature_celsius")]
    pub high_temperature_celsius: f64,
    #[serde(default = "default_high_memory_percent", alias = "high_memory_percent")]
    pub high_memory_percent: f64,
    #[serde(default = "default_low_disk_space_bytes", alias = "low_disk_space_bytes")]
    pub low_disk_space_bytes: u64,
}

fn default_high_cpu_percent() -> f64 {
    80.0
}

fn default_high_temperature_celsius() -> f64 {
    80.0
}

fn default_high_memory_percent() -> f64 {
    85.0
}

fn default_low_disk_space_bytes() -> u64 {
    15 * 1024 * 1024 * 1024
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            high_cpu_percent: default_high_cpu_percent(),
            high_temperature_celsius: default_high_temperature_celsius(),
            high_memory_percent: default_high_memory_percent(),
            low_disk_space_bytes: default_low_disk_space_bytes(),
        }
    }
}

impl ThresholdConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.high_cpu_percent > 0.0 && self.high_cpu_percent <= 100.0,
            "thresholds.high_cpu_percent must be in (0, 100], got {}",
            self.high_cpu_percent
        );
        anyhow::ensure!(
            self.high_temperature_celsius > 0.0 && self.high_temperature_celsius.is_finite(),
            "thresholds.high_temperature_celsius must be > 0, got {}",
            self.high_temperature_celsius
        );
        anyhow::ensure!(
            self.high_memory_percent > 0.0 && self.high_memory_percent <= 100.0,
            "thresholds.high_memory_percent must be in (0, 100], got {}",
            self.high_memory_percent
        );
        anyhow::ensure!(
            self.low_disk_space_bytes > 0,
            "thresholds.low_disk_space_bytes must be > 0, got {}",
            self.low_disk_space_bytes
        );
        Ok(())
    }
}

/// Body of a threshold update: fields left out keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThresholdUpdate {
    #[serde(default, alias = "high_cpu_percent")]
    pub high_cpu_percent: Option<f64>,
    #[serde(default, alias = "high_temperature_celsius")]
    pub high_temperature_celsius: Option<f64>,
    #[serde(default, alias = "high_memory_percent")]
    pub high_memory_percent: Option<f64>,
    #[serde(default, alias = "low_disk_space_bytes")]
    pub low_disk_space_bytes: Option<u64>,
}

impl ThresholdUpdate {
    pub fn merged_over(self, current: &ThresholdConfig) -> ThresholdConfig {
        ThresholdConfig {
            high_cpu_percent: self.high_cpu_percent.unwrap_or(current.high_cpu_percent),
            high_temperature_celsius: self
                .high_temperature_celsius
                .unwrap_or(current.high_temperature_celsius),
            high_memory_percent: self.high_memory_percent.unwrap_or(current.high_memory_percent),
            low_disk_space_bytes: self.low_disk_space_bytes.unwrap_or(current.low_disk_space_bytes),
        }
    }
}
