// Per-cycle metric snapshot models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiskSpace {
    pub available_bytes: u64,
    pub total_bytes: u64,
}

/// Byte rates of the active interface between two consecutive samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Throughput {
    pub interface: String,
    pub download_bytes_per_sec: f64,
    pub upload_bytes_per_sec: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdapterThroughput {
    pub name: String,
    pub is_up: bool,
    pub download_bytes_per_sec: f64,
    pub upload_bytes_per_sec: f64,
}

/// Fields a source can fail to deliver in a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MetricField {
    CpuUsage,
    CpuTemperature,
    MemoryUsage,
    DiskSpace,
    Network,
    RestartPending,
}

impl MetricField {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricField::CpuUsage => "cpu_usage",
            MetricField::CpuTemperature => "cpu_temperature",
            MetricField::MemoryUsage => "memory_usage",
            MetricField::DiskSpace => "disk_space",
            MetricField::Network => "network",
            MetricField::RestartPending => "restart_pending",
        }
    }
}

impl std::fmt::Display for MetricField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One point-in-time set of sampled metrics. `None` means the source was
/// unavailable this cycle and no fallback value applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricSnapshot {
    pub timestamp: DateTime<Utc>,
    pub cpu_usage_percent: Option<f64>,
    pub cpu_temperature_celsius: Option<f64>,
    pub memory_usage_percent: Option<f64>,
    pub disk: Option<DiskSpace>,
    pub network_connected: Option<bool>,
    pub throughput: Option<Throughput>,
    #[serde(default)]
    pub adapters: Vec<AdapterThroughput>,
    pub restart_pending: Option<bool>,
    /// Fields carried over from the previous good sample.
    #[serde(default)]
    pub substituted: Vec<MetricField>,
}

impl MetricSnapshot {
    /// Snapshot with every field unavailable.
    pub fn empty(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            cpu_usage_percent: None,
            cpu_temperature_celsius: None,
            memory_usage_percent: None,
            disk: None,
            network_connected: None,
            throughput: None,
            adapters: vec![],
            restart_pending: None,
            substituted: vec![],
        }
    }

    pub fn is_substituted(&self, field: MetricField) -> bool {
        self.substituted.contains(&field)
    }
}
