// Metric source backed by sysinfo

use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, TryLockError};
use std::time::Instant;

use sysinfo::{Components, Disks, Networks, System};
use tracing::instrument;

use super::{InterfaceCounters, MetricSource, NetworkReading, linux};
use crate::error::SampleError;
use crate::models::{DiskSpace, MetricField};

struct CpuCache {
    refreshed_at: Instant,
    usage: Option<f64>,
}

pub struct SysinfoSource {
    sys: Mutex<System>,
    disks: Mutex<Disks>,
    networks: Mutex<Networks>,
    cpu_cache: Mutex<CpuCache>,
    disk_mount: Option<PathBuf>,
}

impl SysinfoSource {
    /// `disk_mount` selects the volume to watch; `None` watches the system
    /// volume, or all volumes combined if it cannot be found. Blocks for
    /// `MINIMUM_CPU_UPDATE_INTERVAL` to take the first CPU usage reading.
    pub fn new(disk_mount: Option<PathBuf>) -> Self {
        // CPU usage needs two refreshes at least the minimum interval apart.
        let mut sys = System::new();
        sys.refresh_cpu_all();
        std::thread::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);
        sys.refresh_cpu_all();
        let usage = sys.global_cpu_usage() as f64;
        sys.refresh_memory();
        let disks = Disks::new_with_refreshed_list();
        let networks = Networks::new_with_refreshed_list();
        Self {
            sys: Mutex::new(sys),
            disks: Mutex::new(disks),
            networks: Mutex::new(networks),
            cpu_cache: Mutex::new(CpuCache {
                refreshed_at: Instant::now(),
                usage: Some(usage),
            }),
            disk_mount,
        }
    }
}

impl MetricSource for SysinfoSource {
    #[instrument(skip(self), fields(source = "sysinfo", operation = "cpu_usage"))]
    fn cpu_usage(&self) -> Result<f64, SampleError> {
        let field = MetricField::CpuUsage;
        let mut sys = try_lock(&self.sys, field)?;
        let mut cache = try_lock(&self.cpu_cache, field)?;

        // Usage is measured between two refreshes; called again too soon,
        // return the cached value instead of blocking.
        let now = Instant::now();
        if now.duration_since(cache.refreshed_at) >= sysinfo::MINIMUM_CPU_UPDATE_INTERVAL {
            sys.refresh_cpu_all();
            cache.usage = Some(sys.global_cpu_usage() as f64);
            cache.refreshed_at = now;
        }
        cache
            .usage
            .ok_or_else(|| SampleError::unavailable(field, "no CPU usage baseline yet"))
    }

    #[instrument(skip(self), fields(source = "sysinfo", operation = "cpu_temperature"))]
    fn cpu_temperature(&self) -> Result<f64, SampleError> {
        let components = Components::new_with_refreshed_list();
        let hottest_cpu = components
            .list()
            .iter()
            .filter(|c| is_cpu_sensor(c.label()))
            .filter_map(|c| c.temperature())
            .map(|t| t as f64)
            .filter(|t| t.is_finite() && *t > 0.0)
            .fold(None, |acc: Option<f64>, t| Some(acc.map_or(t, |a| a.max(t))));
        if let Some(t) = hottest_cpu {
            return Ok(t);
        }
        linux::read_thermal_zone_celsius().ok_or_else(|| {
            SampleError::unavailable(MetricField::CpuTemperature, "no CPU temperature sensor")
        })
    }

    #[instrument(skip(self), fields(source = "sysinfo", operation = "memory_usage"))]
    fn memory_usage(&self) -> Result<f64, SampleError> {
        let field = MetricField::MemoryUsage;
        let mut sys = try_lock(&self.sys, field)?;
        sys.refresh_memory();

        let total = sys.total_memory();
        if total == 0 {
            return Err(SampleError::unavailable(field, "total memory reported as 0"));
        }
        let used = total.saturating_sub(sys.available_memory());
        Ok((used as f64 / total as f64) * 100.0)
    }

    #[instrument(skip(self), fields(source = "sysinfo", operation = "disk_space"))]
    fn disk_space(&self) -> Result<DiskSpace, SampleError> {
        let field = MetricField::DiskSpace;
        let mut disks = try_lock(&self.disks, field)?;
        disks.refresh(true);
        let volumes: Vec<(PathBuf, DiskSpace)> = disks
            .list()
            .iter()
            .map(|d| {
                (
                    d.mount_point().to_path_buf(),
                    DiskSpace {
                        available_bytes: d.available_space(),
                        total_bytes: d.total_space(),
                    },
                )
            })
            .collect();
        select_volume(&volumes, self.disk_mount.as_deref())
            .ok_or_else(|| SampleError::unavailable(field, "no matching volume"))
    }

    #[instrument(skip(self), fields(source = "sysinfo", operation = "network"))]
    fn network(&self) -> Result<NetworkReading, SampleError> {
        let mut networks = try_lock(&self.networks, MetricField::Network)?;
        networks.refresh(true);
        let mut interfaces: Vec<InterfaceCounters> = networks
            .list()
            .iter()
            .filter(|(name, _)| !is_loopback_name(name))
            .map(|(name, data)| {
                let addrs: Vec<IpAddr> = data.ip_networks().iter().map(|n| n.addr).collect();
                InterfaceCounters {
                    name: name.clone(),
                    bytes_received: data.total_received(),
                    bytes_sent: data.total_transmitted(),
                    is_up: has_routable_address(&addrs),
                }
            })
            .collect();
        interfaces.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(NetworkReading { interfaces })
    }

    #[instrument(skip(self), fields(source = "sysinfo", operation = "restart_pending"))]
    fn restart_pending(&self) -> Result<bool, SampleError> {
        linux::restart_required().ok_or_else(|| SampleError::unsupported(MetricField::RestartPending))
    }
}

/// A read that finds the lock held (e.g. a hung refresh) fails instead of
/// queueing behind it.
fn try_lock<T>(mutex: &Mutex<T>, field: MetricField) -> Result<MutexGuard<'_, T>, SampleError> {
    mutex.try_lock().map_err(|e| match e {
        TryLockError::WouldBlock => SampleError::unavailable(field, "source busy with another read"),
        TryLockError::Poisoned(_) => SampleError::unavailable(field, "source lock poisoned"),
    })
}

fn is_cpu_sensor(label: &str) -> bool {
    let label = label.to_lowercase();
    ["cpu", "tctl", "tdie", "coretemp", "package", "k10temp"]
        .iter()
        .any(|needle| label.contains(needle))
}

fn is_loopback_name(name: &str) -> bool {
    let lower = name.to_lowercase();
    lower == "lo" || lower.starts_with("lo0") || lower.contains("loopback")
}

/// True if any address is usable beyond the local link.
fn has_routable_address(addrs: &[IpAddr]) -> bool {
    addrs.iter().any(|addr| match addr {
        IpAddr::V4(v4) => !v4.is_loopback() && !v4.is_link_local() && !v4.is_unspecified(),
        IpAddr::V6(v6) => {
            !v6.is_loopback() && !v6.is_unspecified() && (v6.segments()[0] & 0xffc0) != 0xfe80
        }
    })
}

fn system_mount() -> &'static Path {
    if cfg!(windows) {
        Path::new("C:\\")
    } else {
        Path::new("/")
    }
}

/// The configured mount, else the system volume, else all volumes summed.
fn select_volume(volumes: &[(PathBuf, DiskSpace)], mount: Option<&Path>) -> Option<DiskSpace> {
    if let Some(mount) = mount {
        return volumes.iter().find(|(m, _)| m == mount).map(|(_, d)| *d);
    }
    if let Some((_, d)) = volumes.iter().find(|(m, _)| m == system_mount()) {
        return Some(*d);
    }
    if volumes.is_empty() {
        return None;
    }
    Some(volumes.iter().fold(
        DiskSpace {
            available_bytes: 0,
            total_bytes: 0,
        },
        |acc, (_, d)| DiskSpace {
            available_bytes: acc.available_bytes.saturating_add(d.available_bytes),
            total_bytes: acc.total_bytes.saturating_add(d.total_bytes),
        },
    ))
}
