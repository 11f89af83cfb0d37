// Metric sampling: source reads on the blocking pool, timeouts, fallback.

mod linux;
mod sysinfo_source;
pub mod throughput;

pub use sysinfo_source::SysinfoSource;
pub use throughput::ThroughputTracker;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use serde::Deserialize;
use tracing::instrument;

use crate::error::SampleError;
use crate::models::{DiskSpace, MetricField, MetricSnapshot};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceCounters {
    pub name: String,
    pub bytes_received: u64,
    pub bytes_sent: u64,
    /// Has a routable address.
    pub is_up: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetworkReading {
    pub interfaces: Vec<InterfaceCounters>,
}

impl NetworkReading {
    pub fn connected(&self) -> bool {
        self.interfaces.iter().any(|i| i.is_up)
    }

    /// Up interface with the most cumulative traffic; ties go to the lowest name.
    pub fn busiest_up_interface(&self) -> Option<&InterfaceCounters> {
        self.interfaces.iter().filter(|i| i.is_up).max_by(|a, b| {
            let ta = a.bytes_received.saturating_add(a.bytes_sent);
            let tb = b.bytes_received.saturating_add(b.bytes_sent);
            ta.cmp(&tb).then_with(|| b.name.cmp(&a.name))
        })
    }
}

/// OS-specific metric reads. Each call is synchronous and may block; the
/// sampler runs it on the blocking pool under a timeout.
pub trait MetricSource: Send + Sync + 'static {
    fn cpu_usage(&self) -> Result<f64, SampleError>;
    fn cpu_temperature(&self) -> Result<f64, SampleError>;
    fn memory_usage(&self) -> Result<f64, SampleError>;
    fn disk_space(&self) -> Result<DiskSpace, SampleError>;
    fn network(&self) -> Result<NetworkReading, SampleError>;
    /// Installed updates are waiting for a restart.
    fn restart_pending(&self) -> Result<bool, SampleError>;
}

/// What to do with a field whose source failed this cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackMode {
    /// Leave the field absent; dependent rules are skipped.
    Omit,
    /// Reuse the last good value for a bounded number of cycles.
    #[default]
    Previous,
}

#[derive(Debug, Clone)]
pub struct SamplerConfig {
    pub source_timeout: Duration,
    pub fallback: FallbackMode,
    /// Consecutive failed cycles a previous value may stand in for.
    pub max_stale_cycles: u32,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            source_timeout: Duration::from_millis(1500),
            fallback: FallbackMode::Previous,
            max_stale_cycles: 3,
        }
    }
}

#[derive(Debug)]
struct Held<T> {
    value: Option<T>,
    misses: u32,
}

impl<T> Default for Held<T> {
    fn default() -> Self {
        Self {
            value: None,
            misses: 0,
        }
    }
}

impl<T: Clone> Held<T> {
    /// Returns the value to publish and whether it was substituted.
    fn resolve(&mut self, fresh: Option<T>, config: &SamplerConfig) -> (Option<T>, bool) {
        if let Some(v) = fresh {
            self.value = Some(v.clone());
            self.misses = 0;
            return (Some(v), false);
        }
        self.misses = self.misses.saturating_add(1);
        match (&self.value, config.fallback) {
            (Some(v), FallbackMode::Previous) if self.misses <= config.max_stale_cycles => {
                (Some(v.clone()), true)
            }
            _ => (None, false),
        }
    }
}

#[derive(Debug, Default)]
struct LastGood {
    cpu: Held<f64>,
    temperature: Held<f64>,
    memory: Held<f64>,
    disk: Held<DiskSpace>,
    connected: Held<bool>,
    restart: Held<bool>,
}

/// One slot per `MetricField` variant.
const FIELD_COUNT: usize = 6;

/// Clears a field's in-flight flag when the blocking read finishes, or when
/// the task is dropped without running.
struct InFlightGuard(Arc<AtomicBool>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct MetricSampler {
    source: Arc<dyn MetricSource>,
    config: SamplerConfig,
    throughput: Mutex<ThroughputTracker>,
    last_good: Mutex<LastGood>,
    /// Set while a read for the field is outstanding, including one that
    /// already timed out. At most one blocking read per field at a time.
    in_flight: [Arc<AtomicBool>; FIELD_COUNT],
}

impl MetricSampler {
    pub fn new(source: Arc<dyn MetricSource>, config: SamplerConfig) -> Self {
        Self {
            source,
            config,
            throughput: Mutex::new(ThroughputTracker::new()),
            last_good: Mutex::new(LastGood::default()),
            in_flight: std::array::from_fn(|_| Arc::new(AtomicBool::new(false))),
        }
    }

    /// Forget the throughput baseline and held fallback values. The next
    /// sample carries no throughput.
    pub fn reset(&self) {
        self.throughput
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .reset();
        *self.last_good.lock().unwrap_or_else(PoisonError::into_inner) = LastGood::default();
    }

    /// Takes one snapshot. Never fails: unreadable fields are absent or
    /// substituted according to the fallback policy.
    #[instrument(skip(self), fields(operation = "sample"))]
    pub async fn sample(&self) -> MetricSnapshot {
        let timestamp = chrono::Utc::now();
        let (cpu, temperature, memory, disk, network, restart) = tokio::join!(
            self.read(MetricField::CpuUsage, |s| s.cpu_usage()),
            self.read(MetricField::CpuTemperature, |s| s.cpu_temperature()),
            self.read(MetricField::MemoryUsage, |s| s.memory_usage()),
            self.read(MetricField::DiskSpace, |s| s.disk_space()),
            self.read(MetricField::Network, |s| s.network()),
            self.read(MetricField::RestartPending, |s| s.restart_pending()),
        );

        let cpu = cpu.and_then(|v| sanitize_percent(MetricField::CpuUsage, v));
        let memory = memory.and_then(|v| sanitize_percent(MetricField::MemoryUsage, v));
        let temperature = temperature.filter(|t| t.is_finite());

        let (throughput, adapters) = match network {
            Some(ref reading) => self
                .throughput
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .update(reading, Instant::now()),
            None => (None, vec![]),
        };
        let connected = network.as_ref().map(NetworkReading::connected);

        let mut snapshot = MetricSnapshot::empty(timestamp);
        snapshot.throughput = throughput;
        snapshot.adapters = adapters;

        let mut held = self.last_good.lock().unwrap_or_else(PoisonError::into_inner);
        let config = &self.config;
        let mut substituted = Vec::new();
        let mut mark = |field: MetricField, was: bool| {
            if was {
                substituted.push(field);
            }
        };

        let (v, s) = held.cpu.resolve(cpu, config);
        snapshot.cpu_usage_percent = v;
        mark(MetricField::CpuUsage, s);
        let (v, s) = held.temperature.resolve(temperature, config);
        snapshot.cpu_temperature_celsius = v;
        mark(MetricField::CpuTemperature, s);
        let (v, s) = held.memory.resolve(memory, config);
        snapshot.memory_usage_percent = v;
        mark(MetricField::MemoryUsage, s);
        let (v, s) = held.disk.resolve(disk, config);
        snapshot.disk = v;
        mark(MetricField::DiskSpace, s);
        let (v, s) = held.connected.resolve(connected, config);
        snapshot.network_connected = v;
        mark(MetricField::Network, s);
        let (v, s) = held.restart.resolve(restart, config);
        snapshot.restart_pending = v;
        mark(MetricField::RestartPending, s);
        drop(held);

        if !substituted.is_empty() {
            tracing::debug!(fields = ?substituted, "substituted previous values");
        }
        snapshot.substituted = substituted;
        snapshot
    }

    async fn read<T, F>(&self, field: MetricField, f: F) -> Option<T>
    where
        T: Send + 'static,
        F: FnOnce(&dyn MetricSource) -> Result<T, SampleError> + Send + 'static,
    {
        match self.read_once(field, f).await {
            Ok(v) => Some(v),
            Err(e @ SampleError::Unsupported { .. }) => {
                tracing::debug!(error = %e, operation = "read_metric", metric = %field, "metric source unsupported");
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, operation = "read_metric", metric = %field, "metric source unavailable");
                None
            }
        }
    }

    async fn read_once<T, F>(&self, field: MetricField, f: F) -> Result<T, SampleError>
    where
        T: Send + 'static,
        F: FnOnce(&dyn MetricSource) -> Result<T, SampleError> + Send + 'static,
    {
        let flag = &self.in_flight[field as usize];
        if flag.swap(true, Ordering::AcqRel) {
            return Err(SampleError::unavailable(
                field,
                "previous read has not returned yet",
            ));
        }
        let guard = InFlightGuard(flag.clone());
        let source = self.source.clone();
        let after = self.config.source_timeout;
        let task = tokio::task::spawn_blocking(move || {
            let _guard = guard;
            f(source.as_ref())
        });
        match tokio::time::timeout(after, task).await {
            Ok(Ok(r)) => r,
            Ok(Err(e)) => Err(SampleError::Join {
                field,
                message: e.to_string(),
            }),
            Err(_) => Err(SampleError::TimedOut { field, after }),
        }
    }
}

fn sanitize_percent(field: MetricField, v: f64) -> Option<f64> {
    if !v.is_finite() {
        tracing::warn!(metric = %field, value = v, "discarding non-finite reading");
        return None;
    }
    Some(v.clamp(0.0, 100.0))
}
