// Shared test helpers: scriptable metric source and snapshot builders
#![allow(dead_code)]

use healthwatch::error::SampleError;
use healthwatch::models::{DiskSpace, MetricField, MetricSnapshot, ThresholdConfig};
use healthwatch::sampler::{InterfaceCounters, MetricSource, NetworkReading};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const GB: u64 = 1024 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct FakeState {
    pub cpu: Option<f64>,
    pub temperature: Option<f64>,
    pub memory: Option<f64>,
    pub disk: Option<DiskSpace>,
    pub network: Option<NetworkReading>,
    pub restart_pending: Option<bool>,
    /// Makes `cpu_usage` block this long before answering.
    pub cpu_delay: Option<Duration>,
}

pub fn healthy_state() -> FakeState {
    FakeState {
        cpu: Some(10.0),
        temperature: Some(50.0),
        memory: Some(40.0),
        disk: Some(DiskSpace {
            available_bytes: 200 * GB,
            total_bytes: 500 * GB,
        }),
        network: Some(network(&[("eth0", 1_000, 500, true)])),
        restart_pending: Some(false),
        cpu_delay: None,
    }
}

pub fn network(interfaces: &[(&str, u64, u64, bool)]) -> NetworkReading {
    NetworkReading {
        interfaces: interfaces
            .iter()
            .map(|&(name, rx, tx, is_up)| InterfaceCounters {
                name: name.to_string(),
                bytes_received: rx,
                bytes_sent: tx,
                is_up,
            })
            .collect(),
    }
}

pub struct FakeSource {
    state: Mutex<FakeState>,
    cpu_calls: AtomicUsize,
    cpu_in_flight: AtomicUsize,
    cpu_max_in_flight: AtomicUsize,
}

impl FakeSource {
    pub fn new(state: FakeState) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(state),
            cpu_calls: AtomicUsize::new(0),
            cpu_in_flight: AtomicUsize::new(0),
            cpu_max_in_flight: AtomicUsize::new(0),
        })
    }

    /// Number of `cpu_usage` calls started so far.
    pub fn cpu_calls(&self) -> usize {
        self.cpu_calls.load(Ordering::SeqCst)
    }

    /// Highest number of `cpu_usage` calls running at the same time.
    pub fn cpu_max_in_flight(&self) -> usize {
        self.cpu_max_in_flight.load(Ordering::SeqCst)
    }

    pub fn set(&self, f: impl FnOnce(&mut FakeState)) {
        f(&mut self.state.lock().unwrap());
    }

    fn get(&self) -> FakeState {
        self.state.lock().unwrap().clone()
    }
}

fn missing(field: MetricField) -> SampleError {
    SampleError::unavailable(field, "fake source has no value")
}

impl MetricSource for FakeSource {
    fn cpu_usage(&self) -> Result<f64, SampleError> {
        self.cpu_calls.fetch_add(1, Ordering::SeqCst);
        let running = self.cpu_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.cpu_max_in_flight.fetch_max(running, Ordering::SeqCst);
        let state = self.get();
        if let Some(delay) = state.cpu_delay {
            std::thread::sleep(delay);
        }
        self.cpu_in_flight.fetch_sub(1, Ordering::SeqCst);
        state.cpu.ok_or_else(|| missing(MetricField::CpuUsage))
    }

    fn cpu_temperature(&self) -> Result<f64, SampleError> {
        self.get()
            .temperature
            .ok_or_else(|| missing(MetricField::CpuTemperature))
    }

    fn memory_usage(&self) -> Result<f64, SampleError> {
        self.get()
            .memory
            .ok_or_else(|| missing(MetricField::MemoryUsage))
    }

    fn disk_space(&self) -> Result<DiskSpace, SampleError> {
        self.get().disk.ok_or_else(|| missing(MetricField::DiskSpace))
    }

    fn network(&self) -> Result<NetworkReading, SampleError> {
        self.get().network.ok_or_else(|| missing(MetricField::Network))
    }

    fn restart_pending(&self) -> Result<bool, SampleError> {
        self.get()
            .restart_pending
            .ok_or_else(|| SampleError::unsupported(MetricField::RestartPending))
    }
}

/// Snapshot with every metric present and inside default thresholds.
pub fn healthy_snapshot() -> MetricSnapshot {
    let mut s = MetricSnapshot::empty(chrono::Utc::now());
    s.cpu_usage_percent = Some(10.0);
    s.cpu_temperature_celsius = Some(50.0);
    s.memory_usage_percent = Some(40.0);
    s.disk = Some(DiskSpace {
        available_bytes: 200 * GB,
        total_bytes: 500 * GB,
    });
    s.network_connected = Some(true);
    s.restart_pending = Some(false);
    s
}

pub fn thresholds(cpu: f64, temperature: f64, memory: f64, disk_gb: u64) -> ThresholdConfig {
    ThresholdConfig {
        high_cpu_percent: cpu,
        high_temperature_celsius: temperature,
        high_memory_percent: memory,
        low_disk_space_bytes: disk_gb * GB,
    }
}
