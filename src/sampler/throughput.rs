// Byte-counter deltas between consecutive network samples.

use std::collections::HashMap;
use std::time::Instant;

use super::{InterfaceCounters, NetworkReading};
use crate::models::{AdapterThroughput, Throughput};

#[derive(Debug, Clone)]
struct Baseline {
    interface: String,
    bytes_received: u64,
    bytes_sent: u64,
    at: Instant,
}

/// Holds the previous `(received, sent, instant)` per interface. The first
/// update after construction or `reset` yields no rates.
#[derive(Debug, Default)]
pub struct ThroughputTracker {
    baseline: Option<Baseline>,
    adapters: HashMap<String, (u64, u64, Instant)>,
}

impl ThroughputTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.baseline = None;
        self.adapters.clear();
    }

    /// Interface whose counters drive the aggregate rate. Sticks to the
    /// baseline interface while it stays up.
    fn pick_active<'a>(&self, reading: &'a NetworkReading) -> Option<&'a InterfaceCounters> {
        if let Some(ref b) = self.baseline
            && let Some(current) = reading
                .interfaces
                .iter()
                .find(|i| i.is_up && i.name == b.interface)
        {
            return Some(current);
        }
        reading.busiest_up_interface()
    }

    pub fn update(
        &mut self,
        reading: &NetworkReading,
        now: Instant,
    ) -> (Option<Throughput>, Vec<AdapterThroughput>) {
        let throughput = match self.pick_active(reading) {
            None => {
                self.baseline = None;
                None
            }
            Some(active) => {
                let rate = match self.baseline {
                    Some(ref b) if b.interface == active.name => rates(
                        (b.bytes_received, b.bytes_sent, b.at),
                        (active.bytes_received, active.bytes_sent, now),
                    )
                    .map(|(down, up)| Throughput {
                        interface: active.name.clone(),
                        download_bytes_per_sec: down,
                        upload_bytes_per_sec: up,
                    }),
                    Some(ref b) => {
                        tracing::debug!(
                            previous = %b.interface,
                            current = %active.name,
                            "active interface changed; throughput baseline reset"
                        );
                        None
                    }
                    None => None,
                };
                self.baseline = Some(Baseline {
                    interface: active.name.clone(),
                    bytes_received: active.bytes_received,
                    bytes_sent: active.bytes_sent,
                    at: now,
                });
                rate
            }
        };

        let mut adapters = Vec::new();
        for iface in &reading.interfaces {
            if let Some(&(rx, tx, at)) = self.adapters.get(&iface.name)
                && let Some((down, up)) =
                    rates((rx, tx, at), (iface.bytes_received, iface.bytes_sent, now))
            {
                adapters.push(AdapterThroughput {
                    name: iface.name.clone(),
                    is_up: iface.is_up,
                    download_bytes_per_sec: down,
                    upload_bytes_per_sec: up,
                });
            }
        }
        self.adapters = reading
            .interfaces
            .iter()
            .map(|i| (i.name.clone(), (i.bytes_received, i.bytes_sent, now)))
            .collect();

        (throughput, adapters)
    }
}

/// Bytes/sec between two counter readings. `None` when no time elapsed or a
/// counter went backwards (driver reset or wrap).
fn rates(prev: (u64, u64, Instant), current: (u64, u64, Instant)) -> Option<(f64, f64)> {
    let dt_secs = current.2.saturating_duration_since(prev.2).as_secs_f64();
    if dt_secs <= 0.0 || current.0 < prev.0 || current.1 < prev.1 {
        return None;
    }
    Some((
        (current.0 - prev.0) as f64 / dt_secs,
        (current.1 - prev.1) as f64 / dt_secs,
    ))
}
