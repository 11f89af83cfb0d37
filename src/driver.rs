// Polling driver: periodic sample -> evaluate -> registry cycle.
// Stopped -> Running -> Stopped; stop() joins the task so an in-flight cycle
// finishes and nothing touches the registry after it returns.

use crate::evaluator;
use crate::models::{IssueKind, MetricSnapshot, ThresholdConfig};
use crate::registry::IssueRegistry;
use crate::sampler::MetricSampler;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tokio::sync::{broadcast, oneshot};
use tokio::time::{Duration, Instant, MissedTickBehavior, interval, interval_at};
use tracing::Instrument;

/// Rate limit for "no snapshot subscribers" logging.
const NO_RECEIVERS_LOG_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct DriverConfig {
    pub sample_interval: Duration,
    /// Remove issues whose condition no longer holds on a completed cycle.
    pub auto_clear_on_recovery: bool,
    /// How often to log driver stats at INFO.
    pub stats_log_interval: Duration,
    pub snapshot_capacity: usize,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            sample_interval: Duration::from_secs(2),
            auto_clear_on_recovery: true,
            stats_log_interval: Duration::from_secs(60),
            snapshot_capacity: 16,
        }
    }
}

/// Outcome of one poll cycle.
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub snapshot: MetricSnapshot,
    pub detected: Vec<IssueKind>,
    pub new_issues: usize,
    pub cleared: Vec<IssueKind>,
}

struct Shared {
    sampler: MetricSampler,
    registry: Arc<IssueRegistry>,
    thresholds: RwLock<ThresholdConfig>,
    snapshot_tx: broadcast::Sender<MetricSnapshot>,
    auto_clear_on_recovery: bool,
    /// Serializes cycles from the timer task and `poll_once`.
    cycle_lock: tokio::sync::Mutex<()>,
    cycles_total: AtomicU64,
    last_no_receivers_log: Mutex<Option<Instant>>,
}

struct Running {
    shutdown_tx: oneshot::Sender<()>,
    handle: tokio::task::JoinHandle<()>,
}

pub struct PollingDriver {
    shared: Arc<Shared>,
    sample_interval: Duration,
    stats_log_interval: Duration,
    running: tokio::sync::Mutex<Option<Running>>,
}

impl PollingDriver {
    pub fn new(
        sampler: MetricSampler,
        registry: Arc<IssueRegistry>,
        thresholds: ThresholdConfig,
        config: DriverConfig,
    ) -> Self {
        let (snapshot_tx, _) = broadcast::channel(config.snapshot_capacity.max(1));
        Self {
            shared: Arc::new(Shared {
                sampler,
                registry,
                thresholds: RwLock::new(thresholds),
                snapshot_tx,
                auto_clear_on_recovery: config.auto_clear_on_recovery,
                cycle_lock: tokio::sync::Mutex::new(()),
                cycles_total: AtomicU64::new(0),
                last_no_receivers_log: Mutex::new(None),
            }),
            sample_interval: config.sample_interval,
            stats_log_interval: config.stats_log_interval,
            running: tokio::sync::Mutex::new(None),
        }
    }

    pub fn registry(&self) -> &Arc<IssueRegistry> {
        &self.shared.registry
    }

    pub fn thresholds(&self) -> ThresholdConfig {
        self.shared
            .thresholds
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replaces the thresholds; takes effect from the next cycle.
    pub fn update_thresholds(&self, thresholds: ThresholdConfig) -> anyhow::Result<()> {
        thresholds.validate()?;
        tracing::info!(?thresholds, "thresholds updated");
        *self
            .shared
            .thresholds
            .write()
            .unwrap_or_else(PoisonError::into_inner) = thresholds;
        Ok(())
    }

    pub fn subscribe_snapshots(&self) -> broadcast::Receiver<MetricSnapshot> {
        self.shared.snapshot_tx.subscribe()
    }

    pub fn cycles_total(&self) -> u64 {
        self.shared.cycles_total.load(Ordering::Relaxed)
    }

    pub async fn is_running(&self) -> bool {
        self.running
            .lock()
            .await
            .as_ref()
            .is_some_and(|r| !r.handle.is_finished())
    }

    /// Begins polling; the first cycle runs one interval from now. Returns
    /// false (and does nothing) if already running.
    pub async fn start(&self) -> bool {
        let mut running = self.running.lock().await;
        if running.as_ref().is_some_and(|r| !r.handle.is_finished()) {
            return false;
        }
        self.shared.sampler.reset();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let handle = spawn(
            self.shared.clone(),
            self.sample_interval,
            self.stats_log_interval,
            shutdown_rx,
        );
        *running = Some(Running {
            shutdown_tx,
            handle,
        });
        tracing::info!(
            sample_interval_ms = self.sample_interval.as_millis() as u64,
            "polling started"
        );
        true
    }

    /// Stops polling and waits for an in-flight cycle to finish. Returns
    /// false if it was not running.
    pub async fn stop(&self) -> bool {
        let mut running = self.running.lock().await;
        let Some(Running {
            shutdown_tx,
            handle,
        }) = running.take()
        else {
            return false;
        };
        let _ = shutdown_tx.send(());
        if let Err(e) = handle.await {
            tracing::warn!(error = %e, operation = "stop", "polling task ended abnormally");
        }
        tracing::info!("polling stopped");
        true
    }

    /// Runs a single cycle now, outside the timer.
    pub async fn poll_once(&self) -> CycleReport {
        self.shared.run_cycle().await
    }
}

impl Drop for PollingDriver {
    fn drop(&mut self) {
        if let Some(running) = self.running.get_mut().take() {
            let _ = running.shutdown_tx.send(());
        }
    }
}

fn spawn(
    shared: Arc<Shared>,
    sample_interval: Duration,
    stats_log_interval: Duration,
    mut shutdown_rx: oneshot::Receiver<()>,
) -> tokio::task::JoinHandle<()> {
    let span = tracing::span!(
        tracing::Level::DEBUG,
        "driver",
        sample_interval_ms = sample_interval.as_millis() as u64
    );
    tokio::spawn(
        async move {
            // Overruns push the next tick back instead of queueing catch-up ticks.
            let mut tick = interval_at(Instant::now() + sample_interval, sample_interval);
            tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut stats_log_tick = interval(stats_log_interval);
            stats_log_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    biased;
                    _ = &mut shutdown_rx => {
                        tracing::debug!("Polling driver shutting down");
                        break;
                    }
                    _ = tick.tick() => {
                        shared.run_cycle().await;
                    }
                    _ = stats_log_tick.tick() => {
                        tracing::info!(
                            cycles_total = shared.cycles_total.load(Ordering::Relaxed),
                            active_issues = shared.registry.len(),
                            snapshot_subscribers = shared.snapshot_tx.receiver_count(),
                            "driver stats"
                        );
                    }
                }
            }
        }
        .instrument(span),
    )
}

impl Shared {
    async fn run_cycle(&self) -> CycleReport {
        let _cycle = self.cycle_lock.lock().await;

        let snapshot = self.sampler.sample().await;
        let thresholds = self
            .thresholds
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        let candidates = evaluator::evaluate(&snapshot, &thresholds);
        let detected: Vec<IssueKind> = candidates.iter().map(|c| c.kind).collect();
        let new_issues = candidates
            .into_iter()
            .map(|c| self.registry.upsert(c))
            .filter(|inserted| *inserted)
            .count();

        let cleared = if self.auto_clear_on_recovery {
            self.registry
                .clear_resolved(&evaluator::evaluated_kinds(&snapshot), &detected)
        } else {
            Vec::new()
        };

        if self.snapshot_tx.send(snapshot.clone()).is_err() {
            let mut last = self
                .last_no_receivers_log
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if last.is_none_or(|t| t.elapsed() >= NO_RECEIVERS_LOG_INTERVAL) {
                tracing::debug!(
                    operation = "broadcast_snapshot",
                    "No snapshot subscribers; broadcast channel has no receivers"
                );
                *last = Some(Instant::now());
            }
        }

        self.cycles_total.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(
            detected = detected.len(),
            new_issues,
            cleared = cleared.len(),
            "poll cycle complete"
        );

        CycleReport {
            snapshot,
            detected,
            new_issues,
            cleared,
        }
    }
}
