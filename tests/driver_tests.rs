// Polling driver tests: start/stop lifecycle, cycle effects on the registry, events

mod common;

use common::{FakeSource, FakeState, healthy_state, network, thresholds};
use healthwatch::driver::{DriverConfig, PollingDriver};
use healthwatch::models::*;
use healthwatch::registry::IssueRegistry;
use healthwatch::sampler::{FallbackMode, MetricSampler, SamplerConfig};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::TryRecvError;

fn driver_with(
    state: FakeState,
    sample_interval: Duration,
    auto_clear_on_recovery: bool,
) -> (Arc<PollingDriver>, Arc<FakeSource>) {
    let source = FakeSource::new(state);
    let sampler = MetricSampler::new(
        source.clone(),
        SamplerConfig {
            source_timeout: Duration::from_millis(200),
            fallback: FallbackMode::Omit,
            max_stale_cycles: 0,
        },
    );
    let driver = PollingDriver::new(
        sampler,
        Arc::new(IssueRegistry::default()),
        thresholds(90.0, 80.0, 85.0, 15),
        DriverConfig {
            sample_interval,
            auto_clear_on_recovery,
            stats_log_interval: Duration::from_secs(3600),
            snapshot_capacity: 8,
        },
    );
    (Arc::new(driver), source)
}

#[tokio::test]
async fn stop_right_after_start_produces_no_issues_or_events() {
    let mut state = healthy_state();
    state.cpu = Some(99.0);
    let (driver, _source) = driver_with(state, Duration::from_millis(200), true);
    let mut events = driver.registry().subscribe();

    assert!(driver.start().await);
    assert!(driver.stop().await);

    assert_eq!(driver.cycles_total(), 0);
    assert!(driver.registry().is_empty());
    assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));
}

#[tokio::test]
async fn start_and_stop_are_noops_when_already_in_that_state() {
    let (driver, _source) = driver_with(healthy_state(), Duration::from_secs(5), true);

    assert!(!driver.stop().await);
    assert!(driver.start().await);
    assert!(driver.is_running().await);
    assert!(!driver.start().await);
    assert!(driver.stop().await);
    assert!(!driver.is_running().await);
    assert!(!driver.stop().await);
}

#[tokio::test]
async fn timer_runs_cycles_until_stopped() {
    let mut state = healthy_state();
    state.cpu = Some(97.0);
    let (driver, _source) = driver_with(state, Duration::from_millis(20), true);

    driver.start().await;
    tokio::time::sleep(Duration::from_millis(200)).await;
    driver.stop().await;

    let cycles = driver.cycles_total();
    assert!(cycles >= 1, "expected at least one cycle, got {}", cycles);
    let cpu = driver
        .registry()
        .get(IssueKind::HighCpu)
        .expect("HighCpu detected by timer cycle");
    assert!(cpu.description.contains("97.0%"));

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(driver.cycles_total(), cycles, "cycles ran after stop");
}

#[tokio::test]
async fn network_disconnect_then_reconnect_round_trip() {
    let (driver, source) = driver_with(healthy_state(), Duration::from_secs(5), true);
    let mut events = driver.registry().subscribe();

    let report = driver.poll_once().await;
    assert!(report.detected.is_empty());
    assert!(driver.registry().is_empty());

    source.set(|s| s.network = Some(network(&[("eth0", 1_000, 500, false)])));
    let report = driver.poll_once().await;
    assert_eq!(report.detected, vec![IssueKind::NetworkDisconnected]);
    assert_eq!(report.new_issues, 1);
    let issue = driver
        .registry()
        .get(IssueKind::NetworkDisconnected)
        .expect("disconnected issue");
    assert_eq!(issue.severity, Severity::High);
    match events.try_recv().unwrap() {
        IssueEvent::Detected { issue } => assert_eq!(issue.kind, IssueKind::NetworkDisconnected),
        other => panic!("expected Detected, got {:?}", other),
    }

    // Still disconnected: refreshed, not re-announced.
    let report = driver.poll_once().await;
    assert_eq!(report.new_issues, 0);
    assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));

    source.set(|s| s.network = Some(network(&[("eth0", 2_000, 900, true)])));
    let report = driver.poll_once().await;
    assert_eq!(report.cleared, vec![IssueKind::NetworkDisconnected]);
    assert!(driver.registry().is_empty());
    match events.try_recv().unwrap() {
        IssueEvent::Resolved { kind, reason } => {
            assert_eq!(kind, IssueKind::NetworkDisconnected);
            assert_eq!(reason, ResolveReason::Recovered);
        }
        other => panic!("expected Resolved, got {:?}", other),
    }
}

#[tokio::test]
async fn issues_persist_without_auto_clear() {
    let mut state = healthy_state();
    state.cpu = Some(95.0);
    let (driver, source) = driver_with(state, Duration::from_secs(5), false);

    driver.poll_once().await;
    source.set(|s| s.cpu = Some(5.0));
    let report = driver.poll_once().await;

    assert!(report.cleared.is_empty());
    assert!(driver.registry().get(IssueKind::HighCpu).is_some());
}

#[tokio::test]
async fn unavailable_metric_keeps_existing_issue() {
    let mut state = healthy_state();
    state.temperature = Some(92.0);
    let (driver, source) = driver_with(state, Duration::from_secs(5), true);

    driver.poll_once().await;
    assert!(driver.registry().get(IssueKind::HighTemperature).is_some());

    source.set(|s| s.temperature = None);
    let report = driver.poll_once().await;
    assert!(report.snapshot.cpu_temperature_celsius.is_none());
    assert!(report.cleared.is_empty());
    assert!(driver.registry().get(IssueKind::HighTemperature).is_some());
}

#[tokio::test]
async fn acknowledged_issue_returns_on_next_cycle_if_condition_holds() {
    let mut state = healthy_state();
    state.memory = Some(93.0);
    let (driver, _source) = driver_with(state, Duration::from_secs(5), true);

    driver.poll_once().await;
    assert!(driver.registry().remove(IssueKind::HighMemory));
    assert!(driver.registry().is_empty());

    let report = driver.poll_once().await;
    assert_eq!(report.new_issues, 1);
    assert!(driver.registry().get(IssueKind::HighMemory).is_some());
}

#[tokio::test]
async fn update_thresholds_validates_and_applies_next_cycle() {
    let mut state = healthy_state();
    state.cpu = Some(70.0);
    let (driver, _source) = driver_with(state, Duration::from_secs(5), true);

    assert!(driver.poll_once().await.detected.is_empty());

    let err = driver
        .update_thresholds(thresholds(0.0, 80.0, 85.0, 15))
        .unwrap_err();
    assert!(err.to_string().contains("high_cpu_percent"));
    assert_eq!(driver.thresholds().high_cpu_percent, 90.0);

    driver
        .update_thresholds(thresholds(60.0, 80.0, 85.0, 15))
        .expect("valid thresholds");
    let report = driver.poll_once().await;
    assert_eq!(report.detected, vec![IssueKind::HighCpu]);
}

#[tokio::test]
async fn snapshots_are_broadcast_each_cycle() {
    let (driver, _source) = driver_with(healthy_state(), Duration::from_secs(5), true);
    let mut rx = driver.subscribe_snapshots();

    driver.poll_once().await;
    let snapshot = rx.try_recv().expect("snapshot after cycle");
    assert_eq!(snapshot.cpu_usage_percent, Some(10.0));
    assert_eq!(snapshot.network_connected, Some(true));
}
