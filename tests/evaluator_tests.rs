// Threshold rule tests: independence, formatting, skipped and malformed inputs

mod common;

use common::{GB, healthy_snapshot, thresholds};
use healthwatch::evaluator::{evaluate, evaluated_kinds};
use healthwatch::models::*;

fn kinds(candidates: &[IssueCandidate]) -> Vec<IssueKind> {
    candidates.iter().map(|c| c.kind).collect()
}

#[test]
fn healthy_snapshot_yields_no_candidates() {
    let out = evaluate(&healthy_snapshot(), &ThresholdConfig::default());
    assert!(out.is_empty(), "unexpected candidates: {:?}", out);
}

#[test]
fn high_cpu_and_low_disk_scenario_yields_exactly_two() {
    let mut s = MetricSnapshot::empty(chrono::Utc::now());
    s.cpu_usage_percent = Some(95.0);
    s.cpu_temperature_celsius = None;
    s.memory_usage_percent = Some(40.0);
    s.disk = Some(DiskSpace {
        available_bytes: 5 * GB,
        total_bytes: 500 * GB,
    });
    s.network_connected = Some(true);

    let out = evaluate(&s, &thresholds(90.0, 80.0, 85.0, 15));
    assert_eq!(kinds(&out), vec![IssueKind::HighCpu, IssueKind::LowDiskSpace]);

    let cpu = &out[0];
    assert_eq!(cpu.severity, Severity::Medium);
    assert!(cpu.description.contains("CPU usage is at 95.0%"));

    let disk = &out[1];
    assert_eq!(disk.severity, Severity::High);
    assert!(disk.description.contains("5.0 GB"));
    assert!(disk.description.contains("free"));
    assert!(disk.description.contains("below"));
    assert!(disk.description.contains("minimum"));
}

#[test]
fn rules_are_independent_when_all_thresholds_are_crossed() {
    let mut s = healthy_snapshot();
    s.cpu_usage_percent = Some(99.0);
    s.cpu_temperature_celsius = Some(95.0);
    s.memory_usage_percent = Some(97.0);
    s.disk = Some(DiskSpace {
        available_bytes: GB,
        total_bytes: 100 * GB,
    });
    s.network_connected = Some(false);

    let out = evaluate(&s, &ThresholdConfig::default());
    assert_eq!(
        kinds(&out),
        vec![
            IssueKind::HighCpu,
            IssueKind::HighTemperature,
            IssueKind::HighMemory,
            IssueKind::LowDiskSpace,
            IssueKind::NetworkDisconnected,
        ]
    );
}

#[test]
fn high_cpu_is_reported_for_every_value_above_threshold() {
    let t = thresholds(90.0, 80.0, 85.0, 15);
    for cpu in [90.1, 91.0, 95.5, 99.9, 100.0] {
        let mut s = healthy_snapshot();
        s.cpu_usage_percent = Some(cpu);
        let out = evaluate(&s, &t);
        assert_eq!(kinds(&out), vec![IssueKind::HighCpu], "cpu = {}", cpu);
    }
}

#[test]
fn values_equal_to_threshold_do_not_trigger() {
    let mut s = healthy_snapshot();
    s.cpu_usage_percent = Some(80.0);
    s.cpu_temperature_celsius = Some(80.0);
    s.memory_usage_percent = Some(85.0);
    s.disk = Some(DiskSpace {
        available_bytes: 15 * GB,
        total_bytes: 100 * GB,
    });
    assert!(evaluate(&s, &ThresholdConfig::default()).is_empty());
}

#[test]
fn temperature_rule_formats_one_decimal() {
    let mut s = healthy_snapshot();
    s.cpu_temperature_celsius = Some(86.25);
    let out = evaluate(&s, &ThresholdConfig::default());
    assert_eq!(kinds(&out), vec![IssueKind::HighTemperature]);
    assert!(out[0].description.contains("86.2°C") || out[0].description.contains("86.3°C"));
    assert_eq!(out[0].severity, Severity::Medium);
}

#[test]
fn memory_rule_uses_fix_now_action() {
    let mut s = healthy_snapshot();
    s.memory_usage_percent = Some(91.04);
    let out = evaluate(&s, &ThresholdConfig::default());
    assert_eq!(kinds(&out), vec![IssueKind::HighMemory]);
    assert!(out[0].description.contains("Memory usage is at 91.0%"));
    assert_eq!(out[0].recommended_action_label, "Fix Now");
}

#[test]
fn absent_metrics_skip_their_rules() {
    let s = MetricSnapshot::empty(chrono::Utc::now());
    assert!(evaluate(&s, &thresholds(1.0, 1.0, 1.0, 1_000)).is_empty());
    assert!(evaluated_kinds(&s).is_empty());
}

#[test]
fn non_finite_readings_are_ignored() {
    let mut s = healthy_snapshot();
    s.cpu_usage_percent = Some(f64::NAN);
    s.cpu_temperature_celsius = Some(f64::INFINITY);
    let out = evaluate(&s, &thresholds(1.0, 1.0, 99.0, 15));
    assert!(out.is_empty(), "unexpected candidates: {:?}", out);
    let evaluated = evaluated_kinds(&s);
    assert!(!evaluated.contains(&IssueKind::HighCpu));
    assert!(!evaluated.contains(&IssueKind::HighTemperature));
}

#[test]
fn out_of_range_percentages_are_clamped() {
    let mut s = healthy_snapshot();
    s.cpu_usage_percent = Some(150.0);
    let out = evaluate(&s, &ThresholdConfig::default());
    assert!(out[0].description.contains("CPU usage is at 100.0%"));

    let mut s = healthy_snapshot();
    s.memory_usage_percent = Some(-20.0);
    assert!(evaluate(&s, &thresholds(80.0, 80.0, 0.5, 15)).is_empty());
}

#[test]
fn disconnected_network_is_high_severity() {
    let mut s = healthy_snapshot();
    s.network_connected = Some(false);
    let out = evaluate(&s, &ThresholdConfig::default());
    assert_eq!(kinds(&out), vec![IssueKind::NetworkDisconnected]);
    assert_eq!(out[0].severity, Severity::High);
    assert_eq!(out[0].recommended_action_label, "Network Settings");

    s.network_connected = None;
    assert!(evaluate(&s, &ThresholdConfig::default()).is_empty());
}

#[test]
fn pending_restart_reports_update_issue() {
    let mut s = healthy_snapshot();
    s.restart_pending = Some(true);
    let out = evaluate(&s, &ThresholdConfig::default());
    assert_eq!(kinds(&out), vec![IssueKind::WindowsUpdateAvailable]);
    assert_eq!(out[0].recommended_action_label, "Restart Now");
}

#[test]
fn evaluated_kinds_covers_every_present_metric() {
    assert_eq!(evaluated_kinds(&healthy_snapshot()), IssueKind::ALL.to_vec());
}
