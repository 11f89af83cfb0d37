// Threshold rules: snapshot + thresholds -> issue candidates. Pure.

use crate::models::{
    BYTES_PER_GB, IssueCandidate, IssueKind, MetricSnapshot, Severity, ThresholdConfig,
};

/// Evaluates every rule independently; a snapshot crossing all thresholds
/// yields one candidate per rule. Rules whose input is absent are skipped.
pub fn evaluate(snapshot: &MetricSnapshot, thresholds: &ThresholdConfig) -> Vec<IssueCandidate> {
    let mut candidates = Vec::new();

    if let Some(cpu) = percent(snapshot.cpu_usage_percent)
        && cpu > thresholds.high_cpu_percent
    {
        candidates.push(candidate(
            IssueKind::HighCpu,
            Severity::Medium,
            "CPU usage is high",
            format!("CPU usage is at {:.1}%, which may slow down your system.", cpu),
            "Show Details",
        ));
    }

    if let Some(temp) = snapshot.cpu_temperature_celsius.filter(|t| t.is_finite())
        && temp > thresholds.high_temperature_celsius
    {
        candidates.push(candidate(
            IssueKind::HighTemperature,
            Severity::Medium,
            "CPU temperature is high",
            format!(
                "CPU temperature is at {:.1}°C, which is above the recommended limit.",
                temp
            ),
            "Show Details",
        ));
    }

    if let Some(mem) = percent(snapshot.memory_usage_percent)
        && mem > thresholds.high_memory_percent
    {
        candidates.push(candidate(
            IssueKind::HighMemory,
            Severity::Medium,
            "Memory usage is high",
            format!("Memory usage is at {:.1}%, which may slow down your system.", mem),
            "Fix Now",
        ));
    }

    if let Some(disk) = snapshot.disk
        && disk.available_bytes < thresholds.low_disk_space_bytes
    {
        let gb = disk.available_bytes as f64 / BYTES_PER_GB;
        candidates.push(candidate(
            IssueKind::LowDiskSpace,
            Severity::High,
            "Disk space is low",
            format!(
                "You have {:.1} GB of free disk space remaining, which is below the recommended minimum.",
                gb
            ),
            "Fix Now",
        ));
    }

    if snapshot.network_connected == Some(false) {
        candidates.push(candidate(
            IssueKind::NetworkDisconnected,
            Severity::High,
            "Network is disconnected",
            "Your computer is not connected to any network. Check your network settings or Wi-Fi connection.".to_string(),
            "Network Settings",
        ));
    }

    if snapshot.restart_pending == Some(true) {
        candidates.push(candidate(
            IssueKind::WindowsUpdateAvailable,
            Severity::High,
            "Restart required to complete updates",
            "Updates have been installed that require a restart to complete installation."
                .to_string(),
            "Restart Now",
        ));
    }

    candidates
}

/// Kinds whose inputs were present in the snapshot, i.e. the rules that
/// actually ran. An issue of any other kind cannot be judged recovered.
pub fn evaluated_kinds(snapshot: &MetricSnapshot) -> Vec<IssueKind> {
    let mut kinds = Vec::new();
    if percent(snapshot.cpu_usage_percent).is_some() {
        kinds.push(IssueKind::HighCpu);
    }
    if snapshot
        .cpu_temperature_celsius
        .is_some_and(|t| t.is_finite())
    {
        kinds.push(IssueKind::HighTemperature);
    }
    if percent(snapshot.memory_usage_percent).is_some() {
        kinds.push(IssueKind::HighMemory);
    }
    if snapshot.disk.is_some() {
        kinds.push(IssueKind::LowDiskSpace);
    }
    if snapshot.network_connected.is_some() {
        kinds.push(IssueKind::NetworkDisconnected);
    }
    if snapshot.restart_pending.is_some() {
        kinds.push(IssueKind::WindowsUpdateAvailable);
    }
    kinds
}

fn percent(v: Option<f64>) -> Option<f64> {
    v.filter(|p| p.is_finite()).map(|p| p.clamp(0.0, 100.0))
}

fn candidate(
    kind: IssueKind,
    severity: Severity,
    title: &str,
    description: String,
    action: &str,
) -> IssueCandidate {
    IssueCandidate {
        kind,
        severity,
        title: title.to_string(),
        description,
        recommended_action_label: action.to_string(),
    }
}
