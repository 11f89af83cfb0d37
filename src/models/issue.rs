// Issue, severity and issue event models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Dedup key of an issue: at most one active issue per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IssueKind {
    HighCpu,
    HighTemperature,
    HighMemory,
    LowDiskSpace,
    NetworkDisconnected,
    WindowsUpdateAvailable,
}

impl IssueKind {
    pub const ALL: [IssueKind; 6] = [
        IssueKind::HighCpu,
        IssueKind::HighTemperature,
        IssueKind::HighMemory,
        IssueKind::LowDiskSpace,
        IssueKind::NetworkDisconnected,
        IssueKind::WindowsUpdateAvailable,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IssueKind::HighCpu => "HighCpu",
            IssueKind::HighTemperature => "HighTemperature",
            IssueKind::HighMemory => "HighMemory",
            IssueKind::LowDiskSpace => "LowDiskSpace",
            IssueKind::NetworkDisconnected => "NetworkDisconnected",
            IssueKind::WindowsUpdateAvailable => "WindowsUpdateAvailable",
        }
    }
}

impl std::fmt::Display for IssueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown issue kind: {0}")]
pub struct UnknownIssueKind(pub String);

impl std::str::FromStr for IssueKind {
    type Err = UnknownIssueKind;

    /// Case-insensitive; also accepts the short action tags used by UI buttons.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        let kind = match lower.as_str() {
            "highcpu" => IssueKind::HighCpu,
            "hightemperature" => IssueKind::HighTemperature,
            "highmemory" => IssueKind::HighMemory,
            "lowdiskspace" | "diskspace" => IssueKind::LowDiskSpace,
            "networkdisconnected" => IssueKind::NetworkDisconnected,
            "windowsupdateavailable" | "windowsupdate" => IssueKind::WindowsUpdateAvailable,
            _ => return Err(UnknownIssueKind(s.to_string())),
        };
        Ok(kind)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// A detection produced by the evaluator, not yet merged into the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueCandidate {
    pub kind: IssueKind,
    pub severity: Severity,
    pub title: String,
    pub description: String,
    pub recommended_action_label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub kind: IssueKind,
    pub severity: Severity,
    pub title: String,
    pub description: String,
    pub recommended_action_label: String,
    pub first_detected_at: DateTime<Utc>,
    pub last_updated_at: DateTime<Utc>,
}

impl Issue {
    pub fn from_candidate(candidate: IssueCandidate, now: DateTime<Utc>) -> Self {
        Self {
            kind: candidate.kind,
            severity: candidate.severity,
            title: candidate.title,
            description: candidate.description,
            recommended_action_label: candidate.recommended_action_label,
            first_detected_at: now,
            last_updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResolveReason {
    /// Removed by the UI after a fix was requested.
    Acknowledged,
    /// Condition no longer held on a completed poll cycle.
    Recovered,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum IssueEvent {
    Detected { issue: Issue },
    Resolved { kind: IssueKind, reason: ResolveReason },
}

/// Overall summary shown next to the issue list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthStatus {
    Good,
    Fair,
    NeedsAttention,
}

impl HealthStatus {
    pub fn from_issues(issues: &[Issue]) -> Self {
        match issues.iter().map(|i| i.severity).max() {
            None => HealthStatus::Good,
            Some(s) if s >= Severity::High => HealthStatus::NeedsAttention,
            Some(_) => HealthStatus::Fair,
        }
    }
}
