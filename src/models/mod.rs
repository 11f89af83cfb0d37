// Domain models: snapshots, thresholds, issues

mod issue;
mod snapshot;
mod thresholds;

pub use issue::{
    HealthStatus, Issue, IssueCandidate, IssueEvent, IssueKind, ResolveReason, Severity,
    UnknownIssueKind,
};
pub use snapshot::{AdapterThroughput, DiskSpace, MetricField, MetricSnapshot, Throughput};
pub use thresholds::{BYTES_PER_GB, ThresholdConfig, ThresholdUpdate};
