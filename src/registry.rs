// Active issue registry: one entry per kind, insertion-ordered.
// Writers are the poll cycle and fix acknowledgements; readers are UI clients.
// Events are published while the write lock is held; broadcast sends never block.

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;

use crate::models::{HealthStatus, Issue, IssueCandidate, IssueEvent, IssueKind, ResolveReason};

pub const DEFAULT_EVENT_CAPACITY: usize = 64;

pub struct IssueRegistry {
    issues: RwLock<Vec<Issue>>,
    events: broadcast::Sender<IssueEvent>,
}

impl Default for IssueRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

impl IssueRegistry {
    pub fn new(event_capacity: usize) -> Self {
        let (events, _) = broadcast::channel(event_capacity.max(1));
        Self {
            issues: RwLock::new(Vec::new()),
            events,
        }
    }

    /// Receives `Detected` for new issues and `Resolved` for removals made
    /// after subscribing.
    pub fn subscribe(&self) -> broadcast::Receiver<IssueEvent> {
        self.events.subscribe()
    }

    pub fn upsert(&self, candidate: IssueCandidate) -> bool {
        self.upsert_at(candidate, Utc::now())
    }

    /// Inserts a new issue, or refreshes the description and `last_updated_at`
    /// of the existing one with the same kind. Returns true when inserted.
    pub fn upsert_at(&self, candidate: IssueCandidate, now: DateTime<Utc>) -> bool {
        let mut issues = self.write();
        if let Some(existing) = issues.iter_mut().find(|i| i.kind == candidate.kind) {
            existing.description = candidate.description;
            existing.last_updated_at = now;
            return false;
        }
        let issue = Issue::from_candidate(candidate, now);
        issues.push(issue.clone());
        tracing::warn!(
            kind = %issue.kind,
            severity = ?issue.severity,
            "New issue detected: {} - {}",
            issue.title,
            issue.description
        );
        // Sent under the write lock so subscribers see events in mutation order.
        self.publish(IssueEvent::Detected { issue });
        true
    }

    /// Fix acknowledged. Idempotent: returns false and changes nothing when
    /// no issue of that kind is active.
    pub fn remove(&self, kind: IssueKind) -> bool {
        let mut issues = self.write();
        let Some(idx) = issues.iter().position(|i| i.kind == kind) else {
            return false;
        };
        issues.remove(idx);
        tracing::info!(kind = %kind, "issue removed after fix request");
        self.publish(IssueEvent::Resolved {
            kind,
            reason: ResolveReason::Acknowledged,
        });
        true
    }

    /// Removes issues whose rule ran this cycle (`evaluated`) without firing
    /// (`detected`). Returns the kinds removed.
    pub fn clear_resolved(&self, evaluated: &[IssueKind], detected: &[IssueKind]) -> Vec<IssueKind> {
        let mut issues = self.write();
        let cleared: Vec<IssueKind> = issues
            .iter()
            .map(|i| i.kind)
            .filter(|k| evaluated.contains(k) && !detected.contains(k))
            .collect();
        issues.retain(|i| !cleared.contains(&i.kind));
        for &kind in &cleared {
            tracing::info!(kind = %kind, "issue condition cleared");
            self.publish(IssueEvent::Resolved {
                kind,
                reason: ResolveReason::Recovered,
            });
        }
        cleared
    }

    /// Copy of the active issues in detection order.
    pub fn active_issues(&self) -> Vec<Issue> {
        self.read().clone()
    }

    pub fn get(&self, kind: IssueKind) -> Option<Issue> {
        self.read().iter().find(|i| i.kind == kind).cloned()
    }

    pub fn has_issues(&self) -> bool {
        !self.read().is_empty()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        !self.has_issues()
    }

    pub fn health_status(&self) -> HealthStatus {
        HealthStatus::from_issues(&self.read())
    }

    fn publish(&self, event: IssueEvent) {
        if self.events.send(event).is_err() {
            tracing::trace!(operation = "publish_issue_event", "no issue event subscribers");
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<Issue>> {
        self.issues.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<Issue>> {
        self.issues.write().unwrap_or_else(PoisonError::into_inner)
    }
}
