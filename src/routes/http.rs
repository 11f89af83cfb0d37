// GET/PUT/DELETE handlers: version, issues, health, thresholds

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use super::AppState;
use crate::models::{IssueKind, ThresholdUpdate};

/// GET /version: service name and version (from Cargo.toml at build time).
pub(super) async fn version_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// GET /api/issues: active issues in detection order.
pub(super) async fn list_issues(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.driver.registry().active_issues())
}

/// DELETE /api/issues/{kind}: the UI ran (or launched) the remediation for this issue.
pub(super) async fn acknowledge_issue(
    State(state): State<AppState>,
    Path(kind): Path<String>,
) -> impl IntoResponse {
    let kind = match kind.parse::<IssueKind>() {
        Ok(k) => k,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({ "error": e.to_string() })),
            );
        }
    };
    tracing::info!(kind = %kind, "User requested to fix issue");
    let removed = state.driver.registry().remove(kind);
    (
        StatusCode::OK,
        Json(serde_json::json!({ "kind": kind, "removed": removed })),
    )
}

/// GET /api/health: overall status plus issue count.
pub(super) async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let registry = state.driver.registry();
    let issues = registry.active_issues();
    Json(serde_json::json!({
        "status": crate::models::HealthStatus::from_issues(&issues),
        "hasIssues": !issues.is_empty(),
        "issueCount": issues.len(),
        "running": state.driver.is_running().await,
    }))
}

/// GET /api/thresholds
pub(super) async fn get_thresholds(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.driver.thresholds())
}

/// PUT /api/thresholds: settings collaborator pushes new bounds; applies from the next cycle.
/// Omitted fields keep their current values.
pub(super) async fn put_thresholds(
    State(state): State<AppState>,
    Json(update): Json<ThresholdUpdate>,
) -> impl IntoResponse {
    let thresholds = update.merged_over(&state.driver.thresholds());
    match state.driver.update_thresholds(thresholds) {
        Ok(()) => (StatusCode::OK, Json(serde_json::json!(state.driver.thresholds()))),
        Err(e) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(serde_json::json!({ "error": e.to_string() })),
        ),
    }
}
