// HTTP + WebSocket routes for UI clients

mod http;
mod ws;

use axum::{
    Router,
    routing::{delete, get},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::driver::PollingDriver;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) driver: Arc<PollingDriver>,
}

pub fn app(driver: Arc<PollingDriver>) -> Router {
    let state = AppState { driver };
    Router::new()
        .route("/", get(|| async { "healthwatch: system health issue feed" })) // GET /
        .route("/version", get(http::version_handler)) // GET /version
        .route("/api/issues", get(http::list_issues)) // GET /api/issues
        .route("/api/issues/{kind}", delete(http::acknowledge_issue)) // DELETE /api/issues/{kind}
        .route("/api/health", get(http::health_handler)) // GET /api/health
        .route(
            "/api/thresholds",
            get(http::get_thresholds).put(http::put_thresholds),
        ) // GET, PUT /api/thresholds
        .route("/ws/issues", get(ws::ws_issues)) // WS /ws/issues
        .route("/ws/metrics", get(ws::ws_metrics)) // WS /ws/metrics
        .layer(CorsLayer::new().allow_origin(Any))
        .with_state(state)
}
