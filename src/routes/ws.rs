// WebSocket handlers: issue events and metric snapshots

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use bytes::Bytes;
use serde::Serialize;
use tokio::sync::broadcast;
use tokio::time::{Duration, timeout};

use super::AppState;

pub(super) const WS_PING_INTERVAL: Duration = Duration::from_secs(30);
pub(super) const WS_SEND_TIMEOUT: Duration = Duration::from_secs(10);

pub(super) async fn ws_issues(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let driver = state.driver.clone();
    ws.on_upgrade(move |socket| async move {
        // Subscribe before reading the current list so nothing falls in between.
        let mut rx = driver.registry().subscribe();
        let active_list = || {
            serde_json::json!({ "type": "active", "issues": driver.registry().active_issues() })
        };
        // Events are deltas; after a lag the client gets the full list again.
        let resync = || Some(active_list());
        if let Err(e) = stream(socket, active_list(), &mut rx, "issues", resync).await {
            tracing::info!("Issue stream error: {}", e);
        }
    })
}

pub(super) async fn ws_metrics(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let driver = state.driver.clone();
    ws.on_upgrade(move |socket| async move {
        let mut rx = driver.subscribe_snapshots();
        let welcome = serde_json::json!({ "type": "thresholds", "thresholds": driver.thresholds() });
        if let Err(e) = stream(socket, welcome, &mut rx, "metrics", || None).await {
            tracing::info!("Metrics stream error: {}", e);
        }
    })
}

/// Sends `value` as a text frame. `Ok(false)` means the client is gone.
async fn send_json<T: Serialize>(socket: &mut WebSocket, value: &T) -> anyhow::Result<bool> {
    let json = serde_json::to_string(value)?;
    let r = timeout(WS_SEND_TIMEOUT, socket.send(Message::Text(json.into()))).await;
    Ok(matches!(r, Ok(Ok(()))))
}

/// Forwards `rx` to the socket after `welcome`. When the receiver lags,
/// `resync` may supply a message that replaces the skipped items.
async fn stream<T: Serialize + Clone>(
    mut socket: WebSocket,
    welcome: serde_json::Value,
    rx: &mut broadcast::Receiver<T>,
    topic: &'static str,
    resync: impl Fn() -> Option<serde_json::Value>,
) -> anyhow::Result<()> {
    tracing::info!(topic, "Client connected to stream");
    if !send_json(&mut socket, &welcome).await? {
        return Ok(());
    }

    let mut ping_interval = tokio::time::interval(WS_PING_INTERVAL);
    ping_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            result = rx.recv() => {
                match result {
                    Ok(item) => {
                        if !send_json(&mut socket, &item).await? {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(topic, "WebSocket client lagged, skipped {} messages", n);
                        if let Some(state) = resync()
                            && !send_json(&mut socket, &state).await?
                        {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            _ = ping_interval.tick() => {
                let r = timeout(WS_SEND_TIMEOUT, socket.send(Message::Ping(Bytes::new()))).await;
                if !matches!(r, Ok(Ok(()))) {
                    break;
                }
            }
        }
    }
    tracing::info!(topic, "Client disconnected from stream");
    Ok(())
}
