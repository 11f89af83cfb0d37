use anyhow::Result;
use healthwatch::*;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .init();

    let app_config = config::AppConfig::load()?;

    let disk_mount = app_config.monitoring.disk_mount.clone();
    let source = tokio::task::spawn_blocking(move || sampler::SysinfoSource::new(disk_mount))
        .await
        .map_err(|e| anyhow::anyhow!("sysinfo init: {}", e))?;
    let sampler =
        sampler::MetricSampler::new(Arc::new(source), app_config.monitoring.sampler_config());
    let registry = Arc::new(registry::IssueRegistry::new(
        app_config.publishing.broadcast_capacity,
    ));
    let driver = Arc::new(driver::PollingDriver::new(
        sampler,
        registry.clone(),
        app_config.thresholds.clone(),
        app_config.driver_config(),
    ));

    // Surface the current state right away rather than one interval later.
    driver.poll_once().await;
    driver.start().await;

    let app = routes::app(driver.clone());
    let addr = format!("{}:{}", app_config.server.host, app_config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on http://{}", addr);

    tokio::select! {
        result = axum::serve(listener, app) => {
            result?;
        }
        _ = async {
            #[cfg(unix)]
            {
                let mut sigterm = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                    Ok(s) => s,
                    Err(_) => {
                        let _ = tokio::signal::ctrl_c().await;
                        return;
                    }
                };
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = sigterm.recv() => {}
                }
            }
            #[cfg(not(unix))]
            {
                let _ = tokio::signal::ctrl_c().await;
            }
        } => {
            tracing::info!("Received shutdown signal");
        }
    }

    driver.stop().await;
    tracing::info!(
        cycles_total = driver.cycles_total(),
        active_issues = registry.len(),
        "shut down"
    );
    Ok(())
}
