use std::sync::Arc;

use tracing::info;

use staybook::config::Config;
use staybook::reaper;
use staybook::service::BookingService;
use staybook::store::Store;

async fn shutdown_signal() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
        tokio::select! {
            r = tokio::signal::ctrl_c() => r?,
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let config = Config::from_env();
    staybook::observability::init(config.metrics_port)?;

    // Ensure data directory exists
    std::fs::create_dir_all(&config.data_dir)?;

    let store = Arc::new(Store::open(config.wal_path())?);
    let service = Arc::new(BookingService::new(store.clone(), config.default_rate));

    info!("staybook calendar ready");
    info!("  data_dir: {}", config.data_dir.display());
    info!("  default rate: {}", config.default_rate);
    info!("  stale retention: {}s", config.stale_retention.as_secs());
    info!("  metrics: {}", config.metrics_port.map_or("disabled".to_string(), |p| format!("http://0.0.0.0:{p}/metrics")));

    let reaper_task = tokio::spawn(reaper::run_reaper(
        service.clone(),
        config.reaper_interval,
        config.stale_retention_ms(),
    ));
    let compactor_task = tokio::spawn(reaper::run_compactor(
        store.clone(),
        config.compact_threshold,
    ));

    shutdown_signal().await?;
    info!("shutdown signal received");

    reaper_task.abort();
    compactor_task.abort();
    // Leave a compact log behind for the next start.
    if let Err(e) = store.compact().await {
        tracing::warn!("final compaction failed: {e}");
    }

    info!("staybook stopped");
    Ok(())
}
