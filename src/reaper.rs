use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::model::{Ms, now_ms};
use crate::service::BookingService;
use crate::store::{Repository, Store};

/// Background task that periodically drops long-expired unpaid bookings.
/// Returns immediately when `retention_ms` is zero.
pub async fn run_reaper<R: Repository>(
    service: Arc<BookingService<R>>,
    every: Duration,
    retention_ms: Ms,
) {
    if retention_ms <= 0 {
        info!("stale booking reaper disabled");
        return;
    }
    let mut interval = tokio::time::interval(every);
    loop {
        interval.tick().await;
        match service.purge_stale(now_ms(), retention_ms).await {
            Ok(0) => {}
            Ok(n) => info!("reaped {n} stale bookings"),
            Err(e) => warn!("reaper pass failed: {e}"),
        }
    }
}

/// Background task that compacts the WAL once enough appends pile up.
pub async fn run_compactor(store: Arc<Store>, threshold: u64) {
    let mut interval = tokio::time::interval(Duration::from_secs(60));
    loop {
        interval.tick().await;
        let appends = store.appends_since_compact().await;
        if appends < threshold {
            continue;
        }
        match store.compact().await {
            Ok(()) => debug!("compacted WAL after {appends} appends"),
            Err(e) => warn!("WAL compaction failed: {e}"),
        }
    }
}
