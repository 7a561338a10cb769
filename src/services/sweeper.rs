use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;

use crate::services::registry::JobRegistry;

/// Remove jobs that have not changed within `ttl`. Returns the number evicted.
pub fn sweep_once(registry: &JobRegistry, ttl: Duration) -> usize {
    // A TTL too large to represent means nothing can have expired.
    let Some(cutoff) = chrono::Duration::from_std(ttl)
        .ok()
        .and_then(|ttl| Utc::now().checked_sub_signed(ttl))
    else {
        return 0;
    };

    let evicted = registry.evict_older_than(cutoff);
    if evicted > 0 {
        metrics::counter!("scan_jobs_evicted_total").increment(evicted as u64);
        tracing::info!(evicted, remaining = registry.len(), "Expired jobs evicted");
    }
    metrics::gauge!("scan_jobs_tracked").set(registry.len() as f64);
    evicted
}

/// Periodically evict expired jobs for the life of the process.
pub fn spawn_sweeper(
    registry: Arc<JobRegistry>,
    ttl: Duration,
    every: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        // The first tick fires immediately; nothing can have expired yet.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            sweep_once(&registry, ttl);
        }
    })
}
