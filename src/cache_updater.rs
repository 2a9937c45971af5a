//! Cache update logic for the metrics exporter.
//!
//! This module provides the cache refresh that is triggered both at startup
//! and on demand by the metrics endpoint. Every daemon collector runs as its own
//! task; the families of all collectors replace the cache in one write.

use prometheus::proto::MetricFamily;
use std::time::Instant;
use tokio::task::JoinSet;
use tracing::{debug, error, info, instrument};

use crate::state::SharedState;

/// Cache update function.
/// This function can be called both at startup and on-demand.
#[instrument(skip(state))]
pub async fn update_cache(state: &SharedState) -> Result<(), Box<dyn std::error::Error>> {
    let start = Instant::now();

    // Check if an update is already in progress - if so, serve stale cache
    {
        let mut cache = state.cache.write().await;
        if cache.is_updating {
            debug!("Cache update already in progress, serving stale cache");
            return Ok(());
        }
        cache.is_updating = true;
        state.cache_updating.set(1.0);
        debug!("Cache marked as updating (old snapshot still available)");
    }

    info!("Starting cache update for {} collectors", state.collectors.len());

    let mut tasks = JoinSet::new();
    for collector in &state.collectors {
        let collector = collector.clone();
        tasks.spawn(async move {
            let mut collector = collector.lock().await;
            let families = collector.collect().await;
            (collector.kind(), collector.targets(), families)
        });
    }

    let mut families: Vec<MetricFamily> = Vec::new();
    let mut failed_tasks = 0usize;
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((kind, targets, collected)) => {
                debug!("{} collector returned {} families", kind, collected.len());
                state
                    .targets
                    .with_label_values(&[kind.service()])
                    .set(targets as f64);
                families.extend(collected);
            }
            Err(e) => {
                error!("Collector task failed: {}", e);
                failed_tasks += 1;
            }
        }
    }
    families.sort_by(|a, b| a.name().cmp(b.name()));

    let family_count = families.len();
    let duration = start.elapsed().as_secs_f64();
    {
        let mut cache = state.cache.write().await;
        cache.families = families;
        cache.update_duration_seconds = duration;
        cache.update_success = failed_tasks == 0;
        cache.last_updated = Some(start);
        cache.is_updating = false;

        state.cache_updating.set(0.0);
    }

    state.scrape_stats.record_cycle(duration, family_count as u64);

    info!(
        "Cache update completed: {} families, {:.2}ms",
        family_count,
        duration * 1000.0
    );

    if failed_tasks > 0 {
        return Err(format!("{} collector tasks failed", failed_tasks).into());
    }
    Ok(())
}
