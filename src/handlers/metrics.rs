//! Metrics endpoint handler for Prometheus scraping.
//!
//! This module provides the `/metrics` endpoint handler. It serves the cached
//! families of the last collection cycle plus the exporter's own gauges, and
//! starts a refresh in the background when the cache is older than `cache_ttl`.

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use prometheus::{Encoder, TextEncoder};
use std::time::Instant;
use tracing::{debug, error, instrument};

use crate::config::DEFAULT_CACHE_TTL;
use crate::state::SharedState;

/// Buffer capacity for metrics encoding.
const BUFFER_CAP: usize = 512 * 1024;

/// Error type for metrics endpoint failures.
#[derive(Debug)]
pub enum MetricsError {
    EncodingFailed,
}

impl IntoResponse for MetricsError {
    fn into_response(self) -> axum::response::Response {
        (StatusCode::INTERNAL_SERVER_ERROR, "Failed to encode metrics").into_response()
    }
}

/// Handler for the /metrics endpoint.
#[instrument(skip(state))]
pub async fn metrics_handler(State(state): State<SharedState>) -> Result<String, MetricsError> {
    let start = Instant::now();
    debug!("Processing /metrics request");

    let ttl = state.config.cache_ttl.unwrap_or(DEFAULT_CACHE_TTL);

    // Fire-and-forget refresh; this request is answered from the current cache.
    let should_trigger_update = {
        let cache = state.cache.read().await;
        !cache.is_updating && cache.is_stale(ttl)
    };

    if should_trigger_update {
        debug!("Triggering on-demand cache update");
        let state_clone = state.clone();
        tokio::spawn(async move {
            if let Err(e) = crate::cache_updater::update_cache(&state_clone).await {
                error!("On-demand cache update failed: {}", e);
            }
        });
    } else {
        debug!("Cache update already in progress or recently updated, serving cached data");
    }

    let mut families = {
        let cache = state.cache.read().await;
        state.cache_update_duration.set(cache.update_duration_seconds);
        state
            .cache_update_success
            .set(if cache.update_success { 1.0 } else { 0.0 });
        state.cache_updating.set(if cache.is_updating { 1.0 } else { 0.0 });
        cache.families.clone()
    };

    state.scrape_stats.record_metrics_endpoint_call();
    state.scrape_duration.set(start.elapsed().as_secs_f64());
    families.extend(state.registry.gather());

    let mut buffer = Vec::with_capacity(BUFFER_CAP);
    let encoder = TextEncoder::new();

    if let Err(e) = encoder.encode(&families, &mut buffer) {
        error!("Failed to encode Prometheus metrics: {}", e);
        return Err(MetricsError::EncodingFailed);
    }

    debug!(
        "Metrics request completed: {} families, {} bytes, {:.3}ms",
        families.len(),
        buffer.len(),
        start.elapsed().as_secs_f64() * 1000.0
    );

    String::from_utf8(buffer).map_err(|_| MetricsError::EncodingFailed)
}
