//! Health check endpoint handler.
//!
//! This module provides the `/health` endpoint handler that returns
//! scrape statistics per daemon category.

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use tracing::{debug, instrument};

use crate::state::SharedState;

// Time conversion constants
const SECONDS_PER_HOUR: f64 = 3600.0;
const MINUTES_PER_HOUR: f64 = 60.0;
const HOURS_PER_DAY: f64 = 24.0;

/// Footer text for human-readable HTTP endpoints.
pub const FOOTER_TEXT: &str = concat!("hadoop-jmx-exporter ", env!("CARGO_PKG_VERSION"));

/// Handler for the /health endpoint.
#[instrument(skip(state))]
pub async fn health_handler(State(state): State<SharedState>) -> impl IntoResponse {
    debug!("Processing /health request");

    let cache = state.cache.read().await;

    let status = if cache.update_success && cache.last_updated.is_some() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let message = if cache.is_updating {
        "OK - Cache updating"
    } else if cache.update_success {
        "OK"
    } else if cache.last_updated.is_none() {
        "No collection cycle completed yet"
    } else {
        "Cache update failed"
    };

    let uptime_str = format_uptime(state.start_time.elapsed().as_secs_f64());
    let table = state.scrape_stats.render_table();

    debug!("Health check: {} - {}", status, message);
    (
        status,
        [("Content-Type", "text/plain; charset=utf-8")],
        format!(
            "{message}\n\nUptime: {uptime_str}\nCached families: {}\nCached samples: {}\n\n{table}\n{FOOTER_TEXT}",
            cache.families.len(),
            cache.sample_count()
        ),
    )
}

fn format_uptime(seconds: f64) -> String {
    let hours = seconds / SECONDS_PER_HOUR;
    if hours < 1.0 {
        format!("{:.1} minutes", hours * MINUTES_PER_HOUR)
    } else if hours < HOURS_PER_DAY {
        format!("{:.1} hours", hours)
    } else {
        format!("{:.1} days", hours / HOURS_PER_DAY)
    }
}
