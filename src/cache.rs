//! Cache of the last collection cycle.
//!
//! The `/metrics` handler serves whatever is in here; a refresh replaces the
//! families wholesale so a scrape never sees a half-built cycle.

use prometheus::proto::MetricFamily;
use std::time::Instant;

/// Families of the last completed cycle plus update timing.
#[derive(Clone, Default)]
pub struct MetricsCache {
    pub families: Vec<MetricFamily>,
    pub last_updated: Option<Instant>,
    pub update_duration_seconds: f64,
    pub update_success: bool,
    pub is_updating: bool,
}

impl MetricsCache {
    /// Whether the cache is older than `ttl_secs` (or was never filled).
    pub fn is_stale(&self, ttl_secs: u64) -> bool {
        match self.last_updated {
            Some(at) => at.elapsed().as_secs() >= ttl_secs,
            None => true,
        }
    }

    pub fn sample_count(&self) -> usize {
        self.families.iter().map(|f| f.get_metric().len()).sum()
    }
}
