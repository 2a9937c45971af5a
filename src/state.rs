//! Application state management for the exporter.
//!
//! This module defines the shared application state that is passed
//! to HTTP handlers and used by the cache refresh.

use hadoop_jmx_exporter::{DaemonCollector, ScrapeStats};
use prometheus::{Gauge, GaugeVec, Opts, Registry};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{Mutex, RwLock};

use crate::cache::MetricsCache;
use crate::config::Config;

/// Type alias for shared application state.
pub type SharedState = Arc<AppState>;

/// Global application state shared across requests and background tasks.
pub struct AppState {
    pub registry: Registry,
    pub scrape_duration: Gauge,
    pub cache_update_duration: Gauge,
    pub cache_update_success: Gauge,
    pub cache_updating: Gauge,
    /// Configured or discovered targets per daemon category.
    pub targets: GaugeVec,
    pub cache: Arc<RwLock<MetricsCache>>,
    /// One lock per collector; a collector keeps per-cycle discovery state.
    pub collectors: Vec<Arc<Mutex<DaemonCollector>>>,
    pub config: Arc<Config>,
    pub scrape_stats: Arc<ScrapeStats>,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    /// Creates the self-metrics, registers them and wraps the collectors.
    pub fn new(
        config: Config,
        collectors: Vec<DaemonCollector>,
        scrape_stats: Arc<ScrapeStats>,
    ) -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let scrape_duration = Gauge::new(
            "hadoop_exporter_scrape_duration_seconds",
            "Time spent serving /metrics request (reading from cache)",
        )?;
        let cache_update_duration = Gauge::new(
            "hadoop_exporter_cache_update_duration_seconds",
            "Time spent polling all JMX targets in the last refresh",
        )?;
        let cache_update_success = Gauge::new(
            "hadoop_exporter_cache_update_success",
            "Whether the last cache update was successful (1) or failed (0)",
        )?;
        let cache_updating = Gauge::new(
            "hadoop_exporter_cache_updating",
            "Whether cache update is currently in progress (1) or idle (0)",
        )?;
        let targets = GaugeVec::new(
            Opts::new("hadoop_exporter_targets", "Number of JMX targets per daemon category"),
            &["category"],
        )?;

        registry.register(Box::new(scrape_duration.clone()))?;
        registry.register(Box::new(cache_update_duration.clone()))?;
        registry.register(Box::new(cache_update_success.clone()))?;
        registry.register(Box::new(cache_updating.clone()))?;
        registry.register(Box::new(targets.clone()))?;

        Ok(Self {
            registry,
            scrape_duration,
            cache_update_duration,
            cache_update_success,
            cache_updating,
            targets,
            cache: Arc::new(RwLock::new(MetricsCache::default())),
            collectors: collectors.into_iter().map(|c| Arc::new(Mutex::new(c))).collect(),
            config: Arc::new(config),
            scrape_stats,
            start_time: Instant::now(),
        })
    }
}
