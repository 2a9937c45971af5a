//! Scrape statistics for the health endpoint.
//!
//! Tracks per-category scrape outcomes and cycle timings so operators can see
//! which daemon endpoints are failing without reading the logs.

use std::collections::BTreeMap;
use std::fmt::Write as FmtWrite;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, RwLock as StdRwLock};
use std::time::{Instant, SystemTime};

/// Running statistics for a single measurement.
#[derive(Clone, Copy, Default)]
pub struct RunningStat {
    count: u64,
    sum: f64,
    min: f64,
    max: f64,
    last: f64,
}

impl RunningStat {
    pub fn add(&mut self, value: f64) {
        if self.count == 0 {
            *self = Self {
                count: 1,
                sum: value,
                min: value,
                max: value,
                last: value,
            };
            return;
        }
        self.count += 1;
        self.sum += value;
        self.last = value;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }

    pub fn avg(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / (self.count as f64)
        }
    }
}

/// Thread-safe wrapper for running statistics.
#[derive(Default)]
pub struct Stat {
    inner: Mutex<RunningStat>,
}

impl Stat {
    pub fn add_sample(&self, value: f64) {
        if let Ok(mut s) = self.inner.lock() {
            s.add(value);
        }
    }

    /// `(last, avg, max, min, count)`
    pub fn snapshot(&self) -> (f64, f64, f64, f64, u64) {
        if let Ok(s) = self.inner.lock() {
            (s.last, s.avg(), s.max, s.min, s.count)
        } else {
            (0.0, 0.0, 0.0, 0.0, 0)
        }
    }
}

/// Scrape outcome counters of one daemon category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CategoryCounts {
    pub success: u64,
    pub failure: u64,
}

impl CategoryCounts {
    pub fn success_rate(&self) -> f64 {
        let total = self.success + self.failure;
        if total == 0 {
            100.0
        } else {
            (self.success as f64 / total as f64) * 100.0
        }
    }
}

pub struct ScrapeStats {
    categories: Mutex<BTreeMap<String, CategoryCounts>>,
    pub cycle_duration_seconds: Stat,
    pub exported_families: Stat,
    pub total_cycles: AtomicU64,
    pub metrics_endpoint_calls: AtomicU64,
    pub start_time: Instant,
    pub last_cycle_time: StdRwLock<Option<Instant>>,
}

impl Default for ScrapeStats {
    fn default() -> Self {
        Self {
            categories: Mutex::new(BTreeMap::new()),
            cycle_duration_seconds: Stat::default(),
            exported_families: Stat::default(),
            total_cycles: AtomicU64::new(0),
            metrics_endpoint_calls: AtomicU64::new(0),
            start_time: Instant::now(),
            last_cycle_time: StdRwLock::new(None),
        }
    }
}

impl ScrapeStats {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn record_success(&self, category: &str) {
        self.update(category, |c| c.success += 1);
    }

    pub fn record_failure(&self, category: &str) {
        self.update(category, |c| c.failure += 1);
    }

    fn update(&self, category: &str, f: impl FnOnce(&mut CategoryCounts)) {
        if let Ok(mut guard) = self.categories.lock() {
            f(guard.entry(category.to_string()).or_default());
        }
    }

    pub fn category(&self, category: &str) -> CategoryCounts {
        self.categories
            .lock()
            .ok()
            .and_then(|guard| guard.get(category).copied())
            .unwrap_or_default()
    }

    /// Snapshot of all categories, sorted by name.
    pub fn categories(&self) -> Vec<(String, CategoryCounts)> {
        match self.categories.lock() {
            Ok(guard) => guard.iter().map(|(k, v)| (k.clone(), *v)).collect(),
            Err(_) => Vec::new(),
        }
    }

    pub fn record_cycle(&self, duration_seconds: f64, families: u64) {
        self.cycle_duration_seconds.add_sample(duration_seconds);
        self.exported_families.add_sample(families as f64);
        self.total_cycles.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut guard) = self.last_cycle_time.write() {
            *guard = Some(Instant::now());
        }
    }

    pub fn record_metrics_endpoint_call(&self) {
        self.metrics_endpoint_calls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn uptime_hours(&self) -> f64 {
        self.start_time.elapsed().as_secs_f64() / 3600.0
    }

    pub fn last_cycle_time_str(&self) -> String {
        const SECS_PER_DAY: u64 = 86400;
        const SECS_PER_HOUR: u64 = 3600;
        const SECS_PER_MINUTE: u64 = 60;

        if let Ok(guard) = self.last_cycle_time.read() {
            if let Some(last) = *guard {
                let since = last.elapsed();
                if let Ok(now) = SystemTime::now().duration_since(SystemTime::UNIX_EPOCH) {
                    let secs = now.as_secs().saturating_sub(since.as_secs());
                    return format!(
                        "{:02}:{:02}:{:02}",
                        (secs % SECS_PER_DAY) / SECS_PER_HOUR,
                        (secs % SECS_PER_HOUR) / SECS_PER_MINUTE,
                        secs % SECS_PER_MINUTE
                    );
                }
            }
        }
        "N/A".to_string()
    }

    pub fn render_table(&self) -> String {
        let left_col = 26usize;
        let col_w = 12usize;
        let mut out = String::new();

        writeln!(out, "HEALTH ENDPOINT - EXPORTER SCRAPE STATS").ok();
        writeln!(out, "=======================================").ok();
        writeln!(out).ok();

        writeln!(
            out,
            "{:left$} | {:^col$} | {:^col$} | {:^col$} | {:^col$}",
            "",
            "current",
            "average",
            "max",
            "min",
            left = left_col,
            col = col_w
        )
        .ok();

        let (cd_cur, cd_avg, cd_max, cd_min, _) = self.cycle_duration_seconds.snapshot();
        let (ef_cur, ef_avg, ef_max, ef_min, _) = self.exported_families.snapshot();

        writeln!(out).ok();
        writeln!(out, "COLLECTION CYCLES").ok();
        writeln!(out, "-----------------").ok();
        writeln!(
            out,
            "{:left$} | {:^col$} | {:^col$} | {:^col$} | {:^col$}",
            "cycle_duration (s)",
            format!("{:.3}", cd_cur),
            format!("{:.3}", cd_avg),
            format!("{:.3}", cd_max),
            format!("{:.3}", cd_min),
            left = left_col,
            col = col_w
        )
        .ok();
        writeln!(
            out,
            "{:left$} | {:^col$} | {:^col$} | {:^col$} | {:^col$}",
            "exported_families",
            format!("{:.0}", ef_cur),
            format!("{:.1}", ef_avg),
            format!("{:.0}", ef_max),
            format!("{:.0}", ef_min),
            left = left_col,
            col = col_w
        )
        .ok();

        writeln!(out).ok();
        writeln!(out, "SCRAPE TARGETS").ok();
        writeln!(out, "--------------").ok();
        writeln!(
            out,
            "{:left$} | {:^col$} | {:^col$} | {:^col$}",
            "category",
            "success",
            "failure",
            "rate (%)",
            left = left_col,
            col = col_w
        )
        .ok();
        for (category, counts) in self.categories() {
            writeln!(
                out,
                "{:left$} | {:^col$} | {:^col$} | {:^col$}",
                category,
                counts.success,
                counts.failure,
                format!("{:.1}", counts.success_rate()),
                left = left_col,
                col = col_w
            )
            .ok();
        }

        writeln!(out).ok();
        writeln!(
            out,
            "number of cycles: {} | metrics calls: {} | last cycle: {} | uptime: {:.1}h",
            self.total_cycles.load(Ordering::Relaxed),
            self.metrics_endpoint_calls.load(Ordering::Relaxed),
            self.last_cycle_time_str(),
            self.uptime_hours()
        )
        .ok();

        out
    }
}
