//! JournalNode rule set.
//!
//! Sync latency percentiles are published per window (`Syncs60s`, `Syncs300s`,
//! `Syncs3600s`) as separate attributes. Each window is folded into one
//! histogram whose buckets are the percentiles and whose `+Inf` bucket is the
//! window's operation count.

use crate::bean::{Bean, PLACEHOLDER};
use crate::engine::{family_key, label_names, FillSink, RuleContext, SubsystemRules};
use crate::family::{CycleFamilies, HistogramValue};
use crate::naming::snake_case;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

const SUBSYSTEM: &str = "JournalNode";

/// Sync windows in seconds.
const WINDOWS: &[u32] = &[60, 300, 3600];

static SYNC_PERCENTILE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^Syncs(\d+)s(\d+)thPercentileLatencyMicros$").expect("valid sync percentile regex")
});
static SYNC_COUNT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^Syncs(\d+)sNumOps$").expect("valid sync count regex"));

pub fn rules() -> Vec<Box<dyn SubsystemRules>> {
    vec![Box::new(JournalRules)]
}

/// A raw JournalNode attribute name, decomposed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum SyncMetric {
    Count { window: u32 },
    Percentile { window: u32, bound: f64 },
    Other,
}

pub(crate) fn classify(metric: &str) -> SyncMetric {
    if let Some(caps) = SYNC_COUNT.captures(metric) {
        if let Ok(window) = caps[1].parse() {
            return SyncMetric::Count { window };
        }
    }
    if let Some(caps) = SYNC_PERCENTILE.captures(metric) {
        if let (Ok(window), Ok(pct)) = (caps[1].parse(), caps[2].parse::<f64>()) {
            return SyncMetric::Percentile {
                window,
                bound: pct / 100.0,
            };
        }
    }
    SyncMetric::Other
}

fn histogram_key(window: u32) -> String {
    family_key(SUBSYSTEM, &format!("Syncs{}", window))
}

#[derive(Default)]
struct Window {
    count: f64,
    percentiles: Vec<(f64, f64)>,
}

struct JournalRules;

impl SubsystemRules for JournalRules {
    fn subsystem(&self) -> &str {
        SUBSYSTEM
    }

    fn matches(&self, bean_name: &str) -> bool {
        bean_name.contains("name=Journal-")
    }

    fn setup(&self, ctx: &RuleContext<'_>, _bean: &Bean, families: &mut CycleFamilies) {
        let Some(schema) = ctx.subsystem(SUBSYSTEM) else {
            return;
        };
        let labels = label_names(&["host"]);
        for (metric, help) in schema.iter() {
            match classify(metric) {
                SyncMetric::Count { window } | SyncMetric::Percentile { window, .. } => {
                    let name = format!("sync{}s_latency_microseconds", window);
                    let help = format!(
                        "The percentile of sync latency in microseconds in {}s granularity.",
                        window
                    );
                    families.declare_histogram(&histogram_key(window), &ctx.name(&[name.as_str()]), &help, &labels);
                }
                SyncMetric::Other => {
                    families.declare_gauge(
                        &family_key(SUBSYSTEM, metric),
                        &ctx.name(&[snake_case(metric).as_str()]),
                        help,
                        &labels,
                    );
                }
            }
        }
    }

    fn fill(&self, ctx: &RuleContext<'_>, bean: &Bean, sink: &mut FillSink<'_>) {
        let host = match bean.get("tag.Hostname").and_then(Value::as_str) {
            Some(host) => host.to_string(),
            None => PLACEHOLDER.to_string(),
        };
        let labels = ctx.labels(&[host]);

        // Catalog gauges are always emitted, zero when the bean lacks them.
        if let Some(schema) = ctx.subsystem(SUBSYSTEM) {
            for metric in schema.names().filter(|m| classify(m) == SyncMetric::Other) {
                sink.add(&family_key(SUBSYSTEM, metric), &labels, bean.number(metric));
            }
        }

        let mut windows: BTreeMap<u32, Window> = BTreeMap::new();
        let attributes = bean
            .keys()
            .filter(|key| key.chars().next().is_some_and(char::is_uppercase));
        for metric in attributes {
            match classify(metric) {
                SyncMetric::Count { window } => windows.entry(window).or_default().count = bean.number(metric),
                SyncMetric::Percentile { window, bound } => windows
                    .entry(window)
                    .or_default()
                    .percentiles
                    .push((bound, bean.number(metric))),
                SyncMetric::Other => {
                    if !sink.is_declared(&family_key(SUBSYSTEM, metric)) {
                        debug!("JournalNode attribute '{}' is not in the catalog, skipping", metric);
                    }
                }
            }
        }

        for (window, data) in windows {
            if !WINDOWS.contains(&window) {
                debug!("Unexpected sync window {}s, skipping", window);
                continue;
            }
            sink.add_histogram(
                &histogram_key(window),
                &labels,
                HistogramValue::from_percentiles(data.percentiles, data.count),
            );
        }
    }
}
