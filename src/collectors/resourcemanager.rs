//! ResourceManager rule set.

use super::route::{CatalogRules, Route};
use crate::bean::{value_as_f64, Bean, PLACEHOLDER};
use crate::engine::{family_key, label_names, FillSink, RuleContext, SubsystemRules};
use crate::family::CycleFamilies;
use crate::naming::{snake_case, split_after, split_before};
use crate::states;
use regex::Regex;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

/// Default queue filter: the root queue and everything under it.
pub const DEFAULT_QUEUE_REGEX: &str = "root.*";

pub fn rules(queue_filter: Regex) -> Vec<Box<dyn SubsystemRules>> {
    vec![
        Box::new(RmNmInfo),
        Box::new(QueueMetrics { queue_filter }),
        CatalogRules::new("ClusterMetrics", cluster_route).boxed(),
    ]
}

/// Compiles a queue filter anchored at the start of the queue name.
pub fn queue_filter(pattern: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!("^(?:{})", pattern))
}

fn cluster_route(metric: &str) -> Option<Route> {
    let route = if metric.contains("NMs") {
        Route::group("NMs", "nodemanager_total", "Current number of NodeManagers in each status.")
            .label("status", split_after(split_before(metric, "NMs"), "Num"))
    } else if metric.contains("NumOps") {
        Route::group("NumOps", "ams_total", "Total number of Applications Masters in each operation.")
            .label("oper", split_after(split_before(metric, "DelayNumOps"), "AM"))
    } else if metric.contains("AvgTime") {
        Route::group(
            "AvgTime",
            "average_time_milliseconds",
            "Average time in milliseconds AM spends in each operation.",
        )
        .label("oper", split_after(split_before(metric, "DelayAvgTime"), "AM"))
    } else {
        Route::verbatim(metric, snake_case(metric))
    };
    Some(route)
}

pub(crate) fn queue_route(metric: &str) -> Option<Route> {
    let running = |bucket: &str| {
        Route::group(
            "running_app",
            "running_app_total",
            "Current number of running applications in each elapsed time bucket.",
        )
        .label("elapsed_time", bucket)
    };
    let route = match metric {
        "running_0" => running("0to60"),
        "running_60" => running("60to300"),
        "running_300" => running("300to1440"),
        "running_1440" => running("1440up"),
        m if m.ends_with("VCores") => Route::group("vcore", "vcore_count", "Count of vcores in each status.")
            .label("status", split_before(m, "VCores")),
        m if m.ends_with("Containers") => {
            Route::group("containers", "container_count", "Count of containers in each status.")
                .label("status", split_before(m, "Containers"))
        }
        m if m.ends_with("MB") => Route::group("memory", "memory_in_mb", "Memory in MB in each status.")
            .label("status", split_before(m, "MB")),
        m if m.starts_with("Apps") => {
            Route::group("apps", "application_count", "Count of applications in each status.")
                .label("status", split_after(m, "Apps"))
        }
        m => Route::verbatim(m, snake_case(m)),
    };
    Some(route)
}

/// Resource counts that must never be exported negative.
fn is_resource_count(metric: &str) -> bool {
    metric.ends_with("VCores") || metric.ends_with("Containers") || metric.ends_with("MB")
}

const QUEUE_LABELS: &[&str] = &["modeler_type", "queue", "user"];

/// Per-queue scheduler metrics, restricted to queues matching the filter.
struct QueueMetrics {
    queue_filter: Regex,
}

impl QueueMetrics {
    fn accepts(&self, bean: &Bean) -> bool {
        match bean.get("tag.Queue").and_then(Value::as_str) {
            Some(queue) => self.queue_filter.is_match(queue),
            None => false,
        }
    }
}

impl SubsystemRules for QueueMetrics {
    fn subsystem(&self) -> &str {
        "QueueMetrics"
    }

    fn setup(&self, ctx: &RuleContext<'_>, _bean: &Bean, families: &mut CycleFamilies) {
        let Some(schema) = ctx.subsystem(self.subsystem()) else {
            return;
        };
        for (metric, help) in schema.iter() {
            if let Some(route) = queue_route(metric) {
                route.declare(ctx, families, self.subsystem(), QUEUE_LABELS, help);
            }
        }
    }

    fn fill(&self, ctx: &RuleContext<'_>, bean: &Bean, sink: &mut FillSink<'_>) {
        if !self.accepts(bean) {
            debug!("Queue '{}' does not match the queue filter", bean.tag("tag.Queue"));
            return;
        }
        let Some(schema) = ctx.subsystem(self.subsystem()) else {
            return;
        };
        let fixed = vec![bean.tag("modelerType"), bean.tag("tag.Queue"), bean.tag("tag.User")];
        for metric in schema.names() {
            let value = if is_resource_count(metric) {
                bean.non_negative(metric)
            } else {
                bean.number(metric)
            };
            if let Some(route) = queue_route(metric) {
                route.emit(ctx, sink, self.subsystem(), &fixed, value);
            }
        }
    }
}

fn placeholder() -> String {
    PLACEHOLDER.to_string()
}

#[derive(Debug, Deserialize)]
struct LiveNodeManager {
    #[serde(rename = "HostName", default = "placeholder")]
    host_name: String,
    #[serde(rename = "NodeManagerVersion", default = "placeholder")]
    version: String,
    #[serde(rename = "Rack", default = "placeholder")]
    rack: String,
    #[serde(rename = "State", default = "placeholder")]
    state: String,
    #[serde(rename = "NodeHTTPAddress", default)]
    http_address: Option<String>,
    #[serde(flatten)]
    attrs: Map<String, Value>,
}

const RMNMINFO: &str = "RMNMInfo";

fn node_manager_family(metric: &str) -> Option<&'static str> {
    match metric {
        "NumContainers" => Some("node_containers_total"),
        "State" => Some("node_state"),
        "UsedMemoryMB" => Some("node_memory_used_mb"),
        "AvailableMemoryMB" => Some("node_memory_available_mb"),
        "UsedVirtualCores" => Some("node_vcores_used"),
        "AvailableVirtualCores" => Some("node_vcores_available"),
        _ => None,
    }
}

/// Expansion of the ResourceManager's live NodeManager list.
struct RmNmInfo;

impl SubsystemRules for RmNmInfo {
    fn subsystem(&self) -> &str {
        RMNMINFO
    }

    fn setup(&self, ctx: &RuleContext<'_>, _bean: &Bean, families: &mut CycleFamilies) {
        let Some(schema) = ctx.subsystem(RMNMINFO) else {
            return;
        };
        for (metric, help) in schema.iter() {
            match node_manager_family(metric) {
                Some(name) => {
                    families.declare_gauge(
                        &family_key(RMNMINFO, metric),
                        &ctx.name(&[name]),
                        help,
                        &label_names(&["host", "version", "rack"]),
                    );
                }
                None => debug!("No RMNMInfo family for '{}'", metric),
            }
        }
    }

    fn fill(&self, ctx: &RuleContext<'_>, bean: &Bean, sink: &mut FillSink<'_>) {
        if !bean.contains("LiveNodeManagers") {
            return;
        }
        let Some(schema) = ctx.subsystem(RMNMINFO) else {
            return;
        };
        let managers: Vec<LiveNodeManager> = match bean.nested("LiveNodeManagers") {
            Ok(managers) => managers,
            Err(e) => {
                warn!("Skipping LiveNodeManagers for {}: {}", ctx.target, e);
                return;
            }
        };

        for nm in &managers {
            let labels = ctx.labels(&[nm.host_name.as_str(), nm.version.as_str(), nm.rack.as_str()]);
            for metric in schema.names().filter(|m| node_manager_family(m).is_some()) {
                let value = if metric == "State" {
                    states::node_manager_state(&nm.state)
                } else {
                    nm.attrs.get(metric).map(value_as_f64).unwrap_or(0.0).max(0.0)
                };
                sink.add(&family_key(RMNMINFO, metric), &labels, value);
            }
            if let Some(address) = nm.http_address.as_deref().filter(|a| !a.is_empty()) {
                sink.discover(format!("http://{}/jmx", address));
            }
        }
    }
}
