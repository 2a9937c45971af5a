//! NameNode rule set.

use super::route::{CatalogRules, Route};
use crate::bean::{value_as_f64, Bean, PLACEHOLDER};
use crate::engine::{family_key, label_names, FillSink, RuleContext, SubsystemRules};
use crate::family::CycleFamilies;
use crate::naming::{snake_case, split_after, split_before};
use crate::states;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::warn;

pub fn rules() -> Vec<Box<dyn SubsystemRules>> {
    vec![
        CatalogRules::new("NameNodeActivity", activity_route).boxed(),
        CatalogRules::new("StartupProgress", startup_route).boxed(),
        CatalogRules::new("FSNamesystem", fsnamesystem_route)
            .matching(|name| name.contains("FSNamesystem") && !name.contains("FSNamesystemState"))
            .value(fsnamesystem_value)
            .boxed(),
        CatalogRules::new("FSNamesystemState", fsnamesystem_state_route)
            .value(fsnamesystem_state_value)
            .boxed(),
        CatalogRules::new("RetryCache", |metric| {
            Some(
                Route::group("Cache", "cache_total", "Total number of RetryCache in each mode.")
                    .label("mode", split_after(metric, "Cache")),
            )
        })
        .boxed(),
        Box::new(NameNodeInfo),
    ]
}

fn activity_route(metric: &str) -> Option<Route> {
    let route = if metric.contains("NumOps") {
        Route::group("MethodNumOps", "nnactivity_method_ops_total", "Total number of the times the method is called.")
            .label("method", split_before(metric, "NumOps"))
    } else if metric.contains("AvgTime") {
        Route::group(
            "MethodAvgTime",
            "nnactivity_method_avg_time_milliseconds",
            "Average turn around time of the method in milliseconds.",
        )
        .label("method", split_before(metric, "AvgTime"))
    } else {
        Route::group("Operations", "nnactivity_operations_total", "Total number of each operation.")
            .label("method", split_before(metric, "Ops"))
    };
    Some(route)
}

pub(crate) fn startup_route(metric: &str) -> Option<Route> {
    let phase = |token: &str| split_before(metric, token).to_string();
    let route = if metric == "ElapsedTime" {
        Route::group(
            "ElapsedTime",
            "startup_process_total_elapsed_time_milliseconds",
            "Total elapsed time in milliseconds.",
        )
        .label("phase", PLACEHOLDER)
    } else if metric == "PercentComplete" {
        Route::group(
            "PercentComplete",
            "startup_process_complete_rate",
            "Current rate completed in NameNode startup progress (the max value is 1.0).",
        )
        .label("phase", PLACEHOLDER)
    } else if metric.contains("Count") {
        Route::group("PhaseCount", "startup_process_phase_count", "Total number of steps completed in the phase.")
            .label("phase", phase("Count"))
    } else if metric.contains("ElapsedTime") {
        Route::group(
            "PhaseElapsedTime",
            "startup_process_phase_elapsed_time_milliseconds",
            "Total elapsed time in the phase in milliseconds.",
        )
        .label("phase", phase("ElapsedTime"))
    } else if metric.contains("Total") {
        Route::group("PhaseTotal", "startup_process_phase_total", "Total number of steps in the phase.")
            .label("phase", phase("Total"))
    } else if metric.contains("PercentComplete") {
        Route::group(
            "PhasePercentComplete",
            "startup_process_phase_complete_rate",
            "Current rate completed in the phase (the max value is 1.0).",
        )
        .label("phase", phase("PercentComplete"))
    } else {
        Route::verbatim(metric, format!("startup_process_{}", snake_case(metric))).label("phase", PLACEHOLDER)
    };
    Some(route)
}

fn fsnamesystem_route(metric: &str) -> Option<Route> {
    let route = if metric.starts_with("Capacity") {
        Route::group(
            "Capacity",
            "fsname_system_capacity_bytes",
            "Current DataNodes capacity in each mode in bytes.",
        )
        .label("mode", split_after(metric, "Capacity"))
    } else {
        Route::verbatim(metric, format!("fsname_system_{}", snake_case(metric)))
    };
    Some(route)
}

fn fsnamesystem_value(bean: &Bean, metric: &str) -> f64 {
    if metric.contains("HAState") {
        states::ha_state(&bean.tag("tag.HAState"))
    } else {
        bean.number(metric)
    }
}

fn fsnamesystem_state_route(metric: &str) -> Option<Route> {
    let route = if metric.contains("DataNodes") {
        Route::group(
            "DataNodesNum",
            "fsname_system_state_datanodes_num",
            "Number of datanodes in each state.",
        )
        .label("state", split_after(split_before(metric, "DataNodes"), "Num"))
    } else {
        Route::verbatim(metric, format!("fsname_system_state_{}", snake_case(metric)))
    };
    Some(route)
}

fn fsnamesystem_state_value(bean: &Bean, metric: &str) -> f64 {
    if metric.contains("FSState") {
        states::fs_state(&bean.tag("FSState"))
    } else {
        // TotalSyncTimes arrives as a space-padded string; number() strips it.
        bean.number(metric)
    }
}

fn placeholder() -> String {
    PLACEHOLDER.to_string()
}

#[derive(Debug, Deserialize)]
struct LiveNode {
    #[serde(rename = "infoAddr", default = "placeholder")]
    info_addr: String,
    #[serde(rename = "infoSecureAddr", default = "placeholder")]
    info_secure_addr: String,
    #[serde(default = "placeholder")]
    xferaddr: String,
    #[serde(default = "placeholder")]
    version: String,
    #[serde(flatten)]
    attrs: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct DeadNode {
    #[serde(default)]
    decommissioned: bool,
    #[serde(default = "placeholder")]
    xferaddr: String,
    #[serde(rename = "lastContact", default)]
    last_contact: Value,
}

/// Decommissioning and entering-maintenance nodes share a shape.
#[derive(Debug, Deserialize)]
struct DrainingNode {
    #[serde(default = "placeholder")]
    xferaddr: String,
    #[serde(flatten)]
    attrs: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct NodeUsageReport {
    #[serde(rename = "nodeUsage", default)]
    node_usage: Map<String, Value>,
}

const LIVE_NODE_ITEMS: &[&str] = &[
    "lastContact",
    "usedSpace",
    "adminState",
    "nonDfsUsedSpace",
    "capacity",
    "numBlocks",
    "used",
    "remaining",
    "blockScheduled",
    "blockPoolUsed",
    "blockPoolUsedPercent",
    "volfails",
];
const DECOM_NODE_ITEMS: &[&str] = &[
    "underReplicatedBlocks",
    "decommissionOnlyReplicas",
    "underReplicateInOpenFiles",
];
const MAINTENANCE_NODE_ITEMS: &[&str] = &[
    "underReplicatedBlocks",
    "maintenanceOnlyReplicas",
    "underReplicateInOpenFiles",
];
const NODE_USAGE_ITEMS: &[&str] = &["min", "median", "max", "stdDev"];

const LIVE_NODE_LABELS: &[&str] = &["datanode", "infoAddr", "infoSecureAddr", "xferaddr", "version"];

/// Structured expansion of the NameNode's view of its DataNodes.
struct NameNodeInfo;

const NNINFO: &str = "NameNodeInfo";

fn key(name: &str) -> String {
    family_key(NNINFO, name)
}

fn item_key(group: &str, item: &str) -> String {
    key(&format!("{}-{}", group, snake_case(item)))
}

impl NameNodeInfo {
    fn declare_items(
        ctx: &RuleContext<'_>,
        families: &mut CycleFamilies,
        group: &str,
        name: &str,
        items: &[&str],
        labels: &[&str],
    ) {
        for item in items {
            let item_name = snake_case(item);
            let mut help = format!("{} {}", group, item);
            if *item == "adminState" {
                help.push_str(" (0: In Service, 1: Decommission In Progress, 2: Decommissioned, 3: Entering Maintenance, 4: In Maintenance).");
            }
            families.declare_gauge(
                &item_key(group, item),
                &ctx.name(&[name, item_name.as_str()]),
                &help,
                &label_names(labels),
            );
        }
    }

    fn declare_count(ctx: &RuleContext<'_>, families: &mut CycleFamilies, key_name: &str, name: &str, help: &str) {
        families.declare_gauge(&key(key_name), &ctx.name(&[name]), help, &label_names(&[]));
    }

    fn fill_live_nodes(ctx: &RuleContext<'_>, bean: &Bean, sink: &mut FillSink<'_>) {
        let nodes: BTreeMap<String, LiveNode> = match bean.nested("LiveNodes") {
            Ok(nodes) => nodes,
            Err(e) => {
                warn!("Skipping LiveNodes for {}: {}", ctx.target, e);
                return;
            }
        };
        sink.add(&key("LiveNodeCount"), &ctx.labels::<&str>(&[]), nodes.len() as f64);
        for (node, info) in &nodes {
            let labels = ctx.labels(&[
                node.as_str(),
                info.info_addr.as_str(),
                info.info_secure_addr.as_str(),
                info.xferaddr.as_str(),
                info.version.as_str(),
            ]);
            for item in LIVE_NODE_ITEMS {
                let value = match info.attrs.get(*item) {
                    Some(Value::String(state)) if *item == "adminState" => states::admin_state(state),
                    Some(v) => value_as_f64(v),
                    None => 0.0,
                };
                sink.add(&item_key("LiveNodes", item), &labels, value);
            }
            if info.info_addr != PLACEHOLDER && !info.info_addr.is_empty() {
                sink.discover(format!("http://{}/jmx", info.info_addr));
            }
        }
    }

    fn fill_dead_nodes(ctx: &RuleContext<'_>, bean: &Bean, sink: &mut FillSink<'_>) {
        let nodes: BTreeMap<String, DeadNode> = match bean.nested("DeadNodes") {
            Ok(nodes) => nodes,
            Err(e) => {
                warn!("Skipping DeadNodes for {}: {}", ctx.target, e);
                return;
            }
        };
        sink.add(&key("DeadNodeCount"), &ctx.labels::<&str>(&[]), nodes.len() as f64);
        for (node, info) in &nodes {
            let decommissioned = info.decommissioned.to_string();
            let labels = ctx.labels(&[node.as_str(), decommissioned.as_str(), info.xferaddr.as_str()]);
            sink.add(&key("DeadNodes"), &labels, value_as_f64(&info.last_contact));
        }
    }

    fn fill_draining_nodes(
        ctx: &RuleContext<'_>,
        bean: &Bean,
        sink: &mut FillSink<'_>,
        field: &str,
        count_key: &str,
        items: &[&str],
    ) {
        let nodes: BTreeMap<String, DrainingNode> = match bean.nested(field) {
            Ok(nodes) => nodes,
            Err(e) => {
                warn!("Skipping {} for {}: {}", field, ctx.target, e);
                return;
            }
        };
        sink.add(&key(count_key), &ctx.labels::<&str>(&[]), nodes.len() as f64);
        for (node, info) in &nodes {
            let labels = ctx.labels(&[node.as_str(), info.xferaddr.as_str()]);
            for item in items {
                let value = info.attrs.get(*item).map(value_as_f64).unwrap_or(0.0);
                sink.add(&item_key(field, item), &labels, value);
            }
        }
    }
}

impl SubsystemRules for NameNodeInfo {
    fn subsystem(&self) -> &str {
        NNINFO
    }

    fn setup(&self, ctx: &RuleContext<'_>, _bean: &Bean, families: &mut CycleFamilies) {
        let Some(schema) = ctx.subsystem(NNINFO) else {
            return;
        };
        for (metric, help) in schema.iter() {
            if metric.contains("LiveNodes") {
                Self::declare_count(ctx, families, "LiveNodeCount", "nninfo_live_nodes_count", "Count of live data node.");
                Self::declare_items(ctx, families, "LiveNodes", "nninfo_live_nodes", LIVE_NODE_ITEMS, LIVE_NODE_LABELS);
            } else if metric.contains("DeadNodes") {
                Self::declare_count(ctx, families, "DeadNodeCount", "nninfo_dead_nodes_count", "Count of dead data node.");
                families.declare_gauge(
                    &key("DeadNodes"),
                    &ctx.name(&["nninfo_dead_nodes_last_contact"]),
                    "Dead node last contact in milliseconds.",
                    &label_names(&["datanode", "decommissioned", "xferaddr"]),
                );
            } else if metric.contains("DecomNodes") {
                Self::declare_count(
                    ctx,
                    families,
                    "DecomNodeCount",
                    "nninfo_decom_nodes_count",
                    "Count of decommissioned data node.",
                );
                Self::declare_items(
                    ctx,
                    families,
                    "DecomNodes",
                    "nninfo_decom_nodes",
                    DECOM_NODE_ITEMS,
                    &["datanode", "xferaddr"],
                );
            } else if metric.contains("EnteringMaintenanceNodes") {
                Self::declare_count(
                    ctx,
                    families,
                    "MaintenanceNodeCount",
                    "nninfo_maintenance_nodes_count",
                    "Count of maintenance data node.",
                );
                Self::declare_items(
                    ctx,
                    families,
                    "EnteringMaintenanceNodes",
                    "nninfo_entering_maintenance_nodes",
                    MAINTENANCE_NODE_ITEMS,
                    &["datanode", "xferaddr"],
                );
            } else if metric.contains("CorruptFiles") {
                Self::declare_count(ctx, families, "CorruptFiles", "nninfo_corrupt_file_count", "Corrupt file count.");
            } else if metric.contains("NodeUsage") {
                Self::declare_items(ctx, families, "NodeUsage", "nninfo_node_usage", NODE_USAGE_ITEMS, &[]);
            } else if metric.contains("SoftwareVersion") {
                families.declare_gauge(
                    &key("SoftwareVersion"),
                    &ctx.name(&["nninfo_software_version"]),
                    help,
                    &label_names(&["software_version"]),
                );
            } else if metric.contains("Safemode") {
                Self::declare_count(ctx, families, "Safemode", "nninfo_safe_mode", help);
            } else {
                let name = format!("nninfo_{}", snake_case(metric));
                families.declare_gauge(&key(metric), &ctx.name(&[name.as_str()]), help, &label_names(&[]));
            }
        }
    }

    fn fill(&self, ctx: &RuleContext<'_>, bean: &Bean, sink: &mut FillSink<'_>) {
        let Some(schema) = ctx.subsystem(NNINFO) else {
            return;
        };
        let scalar = ctx.labels::<&str>(&[]);
        for metric in schema.names() {
            if metric.contains("LiveNodes") {
                if bean.contains("LiveNodes") {
                    Self::fill_live_nodes(ctx, bean, sink);
                }
            } else if metric.contains("DeadNodes") {
                if bean.contains("DeadNodes") {
                    Self::fill_dead_nodes(ctx, bean, sink);
                }
            } else if metric.contains("DecomNodes") {
                if bean.contains("DecomNodes") {
                    Self::fill_draining_nodes(ctx, bean, sink, "DecomNodes", "DecomNodeCount", DECOM_NODE_ITEMS);
                }
            } else if metric.contains("EnteringMaintenanceNodes") {
                if bean.contains("EnteringMaintenanceNodes") {
                    Self::fill_draining_nodes(
                        ctx,
                        bean,
                        sink,
                        "EnteringMaintenanceNodes",
                        "MaintenanceNodeCount",
                        MAINTENANCE_NODE_ITEMS,
                    );
                }
            } else if metric.contains("CorruptFiles") {
                if bean.contains("CorruptFiles") {
                    match bean.nested::<Vec<Value>>("CorruptFiles") {
                        Ok(files) => sink.add(&key("CorruptFiles"), &scalar, files.len() as f64),
                        Err(e) => warn!("Skipping CorruptFiles for {}: {}", ctx.target, e),
                    }
                }
            } else if metric.contains("NodeUsage") {
                if bean.contains("NodeUsage") {
                    match bean.nested::<NodeUsageReport>("NodeUsage") {
                        Ok(report) => {
                            for item in NODE_USAGE_ITEMS {
                                let value = report.node_usage.get(*item).map(value_as_f64).unwrap_or(0.0);
                                sink.add(&item_key("NodeUsage", item), &scalar, value);
                            }
                        }
                        Err(e) => warn!("Skipping NodeUsage for {}: {}", ctx.target, e),
                    }
                }
            } else if metric.contains("SoftwareVersion") {
                if bean.contains("SoftwareVersion") {
                    let version = bean.tag("SoftwareVersion");
                    sink.add(&key("SoftwareVersion"), &ctx.labels(&[version]), 0.0);
                }
            } else if metric.contains("Safemode") {
                if let Some(Value::String(mode)) = bean.get("Safemode") {
                    let value = if mode.is_empty() { 0.0 } else { 1.0 };
                    sink.add(&key("Safemode"), &scalar, value);
                }
            } else {
                sink.add(&key(metric), &scalar, bean.number(metric));
            }
        }
    }
}
