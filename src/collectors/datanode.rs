//! DataNode rule set.

use super::route::{CatalogRules, Route};
use crate::bean::{value_as_f64, Bean};
use crate::engine::{family_key, label_names, FillSink, RuleContext, SubsystemRules};
use crate::family::CycleFamilies;
use crate::naming::{snake_case, split_after, split_before};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::warn;

pub fn rules() -> Vec<Box<dyn SubsystemRules>> {
    vec![
        Box::new(DataNodeInfo),
        CatalogRules::new("DataNodeActivity", activity_route)
            .fixed_labels(&["host"], hostname)
            .boxed(),
        CatalogRules::new("FSDatasetState", |metric| {
            let base = if metric.contains("Num") {
                split_after(metric, "Num")
            } else {
                metric
            };
            Some(Route::verbatim(metric, snake_case(base)))
        })
        .fixed_labels(&["host"], |ctx, _| vec![ctx.target.to_string()])
        .boxed(),
    ]
}

fn hostname(ctx: &RuleContext<'_>, bean: &Bean) -> Vec<String> {
    match bean.get("tag.Hostname").and_then(Value::as_str) {
        Some(host) => vec![host.to_string()],
        None => vec![ctx.target.to_string()],
    }
}

pub(crate) fn activity_route(metric: &str) -> Option<Route> {
    let route = if metric.contains("Blocks") {
        Route::group(
            "Blocks",
            "block_operations_total",
            "Total number of blocks in different operations.",
        )
        .label("oper", split_after(metric, "Blocks"))
    } else if metric.contains("Client") {
        let head = split_before(metric, "Client");
        Route::group(
            "Client",
            "from_client_total",
            "Total number of each operation from different clients.",
        )
        .label("oper", split_before(head, "From"))
        .label("client", split_after(head, "From"))
    } else {
        Route::verbatim(metric, snake_case(metric))
    };
    Some(route)
}

const DNINFO: &str = "DataNodeInfo";

/// Node info with a per-volume expansion of `VolumeInfo`.
struct DataNodeInfo;

impl SubsystemRules for DataNodeInfo {
    fn subsystem(&self) -> &str {
        DNINFO
    }

    fn setup(&self, ctx: &RuleContext<'_>, _bean: &Bean, families: &mut CycleFamilies) {
        let Some(schema) = ctx.subsystem(DNINFO) else {
            return;
        };
        for (metric, help) in schema.iter() {
            if metric.contains("VolumeInfo") {
                families.declare_gauge(
                    &family_key(DNINFO, metric),
                    &ctx.name(&["volume_state"]),
                    help,
                    &label_names(&["version", "path", "state"]),
                );
            } else {
                families.declare_gauge(
                    &family_key(DNINFO, metric),
                    &ctx.name(&[snake_case(metric).as_str()]),
                    help,
                    &label_names(&["version"]),
                );
            }
        }
    }

    fn fill(&self, ctx: &RuleContext<'_>, bean: &Bean, sink: &mut FillSink<'_>) {
        let Some(schema) = ctx.subsystem(DNINFO) else {
            return;
        };
        let version = bean.tag("Version");
        for metric in schema.names() {
            let key = family_key(DNINFO, metric);
            if !metric.contains("VolumeInfo") {
                sink.add(&key, &ctx.labels(&[version.as_str()]), bean.number(metric));
                continue;
            }
            if !bean.contains(metric) {
                continue;
            }
            let volumes: BTreeMap<String, Map<String, Value>> = match bean.nested(metric) {
                Ok(volumes) => volumes,
                Err(e) => {
                    warn!("Skipping {} for {}: {}", metric, ctx.target, e);
                    continue;
                }
            };
            for (path, attrs) in &volumes {
                for (state, value) in attrs.iter().filter(|(state, _)| *state != "storageType") {
                    sink.add(
                        &key,
                        &ctx.labels(&[version.as_str(), path.as_str(), state.as_str()]),
                        value_as_f64(value),
                    );
                }
            }
        }
    }
}
