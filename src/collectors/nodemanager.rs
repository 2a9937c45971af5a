//! NodeManager rule set.

use super::route::{CatalogRules, Route};
use crate::bean::Bean;
use crate::engine::{RuleContext, SubsystemRules};
use crate::naming::{snake_case, split_after};

const SUBSYSTEMS: &[&str] = &["NodeManagerMetrics", "ShuffleMetrics"];

pub fn rules() -> Vec<Box<dyn SubsystemRules>> {
    SUBSYSTEMS
        .iter()
        .map(|&subsystem| {
            CatalogRules::new(subsystem, route)
                .fixed_labels(&["host"], target_host)
                .value(clamped)
                .boxed()
        })
        .collect()
}

fn target_host(ctx: &RuleContext<'_>, _bean: &Bean) -> Vec<String> {
    vec![ctx.target.to_string()]
}

/// Memory and vcore gauges can dip below zero while containers are released.
fn clamped(bean: &Bean, metric: &str) -> f64 {
    bean.non_negative(metric)
}

pub(crate) fn route(metric: &str) -> Option<Route> {
    let route = if metric.starts_with("Containers") {
        Route::group("containers", "container_count", "Count of containers in each status.")
            .label("status", split_after(metric, "Containers"))
    } else {
        Route::verbatim(metric, snake_case(metric))
    };
    Some(route)
}
