//! Query-engine coordinator rule set.
//!
//! Coordinator beans come from `/v1/jmx/mbean` and are identified by their
//! structured `objectName`. Values live in an `attributes` list rather than as
//! top-level keys, so lookups go through [`Bean::attribute`].

use crate::bean::{value_as_f64, Bean};
use crate::engine::{family_key, label_names, FillSink, RuleContext, SubsystemRules};
use crate::family::CycleFamilies;
use crate::naming::{sanitize_label, snake_case};
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

type Matcher = fn(&str) -> bool;

const YOUNG_COLLECTORS: &[&str] = &["G1 Young Generation", "PS Scavenge", "ParNew", "Copy"];
const OLD_COLLECTORS: &[&str] = &[
    "G1 Old Generation",
    "PS MarkSweep",
    "ConcurrentMarkSweep",
    "MarkSweepCompact",
];

const GC_BEAN: &str = "java.lang:type=GarbageCollector,name=";

pub fn rules() -> Vec<Box<dyn SubsystemRules>> {
    let kinds: [(&'static str, Matcher); 8] = [
        ("Memory", |n| n.contains("java.lang:type=Memory") && !n.contains("MemoryPool")),
        ("Threading", |n| n.contains("java.lang:type=Threading")),
        ("QueryManager", |n| n.contains("trino.execution:name=QueryManager")),
        ("SqlTaskManager", |n| n.contains("trino.execution:name=SqlTaskManager")),
        ("HeartbeatFailureDetector", |n| {
            n.contains("trino.failuredetector:name=HeartbeatFailureDetector")
        }),
        ("ClusterMemoryManager", |n| n.contains("trino.memory:name=ClusterMemoryManager")),
        ("ClusterMemoryPool", |n| {
            n.contains("trino.memory:type=ClusterMemoryPool,name=general")
        }),
        ("GcMonitor", |n| n.contains("io.airlift.stats:name=GcMonitor")),
    ];
    let mut rules: Vec<Box<dyn SubsystemRules>> = kinds
        .into_iter()
        .map(|(kind, matcher)| Box::new(CoordinatorKind { kind, matcher }) as Box<dyn SubsystemRules>)
        .collect();
    rules.push(Box::new(GcGeneration {
        kind: "GcYoung",
        collectors: YOUNG_COLLECTORS,
    }));
    rules.push(Box::new(GcGeneration {
        kind: "GcOld",
        collectors: OLD_COLLECTORS,
    }));
    rules
}

/// Attribute value as a number. Composite memory usages export their `used`
/// part.
fn attribute_value(bean: &Bean, metric: &str) -> f64 {
    match bean.attribute(metric) {
        Some(Value::Object(composite)) => composite.get("used").map(value_as_f64).unwrap_or(0.0),
        Some(value) => value_as_f64(value),
        None => 0.0,
    }
}

fn declare_kind(ctx: &RuleContext<'_>, kind: &str, families: &mut CycleFamilies) {
    let help = format!("Trino coordinator {} metric.", kind);
    families.declare_gauge(
        &family_key(kind, kind),
        &ctx.name(&[snake_case(kind).as_str()]),
        &help,
        &label_names(&["method"]),
    );
}

fn fill_kind(ctx: &RuleContext<'_>, kind: &str, bean: &Bean, sink: &mut FillSink<'_>) {
    let Some(schema) = ctx.subsystem(kind) else {
        return;
    };
    let key = family_key(kind, kind);
    for metric in schema.names() {
        let method = sanitize_label(metric);
        sink.add(&key, &ctx.labels(&[method]), attribute_value(bean, metric));
    }
}

/// One management object, one family with a `method` label per attribute.
struct CoordinatorKind {
    kind: &'static str,
    matcher: Matcher,
}

impl SubsystemRules for CoordinatorKind {
    fn subsystem(&self) -> &str {
        self.kind
    }

    fn matches(&self, bean_name: &str) -> bool {
        (self.matcher)(bean_name)
    }

    fn setup(&self, ctx: &RuleContext<'_>, _bean: &Bean, families: &mut CycleFamilies) {
        declare_kind(ctx, self.kind, families);
    }

    fn fill(&self, ctx: &RuleContext<'_>, bean: &Bean, sink: &mut FillSink<'_>) {
        fill_kind(ctx, self.kind, bean, sink);
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LastGcInfo {
    #[serde(default)]
    memory_usage_before_gc: Vec<PoolUsage>,
    #[serde(default)]
    memory_usage_after_gc: Vec<PoolUsage>,
}

#[derive(Debug, Deserialize)]
struct PoolUsage {
    key: String,
    value: MemoryUsage,
}

#[derive(Debug, Deserialize)]
struct MemoryUsage {
    #[serde(default)]
    used: f64,
}

/// Young or old garbage collector, whichever collector implementation the
/// JVM runs with.
struct GcGeneration {
    kind: &'static str,
    collectors: &'static [&'static str],
}

impl GcGeneration {
    fn usage_key(&self) -> String {
        family_key(self.kind, "memory_usage")
    }
}

impl SubsystemRules for GcGeneration {
    fn subsystem(&self) -> &str {
        self.kind
    }

    fn matches(&self, bean_name: &str) -> bool {
        bean_name
            .strip_prefix(GC_BEAN)
            .is_some_and(|collector| self.collectors.contains(&collector))
    }

    fn setup(&self, ctx: &RuleContext<'_>, _bean: &Bean, families: &mut CycleFamilies) {
        declare_kind(ctx, self.kind, families);
        let name = format!("{}_memory_usage_bytes", snake_case(self.kind));
        families.declare_gauge(
            &self.usage_key(),
            &ctx.name(&[name.as_str()]),
            "Memory pool usage in bytes before and after the last collection.",
            &label_names(&["phase", "pool"]),
        );
    }

    fn fill(&self, ctx: &RuleContext<'_>, bean: &Bean, sink: &mut FillSink<'_>) {
        fill_kind(ctx, self.kind, bean, sink);

        let Some(raw) = bean.attribute("LastGcInfo") else {
            return;
        };
        let info: LastGcInfo = match serde_json::from_value(raw.clone()) {
            Ok(info) => info,
            Err(e) => {
                warn!("Skipping LastGcInfo of {} for {}: {}", bean.object_name(), ctx.target, e);
                return;
            }
        };
        let key = self.usage_key();
        let phases = [
            ("before", &info.memory_usage_before_gc),
            ("after", &info.memory_usage_after_gc),
        ];
        for (phase, pools) in phases {
            for pool in pools {
                sink.add(&key, &ctx.labels(&[phase, pool.key.as_str()]), pool.value.used);
            }
        }
    }
}
