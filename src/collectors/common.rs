//! Rule set shared by every Hadoop daemon: JVM, host OS, RPC, UGI,
//! metrics-system and runtime beans.

use super::route::{CatalogRules, Route};
use crate::bean::{Bean, PLACEHOLDER};
use crate::engine::{FillSink, RuleContext, SubsystemRules};
use crate::family::CycleFamilies;
use crate::naming::{snake_case, split_after, split_before};
use serde_json::Value;

pub fn rules() -> Vec<Box<dyn SubsystemRules>> {
    vec![
        CatalogRules::new("JvmMetrics", jvm_route)
            .matching(|name| name.contains("name=JvmMetrics"))
            .boxed(),
        CatalogRules::new("OperatingSystem", |metric| {
            Some(Route::verbatim(metric, snake_case(metric)))
        })
        .boxed(),
        CatalogRules::new("RpcActivity", rpc_route)
            .fixed_labels(&["tag"], rpc_tag)
            .boxed(),
        Box::new(RpcDetailedActivity),
        CatalogRules::new("UgiMetrics", ugi_route).boxed(),
        CatalogRules::new("MetricsSystem", metrics_system_route)
            .matching(|name| name.contains("MetricsSystem") && name.contains("sub=Stats"))
            .boxed(),
        CatalogRules::new("Runtime", |metric| {
            Some(Route::verbatim(metric, format!("{}_milliseconds", snake_case(metric))))
        })
        .fixed_labels(&["host"], runtime_host)
        .boxed(),
    ]
}

fn rpc_tag(_: &RuleContext<'_>, bean: &Bean) -> Vec<String> {
    vec![bean.tag("tag.port")]
}

fn runtime_host(_: &RuleContext<'_>, bean: &Bean) -> Vec<String> {
    let host = bean
        .attribute("Name")
        .and_then(Value::as_str)
        .and_then(|name| name.split_once('@'))
        .map(|(_, host)| host)
        .unwrap_or(PLACEHOLDER);
    vec![host.to_string()]
}

pub(crate) fn jvm_route(metric: &str) -> Option<Route> {
    let verbatim = || Route::verbatim(metric, format!("jvm_{}", snake_case(metric)));

    let route = if metric.contains("Mem") {
        let after_mem = split_after(metric, "Mem");
        if metric.contains("Used") {
            Route::group("MemUsed", "jvm_mem_used_mebibytes", "Current memory used in MB.")
                .label("mode", split_before(after_mem, "Used"))
        } else if metric.contains("Committed") {
            Route::group("MemCommitted", "jvm_mem_committed_mebibytes", "Current memory committed in MB.")
                .label("mode", split_before(after_mem, "Committed"))
        } else if metric.contains("Max") {
            let mode = if metric.contains("Heap") {
                split_before(after_mem, "Max")
            } else {
                "max"
            };
            Route::group("MemMax", "jvm_mem_max_mebibytes", "Max memory size in MB.").label("mode", mode)
        } else {
            Route::verbatim(metric, format!("jvm_{}ebibytes", snake_case(metric)))
        }
    } else if metric.contains("Gc") {
        if metric.contains("GcCount") {
            Route::group("GcCount", "jvm_gc_count", "GC count of each type.").label("type", gc_type(metric, "GcCount"))
        } else if metric.contains("GcTimeMillis") {
            Route::group("GcTimeMillis", "jvm_gc_time_milliseconds", "GC time of each type in milliseconds.")
                .label("type", gc_type(metric, "GcTimeMillis"))
        } else if metric.contains("ThresholdExceeded") {
            Route::group(
                "GcThresholdExceeded",
                "jvm_gc_exceeded_threshold_total",
                "Number of times the GC threshold is exceeded.",
            )
            .label("type", split_before(split_after(metric, "GcNum"), "ThresholdExceeded"))
        } else {
            verbatim()
        }
    } else if metric.contains("Threads") {
        Route::group("ThreadsState", "jvm_threads_state_total", "Current number of threads in each state.")
            .label("state", split_after(metric, "Threads"))
    } else if metric.contains("Log") {
        Route::group("LogLevel", "jvm_log_level_total", "Total number of logs of each level.")
            .label("level", split_after(metric, "Log"))
    } else {
        verbatim()
    };
    Some(route)
}

fn gc_type(metric: &str, token: &str) -> String {
    if metric == token {
        "total".to_string()
    } else {
        split_after(metric, token).to_string()
    }
}

pub(crate) fn rpc_route(metric: &str) -> Option<Route> {
    let route = if metric.contains("NumOps") {
        Route::group("MethodNumOps", "rpc_method_called_total", "Total number of times the method is called.")
            .label("method", split_before(metric, "NumOps"))
    } else if metric.contains("AvgTime") {
        Route::group(
            "MethodAvgTime",
            "rpc_method_avg_time_milliseconds",
            "Average turn around time of the method in milliseconds.",
        )
        .label("method", split_before(metric, "AvgTime"))
    } else if metric.contains("Rpc") {
        Route::verbatim(metric, snake_case(metric))
    } else {
        Route::verbatim(metric, format!("rpc_{}", snake_case(metric)))
    };
    Some(route)
}

fn rpc_detailed_route(metric: &str) -> Option<Route> {
    if metric.contains("NumOps") {
        Some(
            Route::group(
                "NumOps",
                "rpc_detailed_method_called_total",
                "Total number of times the method is called.",
            )
            .label("method", split_before(metric, "NumOps")),
        )
    } else if metric.contains("AvgTime") {
        Some(
            Route::group(
                "AvgTime",
                "rpc_detailed_method_avg_time_milliseconds",
                "Average turn around time of the method in milliseconds.",
            )
            .label("method", split_before(metric, "AvgTime")),
        )
    } else {
        None
    }
}

/// Per-method RPC counters. The catalog only seeds the two families; the
/// methods themselves come from whatever the bean reports.
struct RpcDetailedActivity;

impl SubsystemRules for RpcDetailedActivity {
    fn subsystem(&self) -> &str {
        "RpcDetailedActivity"
    }

    fn setup(&self, ctx: &RuleContext<'_>, _bean: &Bean, families: &mut CycleFamilies) {
        let Some(schema) = ctx.subsystem(self.subsystem()) else {
            return;
        };
        for (metric, help) in schema.iter() {
            if let Some(route) = rpc_detailed_route(metric) {
                route.declare(ctx, families, self.subsystem(), &["tag"], help);
            }
        }
    }

    fn fill(&self, ctx: &RuleContext<'_>, bean: &Bean, sink: &mut FillSink<'_>) {
        let fixed = vec![bean.tag("tag.port")];
        let methods = bean
            .keys()
            .filter(|key| key.chars().next().is_some_and(char::is_uppercase));
        for metric in methods {
            if let Some(route) = rpc_detailed_route(metric) {
                route.emit(ctx, sink, self.subsystem(), &fixed, bean.number(metric));
            }
        }
    }
}

pub(crate) fn ugi_route(metric: &str) -> Option<Route> {
    let split = |token: &str| {
        if metric.starts_with("Login") {
            ("Login".to_string(), split_before(split_after(metric, "Login"), token).to_string())
        } else {
            (split_before(metric, token).to_string(), PLACEHOLDER.to_string())
        }
    };
    let route = if metric.contains("NumOps") {
        let (method, state) = split("NumOps");
        Route::group("NumOps", "ugi_method_called_total", "Total number of times the method is called.")
            .label("method", method)
            .label("state", state)
    } else if metric.contains("AvgTime") {
        let (method, state) = split("AvgTime");
        Route::group(
            "AvgTime",
            "ugi_method_avg_time_milliseconds",
            "Average turn around time of the method in milliseconds.",
        )
        .label("method", method)
        .label("state", state)
    } else {
        Route::verbatim(metric, format!("ugi_{}", snake_case(metric)))
    };
    Some(route)
}

fn metrics_system_route(metric: &str) -> Option<Route> {
    let route = if metric.contains("NumOps") {
        Route::group("NumOps", "metricssystem_operations_total", "Total number of operations.")
            .label("oper", split_before(metric, "NumOps"))
    } else if metric.contains("AvgTime") {
        Route::group(
            "AvgTime",
            "metricssystem_method_avg_time_milliseconds",
            "Average turn around time of the operations in milliseconds.",
        )
        .label("oper", split_before(metric, "AvgTime"))
    } else {
        Route::verbatim(metric, format!("metricssystem_{}", snake_case(metric)))
    };
    Some(route)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn label(route: &Route) -> &str {
        &route.labels[0].1
    }

    #[test]
    fn test_jvm_memory_modes() {
        let used = jvm_route("MemHeapUsedM").unwrap();
        assert_eq!(used.name, "jvm_mem_used_mebibytes");
        assert_eq!(label(&used), "Heap");

        assert_eq!(label(&jvm_route("MemNonHeapCommittedM").unwrap()), "NonHeap");
        assert_eq!(label(&jvm_route("MemHeapMaxM").unwrap()), "Heap");
        assert_eq!(label(&jvm_route("MemMaxM").unwrap()), "max");
    }

    #[test]
    fn test_jvm_gc_and_threads() {
        let gc = jvm_route("GcCountG1YoungGeneration").unwrap();
        assert_eq!(gc.key, "GcCount");
        assert_eq!(label(&gc), "G1YoungGeneration");
        assert_eq!(label(&jvm_route("GcCount").unwrap()), "total");
        assert_eq!(label(&jvm_route("GcTimeMillis").unwrap()), "total");
        assert_eq!(label(&jvm_route("GcNumWarnThresholdExceeded").unwrap()), "Warn");

        let extra = jvm_route("GcTotalExtraSleepTime").unwrap();
        assert_eq!(extra.name, "jvm_gc_total_extra_sleep_time");
        assert!(extra.labels.is_empty());

        assert_eq!(label(&jvm_route("ThreadsTimedWaiting").unwrap()), "TimedWaiting");
        assert_eq!(label(&jvm_route("LogWarn").unwrap()), "Warn");
    }

    #[test]
    fn test_rpc_routes() {
        let calls = rpc_route("RpcQueueTimeNumOps").unwrap();
        assert_eq!(calls.name, "rpc_method_called_total");
        assert_eq!(label(&calls), "RpcQueueTime");
        assert_eq!(rpc_route("RpcSlowCalls").unwrap().name, "rpc_slow_calls");
        assert_eq!(rpc_route("CallQueueLength").unwrap().name, "rpc_call_queue_length");
        assert!(rpc_detailed_route("SomethingElse").is_none());
    }

    #[test]
    fn test_ugi_login_split() {
        let login = ugi_route("LoginFailureAvgTime").unwrap();
        assert_eq!(login.name, "ugi_method_avg_time_milliseconds");
        assert_eq!(
            login.labels,
            vec![("method", "Login".to_string()), ("state", "Failure".to_string())]
        );

        let groups = ugi_route("GetGroupsNumOps").unwrap();
        assert_eq!(
            groups.labels,
            vec![("method", "GetGroups".to_string()), ("state", "-".to_string())]
        );
        assert_eq!(ugi_route("RenewalFailures").unwrap().name, "ugi_renewal_failures");
    }
}
