//! Properties every classification cycle must hold, checked on HDFS fixtures.

mod common;

use common::{assert_well_formed, beans, classify, family, CLUSTER};
use hadoop_jmx_exporter::family::SampleValue;
use hadoop_jmx_exporter::states::UNKNOWN_STATE;
use hadoop_jmx_exporter::DaemonKind;
use prometheus::{Encoder, TextEncoder};
use serde_json::{json, Value};

fn namenode_response(host: &str, ha_state: &str) -> Value {
    let live_nodes = json!({
        "dn1.example.com:9866": {
            "infoAddr": "10.0.0.1:9864",
            "infoSecureAddr": "10.0.0.1:0",
            "xferaddr": "10.0.0.1:9866",
            "version": "3.3.6",
            "adminState": "Decommissioned",
            "capacity": 1000,
            "usedSpace": 400,
            "lastContact": 2
        }
    });
    let dead_nodes = json!({
        "dn2.example.com:9866": {
            "lastContact": 300,
            "decommissioned": false,
            "xferaddr": "10.0.0.2:9866"
        }
    });
    json!({
        "beans": [
            {
                "name": "Hadoop:service=NameNode,name=JvmMetrics",
                "tag.Hostname": host,
                "MemHeapUsedM": 512.5,
                "MemNonHeapUsedM": 64,
                "GcCount": 7,
                "GcCountParNew": 3
            },
            {
                "name": "Hadoop:service=NameNode,name=RpcActivityForPort8020",
                "tag.port": "8020",
                "tag.Hostname": host,
                "RpcQueueTimeNumOps": 10,
                "RpcProcessingTimeNumOps": 12,
                "RpcQueueTimeAvgTime": 0.5
            },
            {
                "name": "Hadoop:service=NameNode,name=NameNodeActivity",
                "tag.Hostname": host,
                "GetListingOps": 42,
                "CreateFileOps": 3
            },
            {
                "name": "Hadoop:service=NameNode,name=FSNamesystem",
                "tag.Hostname": host,
                "tag.HAState": ha_state,
                "CapacityTotal": 1000,
                "CapacityUsed": 400
            },
            {
                "name": "Hadoop:service=NameNode,name=FSNamesystemState",
                "FSState": "Operational",
                "NumLiveDataNodes": 3,
                "NumDeadDataNodes": 1
            },
            {
                "name": "Hadoop:service=NameNode,name=NameNodeInfo",
                "LiveNodes": live_nodes.to_string(),
                "DeadNodes": dead_nodes.to_string(),
                "PercentUsed": " 40.0 "
            }
        ]
    })
}

#[test]
fn test_raw_names_collapse_into_one_family() {
    let output = classify(DaemonKind::NameNode, &[beans(namenode_response("nn1", "active"))]);
    let families = &output.families;
    assert_well_formed(families);

    let rpc = family(families, "hadoop_hdfs_namenode_rpc_method_called_total");
    assert_eq!(rpc.labels, vec!["cluster", "tag", "method", "_target"]);
    assert_eq!(rpc.gauge_value(&[CLUSTER, "8020", "RpcQueueTime", "nn1"]), Some(10.0));
    assert_eq!(rpc.gauge_value(&[CLUSTER, "8020", "RpcProcessingTime", "nn1"]), Some(12.0));
    assert_eq!(
        families
            .iter()
            .filter(|f| f.name == "hadoop_hdfs_namenode_rpc_method_called_total")
            .count(),
        1
    );

    let mem = family(families, "hadoop_hdfs_namenode_jvm_mem_used_mebibytes");
    assert_eq!(mem.gauge_value(&[CLUSTER, "Heap", "nn1"]), Some(512.5));
    assert_eq!(mem.gauge_value(&[CLUSTER, "NonHeap", "nn1"]), Some(64.0));

    let gc = family(families, "hadoop_hdfs_namenode_jvm_gc_count");
    assert_eq!(gc.gauge_value(&[CLUSTER, "total", "nn1"]), Some(7.0));
    assert_eq!(gc.gauge_value(&[CLUSTER, "ParNew", "nn1"]), Some(3.0));
}

#[test]
fn test_catalog_metrics_absent_from_bean_read_zero() {
    let output = classify(DaemonKind::NameNode, &[beans(namenode_response("nn1", "active"))]);
    let families = &output.families;

    let ops = family(families, "hadoop_hdfs_namenode_nnactivity_operations_total");
    assert_eq!(ops.gauge_value(&[CLUSTER, "GetListing", "nn1"]), Some(42.0));
    assert_eq!(ops.gauge_value(&[CLUSTER, "CreateFile", "nn1"]), Some(3.0));
    assert_eq!(ops.gauge_value(&[CLUSTER, "FilesRenamed", "nn1"]), Some(0.0));

    let rpc = family(families, "hadoop_hdfs_namenode_rpc_method_called_total");
    assert_eq!(rpc.gauge_value(&[CLUSTER, "8020", "RpcLockWaitTime", "nn1"]), Some(0.0));
}

#[test]
fn test_state_strings_map_to_codes() {
    let output = classify(DaemonKind::NameNode, &[beans(namenode_response("nn1", "active"))]);
    let families = &output.families;

    let ha = family(families, "hadoop_hdfs_namenode_fsname_system_hastate");
    assert_eq!(ha.gauge_value(&[CLUSTER, "nn1"]), Some(1.0));

    let fs_state = families.get("FSNamesystemState/FSState").expect("FSState declared");
    assert_eq!(fs_state.gauge_value(&[CLUSTER, "nn1"]), Some(1.0));

    let admin = family(families, "hadoop_hdfs_namenode_nninfo_live_nodes_admin_state");
    assert_eq!(
        admin.gauge_value(&[
            CLUSTER,
            "dn1.example.com:9866",
            "10.0.0.1:9864",
            "10.0.0.1:0",
            "10.0.0.1:9866",
            "3.3.6",
            "nn1"
        ]),
        Some(2.0)
    );
}

#[test]
fn test_unknown_state_exports_sentinel() {
    let output = classify(DaemonKind::NameNode, &[beans(namenode_response("nn1", "observer"))]);
    let ha = family(&output.families, "hadoop_hdfs_namenode_fsname_system_hastate");
    assert_eq!(ha.gauge_value(&[CLUSTER, "nn1"]), Some(UNKNOWN_STATE));
}

#[test]
fn test_grouped_families_carry_discriminator_labels() {
    let output = classify(DaemonKind::NameNode, &[beans(namenode_response("nn1", "standby"))]);
    let families = &output.families;

    let capacity = family(families, "hadoop_hdfs_namenode_fsname_system_capacity_bytes");
    assert_eq!(capacity.labels, vec!["cluster", "mode", "_target"]);
    assert_eq!(capacity.gauge_value(&[CLUSTER, "Total", "nn1"]), Some(1000.0));
    assert_eq!(capacity.gauge_value(&[CLUSTER, "Used", "nn1"]), Some(400.0));

    let datanodes = family(families, "hadoop_hdfs_namenode_fsname_system_state_datanodes_num");
    assert_eq!(datanodes.gauge_value(&[CLUSTER, "Live", "nn1"]), Some(3.0));
    assert_eq!(datanodes.gauge_value(&[CLUSTER, "Dead", "nn1"]), Some(1.0));
}

#[test]
fn test_namenode_info_expands_node_lists() {
    let output = classify(DaemonKind::NameNode, &[beans(namenode_response("nn1", "active"))]);
    let families = &output.families;

    let count = family(families, "hadoop_hdfs_namenode_nninfo_live_nodes_count");
    assert_eq!(count.gauge_value(&[CLUSTER, "nn1"]), Some(1.0));

    let capacity = family(families, "hadoop_hdfs_namenode_nninfo_live_nodes_capacity");
    assert_eq!(capacity.samples.len(), 1);
    assert_eq!(capacity.samples[0].value, SampleValue::Gauge(1000.0));

    let dead = family(families, "hadoop_hdfs_namenode_nninfo_dead_nodes_last_contact");
    assert_eq!(
        dead.gauge_value(&[CLUSTER, "dn2.example.com:9866", "false", "10.0.0.2:9866", "nn1"]),
        Some(300.0)
    );

    let percent = family(families, "hadoop_hdfs_namenode_nninfo_percent_used");
    assert_eq!(percent.gauge_value(&[CLUSTER, "nn1"]), Some(40.0));

    assert_eq!(output.discovered, vec!["http://10.0.0.1:9864/jmx".to_string()]);
}

#[test]
fn test_every_target_fills_the_same_families() {
    let output = classify(
        DaemonKind::NameNode,
        &[
            beans(namenode_response("nn1", "active")),
            beans(namenode_response("nn2", "standby")),
        ],
    );
    let families = &output.families;
    assert_well_formed(families);

    let ha = family(families, "hadoop_hdfs_namenode_fsname_system_hastate");
    assert_eq!(ha.gauge_value(&[CLUSTER, "nn1"]), Some(1.0));
    assert_eq!(ha.gauge_value(&[CLUSTER, "nn2"]), Some(2.0));
}

#[test]
fn test_empty_cycle_has_no_families() {
    let output = classify(DaemonKind::NameNode, &[]);
    assert!(output.families.is_empty());
    assert!(output.discovered.is_empty());

    let output = classify(DaemonKind::NameNode, &[Vec::new()]);
    assert!(output.families.is_empty());
}

#[test]
fn test_cycles_do_not_share_state() {
    let first = classify(DaemonKind::NameNode, &[beans(namenode_response("nn1", "active"))]);
    let second = classify(DaemonKind::NameNode, &[beans(namenode_response("nn2", "active"))]);

    let ha = family(&second.families, "hadoop_hdfs_namenode_fsname_system_hastate");
    assert_eq!(ha.samples.len(), 1);
    assert_eq!(ha.gauge_value(&[CLUSTER, "nn1"]), None);
    assert_eq!(first.families.len(), second.families.len());
}

/// NameNode response with the StartupProgress and RetryCache beans and every
/// NameNodeInfo attribute populated. `live_nodes`, when given, replaces the
/// LiveNodes string.
fn namenode_detailed_response(live_nodes: Option<&str>) -> Value {
    let mut response = namenode_response("nn1", "active");
    let list = response["beans"].as_array_mut().expect("bean array");

    let info = list
        .iter_mut()
        .find(|bean| bean["name"] == "Hadoop:service=NameNode,name=NameNodeInfo")
        .expect("NameNodeInfo bean");
    if let Some(live_nodes) = live_nodes {
        info["LiveNodes"] = json!(live_nodes);
    }
    info["DecomNodes"] = json!(json!({
        "dn3.example.com:9866": {
            "xferaddr": "10.0.0.3:9866",
            "underReplicatedBlocks": 5,
            "decommissionOnlyReplicas": 1,
            "underReplicateInOpenFiles": 0
        }
    })
    .to_string());
    info["EnteringMaintenanceNodes"] = json!(json!({
        "dn4.example.com:9866": {
            "xferaddr": "10.0.0.4:9866",
            "underReplicatedBlocks": 2,
            "maintenanceOnlyReplicas": 4
        }
    })
    .to_string());
    info["NodeUsage"] = json!(json!({
        "nodeUsage": {"min": "1.50%", "median": "2.00%", "max": "3.25%", "stdDev": "0.50%"}
    })
    .to_string());
    info["CorruptFiles"] = json!(r#"["/data/a","/data/b"]"#);
    info["SoftwareVersion"] = json!("3.3.6");
    info["Safemode"] = json!("");

    list.push(json!({
        "name": "Hadoop:service=NameNode,name=StartupProgress",
        "ElapsedTime": 1200,
        "PercentComplete": 1.0,
        "LoadingEditsCount": 3,
        "LoadingEditsElapsedTime": 450,
        "LoadingFsImageTotal": 8
    }));
    list.push(json!({
        "name": "Hadoop:service=NameNode,name=RetryCache.NameNodeRetryCache",
        "CacheHit": 2,
        "CacheUpdated": 5
    }));
    response
}

#[test]
fn test_startup_progress_phases() {
    let output = classify(DaemonKind::NameNode, &[beans(namenode_detailed_response(None))]);
    let families = &output.families;
    assert_well_formed(families);

    let count = family(families, "hadoop_hdfs_namenode_startup_process_phase_count");
    assert_eq!(count.labels, vec!["cluster", "phase", "_target"]);
    assert_eq!(count.gauge_value(&[CLUSTER, "LoadingEdits", "nn1"]), Some(3.0));
    assert_eq!(count.gauge_value(&[CLUSTER, "SafeMode", "nn1"]), Some(0.0));

    let elapsed = family(families, "hadoop_hdfs_namenode_startup_process_total_elapsed_time_milliseconds");
    assert_eq!(elapsed.gauge_value(&[CLUSTER, "-", "nn1"]), Some(1200.0));

    let phase_elapsed = family(families, "hadoop_hdfs_namenode_startup_process_phase_elapsed_time_milliseconds");
    assert_eq!(phase_elapsed.gauge_value(&[CLUSTER, "LoadingEdits", "nn1"]), Some(450.0));

    let total = family(families, "hadoop_hdfs_namenode_startup_process_phase_total");
    assert_eq!(total.gauge_value(&[CLUSTER, "LoadingFsImage", "nn1"]), Some(8.0));
}

#[test]
fn test_retry_cache_split_by_mode() {
    let output = classify(DaemonKind::NameNode, &[beans(namenode_detailed_response(None))]);
    let cache = family(&output.families, "hadoop_hdfs_namenode_cache_total");
    assert_eq!(cache.labels, vec!["cluster", "mode", "_target"]);
    assert_eq!(cache.gauge_value(&[CLUSTER, "Hit", "nn1"]), Some(2.0));
    assert_eq!(cache.gauge_value(&[CLUSTER, "Updated", "nn1"]), Some(5.0));
    assert_eq!(cache.gauge_value(&[CLUSTER, "Cleared", "nn1"]), Some(0.0));
}

#[test]
fn test_namenode_info_secondary_lists() {
    let output = classify(DaemonKind::NameNode, &[beans(namenode_detailed_response(None))]);
    let families = &output.families;
    assert_well_formed(families);

    let usage_min = family(families, "hadoop_hdfs_namenode_nninfo_node_usage_min");
    assert_eq!(usage_min.gauge_value(&[CLUSTER, "nn1"]), Some(1.5));
    let usage_max = family(families, "hadoop_hdfs_namenode_nninfo_node_usage_max");
    assert_eq!(usage_max.gauge_value(&[CLUSTER, "nn1"]), Some(3.25));

    let decom_count = family(families, "hadoop_hdfs_namenode_nninfo_decom_nodes_count");
    assert_eq!(decom_count.gauge_value(&[CLUSTER, "nn1"]), Some(1.0));
    let decom = family(families, "hadoop_hdfs_namenode_nninfo_decom_nodes_under_replicated_blocks");
    assert_eq!(decom.labels, vec!["cluster", "datanode", "xferaddr", "_target"]);
    assert_eq!(
        decom.gauge_value(&[CLUSTER, "dn3.example.com:9866", "10.0.0.3:9866", "nn1"]),
        Some(5.0)
    );

    let maintenance_count = family(families, "hadoop_hdfs_namenode_nninfo_maintenance_nodes_count");
    assert_eq!(maintenance_count.gauge_value(&[CLUSTER, "nn1"]), Some(1.0));
    let open_files = family(
        families,
        "hadoop_hdfs_namenode_nninfo_entering_maintenance_nodes_under_replicate_in_open_files",
    );
    assert_eq!(
        open_files.gauge_value(&[CLUSTER, "dn4.example.com:9866", "10.0.0.4:9866", "nn1"]),
        Some(0.0)
    );

    let version = family(families, "hadoop_hdfs_namenode_nninfo_software_version");
    assert_eq!(version.labels, vec!["cluster", "software_version", "_target"]);
    assert_eq!(version.gauge_value(&[CLUSTER, "3.3.6", "nn1"]), Some(0.0));

    let corrupt = family(families, "hadoop_hdfs_namenode_nninfo_corrupt_file_count");
    assert_eq!(corrupt.gauge_value(&[CLUSTER, "nn1"]), Some(2.0));

    let safe_mode = family(families, "hadoop_hdfs_namenode_nninfo_safe_mode");
    assert_eq!(safe_mode.gauge_value(&[CLUSTER, "nn1"]), Some(0.0));
}

#[test]
fn test_malformed_node_list_skips_only_its_expansion() {
    let output = classify(DaemonKind::NameNode, &[beans(namenode_detailed_response(Some("{not json")))]);
    let families = &output.families;
    assert_well_formed(families);

    assert!(family(families, "hadoop_hdfs_namenode_nninfo_live_nodes_count").samples.is_empty());
    assert!(family(families, "hadoop_hdfs_namenode_nninfo_live_nodes_capacity").samples.is_empty());
    assert!(output.discovered.is_empty());

    let decom_count = family(families, "hadoop_hdfs_namenode_nninfo_decom_nodes_count");
    assert_eq!(decom_count.gauge_value(&[CLUSTER, "nn1"]), Some(1.0));
    let usage_min = family(families, "hadoop_hdfs_namenode_nninfo_node_usage_min");
    assert_eq!(usage_min.gauge_value(&[CLUSTER, "nn1"]), Some(1.5));
    let safe_mode = family(families, "hadoop_hdfs_namenode_nninfo_safe_mode");
    assert_eq!(safe_mode.gauge_value(&[CLUSTER, "nn1"]), Some(0.0));
    let dead = family(families, "hadoop_hdfs_namenode_nninfo_dead_nodes_count");
    assert_eq!(dead.gauge_value(&[CLUSTER, "nn1"]), Some(1.0));
}

fn journalnode_response() -> Value {
    json!({
        "beans": [
            {
                "name": "Hadoop:service=JournalNode,name=Journal-mycluster",
                "tag.Hostname": "jn1",
                "Syncs60sNumOps": 100,
                "Syncs60s99thPercentileLatencyMicros": 90,
                "Syncs60s50thPercentileLatencyMicros": 10,
                "Syncs60s95thPercentileLatencyMicros": 50,
                "Syncs60s75thPercentileLatencyMicros": 20,
                "TxnsWritten": 7,
                "UnlistedCounter": 3
            }
        ]
    })
}

#[test]
fn test_sync_percentiles_fold_into_histogram() {
    let output = classify(DaemonKind::JournalNode, &[beans(journalnode_response())]);
    let families = &output.families;
    assert_well_formed(families);

    let sync60 = family(families, "hadoop_hdfs_journalnode_sync60s_latency_microseconds");
    assert_eq!(sync60.labels, vec!["cluster", "host", "_target"]);
    assert_eq!(sync60.samples.len(), 1);
    assert_eq!(sync60.samples[0].label_values, vec![CLUSTER, "jn1", "jn1"]);
    match &sync60.samples[0].value {
        SampleValue::Histogram(hv) => {
            assert_eq!(
                hv.buckets,
                vec![
                    (0.5, 10.0),
                    (0.75, 20.0),
                    (0.95, 50.0),
                    (0.99, 90.0),
                    (f64::INFINITY, 100.0)
                ]
            );
            assert_eq!(hv.sum, 170.0);
            assert_eq!(hv.count(), 100.0);
        }
        other => panic!("expected a histogram, got {:?}", other),
    }

    // Windows without any attribute in the bean stay empty.
    let sync300 = family(families, "hadoop_hdfs_journalnode_sync300s_latency_microseconds");
    assert!(sync300.samples.is_empty());
}

#[test]
fn test_journalnode_gauges_and_unknown_keys() {
    let output = classify(DaemonKind::JournalNode, &[beans(journalnode_response())]);
    let families = &output.families;

    let txns = family(families, "hadoop_hdfs_journalnode_txns_written");
    assert_eq!(txns.gauge_value(&[CLUSTER, "jn1", "jn1"]), Some(7.0));
    let bytes = family(families, "hadoop_hdfs_journalnode_bytes_written");
    assert_eq!(bytes.gauge_value(&[CLUSTER, "jn1", "jn1"]), Some(0.0));

    assert!(families.by_name("hadoop_hdfs_journalnode_unlisted_counter").is_none());
}

#[test]
fn test_histogram_text_exposition() {
    let output = classify(DaemonKind::JournalNode, &[beans(journalnode_response())]);
    let metric_families = output.families.into_metric_families();
    assert!(metric_families.iter().all(|mf| !mf.get_metric().is_empty()));

    let mut buffer = Vec::new();
    TextEncoder::new()
        .encode(&metric_families, &mut buffer)
        .expect("encodes");
    let text = String::from_utf8(buffer).expect("utf8");

    let series = r#"hadoop_hdfs_journalnode_sync60s_latency_microseconds"#;
    let labels = r#"cluster="c1",host="jn1",_target="jn1""#;
    assert!(text.contains("# TYPE hadoop_hdfs_journalnode_sync60s_latency_microseconds histogram"));
    assert!(text.contains(&format!("{}_bucket{{{},le=\"0.5\"}} 10\n", series, labels)), "{}", text);
    assert!(text.contains(&format!("{}_bucket{{{},le=\"0.99\"}} 90\n", series, labels)), "{}", text);
    assert!(text.contains(&format!("{}_bucket{{{},le=\"+Inf\"}} 100\n", series, labels)), "{}", text);
    assert!(text.contains(&format!("{}_sum{{{}}} 170\n", series, labels)), "{}", text);
    assert!(text.contains(&format!("{}_count{{{}}} 100\n", series, labels)), "{}", text);
    assert_eq!(text.matches("le=\"+Inf\"").count(), 1);
}
