//! Config command implementation.
//!
//! Generates configuration files in various formats.

use std::fs;
use std::path::PathBuf;

use crate::cli::ConfigFormat;
use crate::config::{render_config, Config};

/// Generates configuration files.
pub fn command_config(
    output: Option<PathBuf>,
    format: ConfigFormat,
    commented: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::default();
    let output = match output {
        Some(path) => path,
        None => PathBuf::from("hadoop-jmx-exporter.yaml"),
    };

    let is_yaml = matches!(format, ConfigFormat::Yaml);
    let mut content = render_config(&config, format)?;
    if commented && is_yaml {
        content = add_config_comments(content);
    }

    if output.to_string_lossy() == "-" {
        print!("{}", content);
    } else {
        fs::write(&output, content)?;
        println!("✅ Configuration written to: {}", output.display());
    }

    Ok(())
}

/// Adds comments to YAML configuration.
fn add_config_comments(yaml: String) -> String {
    let comments = r#"# Hadoop JMX Exporter Configuration
# =================================
#
# Server Configuration
# --------------------
# bind: "0.0.0.0"              # Bind IP (0.0.0.0 = all interfaces)
# port: 6688                   # HTTP port
#
# Cluster
# -------
# cluster: "hadoop"            # Value of the `cluster` label
# queue: "root.*"              # ResourceManager queue filter (regex, anchored at the start)
#
# Targets (JMX URLs per daemon category)
# --------------------------------------
# targets:
#   namenode: ["http://nn1:9870/jmx"]
#   datanode: []               # Empty = discovered from the NameNode
#   journalnode: ["http://jn1:8480/jmx"]
#   resourcemanager: ["http://rm1:8088/jmx"]
#   nodemanager: []            # Empty = discovered from the ResourceManager
#   trino: ["http://coordinator:8080/v1/jmx/mbean"]
#   hiveserver2: ["http://hs2:10002/jmx"]
#
# Scraping
# --------
# cache_ttl: 15                # Reuse the last collection for N seconds
# timeout_secs: 5              # Per-request timeout
# verify_tls: true             # Verify certificates of https targets
# trust_env: true              # Honor HTTP(S)_PROXY from the environment
# schema_dir: null             # Schema overrides (<dir>/<service>/<Subsystem>.json)
# enable_discovery: true       # Discover DataNodes/NodeManagers
#
# Feature Flags
# -------------
# enable_health: true          # Enable /health endpoint
#
# Logging
# -------
# log_level: "info"            # off, error, warn, info, debug, trace
#
# TLS/SSL Configuration
# ---------------------
# enable_tls: false            # Enable HTTPS (default: false)
# tls_cert_path: null          # Path to TLS certificate (PEM format)
# tls_key_path: null           # Path to TLS private key (PEM format)
"#;

    format!("{comments}\n{yaml}")
}
