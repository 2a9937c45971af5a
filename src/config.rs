//! Configuration management for hadoop-jmx-exporter.
//!
//! This module handles loading, merging, and validating configuration from files
//! and CLI arguments. It supports YAML, JSON, and TOML formats.

use crate::cli::{split_urls, Args, ConfigFormat, LogLevel};
use hadoop_jmx_exporter::collectors::resourcemanager::{queue_filter, DEFAULT_QUEUE_REGEX};
use hadoop_jmx_exporter::collectors::{CollectorOptions, TargetLists};
use hadoop_jmx_exporter::scrape::ScrapeOptions;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

// Default configuration constants
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 6688;
pub const DEFAULT_CACHE_TTL: u64 = 15;
pub const DEFAULT_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_CLUSTER: &str = "hadoop";

/// JMX target URLs per daemon category.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetsConfig {
    #[serde(default, alias = "nns")]
    pub namenode: Vec<String>,
    #[serde(default, alias = "dns")]
    pub datanode: Vec<String>,
    #[serde(default, alias = "jns")]
    pub journalnode: Vec<String>,
    #[serde(default, alias = "rms")]
    pub resourcemanager: Vec<String>,
    #[serde(default, alias = "nms")]
    pub nodemanager: Vec<String>,
    #[serde(default)]
    pub trino: Vec<String>,
    #[serde(default, alias = "hs2")]
    pub hiveserver2: Vec<String>,
}

impl TargetsConfig {
    fn all(&self) -> impl Iterator<Item = &String> {
        self.namenode
            .iter()
            .chain(&self.datanode)
            .chain(&self.journalnode)
            .chain(&self.resourcemanager)
            .chain(&self.nodemanager)
            .chain(&self.trino)
            .chain(&self.hiveserver2)
    }

    pub fn is_empty(&self) -> bool {
        self.all().next().is_none()
    }
}

impl From<&TargetsConfig> for TargetLists {
    fn from(t: &TargetsConfig) -> Self {
        TargetLists {
            namenode: t.namenode.clone(),
            datanode: t.datanode.clone(),
            journalnode: t.journalnode.clone(),
            resourcemanager: t.resourcemanager.clone(),
            nodemanager: t.nodemanager.clone(),
            trino: t.trino.clone(),
            hiveserver2: t.hiveserver2.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Server configuration
    pub port: Option<u16>,
    pub bind: Option<String>,

    // Scrape targets
    pub cluster: Option<String>,
    /// ResourceManager queue filter regex
    pub queue: Option<String>,

    // Scraping
    pub cache_ttl: Option<u64>,
    #[serde(alias = "timeout-secs")]
    pub timeout_secs: Option<u64>,
    #[serde(alias = "verify-tls")]
    pub verify_tls: Option<bool>,
    #[serde(alias = "trust-env")]
    pub trust_env: Option<bool>,
    #[serde(alias = "schema-dir")]
    pub schema_dir: Option<PathBuf>,
    #[serde(alias = "enable-discovery")]
    pub enable_discovery: Option<bool>,

    // Feature flags
    pub enable_health: Option<bool>,

    // Logging
    pub log_level: Option<String>,

    // TLS/SSL Configuration
    #[serde(alias = "enable-tls")]
    pub enable_tls: Option<bool>,
    #[serde(alias = "tls-cert-path")]
    pub tls_cert_path: Option<String>,
    #[serde(alias = "tls-key-path")]
    pub tls_key_path: Option<String>,

    // Kept last so TOML output places the table after plain values.
    #[serde(default)]
    pub targets: TargetsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: Some(DEFAULT_BIND_ADDR.to_string()),
            port: Some(DEFAULT_PORT),
            cluster: Some(DEFAULT_CLUSTER.to_string()),
            targets: TargetsConfig::default(),
            queue: Some(DEFAULT_QUEUE_REGEX.to_string()),
            cache_ttl: Some(DEFAULT_CACHE_TTL),
            timeout_secs: Some(DEFAULT_TIMEOUT_SECS),
            verify_tls: Some(true),
            trust_env: Some(true),
            schema_dir: None,
            enable_discovery: Some(true),
            enable_health: Some(true),
            log_level: Some("info".into()),
            enable_tls: Some(false),
            tls_cert_path: None,
            tls_key_path: None,
        }
    }
}

impl Config {
    /// Effective log level; an unparseable value falls back to info.
    pub fn log_level(&self) -> LogLevel {
        self.log_level
            .as_deref()
            .and_then(LogLevel::parse)
            .unwrap_or(LogLevel::Info)
    }

    pub fn cluster(&self) -> &str {
        self.cluster.as_deref().unwrap_or(DEFAULT_CLUSTER)
    }

    pub fn scrape_options(&self) -> ScrapeOptions {
        ScrapeOptions {
            timeout: Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)),
            verify: self.verify_tls.unwrap_or(true),
            trust_env: self.trust_env.unwrap_or(true),
        }
    }

    /// Options for building the daemon collectors. Fails on an invalid queue regex.
    pub fn collector_options(&self) -> Result<CollectorOptions, Box<dyn std::error::Error>> {
        let pattern = self.queue.as_deref().unwrap_or(DEFAULT_QUEUE_REGEX);
        let mut options = CollectorOptions::new(self.cluster());
        options.queue_filter = queue_filter(pattern)
            .map_err(|e| format!("Invalid queue regex '{}': {}", pattern, e))?;
        options.schema_dir = self.schema_dir.clone();
        options.scrape = self.scrape_options();
        Ok(options)
    }
}

/// Validate effective config (used by --check-config and at startup)
pub fn validate_effective_config(cfg: &Config) -> Result<(), Box<dyn std::error::Error>> {
    if cfg.cluster().trim().is_empty() {
        return Err("cluster must not be empty".into());
    }

    if cfg.targets.is_empty() {
        return Err("No scrape targets configured; set at least one of \
            --nns/--dns/--jns/--rms/--nms/--trino/--hs2"
            .into());
    }

    for url in cfg.targets.all() {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(format!("Target URL must start with http:// or https://: {}", url).into());
        }
    }

    if let Some(queue) = cfg.queue.as_deref() {
        queue_filter(queue).map_err(|e| format!("Invalid queue regex '{}': {}", queue, e))?;
    }

    if let Some(level) = cfg.log_level.as_deref() {
        if LogLevel::parse(level).is_none() {
            return Err(format!(
                "Invalid log_level '{}': expected off, error, warn, info, debug or trace",
                level
            )
            .into());
        }
    }

    if cfg.timeout_secs == Some(0) {
        return Err("timeout_secs must be greater than 0".into());
    }

    if let Some(dir) = cfg.schema_dir.as_deref() {
        if !dir.is_dir() {
            return Err(format!("Schema directory not found: {}", dir.display()).into());
        }
    }

    // TLS validation
    if cfg.enable_tls.unwrap_or(false) {
        match (cfg.tls_cert_path.as_deref(), cfg.tls_key_path.as_deref()) {
            (None, None) => {
                return Err(
                    "TLS is enabled but neither tls_cert_path nor tls_key_path are set".into(),
                );
            }
            (Some(_), None) => {
                return Err("TLS is enabled but tls_key_path is not set".into());
            }
            (None, Some(_)) => {
                return Err("TLS is enabled but tls_cert_path is not set".into());
            }
            (Some(cert), Some(key)) => {
                check_pem_file(cert, "certificate")?;
                check_pem_file(key, "private key")?;
            }
        }
    }

    Ok(())
}

fn check_pem_file(path: &str, what: &str) -> Result<(), Box<dyn std::error::Error>> {
    match fs::metadata(path) {
        Ok(meta) if meta.len() == 0 => Err(format!("TLS {} file is empty: {}", what, path).into()),
        Ok(_) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(format!("TLS {} file not found: {}", what, path).into())
        }
        Err(e) => Err(format!("TLS {} file is not readable: {} ({})", what, path, e).into()),
    }
}

/// Resolves configuration from CLI args, config file, and defaults.
/// This enforces precedence: CLI (if provided) > config file > default.
pub fn resolve_config(args: &Args) -> Result<Config, Box<dyn std::error::Error>> {
    let mut config = if args.no_config {
        Config::default()
    } else {
        load_config(args.config.as_deref().and_then(|p| p.to_str()))?
    };

    if let Some(bind_ip) = args.bind {
        config.bind = Some(bind_ip.to_string());
    }
    if let Some(cli_port) = args.port {
        config.port = Some(cli_port);
    }
    if let Some(cluster) = &args.cluster {
        config.cluster = Some(cluster.clone());
    }
    if let Some(level) = &args.log_level {
        config.log_level = Some(level.as_str().to_string());
    }

    // Target lists: a list given on the CLI replaces the file's list.
    let overrides = [
        (&args.nns, &mut config.targets.namenode),
        (&args.dns, &mut config.targets.datanode),
        (&args.jns, &mut config.targets.journalnode),
        (&args.rms, &mut config.targets.resourcemanager),
        (&args.nms, &mut config.targets.nodemanager),
        (&args.trino, &mut config.targets.trino),
        (&args.hs2, &mut config.targets.hiveserver2),
    ];
    for (cli, target) in overrides {
        if let Some(raw) = cli {
            *target = split_urls(raw);
        }
    }

    if let Some(queue) = &args.queue {
        config.queue = Some(queue.clone());
    }
    if let Some(cache_ttl) = args.cache_ttl {
        config.cache_ttl = Some(cache_ttl);
    }
    if let Some(timeout) = args.timeout_secs {
        config.timeout_secs = Some(timeout);
    }
    if args.no_verify {
        config.verify_tls = Some(false);
    }
    if args.no_trust_env {
        config.trust_env = Some(false);
    }
    if let Some(dir) = &args.schema_dir {
        config.schema_dir = Some(dir.clone());
    }
    if args.disable_discovery {
        config.enable_discovery = Some(false);
    }
    if args.disable_health {
        config.enable_health = Some(false);
    }

    // TLS configuration: CLI wins if provided
    if args.enable_tls {
        config.enable_tls = Some(true);
    }
    if let Some(cert_path) = &args.tls_cert {
        config.tls_cert_path = Some(cert_path.to_string_lossy().to_string());
    }
    if let Some(key_path) = &args.tls_key {
        config.tls_key_path = Some(key_path.to_string_lossy().to_string());
    }

    Ok(config)
}

/// Configuration loading with multiple format support
pub fn load_config(path: Option<&str>) -> Result<Config, Box<dyn std::error::Error>> {
    let path = if let Some(p) = path {
        PathBuf::from(p)
    } else {
        let defaults = [
            "/etc/hadoop-jmx-exporter/config.yaml",
            "/etc/hadoop-jmx-exporter/config.yml",
            "/etc/hadoop-jmx-exporter/config.json",
            "./hadoop-jmx-exporter.yaml",
            "./hadoop-jmx-exporter.yml",
            "./hadoop-jmx-exporter.json",
        ];

        defaults
            .iter()
            .find(|p| Path::new(p).exists())
            .map(PathBuf::from)
            .unwrap_or_default()
    };

    if path.as_os_str().is_empty() || !path.exists() {
        return Ok(Config::default());
    }

    let content = fs::read_to_string(&path)?;
    let config = parse_config(&content, path.extension().and_then(|s| s.to_str()))?;
    info!("Loaded configuration from: {}", path.display());
    Ok(config)
}

/// Parses config text by file extension, defaulting to YAML.
pub fn parse_config(content: &str, extension: Option<&str>) -> Result<Config, Box<dyn std::error::Error>> {
    let config = match extension {
        Some("json") => serde_json::from_str(content)?,
        Some("toml") => toml::from_str(content)?,
        _ => serde_yaml::from_str(content)?,
    };
    Ok(config)
}

pub fn render_config(config: &Config, format: ConfigFormat) -> Result<String, Box<dyn std::error::Error>> {
    let output = match format {
        ConfigFormat::Json => serde_json::to_string_pretty(config)?,
        ConfigFormat::Toml => toml::to_string_pretty(config)?,
        ConfigFormat::Yaml => serde_yaml::to_string(config)?,
    };
    Ok(output)
}

/// Shows configuration in requested format
pub fn show_config(config: &Config, format: ConfigFormat) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", render_config(config, format)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn with_namenode() -> Config {
        Config {
            targets: TargetsConfig {
                namenode: vec!["http://nn:9870/jmx".into()],
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_default_needs_targets() {
        assert!(validate_effective_config(&Config::default()).is_err());
        assert!(validate_effective_config(&with_namenode()).is_ok());
    }

    #[test]
    fn test_rejects_bad_values() {
        let mut cfg = with_namenode();
        cfg.queue = Some("root.(".into());
        assert!(validate_effective_config(&cfg).is_err());

        let mut cfg = with_namenode();
        cfg.targets.trino = vec!["coordinator:8080/v1/jmx/mbean".into()];
        assert!(validate_effective_config(&cfg).is_err());

        let mut cfg = with_namenode();
        cfg.timeout_secs = Some(0);
        assert!(validate_effective_config(&cfg).is_err());

        let mut cfg = with_namenode();
        cfg.cluster = Some("  ".into());
        assert!(validate_effective_config(&cfg).is_err());
    }

    #[test]
    fn test_yaml_aliases() {
        let cfg = parse_config(
            "cluster: prod\ntargets:\n  nns: [\"http://nn:9870/jmx\"]\n  rms: [\"http://rm:8088/jmx\"]\nqueue: \"root.etl.*\"\n",
            Some("yaml"),
        )
        .unwrap();
        assert_eq!(cfg.cluster(), "prod");
        assert_eq!(cfg.targets.namenode.len(), 1);
        assert_eq!(cfg.targets.resourcemanager.len(), 1);
        assert_eq!(cfg.port, None);
    }

    #[test]
    fn test_cli_overrides_file() {
        let args = Args::parse_from([
            "hadoop-jmx-exporter",
            "--no-config",
            "--cluster",
            "c2",
            "--rms",
            "http://rm1:8088/jmx,http://rm2:8088/jmx",
            "--no-verify",
        ]);
        let cfg = resolve_config(&args).unwrap();
        assert_eq!(cfg.cluster(), "c2");
        assert_eq!(cfg.targets.resourcemanager.len(), 2);
        assert_eq!(cfg.verify_tls, Some(false));
        assert!(!cfg.scrape_options().verify);
        assert_eq!(cfg.port, Some(DEFAULT_PORT));
    }

    #[test]
    fn test_round_trip_toml() {
        let rendered = render_config(&with_namenode(), ConfigFormat::Toml).unwrap();
        let parsed = parse_config(&rendered, Some("toml")).unwrap();
        assert_eq!(parsed.targets, with_namenode().targets);
    }

    #[test]
    fn test_log_level_from_file_and_cli() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        std::io::Write::write_all(
            &mut file,
            b"log_level: debug\ntargets:\n  nns: [\"http://nn:9870/jmx\"]\n",
        )
        .unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let args = Args::parse_from(["hadoop-jmx-exporter", "--config", &path]);
        let cfg = resolve_config(&args).unwrap();
        assert!(matches!(cfg.log_level(), LogLevel::Debug));

        let args = Args::parse_from(["hadoop-jmx-exporter", "--config", &path, "--log-level", "warn"]);
        let cfg = resolve_config(&args).unwrap();
        assert!(matches!(cfg.log_level(), LogLevel::Warn));

        let args = Args::parse_from(["hadoop-jmx-exporter", "--no-config"]);
        assert!(matches!(resolve_config(&args).unwrap().log_level(), LogLevel::Info));
    }

    #[test]
    fn test_rejects_unknown_log_level() {
        let mut cfg = with_namenode();
        cfg.log_level = Some("verbose".into());
        assert!(validate_effective_config(&cfg).is_err());

        cfg.log_level = Some("TRACE".into());
        assert!(validate_effective_config(&cfg).is_ok());
    }
}
