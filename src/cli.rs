//! CLI arguments and subcommands for hadoop-jmx-exporter.
//!
//! This module defines the command-line interface structure using the clap library,
//! including all flags, options, and subcommands.

use clap::{Parser, Subcommand, ValueEnum};
use std::net::IpAddr;
use std::path::PathBuf;

/// Log level options for CLI parsing
#[derive(Debug, Clone, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Parses a level name as written in a config file.
    pub fn parse(name: &str) -> Option<Self> {
        <Self as ValueEnum>::from_str(name.trim(), true).ok()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Off => "off",
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// Configuration format options for output
#[derive(Debug, Clone, ValueEnum)]
pub enum ConfigFormat {
    Yaml,
    Json,
    Toml,
}

/// Main CLI arguments structure
#[derive(Parser, Debug)]
#[command(
    name = "hadoop-jmx-exporter",
    about = "Prometheus exporter for Hadoop, YARN, Hive and Trino JMX metrics",
    long_about = "Prometheus exporter for Hadoop, YARN, Hive and Trino JMX metrics.\n\n\
                  Polls the /jmx JSON endpoints of NameNodes, DataNodes, JournalNodes, \
                  ResourceManagers, NodeManagers, HiveServer2 and Trino coordinators, and \
                  republishes the beans as labeled Prometheus metric families.",
    version,
    propagate_version = true
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Cluster name, exported as the `cluster` label
    #[arg(long)]
    pub cluster: Option<String>,

    /// NameNode JMX URLs (comma-separated)
    #[arg(long)]
    pub nns: Option<String>,

    /// DataNode JMX URLs (comma-separated)
    #[arg(long)]
    pub dns: Option<String>,

    /// JournalNode JMX URLs (comma-separated)
    #[arg(long)]
    pub jns: Option<String>,

    /// ResourceManager JMX URLs (comma-separated)
    #[arg(long)]
    pub rms: Option<String>,

    /// NodeManager JMX URLs (comma-separated)
    #[arg(long)]
    pub nms: Option<String>,

    /// Trino coordinator JMX URLs (comma-separated)
    #[arg(long)]
    pub trino: Option<String>,

    /// HiveServer2 JMX URLs (comma-separated)
    #[arg(long)]
    pub hs2: Option<String>,

    /// ResourceManager queue filter (regex, matched from the start of the queue name)
    #[arg(long)]
    pub queue: Option<String>,

    /// HTTP listen port
    #[arg(short = 'p', long)]
    pub port: Option<u16>,

    /// Bind to specific interface/IP
    #[arg(long)]
    pub bind: Option<IpAddr>,

    /// Log level [default: info, or log_level from the config file]
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Config file (YAML/JSON/TOML)
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Disable all config file loading
    #[arg(long)]
    pub no_config: bool,

    /// Print effective merged config and exit
    #[arg(long)]
    pub show_config: bool,

    /// Output format for --show-config
    #[arg(long, value_enum, default_value = "yaml")]
    pub config_format: ConfigFormat,

    /// Validate config and exit (return code 1 on error)
    #[arg(long)]
    pub check_config: bool,

    /// Cache metrics for N seconds
    #[arg(long)]
    pub cache_ttl: Option<u64>,

    /// Per-request scrape timeout in seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Do not verify TLS certificates of https targets
    #[arg(long)]
    pub no_verify: bool,

    /// Ignore proxy settings from the environment
    #[arg(long)]
    pub no_trust_env: bool,

    /// Directory with schema overrides (<dir>/<service>/<Subsystem>.json)
    #[arg(long)]
    pub schema_dir: Option<PathBuf>,

    /// Do not discover DataNodes/NodeManagers from the NameNode/ResourceManager
    #[arg(long)]
    pub disable_discovery: bool,

    /// Disable /health endpoint
    #[arg(long)]
    pub disable_health: bool,

    /// Enable TLS/SSL for HTTPS
    #[arg(long)]
    pub enable_tls: bool,

    /// Path to TLS certificate file (PEM format)
    #[arg(long)]
    pub tls_cert: Option<PathBuf>,

    /// Path to TLS private key file (PEM format)
    #[arg(long)]
    pub tls_key: Option<PathBuf>,
}

/// Subcommands for additional functionality
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate configuration and schemas
    Check {
        /// Also probe every configured target once
        #[arg(long)]
        targets: bool,
    },

    /// Generate configuration files
    Config {
        /// Output file path ("-" for stdout)
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value = "yaml")]
        format: ConfigFormat,

        /// Include comments and examples
        #[arg(long)]
        commented: bool,
    },

    /// Run collection cycles and print the resulting families
    Test {
        /// Number of test iterations
        #[arg(short = 'n', long, default_value_t = 1)]
        iterations: usize,

        /// Print every sample
        #[arg(long)]
        verbose: bool,
    },

    /// List the built-in metric schemas
    Schemas {
        /// Show every raw metric name with its description
        #[arg(long)]
        verbose: bool,

        /// Filter by service name
        #[arg(short = 's', long)]
        service: Option<String>,
    },
}

/// Splits a comma-separated URL list, dropping empty entries.
pub fn split_urls(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
