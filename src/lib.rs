//! Hadoop JMX Exporter Library
//!
//! Polls the `/jmx` JSON endpoints of Hadoop-family daemons (HDFS NameNode,
//! DataNode and JournalNode, YARN ResourceManager and NodeManager, HiveServer2)
//! and of a Trino coordinator, and re-publishes the measurements as Prometheus
//! metric families.
//!
//! The heart of the crate is the [`engine`]: rule sets inspect the raw
//! attribute names of each bean, decide which exported family they belong to
//! and which label values they carry, and fold many raw names into one labeled
//! family where they only differ by an operation, method or state.
//!
//! # Usage
//!
//! ```rust,no_run
//! use hadoop_jmx_exporter::collectors::{CollectorOptions, DaemonCollector, DaemonKind};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let options = CollectorOptions::new("prod");
//! let mut collector = DaemonCollector::new(
//!     DaemonKind::NameNode,
//!     vec!["http://namenode:9870/jmx".to_string()],
//!     &options,
//! )?;
//!
//! for family in collector.collect().await {
//!     println!("{}", family.name());
//! }
//! # Ok(())
//! # }
//! ```

pub mod bean;
pub mod catalog;
pub mod collectors;
pub mod engine;
pub mod family;
pub mod naming;
pub mod scrape;
pub mod scrape_stats;
pub mod states;

// Re-export main types for convenience
pub use bean::{Bean, BeanList};
pub use catalog::{MetricSchema, SchemaCatalog};
pub use collectors::{CollectorOptions, DaemonCollector, DaemonKind};
pub use engine::{ClassificationEngine, CycleOutput};
pub use scrape::{ScrapeOptions, ScrapeSource};
pub use scrape_stats::ScrapeStats;
