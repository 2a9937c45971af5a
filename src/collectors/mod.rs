//! Per-daemon collectors.
//!
//! Each daemon category pairs a [`ScrapeSource`] with a
//! [`ClassificationEngine`] built from the category's schema and rule sets.
//! Hadoop daemons also get the shared JVM/RPC/UGI rules from [`common`].

pub mod common;
pub mod datanode;
pub mod hiveserver2;
pub mod journalnode;
pub mod namenode;
pub mod nodemanager;
pub mod resourcemanager;
pub mod route;
pub mod trino;

use crate::catalog::{CatalogError, MetricSchema, SchemaCatalog};
use crate::engine::{ClassificationEngine, SubsystemRules, TargetResolver};
use crate::scrape::{ScrapeError, ScrapeOptions, ScrapeSource};
use crate::scrape_stats::ScrapeStats;
use once_cell::sync::Lazy;
use prometheus::proto::MetricFamily;
use regex::Regex;
use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

/// Daemon categories the exporter knows how to classify.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DaemonKind {
    NameNode,
    DataNode,
    JournalNode,
    ResourceManager,
    NodeManager,
    TrinoCoordinator,
    HiveServer2,
}

impl DaemonKind {
    pub const ALL: [DaemonKind; 7] = [
        DaemonKind::NameNode,
        DaemonKind::DataNode,
        DaemonKind::JournalNode,
        DaemonKind::ResourceManager,
        DaemonKind::NodeManager,
        DaemonKind::TrinoCoordinator,
        DaemonKind::HiveServer2,
    ];

    pub fn component(&self) -> &'static str {
        match self {
            DaemonKind::NameNode | DaemonKind::DataNode | DaemonKind::JournalNode => "hdfs",
            DaemonKind::ResourceManager | DaemonKind::NodeManager => "yarn",
            DaemonKind::TrinoCoordinator => "trino",
            DaemonKind::HiveServer2 => "hive",
        }
    }

    /// Schema catalog category.
    pub fn service(&self) -> &'static str {
        match self {
            DaemonKind::NameNode => "namenode",
            DaemonKind::DataNode => "datanode",
            DaemonKind::JournalNode => "journalnode",
            DaemonKind::ResourceManager => "resourcemanager",
            DaemonKind::NodeManager => "nodemanager",
            DaemonKind::TrinoCoordinator => "coordinator",
            DaemonKind::HiveServer2 => "hiveserver2",
        }
    }

    /// Exported family prefix, e.g. `hadoop_hdfs_namenode`.
    pub fn prefix(&self) -> String {
        match self {
            DaemonKind::TrinoCoordinator => format!("trino_{}", self.service()),
            _ => format!("hadoop_{}_{}", self.component(), self.service()),
        }
    }

    /// Whether the daemon exposes the Hadoop metrics2 JVM/RPC/UGI beans.
    pub fn uses_common(&self) -> bool {
        !matches!(self, DaemonKind::TrinoCoordinator | DaemonKind::HiveServer2)
    }

    pub fn target_resolver(&self) -> TargetResolver {
        match self {
            DaemonKind::NameNode => TargetResolver::Hostname(Some("FSNamesystem")),
            DaemonKind::JournalNode => TargetResolver::Hostname(Some("name=Journal-")),
            DaemonKind::ResourceManager => TargetResolver::Hostname(Some("ClusterMetrics")),
            DaemonKind::TrinoCoordinator => TargetResolver::RuntimeName,
            _ => TargetResolver::Hostname(None),
        }
    }

    /// Classification engine with this category's schema and rule sets.
    pub fn engine(&self, options: &CollectorOptions) -> Result<ClassificationEngine, CatalogError> {
        let schema = load_schema(*self, options.schema_dir.as_deref())?;
        Ok(ClassificationEngine::new(
            options.cluster.clone(),
            self.prefix(),
            schema,
            self.rules(&options.queue_filter),
            self.target_resolver(),
        ))
    }

    fn rules(&self, queue_filter: &Regex) -> Vec<Box<dyn SubsystemRules>> {
        let mut rules = if self.uses_common() { common::rules() } else { Vec::new() };
        rules.extend(match self {
            DaemonKind::NameNode => namenode::rules(),
            DaemonKind::DataNode => datanode::rules(),
            DaemonKind::JournalNode => journalnode::rules(),
            DaemonKind::ResourceManager => resourcemanager::rules(queue_filter.clone()),
            DaemonKind::NodeManager => nodemanager::rules(),
            DaemonKind::TrinoCoordinator => trino::rules(),
            DaemonKind::HiveServer2 => hiveserver2::rules(),
        });
        rules
    }
}

impl fmt::Display for DaemonKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.service())
    }
}

/// Loads the schema of one daemon category, with the common schema merged in
/// for Hadoop daemons.
pub fn load_schema(kind: DaemonKind, override_dir: Option<&std::path::Path>) -> Result<MetricSchema, CatalogError> {
    let mut schema = if kind.uses_common() {
        SchemaCatalog::load("common", override_dir)?
    } else {
        MetricSchema::default()
    };
    schema.merge(SchemaCatalog::load(kind.service(), override_dir)?);
    Ok(schema)
}

/// Downstream JMX URLs found by an upstream daemon during its last cycle.
#[derive(Debug, Clone, Default)]
pub struct Discovery {
    urls: Arc<RwLock<Vec<String>>>,
}

impl Discovery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, urls: Vec<String>) {
        if let Ok(mut guard) = self.urls.write() {
            *guard = urls;
        }
    }

    pub fn snapshot(&self) -> Vec<String> {
        self.urls.read().map(|guard| guard.clone()).unwrap_or_default()
    }
}

#[derive(Debug, Error)]
pub enum CollectorError {
    #[error("failed to load schema: {0}")]
    Catalog(#[from] CatalogError),

    #[error("failed to build scrape source: {0}")]
    Scrape(#[from] ScrapeError),
}

static DEFAULT_QUEUE_FILTER: Lazy<Regex> = Lazy::new(|| {
    resourcemanager::queue_filter(resourcemanager::DEFAULT_QUEUE_REGEX).expect("valid default queue regex")
});

/// Settings shared by every collector.
#[derive(Debug, Clone)]
pub struct CollectorOptions {
    pub cluster: String,
    pub queue_filter: Regex,
    pub schema_dir: Option<PathBuf>,
    pub scrape: ScrapeOptions,
}

impl CollectorOptions {
    pub fn new(cluster: impl Into<String>) -> Self {
        Self {
            cluster: cluster.into(),
            queue_filter: DEFAULT_QUEUE_FILTER.clone(),
            schema_dir: None,
            scrape: ScrapeOptions::default(),
        }
    }
}

/// One pollable daemon category.
pub struct DaemonCollector {
    kind: DaemonKind,
    source: ScrapeSource,
    engine: ClassificationEngine,
    discovery_out: Option<Discovery>,
    discovery_in: Option<Discovery>,
}

impl DaemonCollector {
    pub fn new(kind: DaemonKind, urls: Vec<String>, options: &CollectorOptions) -> Result<Self, CollectorError> {
        let engine = kind.engine(options)?;
        let source = ScrapeSource::new(kind.service(), urls, &options.scrape)?;
        Ok(Self {
            kind,
            source,
            engine,
            discovery_out: None,
            discovery_in: None,
        })
    }

    pub fn with_stats(mut self, stats: Arc<ScrapeStats>) -> Self {
        self.source = self.source.with_stats(stats);
        self
    }

    /// Publishes URLs discovered during each cycle to `discovery`.
    pub fn publishing_to(mut self, discovery: Discovery) -> Self {
        self.discovery_out = Some(discovery);
        self
    }

    /// Takes target URLs from `discovery` before each scrape.
    pub fn discovering_from(mut self, discovery: Discovery) -> Self {
        self.discovery_in = Some(discovery);
        self
    }

    pub fn kind(&self) -> DaemonKind {
        self.kind
    }

    pub fn targets(&self) -> usize {
        self.source.urls().len()
    }

    /// Scrapes all targets and classifies the beans into fresh families.
    #[instrument(skip(self), fields(kind = %self.kind))]
    pub async fn collect(&mut self) -> Vec<MetricFamily> {
        if let Some(discovery) = &self.discovery_in {
            let urls = discovery.snapshot();
            if !urls.is_empty() && urls != self.source.urls() {
                info!("Discovered {} {} targets", urls.len(), self.kind);
                self.source.set_urls(urls);
            }
        }
        if self.source.urls().is_empty() {
            debug!("No targets for {}", self.kind);
            return Vec::new();
        }

        let bean_lists = self.source.scrape().await;
        if bean_lists.is_empty() {
            warn!("No {} target answered", self.kind);
        }
        let output = self.engine.run_cycle(&bean_lists);

        if let Some(discovery) = &self.discovery_out {
            if !output.discovered.is_empty() {
                discovery.publish(output.discovered);
            }
        }
        output.families.into_metric_families()
    }
}

/// Target URL lists per daemon category.
#[derive(Debug, Clone, Default)]
pub struct TargetLists {
    pub namenode: Vec<String>,
    pub datanode: Vec<String>,
    pub journalnode: Vec<String>,
    pub resourcemanager: Vec<String>,
    pub nodemanager: Vec<String>,
    pub trino: Vec<String>,
    pub hiveserver2: Vec<String>,
}

impl TargetLists {
    pub fn get(&self, kind: DaemonKind) -> &[String] {
        match kind {
            DaemonKind::NameNode => &self.namenode,
            DaemonKind::DataNode => &self.datanode,
            DaemonKind::JournalNode => &self.journalnode,
            DaemonKind::ResourceManager => &self.resourcemanager,
            DaemonKind::NodeManager => &self.nodemanager,
            DaemonKind::TrinoCoordinator => &self.trino,
            DaemonKind::HiveServer2 => &self.hiveserver2,
        }
    }

    pub fn is_empty(&self) -> bool {
        DaemonKind::ALL.iter().all(|kind| self.get(*kind).is_empty())
    }
}

/// Builds a collector for every configured category. A category whose schema
/// fails to load is logged and skipped; the rest still run.
///
/// With `discovery` enabled, DataNodes and NodeManagers without explicit
/// targets are discovered from the NameNode and ResourceManager.
pub fn build_collectors(
    targets: &TargetLists,
    options: &CollectorOptions,
    discovery: bool,
    stats: Option<Arc<ScrapeStats>>,
) -> Vec<DaemonCollector> {
    let datanodes = Discovery::new();
    let nodemanagers = Discovery::new();
    let discovers = |kind: DaemonKind| {
        discovery
            && match kind {
                DaemonKind::NameNode => targets.datanode.is_empty(),
                DaemonKind::ResourceManager => targets.nodemanager.is_empty(),
                DaemonKind::DataNode => targets.datanode.is_empty() && !targets.namenode.is_empty(),
                DaemonKind::NodeManager => {
                    targets.nodemanager.is_empty() && !targets.resourcemanager.is_empty()
                }
                _ => false,
            }
    };

    let mut collectors = Vec::new();
    for kind in DaemonKind::ALL {
        let urls = targets.get(kind).to_vec();
        if urls.is_empty() && !discovers(kind) {
            continue;
        }
        let mut collector = match DaemonCollector::new(kind, urls, options) {
            Ok(collector) => collector,
            Err(e) => {
                warn!("Skipping {} collector: {}", kind, e);
                continue;
            }
        };
        if discovers(kind) {
            collector = match kind {
                DaemonKind::NameNode => collector.publishing_to(datanodes.clone()),
                DaemonKind::ResourceManager => collector.publishing_to(nodemanagers.clone()),
                DaemonKind::DataNode => collector.discovering_from(datanodes.clone()),
                DaemonKind::NodeManager => collector.discovering_from(nodemanagers.clone()),
                _ => collector,
            };
        }
        if let Some(stats) = &stats {
            collector = collector.with_stats(stats.clone());
        }
        info!("Registered {} collector with {} targets", kind, collector.targets());
        collectors.push(collector);
    }
    collectors
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefixes() {
        assert_eq!(DaemonKind::NameNode.prefix(), "hadoop_hdfs_namenode");
        assert_eq!(DaemonKind::NodeManager.prefix(), "hadoop_yarn_nodemanager");
        assert_eq!(DaemonKind::TrinoCoordinator.prefix(), "trino_coordinator");
        assert_eq!(DaemonKind::HiveServer2.prefix(), "hadoop_hive_hiveserver2");
    }

    #[test]
    fn test_every_kind_has_a_schema() {
        for kind in DaemonKind::ALL {
            let schema = load_schema(kind, None).unwrap();
            assert!(schema.get(match kind {
                DaemonKind::NameNode => "NameNodeActivity",
                DaemonKind::DataNode => "DataNodeActivity",
                DaemonKind::JournalNode => "JournalNode",
                DaemonKind::ResourceManager => "QueueMetrics",
                DaemonKind::NodeManager => "NodeManagerMetrics",
                DaemonKind::TrinoCoordinator => "QueryManager",
                DaemonKind::HiveServer2 => "HiveServer2",
            })
            .is_some());
            assert_eq!(schema.get("JvmMetrics").is_some(), kind.uses_common());
        }
    }

    #[test]
    fn test_discovery_wiring() {
        let targets = TargetLists {
            namenode: vec!["http://nn:9870/jmx".to_string()],
            ..Default::default()
        };
        let collectors = build_collectors(&targets, &CollectorOptions::new("c1"), true, None);
        let kinds: Vec<DaemonKind> = collectors.iter().map(DaemonCollector::kind).collect();
        assert_eq!(kinds, vec![DaemonKind::NameNode, DaemonKind::DataNode]);

        let collectors = build_collectors(&targets, &CollectorOptions::new("c1"), false, None);
        assert_eq!(collectors.len(), 1);
    }

    #[test]
    fn test_discovery_slot() {
        let slot = Discovery::new();
        let reader = slot.clone();
        slot.publish(vec!["http://dn1:9864/jmx".to_string()]);
        assert_eq!(reader.snapshot(), vec!["http://dn1:9864/jmx".to_string()]);
    }
}
