//! Metric schema catalog.
//!
//! Each daemon category has a set of subsystems (`JvmMetrics`, `QueueMetrics`,
//! ...) mapping raw JMX attribute names to help text. The built-in schemas are
//! compiled in from `metrics/<service>/<Subsystem>.json`; an override directory
//! with the same layout can replace or extend them at startup.

use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

macro_rules! embedded {
    ($service:literal, $subsystem:literal) => {
        (
            $service,
            $subsystem,
            include_str!(concat!("../metrics/", $service, "/", $subsystem, ".json")),
        )
    };
}

static EMBEDDED: &[(&str, &str, &str)] = &[
    embedded!("common", "JvmMetrics"),
    embedded!("common", "OperatingSystem"),
    embedded!("common", "RpcActivity"),
    embedded!("common", "RpcDetailedActivity"),
    embedded!("common", "UgiMetrics"),
    embedded!("common", "MetricsSystem"),
    embedded!("common", "Runtime"),
    embedded!("namenode", "NameNodeActivity"),
    embedded!("namenode", "StartupProgress"),
    embedded!("namenode", "FSNamesystem"),
    embedded!("namenode", "FSNamesystemState"),
    embedded!("namenode", "RetryCache"),
    embedded!("namenode", "NameNodeInfo"),
    embedded!("datanode", "DataNodeInfo"),
    embedded!("datanode", "DataNodeActivity"),
    embedded!("datanode", "FSDatasetState"),
    embedded!("journalnode", "JournalNode"),
    embedded!("resourcemanager", "RMNMInfo"),
    embedded!("resourcemanager", "QueueMetrics"),
    embedded!("resourcemanager", "ClusterMetrics"),
    embedded!("nodemanager", "NodeManagerMetrics"),
    embedded!("nodemanager", "ShuffleMetrics"),
    embedded!("coordinator", "Memory"),
    embedded!("coordinator", "Threading"),
    embedded!("coordinator", "QueryManager"),
    embedded!("coordinator", "SqlTaskManager"),
    embedded!("coordinator", "HeartbeatFailureDetector"),
    embedded!("coordinator", "ClusterMemoryManager"),
    embedded!("coordinator", "ClusterMemoryPool"),
    embedded!("coordinator", "GcMonitor"),
    embedded!("coordinator", "GcYoung"),
    embedded!("coordinator", "GcOld"),
    embedded!("hiveserver2", "HiveServer2"),
];

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("unknown schema category '{0}'")]
    UnknownService(String),

    #[error("failed to read schema file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("schema {service}/{subsystem} is not valid JSON: {source}")]
    Parse {
        service: String,
        subsystem: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("schema {service}/{subsystem} must be an object of name -> description")]
    NotAnObject { service: String, subsystem: String },
}

/// Raw names of one subsystem, in file order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubsystemSchema {
    entries: Map<String, Value>,
}

impl SubsystemSchema {
    /// `(raw name, description)` pairs in file order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(name, desc)| (name.as_str(), desc.as_str().unwrap_or("")))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn description(&self, name: &str) -> &str {
        self.entries.get(name).and_then(Value::as_str).unwrap_or("")
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> FromIterator<(&'a str, &'a str)> for SubsystemSchema {
    fn from_iter<I: IntoIterator<Item = (&'a str, &'a str)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
                .collect(),
        }
    }
}

/// Subsystem name -> schema, in load order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricSchema {
    subsystems: Vec<(String, SubsystemSchema)>,
}

impl MetricSchema {
    pub fn get(&self, subsystem: &str) -> Option<&SubsystemSchema> {
        self.subsystems
            .iter()
            .find(|(name, _)| name == subsystem)
            .map(|(_, schema)| schema)
    }

    pub fn subsystem_names(&self) -> impl Iterator<Item = &str> {
        self.subsystems.iter().map(|(name, _)| name.as_str())
    }

    /// Inserts or replaces a subsystem, keeping the position of a replaced one.
    pub fn insert(&mut self, subsystem: &str, schema: SubsystemSchema) {
        match self.subsystems.iter_mut().find(|(name, _)| name == subsystem) {
            Some(slot) => slot.1 = schema,
            None => self.subsystems.push((subsystem.to_string(), schema)),
        }
    }

    /// Adds every subsystem of `other`, replacing same-named ones.
    pub fn merge(&mut self, other: MetricSchema) {
        for (name, schema) in other.subsystems {
            self.insert(&name, schema);
        }
    }

    pub fn len(&self) -> usize {
        self.subsystems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subsystems.is_empty()
    }
}

fn parse_subsystem(service: &str, subsystem: &str, raw: &str) -> Result<SubsystemSchema, CatalogError> {
    let value: Value = serde_json::from_str(raw).map_err(|source| CatalogError::Parse {
        service: service.to_string(),
        subsystem: subsystem.to_string(),
        source,
    })?;
    match value {
        Value::Object(entries) => Ok(SubsystemSchema { entries }),
        _ => Err(CatalogError::NotAnObject {
            service: service.to_string(),
            subsystem: subsystem.to_string(),
        }),
    }
}

/// Loader for per-category schemas.
pub struct SchemaCatalog;

impl SchemaCatalog {
    /// Categories with a built-in schema.
    pub fn services() -> Vec<&'static str> {
        let mut services: Vec<&str> = EMBEDDED.iter().map(|(svc, _, _)| *svc).collect();
        services.dedup();
        services
    }

    /// Loads every subsystem of `service`, applying `override_dir/<service>/*.json`
    /// on top of the built-in schema when present.
    pub fn load(service: &str, override_dir: Option<&Path>) -> Result<MetricSchema, CatalogError> {
        let mut schema = MetricSchema::default();
        for (_, subsystem, raw) in EMBEDDED.iter().filter(|(svc, _, _)| *svc == service) {
            schema.insert(subsystem, parse_subsystem(service, subsystem, raw)?);
        }

        if let Some(dir) = override_dir {
            let service_dir = dir.join(service);
            if service_dir.is_dir() {
                schema.merge(Self::load_dir(service, &service_dir)?);
            }
        }

        if schema.is_empty() {
            return Err(CatalogError::UnknownService(service.to_string()));
        }
        debug!("Loaded {} schema subsystems for '{}'", schema.len(), service);
        Ok(schema)
    }

    fn load_dir(service: &str, dir: &Path) -> Result<MetricSchema, CatalogError> {
        let io_err = |source| CatalogError::Io {
            path: dir.to_path_buf(),
            source,
        };
        let mut paths: Vec<PathBuf> = fs::read_dir(dir)
            .map_err(io_err)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("json"))
            .collect();
        paths.sort();

        let mut schema = MetricSchema::default();
        for path in paths {
            let Some(subsystem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let raw = fs::read_to_string(&path).map_err(|source| CatalogError::Io {
                path: path.clone(),
                source,
            })?;
            schema.insert(subsystem, parse_subsystem(service, subsystem, &raw)?);
            info!("Schema override {}/{} loaded from {}", service, subsystem, path.display());
        }
        Ok(schema)
    }
}
