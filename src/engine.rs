//! Two-phase classification engine.
//!
//! A collection cycle runs in two phases over the bean lists scraped from
//! every endpoint of one daemon category:
//!
//! 1. **setup** walks the first non-empty bean list and lets every matching
//!    rule declare the families it will fill. Declarations are idempotent, so
//!    several beans of the same subsystem are harmless.
//! 2. **fill** walks every bean list, resolving the daemon host per list, and
//!    appends samples. Fill can only add samples through [`FillSink`]; it
//!    cannot declare families.

use crate::bean::{resolve_target, Bean, BeanList, PLACEHOLDER};
use crate::catalog::{MetricSchema, SubsystemSchema};
use crate::family::{CycleFamilies, HistogramValue};
use crate::naming::family_name;
use serde_json::Value;
use std::collections::BTreeSet;
use tracing::debug;

/// Read-only view handed to every rule invocation.
#[derive(Debug, Clone, Copy)]
pub struct RuleContext<'a> {
    pub cluster: &'a str,
    pub prefix: &'a str,
    /// Host resolved for the bean list being processed.
    pub target: &'a str,
    pub schema: &'a MetricSchema,
}

impl<'a> RuleContext<'a> {
    /// Exported name: the daemon prefix followed by `parts`.
    pub fn name(&self, parts: &[&str]) -> String {
        let mut all = Vec::with_capacity(parts.len() + 1);
        all.push(self.prefix);
        all.extend_from_slice(parts);
        family_name(&all)
    }

    pub fn subsystem(&self, subsystem: &str) -> Option<&'a SubsystemSchema> {
        self.schema.get(subsystem)
    }

    /// Label values framed by `cluster` first and `_target` last.
    pub fn labels<S: AsRef<str>>(&self, middle: &[S]) -> Vec<String> {
        let mut values = Vec::with_capacity(middle.len() + 2);
        values.push(self.cluster.to_string());
        values.extend(middle.iter().map(|s| s.as_ref().to_string()));
        values.push(self.target.to_string());
        values
    }
}

/// Label names framed by `cluster` first and `_target` last.
pub fn label_names<'a>(middle: &[&'a str]) -> Vec<&'a str> {
    let mut names = Vec::with_capacity(middle.len() + 2);
    names.push("cluster");
    names.extend_from_slice(middle);
    names.push("_target");
    names
}

/// Namespaces a family key by subsystem so equal raw names in different
/// subsystems never collide.
pub fn family_key(subsystem: &str, key: &str) -> String {
    format!("{}/{}", subsystem, key)
}

/// Append-only access to the cycle's families during fill.
pub struct FillSink<'a> {
    families: &'a mut CycleFamilies,
    discovered: &'a mut BTreeSet<String>,
}

impl<'a> FillSink<'a> {
    pub fn add<S: AsRef<str>>(&mut self, key: &str, label_values: &[S], value: f64) {
        self.families.add(key, label_values, value);
    }

    pub fn add_histogram<S: AsRef<str>>(&mut self, key: &str, label_values: &[S], value: HistogramValue) {
        self.families.add_histogram(key, label_values, value);
    }

    pub fn is_declared(&self, key: &str) -> bool {
        self.families.contains(key)
    }

    /// Records a JMX endpoint of a downstream daemon found in this bean.
    pub fn discover(&mut self, url: String) {
        self.discovered.insert(url);
    }
}

/// Handler for one subsystem of one daemon category.
pub trait SubsystemRules: Send + Sync {
    /// Catalog subsystem this rule set reads.
    fn subsystem(&self) -> &str;

    /// Whether this rule set handles a bean with the given object name.
    fn matches(&self, bean_name: &str) -> bool {
        bean_name.contains(self.subsystem())
    }

    fn setup(&self, ctx: &RuleContext<'_>, bean: &Bean, families: &mut CycleFamilies);

    fn fill(&self, ctx: &RuleContext<'_>, bean: &Bean, sink: &mut FillSink<'_>);
}

/// How the daemon host of a bean list is found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetResolver {
    /// First `tag.Hostname`, preferring beans whose name contains the marker.
    Hostname(Option<&'static str>),
    /// The host part of the JVM runtime name (`pid@host`).
    RuntimeName,
}

impl TargetResolver {
    pub fn resolve(&self, beans: &[Bean]) -> Option<String> {
        match self {
            TargetResolver::Hostname(marker) => resolve_target(beans, *marker),
            TargetResolver::RuntimeName => beans
                .iter()
                .find(|b| b.object_name() == "java.lang:type=Runtime")
                .and_then(|b| b.attribute("Name"))
                .and_then(Value::as_str)
                .and_then(|name| name.split_once('@'))
                .map(|(_, host)| host.to_string()),
        }
    }
}

/// Result of one cycle.
#[derive(Debug, Default)]
pub struct CycleOutput {
    pub families: CycleFamilies,
    pub discovered: Vec<String>,
}

/// Rule sets and schema for one daemon category.
pub struct ClassificationEngine {
    cluster: String,
    prefix: String,
    schema: MetricSchema,
    rules: Vec<Box<dyn SubsystemRules>>,
    target: TargetResolver,
}

impl ClassificationEngine {
    pub fn new(
        cluster: impl Into<String>,
        prefix: impl Into<String>,
        schema: MetricSchema,
        rules: Vec<Box<dyn SubsystemRules>>,
        target: TargetResolver,
    ) -> Self {
        Self {
            cluster: cluster.into(),
            prefix: prefix.into(),
            schema,
            rules,
            target,
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn schema(&self) -> &MetricSchema {
        &self.schema
    }

    fn context<'a>(&'a self, target: &'a str) -> RuleContext<'a> {
        RuleContext {
            cluster: &self.cluster,
            prefix: &self.prefix,
            target,
            schema: &self.schema,
        }
    }

    /// Declares families from the first non-empty list, then fills from all.
    pub fn run_cycle(&self, bean_lists: &[BeanList]) -> CycleOutput {
        let mut families = CycleFamilies::new();
        let mut discovered = BTreeSet::new();

        let Some(first) = bean_lists.iter().find(|list| !list.is_empty()) else {
            debug!("No beans for '{}', nothing to classify", self.prefix);
            return CycleOutput::default();
        };

        let setup_target = self.target.resolve(first).unwrap_or_else(|| PLACEHOLDER.to_string());
        let ctx = self.context(&setup_target);
        for bean in first {
            let name = bean.object_name();
            for rule in self.rules.iter().filter(|r| r.matches(name)) {
                rule.setup(&ctx, bean, &mut families);
            }
        }

        for beans in bean_lists.iter().filter(|list| !list.is_empty()) {
            let target = self.target.resolve(beans).unwrap_or_else(|| {
                debug!("No host found in bean list for '{}'", self.prefix);
                PLACEHOLDER.to_string()
            });
            let ctx = self.context(&target);
            let mut sink = FillSink {
                families: &mut families,
                discovered: &mut discovered,
            };
            for bean in beans {
                let name = bean.object_name();
                for rule in self.rules.iter().filter(|r| r.matches(name)) {
                    rule.fill(&ctx, bean, &mut sink);
                }
            }
        }

        CycleOutput {
            families,
            discovered: discovered.into_iter().collect(),
        }
    }
}
