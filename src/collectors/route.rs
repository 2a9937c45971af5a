//! Catalog-driven rule sets.
//!
//! Most subsystems follow one shape: walk the catalog names of the subsystem,
//! map each raw name to a [`Route`] (family key, exported name and the label
//! value carved out of the raw name), declare on setup and emit on fill.
//! [`CatalogRules`] captures that shape as a table entry so each daemon only
//! supplies its matcher and its name decomposition.

use crate::bean::Bean;
use crate::engine::{family_key, label_names, FillSink, RuleContext, SubsystemRules};
use crate::family::CycleFamilies;

/// Where one raw metric name goes.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub key: String,
    /// Exported name without the daemon prefix.
    pub name: String,
    /// Fixed help text for grouped families; verbatim families use the catalog.
    pub help: Option<&'static str>,
    /// Discriminator labels carved out of the raw name.
    pub labels: Vec<(&'static str, String)>,
}

impl Route {
    /// One raw name, one family.
    pub fn verbatim(metric: &str, name: impl Into<String>) -> Self {
        Self {
            key: metric.to_string(),
            name: name.into(),
            help: None,
            labels: Vec::new(),
        }
    }

    /// Many raw names collapsing into one family keyed by `key`.
    pub fn group(key: &str, name: &str, help: &'static str) -> Self {
        Self {
            key: key.to_string(),
            name: name.to_string(),
            help: Some(help),
            labels: Vec::new(),
        }
    }

    pub fn label(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.labels.push((name, value.into()));
        self
    }

    /// Declares the family unless already declared. `fixed` are bean-level
    /// label names placed before the route's own labels.
    pub fn declare(
        &self,
        ctx: &RuleContext<'_>,
        families: &mut CycleFamilies,
        subsystem: &str,
        fixed: &[&str],
        catalog_help: &str,
    ) {
        let mut names: Vec<&str> = fixed.to_vec();
        names.extend(self.labels.iter().map(|(name, _)| *name));
        families.declare_gauge(
            &family_key(subsystem, &self.key),
            &ctx.name(&[self.name.as_str()]),
            self.help.unwrap_or(catalog_help),
            &label_names(&names),
        );
    }

    pub fn emit(&self, ctx: &RuleContext<'_>, sink: &mut FillSink<'_>, subsystem: &str, fixed: &[String], value: f64) {
        let mut values: Vec<&str> = fixed.iter().map(String::as_str).collect();
        values.extend(self.labels.iter().map(|(_, value)| value.as_str()));
        sink.add(&family_key(subsystem, &self.key), &ctx.labels(&values), value);
    }
}

pub type Matcher = fn(&str) -> bool;
pub type Router = fn(&str) -> Option<Route>;
pub type FixedLabels = fn(&RuleContext<'_>, &Bean) -> Vec<String>;
pub type ValueOf = fn(&Bean, &str) -> f64;

fn no_fixed_labels(_: &RuleContext<'_>, _: &Bean) -> Vec<String> {
    Vec::new()
}

/// Numeric attribute value, zero when absent.
pub fn plain_value(bean: &Bean, metric: &str) -> f64 {
    bean.number(metric)
}

/// Table-driven rule set over the catalog names of one subsystem.
pub struct CatalogRules {
    subsystem: &'static str,
    matcher: Option<Matcher>,
    router: Router,
    fixed: &'static [&'static str],
    fixed_values: FixedLabels,
    value: ValueOf,
}

impl CatalogRules {
    pub fn new(subsystem: &'static str, router: Router) -> Self {
        Self {
            subsystem,
            matcher: None,
            router,
            fixed: &[],
            fixed_values: no_fixed_labels,
            value: plain_value,
        }
    }

    /// Replaces the default "bean name contains the subsystem" match.
    pub fn matching(mut self, matcher: Matcher) -> Self {
        self.matcher = Some(matcher);
        self
    }

    /// Bean-level labels shared by every family of the subsystem.
    pub fn fixed_labels(mut self, names: &'static [&'static str], values: FixedLabels) -> Self {
        self.fixed = names;
        self.fixed_values = values;
        self
    }

    pub fn value(mut self, value: ValueOf) -> Self {
        self.value = value;
        self
    }

    pub fn boxed(self) -> Box<dyn SubsystemRules> {
        Box::new(self)
    }
}

impl SubsystemRules for CatalogRules {
    fn subsystem(&self) -> &str {
        self.subsystem
    }

    fn matches(&self, bean_name: &str) -> bool {
        match self.matcher {
            Some(matcher) => matcher(bean_name),
            None => bean_name.contains(self.subsystem),
        }
    }

    fn setup(&self, ctx: &RuleContext<'_>, _bean: &Bean, families: &mut CycleFamilies) {
        let Some(schema) = ctx.subsystem(self.subsystem) else {
            return;
        };
        for (metric, help) in schema.iter() {
            if let Some(route) = (self.router)(metric) {
                route.declare(ctx, families, self.subsystem, self.fixed, help);
            }
        }
    }

    fn fill(&self, ctx: &RuleContext<'_>, bean: &Bean, sink: &mut FillSink<'_>) {
        let Some(schema) = ctx.subsystem(self.subsystem) else {
            return;
        };
        let fixed = (self.fixed_values)(ctx, bean);
        for metric in schema.names() {
            if let Some(route) = (self.router)(metric) {
                route.emit(ctx, sink, self.subsystem, &fixed, (self.value)(bean, metric));
            }
        }
    }
}
