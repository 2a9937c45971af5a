//! Per-cycle family registry.
//!
//! Rules declare families during setup and append samples during fill. The
//! registry is rebuilt for every collection cycle and converted into
//! `prometheus` protobuf families at the end, so nothing leaks between cycles.

use ahash::AHashMap;
use prometheus::proto::{self, LabelPair, Metric, MetricFamily, MetricType};
use tracing::{debug, error};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FamilyKind {
    Gauge,
    Histogram,
}

/// Cumulative buckets of one histogram sample. The last bucket is `+Inf`.
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramValue {
    pub buckets: Vec<(f64, f64)>,
    pub sum: f64,
}

impl HistogramValue {
    /// Builds a histogram from latency percentiles.
    ///
    /// `percentiles` are `(bound, value)` pairs in any order; they are sorted by
    /// bound and followed by a `+Inf` bucket holding `count`. The sum is the
    /// total of the finite bucket values.
    pub fn from_percentiles(mut percentiles: Vec<(f64, f64)>, count: f64) -> Self {
        percentiles.sort_by(|a, b| a.0.total_cmp(&b.0));
        let sum = percentiles.iter().map(|(_, v)| v).sum();
        percentiles.push((f64::INFINITY, count));
        Self {
            buckets: percentiles,
            sum,
        }
    }

    /// Value of the `+Inf` bucket.
    pub fn count(&self) -> f64 {
        self.buckets
            .last()
            .filter(|(bound, _)| bound.is_infinite())
            .map(|(_, v)| *v)
            .unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SampleValue {
    Gauge(f64),
    Histogram(HistogramValue),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub label_values: Vec<String>,
    pub value: SampleValue,
}

/// One declared output family.
#[derive(Debug, Clone)]
pub struct OutputFamily {
    pub name: String,
    pub help: String,
    pub kind: FamilyKind,
    pub labels: Vec<String>,
    pub samples: Vec<Sample>,
}

impl OutputFamily {
    /// Value of the first gauge sample whose labels equal `label_values`.
    pub fn gauge_value(&self, label_values: &[&str]) -> Option<f64> {
        self.samples
            .iter()
            .find(|s| s.label_values.iter().map(String::as_str).eq(label_values.iter().copied()))
            .and_then(|s| match &s.value {
                SampleValue::Gauge(v) => Some(*v),
                SampleValue::Histogram(_) => None,
            })
    }

    fn to_proto(&self) -> MetricFamily {
        let metrics = self
            .samples
            .iter()
            .map(|sample| {
                let mut m = Metric::default();
                m.set_label(
                    self.labels
                        .iter()
                        .zip(&sample.label_values)
                        .map(|(name, value)| {
                            let mut lp = LabelPair::default();
                            lp.set_name(name.clone());
                            lp.set_value(value.clone());
                            lp
                        })
                        .collect(),
                );
                match &sample.value {
                    SampleValue::Gauge(v) => {
                        let mut g = proto::Gauge::default();
                        g.set_value(*v);
                        m.set_gauge(g);
                    }
                    SampleValue::Histogram(hv) => m.set_histogram(histogram_proto(hv)),
                }
                m
            })
            .collect();

        let mut mf = MetricFamily::default();
        mf.set_name(self.name.clone());
        mf.set_help(self.help.clone());
        mf.set_field_type(match self.kind {
            FamilyKind::Gauge => MetricType::GAUGE,
            FamilyKind::Histogram => MetricType::HISTOGRAM,
        });
        mf.set_metric(metrics);
        mf
    }
}

// The text encoder appends its own `+Inf` bucket from the sample count, so
// only the finite buckets go into the bucket list.
fn histogram_proto(hv: &HistogramValue) -> proto::Histogram {
    let mut h = proto::Histogram::default();
    h.set_sample_count(cumulative_count(hv.count()));
    h.set_sample_sum(hv.sum);
    h.bucket = hv
        .buckets
        .iter()
        .filter(|(bound, _)| bound.is_finite())
        .map(|(bound, value)| {
            let mut b = proto::Bucket::default();
            b.set_upper_bound(*bound);
            b.set_cumulative_count(cumulative_count(*value));
            b
        })
        .collect();
    h
}

/// Percentile latencies are fractional; bucket counts are rounded to the
/// nearest integer.
fn cumulative_count(value: f64) -> u64 {
    value.max(0.0).round() as u64
}

/// Families declared and filled during one collection cycle.
#[derive(Debug, Default)]
pub struct CycleFamilies {
    order: Vec<OutputFamily>,
    index: AHashMap<String, usize>,
}

impl CycleFamilies {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a gauge family unless `key` is already declared.
    /// Returns whether a new family was created.
    pub fn declare_gauge(&mut self, key: &str, name: &str, help: &str, labels: &[&str]) -> bool {
        self.declare(key, name, help, labels, FamilyKind::Gauge)
    }

    /// Declares a histogram family unless `key` is already declared.
    pub fn declare_histogram(&mut self, key: &str, name: &str, help: &str, labels: &[&str]) -> bool {
        self.declare(key, name, help, labels, FamilyKind::Histogram)
    }

    fn declare(&mut self, key: &str, name: &str, help: &str, labels: &[&str], kind: FamilyKind) -> bool {
        if self.index.contains_key(key) {
            return false;
        }
        self.index.insert(key.to_string(), self.order.len());
        self.order.push(OutputFamily {
            name: name.to_string(),
            help: help.to_string(),
            kind,
            labels: labels.iter().map(|l| l.to_string()).collect(),
            samples: Vec::new(),
        });
        true
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&OutputFamily> {
        self.index.get(key).map(|&i| &self.order[i])
    }

    /// Looks a family up by its exported name.
    pub fn by_name(&self, name: &str) -> Option<&OutputFamily> {
        self.order.iter().find(|f| f.name == name)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &OutputFamily> {
        self.order.iter()
    }

    /// Appends a gauge sample to a declared family.
    pub fn add<S: AsRef<str>>(&mut self, key: &str, label_values: &[S], value: f64) {
        self.push(key, label_values, SampleValue::Gauge(value), FamilyKind::Gauge);
    }

    /// Appends a histogram sample to a declared family.
    pub fn add_histogram<S: AsRef<str>>(&mut self, key: &str, label_values: &[S], value: HistogramValue) {
        self.push(key, label_values, SampleValue::Histogram(value), FamilyKind::Histogram);
    }

    fn push<S: AsRef<str>>(&mut self, key: &str, label_values: &[S], value: SampleValue, kind: FamilyKind) {
        let Some(&i) = self.index.get(key) else {
            debug!("No family declared for '{}', dropping sample", key);
            return;
        };
        let family = &mut self.order[i];

        if family.kind != kind {
            debug_assert!(false, "family '{}' is not a {:?}", family.name, kind);
            error!("Family '{}' is not a {:?}, dropping sample", family.name, kind);
            return;
        }
        if label_values.len() != family.labels.len() {
            debug_assert!(
                false,
                "family '{}' expects {} label values, got {}",
                family.name,
                family.labels.len(),
                label_values.len()
            );
            error!(
                "Family '{}' expects {} label values, got {}; dropping sample",
                family.name,
                family.labels.len(),
                label_values.len()
            );
            return;
        }

        family.samples.push(Sample {
            label_values: label_values.iter().map(|v| v.as_ref().to_string()).collect(),
            value,
        });
    }

    /// Converts to protobuf families in declaration order, skipping families
    /// without samples.
    pub fn into_metric_families(self) -> Vec<MetricFamily> {
        self.order
            .iter()
            .filter(|f| !f.samples.is_empty())
            .map(OutputFamily::to_proto)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_declaration_wins() {
        let mut families = CycleFamilies::new();
        assert!(families.declare_gauge("Rpc/a", "first", "help", &["cluster", "_target"]));
        assert!(!families.declare_gauge("Rpc/a", "second", "other", &["cluster"]));
        assert_eq!(families.len(), 1);
        let fam = families.get("Rpc/a").unwrap();
        assert_eq!(fam.name, "first");
        assert_eq!(fam.labels, vec!["cluster", "_target"]);
    }

    #[test]
    fn test_add_to_undeclared_key_is_dropped() {
        let mut families = CycleFamilies::new();
        families.add("missing", &["x"], 1.0);
        assert!(families.is_empty());
    }

    #[test]
    fn test_add_records_sample() {
        let mut families = CycleFamilies::new();
        families.declare_gauge("k", "n", "h", &["cluster", "_target"]);
        families.add("k", &["c1", "host1"], 2.5);
        assert_eq!(families.get("k").unwrap().gauge_value(&["c1", "host1"]), Some(2.5));
    }

    #[test]
    #[cfg(not(debug_assertions))]
    fn test_arity_mismatch_is_dropped_in_release() {
        let mut families = CycleFamilies::new();
        families.declare_gauge("k", "n", "h", &["cluster", "_target"]);
        families.add("k", &["c1"], 2.5);
        assert!(families.get("k").unwrap().samples.is_empty());
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "expects 2 label values")]
    fn test_arity_mismatch_asserts_in_debug() {
        let mut families = CycleFamilies::new();
        families.declare_gauge("k", "n", "h", &["cluster", "_target"]);
        families.add("k", &["c1"], 2.5);
    }

    #[test]
    fn test_histogram_from_percentiles() {
        let hv = HistogramValue::from_percentiles(
            vec![(0.95, 50.0), (0.5, 10.0), (0.99, 90.0), (0.75, 20.0)],
            100.0,
        );
        let bounds: Vec<f64> = hv.buckets.iter().map(|(b, _)| *b).collect();
        assert_eq!(bounds, vec![0.5, 0.75, 0.95, 0.99, f64::INFINITY]);
        assert_eq!(hv.count(), 100.0);
        assert_eq!(hv.sum, 170.0);
    }

    #[test]
    #[allow(deprecated)]
    fn test_into_metric_families_skips_empty_and_keeps_order() {
        let mut families = CycleFamilies::new();
        families.declare_gauge("b", "fam_b", "B", &["cluster"]);
        families.declare_gauge("empty", "fam_empty", "E", &["cluster"]);
        families.declare_histogram("h", "fam_h", "H", &["cluster"]);
        families.add("b", &["c"], 1.0);
        families.add_histogram(
            "h",
            &["c"],
            HistogramValue::from_percentiles(vec![(0.5, 10.0)], 4.0),
        );

        let mfs = families.into_metric_families();
        let names: Vec<&str> = mfs.iter().map(|mf| mf.name()).collect();
        assert_eq!(names, vec!["fam_b", "fam_h"]);

        assert_eq!(mfs[0].get_field_type(), MetricType::GAUGE);
        assert_eq!(mfs[0].get_metric()[0].get_gauge().value(), 1.0);
        assert_eq!(mfs[0].get_metric()[0].get_label()[0].value(), "c");

        assert_eq!(mfs[1].get_field_type(), MetricType::HISTOGRAM);
        let h = mfs[1].get_metric()[0].get_histogram();
        assert_eq!(h.sample_count(), 4);
        assert_eq!(h.sample_sum(), 10.0);
        assert_eq!(h.bucket.len(), 1);
    }

    #[test]
    fn test_fractional_bucket_counts_round() {
        let hv = HistogramValue::from_percentiles(vec![(0.5, 2.6), (0.99, 7.4)], 9.5);
        let h = histogram_proto(&hv);
        let counts: Vec<u64> = h.bucket.iter().map(|b| b.cumulative_count()).collect();
        assert_eq!(counts, vec![3, 7]);
        assert_eq!(h.sample_count(), 10);
    }
}
