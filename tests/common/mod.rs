//! Shared fixtures for the classification tests.

#![allow(dead_code)]

use hadoop_jmx_exporter::family::{CycleFamilies, OutputFamily};
use hadoop_jmx_exporter::scrape::parse_beans;
use hadoop_jmx_exporter::{BeanList, CollectorOptions, CycleOutput, DaemonKind};
use serde_json::Value;
use std::collections::HashSet;

pub const CLUSTER: &str = "c1";

/// Parses a `/jmx` response body into a bean list.
pub fn beans(body: Value) -> BeanList {
    parse_beans(body).expect("fixture is a bean list")
}

/// Runs one classification cycle for `kind` over the given endpoint responses.
pub fn classify(kind: DaemonKind, lists: &[BeanList]) -> CycleOutput {
    classify_with(kind, &CollectorOptions::new(CLUSTER), lists)
}

pub fn classify_with(kind: DaemonKind, options: &CollectorOptions, lists: &[BeanList]) -> CycleOutput {
    let engine = kind.engine(options).expect("built-in schema loads");
    engine.run_cycle(lists)
}

/// Family by exported name, failing the test when it is missing.
pub fn family<'a>(families: &'a CycleFamilies, name: &str) -> &'a OutputFamily {
    families
        .by_name(name)
        .unwrap_or_else(|| panic!("family '{}' not declared", name))
}

/// Every sample carries exactly one value per declared label and every
/// exported name is declared once.
pub fn assert_well_formed(families: &CycleFamilies) {
    let mut names = HashSet::new();
    for fam in families.iter() {
        assert!(names.insert(fam.name.as_str()), "family '{}' declared twice", fam.name);
        assert_eq!(fam.labels.first().map(String::as_str), Some("cluster"), "{}", fam.name);
        assert_eq!(fam.labels.last().map(String::as_str), Some("_target"), "{}", fam.name);
        for sample in &fam.samples {
            assert_eq!(
                sample.label_values.len(),
                fam.labels.len(),
                "arity mismatch in '{}': {:?}",
                fam.name,
                sample.label_values
            );
        }
    }
}
