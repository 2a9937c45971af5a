//! CLI command implementations for hadoop-jmx-exporter.
//!
//! This module provides implementations for all CLI subcommands:
//! - `check`: Configuration, schema and target validation
//! - `config`: Configuration file generation
//! - `test`: One-shot collection cycles
//! - `schemas`: Built-in schema listing

pub mod check;
pub mod config;
pub mod schemas;
pub mod test;

// Re-export command functions
pub use check::command_check;
pub use config::command_config;
pub use schemas::command_schemas;
pub use test::command_test;
