//! Test command implementation.
//!
//! Runs collection cycles against the configured targets and displays results.

use hadoop_jmx_exporter::collectors::{build_collectors, TargetLists};
use hadoop_jmx_exporter::ScrapeStats;
use prometheus::TextEncoder;
use std::sync::Arc;
use std::time::Instant;

use crate::config::Config;

/// Runs `iterations` collection cycles and prints a per-category summary.
pub async fn command_test(
    iterations: usize,
    verbose: bool,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("🧪 Hadoop JMX Exporter - Test Mode");
    println!("==================================");

    let options = config.collector_options()?;
    let stats = Arc::new(ScrapeStats::new());
    let mut collectors = build_collectors(
        &TargetLists::from(&config.targets),
        &options,
        config.enable_discovery.unwrap_or(true),
        Some(stats.clone()),
    );
    println!("   📦 {} collectors for cluster '{}'", collectors.len(), config.cluster());

    let encoder = TextEncoder::new();
    for iteration in 1..=iterations {
        println!("\n🔄 Iteration {}/{}:", iteration, iterations);
        let start = Instant::now();

        // Sequential on purpose: upstream collectors run first and feed discovery.
        for collector in collectors.iter_mut() {
            let collector_start = Instant::now();
            let families = collector.collect().await;
            let samples: usize = families.iter().map(|f| f.get_metric().len()).sum();
            println!(
                "   ├─ {} ({} targets): {} families, {} samples, {:.2}ms",
                collector.kind(),
                collector.targets(),
                families.len(),
                samples,
                collector_start.elapsed().as_secs_f64() * 1000.0
            );
            if verbose {
                print!("{}", encoder.encode_to_string(&families)?);
            }
        }

        println!(
            "   ⏱️  Cycle duration: {:.2}ms",
            start.elapsed().as_secs_f64() * 1000.0
        );
    }

    println!("\n📋 Scrape results:");
    for (category, counts) in stats.categories() {
        println!(
            "   ├─ {}: {} ok, {} failed",
            category, counts.success, counts.failure
        );
    }

    println!("\n✅ Test completed");
    Ok(())
}
