//! Schemas command implementation.
//!
//! Lists the built-in metric schemas per daemon category.

use hadoop_jmx_exporter::SchemaCatalog;

/// Lists subsystems (and with `verbose` every raw metric) per category.
pub fn command_schemas(verbose: bool, service: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    println!("📚 Hadoop JMX Exporter - Metric Schemas");
    println!("=======================================");

    let mut subsystem_total = 0usize;
    let mut metric_total = 0usize;

    for name in SchemaCatalog::services() {
        if let Some(filter) = &service {
            if !name.contains(filter.as_str()) {
                continue;
            }
        }

        let schema = SchemaCatalog::load(name, None)?;
        println!("\n🏷️  Service: {}", name);
        println!("{}", "─".repeat(50));

        for subsystem in schema.subsystem_names() {
            let Some(entries) = schema.get(subsystem) else {
                continue;
            };
            subsystem_total += 1;
            metric_total += entries.len();
            println!("   ├─ 📂 {} ({} metrics)", subsystem, entries.len());
            if verbose {
                for (metric, description) in entries.iter() {
                    println!("   │  ├─ {}: {}", metric, description);
                }
            }
        }
    }

    println!(
        "\n📋 Total: {} metrics in {} subsystems",
        metric_total, subsystem_total
    );

    Ok(())
}
