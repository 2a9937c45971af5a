//! Check command implementation.
//!
//! Validates configuration and schemas, and optionally probes every target.

use hadoop_jmx_exporter::collectors::{load_schema, DaemonKind, TargetLists};
use hadoop_jmx_exporter::ScrapeSource;

use crate::config::{validate_effective_config, Config};

/// Validates configuration, schemas and (with `targets`) target reachability.
pub async fn command_check(targets: bool, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    println!("🔍 Hadoop JMX Exporter - Check");
    println!("==============================");

    let mut all_ok = true;

    println!("\n⚙️  Checking configuration...");
    match validate_effective_config(config) {
        Ok(_) => println!("   ✅ Configuration is valid"),
        Err(e) => {
            println!("   ❌ Configuration invalid: {}", e);
            all_ok = false;
        }
    }

    println!("\n📚 Checking metric schemas...");
    for kind in DaemonKind::ALL {
        match load_schema(kind, config.schema_dir.as_deref()) {
            Ok(schema) => println!("   ✅ {}: {} subsystems", kind, schema.len()),
            Err(e) => {
                println!("   ❌ {}: {}", kind, e);
                all_ok = false;
            }
        }
    }

    if targets {
        println!("\n🌐 Probing targets...");
        let lists = TargetLists::from(&config.targets);
        let options = config.scrape_options();
        for kind in DaemonKind::ALL {
            for url in lists.get(kind) {
                let source = ScrapeSource::new(kind.service(), vec![url.clone()], &options)?;
                match source.scrape().await.first() {
                    Some(beans) => println!("   ✅ {} {}: {} beans", kind, url, beans.len()),
                    None => {
                        println!("   ❌ {} {}: no beans (see log for details)", kind, url);
                        all_ok = false;
                    }
                }
            }
        }
    }

    println!("\n📋 Summary:");
    if all_ok {
        println!("   ✅ All checks passed");
        Ok(())
    } else {
        println!("   ❌ Some checks failed - please review the output above");
        std::process::exit(1);
    }
}
