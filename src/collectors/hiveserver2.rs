//! HiveServer2 rule set: every catalog attribute becomes one `method` sample
//! of a single family.

use crate::bean::Bean;
use crate::engine::{family_key, label_names, FillSink, RuleContext, SubsystemRules};
use crate::family::CycleFamilies;
use crate::naming::sanitize_label;

const SUBSYSTEM: &str = "HiveServer2";
const BEAN: &str = "Hadoop:service=hiveserver2,name=hiveserver2";

pub fn rules() -> Vec<Box<dyn SubsystemRules>> {
    vec![Box::new(HiveServer2)]
}

struct HiveServer2;

impl SubsystemRules for HiveServer2 {
    fn subsystem(&self) -> &str {
        SUBSYSTEM
    }

    fn matches(&self, bean_name: &str) -> bool {
        bean_name.contains(BEAN)
    }

    fn setup(&self, ctx: &RuleContext<'_>, _bean: &Bean, families: &mut CycleFamilies) {
        families.declare_gauge(
            &family_key(SUBSYSTEM, "hiveserver2"),
            &ctx.name(&["hiveserver2"]),
            "Hive Server2 metric.",
            &label_names(&["method"]),
        );
    }

    fn fill(&self, ctx: &RuleContext<'_>, bean: &Bean, sink: &mut FillSink<'_>) {
        let Some(schema) = ctx.subsystem(SUBSYSTEM) else {
            return;
        };
        let key = family_key(SUBSYSTEM, "hiveserver2");
        for metric in schema.names() {
            sink.add(&key, &ctx.labels(&[sanitize_label(metric)]), bean.number(metric));
        }
    }
}
