//! Fixed enumeration tables for string-valued daemon states.
//!
//! Every mapping is a pure function of its input. Strings outside a table map
//! to [`UNKNOWN_STATE`].

use tracing::debug;

/// Value exported for a state string that is not in the table.
pub const UNKNOWN_STATE: f64 = 9999.0;

const HA_STATES: &[(&str, f64)] = &[
    ("initializing", 0.0),
    ("active", 1.0),
    ("standby", 2.0),
    ("stopping", 3.0),
];

const FS_STATES: &[(&str, f64)] = &[("Safemode", 0.0), ("Operational", 1.0)];

const ADMIN_STATES: &[(&str, f64)] = &[
    ("In Service", 0.0),
    ("Decommission In Progress", 1.0),
    ("Decommissioned", 2.0),
    ("Entering Maintenance", 3.0),
    ("In Maintenance", 4.0),
];

const NODE_MANAGER_STATES: &[(&str, f64)] = &[
    ("NEW", 1.0),
    ("RUNNING", 2.0),
    ("UNHEALTHY", 3.0),
    ("DECOMMISSIONED", 4.0),
    ("LOST", 5.0),
    ("REBOOTED", 6.0),
    ("DECOMMISSIONING", 7.0),
    ("SHUTDOWN", 8.0),
];

fn lookup(table: &[(&str, f64)], kind: &str, state: &str) -> f64 {
    match table.iter().find(|(name, _)| *name == state) {
        Some((_, code)) => *code,
        None => {
            debug!("Unrecognized {} '{}', exporting sentinel", kind, state);
            UNKNOWN_STATE
        }
    }
}

/// NameNode high-availability role (`tag.HAState`).
pub fn ha_state(state: &str) -> f64 {
    lookup(HA_STATES, "HA state", state)
}

/// NameNode filesystem state (`FSState`).
pub fn fs_state(state: &str) -> f64 {
    lookup(FS_STATES, "filesystem state", state)
}

/// DataNode admin state as reported in `LiveNodes`.
pub fn admin_state(state: &str) -> f64 {
    lookup(ADMIN_STATES, "admin state", state)
}

/// NodeManager lifecycle state as reported in `LiveNodeManagers`.
pub fn node_manager_state(state: &str) -> f64 {
    lookup(NODE_MANAGER_STATES, "node manager state", state)
}
