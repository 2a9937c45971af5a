//! Name decomposition helpers shared by every rule set.
//!
//! Raw JMX attribute names are CamelCase (`RpcQueueTimeNumOps`) while exported
//! family names are snake_case and prefixed per daemon
//! (`hadoop_hdfs_namenode_rpc_queue_time_num_ops`).

use once_cell::sync::Lazy;
use regex::Regex;

static CAMEL_BOUNDARY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([a-z0-9])([A-Z])").expect("valid camel-case regex"));

/// Converts `CamelCase` to `camel_case`.
///
/// Only a lowercase letter or digit followed by an uppercase letter starts a
/// new word, so acronyms stay together (`HAState` -> `hastate`).
pub fn snake_case(name: &str) -> String {
    CAMEL_BOUNDARY.replace_all(name, "${1}_${2}").to_lowercase()
}

/// Joins name parts with `_` and replaces characters that are not valid in a
/// Prometheus metric name.
pub fn family_name(parts: &[&str]) -> String {
    let joined = parts
        .iter()
        .filter(|p| !p.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("_");
    joined
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

/// Text before the first occurrence of `token`, or the whole string when the
/// token is absent.
pub fn split_before<'a>(name: &'a str, token: &str) -> &'a str {
    name.split_once(token).map(|(head, _)| head).unwrap_or(name)
}

/// Text after the first occurrence of `token`, or `""` when the token is absent.
pub fn split_after<'a>(name: &'a str, token: &str) -> &'a str {
    name.split_once(token).map(|(_, tail)| tail).unwrap_or("")
}

/// Turns a dotted/colon-separated attribute name into a label-safe value.
pub fn sanitize_label(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '.' | ':' | '-' | ' ' => '_',
            other => other,
        })
        .collect()
}
