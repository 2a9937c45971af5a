//! Raw JMX bean model.
//!
//! A bean is one management object snapshot: a flat string-keyed JSON object.
//! Hadoop daemons identify it with `name`, query engines with `objectName`.
//! Some attributes carry a nested structure serialized as a JSON string and
//! need a second parse step ([`Bean::nested`]).

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Placeholder used for absent string tags so label arity stays fixed.
pub const PLACEHOLDER: &str = "-";

/// Failure to decode a nested structured attribute.
#[derive(Debug, thiserror::Error)]
pub enum StructuredValueError {
    #[error("attribute '{0}' is missing")]
    Missing(String),

    #[error("attribute '{0}' is not a string or structure")]
    NotStructured(String),

    #[error("attribute '{key}' is malformed: {source}")]
    Malformed {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// One bean from a scrape response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bean {
    fields: Map<String, Value>,
}

/// All beans returned by one endpoint.
pub type BeanList = Vec<Bean>;

impl From<Map<String, Value>> for Bean {
    fn from(fields: Map<String, Value>) -> Self {
        Self { fields }
    }
}

impl Bean {
    /// Builds a bean from a JSON value, ignoring anything that is not an object.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(fields) => Some(Self { fields }),
            _ => None,
        }
    }

    /// Identifying object name (`name`, falling back to `objectName`).
    pub fn object_name(&self) -> &str {
        self.fields
            .get("name")
            .and_then(Value::as_str)
            .or_else(|| self.fields.get("objectName").and_then(Value::as_str))
            .unwrap_or("")
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Attribute lookup that also understands the query-engine layout, where
    /// values live in an `attributes` list of `{name, value}` objects.
    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.fields.get(key).or_else(|| {
            self.fields
                .get("attributes")
                .and_then(Value::as_array)?
                .iter()
                .find(|attr| attr.get("name").and_then(Value::as_str) == Some(key))
                .and_then(|attr| attr.get("value"))
        })
    }

    /// `(name, value)` pairs of the `attributes` list, in response order.
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields
            .get("attributes")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(|attr| Some((attr.get("name")?.as_str()?, attr.get("value")?)))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// Iterates attribute names in response order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Numeric value of an attribute; absent or unparseable values read as 0.
    pub fn number(&self, key: &str) -> f64 {
        self.fields.get(key).map(value_as_f64).unwrap_or(0.0)
    }

    /// Numeric value clamped to zero, for resource counts that can transiently
    /// be reported negative.
    pub fn non_negative(&self, key: &str) -> f64 {
        self.number(key).max(0.0)
    }

    /// String tag, or [`PLACEHOLDER`] when absent or not a string.
    pub fn tag(&self, key: &str) -> String {
        self.fields
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or(PLACEHOLDER)
            .to_string()
    }

    /// Present and not null, empty, zero or false.
    pub fn is_truthy(&self, key: &str) -> bool {
        match self.fields.get(key) {
            None | Some(Value::Null) => false,
            Some(Value::Bool(b)) => *b,
            Some(Value::Number(n)) => n.as_f64().is_some_and(|v| v != 0.0),
            Some(Value::String(s)) => !s.is_empty(),
            Some(Value::Array(a)) => !a.is_empty(),
            Some(Value::Object(o)) => !o.is_empty(),
        }
    }

    /// Decodes a nested attribute. Hadoop serializes these as JSON strings;
    /// an already-structured value is accepted as well.
    pub fn nested<T: DeserializeOwned>(&self, key: &str) -> Result<T, StructuredValueError> {
        let value = self
            .fields
            .get(key)
            .ok_or_else(|| StructuredValueError::Missing(key.to_string()))?;
        let result = match value {
            Value::String(raw) => serde_json::from_str(raw),
            Value::Array(_) | Value::Object(_) => serde_json::from_value(value.clone()),
            _ => return Err(StructuredValueError::NotStructured(key.to_string())),
        };
        result.map_err(|source| StructuredValueError::Malformed {
            key: key.to_string(),
            source,
        })
    }
}

/// Coerces a JSON value to a float: numbers pass through, booleans become 0/1,
/// strings are trimmed, stripped of a trailing `%` and parsed. Anything else is 0.
pub fn value_as_f64(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::Bool(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        Value::String(s) => parse_numeric_str(s),
        _ => 0.0,
    }
}

/// Parses strings like `" 12 "` or `"37.5%"`; empty or garbage yields 0.
pub fn parse_numeric_str(raw: &str) -> f64 {
    let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    compact
        .strip_suffix('%')
        .unwrap_or(&compact)
        .parse::<f64>()
        .unwrap_or(0.0)
}

/// Host name for a bean list: the first `tag.Hostname`, preferring beans whose
/// name contains `marker` when one is given.
pub fn resolve_target(beans: &[Bean], marker: Option<&str>) -> Option<String> {
    let tagged = |b: &&Bean| b.get("tag.Hostname").and_then(Value::as_str).is_some();
    let preferred = marker.and_then(|m| {
        beans
            .iter()
            .filter(|b| b.object_name().contains(m))
            .find(tagged)
    });
    preferred
        .or_else(|| beans.iter().find(tagged))
        .map(|b| b.tag("tag.Hostname"))
}
