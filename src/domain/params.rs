use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Key carrying the signature itself.
pub const SIGN: &str = "sign";
/// Key carrying the signature scheme label (`RSA` or `RSA2`).
pub const SIGN_TYPE: &str = "sign_type";
/// Keys that never take part in canonicalization.
pub const RESERVED_KEYS: [&str; 2] = [SIGN, SIGN_TYPE];

/// A single parameter value.
///
/// Plain values travel as text. Nested values (JSON objects or arrays) are
/// kept as structured JSON until they hit the wire, where they are rendered
/// as compact JSON.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Text(String),
    Nested(Value),
}

impl ParamValue {
    pub fn is_empty(&self) -> bool {
        match self {
            ParamValue::Text(s) => s.is_empty(),
            ParamValue::Nested(Value::Object(map)) => map.is_empty(),
            ParamValue::Nested(Value::Array(items)) => items.is_empty(),
            ParamValue::Nested(_) => false,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Text(s) => Some(s),
            ParamValue::Nested(_) => None,
        }
    }

    /// Converts the value into the JSON shape used inside `biz_content`.
    pub fn to_json(&self) -> Value {
        match self {
            ParamValue::Text(s) => Value::String(s.clone()),
            ParamValue::Nested(v) => v.clone(),
        }
    }
}

impl fmt::Display for ParamValue {
    /// Wire form. `serde_json::Value`'s `Display` is compact and keeps the
    /// object's own key order.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Text(s) => f.write_str(s),
            ParamValue::Nested(v) => write!(f, "{}", v),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Text(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Text(value)
    }
}

impl From<Value> for ParamValue {
    fn from(value: Value) -> Self {
        match value {
            Value::String(s) => ParamValue::Text(s),
            Value::Null => ParamValue::Text(String::new()),
            Value::Bool(b) => ParamValue::Text(b.to_string()),
            Value::Number(n) => ParamValue::Text(n.to_string()),
            nested => ParamValue::Nested(nested),
        }
    }
}

/// Flat mapping of parameter names to values, exchanged with the acquirer.
///
/// Storage order is irrelevant to callers; the canonical order is always
/// recomputed by [`canonicalize`](crate::domain::canonical::canonicalize).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterSet {
    entries: BTreeMap<String, ParamValue>,
}

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a parameter, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Option<ParamValue> {
        self.entries.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.entries.get(key)
    }

    /// Text value for `key`, `None` when absent or nested.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.entries.get(key).and_then(ParamValue::as_str)
    }

    /// Text value for `key`, `None` when absent, nested or empty.
    pub fn get_non_empty(&self, key: &str) -> Option<&str> {
        self.get_str(key).filter(|s| !s.is_empty())
    }

    pub fn remove(&mut self, key: &str) -> Option<ParamValue> {
        self.entries.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Merges `other` into `self`; entries from `other` win on collision.
    pub fn merge(&mut self, other: ParameterSet) {
        self.entries.extend(other.entries);
    }

    /// Copy restricted to `keys`. Keys missing from `self` are skipped.
    pub fn subset(&self, keys: &[&str]) -> ParameterSet {
        keys.iter()
            .filter_map(|k| self.entries.get(*k).map(|v| (k.to_string(), v.clone())))
            .collect()
    }

    /// Wire form of every entry, in key order.
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        self.entries
            .iter()
            .map(|(k, v)| (k.clone(), v.to_string()))
            .collect()
    }
}

impl<K, V> FromIterator<(K, V)> for ParameterSet
where
    K: Into<String>,
    V: Into<ParamValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut set = ParameterSet::new();
        for (k, v) in iter {
            set.insert(k, v);
        }
        set
    }
}

impl IntoIterator for ParameterSet {
    type Item = (String, ParamValue);
    type IntoIter = std::collections::btree_map::IntoIter<String, ParamValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
