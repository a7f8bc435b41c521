//! Dimension labels
//!
//! Frames carry an open set of extra columns whose schema varies per source
//! table. Values are typed at ingestion instead of being kept as raw JSON.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::{Map, Number, Value};
use std::fmt;

/// A scalar label value
#[derive(Debug, Clone)]
pub enum LabelValue {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
}

impl LabelValue {
    /// Type a raw JSON value.
    ///
    /// Returns `Ok(None)` for `null`, and `Err` with a description of the
    /// offending value for arrays and objects.
    pub fn from_json(value: &Value) -> Result<Option<Self>, String> {
        match value {
            Value::Null => Ok(None),
            Value::Bool(b) => Ok(Some(LabelValue::Boolean(*b))),
            Value::String(s) => Ok(Some(LabelValue::String(s.clone()))),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Ok(Some(LabelValue::Integer(i))),
                None => n
                    .as_f64()
                    .map(|f| Some(LabelValue::Float(f)))
                    .ok_or_else(|| n.to_string()),
            },
            other => Err(other.to_string()),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            LabelValue::String(s) => Value::String(s.clone()),
            LabelValue::Integer(i) => Value::Number((*i).into()),
            LabelValue::Float(f) => Number::from_f64(*f).map(Value::Number).unwrap_or(Value::Null),
            LabelValue::Boolean(b) => Value::Bool(*b),
        }
    }
}

impl PartialEq for LabelValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (LabelValue::String(a), LabelValue::String(b)) => a == b,
            (LabelValue::Integer(a), LabelValue::Integer(b)) => a == b,
            (LabelValue::Float(a), LabelValue::Float(b)) => a == b,
            (LabelValue::Integer(a), LabelValue::Float(b))
            | (LabelValue::Float(b), LabelValue::Integer(a)) => (*a as f64) == *b,
            (LabelValue::Boolean(a), LabelValue::Boolean(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for LabelValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LabelValue::String(s) => f.write_str(s),
            LabelValue::Integer(i) => write!(f, "{}", i),
            LabelValue::Float(v) => write!(f, "{}", v),
            LabelValue::Boolean(b) => write!(f, "{}", b),
        }
    }
}

impl From<&str> for LabelValue {
    fn from(s: &str) -> Self {
        LabelValue::String(s.to_string())
    }
}

impl From<String> for LabelValue {
    fn from(s: String) -> Self {
        LabelValue::String(s)
    }
}

impl From<i64> for LabelValue {
    fn from(i: i64) -> Self {
        LabelValue::Integer(i)
    }
}

impl From<f64> for LabelValue {
    fn from(f: f64) -> Self {
        LabelValue::Float(f)
    }
}

impl From<bool> for LabelValue {
    fn from(b: bool) -> Self {
        LabelValue::Boolean(b)
    }
}

impl Serialize for LabelValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            LabelValue::String(s) => serializer.serialize_str(s),
            LabelValue::Integer(i) => serializer.serialize_i64(*i),
            LabelValue::Float(f) => serializer.serialize_f64(*f),
            LabelValue::Boolean(b) => serializer.serialize_bool(*b),
        }
    }
}

/// Ordered map of label name to value
///
/// Used both for a rule group's predicate and for a frame's labels.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabelSet {
    entries: Vec<(String, LabelValue)>,
}

impl LabelSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a label, replacing any previous value under the same name
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<LabelValue>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Builder-style insert
    pub fn with(mut self, name: impl Into<String>, value: impl Into<LabelValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&LabelValue> {
        self.entries.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &LabelValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True when every label of `self` is present in `labels` with an equal
    /// value. Extra labels in `labels` are ignored; an empty set matches
    /// anything.
    pub fn is_subset_of(&self, labels: &LabelSet) -> bool {
        self.entries
            .iter()
            .all(|(name, value)| labels.get(name) == Some(value))
    }

    /// JSON text describing the set, e.g. `{"instance_type":"large"}`
    pub fn descriptor(&self) -> String {
        let map: Map<String, Value> = self
            .entries
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect();
        Value::Object(map).to_string()
    }
}

impl Serialize for LabelSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<K: Into<String>, V: Into<LabelValue>> FromIterator<(K, V)> for LabelSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut set = LabelSet::new();
        for (k, v) in iter {
            set.insert(k, v);
        }
        set
    }
}
