//! Filter Parameters
//!
//! Named values bound to `$Name` placeholders. Names are stored with their
//! leading `$`; callers may pass them with or without it.

use std::collections::BTreeMap;

use crate::value::Value;

/// Value bound to a placeholder
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Scalar(Value),
    /// Only legal for a placeholder inside `IN (...)`
    List(Vec<Value>),
}

impl ParamValue {
    pub fn list<I, T>(values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Value>,
    {
        ParamValue::List(values.into_iter().map(Into::into).collect())
    }
}

impl From<Value> for ParamValue {
    fn from(v: Value) -> Self {
        ParamValue::Scalar(v)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Scalar(Value::Int(v))
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Scalar(Value::from(v))
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        ParamValue::Scalar(Value::Text(v))
    }
}

impl From<Vec<Value>> for ParamValue {
    fn from(v: Vec<Value>) -> Self {
        ParamValue::List(v)
    }
}

/// Placeholder name with exactly one leading `$`
pub(crate) fn normalize_name(name: &str) -> String {
    let bare = name.trim().trim_start_matches('$');
    format!("${}", bare)
}

/// Parameter bindings for one transfer
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Parameters {
    values: BTreeMap<String, ParamValue>,
}

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: impl Into<ParamValue>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: &str, value: impl Into<ParamValue>) {
        self.values.insert(normalize_name(name), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        if name.starts_with('$') {
            self.values.get(name)
        } else {
            self.values.get(&normalize_name(name))
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<ParamValue> {
        self.values.remove(&normalize_name(name))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}
