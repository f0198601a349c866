//! Field references - what a condition is scoped to

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The field (or fields) a condition applies to.
///
/// Most conditions target one field. Full-text matching can target an
/// ordered group of fields, which turns a `match` clause into a
/// `multi_match` clause sharing one query text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldRef {
    Single(String),
    Group(Vec<String>),
}

impl FieldRef {
    /// Whether this reference names a group of fields
    pub fn is_group(&self) -> bool {
        matches!(self, FieldRef::Group(_))
    }

    /// The key used in `{field: payload}` clause bodies.
    ///
    /// A group has no single key; its names are joined with commas.
    pub fn key(&self) -> String {
        match self {
            FieldRef::Single(name) => name.clone(),
            FieldRef::Group(names) => names.join(","),
        }
    }

    /// The field names in order
    pub fn names(&self) -> Vec<&str> {
        match self {
            FieldRef::Single(name) => vec![name.as_str()],
            FieldRef::Group(names) => names.iter().map(String::as_str).collect(),
        }
    }

    /// JSON form: a string for one field, an array for a group
    pub fn to_json(&self) -> Value {
        match self {
            FieldRef::Single(name) => Value::String(name.clone()),
            FieldRef::Group(names) => {
                Value::Array(names.iter().cloned().map(Value::String).collect())
            }
        }
    }
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldRef::Single(name) => write!(f, "{}", name),
            FieldRef::Group(names) => write!(f, "[{}]", names.join(", ")),
        }
    }
}

impl From<&str> for FieldRef {
    fn from(name: &str) -> Self {
        FieldRef::Single(name.to_string())
    }
}

impl From<String> for FieldRef {
    fn from(name: String) -> Self {
        FieldRef::Single(name)
    }
}

impl From<&String> for FieldRef {
    fn from(name: &String) -> Self {
        FieldRef::Single(name.clone())
    }
}

impl From<Vec<String>> for FieldRef {
    fn from(names: Vec<String>) -> Self {
        FieldRef::Group(names)
    }
}

impl From<Vec<&str>> for FieldRef {
    fn from(names: Vec<&str>) -> Self {
        FieldRef::Group(names.into_iter().map(str::to_string).collect())
    }
}

impl From<&[&str]> for FieldRef {
    fn from(names: &[&str]) -> Self {
        FieldRef::Group(names.iter().map(|n| n.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for FieldRef {
    fn from(names: [&str; N]) -> Self {
        FieldRef::Group(names.iter().map(|n| n.to_string()).collect())
    }
}
