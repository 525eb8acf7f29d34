//! Typed per-entity property maps.
//!
//! Used on program nodes during analysis and on graph nodes/edges after
//! assembly.

use super::{NodeId, SourceLocation};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Attribute name -> typed value
pub type PropertyMap = BTreeMap<String, PropertyValue>;

/// Tagged union of every attribute value the analysis stores
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Location(SourceLocation),
    /// Optional reference to another node (e.g. a condition subtree)
    Node(Option<NodeId>),
    List(Vec<PropertyValue>),
}

impl PropertyValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric view; integers widen to floats
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_node(&self) -> Option<NodeId> {
        match self {
            Self::Node(id) => *id,
            _ => None,
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{}", b),
            Self::Int(i) => write!(f, "{}", i),
            Self::Float(x) => write!(f, "{}", x),
            Self::Text(s) => write!(f, "{}", s),
            Self::Location(loc) => write!(f, "{}", loc),
            Self::Node(Some(id)) => write!(f, "#{}", id),
            Self::Node(None) => write!(f, "none"),
            Self::List(items) => {
                let parts: Vec<String> = items.iter().map(|v| v.to_string()).collect();
                write!(f, "[{}]", parts.join(", "))
            }
        }
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<u64> for PropertyValue {
    fn from(value: u64) -> Self {
        Self::Int(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<usize> for PropertyValue {
    fn from(value: usize) -> Self {
        Self::Int(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<SourceLocation> for PropertyValue {
    fn from(value: SourceLocation) -> Self {
        Self::Location(value)
    }
}

impl From<Option<NodeId>> for PropertyValue {
    fn from(value: Option<NodeId>) -> Self {
        Self::Node(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_untagged_serialization() {
        let mut map = PropertyMap::new();
        map.insert("bound_static".to_string(), true.into());
        map.insert("nesting_depth".to_string(), 2i64.into());
        map.insert("bound_expression".to_string(), PropertyValue::Node(None));

        let json = serde_json::to_value(&map).unwrap();
        assert_eq!(json["bound_static"], serde_json::json!(true));
        assert_eq!(json["nesting_depth"], serde_json::json!(2));
        assert!(json["bound_expression"].is_null());
    }

    #[test]
    fn test_null_deserializes_to_empty_reference() {
        let value: PropertyValue = serde_json::from_str("null").unwrap();
        assert_eq!(value, PropertyValue::Node(None));
    }

    #[test]
    fn test_int_widens_to_float() {
        assert_eq!(PropertyValue::Int(6).as_float(), Some(6.0));
        assert_eq!(PropertyValue::Text("x".into()).as_float(), None);
    }
}
