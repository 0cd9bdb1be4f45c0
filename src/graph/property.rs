//! Property values accepted by `set_property`.

use std::fmt;

/// The type a node kind declares for one of its properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
    Bool,
    Int,
    Float,
    String,
}

/// A value assigned to a node property.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl PropertyValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            PropertyValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            PropertyValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn kind(&self) -> PropertyKind {
        match self {
            PropertyValue::Bool(_) => PropertyKind::Bool,
            PropertyValue::Int(_) => PropertyKind::Int,
            PropertyValue::Float(_) => PropertyKind::Float,
            PropertyValue::String(_) => PropertyKind::String,
        }
    }

    /// Convert to `kind`, widening integers to floats. Strings are parsed,
    /// mirroring the engine's string-typed property setter.
    pub fn coerce(self, kind: PropertyKind) -> Option<PropertyValue> {
        match (self, kind) {
            (v, k) if v.kind() == k => Some(v),
            (PropertyValue::Int(i), PropertyKind::Float) => Some(PropertyValue::Float(i as f64)),
            (PropertyValue::String(s), PropertyKind::Int) => {
                s.trim().parse().ok().map(PropertyValue::Int)
            }
            (PropertyValue::String(s), PropertyKind::Float) => {
                s.trim().parse().ok().map(PropertyValue::Float)
            }
            (PropertyValue::String(s), PropertyKind::Bool) => match s.trim() {
                "true" | "1" | "yes" => Some(PropertyValue::Bool(true)),
                "false" | "0" | "no" => Some(PropertyValue::Bool(false)),
                _ => None,
            },
            _ => None,
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Bool(v) => write!(f, "{v}"),
            PropertyValue::Int(v) => write!(f, "{v}"),
            PropertyValue::Float(v) => write!(f, "{v}"),
            PropertyValue::String(v) => write!(f, "\"{v}\""),
        }
    }
}

impl From<bool> for PropertyValue {
    fn from(v: bool) -> Self {
        PropertyValue::Bool(v)
    }
}

impl From<i32> for PropertyValue {
    fn from(v: i32) -> Self {
        PropertyValue::Int(v as i64)
    }
}

impl From<i64> for PropertyValue {
    fn from(v: i64) -> Self {
        PropertyValue::Int(v)
    }
}

impl From<u32> for PropertyValue {
    fn from(v: u32) -> Self {
        PropertyValue::Int(v as i64)
    }
}

impl From<f64> for PropertyValue {
    fn from(v: f64) -> Self {
        PropertyValue::Float(v)
    }
}

impl From<&str> for PropertyValue {
    fn from(v: &str) -> Self {
        PropertyValue::String(v.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(v: String) -> Self {
        PropertyValue::String(v)
    }
}
