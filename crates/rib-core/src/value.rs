//! Property values and their declared kinds.

use std::fmt;

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Declared kind of a widget property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyKind {
    String,
    Integer,
    Float,
    Boolean,
    /// A string restricted to the schema's `options`.
    Enum,
}

impl PropertyKind {
    /// Value used when the catalog gives no default.
    pub fn zero(self) -> PropertyValue {
        match self {
            PropertyKind::String | PropertyKind::Enum => PropertyValue::String(SmolStr::default()),
            PropertyKind::Integer => PropertyValue::Integer(0),
            PropertyKind::Float => PropertyValue::Float(0.0),
            PropertyKind::Boolean => PropertyValue::Boolean(false),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PropertyKind::String => "string",
            PropertyKind::Integer => "integer",
            PropertyKind::Float => "float",
            PropertyKind::Boolean => "boolean",
            PropertyKind::Enum => "enum",
        }
    }

    /// Whether `value` is acceptable for this kind, ignoring enum options.
    ///
    /// Floats must be finite: JSON has no spelling for NaN or infinity.
    pub fn accepts(self, value: &PropertyValue) -> bool {
        match (self, value) {
            (PropertyKind::Float, PropertyValue::Float(v)) => v.is_finite(),
            _ => matches!(
                (self, value),
                (PropertyKind::String, PropertyValue::String(_))
                    | (PropertyKind::Enum, PropertyValue::String(_))
                    | (PropertyKind::Integer, PropertyValue::Integer(_))
                    | (PropertyKind::Float, PropertyValue::Integer(_))
                    | (PropertyKind::Boolean, PropertyValue::Boolean(_))
            ),
        }
    }

    /// Parse user-entered text into a value of this kind.
    pub fn parse(self, text: &str) -> Option<PropertyValue> {
        let text = text.trim_end_matches(['\r', '\n']);
        match self {
            PropertyKind::String | PropertyKind::Enum => Some(PropertyValue::String(text.into())),
            PropertyKind::Integer => text.trim().parse().ok().map(PropertyValue::Integer),
            PropertyKind::Float => text
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .map(PropertyValue::Float),
            PropertyKind::Boolean => match text.trim() {
                "true" | "1" | "yes" | "on" => Some(PropertyValue::Boolean(true)),
                "false" | "0" | "no" | "off" => Some(PropertyValue::Boolean(false)),
                _ => None,
            },
        }
    }
}

/// Value of a widget property.
///
/// Serialized untagged, so a design document stores plain JSON scalars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(SmolStr),
}

impl PropertyValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            PropertyValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PropertyValue::Float(f) => Some(*f),
            PropertyValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Boolean(b) => write!(f, "{b}"),
            PropertyValue::Integer(i) => write!(f, "{i}"),
            PropertyValue::Float(v) => write!(f, "{v}"),
            PropertyValue::String(s) => f.write_str(s),
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        PropertyValue::String(s.into())
    }
}

impl From<SmolStr> for PropertyValue {
    fn from(s: SmolStr) -> Self {
        PropertyValue::String(s)
    }
}

impl From<bool> for PropertyValue {
    fn from(b: bool) -> Self {
        PropertyValue::Boolean(b)
    }
}

impl From<i64> for PropertyValue {
    fn from(i: i64) -> Self {
        PropertyValue::Integer(i)
    }
}

impl From<f64> for PropertyValue {
    fn from(f: f64) -> Self {
        PropertyValue::Float(f)
    }
}
