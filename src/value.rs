//! Document values and the constant-reference marker.
//!
//! Theme documents are decoded into [`Value`] trees. Entries of the
//! `constants` and `styles` sections are then read as [`RawValue`]s, which
//! separate literal values from references to other constants.
//!
//! In a document, a reference is written as a map holding exactly one
//! `$constant` key:
//!
//! ```yaml
//! constants:
//!   brand: "#FF3B30"
//!   accent: { $constant: brand }
//! ```
//!
//! Any other map, including one that has a `$constant` key next to other
//! keys, is a literal structured value.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Key of the single-entry map that marks a constant reference.
pub const CONSTANT_REF_KEY: &str = "$constant";

/// A literal value decoded from a theme document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// Returns the string slice if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the nested map if this is a map.
    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Returns the value as a float for integers and floats.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Follows a dot-separated path through nested maps.
    ///
    /// An empty segment never matches, so `"a..b"` and `""` resolve to `None`.
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        let mut current = self;
        for segment in path.split('.') {
            if segment.is_empty() {
                return None;
            }
            current = current.as_map()?.get(segment)?;
        }
        Some(current)
    }

    /// False if a NaN or infinite float appears anywhere in the value.
    pub fn is_finite(&self) -> bool {
        match self {
            Value::Float(f) => f.is_finite(),
            Value::List(items) => items.iter().all(Value::is_finite),
            Value::Map(map) => map.values().all(Value::is_finite),
            _ => true,
        }
    }

    /// Short name of the variant, used in coercion errors.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "map",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(self) {
            Ok(json) => f.write_str(&json),
            Err(_) => write!(f, "{:?}", self),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Integer(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Value::Map(map)
    }
}

/// A value as stored in a source or an override, before constant resolution.
///
/// # Example
///
/// ```rust
/// use layered_theme::{RawValue, Value};
///
/// let literal = RawValue::from("plain text");
/// assert!(!literal.is_constant_ref());
///
/// let reference = RawValue::constant("brand");
/// assert_eq!(reference.constant_name(), Some("brand"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum RawValue {
    /// The value itself.
    Literal(Value),
    /// The name of a constant whose resolved value stands here.
    ConstantRef(String),
}

impl RawValue {
    /// Creates a reference to the named constant.
    pub fn constant(name: impl Into<String>) -> Self {
        RawValue::ConstantRef(name.into())
    }

    pub fn is_constant_ref(&self) -> bool {
        matches!(self, RawValue::ConstantRef(_))
    }

    /// Returns the referenced constant name, if this is a reference.
    pub fn constant_name(&self) -> Option<&str> {
        match self {
            RawValue::ConstantRef(name) => Some(name),
            RawValue::Literal(_) => None,
        }
    }
}

impl From<Value> for RawValue {
    fn from(value: Value) -> Self {
        if let Value::Map(map) = &value {
            if map.len() == 1 {
                if let Some(Value::String(name)) = map.get(CONSTANT_REF_KEY) {
                    return RawValue::ConstantRef(name.clone());
                }
            }
        }
        RawValue::Literal(value)
    }
}

impl From<RawValue> for Value {
    fn from(raw: RawValue) -> Self {
        match raw {
            RawValue::Literal(value) => value,
            RawValue::ConstantRef(name) => {
                let mut map = BTreeMap::new();
                map.insert(CONSTANT_REF_KEY.to_string(), Value::String(name));
                Value::Map(map)
            }
        }
    }
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        RawValue::Literal(Value::from(s))
    }
}

impl From<String> for RawValue {
    fn from(s: String) -> Self {
        RawValue::Literal(Value::from(s))
    }
}

impl From<bool> for RawValue {
    fn from(b: bool) -> Self {
        RawValue::Literal(Value::Bool(b))
    }
}

impl From<i64> for RawValue {
    fn from(i: i64) -> Self {
        RawValue::Literal(Value::Integer(i))
    }
}

impl From<i32> for RawValue {
    fn from(i: i32) -> Self {
        RawValue::Literal(Value::from(i))
    }
}

impl From<f64> for RawValue {
    fn from(f: f64) -> Self {
        RawValue::Literal(Value::Float(f))
    }
}
