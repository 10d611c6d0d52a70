//! Property types and the value coercion table.

use std::fmt;

use crate::value::Value;

/// An RGBA color with 8 bits per channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Parses `RGB`, `RRGGBB` or `RRGGBBAA`, with an optional `#` or `0x` prefix.
    ///
    /// # Example
    ///
    /// ```rust
    /// use layered_theme::Color;
    ///
    /// assert_eq!(Color::from_hex("#FF3B30"), Some(Color::rgb(255, 59, 48)));
    /// assert_eq!(Color::from_hex("0xfff"), Some(Color::rgb(255, 255, 255)));
    /// assert_eq!(Color::from_hex("#00000080"), Some(Color::rgba(0, 0, 0, 128)));
    /// assert_eq!(Color::from_hex("red"), None);
    /// ```
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim();
        let digits = hex
            .strip_prefix('#')
            .or_else(|| hex.strip_prefix("0x"))
            .or_else(|| hex.strip_prefix("0X"))
            .unwrap_or(hex);
        if !digits.is_ascii() {
            return None;
        }

        let channel = |i: usize| u8::from_str_radix(digits.get(i..i + 2)?, 16).ok();
        match digits.len() {
            3 => {
                let mut short = digits.chars().map(|c| c.to_digit(16).map(|d| d as u8 * 17));
                Some(Self::rgb(short.next()??, short.next()??, short.next()??))
            }
            6 => Some(Self::rgb(channel(0)?, channel(2)?, channel(4)?)),
            8 => Some(Self::rgba(channel(0)?, channel(2)?, channel(4)?, channel(6)?)),
            _ => None,
        }
    }

    /// Formats as `#RRGGBB`, or `#RRGGBBAA` when not opaque.
    pub fn to_hex(&self) -> String {
        if self.a == 255 {
            format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
        } else {
            format!("#{:02X}{:02X}{:02X}{:02X}", self.r, self.g, self.b, self.a)
        }
    }
}

/// A font face name with a point size.
#[derive(Debug, Clone, PartialEq)]
pub struct Font {
    pub name: String,
    pub size: f64,
}

impl Font {
    pub fn new(name: impl Into<String>, size: f64) -> Self {
        Self {
            name: name.into(),
            size,
        }
    }
}

/// The static type a property expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyKind {
    Bool,
    Integer,
    Float,
    String,
    Color,
    Font,
    /// Accepts any value unchanged.
    Any,
}

impl fmt::Display for PropertyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PropertyKind::Bool => "bool",
            PropertyKind::Integer => "integer",
            PropertyKind::Float => "float",
            PropertyKind::String => "string",
            PropertyKind::Color => "color",
            PropertyKind::Font => "font",
            PropertyKind::Any => "any",
        };
        f.write_str(name)
    }
}

/// A value converted to the type of its destination property.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Color(Color),
    Font(Font),
    Any(Value),
}

impl PropertyValue {
    pub fn kind(&self) -> PropertyKind {
        match self {
            PropertyValue::Bool(_) => PropertyKind::Bool,
            PropertyValue::Integer(_) => PropertyKind::Integer,
            PropertyValue::Float(_) => PropertyKind::Float,
            PropertyValue::String(_) => PropertyKind::String,
            PropertyValue::Color(_) => PropertyKind::Color,
            PropertyValue::Font(_) => PropertyKind::Font,
            PropertyValue::Any(_) => PropertyKind::Any,
        }
    }
}

/// Converts a theme value to the given kind.
///
/// | Kind | Accepted values |
/// |------|-----------------|
/// | `Bool` | bool, integer `0`/`1` |
/// | `Integer` | integer, integral float, numeric string |
/// | `Float` | integer, float, numeric string |
/// | `String` | string |
/// | `Color` | hex string |
/// | `Font` | map with string `name` and numeric `size` |
/// | `Any` | anything |
///
/// Returns `None` when the value does not fit.
pub fn coerce(value: &Value, kind: PropertyKind) -> Option<PropertyValue> {
    match kind {
        PropertyKind::Bool => match value {
            Value::Bool(b) => Some(PropertyValue::Bool(*b)),
            Value::Integer(0) => Some(PropertyValue::Bool(false)),
            Value::Integer(1) => Some(PropertyValue::Bool(true)),
            _ => None,
        },
        PropertyKind::Integer => integer(value).map(PropertyValue::Integer),
        PropertyKind::Float => number(value).map(PropertyValue::Float),
        PropertyKind::String => value.as_str().map(|s| PropertyValue::String(s.to_string())),
        PropertyKind::Color => value
            .as_str()
            .and_then(Color::from_hex)
            .map(PropertyValue::Color),
        PropertyKind::Font => font(value).map(PropertyValue::Font),
        PropertyKind::Any => Some(PropertyValue::Any(value.clone())),
    }
}

/// Reads a finite number from a number or a numeric string.
pub fn number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Integer(i) => *i as f64,
        Value::Float(f) => *f,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

fn integer(value: &Value) -> Option<i64> {
    if let Value::Integer(i) = value {
        return Some(*i);
    }
    if let Some(Ok(i)) = value.as_str().map(|s| s.trim().parse::<i64>()) {
        return Some(i);
    }
    let n = number(value)?;
    let in_range = n >= i64::MIN as f64 && n <= i64::MAX as f64;
    (n.fract() == 0.0 && in_range).then_some(n as i64)
}

fn font(value: &Value) -> Option<Font> {
    let map = value.as_map()?;
    let name = map.get("name")?.as_str()?;
    let size = number(map.get("size")?)?;
    (size > 0.0).then(|| Font::new(name, size))
}

/// Types a [`PropertyTable`](super::PropertyTable) setter can take.
pub trait FromProperty: Sized {
    /// The kind values are coerced to before reaching the setter.
    const KIND: PropertyKind;

    fn from_property(value: PropertyValue) -> Option<Self>;
}

impl FromProperty for bool {
    const KIND: PropertyKind = PropertyKind::Bool;

    fn from_property(value: PropertyValue) -> Option<Self> {
        match value {
            PropertyValue::Bool(b) => Some(b),
            _ => None,
        }
    }
}

impl FromProperty for i64 {
    const KIND: PropertyKind = PropertyKind::Integer;

    fn from_property(value: PropertyValue) -> Option<Self> {
        match value {
            PropertyValue::Integer(i) => Some(i),
            _ => None,
        }
    }
}

impl FromProperty for f64 {
    const KIND: PropertyKind = PropertyKind::Float;

    fn from_property(value: PropertyValue) -> Option<Self> {
        match value {
            PropertyValue::Float(f) => Some(f),
            _ => None,
        }
    }
}

impl FromProperty for String {
    const KIND: PropertyKind = PropertyKind::String;

    fn from_property(value: PropertyValue) -> Option<Self> {
        match value {
            PropertyValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl FromProperty for Color {
    const KIND: PropertyKind = PropertyKind::Color;

    fn from_property(value: PropertyValue) -> Option<Self> {
        match value {
            PropertyValue::Color(c) => Some(c),
            _ => None,
        }
    }
}

impl FromProperty for Font {
    const KIND: PropertyKind = PropertyKind::Font;

    fn from_property(value: PropertyValue) -> Option<Self> {
        match value {
            PropertyValue::Font(f) => Some(f),
            _ => None,
        }
    }
}

impl FromProperty for Value {
    const KIND: PropertyKind = PropertyKind::Any;

    fn from_property(value: PropertyValue) -> Option<Self> {
        match value {
            PropertyValue::Any(v) => Some(v),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn font_value(name: Value, size: Value) -> Value {
        let mut map = BTreeMap::new();
        map.insert("name".to_string(), name);
        map.insert("size".to_string(), size);
        Value::Map(map)
    }

    #[test]
    fn test_color_from_hex() {
        assert_eq!(Color::from_hex("#ff0000"), Some(Color::rgb(255, 0, 0)));
        assert_eq!(Color::from_hex("0x00FF0080"), Some(Color::rgba(0, 255, 0, 128)));
        assert_eq!(Color::from_hex("abc"), Some(Color::rgb(0xaa, 0xbb, 0xcc)));
        assert_eq!(Color::from_hex("#12345"), None);
        assert_eq!(Color::from_hex("#GGGGGG"), None);
        assert_eq!(Color::from_hex("#ééé"), None);
    }

    #[test]
    fn test_color_to_hex() {
        assert_eq!(Color::rgb(255, 59, 48).to_hex(), "#FF3B30");
        assert_eq!(Color::rgba(0, 0, 0, 128).to_hex(), "#00000080");
    }

    #[test]
    fn test_scalar_passthrough() {
        assert_eq!(
            coerce(&Value::Bool(true), PropertyKind::Bool),
            Some(PropertyValue::Bool(true))
        );
        assert_eq!(
            coerce(&Value::from("hi"), PropertyKind::String),
            Some(PropertyValue::String("hi".into()))
        );
        assert_eq!(
            coerce(&Value::Integer(4), PropertyKind::Integer),
            Some(PropertyValue::Integer(4))
        );
    }

    #[test]
    fn test_numeric_strings() {
        assert_eq!(
            coerce(&Value::from(" 12 "), PropertyKind::Integer),
            Some(PropertyValue::Integer(12))
        );
        assert_eq!(
            coerce(&Value::from("1.5"), PropertyKind::Float),
            Some(PropertyValue::Float(1.5))
        );
        assert_eq!(coerce(&Value::from("1.5"), PropertyKind::Integer), None);
        assert_eq!(coerce(&Value::from("NaN"), PropertyKind::Float), None);
        assert_eq!(coerce(&Value::from("wide"), PropertyKind::Float), None);
    }

    #[test]
    fn test_number_widening_and_narrowing() {
        assert_eq!(
            coerce(&Value::Integer(2), PropertyKind::Float),
            Some(PropertyValue::Float(2.0))
        );
        assert_eq!(
            coerce(&Value::Float(3.0), PropertyKind::Integer),
            Some(PropertyValue::Integer(3))
        );
        assert_eq!(coerce(&Value::Float(3.5), PropertyKind::Integer), None);
    }

    #[test]
    fn test_bool_from_integer() {
        assert_eq!(
            coerce(&Value::Integer(0), PropertyKind::Bool),
            Some(PropertyValue::Bool(false))
        );
        assert_eq!(coerce(&Value::Integer(2), PropertyKind::Bool), None);
    }

    #[test]
    fn test_color_coercion() {
        assert_eq!(
            coerce(&Value::from("#00FF00"), PropertyKind::Color),
            Some(PropertyValue::Color(Color::rgb(0, 255, 0)))
        );
        assert_eq!(coerce(&Value::Integer(3), PropertyKind::Color), None);
    }

    #[test]
    fn test_font_coercion() {
        let value = font_value(Value::from("Menlo"), Value::Integer(12));
        assert_eq!(
            coerce(&value, PropertyKind::Font),
            Some(PropertyValue::Font(Font::new("Menlo", 12.0)))
        );

        let numeric_string = font_value(Value::from("Menlo"), Value::from("13.5"));
        assert_eq!(
            coerce(&numeric_string, PropertyKind::Font),
            Some(PropertyValue::Font(Font::new("Menlo", 13.5)))
        );

        let no_size = font_value(Value::from("Menlo"), Value::Null);
        assert_eq!(coerce(&no_size, PropertyKind::Font), None);
    }

    #[test]
    fn test_any_accepts_everything() {
        let list = Value::List(vec![Value::Integer(1)]);
        assert_eq!(
            coerce(&list, PropertyKind::Any),
            Some(PropertyValue::Any(list.clone()))
        );
    }
}
