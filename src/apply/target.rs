//! Targets of style application and the nested property-path setter.

use std::collections::HashMap;
use std::fmt;

use crate::error::ThemeError;
use crate::value::Value;

use super::coerce::{coerce, FromProperty, PropertyKind, PropertyValue};

/// Capability of a target to take over the assignment of selected paths.
///
/// This is where widget-specific appliers plug in: a path the target
/// claims bypasses coercion and the generic setter entirely.
pub trait ThemeCustomization {
    /// Whether `path` is handled by [`apply_custom`](Self::apply_custom).
    fn supports_custom_path(&self, path: &str) -> bool;

    /// Assigns the resolved value of a claimed path.
    fn apply_custom(&mut self, path: &str, value: &Value) -> Result<(), ThemeError>;
}

/// An object whose named properties a style can be applied to.
///
/// Property names are single path segments; nested paths such as
/// `layer.borderColor` walk through [`child_mut`](Self::child_mut).
pub trait Themeable {
    /// The type expected by a property, or `None` if there is no such property.
    fn property_kind(&self, name: &str) -> Option<PropertyKind>;

    /// Assigns an already-coerced value.
    fn set_property(&mut self, name: &str, value: PropertyValue) -> Result<(), ThemeError>;

    /// The nested object reached through the segment `name`.
    fn child_mut(&mut self, _name: &str) -> Option<&mut dyn Themeable> {
        None
    }

    /// The customization capability of this target, if it has one.
    fn customization(&mut self) -> Option<&mut dyn ThemeCustomization> {
        None
    }
}

/// Assigns `value` at a dot-separated property path.
///
/// # Errors
///
/// - [`ThemeError::UnknownPropertyPath`] if a segment is empty or names no
///   child object (intermediate) or property (last)
/// - [`ThemeError::TypeCoercionFailed`] if the value does not fit the property
pub fn set_path(target: &mut dyn Themeable, path: &str, value: &Value) -> Result<(), ThemeError> {
    let segments: Vec<&str> = path.split('.').collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Err(unknown(path));
    }
    assign(target, path, &segments, value)
}

fn assign(
    target: &mut dyn Themeable,
    path: &str,
    segments: &[&str],
    value: &Value,
) -> Result<(), ThemeError> {
    match segments {
        [] => Err(unknown(path)),
        [name] => {
            let kind = target.property_kind(name).ok_or_else(|| unknown(path))?;
            let coerced = coerce(value, kind).ok_or_else(|| ThemeError::TypeCoercionFailed {
                path: path.to_string(),
                expected: kind.to_string(),
                value: value.to_string(),
            })?;
            target
                .set_property(name, coerced)
                .map_err(|e| relocate(e, path))
        }
        [head, rest @ ..] => {
            let child = target.child_mut(head).ok_or_else(|| unknown(path))?;
            assign(child, path, rest, value)
        }
    }
}

fn unknown(path: &str) -> ThemeError {
    ThemeError::UnknownPropertyPath {
        path: path.to_string(),
    }
}

/// Reports setter errors against the full path rather than the last segment.
fn relocate(err: ThemeError, path: &str) -> ThemeError {
    match err {
        ThemeError::UnknownPropertyPath { .. } => unknown(path),
        ThemeError::TypeCoercionFailed {
            expected, value, ..
        } => ThemeError::TypeCoercionFailed {
            path: path.to_string(),
            expected,
            value,
        },
        other => other,
    }
}

type Setter<T> = Box<dyn Fn(&mut T, PropertyValue) -> Result<(), PropertyValue> + Send + Sync>;

/// Getter of a nested object.
pub type ChildGetter<T> = fn(&mut T) -> &mut dyn Themeable;

/// Compile-time typed property setters for one target type.
///
/// Build it once, usually in a `once_cell::sync::Lazy` static, and delegate
/// the [`Themeable`] methods to it.
///
/// # Example
///
/// ```rust
/// use layered_theme::{Color, PropertyKind, PropertyTable, PropertyValue, ThemeError, Themeable};
/// use once_cell::sync::Lazy;
///
/// #[derive(Default)]
/// struct Badge {
///     tint: Option<Color>,
///     radius: f64,
/// }
///
/// static BADGE: Lazy<PropertyTable<Badge>> = Lazy::new(|| {
///     PropertyTable::new()
///         .property("tint", |b: &mut Badge, c: Color| b.tint = Some(c))
///         .property("radius", |b: &mut Badge, r: f64| b.radius = r)
/// });
///
/// impl Themeable for Badge {
///     fn property_kind(&self, name: &str) -> Option<PropertyKind> {
///         BADGE.kind(name)
///     }
///     fn set_property(&mut self, name: &str, value: PropertyValue) -> Result<(), ThemeError> {
///         BADGE.set(self, name, value)
///     }
/// }
///
/// let mut badge = Badge::default();
/// layered_theme::set_path(&mut badge, "radius", &"4".into()).unwrap();
/// assert_eq!(badge.radius, 4.0);
/// ```
pub struct PropertyTable<T> {
    properties: HashMap<&'static str, (PropertyKind, Setter<T>)>,
    children: HashMap<&'static str, ChildGetter<T>>,
}

impl<T: 'static> PropertyTable<T> {
    pub fn new() -> Self {
        Self {
            properties: HashMap::new(),
            children: HashMap::new(),
        }
    }

    /// Registers a property whose values are coerced to `V`.
    pub fn property<V: FromProperty + 'static>(
        mut self,
        name: &'static str,
        setter: fn(&mut T, V),
    ) -> Self {
        let set: Setter<T> = Box::new(move |target: &mut T, value: PropertyValue| {
            let typed = V::from_property(value.clone()).ok_or(value)?;
            setter(target, typed);
            Ok(())
        });
        self.properties.insert(name, (V::KIND, set));
        self
    }

    /// Registers a nested object reachable through `name`.
    pub fn child(mut self, name: &'static str, getter: ChildGetter<T>) -> Self {
        self.children.insert(name, getter);
        self
    }

    pub fn kind(&self, name: &str) -> Option<PropertyKind> {
        self.properties.get(name).map(|(kind, _)| *kind)
    }

    /// Runs the setter of `name`.
    pub fn set(&self, target: &mut T, name: &str, value: PropertyValue) -> Result<(), ThemeError> {
        let (kind, setter) = self
            .properties
            .get(name)
            .ok_or_else(|| unknown(name))?;
        setter(target, value).map_err(|rejected| ThemeError::TypeCoercionFailed {
            path: name.to_string(),
            expected: kind.to_string(),
            value: format!("{:?}", rejected),
        })
    }

    /// Looks up the nested object `name` on `target`.
    pub fn child_of<'t>(&self, target: &'t mut T, name: &str) -> Option<&'t mut dyn Themeable> {
        let getter = self.children.get(name)?;
        Some(getter(target))
    }

    /// Names of all registered properties and children.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self
            .properties
            .keys()
            .chain(self.children.keys())
            .copied()
            .collect();
        names.sort_unstable();
        names
    }
}

impl<T: 'static> Default for PropertyTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for PropertyTable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let properties: HashMap<_, _> = self
            .properties
            .iter()
            .map(|(name, (kind, _))| (*name, *kind))
            .collect();
        f.debug_struct("PropertyTable")
            .field("properties", &properties)
            .field("children", &self.children.keys().collect::<Vec<_>>())
            .finish()
    }
}
