//! Application of merged styles onto target objects.
//!
//! This module provides:
//!
//! - [`Themeable`]: objects whose properties can be assigned by path
//! - [`ThemeCustomization`]: opt-in custom handling of selected paths
//! - [`PropertyTable`]: typed per-type setter tables backing `Themeable`
//! - [`coerce`] and the property types [`Color`], [`Font`], [`PropertyValue`]
//! - [`ApplyReport`]: outcome of applying one style
//!
//! Paths are applied independently. A failing path is recorded and the
//! remaining paths are still applied, so a style may end up partially applied.

mod coerce;
mod target;

pub use coerce::{coerce, number, Color, Font, FromProperty, PropertyKind, PropertyValue};
pub use target::{set_path, ChildGetter, PropertyTable, ThemeCustomization, Themeable};

use tracing::{debug, warn};

use crate::error::ThemeError;
use crate::resolve::MergedStyle;

/// A path that could not be applied, with the reason.
#[derive(Debug, Clone, PartialEq)]
pub struct PathFailure {
    pub path: String,
    pub error: ThemeError,
}

/// Outcome of applying a style to one target.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ApplyReport {
    /// Paths assigned through the generic setter.
    pub applied: Vec<String>,
    /// Paths handed to the target's customization capability.
    pub customized: Vec<String>,
    /// Paths that failed.
    pub failures: Vec<PathFailure>,
}

impl ApplyReport {
    /// True when no path failed.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Number of paths that were assigned, by either route.
    pub fn succeeded(&self) -> usize {
        self.applied.len() + self.customized.len()
    }

    /// Returns the failure for `path`, if it failed.
    pub fn failure(&self, path: &str) -> Option<&ThemeError> {
        self.failures
            .iter()
            .find(|failure| failure.path == path)
            .map(|failure| &failure.error)
    }
}

/// Writes every entry of a merged style onto `target`.
///
/// Paths claimed by the target's [`ThemeCustomization`] are delegated to it;
/// every other path is coerced and assigned with [`set_path`].
pub fn apply_merged(style: &str, merged: &MergedStyle, target: &mut dyn Themeable) -> ApplyReport {
    let mut report = ApplyReport::default();

    for (path, value) in merged {
        if let Some(custom) = target.customization() {
            if custom.supports_custom_path(path) {
                match custom.apply_custom(path, value) {
                    Ok(()) => report.customized.push(path.clone()),
                    Err(error) => record_failure(&mut report, style, path, error),
                }
                continue;
            }
        }

        match set_path(target, path, value) {
            Ok(()) => report.applied.push(path.clone()),
            Err(error) => record_failure(&mut report, style, path, error),
        }
    }

    debug!(
        style,
        applied = report.applied.len(),
        customized = report.customized.len(),
        failed = report.failures.len(),
        "Style applied"
    );
    report
}

fn record_failure(report: &mut ApplyReport, style: &str, path: &str, error: ThemeError) {
    warn!(style, path, error = %error, "Failed to apply style entry");
    report.failures.push(PathFailure {
        path: path.to_string(),
        error,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;
    use std::collections::HashMap;

    /// Target with a fixed set of float properties and a custom `title` path.
    #[derive(Debug, Default)]
    struct Button {
        floats: HashMap<String, f64>,
        title: Option<Value>,
        reject_title: bool,
    }

    impl Themeable for Button {
        fn property_kind(&self, name: &str) -> Option<PropertyKind> {
            matches!(name, "alpha" | "width").then_some(PropertyKind::Float)
        }

        fn set_property(&mut self, name: &str, value: PropertyValue) -> Result<(), ThemeError> {
            match value {
                PropertyValue::Float(f) => {
                    self.floats.insert(name.to_string(), f);
                    Ok(())
                }
                _ => Err(ThemeError::UnknownPropertyPath {
                    path: name.to_string(),
                }),
            }
        }

        fn customization(&mut self) -> Option<&mut dyn ThemeCustomization> {
            Some(self)
        }
    }

    impl ThemeCustomization for Button {
        fn supports_custom_path(&self, path: &str) -> bool {
            path == "title"
        }

        fn apply_custom(&mut self, path: &str, value: &Value) -> Result<(), ThemeError> {
            if self.reject_title {
                return Err(ThemeError::TypeCoercionFailed {
                    path: path.to_string(),
                    expected: "title".to_string(),
                    value: value.to_string(),
                });
            }
            self.title = Some(value.clone());
            Ok(())
        }
    }

    fn merged(pairs: &[(&str, Value)]) -> MergedStyle {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_partial_application() {
        let style = merged(&[
            ("alpha", Value::Float(0.5)),
            ("width", Value::from("120")),
            ("bogus.path", Value::Integer(1)),
        ]);
        let mut button = Button::default();
        let report = apply_merged("Primary", &style, &mut button);

        assert_eq!(button.floats.get("alpha"), Some(&0.5));
        assert_eq!(button.floats.get("width"), Some(&120.0));
        assert_eq!(report.succeeded(), 2);
        assert_eq!(report.failures.len(), 1);
        assert!(matches!(
            report.failure("bogus.path"),
            Some(ThemeError::UnknownPropertyPath { .. })
        ));
        assert!(!report.is_complete());
    }

    #[test]
    fn test_custom_path_bypasses_setter() {
        let style = merged(&[("title", Value::from("OK")), ("alpha", Value::Integer(1))]);
        let mut button = Button::default();
        let report = apply_merged("Primary", &style, &mut button);

        assert_eq!(button.title, Some(Value::from("OK")));
        assert_eq!(report.customized, vec!["title".to_string()]);
        assert_eq!(report.applied, vec!["alpha".to_string()]);
        assert!(report.is_complete());
    }

    #[test]
    fn test_custom_failure_is_collected() {
        let style = merged(&[("title", Value::from("OK")), ("alpha", Value::Integer(1))]);
        let mut button = Button {
            reject_title: true,
            ..Button::default()
        };
        let report = apply_merged("Primary", &style, &mut button);

        assert_eq!(report.applied, vec!["alpha".to_string()]);
        assert!(report.failure("title").is_some());
    }

    #[test]
    fn test_coercion_failure_is_collected() {
        let style = merged(&[("alpha", Value::from("opaque"))]);
        let mut button = Button::default();
        let report = apply_merged("Primary", &style, &mut button);
        assert!(matches!(
            report.failure("alpha"),
            Some(ThemeError::TypeCoercionFailed { .. })
        ));
        assert!(button.floats.is_empty());
    }
}
