//! Error type shared by every theme component.

use std::path::PathBuf;

use thiserror::Error;

/// Error returned by source loading, resolution, application and persistence.
///
/// Resolution errors (`*NotFound`, `Circular*`) abort the whole call.
/// Application errors ([`ThemeError::UnknownPropertyPath`],
/// [`ThemeError::TypeCoercionFailed`]) are reported per path inside an
/// [`ApplyReport`](crate::ApplyReport).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ThemeError {
    /// The mandatory default source could not be loaded.
    #[error("default theme source '{name}' is missing or malformed: {reason}")]
    MissingDefaultSource { name: String, reason: String },

    /// No loadable document exists for an alternate source name.
    #[error("theme source '{name}' not found")]
    SourceNotFound { name: String },

    /// A document exists but could not be parsed into a theme source.
    #[error("theme source '{name}' is invalid: {message}")]
    InvalidSource { name: String, message: String },

    /// A dotted key was not found in any source.
    #[error("key '{path}' not found in any theme source")]
    KeyNotFound { path: String },

    /// A constant has no override and no source definition.
    #[error("constant '{name}' not found")]
    ConstantNotFound { name: String },

    /// Constants reference each other in a loop.
    #[error("circular constant reference: {}", path.join(" -> "))]
    CircularConstantReference { path: Vec<String> },

    /// A style has no source definition and no override.
    #[error("style '{name}' not found")]
    StyleNotFound { name: String },

    /// The superstyle chain loops back on itself.
    #[error("circular style reference: {}", path.join(" -> "))]
    CircularStyleReference { path: Vec<String> },

    /// A property path segment does not name an assignable property.
    #[error("unknown property path '{path}'")]
    UnknownPropertyPath { path: String },

    /// A value cannot be converted to the type expected at its destination.
    #[error("cannot coerce {value} to {expected} at '{path}'")]
    TypeCoercionFailed {
        path: String,
        expected: String,
        value: String,
    },

    /// Reading, writing or clearing the durable override snapshot failed.
    #[error("override persistence failed at {}: {message}", path.display())]
    PersistenceFailure { path: PathBuf, message: String },
}

impl ThemeError {
    /// Returns true for errors raised while resolving constants or styles.
    pub fn is_resolution_error(&self) -> bool {
        matches!(
            self,
            ThemeError::ConstantNotFound { .. }
                | ThemeError::CircularConstantReference { .. }
                | ThemeError::StyleNotFound { .. }
                | ThemeError::CircularStyleReference { .. }
                | ThemeError::KeyNotFound { .. }
        )
    }
}
