//! Source registry: the layered lookup table over theme documents.
//!
//! The registry holds exactly one default source and an ordered list of
//! alternates. Lookups try the alternates in registration order, then the
//! default; the first source that contains the key wins. Nothing is merged
//! across sources.
//!
//! Sources are obtained by name from a [`SourceLoader`]:
//!
//! - [`DirectoryLoader`] reads `<dir>/<name>.<ext>` from disk
//! - [`MemoryLoader`] serves documents registered in memory (embedded themes, tests)
//!
//! # Example
//!
//! ```rust
//! use layered_theme::{MemoryLoader, SourceRegistry};
//!
//! let loader = MemoryLoader::new()
//!     .with_yaml("theme_default", "constants:\n  gap: 8\n")
//!     .with_yaml("compact", "constants:\n  gap: 4\n");
//!
//! let mut registry = SourceRegistry::load(Box::new(loader), "theme_default").unwrap();
//! registry.set_alternates(&["compact"]).unwrap();
//! assert_eq!(registry.raw_lookup("constants.gap").unwrap().as_f64(), Some(4.0));
//! ```

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use tracing::{debug, info};

use crate::error::ThemeError;
use crate::source::{SourceKind, StyleDefinition, ThemeSource};
use crate::value::{RawValue, Value};

/// Name of the default source when none is configured.
pub const DEFAULT_SOURCE_NAME: &str = "theme_default";

/// Recognized theme file extensions in priority order.
///
/// When files with the same base name exist with several extensions, the one
/// appearing earlier in this list is loaded.
pub const SOURCE_EXTENSIONS: &[&str] = &["yaml", "yml", "json"];

/// Produces theme sources by name.
pub trait SourceLoader: Send + Sync {
    /// Loads the named source.
    ///
    /// Returns [`ThemeError::SourceNotFound`] when nothing exists under that
    /// name, or [`ThemeError::InvalidSource`] when it exists but cannot be parsed.
    fn load(&self, name: &str, kind: SourceKind) -> Result<ThemeSource, ThemeError>;
}

/// Loads sources from files in a single directory.
#[derive(Debug, Clone)]
pub struct DirectoryLoader {
    root: PathBuf,
}

impl DirectoryLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the first existing file for `name`, honoring extension priority.
    pub fn find(&self, name: &str) -> Option<PathBuf> {
        SOURCE_EXTENSIONS
            .iter()
            .map(|ext| self.root.join(format!("{}.{}", name, ext)))
            .find(|path| path.is_file())
    }
}

impl SourceLoader for DirectoryLoader {
    fn load(&self, name: &str, kind: SourceKind) -> Result<ThemeSource, ThemeError> {
        let path = self.find(name).ok_or_else(|| ThemeError::SourceNotFound {
            name: name.to_string(),
        })?;
        debug!(source = name, path = %path.display(), "Reading theme source");
        ThemeSource::from_file(name, kind, &path)
    }
}

/// In-memory document store, used for embedded themes and tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    documents: HashMap<String, Document>,
}

#[derive(Debug, Clone)]
enum Document {
    Yaml(String),
    Json(String),
    Value(Value),
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a YAML document under `name`.
    pub fn with_yaml(mut self, name: impl Into<String>, yaml: impl Into<String>) -> Self {
        self.documents.insert(name.into(), Document::Yaml(yaml.into()));
        self
    }

    /// Registers a JSON document under `name`.
    pub fn with_json(mut self, name: impl Into<String>, json: impl Into<String>) -> Self {
        self.documents.insert(name.into(), Document::Json(json.into()));
        self
    }

    /// Registers an already-decoded document under `name`.
    pub fn with_value(mut self, name: impl Into<String>, value: Value) -> Self {
        self.documents.insert(name.into(), Document::Value(value));
        self
    }
}

impl SourceLoader for MemoryLoader {
    fn load(&self, name: &str, kind: SourceKind) -> Result<ThemeSource, ThemeError> {
        match self.documents.get(name) {
            Some(Document::Yaml(yaml)) => ThemeSource::from_yaml(name, kind, yaml),
            Some(Document::Json(json)) => ThemeSource::from_json(name, kind, json),
            Some(Document::Value(value)) => ThemeSource::from_value(name, kind, value.clone()),
            None => Err(ThemeError::SourceNotFound {
                name: name.to_string(),
            }),
        }
    }
}

/// Ordered set of theme sources: alternates first, the default last.
pub struct SourceRegistry {
    loader: Box<dyn SourceLoader>,
    default: ThemeSource,
    alternates: Vec<ThemeSource>,
}

impl SourceRegistry {
    /// Loads the default source.
    ///
    /// Any failure, including a missing document, is reported as
    /// [`ThemeError::MissingDefaultSource`].
    pub fn load(loader: Box<dyn SourceLoader>, default_name: &str) -> Result<Self, ThemeError> {
        let default = loader
            .load(default_name, SourceKind::Default)
            .map_err(|e| ThemeError::MissingDefaultSource {
                name: default_name.to_string(),
                reason: e.to_string(),
            })?;
        info!(source = default_name, kind = ?default.kind(), "Loaded theme source");
        Ok(Self {
            loader,
            default,
            alternates: Vec::new(),
        })
    }

    /// Replaces the alternate list with the named sources, in priority order.
    ///
    /// All sources are loaded before anything is replaced; if one fails the
    /// previous list stays in place.
    pub fn set_alternates<S: AsRef<str>>(&mut self, names: &[S]) -> Result<(), ThemeError> {
        let loaded = names
            .iter()
            .map(|name| self.loader.load(name.as_ref(), SourceKind::Alternate))
            .collect::<Result<Vec<_>, _>>()?;
        for source in &loaded {
            debug!(source = source.name(), kind = ?source.kind(), "Loaded theme source");
        }
        self.alternates = loaded;
        info!(alternates = ?self.alternate_names(), "Replaced alternate theme sources");
        Ok(())
    }

    /// Names of the registered alternates, highest priority first.
    pub fn alternate_names(&self) -> Vec<String> {
        self.alternates.iter().map(|s| s.name().to_string()).collect()
    }

    /// Sources in lookup order.
    pub fn sources(&self) -> impl Iterator<Item = &ThemeSource> {
        self.alternates.iter().chain(std::iter::once(&self.default))
    }

    /// Returns the value at a dotted path from the first source containing it.
    pub fn raw_lookup(&self, path: &str) -> Result<&Value, ThemeError> {
        self.sources()
            .find_map(|source| source.lookup(path))
            .ok_or_else(|| ThemeError::KeyNotFound {
                path: path.to_string(),
            })
    }

    /// Returns the raw value of a constant from the first source defining it.
    pub fn constant(&self, name: &str) -> Option<RawValue> {
        self.sources().find_map(|source| source.constant(name))
    }

    /// Returns the definition of a style from the first source defining it.
    pub fn style(&self, name: &str) -> Option<StyleDefinition> {
        self.sources().find_map(|source| source.style(name))
    }
}

impl fmt::Debug for SourceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceRegistry")
            .field("default", &self.default.name())
            .field("alternates", &self.alternate_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loader() -> MemoryLoader {
        MemoryLoader::new()
            .with_yaml(
                "theme_default",
                "constants:\n  k: default\n  only_default: 1\nstyles:\n  Box:\n    alpha: 1\n",
            )
            .with_yaml("x", "constants:\n  k: from_x\nstyles:\n  Box:\n    width: 2\n")
            .with_json("y", r#"{"constants": {"k": "from_y"}}"#)
            .with_yaml("broken", "constants: [1, 2]\n")
    }

    fn registry() -> SourceRegistry {
        SourceRegistry::load(Box::new(loader()), DEFAULT_SOURCE_NAME).unwrap()
    }

    #[test]
    fn test_missing_default() {
        let err = SourceRegistry::load(Box::new(MemoryLoader::new()), "nope").unwrap_err();
        assert!(matches!(err, ThemeError::MissingDefaultSource { .. }));
    }

    #[test]
    fn test_malformed_default() {
        let err = SourceRegistry::load(Box::new(loader()), "broken").unwrap_err();
        assert!(matches!(err, ThemeError::MissingDefaultSource { .. }));
    }

    #[test]
    fn test_alternate_precedence_and_revert() {
        let mut registry = registry();
        assert_eq!(
            registry.raw_lookup("constants.k").unwrap(),
            &Value::from("default")
        );

        registry.set_alternates(&["x"]).unwrap();
        assert_eq!(registry.raw_lookup("constants.k").unwrap(), &Value::from("from_x"));
        assert_eq!(
            registry.raw_lookup("constants.only_default").unwrap(),
            &Value::Integer(1)
        );

        registry.set_alternates::<&str>(&[]).unwrap();
        assert_eq!(
            registry.raw_lookup("constants.k").unwrap(),
            &Value::from("default")
        );
    }

    #[test]
    fn test_alternate_order() {
        let mut registry = registry();
        registry.set_alternates(&["y", "x"]).unwrap();
        assert_eq!(registry.raw_lookup("constants.k").unwrap(), &Value::from("from_y"));
        assert_eq!(registry.alternate_names(), vec!["y", "x"]);

        let kinds = registry.sources().map(ThemeSource::kind).collect::<Vec<_>>();
        assert_eq!(
            kinds,
            vec![SourceKind::Alternate, SourceKind::Alternate, SourceKind::Default]
        );
    }

    #[test]
    fn test_set_alternates_all_or_nothing() {
        let mut registry = registry();
        registry.set_alternates(&["x"]).unwrap();
        let err = registry.set_alternates(&["y", "missing"]).unwrap_err();
        assert!(matches!(err, ThemeError::SourceNotFound { ref name } if name == "missing"));
        assert_eq!(registry.alternate_names(), vec!["x"]);
    }

    #[test]
    fn test_style_first_match_wins() {
        let mut registry = registry();
        registry.set_alternates(&["x"]).unwrap();
        let style = registry.style("Box").unwrap();
        assert!(style.entries.contains_key("width"));
        assert!(!style.entries.contains_key("alpha"));
    }

    #[test]
    fn test_raw_lookup_not_found() {
        let err = registry().raw_lookup("constants.nope").unwrap_err();
        assert!(matches!(err, ThemeError::KeyNotFound { .. }));
    }

    #[test]
    fn test_directory_loader_extension_priority() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("theme_default.json"), r#"{"k": "json"}"#).unwrap();
        std::fs::write(dir.path().join("theme_default.yaml"), "k: yaml\n").unwrap();

        let loader = DirectoryLoader::new(dir.path());
        let registry = SourceRegistry::load(Box::new(loader), DEFAULT_SOURCE_NAME).unwrap();
        assert_eq!(registry.raw_lookup("k").unwrap(), &Value::from("yaml"));
    }

    #[test]
    fn test_directory_loader_missing() {
        let dir = tempfile::tempdir().unwrap();
        let loader = DirectoryLoader::new(dir.path());
        let err = loader.load("nope", SourceKind::Alternate).unwrap_err();
        assert!(matches!(err, ThemeError::SourceNotFound { .. }));
    }
}
