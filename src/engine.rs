//! The composed theme engine.
//!
//! [`ThemeEngine`] owns the source registry and the override store behind a
//! single lock, so replacing alternates or mutating overrides never
//! interleaves with a resolution in progress. It is an ordinary value: build
//! one where the application is composed and pass it by reference.
//!
//! # Example
//!
//! ```rust
//! use layered_theme::{MemoryLoader, ThemeEngine, Value};
//!
//! let loader = MemoryLoader::new().with_yaml(
//!     "theme_default",
//!     "styles:\n  Parent: { a: 1, b: 2 }\n  Child: { superstyle: Parent, b: 3, c: 4 }\n",
//! );
//! let engine = ThemeEngine::builder().loader(loader).build().unwrap();
//!
//! let child = engine.merged_style("Child").unwrap();
//! assert_eq!(child.get("a"), Some(&Value::Integer(1)));
//! assert_eq!(child.get("b"), Some(&Value::Integer(3)));
//!
//! engine.modify_style("Child", "a", 99);
//! assert_eq!(engine.merged_style("Child").unwrap().len(), 1);
//!
//! engine.set_style_inheritance("Child", true);
//! assert_eq!(engine.merged_style("Child").unwrap().len(), 3);
//! ```

use std::fmt;
use std::path::PathBuf;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::apply::{
    self, coerce, ApplyReport, Color, Font, PropertyKind, PropertyValue, Themeable,
};
use crate::error::ThemeError;
use crate::overrides::{FileStorage, OverrideStorage, OverrideStore, StyleOverride};
use crate::registry::{DirectoryLoader, SourceLoader, SourceRegistry, DEFAULT_SOURCE_NAME};
use crate::resolve::{MergedStyle, Resolver};
use crate::value::{RawValue, Value};

struct State {
    sources: SourceRegistry,
    overrides: OverrideStore,
}

/// Layered theme sources, runtime overrides and style application.
pub struct ThemeEngine {
    state: RwLock<State>,
    storage: Option<Box<dyn OverrideStorage>>,
}

impl ThemeEngine {
    pub fn builder() -> ThemeEngineBuilder {
        ThemeEngineBuilder::default()
    }

    /// Builds an engine from a deserialized [`EngineConfig`].
    pub fn from_config(config: &EngineConfig) -> Result<Self, ThemeError> {
        let mut builder = ThemeEngine::builder()
            .loader(DirectoryLoader::new(&config.sources_dir))
            .default_source(config.default_source.clone())
            .alternates(config.alternates.clone());
        if let Some(path) = &config.overrides_path {
            builder = builder.storage(FileStorage::new(path));
        }
        builder.build()
    }

    fn read(&self) -> RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    // ------------------------------------------------------------------
    // Sources
    // ------------------------------------------------------------------

    /// Replaces the alternate sources, highest priority first.
    ///
    /// On failure the previous alternates stay registered.
    pub fn set_alternates<S: AsRef<str>>(&self, names: &[S]) -> Result<(), ThemeError> {
        self.write().sources.set_alternates(names)
    }

    /// Names of the registered alternates, highest priority first.
    pub fn alternates(&self) -> Vec<String> {
        self.read().sources.alternate_names()
    }

    /// Returns the raw value at a dotted path from the first source containing it.
    pub fn raw_lookup(&self, path: &str) -> Result<Value, ThemeError> {
        self.read().sources.raw_lookup(path).cloned()
    }

    /// Flat key lookup. A constant reference found at `path` is resolved.
    pub fn value_for_key(&self, path: &str) -> Result<Value, ThemeError> {
        let state = self.read();
        let raw = RawValue::from(state.sources.raw_lookup(path)?.clone());
        Resolver::new(&state.sources, &state.overrides).value(&raw)
    }

    /// The value at `path` as a color.
    pub fn color_for_key(&self, path: &str) -> Result<Color, ThemeError> {
        match self.typed_for_key(path, PropertyKind::Color)? {
            PropertyValue::Color(color) => Ok(color),
            other => Err(mismatch(path, PropertyKind::Color, &format!("{:?}", other))),
        }
    }

    /// The value at `path` as a number.
    pub fn number_for_key(&self, path: &str) -> Result<f64, ThemeError> {
        match self.typed_for_key(path, PropertyKind::Float)? {
            PropertyValue::Float(n) => Ok(n),
            other => Err(mismatch(path, PropertyKind::Float, &format!("{:?}", other))),
        }
    }

    /// The value at `path` as an integer.
    pub fn integer_for_key(&self, path: &str) -> Result<i64, ThemeError> {
        match self.typed_for_key(path, PropertyKind::Integer)? {
            PropertyValue::Integer(i) => Ok(i),
            other => Err(mismatch(path, PropertyKind::Integer, &format!("{:?}", other))),
        }
    }

    /// A font named by the string at `path`, at the given size.
    ///
    /// A `{name, size}` map at `path` is also accepted; its size is ignored.
    pub fn font_for_key(&self, path: &str, size: f64) -> Result<Font, ThemeError> {
        let value = self.value_for_key(path)?;
        let name = match &value {
            Value::String(name) => Some(name.clone()),
            Value::Map(map) => map.get("name").and_then(Value::as_str).map(str::to_string),
            _ => None,
        };
        match name {
            Some(name) if size > 0.0 && size.is_finite() => Ok(Font::new(name, size)),
            _ => Err(mismatch(path, PropertyKind::Font, &value.to_string())),
        }
    }

    fn typed_for_key(&self, path: &str, kind: PropertyKind) -> Result<PropertyValue, ThemeError> {
        let value = self.value_for_key(path)?;
        coerce(&value, kind).ok_or_else(|| mismatch(path, kind, &value.to_string()))
    }

    // ------------------------------------------------------------------
    // Resolution
    // ------------------------------------------------------------------

    /// Resolves a constant, honoring overrides and following references.
    pub fn constant(&self, name: &str) -> Result<Value, ThemeError> {
        let state = self.read();
        Resolver::new(&state.sources, &state.overrides).constant(name)
    }

    /// The fully merged dictionary of a style.
    pub fn merged_style(&self, name: &str) -> Result<MergedStyle, ThemeError> {
        let state = self.read();
        Resolver::new(&state.sources, &state.overrides).merged_style(name)
    }

    /// Resolves a style and applies it to `target`.
    ///
    /// Resolution failures are returned as `Err` and nothing is assigned.
    /// Per-path failures are collected in the report.
    pub fn apply_style(
        &self,
        name: &str,
        target: &mut dyn Themeable,
    ) -> Result<ApplyReport, ThemeError> {
        let merged = self.merged_style(name).inspect_err(|e| {
            warn!(style = name, error = %e, "Style resolution failed");
        })?;
        Ok(apply::apply_merged(name, &merged, target))
    }

    // ------------------------------------------------------------------
    // Overrides
    // ------------------------------------------------------------------

    /// Overrides a constant for this session.
    pub fn modify_constant(&self, name: &str, value: impl Into<RawValue>) {
        self.write().overrides.modify_constant(name, value);
    }

    /// Overrides one entry of a style for this session.
    pub fn modify_style(&self, name: &str, path: &str, value: impl Into<RawValue>) {
        self.write().overrides.modify_style(name, path, value);
    }

    /// Chooses overlay (`true`) or replace (`false`) mode for a style's overrides.
    pub fn set_style_inheritance(&self, name: &str, enabled: bool) {
        self.write().overrides.set_style_inheritance(name, enabled);
    }

    pub fn is_inheritance_enabled(&self, name: &str) -> bool {
        self.read().overrides.is_inheritance_enabled(name)
    }

    /// The override of a constant, ignoring source data.
    pub fn modified_constant(&self, name: &str) -> Result<RawValue, ThemeError> {
        self.read()
            .overrides
            .constant(name)
            .cloned()
            .ok_or_else(|| ThemeError::ConstantNotFound {
                name: name.to_string(),
            })
    }

    /// The override record of a style, ignoring source data.
    pub fn modified_style(&self, name: &str) -> Result<StyleOverride, ThemeError> {
        self.read()
            .overrides
            .style(name)
            .cloned()
            .ok_or_else(|| ThemeError::StyleNotFound {
                name: name.to_string(),
            })
    }

    /// One overridden entry of a style, ignoring source data.
    pub fn modified_style_path(&self, name: &str, path: &str) -> Result<RawValue, ThemeError> {
        self.read()
            .overrides
            .style_entry(name, path)
            .cloned()
            .ok_or_else(|| ThemeError::UnknownPropertyPath {
                path: format!("{}.{}", name, path),
            })
    }

    /// A copy of the whole override layer.
    pub fn overrides(&self) -> OverrideStore {
        self.read().overrides.clone()
    }

    /// Persists the overrides to the configured storage.
    ///
    /// Without storage this is a no-op. On failure the in-memory overrides
    /// stay authoritative and the previous snapshot is untouched. Overrides
    /// holding a NaN or infinite number cannot be persisted.
    pub fn synchronize(&self) -> Result<(), ThemeError> {
        let Some(storage) = &self.storage else {
            debug!("No override storage configured, nothing to synchronize");
            return Ok(());
        };
        let state = self.read();
        storage.save(&state.overrides).inspect_err(|e| {
            warn!(error = %e, "Failed to synchronize theme overrides");
        })?;
        info!(
            constants = state.overrides.constants().len(),
            styles = state.overrides.styles().len(),
            "Theme overrides synchronized"
        );
        Ok(())
    }

    /// Drops every override, in memory and in storage.
    ///
    /// Memory is cleared even if clearing the storage fails.
    pub fn reset(&self) -> Result<(), ThemeError> {
        let mut state = self.write();
        state.overrides.clear();
        info!("Theme overrides reset");
        match &self.storage {
            Some(storage) => storage.clear(),
            None => Ok(()),
        }
    }
}

fn mismatch(path: &str, kind: PropertyKind, value: &str) -> ThemeError {
    ThemeError::TypeCoercionFailed {
        path: path.to_string(),
        expected: kind.to_string(),
        value: value.to_string(),
    }
}

impl fmt::Debug for ThemeEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.read();
        f.debug_struct("ThemeEngine")
            .field("sources", &state.sources)
            .field("overrides", &state.overrides)
            .field("persistent", &self.storage.is_some())
            .finish()
    }
}

/// Builder for [`ThemeEngine`].
#[derive(Default)]
pub struct ThemeEngineBuilder {
    loader: Option<Box<dyn SourceLoader>>,
    default_source: Option<String>,
    alternates: Vec<String>,
    storage: Option<Box<dyn OverrideStorage>>,
}

impl ThemeEngineBuilder {
    /// Where sources are loaded from. Defaults to the current directory.
    pub fn loader(mut self, loader: impl SourceLoader + 'static) -> Self {
        self.loader = Some(Box::new(loader));
        self
    }

    /// Name of the default source. Defaults to [`DEFAULT_SOURCE_NAME`].
    pub fn default_source(mut self, name: impl Into<String>) -> Self {
        self.default_source = Some(name.into());
        self
    }

    /// Initial alternates, highest priority first.
    pub fn alternates<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.alternates = names.into_iter().map(Into::into).collect();
        self
    }

    /// Durable storage for overrides. Its last snapshot is loaded on build.
    pub fn storage(mut self, storage: impl OverrideStorage + 'static) -> Self {
        self.storage = Some(Box::new(storage));
        self
    }

    pub fn build(self) -> Result<ThemeEngine, ThemeError> {
        let loader = self
            .loader
            .unwrap_or_else(|| Box::new(DirectoryLoader::new(".")));
        let default_name = self
            .default_source
            .unwrap_or_else(|| DEFAULT_SOURCE_NAME.to_string());

        let mut sources = SourceRegistry::load(loader, &default_name)?;
        if !self.alternates.is_empty() {
            sources.set_alternates(self.alternates.as_slice())?;
        }

        let overrides = match &self.storage {
            Some(storage) => storage.load()?.unwrap_or_default(),
            None => OverrideStore::new(),
        };
        if !overrides.is_empty() {
            info!(
                constants = overrides.constants().len(),
                styles = overrides.styles().len(),
                "Loaded persisted theme overrides"
            );
        }

        Ok(ThemeEngine {
            state: RwLock::new(State { sources, overrides }),
            storage: self.storage,
        })
    }
}

impl fmt::Debug for ThemeEngineBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThemeEngineBuilder")
            .field("default_source", &self.default_source)
            .field("alternates", &self.alternates)
            .field("persistent", &self.storage.is_some())
            .finish()
    }
}

/// Serializable engine configuration, e.g. a section of an application config file.
///
/// ```rust
/// use layered_theme::EngineConfig;
///
/// let config: EngineConfig = serde_json::from_str(
///     r#"{"sources_dir": "themes", "alternates": ["dark"]}"#,
/// ).unwrap();
/// assert_eq!(config.default_source, "theme_default");
/// assert!(config.overrides_path.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Directory holding the theme documents.
    pub sources_dir: PathBuf,
    #[serde(default = "default_source_name")]
    pub default_source: String,
    #[serde(default)]
    pub alternates: Vec<String>,
    /// File receiving synchronized overrides. No persistence when absent.
    #[serde(default)]
    pub overrides_path: Option<PathBuf>,
}

fn default_source_name() -> String {
    DEFAULT_SOURCE_NAME.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overrides::MemoryStorage;
    use crate::registry::MemoryLoader;

    const DEFAULT: &str = r##"
constants:
  brand: "#FF0000"
  gap: 8
  body_font: Helvetica
styles:
  Parent: { a: 1, b: 2 }
  Child: { superstyle: Parent, b: 3, c: 4 }
palette:
  accent: { $constant: brand }
  spacing: "12"
"##;

    const COMPACT: &str = "constants:\n  gap: 4\n";

    fn loader() -> MemoryLoader {
        MemoryLoader::new()
            .with_yaml(DEFAULT_SOURCE_NAME, DEFAULT)
            .with_yaml("compact", COMPACT)
    }

    fn engine() -> ThemeEngine {
        ThemeEngine::builder().loader(loader()).build().unwrap()
    }

    #[test]
    fn test_builder_defaults_to_theme_default() {
        let engine = engine();
        assert_eq!(engine.constant("gap").unwrap(), Value::Integer(8));
        assert!(engine.alternates().is_empty());
    }

    #[test]
    fn test_builder_alternates() {
        let engine = ThemeEngine::builder()
            .loader(loader())
            .alternates(["compact"])
            .build()
            .unwrap();
        assert_eq!(engine.constant("gap").unwrap(), Value::Integer(4));
        assert_eq!(engine.constant("brand").unwrap(), Value::from("#FF0000"));
    }

    #[test]
    fn test_builder_missing_alternate() {
        let err = ThemeEngine::builder()
            .loader(loader())
            .alternates(["nope"])
            .build()
            .unwrap_err();
        assert!(matches!(err, ThemeError::SourceNotFound { .. }));
    }

    #[test]
    fn test_typed_accessors() {
        let engine = engine();
        assert_eq!(engine.color_for_key("palette.accent").unwrap(), Color::rgb(255, 0, 0));
        assert_eq!(engine.number_for_key("palette.spacing").unwrap(), 12.0);
        assert_eq!(engine.integer_for_key("constants.gap").unwrap(), 8);
        assert_eq!(
            engine.font_for_key("constants.body_font", 14.0).unwrap(),
            Font::new("Helvetica", 14.0)
        );
        assert!(matches!(
            engine.color_for_key("constants.gap").unwrap_err(),
            ThemeError::TypeCoercionFailed { .. }
        ));
        assert!(matches!(
            engine.number_for_key("palette.nothing").unwrap_err(),
            ThemeError::KeyNotFound { .. }
        ));
    }

    #[test]
    fn test_value_for_key_follows_overridden_constant() {
        let engine = engine();
        engine.modify_constant("brand", "#00FF00");
        assert_eq!(engine.value_for_key("palette.accent").unwrap(), Value::from("#00FF00"));
        assert_eq!(
            engine.raw_lookup("palette.accent").unwrap(),
            Value::from(RawValue::constant("brand"))
        );
    }

    #[test]
    fn test_modified_getters_ignore_sources() {
        let engine = engine();
        assert!(matches!(
            engine.modified_constant("brand").unwrap_err(),
            ThemeError::ConstantNotFound { .. }
        ));
        assert!(matches!(
            engine.modified_style("Child").unwrap_err(),
            ThemeError::StyleNotFound { .. }
        ));

        engine.modify_style("Child", "a", 99);
        assert_eq!(engine.modified_style_path("Child", "a").unwrap(), RawValue::from(99));
        assert!(engine.modified_style_path("Child", "b").is_err());
        assert_eq!(engine.modified_style("Child").unwrap().entries.len(), 1);
    }

    #[test]
    fn test_synchronize_and_reload() {
        let storage = MemoryStorage::new();
        let engine = ThemeEngine::builder()
            .loader(loader())
            .storage(storage.clone())
            .build()
            .unwrap();
        engine.modify_constant("gap", 16);
        engine.modify_style("Child", "a", 99);
        engine.set_style_inheritance("Child", true);
        engine.synchronize().unwrap();

        let reloaded = ThemeEngine::builder()
            .loader(loader())
            .storage(storage.clone())
            .build()
            .unwrap();
        assert_eq!(reloaded.overrides(), engine.overrides());
        assert!(reloaded.is_inheritance_enabled("Child"));
        assert_eq!(reloaded.constant("gap").unwrap(), Value::Integer(16));
    }

    #[test]
    fn test_reset_restores_source_results() {
        let storage = MemoryStorage::new();
        let engine = ThemeEngine::builder()
            .loader(loader())
            .storage(storage.clone())
            .build()
            .unwrap();
        let before = engine.merged_style("Child").unwrap();

        engine.modify_style("Child", "a", 99);
        engine.modify_constant("gap", 1);
        engine.synchronize().unwrap();
        engine.reset().unwrap();

        assert_eq!(engine.merged_style("Child").unwrap(), before);
        assert_eq!(engine.constant("gap").unwrap(), Value::Integer(8));
        assert!(storage.snapshot().is_none());
    }

    #[test]
    fn test_synchronize_rejects_non_finite_override() {
        let storage = MemoryStorage::new();
        let engine = ThemeEngine::builder()
            .loader(loader())
            .storage(storage.clone())
            .build()
            .unwrap();
        engine.modify_constant("ratio", f64::NAN);
        assert!(matches!(
            engine.synchronize().unwrap_err(),
            ThemeError::PersistenceFailure { .. }
        ));
        assert!(storage.snapshot().is_none());
        assert!(engine.modified_constant("ratio").is_ok());
    }

    #[test]
    fn test_synchronize_without_storage_is_noop() {
        let engine = engine();
        engine.modify_constant("gap", 1);
        engine.synchronize().unwrap();
        assert_eq!(engine.constant("gap").unwrap(), Value::Integer(1));
    }

    #[test]
    fn test_engine_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ThemeEngine>();
    }
}
