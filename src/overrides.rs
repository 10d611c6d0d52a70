//! Runtime overrides of constants and styles, with optional persistence.
//!
//! Overrides live in memory for the current session. [`OverrideStorage`]
//! implementations make them durable: [`FileStorage`] writes a JSON snapshot
//! atomically, [`MemoryStorage`] keeps the snapshot in memory.
//!
//! # Replace vs. overlay
//!
//! By default a style override *replaces* the whole resolved style with the
//! overridden entries. Enabling inheritance for the style turns the override
//! into an overlay on top of the inherited entries instead.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::ThemeError;
use crate::value::RawValue;

/// Overridden entries of one style.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StyleOverride {
    /// Property path to overriding value.
    #[serde(default)]
    pub entries: BTreeMap<String, RawValue>,
    /// Overlay on inherited entries instead of replacing them.
    #[serde(default)]
    pub inheritance_enabled: bool,
}

/// In-memory layer of constant and style overrides.
///
/// A style may carry an inheritance flag without any entries; such a record
/// does not count as an override until an entry is added.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OverrideStore {
    #[serde(default)]
    constants: BTreeMap<String, RawValue>,
    #[serde(default)]
    styles: BTreeMap<String, StyleOverride>,
}

impl OverrideStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets or replaces the override of a constant.
    pub fn modify_constant(&mut self, name: &str, value: impl Into<RawValue>) {
        let value = value.into();
        debug!(constant = name, value = ?value, "Constant overridden");
        self.constants.insert(name.to_string(), value);
    }

    /// Sets or replaces one entry of a style override.
    ///
    /// A new record inherits the mode previously set with
    /// [`set_style_inheritance`](Self::set_style_inheritance).
    pub fn modify_style(&mut self, name: &str, path: &str, value: impl Into<RawValue>) {
        let value = value.into();
        debug!(style = name, path, value = ?value, "Style entry overridden");
        self.styles
            .entry(name.to_string())
            .or_default()
            .entries
            .insert(path.to_string(), value);
    }

    /// Chooses overlay (`true`) or replace (`false`) mode for a style.
    pub fn set_style_inheritance(&mut self, name: &str, enabled: bool) {
        debug!(style = name, enabled, "Style inheritance changed");
        self.styles
            .entry(name.to_string())
            .or_default()
            .inheritance_enabled = enabled;
    }

    pub fn is_inheritance_enabled(&self, name: &str) -> bool {
        self.styles
            .get(name)
            .map(|style| style.inheritance_enabled)
            .unwrap_or(false)
    }

    /// The overriding value of a constant, ignoring source data.
    pub fn constant(&self, name: &str) -> Option<&RawValue> {
        self.constants.get(name)
    }

    /// The override record of a style, if it has at least one entry.
    pub fn style(&self, name: &str) -> Option<&StyleOverride> {
        self.styles
            .get(name)
            .filter(|style| !style.entries.is_empty())
    }

    /// One overridden entry of a style.
    pub fn style_entry(&self, name: &str, path: &str) -> Option<&RawValue> {
        self.styles.get(name)?.entries.get(path)
    }

    pub fn constants(&self) -> &BTreeMap<String, RawValue> {
        &self.constants
    }

    pub fn styles(&self) -> &BTreeMap<String, StyleOverride> {
        &self.styles
    }

    pub fn is_empty(&self) -> bool {
        self.constants.is_empty() && self.styles.is_empty()
    }

    pub fn clear(&mut self) {
        self.constants.clear();
        self.styles.clear();
    }

    /// Encodes the store as its durable JSON document.
    ///
    /// JSON has no NaN or infinity, so a store holding a non-finite float is
    /// refused rather than written back as `null`.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        if let Some(entry) = self.non_finite_entry() {
            return Err(<serde_json::Error as serde::ser::Error>::custom(format!(
                "{} holds a non-finite number",
                entry
            )));
        }
        serde_json::to_string_pretty(self)
    }

    fn non_finite_entry(&self) -> Option<String> {
        let non_finite = |raw: &RawValue| matches!(raw, RawValue::Literal(v) if !v.is_finite());
        self.constants
            .iter()
            .find(|(_, raw)| non_finite(*raw))
            .map(|(name, _)| format!("constant '{}'", name))
            .or_else(|| {
                self.styles.iter().find_map(|(style, record)| {
                    record
                        .entries
                        .iter()
                        .find(|(_, raw)| non_finite(*raw))
                        .map(|(path, _)| format!("style entry '{}.{}'", style, path))
                })
            })
    }

    /// Decodes a store from its durable JSON document.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Durable home of the override snapshot.
pub trait OverrideStorage: Send + Sync {
    /// Reads the last saved snapshot, or `None` if nothing was saved.
    fn load(&self) -> Result<Option<OverrideStore>, ThemeError>;

    /// Replaces the saved snapshot. On failure the previous one stays intact.
    fn save(&self, store: &OverrideStore) -> Result<(), ThemeError>;

    /// Removes the saved snapshot.
    fn clear(&self) -> Result<(), ThemeError>;
}

/// Stores the snapshot as a JSON file, written through a temporary file in
/// the same directory and renamed into place.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn failure(&self, message: impl ToString) -> ThemeError {
        ThemeError::PersistenceFailure {
            path: self.path.clone(),
            message: message.to_string(),
        }
    }
}

impl OverrideStorage for FileStorage {
    fn load(&self) -> Result<Option<OverrideStore>, ThemeError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.failure(e)),
        };
        OverrideStore::from_json(&content)
            .map(Some)
            .map_err(|e| self.failure(e))
    }

    fn save(&self, store: &OverrideStore) -> Result<(), ThemeError> {
        let json = store.to_json().map_err(|e| self.failure(e))?;
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir).map_err(|e| self.failure(e))?;

        let mut file = NamedTempFile::new_in(&dir).map_err(|e| self.failure(e))?;
        file.write_all(json.as_bytes())
            .and_then(|_| file.as_file().sync_all())
            .map_err(|e| self.failure(e))?;
        file.persist(&self.path).map_err(|e| self.failure(e.error))?;
        debug!(path = %self.path.display(), "Overrides written");
        Ok(())
    }

    fn clear(&self) -> Result<(), ThemeError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.failure(e)),
        }
    }
}

/// Keeps the serialized snapshot in memory. Clones share the same snapshot,
/// so a clone handed to one engine can be read back by another.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    snapshot: Arc<Mutex<Option<String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// The raw saved document, if any.
    pub fn snapshot(&self) -> Option<String> {
        self.snapshot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl OverrideStorage for MemoryStorage {
    fn load(&self) -> Result<Option<OverrideStore>, ThemeError> {
        self.snapshot()
            .map(|json| {
                OverrideStore::from_json(&json).map_err(|e| ThemeError::PersistenceFailure {
                    path: PathBuf::from("<memory>"),
                    message: e.to_string(),
                })
            })
            .transpose()
    }

    fn save(&self, store: &OverrideStore) -> Result<(), ThemeError> {
        let json = store.to_json().map_err(|e| ThemeError::PersistenceFailure {
            path: PathBuf::from("<memory>"),
            message: e.to_string(),
        })?;
        *self.snapshot.lock().unwrap_or_else(PoisonError::into_inner) = Some(json);
        Ok(())
    }

    fn clear(&self) -> Result<(), ThemeError> {
        *self.snapshot.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}
