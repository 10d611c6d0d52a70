//! Theme sources: one parsed configuration document each.
//!
//! A source is either sectioned:
//!
//! ```yaml
//! constants:
//!   brand: "#FF3B30"
//! styles:
//!   Title:
//!     font: { name: Helvetica, size: 17 }
//!   Headline:
//!     superstyle: Title
//!     textColor: { $constant: brand }
//! interfaces:
//!   LegacyButton:
//!     alpha: 0.5
//! ```
//!
//! or a single flat mapping, in which case it only serves dotted key lookups.

use std::collections::BTreeMap;
use std::path::Path;

use crate::error::ThemeError;
use crate::value::{RawValue, Value};

/// Reserved style key naming the parent style.
pub const SUPERSTYLE_KEY: &str = "superstyle";

/// Whether a source is the mandatory default or a prioritized alternate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Default,
    Alternate,
}

/// Top-level sections of a sectioned source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Constants,
    Styles,
    Interfaces,
}

impl Section {
    /// The document key of this section.
    pub fn key(self) -> &'static str {
        match self {
            Section::Constants => "constants",
            Section::Styles => "styles",
            Section::Interfaces => "interfaces",
        }
    }
}

/// A style as written in a source: entries plus an optional parent.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StyleDefinition {
    /// Name of the style this one inherits from.
    pub superstyle: Option<String>,
    /// Property path to raw value, without the `superstyle` key.
    pub entries: BTreeMap<String, RawValue>,
}

impl StyleDefinition {
    /// Reads a style definition out of a document map.
    ///
    /// A non-string `superstyle` value is rejected.
    pub fn from_map(map: &BTreeMap<String, Value>) -> Result<Self, String> {
        let mut definition = StyleDefinition::default();
        for (key, value) in map {
            if key == SUPERSTYLE_KEY {
                match value {
                    Value::String(parent) => definition.superstyle = Some(parent.clone()),
                    other => {
                        return Err(format!(
                            "'{}' must be a style name, found {}",
                            SUPERSTYLE_KEY,
                            other.type_name()
                        ))
                    }
                }
            } else {
                definition
                    .entries
                    .insert(key.clone(), RawValue::from(value.clone()));
            }
        }
        Ok(definition)
    }
}

/// One loaded, read-only theme document.
#[derive(Debug, Clone, PartialEq)]
pub struct ThemeSource {
    name: String,
    kind: SourceKind,
    root: Value,
}

impl ThemeSource {
    /// Wraps an already-decoded document. The root must be a map.
    pub fn from_value(
        name: impl Into<String>,
        kind: SourceKind,
        root: Value,
    ) -> Result<Self, ThemeError> {
        let name = name.into();
        if root.as_map().is_none() {
            return Err(ThemeError::InvalidSource {
                name,
                message: format!("document root must be a mapping, found {}", root.type_name()),
            });
        }
        let source = Self { name, kind, root };
        source.check_sections()?;
        Ok(source)
    }

    /// Parses a YAML document.
    pub fn from_yaml(
        name: impl Into<String>,
        kind: SourceKind,
        yaml: &str,
    ) -> Result<Self, ThemeError> {
        let name = name.into();
        let root: Value = serde_yaml::from_str(yaml).map_err(|e| ThemeError::InvalidSource {
            name: name.clone(),
            message: e.to_string(),
        })?;
        Self::from_value(name, kind, root)
    }

    /// Parses a JSON document.
    pub fn from_json(
        name: impl Into<String>,
        kind: SourceKind,
        json: &str,
    ) -> Result<Self, ThemeError> {
        let name = name.into();
        let root: Value = serde_json::from_str(json).map_err(|e| ThemeError::InvalidSource {
            name: name.clone(),
            message: e.to_string(),
        })?;
        Self::from_value(name, kind, root)
    }

    /// Reads and parses a file, choosing the format from its extension.
    pub fn from_file(
        name: impl Into<String>,
        kind: SourceKind,
        path: &Path,
    ) -> Result<Self, ThemeError> {
        let name = name.into();
        let content = std::fs::read_to_string(path).map_err(|e| ThemeError::InvalidSource {
            name: name.clone(),
            message: format!("failed to read {}: {}", path.display(), e),
        })?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json(name, kind, &content),
            Some("yaml" | "yml") => Self::from_yaml(name, kind, &content),
            other => Err(ThemeError::InvalidSource {
                name,
                message: format!("unsupported format: {}", other.unwrap_or("unknown")),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    /// Returns the value at a dotted path, if present.
    pub fn lookup(&self, path: &str) -> Option<&Value> {
        self.root.get_path(path)
    }

    /// Returns a raw entry of a section by exact key.
    ///
    /// Keys are not split on dots, so style names may contain them.
    pub fn section_entry(&self, section: Section, key: &str) -> Option<&Value> {
        self.root.as_map()?.get(section.key())?.as_map()?.get(key)
    }

    /// Returns the raw value of a constant.
    ///
    /// An exact key wins; otherwise `name` is read as a dotted path into the
    /// `constants` section, so grouped constants resolve as `colors.red`.
    pub fn constant(&self, name: &str) -> Option<RawValue> {
        let constants = self.lookup(Section::Constants.key())?;
        constants
            .as_map()?
            .get(name)
            .or_else(|| constants.get_path(name))
            .cloned()
            .map(RawValue::from)
    }

    /// Returns a style definition from `styles`, falling back to `interfaces`.
    pub fn style(&self, name: &str) -> Option<StyleDefinition> {
        let map = self
            .section_entry(Section::Styles, name)
            .or_else(|| self.section_entry(Section::Interfaces, name))?
            .as_map()?;
        // Sections are validated on construction.
        StyleDefinition::from_map(map).ok()
    }

    /// True when the document has at least one of the known sections.
    pub fn is_sectioned(&self) -> bool {
        [Section::Constants, Section::Styles, Section::Interfaces]
            .iter()
            .any(|section| self.lookup(section.key()).is_some())
    }

    fn check_sections(&self) -> Result<(), ThemeError> {
        for section in [Section::Constants, Section::Styles, Section::Interfaces] {
            let Some(content) = self.lookup(section.key()) else {
                continue;
            };
            let Some(entries) = content.as_map() else {
                return Err(self.invalid(format!("section '{}' must be a mapping", section.key())));
            };
            if section == Section::Constants {
                continue;
            }
            for (style, body) in entries {
                let map = body.as_map().ok_or_else(|| {
                    self.invalid(format!("style '{}' must be a mapping", style))
                })?;
                StyleDefinition::from_map(map)
                    .map_err(|reason| self.invalid(format!("style '{}': {}", style, reason)))?;
            }
        }
        Ok(())
    }

    fn invalid(&self, message: String) -> ThemeError {
        ThemeError::InvalidSource {
            name: self.name.clone(),
            message,
        }
    }
}
