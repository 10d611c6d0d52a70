//! Constant resolution and style merging.
//!
//! [`Resolver`] reads a [`SourceRegistry`] and an [`OverrideStore`] and turns
//! names into final values. It holds no state of its own, so every result
//! reflects the sources and overrides at the time of the call.
//!
//! # Constants
//!
//! The override of a constant wins over source data. A value that is itself
//! a constant reference is followed until a literal is reached; a name seen
//! twice along the way is a cycle.
//!
//! # Styles
//!
//! A style's superstyle chain is merged root to leaf, descendants winning on
//! path collisions. The style's own override then either replaces the result
//! (the default) or is overlaid on it (inheritance enabled). Constant
//! references left in the merged entries are resolved last.

use std::collections::BTreeMap;

use tracing::trace;

use crate::error::ThemeError;
use crate::overrides::OverrideStore;
use crate::registry::SourceRegistry;
use crate::source::SUPERSTYLE_KEY;
use crate::value::{RawValue, Value};

/// Fully merged style: property path to resolved value.
pub type MergedStyle = BTreeMap<String, Value>;

/// Read-only view combining sources and overrides.
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'a> {
    sources: &'a SourceRegistry,
    overrides: &'a OverrideStore,
}

impl<'a> Resolver<'a> {
    pub fn new(sources: &'a SourceRegistry, overrides: &'a OverrideStore) -> Self {
        Self { sources, overrides }
    }

    /// Resolves a constant to its literal value.
    ///
    /// # Errors
    ///
    /// - [`ThemeError::ConstantNotFound`] naming the first missing constant
    /// - [`ThemeError::CircularConstantReference`] with the looping path
    pub fn constant(&self, name: &str) -> Result<Value, ThemeError> {
        let mut visited: Vec<String> = Vec::new();
        let mut current = name.to_string();

        loop {
            if visited.contains(&current) {
                visited.push(current);
                return Err(ThemeError::CircularConstantReference { path: visited });
            }

            let candidate = self.raw_constant(&current).ok_or_else(|| {
                ThemeError::ConstantNotFound {
                    name: current.clone(),
                }
            })?;
            visited.push(current);

            match candidate {
                RawValue::Literal(value) => {
                    trace!(constant = name, hops = visited.len(), "Constant resolved");
                    return Ok(value);
                }
                RawValue::ConstantRef(next) => current = next,
            }
        }
    }

    /// Resolves a raw value, following a constant reference if it is one.
    pub fn value(&self, raw: &RawValue) -> Result<Value, ThemeError> {
        match raw {
            RawValue::Literal(value) => Ok(value.clone()),
            RawValue::ConstantRef(name) => self.constant(name),
        }
    }

    /// Produces the final flat dictionary of a style.
    ///
    /// # Errors
    ///
    /// - [`ThemeError::StyleNotFound`] when the style, or a superstyle in its
    ///   chain, has neither a source definition nor an override
    /// - [`ThemeError::CircularStyleReference`] when the chain loops
    /// - constant errors from resolving referenced values
    pub fn merged_style(&self, name: &str) -> Result<MergedStyle, ThemeError> {
        let override_record = self.overrides.style(name);

        let raw: BTreeMap<String, RawValue> = match override_record {
            Some(record) if !record.inheritance_enabled => record
                .entries
                .iter()
                .filter(|(path, _)| path.as_str() != SUPERSTYLE_KEY)
                .map(|(path, value)| (path.clone(), value.clone()))
                .collect(),
            Some(record) => {
                let mut merged = self.merged_chain(name)?;
                for (path, value) in &record.entries {
                    if path != SUPERSTYLE_KEY {
                        merged.insert(path.clone(), value.clone());
                    }
                }
                merged
            }
            None => self.merged_chain(name)?,
        };

        let resolved = raw
            .into_iter()
            .map(|(path, value)| self.value(&value).map(|value| (path, value)))
            .collect::<Result<MergedStyle, _>>()?;
        trace!(style = name, entries = resolved.len(), "Style merged");
        Ok(resolved)
    }

    /// Builds the base merged dictionary of `name` from its superstyle chain.
    ///
    /// Only source entries are merged; a member known only through an
    /// override contributes its superstyle link and nothing else.
    fn merged_chain(&self, name: &str) -> Result<BTreeMap<String, RawValue>, ThemeError> {
        let chain = self.chain(name)?;

        let mut merged = BTreeMap::new();
        for style in chain.iter().rev() {
            if let Some(definition) = self.sources.style(style) {
                merged.extend(definition.entries);
            }
        }
        Ok(merged)
    }

    /// Walks the superstyle links from `name` to the root, leaf first.
    fn chain(&self, name: &str) -> Result<Vec<String>, ThemeError> {
        let mut chain: Vec<String> = Vec::new();
        let mut current = Some(name.to_string());

        while let Some(style) = current {
            if chain.contains(&style) {
                chain.push(style);
                return Err(ThemeError::CircularStyleReference { path: chain });
            }

            let definition = self.sources.style(&style);
            if definition.is_none() && self.overrides.style(&style).is_none() {
                return Err(ThemeError::StyleNotFound { name: style });
            }

            current = match self.overridden_superstyle(&style)? {
                Some(parent) => Some(parent),
                None => definition.and_then(|d| d.superstyle),
            };
            chain.push(style);
        }
        Ok(chain)
    }

    /// The superstyle set by an inheritance-enabled override, if any.
    fn overridden_superstyle(&self, style: &str) -> Result<Option<String>, ThemeError> {
        let Some(record) = self.overrides.style(style) else {
            return Ok(None);
        };
        if !record.inheritance_enabled {
            return Ok(None);
        }
        match record.entries.get(SUPERSTYLE_KEY) {
            None => Ok(None),
            Some(raw) => match self.value(raw)? {
                Value::String(parent) => Ok(Some(parent)),
                other => Err(ThemeError::TypeCoercionFailed {
                    path: format!("{}.{}", style, SUPERSTYLE_KEY),
                    expected: "style name".to_string(),
                    value: other.to_string(),
                }),
            },
        }
    }

    fn raw_constant(&self, name: &str) -> Option<RawValue> {
        match self.overrides.constant(name) {
            Some(value) => Some(value.clone()),
            None => self.sources.constant(name),
        }
    }
}
