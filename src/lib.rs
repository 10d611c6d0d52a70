//! # Layered Theme - cascading constants and styles for any target object
//!
//! `layered-theme` resolves named constants and styles from a prioritized set
//! of theme documents, lets the application override them at runtime (and
//! persist those overrides), and applies a resolved style onto arbitrary
//! objects by assigning each value to a named property path.
//!
//! ## Concepts
//!
//! - **Sources**: one mandatory default document plus ordered alternates.
//!   Lookups try alternates first, in registration order, then the default.
//! - **Constants**: named values; a constant may reference another one with
//!   `{ $constant: other }`.
//! - **Styles**: named bundles of property path to value, inheriting the
//!   entries of their `superstyle`.
//! - **Overrides**: runtime changes to constants and style entries. A style
//!   override replaces the style unless inheritance is enabled for it.
//! - **Application**: each merged entry is coerced to the type of its
//!   destination and assigned through [`Themeable`]; failures are collected
//!   per path in an [`ApplyReport`].
//!
//! ## Quick Start
//!
//! ```rust
//! use layered_theme::{
//!     Color, MemoryLoader, PropertyKind, PropertyValue, ThemeEngine, ThemeError, Themeable,
//! };
//!
//! const THEME: &str = r##"
//! constants:
//!   brand: "#FF3B30"
//! styles:
//!   Base:
//!     alpha: 1
//!   Badge:
//!     superstyle: Base
//!     tint: { $constant: brand }
//! "##;
//!
//! #[derive(Default)]
//! struct Badge {
//!     alpha: f64,
//!     tint: Option<Color>,
//! }
//!
//! impl Themeable for Badge {
//!     fn property_kind(&self, name: &str) -> Option<PropertyKind> {
//!         match name {
//!             "alpha" => Some(PropertyKind::Float),
//!             "tint" => Some(PropertyKind::Color),
//!             _ => None,
//!         }
//!     }
//!
//!     fn set_property(&mut self, name: &str, value: PropertyValue) -> Result<(), ThemeError> {
//!         match (name, value) {
//!             ("alpha", PropertyValue::Float(a)) => self.alpha = a,
//!             ("tint", PropertyValue::Color(c)) => self.tint = Some(c),
//!             _ => return Err(ThemeError::UnknownPropertyPath { path: name.into() }),
//!         }
//!         Ok(())
//!     }
//! }
//!
//! let loader = MemoryLoader::new().with_yaml("theme_default", THEME);
//! let engine = ThemeEngine::builder().loader(loader).build().unwrap();
//!
//! let mut badge = Badge::default();
//! let report = engine.apply_style("Badge", &mut badge).unwrap();
//! assert!(report.is_complete());
//! assert_eq!(badge.alpha, 1.0);
//! assert_eq!(badge.tint, Some(Color::rgb(255, 59, 48)));
//! ```
//!
//! ## Logging
//!
//! The crate emits [`tracing`] events and never installs a subscriber.

mod apply;
mod engine;
mod error;
mod overrides;
mod registry;
mod resolve;
mod source;
mod value;

pub use apply::{
    apply_merged, coerce, number, set_path, ApplyReport, ChildGetter, Color, Font, FromProperty,
    PathFailure, PropertyKind, PropertyTable, PropertyValue, ThemeCustomization, Themeable,
};
pub use engine::{EngineConfig, ThemeEngine, ThemeEngineBuilder};
pub use error::ThemeError;
pub use overrides::{FileStorage, MemoryStorage, OverrideStorage, OverrideStore, StyleOverride};
pub use registry::{
    DirectoryLoader, MemoryLoader, SourceLoader, SourceRegistry, DEFAULT_SOURCE_NAME,
    SOURCE_EXTENSIONS,
};
pub use resolve::{MergedStyle, Resolver};
pub use source::{Section, SourceKind, StyleDefinition, ThemeSource, SUPERSTYLE_KEY};
pub use value::{RawValue, Value, CONSTANT_REF_KEY};
