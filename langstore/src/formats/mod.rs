//! All supported native localization formats for langstore.
//!
//! Each format module provides a [`crate::traits::Backing`] implementation.
//! Formats are looked up through an explicit [`FormatRegistry`] built by the
//! caller, never through global state.

pub mod arb;
pub mod fluent;
pub mod json;
pub mod toml;

use std::{
    collections::BTreeMap,
    fmt::{Display, Formatter},
    path::Path,
    str::FromStr,
};

pub use arb::Document as ArbDocument;
pub use fluent::Document as FluentDocument;
pub use json::Document as JsonDocument;
pub use toml::Document as TomlDocument;

use crate::{error::Error, traits::Backing};

/// Represents all supported native formats for generic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FormatType {
    /// TOML, go-i18n style plural tables included.
    Toml,
    /// Project Fluent `.ftl`.
    Fluent,
    /// Plain nested JSON.
    Json,
    /// go-i18n v2 JSON with plural message objects.
    GoI18nJson,
    /// Flutter Application Resource Bundle.
    Arb,
}

/// Implements [`std::fmt::Display`] for [`FormatType`], giving the registry id.
///
/// # Example
/// ```rust
/// use langstore::formats::FormatType;
/// assert_eq!(FormatType::Toml.to_string(), "toml");
/// assert_eq!(FormatType::Fluent.to_string(), "ftl");
/// assert_eq!(FormatType::GoI18nJson.to_string(), "go-i18n-json");
/// ```
impl Display for FormatType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            FormatType::Toml => write!(f, "toml"),
            FormatType::Fluent => write!(f, "ftl"),
            FormatType::Json => write!(f, "json"),
            FormatType::GoI18nJson => write!(f, "go-i18n-json"),
            FormatType::Arb => write!(f, "arb"),
        }
    }
}

/// Accepts registry ids and a few aliases, case-insensitively.
///
/// # Example
/// ```rust
/// use langstore::formats::FormatType;
/// use std::str::FromStr;
/// assert_eq!(FormatType::from_str("fluent").unwrap(), FormatType::Fluent);
/// assert_eq!(FormatType::from_str("go_i18n_json").unwrap(), FormatType::GoI18nJson);
/// assert!(FormatType::from_str("yaml").is_err());
/// ```
impl FromStr for FormatType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        match normalized.as_str() {
            "toml" => Ok(FormatType::Toml),
            "ftl" | "fluent" => Ok(FormatType::Fluent),
            "json" => Ok(FormatType::Json),
            "go-i18n-json" | "goi18n" | "go-i18n" => Ok(FormatType::GoI18nJson),
            "arb" => Ok(FormatType::Arb),
            other => Err(Error::UnknownFormat(other.to_string())),
        }
    }
}

impl FormatType {
    /// Returns the typical file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            FormatType::Toml => "toml",
            FormatType::Fluent => "ftl",
            FormatType::Json | FormatType::GoI18nJson => "json",
            FormatType::Arb => "arb",
        }
    }
}

/// Infers a [`FormatType`] from a file path's extension.
///
/// `.json` maps to plain JSON; go-i18n JSON has to be asked for explicitly.
///
/// # Example
/// ```rust
/// use langstore::formats::{FormatType, infer_format_from_extension};
/// assert_eq!(infer_format_from_extension("active.fr.toml"), Some(FormatType::Toml));
/// assert_eq!(infer_format_from_extension("app_en.arb"), Some(FormatType::Arb));
/// assert_eq!(infer_format_from_extension("notes.txt"), None);
/// ```
pub fn infer_format_from_extension<P: AsRef<Path>>(path: P) -> Option<FormatType> {
    match path.as_ref().extension().and_then(|s| s.to_str()) {
        Some("toml") => Some(FormatType::Toml),
        Some("ftl") => Some(FormatType::Fluent),
        Some("json") => Some(FormatType::Json),
        Some("arb") => Some(FormatType::Arb),
        _ => None,
    }
}

/// Parses raw native text into a backing document.
pub type ParseFn = fn(&str) -> Result<Box<dyn Backing>, Error>;

/// Creates an empty backing document.
pub type EmptyFn = fn() -> Box<dyn Backing>;

/// The entry points of one native format.
#[derive(Debug, Clone, Copy)]
pub struct FormatHandler {
    pub format: FormatType,
    pub parse: ParseFn,
    pub empty: EmptyFn,
}

/// Explicit table from format id to [`FormatHandler`].
///
/// Built once by the caller and passed to whatever needs format lookup.
#[derive(Debug, Clone, Default)]
pub struct FormatRegistry {
    handlers: BTreeMap<FormatType, FormatHandler>,
}

impl FormatRegistry {
    /// A registry with no formats.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with every built-in format.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(toml::handler());
        registry.register(fluent::handler());
        registry.register(json::handler());
        registry.register(json::go_i18n_handler());
        registry.register(arb::handler());
        registry
    }

    /// Adds or replaces the handler for its format.
    pub fn register(&mut self, handler: FormatHandler) {
        self.handlers.insert(handler.format, handler);
    }

    pub fn get(&self, format: FormatType) -> Result<&FormatHandler, Error> {
        self.handlers
            .get(&format)
            .ok_or_else(|| Error::UnknownFormat(format.to_string()))
    }

    /// Looks a handler up by its textual id.
    pub fn lookup(&self, id: &str) -> Result<&FormatHandler, Error> {
        self.get(FormatType::from_str(id)?)
    }

    pub fn formats(&self) -> impl Iterator<Item = FormatType> + '_ {
        self.handlers.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_type_round_trip() {
        for format in [
            FormatType::Toml,
            FormatType::Fluent,
            FormatType::Json,
            FormatType::GoI18nJson,
            FormatType::Arb,
        ] {
            assert_eq!(FormatType::from_str(&format.to_string()).unwrap(), format);
        }
    }

    #[test]
    fn test_format_type_from_str_with_whitespace() {
        assert_eq!(FormatType::from_str("  TOML ").unwrap(), FormatType::Toml);
    }

    #[test]
    fn test_format_type_from_str_invalid() {
        assert!(FormatType::from_str("").is_err());
        assert!(matches!(
            FormatType::from_str("xliff"),
            Err(Error::UnknownFormat(_))
        ));
    }

    #[test]
    fn test_format_type_extension() {
        assert_eq!(FormatType::Toml.extension(), "toml");
        assert_eq!(FormatType::Fluent.extension(), "ftl");
        assert_eq!(FormatType::GoI18nJson.extension(), "json");
        assert_eq!(FormatType::Arb.extension(), "arb");
    }

    #[test]
    fn test_registry_defaults() {
        let registry = FormatRegistry::with_defaults();
        assert_eq!(registry.formats().count(), 5);
        let handler = registry.lookup("ftl").unwrap();
        assert_eq!(handler.format, FormatType::Fluent);
        assert_eq!((handler.empty)().format(), FormatType::Fluent);
    }

    #[test]
    fn test_registry_unknown_format() {
        let registry = FormatRegistry::new();
        assert!(matches!(
            registry.get(FormatType::Toml),
            Err(Error::UnknownFormat(_))
        ));
    }
}
