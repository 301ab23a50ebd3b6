use std::{path::Path, str::FromStr};

use langstore::{Error, FormatType, infer_format_from_extension};
use unic_langid::LanguageIdentifier;

/// Parses a `--format` value.
pub fn parse_format(s: &str) -> Result<FormatType, String> {
    FormatType::from_str(s).map_err(|_| {
        format!(
            "Unknown format: '{}'. Supported formats: toml, ftl, json, go-i18n-json, arb",
            s
        )
    })
}

/// Parses a `--lang` value as a BCP 47 language identifier.
pub fn parse_language(s: &str) -> Result<String, String> {
    s.replace('_', "-")
        .parse::<LanguageIdentifier>()
        .map(|_| s.to_string())
        .map_err(|_| format!("Invalid language code: '{}'", s))
}

/// The explicit format if one was given, else the one the file extension implies.
pub fn resolve_format(path: &Path, explicit: Option<FormatType>) -> Result<FormatType, Error> {
    explicit
        .or_else(|| infer_format_from_extension(path))
        .ok_or_else(|| Error::UnknownFormat(path.display().to_string()))
}
