//! Options controlling stores and conversions.

use crate::converter::DuplicateStyle;

/// Options for a [`crate::TranslationStore`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StoreOptions {
    /// Locale whose CLDR categories are used when plural values are written.
    /// Falls back to a language declared by the document, then to English.
    pub language: Option<String>,
}

impl StoreOptions {
    /// Creates default store options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the store locale.
    pub fn with_language(mut self, language: Option<String>) -> Self {
        self.language = language;
        self
    }
}

/// Options for the conversions in [`crate::converter`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConvertOptions {
    /// How units with identical source text are kept apart in PO output.
    pub duplicate_style: DuplicateStyle,
    /// Leave every `msgstr` empty (POT output), even when a translation exists.
    pub blank_msgstr: bool,
    /// Accept fuzzy PO entries as translations.
    pub include_fuzzy: bool,
    /// Name of the native file, recorded in the PO header.
    pub source_name: Option<String>,
    /// Target locale, recorded in the PO header and used for plural tags.
    pub language: Option<String>,
}

impl ConvertOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_duplicate_style(mut self, duplicate_style: DuplicateStyle) -> Self {
        self.duplicate_style = duplicate_style;
        self
    }

    pub fn with_blank_msgstr(mut self, blank_msgstr: bool) -> Self {
        self.blank_msgstr = blank_msgstr;
        self
    }

    pub fn with_fuzzy(mut self, include_fuzzy: bool) -> Self {
        self.include_fuzzy = include_fuzzy;
        self
    }

    pub fn with_source_name(mut self, source_name: Option<String>) -> Self {
        self.source_name = source_name;
        self
    }

    pub fn with_language(mut self, language: Option<String>) -> Self {
        self.language = language;
        self
    }

    /// Store options carrying the same locale.
    pub fn store_options(&self) -> StoreOptions {
        StoreOptions::new().with_language(self.language.clone())
    }
}
