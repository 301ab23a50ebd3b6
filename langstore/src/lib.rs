#![forbid(unsafe_code)]
//! Format-preserving localization storage for Rust.
//!
//! Reads nested monolingual documents (TOML, Fluent, JSON, go-i18n JSON and
//! ARB), exposes every translatable leaf as a flat [`TranslationUnit`], and
//! writes edits back without disturbing comments, key order or formatting of
//! the rest of the document. The [`converter`] module turns stores into PO
//! catalogs and merges translations back into a template document.
//!
//! # Quick Start
//!
//! ```rust
//! use langstore::{FormatRegistry, FormatType, StoreOptions, Translation, TranslationStore, UnitId};
//!
//! let registry = FormatRegistry::with_defaults();
//! let handler = *registry.get(FormatType::Toml)?;
//! let raw = "# Window title\ntitle = \"Hello\"\n\n[menu]\nopen = \"Open\"\n";
//!
//! let mut store = TranslationStore::from_str(handler, raw, StoreOptions::new())?;
//! assert_eq!(store.len(), 2);
//!
//! store.set_target(&"menu.open".parse::<UnitId>()?, Translation::from("Ouvrir"))?;
//! assert_eq!(
//!     store.serialize()?,
//!     "# Window title\ntitle = \"Hello\"\n\n[menu]\nopen = \"Ouvrir\"\n"
//! );
//! # Ok::<(), langstore::Error>(())
//! ```
//!
//! # Supported Formats
//!
//! - **TOML** (`toml`): go-i18n style files, plural groups keyed by CLDR category
//! - **Fluent** (`ftl`): messages, terms and attributes
//! - **JSON** (`json`): nested i18next style objects
//! - **go-i18n JSON** (`go-i18n-json`): message objects with descriptions and plurals
//! - **ARB** (`arb`): Flutter resource bundles with `@key` metadata

pub mod comment;
pub mod converter;
pub mod error;
pub mod flatten;
pub mod formats;
pub mod node;
pub mod options;
pub mod plural_rules;
pub mod po;
pub mod store;
pub mod traits;
pub mod types;
pub mod unit_id;

// Re-export most used types for easy consumption
pub use crate::{
    converter::{
        DuplicateStyle, convert_store, merge_native, merge_native_text, merge_po, merge_store,
        native_to_po, po_to_native,
    },
    error::Error,
    formats::{FormatHandler, FormatRegistry, FormatType, infer_format_from_extension},
    options::{ConvertOptions, StoreOptions},
    po::{PoFile, PoHeader, PoUnit},
    store::TranslationStore,
    traits::Backing,
    types::{NoteOrigin, PluralCategory, Translation, TranslationUnit},
    unit_id::UnitId,
};
