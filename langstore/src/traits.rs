//! The seam between native formats and the format-agnostic store.

use std::fmt::Debug;

use crate::{
    error::Error,
    flatten::{FlattenOptions, IndexShift},
    formats::FormatType,
    node::Node,
    types::{PluralCategory, Translation},
    unit_id::UnitId,
};

/// A parsed native document that a [`crate::TranslationStore`] keeps as its
/// backing tree.
///
/// Implementations own the format-specific representation (so comments, blank
/// lines and unknown keys survive) and expose it as a [`Node`] view for
/// flattening. Edits go through [`Backing::place`] and [`Backing::remove`] so
/// the native representation stays the single source of truth on
/// serialization.
pub trait Backing: Debug {
    fn format(&self) -> FormatType;

    /// The document as a variant tree.
    fn tree(&self) -> Result<Node, Error>;

    fn flatten_options(&self) -> FlattenOptions {
        FlattenOptions::default()
    }

    /// Language declared inside the document itself, if the format has one.
    fn language(&self) -> Option<String> {
        None
    }

    /// Writes `value` at `id`. Plural values are encoded with `tags`.
    fn place(
        &mut self,
        id: &UnitId,
        value: &Translation,
        tags: &[PluralCategory],
    ) -> Result<(), Error>;

    /// Removes the leaf at `id` and any container left empty.
    fn remove(&mut self, id: &UnitId) -> Result<Option<IndexShift>, Error>;

    /// Renders the document back to native text.
    fn serialize(&self) -> Result<String, Error>;

    fn box_clone(&self) -> Box<dyn Backing>;
}

impl Clone for Box<dyn Backing> {
    fn clone(&self) -> Self {
        self.box_clone()
    }
}
