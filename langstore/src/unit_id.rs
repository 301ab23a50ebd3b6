//! Structural addresses of translation units inside a nested document.
//!
//! A [`UnitId`] is the path from the document root to one leaf: a sequence of
//! map keys and array indices. Its string form (`foo.bar->[2]`) is what ends up
//! in PO location comments, so it is also the key used to cross-reference a
//! native document with a bilingual one.

use std::{fmt::Display, str::FromStr};

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::Error;

lazy_static! {
    static ref INDEX_REGEX: Regex = Regex::new(r"^->\[(\d+)\]").unwrap();
}

/// One step of a [`UnitId`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Segment {
    /// Entry of a map, by name.
    Key(String),
    /// Element of an array, by position.
    Index(usize),
}

/// Path to one leaf of a document tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
pub struct UnitId {
    segments: Vec<Segment>,
}

impl UnitId {
    /// The empty path, addressing the document root.
    pub fn root() -> Self {
        Self::default()
    }

    /// Builds a single-key id, the common case for flat formats.
    pub fn key(name: impl Into<String>) -> Self {
        Self::root().with_key(name)
    }

    pub fn from_segments(segments: Vec<Segment>) -> Self {
        Self { segments }
    }

    /// Returns a new id with a `key` segment appended.
    pub fn with_key(&self, name: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(Segment::Key(name.into()));
        Self { segments }
    }

    /// Returns a new id with an `index` segment appended.
    pub fn with_index(&self, index: usize) -> Self {
        let mut segments = self.segments.clone();
        segments.push(Segment::Index(index));
        Self { segments }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn last(&self) -> Option<&Segment> {
        self.segments.last()
    }

    /// The id of the containing node, `None` for the root.
    pub fn parent(&self) -> Option<UnitId> {
        let (_, rest) = self.segments.split_last()?;
        Some(Self {
            segments: rest.to_vec(),
        })
    }

    /// Whether `prefix` addresses this id or one of its ancestors.
    pub fn starts_with(&self, prefix: &UnitId) -> bool {
        self.segments.starts_with(&prefix.segments)
    }

    /// Renumbers this id after the element `removed` of the array at `array`
    /// was deleted. Returns `true` when the id changed.
    pub(crate) fn shift_after_removal(&mut self, array: &UnitId, removed: usize) -> bool {
        if !self.starts_with(array) {
            return false;
        }
        match self.segments.get_mut(array.len()) {
            Some(Segment::Index(index)) if *index > removed => {
                *index -= 1;
                true
            }
            _ => false,
        }
    }
}

impl From<Vec<Segment>> for UnitId {
    fn from(segments: Vec<Segment>) -> Self {
        Self::from_segments(segments)
    }
}

impl Display for UnitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (position, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Key(name) if position == 0 => write!(f, "{}", name)?,
                Segment::Key(name) => write!(f, ".{}", name)?,
                Segment::Index(index) => write!(f, "->[{}]", index)?,
            }
        }
        Ok(())
    }
}

/// Parses the display form back into segments.
///
/// Keys that themselves contain `.` or `->[` cannot be recovered exactly; such
/// ids still compare equal by their string form, which is what location-based
/// lookups use.
impl FromStr for UnitId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut segments = Vec::new();
        let mut rest = s;
        let mut key = String::new();
        let mut pending_key = false;

        while !rest.is_empty() {
            if let Some(captures) = INDEX_REGEX.captures(rest) {
                if pending_key || !key.is_empty() {
                    segments.push(Segment::Key(std::mem::take(&mut key)));
                    pending_key = false;
                }
                let index = captures[1]
                    .parse()
                    .map_err(|_| Error::InvalidUnitId(s.to_string()))?;
                segments.push(Segment::Index(index));
                rest = &rest[captures[0].len()..];
            } else if let Some(tail) = rest.strip_prefix('.') {
                if pending_key || !key.is_empty() || segments.is_empty() {
                    segments.push(Segment::Key(std::mem::take(&mut key)));
                }
                pending_key = true;
                rest = tail;
            } else {
                let next = rest.chars().next().unwrap_or_default();
                key.push(next);
                pending_key = true;
                rest = &rest[next.len_utf8()..];
            }
        }
        if pending_key {
            segments.push(Segment::Key(key));
        }

        Ok(Self { segments })
    }
}
