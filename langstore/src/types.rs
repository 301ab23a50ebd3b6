//! Core, format-agnostic types for langstore.
//! Native adapters flatten into these; the merge engine reads and writes these.

use std::{collections::BTreeMap, fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{error::Error, unit_id::UnitId};

/// The text of a unit: a plain string or an ordered list of plural variants.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub enum Translation {
    /// A single translation without plural forms.
    Singular(String),

    /// Plural variants, ordered by the canonical CLDR category order.
    Plural(Vec<String>),
}

impl Translation {
    pub fn is_plural(&self) -> bool {
        matches!(self, Translation::Plural(_))
    }

    /// The strings making up this translation, one for a singular value.
    pub fn strings(&self) -> Vec<&str> {
        match self {
            Translation::Singular(value) => vec![value.as_str()],
            Translation::Plural(forms) => forms.iter().map(String::as_str).collect(),
        }
    }

    /// Number of variants (1 for a singular value).
    pub fn arity(&self) -> usize {
        match self {
            Translation::Singular(_) => 1,
            Translation::Plural(forms) => forms.len(),
        }
    }

    /// Whether every variant is empty.
    pub fn is_empty(&self) -> bool {
        self.strings().iter().all(|s| s.is_empty())
    }

    /// The first variant, which doubles as the singular form of a plural.
    pub fn first(&self) -> &str {
        match self {
            Translation::Singular(value) => value,
            Translation::Plural(forms) => forms.first().map(String::as_str).unwrap_or_default(),
        }
    }

    /// An empty value of the same shape and arity.
    pub fn blank(&self) -> Translation {
        match self {
            Translation::Singular(_) => Translation::Singular(String::new()),
            Translation::Plural(forms) => Translation::Plural(vec![String::new(); forms.len()]),
        }
    }

    /// Reshapes this value to match `shape` (singular or plural).
    ///
    /// A singular value becomes a one-variant plural; a plural keeps only its
    /// first variant when a singular is wanted.
    pub fn conform_to(self, shape: &Translation) -> Translation {
        match (self, shape) {
            (Translation::Singular(value), Translation::Plural(_)) => {
                Translation::Plural(vec![value])
            }
            (Translation::Plural(forms), Translation::Singular(_)) => {
                Translation::Singular(forms.into_iter().next().unwrap_or_default())
            }
            (value, _) => value,
        }
    }
}

impl Default for Translation {
    fn default() -> Self {
        Translation::Singular(String::new())
    }
}

impl From<&str> for Translation {
    fn from(value: &str) -> Self {
        Translation::Singular(value.to_string())
    }
}

impl From<String> for Translation {
    fn from(value: String) -> Self {
        Translation::Singular(value)
    }
}

impl Display for Translation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Translation::Singular(value) => write!(f, "{}", value),
            Translation::Plural(forms) => write!(f, "{}", forms.join(" | ")),
        }
    }
}

/// Who wrote a note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteOrigin {
    Developer,
    Translator,
}

impl FromStr for NoteOrigin {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "developer" => Ok(NoteOrigin::Developer),
            "translator" => Ok(NoteOrigin::Translator),
            _ => Err(format!("Unknown note origin: {}", s)),
        }
    }
}

/// A single translatable entry of a store.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TranslationUnit {
    /// Structural address of the unit's leaf.
    pub id: UnitId,

    pub source: Translation,

    target: Translation,

    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    #[serde(default)]
    pub notes: BTreeMap<NoteOrigin, String>,
}

impl TranslationUnit {
    /// Creates a unit whose source and target are both `value`, the natural
    /// state of an entry read from a monolingual document.
    pub fn new(id: UnitId, value: impl Into<Translation>) -> Self {
        let value = value.into();
        Self {
            id,
            source: value.clone(),
            target: value,
            notes: BTreeMap::new(),
        }
    }

    pub fn target(&self) -> &Translation {
        &self.target
    }

    /// Replaces the target. Source and target must agree on being plural.
    pub fn set_target(&mut self, target: Translation) -> Result<(), Error> {
        if target.is_plural() != self.source.is_plural() {
            return Err(Error::structure(
                &self.id,
                "target plural shape does not match the source",
            ));
        }
        self.target = target;
        Ok(())
    }

    pub fn has_plural(&self) -> bool {
        self.source.is_plural()
    }

    /// Location strings, as written to PO `#:` comments.
    pub fn locations(&self) -> Vec<String> {
        vec![self.id.to_string()]
    }

    pub fn add_note(&mut self, origin: NoteOrigin, text: impl Into<String>) {
        let text = text.into();
        self.notes
            .entry(origin)
            .and_modify(|existing| {
                existing.push('\n');
                existing.push_str(&text);
            })
            .or_insert(text);
    }

    pub fn note(&self, origin: NoteOrigin) -> Option<&str> {
        self.notes.get(&origin).map(String::as_str)
    }
}

impl Display for TranslationUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "TranslationUnit {{ id: {}, source: {}, target: {} }}",
            self.id, self.source, self.target
        )
    }
}

/// Standard CLDR plural forms, declared in canonical order.
#[derive(Ord, PartialOrd, Eq, PartialEq, Debug, Clone, Copy, Deserialize, Serialize, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PluralCategory {
    Zero,
    One,
    Two,
    Few,
    Many,
    Other,
}

impl PluralCategory {
    /// Every category, in canonical order.
    pub const ALL: [PluralCategory; 6] = [
        PluralCategory::Zero,
        PluralCategory::One,
        PluralCategory::Two,
        PluralCategory::Few,
        PluralCategory::Many,
        PluralCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PluralCategory::Zero => "zero",
            PluralCategory::One => "one",
            PluralCategory::Two => "two",
            PluralCategory::Few => "few",
            PluralCategory::Many => "many",
            PluralCategory::Other => "other",
        }
    }
}

impl FromStr for PluralCategory {
    type Err = String;

    /// Native documents spell categories in lowercase; anything else is a plain key.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "zero" => Ok(PluralCategory::Zero),
            "one" => Ok(PluralCategory::One),
            "two" => Ok(PluralCategory::Two),
            "few" => Ok(PluralCategory::Few),
            "many" => Ok(PluralCategory::Many),
            "other" => Ok(PluralCategory::Other),
            _ => Err(format!("Unknown plural category: {}", s)),
        }
    }
}

impl Display for PluralCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_new_mirrors_source_and_target() {
        let unit = TranslationUnit::new(UnitId::key("hello"), "Hello");
        assert_eq!(unit.source, Translation::Singular("Hello".to_string()));
        assert_eq!(unit.target(), &unit.source);
        assert!(!unit.has_plural());
        assert_eq!(unit.locations(), vec!["hello".to_string()]);
    }

    #[test]
    fn test_set_target_rejects_shape_mismatch() {
        let mut unit = TranslationUnit::new(UnitId::key("apples"), "apples");
        let err = unit
            .set_target(Translation::Plural(vec!["apple".into(), "apples".into()]))
            .unwrap_err();
        assert!(err.to_string().contains("plural shape"));

        unit.set_target(Translation::from("pommes")).unwrap();
        assert_eq!(unit.target().first(), "pommes");
    }

    #[test]
    fn test_add_note_appends() {
        let mut unit = TranslationUnit::new(UnitId::key("a"), "b");
        unit.add_note(NoteOrigin::Developer, "first");
        unit.add_note(NoteOrigin::Developer, "second");
        assert_eq!(unit.note(NoteOrigin::Developer), Some("first\nsecond"));
        assert_eq!(unit.note(NoteOrigin::Translator), None);
    }

    #[test]
    fn test_translation_blank_keeps_arity() {
        let plural = Translation::Plural(vec!["one".into(), "many".into(), "other".into()]);
        let blank = plural.blank();
        assert_eq!(blank.arity(), 3);
        assert!(blank.is_empty());
        assert!(!plural.is_empty());
    }

    #[test]
    fn test_translation_conform_to() {
        let singular = Translation::from("apple");
        let plural_shape = Translation::Plural(vec![]);
        assert_eq!(
            singular.clone().conform_to(&plural_shape),
            Translation::Plural(vec!["apple".to_string()])
        );
        let plural = Translation::Plural(vec!["apple".into(), "apples".into()]);
        assert_eq!(plural.conform_to(&singular), Translation::from("apple"));
    }

    #[test]
    fn test_translation_display() {
        assert_eq!(Translation::from("Hello").to_string(), "Hello");
        let plural = Translation::Plural(vec!["apple".into(), "apples".into()]);
        assert_eq!(plural.to_string(), "apple | apples");
    }

    #[test]
    fn test_plural_category_order() {
        let mut shuffled = vec![
            PluralCategory::Other,
            PluralCategory::One,
            PluralCategory::Few,
            PluralCategory::Zero,
        ];
        shuffled.sort();
        assert_eq!(
            shuffled,
            vec![
                PluralCategory::Zero,
                PluralCategory::One,
                PluralCategory::Few,
                PluralCategory::Other
            ]
        );
    }

    #[test]
    fn test_plural_category_from_str() {
        for category in PluralCategory::ALL {
            assert_eq!(PluralCategory::from_str(category.as_str()).unwrap(), category);
        }
        assert!(PluralCategory::from_str("ONE").is_err());
        assert!(PluralCategory::from_str("plenty").is_err());
    }

    #[test]
    fn test_note_origin_from_str() {
        assert_eq!(NoteOrigin::from_str("developer").unwrap(), NoteOrigin::Developer);
        assert_eq!(NoteOrigin::from_str("Translator").unwrap(), NoteOrigin::Translator);
        assert!(NoteOrigin::from_str("robot").is_err());
    }
}
