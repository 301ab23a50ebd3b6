//! The format-agnostic translation store.
//!
//! A [`TranslationStore`] pairs a native document (the backing tree, which owns
//! every byte of formatting) with the ordered list of units flattened out of
//! it. Every mutation goes through the store so that the two never disagree:
//! each unit has exactly one leaf in the document, and each translatable leaf
//! has exactly one unit.

use std::{
    collections::HashMap,
    fs::File,
    io::{BufWriter, Read, Write},
    path::Path,
};

use crate::{
    error::Error,
    flatten::flatten,
    formats::{FormatHandler, FormatType},
    options::StoreOptions,
    plural_rules,
    traits::Backing,
    types::{NoteOrigin, PluralCategory, Translation, TranslationUnit},
    unit_id::UnitId,
};

/// An ordered, indexed collection of units backed by a native document.
#[derive(Debug, Clone)]
pub struct TranslationStore {
    handler: FormatHandler,
    backing: Box<dyn Backing>,
    units: Vec<TranslationUnit>,
    /// Location string to position in `units`.
    index: HashMap<String, usize>,
    options: StoreOptions,
}

impl TranslationStore {
    /// Creates an empty store for the handler's format.
    pub fn new(handler: FormatHandler, options: StoreOptions) -> Self {
        Self {
            backing: (handler.empty)(),
            handler,
            units: Vec::new(),
            index: HashMap::new(),
            options,
        }
    }

    /// Creates a store and fills it from native text.
    pub fn from_str(
        handler: FormatHandler,
        raw: &str,
        options: StoreOptions,
    ) -> Result<Self, Error> {
        let mut store = Self::new(handler, options);
        store.parse(raw)?;
        Ok(store)
    }

    /// Reads a file, decoding UTF-16/UTF-8 byte order marks.
    pub fn read_from<P: AsRef<Path>>(
        handler: FormatHandler,
        path: P,
        options: StoreOptions,
    ) -> Result<Self, Error> {
        let file = File::open(path).map_err(Error::Io)?;
        let mut decoder = encoding_rs_io::DecodeReaderBytesBuilder::new()
            .bom_override(true)
            .strip_bom(true)
            .build(file);

        let mut decoded = String::new();
        decoder.read_to_string(&mut decoded).map_err(Error::Io)?;

        Self::from_str(handler, &decoded, options)
    }

    /// Writes the serialized document to `path`.
    pub fn write_to<P: AsRef<Path>>(&self, path: P) -> Result<(), Error> {
        let content = self.serialize()?;
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        writer.write_all(content.as_bytes()).map_err(Error::Io)?;
        writer.flush().map_err(Error::Io)
    }

    /// Replaces the store's content with the document parsed from `raw`.
    ///
    /// Either the whole document is loaded or, on error, the store is left
    /// unchanged. Booleans and numbers are rewritten as strings in the
    /// document, so `flag = true` serializes as `flag = "True"`.
    pub fn parse(&mut self, raw: &str) -> Result<(), Error> {
        let mut backing = (self.handler.parse)(raw)?;
        let tree = backing.tree()?;

        let mut units = Vec::new();
        let mut coerced = Vec::new();
        for entry in flatten(&tree, backing.flatten_options()) {
            let entry = entry?;
            if entry.coerced {
                coerced.push((entry.id.clone(), entry.value.clone()));
            }
            let mut unit = TranslationUnit::new(entry.id, entry.value);
            if let Some(comment) = entry.comment {
                unit.add_note(NoteOrigin::Developer, comment);
            }
            units.push(unit);
        }
        let index = build_index(&units)?;

        let tags = tags_for(&self.options, backing.as_ref());
        for (id, value) in &coerced {
            backing.place(id, value, &tags)?;
        }

        tracing::debug!(
            format = %self.handler.format,
            units = units.len(),
            normalized = coerced.len(),
            "parsed document"
        );
        self.backing = backing;
        self.units = units;
        self.index = index;
        Ok(())
    }

    /// Renders the backing document.
    pub fn serialize(&self) -> Result<String, Error> {
        self.backing.serialize()
    }

    /// Appends `unit`. When `new` is set its target is also written into the
    /// document, creating missing tables along its path; otherwise the caller
    /// vouches that the document already holds it.
    pub fn add_unit(&mut self, mut unit: TranslationUnit, new: bool) -> Result<(), Error> {
        let key = unit.id.to_string();
        if self.index.contains_key(&key) {
            return Err(Error::DuplicateUnit(key));
        }
        if new {
            let tags = self.plural_tags();
            let value = self.fit(&unit.id, unit.target().clone(), &tags)?;
            let mut backing = self.backing.clone();
            backing.place(&unit.id, &value, &tags)?;
            if value.is_plural() {
                unit.source = value.clone();
            }
            unit.set_target(value)?;
            self.backing = backing;
        }
        tracing::trace!(unit = %key, new, "added unit");
        self.index.insert(key, self.units.len());
        self.units.push(unit);
        Ok(())
    }

    /// Removes the unit at `id` together with its leaf and any container left
    /// empty. Later units of the same array are renumbered.
    pub fn remove_unit(&mut self, id: &UnitId) -> Result<TranslationUnit, Error> {
        let position = self.position(id)?;
        let mut backing = self.backing.clone();
        let shift = backing.remove(id)?;
        self.backing = backing;

        let removed = self.units.remove(position);
        if let Some(shift) = shift {
            for unit in &mut self.units {
                unit.id.shift_after_removal(&shift.array, shift.removed);
            }
        }
        self.index = build_index(&self.units)?;
        tracing::trace!(unit = %removed.id, "removed unit");
        Ok(removed)
    }

    /// Replaces the target of the unit at `id` and rewrites its leaf.
    ///
    /// Plural values longer than the locale's category list are truncated.
    pub fn set_target(&mut self, id: &UnitId, value: Translation) -> Result<(), Error> {
        let position = self.position(id)?;
        let tags = self.plural_tags();
        let value = self.fit(id, value, &tags)?;

        let mut unit = self.units[position].clone();
        unit.set_target(value.clone())?;
        if unit.target() == self.units[position].target() {
            return Ok(());
        }
        self.backing.place(id, &value, &tags)?;
        self.units[position] = unit;
        Ok(())
    }

    /// Looks a unit up by id.
    pub fn find_unit(&self, id: &UnitId) -> Option<&TranslationUnit> {
        self.find_by_location(&id.to_string())
    }

    /// Looks a unit up by its location string (`menu.open`, `names->[2]`).
    pub fn find_by_location(&self, location: &str) -> Option<&TranslationUnit> {
        self.index.get(location).map(|&i| &self.units[i])
    }

    /// The unit at a position in document order.
    pub fn unit_at(&self, position: usize) -> Option<&TranslationUnit> {
        self.units.get(position)
    }

    pub fn units(&self) -> &[TranslationUnit] {
        &self.units
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn format(&self) -> FormatType {
        self.handler.format
    }

    pub fn handler(&self) -> FormatHandler {
        self.handler
    }

    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    /// The store locale: the configured one, else the one the document declares.
    pub fn language(&self) -> Option<String> {
        self.options
            .language
            .clone()
            .or_else(|| self.backing.language())
    }

    pub fn set_language(&mut self, language: Option<String>) {
        self.options.language = language;
    }

    /// CLDR categories used when plural values are written.
    pub fn plural_tags(&self) -> Vec<PluralCategory> {
        tags_for(&self.options, self.backing.as_ref())
    }

    /// Re-flattens the document and checks it against the unit list.
    pub fn check_consistency(&self) -> Result<(), Error> {
        let tree = self.backing.tree()?;
        let mut count = 0;
        for entry in flatten(&tree, self.backing.flatten_options()) {
            let entry = entry?;
            let unit = self.units.get(count).ok_or_else(|| {
                Error::structure(&entry.id, "document leaf has no unit")
            })?;
            count += 1;
            if let Some(form) = single_category_form(unit) {
                let (id, lone) = (unit.id.to_string(), entry.id.to_string());
                if (lone == id || lone == format!("{}.other", id))
                    && entry.value == Translation::Singular(form.to_string())
                {
                    continue;
                }
            }
            if unit.id.to_string() != entry.id.to_string() {
                return Err(Error::structure(
                    &entry.id,
                    format!("document order disagrees with unit `{}`", unit.id),
                ));
            }
            if unit.target() != &entry.value {
                return Err(Error::structure(&entry.id, "unit target differs from the document"));
            }
        }
        match self.units.get(count) {
            Some(orphan) => Err(Error::structure(&orphan.id, "unit has no document leaf")),
            None => Ok(()),
        }
    }

    fn position(&self, id: &UnitId) -> Result<usize, Error> {
        self.index
            .get(&id.to_string())
            .copied()
            .ok_or_else(|| Error::UnitNotFound(id.to_string()))
    }

    /// Shapes `value` the way the document will store it.
    fn fit(
        &self,
        id: &UnitId,
        value: Translation,
        tags: &[PluralCategory],
    ) -> Result<Translation, Error> {
        let Translation::Plural(mut forms) = value else {
            return Ok(value);
        };
        if !self.backing.flatten_options().plurals {
            return Err(Error::structure(
                id,
                format!("{} documents have no plural groups", self.handler.format),
            ));
        }
        if forms.len() > tags.len() {
            tracing::warn!(
                unit = %id,
                variants = forms.len(),
                tags = tags.len(),
                "dropping plural variants without a matching tag"
            );
            forms.truncate(tags.len());
        }
        let needed = tags.len().min(2);
        if forms.len() < needed {
            return Err(Error::structure(
                id,
                format!("a plural group needs at least {} categories", needed),
            ));
        }
        Ok(Translation::Plural(forms))
    }
}

/// The variant of a plural unit written for a locale with a single category.
///
/// Such a group holds only `other`, which reads back as an ordinary leaf, so
/// the unit keeps its plural shape by id rather than by re-detection.
fn single_category_form(unit: &TranslationUnit) -> Option<&str> {
    match unit.target() {
        Translation::Plural(forms) if forms.len() == 1 => Some(forms[0].as_str()),
        _ => None,
    }
}

fn tags_for(options: &StoreOptions, backing: &dyn Backing) -> Vec<PluralCategory> {
    let language = options.language.clone().or_else(|| backing.language());
    plural_rules::plural_tags(language.as_deref())
}

fn build_index(units: &[TranslationUnit]) -> Result<HashMap<String, usize>, Error> {
    let mut index = HashMap::with_capacity(units.len());
    for (position, unit) in units.iter().enumerate() {
        let key = unit.id.to_string();
        if index.insert(key.clone(), position).is_some() {
            return Err(Error::DuplicateUnit(key));
        }
    }
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::FormatRegistry;

    fn toml_store(raw: &str) -> TranslationStore {
        let registry = FormatRegistry::with_defaults();
        let handler = *registry.get(FormatType::Toml).unwrap();
        TranslationStore::from_str(handler, raw, StoreOptions::new()).unwrap()
    }

    #[test]
    fn test_parse_builds_units_and_notes() {
        let store = toml_store("# The title\ntitle = \"Hello\"\n\n[menu]\nopen = \"Open\"\n");
        assert_eq!(store.len(), 2);
        let title = store.find_by_location("title").unwrap();
        assert_eq!(title.note(NoteOrigin::Developer), Some("The title"));
        assert_eq!(store.unit_at(1).unwrap().id.to_string(), "menu.open");
        store.check_consistency().unwrap();
    }

    #[test]
    fn test_parse_failure_leaves_store_untouched() {
        let mut store = toml_store("a = \"x\"\n");
        assert!(store.parse("a = \n").is_err());
        assert_eq!(store.len(), 1);
        assert_eq!(store.serialize().unwrap(), "a = \"x\"\n");
    }

    #[test]
    fn test_coerced_values_become_strings() {
        let store = toml_store("flag = true\ncount = 1\n");
        assert_eq!(store.serialize().unwrap(), "flag = \"True\"\ncount = \"1\"\n");
        store.check_consistency().unwrap();
    }

    #[test]
    fn test_add_unit_creates_tables() {
        let mut store = toml_store("title = \"Hello\"\n");
        let id = UnitId::key("menu").with_key("open");
        store.add_unit(TranslationUnit::new(id.clone(), "Open"), true).unwrap();
        assert_eq!(store.find_unit(&id).unwrap().target(), &Translation::from("Open"));
        store.check_consistency().unwrap();
        assert!(matches!(
            store.add_unit(TranslationUnit::new(id, "Again"), true),
            Err(Error::DuplicateUnit(_))
        ));
    }

    #[test]
    fn test_add_unit_failure_is_atomic() {
        let mut store = toml_store("title = \"Hello\"\n");
        let id = UnitId::key("menu").with_key("names").with_index(0);
        assert!(store.add_unit(TranslationUnit::new(id, "x"), true).is_err());
        assert_eq!(store.serialize().unwrap(), "title = \"Hello\"\n");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_remove_unit_renumbers_array() {
        let mut store = toml_store("names = [\"a\", \"b\", \"c\"]\n");
        store.remove_unit(&"names->[0]".parse().unwrap()).unwrap();
        let ids: Vec<String> = store.units().iter().map(|u| u.id.to_string()).collect();
        assert_eq!(ids, vec!["names->[0]", "names->[1]"]);
        assert_eq!(
            store.find_by_location("names->[1]").unwrap().target(),
            &Translation::from("c")
        );
        store.check_consistency().unwrap();
    }

    #[test]
    fn test_set_target_plural_truncates() {
        let mut store = toml_store("[apples]\none = \"apple\"\nother = \"apples\"\n");
        let id = UnitId::key("apples");
        let value = Translation::Plural(vec!["a".into(), "b".into(), "c".into()]);
        store.set_target(&id, value).unwrap();
        assert_eq!(
            store.find_unit(&id).unwrap().target(),
            &Translation::Plural(vec!["a".to_string(), "b".to_string()])
        );
        store.check_consistency().unwrap();
    }

    #[test]
    fn test_set_target_single_category_locale() {
        let mut store = toml_store("[cats]\none = \"cat\"\nother = \"cats\"\n");
        let id = UnitId::key("cats");
        let one_form = Translation::Plural(vec!["猫".into()]);
        assert!(matches!(
            store.set_target(&id, one_form.clone()),
            Err(Error::Structure { .. })
        ));

        store.set_language(Some("ja".to_string()));
        store.set_target(&id, one_form.clone()).unwrap();
        assert_eq!(store.serialize().unwrap(), "[cats]\nother = \"猫\"\n");
        assert_eq!(store.find_unit(&id).unwrap().target(), &one_form);
        store.check_consistency().unwrap();
    }

    #[test]
    fn test_set_target_rejects_shape_change() {
        let mut store = toml_store("title = \"Hello\"\n");
        let value = Translation::Plural(vec!["a".into(), "b".into()]);
        assert!(store.set_target(&UnitId::key("title"), value).is_err());
        assert_eq!(store.serialize().unwrap(), "title = \"Hello\"\n");
    }

    #[test]
    fn test_language_and_tags() {
        let mut store = toml_store("a = \"x\"\n");
        assert_eq!(store.plural_tags().len(), 2);
        store.set_language(Some("ru".to_string()));
        assert_eq!(store.language().as_deref(), Some("ru"));
        assert_eq!(store.plural_tags().len(), 4);
    }
}
