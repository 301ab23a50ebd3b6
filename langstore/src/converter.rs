//! Conversion between native stores and PO catalogs, and template merges.
//!
//! Every merge iterates the **template**: it decides which units exist and in
//! which order. The other side only contributes values, looked up by location
//! string. Entries the template lacks are dropped; template entries with no
//! counterpart come out untranslated.

use std::{collections::HashMap, fmt::Display, str::FromStr};

use crate::{
    error::Error,
    formats::{FormatRegistry, FormatType},
    options::ConvertOptions,
    po::{PoFile, PoHeader, PoUnit},
    store::TranslationStore,
    types::{NoteOrigin, Translation, TranslationUnit},
};

/// How PO entries with identical `msgctxt` and `msgid` are kept apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicateStyle {
    /// Give every duplicate a `msgctxt` made of its locations.
    #[default]
    Msgctxt,
    /// Fold duplicates into the first entry, collecting their locations.
    Merge,
}

impl Display for DuplicateStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DuplicateStyle::Msgctxt => write!(f, "msgctxt"),
            DuplicateStyle::Merge => write!(f, "merge"),
        }
    }
}

impl FromStr for DuplicateStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "msgctxt" => Ok(DuplicateStyle::Msgctxt),
            "merge" => Ok(DuplicateStyle::Merge),
            other => Err(format!(
                "Unknown duplicate style: {} (expected msgctxt or merge)",
                other
            )),
        }
    }
}

/// Turns a monolingual store into a PO catalog with empty translations.
///
/// Units whose source is empty are skipped. Comments become `#.` notes and
/// unit ids become `#:` locations.
///
/// # Example
/// ```rust
/// use langstore::{ConvertOptions, FormatRegistry, FormatType, StoreOptions, TranslationStore};
/// use langstore::converter::convert_store;
///
/// let registry = FormatRegistry::with_defaults();
/// let handler = *registry.get(FormatType::Toml)?;
/// let store = TranslationStore::from_str(handler, "title = \"Hello\"\n", StoreOptions::new())?;
/// let po = convert_store(&store, &ConvertOptions::new());
/// assert_eq!(po.units[0].msgid, "Hello");
/// assert_eq!(po.units[0].locations, vec!["title"]);
/// # Ok::<(), langstore::Error>(())
/// ```
pub fn convert_store(store: &TranslationStore, options: &ConvertOptions) -> PoFile {
    let mut po = PoFile::new(header_for(store, options));
    let units = store
        .units()
        .iter()
        .filter(|unit| !unit.source.is_empty())
        .map(po_unit_for)
        .collect();
    po.units = resolve_duplicates(units, options.duplicate_style);
    tracing::debug!(units = po.units.len(), "converted store to PO");
    po
}

/// Builds a PO catalog from a template store and a translated store of the
/// same format.
///
/// Template units come out in template order. A unit found in `input` takes
/// its translated value as `msgstr`, unless `blank_msgstr` asks for a POT.
pub fn merge_store(
    template: &TranslationStore,
    input: &TranslationStore,
    options: &ConvertOptions,
) -> PoFile {
    let mut po = PoFile::new(header_for(input, options));
    let mut translated = 0;
    let units = template
        .units()
        .iter()
        .filter(|unit| !unit.source.is_empty())
        .map(|unit| {
            let mut po_unit = po_unit_for(unit);
            let found = input.find_unit(&unit.id);
            tracing::trace!(unit = %unit.id, found = found.is_some(), "merging unit");
            if let Some(found) = found.filter(|_| !options.blank_msgstr) {
                po_unit.set_target(&found.target().clone().conform_to(&unit.source));
                translated += 1;
            }
            po_unit
        })
        .collect();
    po.units = resolve_duplicates(units, options.duplicate_style);
    tracing::debug!(units = po.units.len(), translated, "merged stores into PO");
    po
}

/// Fills a copy of `template` with the translations of a PO catalog.
///
/// Units are matched by `#:` location. Untranslated entries, and fuzzy ones
/// unless `include_fuzzy` is set, leave the template value in place.
pub fn merge_po(
    template: &TranslationStore,
    po: &PoFile,
    options: &ConvertOptions,
) -> Result<TranslationStore, Error> {
    let mut output = template.clone();
    let language = options
        .language
        .clone()
        .or_else(|| po.header.language().map(str::to_string));
    if language.is_some() {
        output.set_language(language);
    }

    let index = po.location_index();
    let mut applied = 0;
    for unit in template.units() {
        let location = unit.id.to_string();
        let Some(po_unit) = index.get(location.as_str()).map(|&i| &po.units[i]) else {
            tracing::trace!(unit = %location, "no PO entry");
            continue;
        };
        if !po_unit.is_translated() || (po_unit.is_fuzzy() && !options.include_fuzzy) {
            continue;
        }
        let value = po_unit.target().conform_to(&unit.source);
        if apply(&mut output, unit, value)? {
            applied += 1;
        }
    }
    tracing::debug!(units = output.len(), applied, "merged PO into template");
    Ok(output)
}

/// Merges two documents of the same format: the template keeps its structure,
/// the translated document contributes non-empty values.
pub fn merge_native(
    template: &TranslationStore,
    translated: &TranslationStore,
) -> Result<TranslationStore, Error> {
    let mut output = template.clone();
    let mut applied = 0;
    for unit in template.units() {
        let Some(found) = translated.find_unit(&unit.id) else {
            continue;
        };
        if found.target().is_empty() {
            continue;
        }
        let value = found.target().clone().conform_to(&unit.source);
        if apply(&mut output, unit, value)? {
            applied += 1;
        }
    }
    tracing::debug!(units = output.len(), applied, "merged native documents");
    Ok(output)
}

/// Reads native text and produces a PO catalog, merging against a template
/// when one is given.
pub fn native_to_po(
    registry: &FormatRegistry,
    format: FormatType,
    input: &str,
    template: Option<&str>,
    options: &ConvertOptions,
) -> Result<PoFile, Error> {
    let handler = *registry.get(format)?;
    let store_options = options.store_options();
    match template {
        Some(template) => {
            let template = TranslationStore::from_str(handler, template, store_options.clone())?;
            let input = TranslationStore::from_str(handler, input, store_options)?;
            Ok(merge_store(&template, &input, options))
        }
        None => {
            let input = TranslationStore::from_str(handler, input, store_options)?;
            Ok(convert_store(&input, options))
        }
    }
}

/// Renders a PO catalog back into the native format of `template`.
///
/// Fails with [`Error::MissingTemplate`] before reading the catalog when no
/// template is given.
///
/// # Example
/// ```rust
/// use langstore::{ConvertOptions, Error, FormatRegistry, FormatType};
/// use langstore::converter::po_to_native;
///
/// let registry = FormatRegistry::with_defaults();
/// let options = ConvertOptions::new();
/// let err = po_to_native(&registry, FormatType::Toml, None, "not a PO file", &options).unwrap_err();
/// assert!(matches!(err, Error::MissingTemplate));
///
/// let po = "#: title\nmsgid \"Hello\"\nmsgstr \"Bonjour\"\n";
/// let store = po_to_native(&registry, FormatType::Toml, Some("title = \"Hello\"\n"), po, &options)?;
/// assert_eq!(store.serialize()?, "title = \"Bonjour\"\n");
/// # Ok::<(), langstore::Error>(())
/// ```
pub fn po_to_native(
    registry: &FormatRegistry,
    format: FormatType,
    template: Option<&str>,
    po: &str,
    options: &ConvertOptions,
) -> Result<TranslationStore, Error> {
    let template = template.ok_or(Error::MissingTemplate)?;
    let handler = *registry.get(format)?;
    let template = TranslationStore::from_str(handler, template, options.store_options())?;
    let po = PoFile::parse(po)?;
    merge_po(&template, &po, options)
}

/// Text form of [`merge_native`].
pub fn merge_native_text(
    registry: &FormatRegistry,
    format: FormatType,
    template: Option<&str>,
    translated: &str,
    options: &ConvertOptions,
) -> Result<TranslationStore, Error> {
    let template = template.ok_or(Error::MissingTemplate)?;
    let handler = *registry.get(format)?;
    let template = TranslationStore::from_str(handler, template, options.store_options())?;
    let translated = TranslationStore::from_str(handler, translated, options.store_options())?;
    merge_native(&template, &translated)
}

/// Writes a value into the output store. A value the document cannot hold
/// keeps the template value and is reported, not propagated.
fn apply(output: &mut TranslationStore, unit: &TranslationUnit, value: Translation) -> Result<bool, Error> {
    match output.set_target(&unit.id, value) {
        Ok(()) => Ok(true),
        Err(err @ Error::Structure { .. }) => {
            tracing::warn!(unit = %unit.id, error = %err, "keeping template value");
            Ok(false)
        }
        Err(err) => Err(err),
    }
}

fn header_for(store: &TranslationStore, options: &ConvertOptions) -> PoHeader {
    let language = options.language.clone().or_else(|| store.language());
    PoHeader::new(options.source_name.as_deref(), language.as_deref())
}

fn po_unit_for(unit: &TranslationUnit) -> PoUnit {
    let mut po_unit = PoUnit::new(&unit.source);
    if let Some(note) = unit.note(NoteOrigin::Developer) {
        po_unit.developer_comments.push(note.to_string());
    }
    if let Some(note) = unit.note(NoteOrigin::Translator) {
        po_unit.translator_comments.extend(note.lines().map(str::to_string));
    }
    for location in unit.locations() {
        po_unit.add_location(location);
    }
    po_unit
}

fn resolve_duplicates(units: Vec<PoUnit>, style: DuplicateStyle) -> Vec<PoUnit> {
    let key = |unit: &PoUnit| (unit.msgctxt.clone(), unit.msgid.clone());

    match style {
        DuplicateStyle::Msgctxt => {
            let mut counts: HashMap<(Option<String>, String), usize> = HashMap::new();
            for unit in &units {
                *counts.entry(key(unit)).or_default() += 1;
            }
            units
                .into_iter()
                .map(|mut unit| {
                    if counts.get(&key(&unit)).copied().unwrap_or_default() > 1 {
                        unit.msgctxt = Some(unit.locations.join(" "));
                    }
                    unit
                })
                .collect()
        }
        DuplicateStyle::Merge => {
            let mut first_seen: HashMap<(Option<String>, String), usize> = HashMap::new();
            let mut out: Vec<PoUnit> = Vec::with_capacity(units.len());
            for unit in units {
                match first_seen.get(&key(&unit)) {
                    Some(&position) => {
                        tracing::debug!(msgid = %unit.msgid, "merging duplicate entry");
                        let first = &mut out[position];
                        for location in unit.locations {
                            first.add_location(location);
                        }
                        for comment in unit.developer_comments {
                            if !first.developer_comments.contains(&comment) {
                                first.developer_comments.push(comment);
                            }
                        }
                    }
                    None => {
                        first_seen.insert(key(&unit), out.len());
                        out.push(unit);
                    }
                }
            }
            out
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{options::StoreOptions, unit_id::UnitId};

    fn store(format: FormatType, raw: &str) -> TranslationStore {
        let registry = FormatRegistry::with_defaults();
        let handler = *registry.get(format).unwrap();
        TranslationStore::from_str(handler, raw, StoreOptions::new()).unwrap()
    }

    #[test]
    fn test_duplicate_style_from_str() {
        assert_eq!("merge".parse::<DuplicateStyle>().unwrap(), DuplicateStyle::Merge);
        assert_eq!(" MSGCTXT ".parse::<DuplicateStyle>().unwrap(), DuplicateStyle::Msgctxt);
        assert!("drop".parse::<DuplicateStyle>().is_err());
    }

    #[test]
    fn test_convert_store_notes_and_plurals() {
        let source = store(
            FormatType::Toml,
            "# Shown on the home page\ntitle = \"Welcome\"\n\n[apples]\none = \"One apple\"\nother = \"{{.Count}} apples\"\n",
        );
        let po = convert_store(&source, &ConvertOptions::new().with_source_name(Some("en.toml".into())));
        assert_eq!(po.header.developer_comments, vec!["extracted from en.toml"]);
        assert_eq!(po.units.len(), 2);
        assert_eq!(po.units[0].developer_comments, vec!["Shown on the home page"]);
        assert_eq!(po.units[1].msgid, "One apple");
        assert_eq!(po.units[1].msgid_plural.as_deref(), Some("{{.Count}} apples"));
        assert_eq!(po.units[1].msgstr, vec![String::new(), String::new()]);
    }

    #[test]
    fn test_convert_store_skips_empty_sources() {
        let source = store(FormatType::Toml, "empty = \"\"\nfull = \"x\"\n");
        let po = convert_store(&source, &ConvertOptions::new());
        assert_eq!(po.units.len(), 1);
        assert_eq!(po.units[0].locations, vec!["full"]);
    }

    #[test]
    fn test_duplicates_msgctxt() {
        let source = store(FormatType::Toml, "a = \"Same\"\nb = \"Same\"\nc = \"Other\"\n");
        let po = convert_store(&source, &ConvertOptions::new());
        assert_eq!(po.units[0].msgctxt.as_deref(), Some("a"));
        assert_eq!(po.units[1].msgctxt.as_deref(), Some("b"));
        assert_eq!(po.units[2].msgctxt, None);
    }

    #[test]
    fn test_duplicates_merge() {
        let source = store(FormatType::Toml, "a = \"Same\"\nb = \"Same\"\n");
        let options = ConvertOptions::new().with_duplicate_style(DuplicateStyle::Merge);
        let po = convert_store(&source, &options);
        assert_eq!(po.units.len(), 1);
        assert_eq!(po.units[0].locations, vec!["a", "b"]);
    }

    #[test]
    fn test_merge_store_template_order_and_blank() {
        let template = store(FormatType::Toml, "title = \"Title\"\ngreeting = \"Hello\"\nfarewell = \"Bye\"\n");
        let input = store(FormatType::Toml, "greeting = \"Bonjour\"\ntitle = \"Titre\"\nextra = \"x\"\n");

        let po = merge_store(&template, &input, &ConvertOptions::new());
        let msgstrs: Vec<&str> = po.units.iter().map(|u| u.msgstr[0].as_str()).collect();
        assert_eq!(msgstrs, vec!["Titre", "Bonjour", ""]);

        let pot = merge_store(&template, &input, &ConvertOptions::new().with_blank_msgstr(true));
        assert!(pot.units.iter().all(|u| !u.is_translated()));
    }

    #[test]
    fn test_merge_po_fuzzy_and_missing() {
        let template = store(FormatType::Toml, "title = \"Title\"\ngreeting = \"Hello\"\nfarewell = \"Bye\"\n");
        let po = PoFile::parse(
            "#: title\nmsgid \"Title\"\nmsgstr \"Titre\"\n\n#: greeting\n#, fuzzy\nmsgid \"Hello\"\nmsgstr \"Salut\"\n",
        )
        .unwrap();

        let out = merge_po(&template, &po, &ConvertOptions::new()).unwrap();
        assert_eq!(
            out.serialize().unwrap(),
            "title = \"Titre\"\ngreeting = \"Hello\"\nfarewell = \"Bye\"\n"
        );

        let out = merge_po(&template, &po, &ConvertOptions::new().with_fuzzy(true)).unwrap();
        assert_eq!(
            out.find_unit(&UnitId::key("greeting")).unwrap().target(),
            &Translation::from("Salut")
        );
    }

    #[test]
    fn test_merge_po_plural_uses_header_language() {
        let template = store(FormatType::Toml, "[cats]\none = \"cat\"\nother = \"cats\"\n");
        let po = PoFile::parse(concat!(
            "msgid \"\"\nmsgstr \"\"\n\"Language: ru\\n\"\n\n",
            "#: cats\nmsgid \"cat\"\nmsgid_plural \"cats\"\n",
            "msgstr[0] \"кошка\"\nmsgstr[1] \"кошки\"\nmsgstr[2] \"кошек\"\nmsgstr[3] \"кошки\"\n",
        ))
        .unwrap();
        let out = merge_po(&template, &po, &ConvertOptions::new()).unwrap();
        let cats = out.find_unit(&UnitId::key("cats")).unwrap();
        assert_eq!(cats.target().arity(), 4);
        out.check_consistency().unwrap();
    }

    #[test]
    fn test_keys_with_spaces_survive_po_round_trip() {
        let template = store(
            FormatType::Json,
            "{\n    \"Welcome to the app\": \"Welcome to the app\",\n    \"bye\": \"Bye\"\n}\n",
        );
        let mut po = convert_store(&template, &ConvertOptions::new());
        assert_eq!(po.units[0].locations, vec!["Welcome to the app"]);
        po.units[0].set_target(&Translation::from("Bienvenue"));

        let po = PoFile::parse(&po.serialize()).unwrap();
        let out = merge_po(&template, &po, &ConvertOptions::new()).unwrap();
        assert_eq!(
            out.serialize().unwrap(),
            "{\n    \"Welcome to the app\": \"Bienvenue\",\n    \"bye\": \"Bye\"\n}\n"
        );
    }

    #[test]
    fn test_merge_po_single_category_locale() {
        let template = store(FormatType::Toml, "[cats]\none = \"cat\"\nother = \"cats\"\n");
        let po = PoFile::parse(concat!(
            "msgid \"\"\nmsgstr \"\"\n\"Language: ja\\n\"\n\n",
            "#: cats\nmsgid \"cat\"\nmsgid_plural \"cats\"\nmsgstr[0] \"猫\"\n",
        ))
        .unwrap();
        let out = merge_po(&template, &po, &ConvertOptions::new()).unwrap();
        assert_eq!(out.serialize().unwrap(), "[cats]\nother = \"猫\"\n");
        assert_eq!(
            out.find_unit(&UnitId::key("cats")).unwrap().target(),
            &Translation::Plural(vec!["猫".to_string()])
        );
        out.check_consistency().unwrap();
    }

    #[test]
    fn test_merge_native_keeps_template_structure() {
        let template = store(FormatType::Toml, "# Title\ntitle = \"Title\"\n\n[menu]\nopen = \"Open\"\n");
        let translated = store(FormatType::Toml, "[menu]\nopen = \"Ouvrir\"\n\ntitle = \"\"\n");
        let out = merge_native(&template, &translated).unwrap();
        assert_eq!(
            out.serialize().unwrap(),
            "# Title\ntitle = \"Title\"\n\n[menu]\nopen = \"Ouvrir\"\n"
        );
    }

    #[test]
    fn test_missing_template_is_raised_first() {
        let registry = FormatRegistry::with_defaults();
        let options = ConvertOptions::new();
        assert!(matches!(
            merge_native_text(&registry, FormatType::Toml, None, "= broken", &options),
            Err(Error::MissingTemplate)
        ));
        assert!(matches!(
            po_to_native(&registry, FormatType::Fluent, None, "msgid", &options),
            Err(Error::MissingTemplate)
        ));
    }
}
