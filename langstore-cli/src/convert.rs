use std::{fs, path::Path};

use langstore::{
    ConvertOptions, DuplicateStyle, Error, FormatRegistry, FormatType, PoFile, StoreOptions,
    TranslationStore, convert_store, merge_native, merge_po, merge_store,
};

use crate::formats::resolve_format;

/// What a command produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Written { path: String, units: usize },
    /// The conversion produced no units; nothing was written.
    Empty,
}

pub struct ToPoRequest<'a> {
    pub input: &'a Path,
    pub template: Option<&'a Path>,
    pub output: &'a Path,
    pub format: Option<FormatType>,
    pub duplicates: DuplicateStyle,
    pub pot: bool,
    pub lang: Option<String>,
}

/// Native document (and optional template) to PO.
pub fn run_to_po(registry: &FormatRegistry, request: ToPoRequest<'_>) -> Result<Outcome, Error> {
    let format = resolve_format(request.input, request.format)?;
    let options = ConvertOptions::new()
        .with_duplicate_style(request.duplicates)
        .with_blank_msgstr(request.pot)
        .with_source_name(file_name(request.input))
        .with_language(request.lang);

    let input = read_store(registry, format, request.input, &options)?;
    let po = match request.template {
        Some(template) => {
            let template = read_store(registry, format, template, &options)?;
            merge_store(&template, &input, &options)
        }
        None => convert_store(&input, &options),
    };
    write_po(&po, request.output)
}

/// PO catalog merged into a native template.
pub fn run_from_po(
    registry: &FormatRegistry,
    input: &Path,
    template: Option<&Path>,
    output: &Path,
    format: Option<FormatType>,
    fuzzy: bool,
    lang: Option<String>,
) -> Result<Outcome, Error> {
    let template = template.ok_or(Error::MissingTemplate)?;
    let format = resolve_format(template, format)?;
    let options = ConvertOptions::new().with_fuzzy(fuzzy).with_language(lang);

    let template = read_store(registry, format, template, &options)?;
    let po = PoFile::parse(&fs::read_to_string(input)?)?;
    let store = merge_po(&template, &po, &options)?;
    write_store(&store, output)
}

/// Translated native document merged into a native template of the same format.
pub fn run_merge(
    registry: &FormatRegistry,
    template: Option<&Path>,
    input: &Path,
    output: &Path,
    format: Option<FormatType>,
    lang: Option<String>,
) -> Result<Outcome, Error> {
    let template = template.ok_or(Error::MissingTemplate)?;
    let format = resolve_format(template, format)?;
    let options = ConvertOptions::new().with_language(lang);

    let template = read_store(registry, format, template, &options)?;
    let translated = read_store(registry, format, input, &options)?;
    let store = merge_native(&template, &translated)?;
    write_store(&store, output)
}

pub fn read_store(
    registry: &FormatRegistry,
    format: FormatType,
    path: &Path,
    options: &ConvertOptions,
) -> Result<TranslationStore, Error> {
    tracing::debug!(path = %path.display(), %format, "reading document");
    let handler = *registry.get(format)?;
    let options: StoreOptions = options.store_options();
    TranslationStore::read_from(handler, path, options)
}

fn write_po(po: &PoFile, output: &Path) -> Result<Outcome, Error> {
    if po.is_empty() {
        return Ok(Outcome::Empty);
    }
    fs::write(output, po.serialize())?;
    Ok(Outcome::Written {
        path: output.display().to_string(),
        units: po.len(),
    })
}

fn write_store(store: &TranslationStore, output: &Path) -> Result<Outcome, Error> {
    if store.is_empty() {
        return Ok(Outcome::Empty);
    }
    store.write_to(output)?;
    Ok(Outcome::Written {
        path: output.display().to_string(),
        units: store.len(),
    })
}

fn file_name(path: &Path) -> Option<String> {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
}
