use langstore::{
    FormatRegistry, FormatType, StoreOptions, Translation, TranslationStore, UnitId,
    infer_format_from_extension,
};
use std::fs;
use tempfile::tempdir;

#[test]
fn read_edit_write_preserves_layout() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("active.fr.toml");
    fs::write(&path, "# Title\ntitle = \"Hello\"   # inline\n\n[menu]\nopen = \"Open\"\n").unwrap();

    let format = infer_format_from_extension(&path).unwrap();
    assert_eq!(format, FormatType::Toml);

    let registry = FormatRegistry::with_defaults();
    let handler = *registry.get(format).unwrap();
    let mut store = TranslationStore::read_from(handler, &path, StoreOptions::new()).unwrap();
    store
        .set_target(&UnitId::key("title"), Translation::from("Bonjour"))
        .unwrap();

    let out = dir.path().join("out.toml");
    store.write_to(&out).unwrap();
    assert_eq!(
        fs::read_to_string(&out).unwrap(),
        "# Title\ntitle = \"Bonjour\"   # inline\n\n[menu]\nopen = \"Open\"\n"
    );
}

#[test]
fn read_strips_utf8_bom() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("app_en.arb");
    let mut bytes = vec![0xEF, 0xBB, 0xBF];
    bytes.extend_from_slice(b"{\n    \"title\": \"Hello\"\n}\n");
    fs::write(&path, bytes).unwrap();

    let registry = FormatRegistry::with_defaults();
    let handler = *registry.get(FormatType::Arb).unwrap();
    let store = TranslationStore::read_from(handler, &path, StoreOptions::new()).unwrap();
    assert_eq!(store.len(), 1);
    assert_eq!(store.serialize().unwrap(), "{\n    \"title\": \"Hello\"\n}\n");
}

#[test]
fn read_missing_file_is_io_error() {
    let dir = tempdir().unwrap();
    let registry = FormatRegistry::with_defaults();
    let handler = *registry.get(FormatType::Json).unwrap();
    let result = TranslationStore::read_from(handler, dir.path().join("nope.json"), StoreOptions::new());
    assert!(matches!(result, Err(langstore::Error::Io(_))));
}
