//! Support for TOML localization files (go-i18n and friends).
//!
//! The document is kept as a [`toml_edit::DocumentMut`], so comments, blank
//! lines, quoting style and key order survive every edit that does not touch
//! them. Maps keyed by CLDR categories are plural groups. Booleans and numbers
//! become strings: `flag = true` is written back as `flag = "True"`.

use toml_edit::{Array, ArrayOfTables, DocumentMut, Item, Table, TableLike, Value};

use crate::{
    comment::comment_in_prefix,
    error::{Error, line_of},
    flatten::{FlattenOptions, IndexShift},
    formats::{FormatHandler, FormatType},
    node::{Member, Node, bool_text, float_text},
    plural_rules,
    traits::Backing,
    types::{PluralCategory, Translation},
    unit_id::{Segment, UnitId},
};

/// A TOML document backing a store.
#[derive(Debug, Clone, Default)]
pub struct Document {
    doc: DocumentMut,
}

pub fn handler() -> FormatHandler {
    FormatHandler {
        format: FormatType::Toml,
        parse: |raw| Ok(Box::new(Document::parse(raw)?)),
        empty: || Box::new(Document::default()),
    }
}

impl Document {
    pub fn parse(raw: &str) -> Result<Self, Error> {
        let doc = raw.parse::<DocumentMut>().map_err(|e| {
            let line = e.span().map(|span| line_of(raw, span.start));
            Error::parse("toml", e.message(), line)
        })?;
        Ok(Self { doc })
    }
}

impl Backing for Document {
    fn format(&self) -> FormatType {
        FormatType::Toml
    }

    fn tree(&self) -> Result<Node, Error> {
        Ok(table_node(self.doc.as_table()))
    }

    fn flatten_options(&self) -> FlattenOptions {
        FlattenOptions { plurals: true }
    }

    fn place(
        &mut self,
        id: &UnitId,
        value: &Translation,
        tags: &[PluralCategory],
    ) -> Result<(), Error> {
        let Some((last, parents)) = id.segments().split_last() else {
            return Err(Error::structure(id, "cannot replace the document root"));
        };
        let mut slot = Slot::Table(self.doc.as_table_mut());
        for (depth, segment) in parents.iter().enumerate() {
            let create = matches!(id.segments()[depth + 1], Segment::Key(_));
            slot = descend(slot, segment, create, id)?;
        }
        set_leaf(slot, last, value, tags, id)
    }

    fn remove(&mut self, id: &UnitId) -> Result<Option<IndexShift>, Error> {
        if id.is_empty() {
            return Err(Error::structure(id, "cannot remove the document root"));
        }
        let mut root = Slot::Table(self.doc.as_table_mut());
        remove_at(&mut root, id.segments(), UnitId::root(), id)
    }

    fn serialize(&self) -> Result<String, Error> {
        Ok(self.doc.to_string())
    }

    fn box_clone(&self) -> Box<dyn Backing> {
        Box::new(self.clone())
    }
}

fn table_node(table: &Table) -> Node {
    Node::Mapping(
        table
            .iter()
            .map(|(key, item)| {
                let comment = table.get_key_value(key).and_then(|(key, item)| {
                    let decor = match item {
                        Item::Table(sub) => sub.decor(),
                        _ => key.leaf_decor(),
                    };
                    decor.prefix().and_then(|p| p.as_str()).and_then(comment_in_prefix)
                });
                (key.to_string(), Member::with_comment(item_node(item), comment))
            })
            .collect(),
    )
}

fn item_node(item: &Item) -> Node {
    match item {
        Item::None => Node::Null,
        Item::Value(value) => value_node(value),
        Item::Table(table) => table_node(table),
        Item::ArrayOfTables(tables) => Node::Sequence(tables.iter().map(table_node).collect()),
    }
}

fn value_node(value: &Value) -> Node {
    match value {
        Value::String(s) => Node::text(s.value().clone()),
        Value::Integer(i) => Node::coerced(i.value().to_string(), i.value().to_string()),
        Value::Float(f) => Node::coerced(float_text(*f.value()), f.value().to_string()),
        Value::Boolean(b) => Node::coerced(bool_text(*b.value()), b.value().to_string()),
        Value::Datetime(_) => Node::Unsupported("datetime"),
        Value::Array(array) => Node::Sequence(array.iter().map(value_node).collect()),
        Value::InlineTable(table) => Node::Mapping(
            table
                .iter()
                .map(|(key, value)| (key.to_string(), Member::new(value_node(value))))
                .collect(),
        ),
    }
}

/// A mutable container inside the document.
enum Slot<'a> {
    Table(&'a mut dyn TableLike),
    Array(&'a mut Array),
    Tables(&'a mut ArrayOfTables),
}

impl Slot<'_> {
    fn is_empty(&self) -> bool {
        match self {
            Slot::Table(table) => table.is_empty(),
            Slot::Array(array) => array.is_empty(),
            Slot::Tables(tables) => tables.is_empty(),
        }
    }
}

fn item_slot(item: &mut Item) -> Option<Slot<'_>> {
    match item {
        Item::Table(table) => Some(Slot::Table(table)),
        Item::ArrayOfTables(tables) => Some(Slot::Tables(tables)),
        Item::Value(value) => value_slot(value),
        Item::None => None,
    }
}

fn value_slot(value: &mut Value) -> Option<Slot<'_>> {
    match value {
        Value::InlineTable(table) => Some(Slot::Table(table)),
        Value::Array(array) => Some(Slot::Array(array)),
        _ => None,
    }
}

fn descend<'a>(
    slot: Slot<'a>,
    segment: &Segment,
    create: bool,
    id: &UnitId,
) -> Result<Slot<'a>, Error> {
    match (slot, segment) {
        (Slot::Table(table), Segment::Key(key)) => {
            if !table.contains_key(key) {
                if !create {
                    return Err(Error::structure(id, "arrays must exist before indexing"));
                }
                let mut fresh = Table::new();
                fresh.set_implicit(true);
                table.insert(key, Item::Table(fresh));
            }
            let item = table
                .get_mut(key)
                .ok_or_else(|| Error::structure(id, "missing table entry"))?;
            item_slot(item)
                .ok_or_else(|| Error::structure(id, "a value is in the way of a nested key"))
        }
        (Slot::Array(array), Segment::Index(index)) => array
            .get_mut(*index)
            .and_then(value_slot)
            .ok_or_else(|| Error::structure(id, "no container at this array index")),
        (Slot::Tables(tables), Segment::Index(index)) => tables
            .get_mut(*index)
            .map(|table| Slot::Table(table))
            .ok_or_else(|| Error::structure(id, "array index out of range")),
        (Slot::Table(_), Segment::Index(_)) => {
            Err(Error::structure(id, "expected an array, found a table"))
        }
        (_, Segment::Key(_)) => Err(Error::structure(id, "expected a table, found an array")),
    }
}

fn set_leaf(
    slot: Slot<'_>,
    segment: &Segment,
    value: &Translation,
    tags: &[PluralCategory],
    id: &UnitId,
) -> Result<(), Error> {
    match (slot, segment) {
        (Slot::Table(table), Segment::Key(key)) => {
            match (table.get_mut(key), value) {
                (Some(Item::Value(existing)), Translation::Singular(text)) => {
                    replace_value(existing, text)
                }
                (Some(existing), Translation::Plural(forms)) if existing.is_table_like() => {
                    if let Some(group) = existing.as_table_like_mut() {
                        write_plural(group, forms, tags);
                    }
                }
                (Some(existing), _) => *existing = new_item(value, tags),
                (None, _) => {
                    table.insert(key, new_item(value, tags));
                }
            }
            Ok(())
        }
        (Slot::Array(array), Segment::Index(index)) => {
            let fresh = new_item(value, tags)
                .into_value()
                .map_err(|_| Error::structure(id, "cannot store a table in an array"))?;
            let len = array.len();
            match (array.get_mut(*index), value) {
                (Some(existing), Translation::Singular(text)) => replace_value(existing, text),
                (Some(existing), _) => *existing = fresh,
                (None, _) => {
                    return Err(Error::structure(
                        id,
                        format!("array index out of range (length {})", len),
                    ));
                }
            }
            Ok(())
        }
        (Slot::Tables(_), _) => Err(Error::structure(
            id,
            "cannot store a value in an array of tables",
        )),
        _ => Err(Error::structure(id, "path does not match the document shape")),
    }
}

fn new_item(value: &Translation, tags: &[PluralCategory]) -> Item {
    match value {
        Translation::Singular(text) => toml_edit::value(text.as_str()),
        Translation::Plural(forms) => {
            let mut group = Table::new();
            write_plural(&mut group, forms, tags);
            Item::Table(group)
        }
    }
}

/// Rewrites a plural group in place, keeping the formatting of surviving keys.
fn write_plural(group: &mut dyn TableLike, forms: &[String], tags: &[PluralCategory]) {
    let encoded = plural_rules::encode(forms, tags);
    let stale: Vec<String> = group
        .iter()
        .map(|(key, _)| key.to_string())
        .filter(|key| !encoded.iter().any(|(category, _)| category.as_str() == key))
        .collect();
    for key in stale {
        group.remove(&key);
    }
    for (category, text) in encoded {
        match group.get_mut(category.as_str()) {
            Some(Item::Value(existing)) => replace_value(existing, &text),
            _ => {
                group.insert(category.as_str(), toml_edit::value(text));
            }
        }
    }
}

/// Swaps a value for a string, keeping its surrounding whitespace and comments.
fn replace_value(existing: &mut Value, text: &str) {
    if existing.as_str() == Some(text) {
        return;
    }
    let decor = existing.decor().clone();
    *existing = Value::from(text);
    *existing.decor_mut() = decor;
}

fn remove_at(
    slot: &mut Slot<'_>,
    path: &[Segment],
    here: UnitId,
    full: &UnitId,
) -> Result<Option<IndexShift>, Error> {
    let Some((segment, rest)) = path.split_first() else {
        return Err(Error::UnitNotFound(full.to_string()));
    };

    if !rest.is_empty() {
        let child_id = match segment {
            Segment::Key(key) => here.with_key(key.clone()),
            Segment::Index(index) => here.with_index(*index),
        };
        let mut child =
            child_slot(slot, segment).ok_or_else(|| Error::UnitNotFound(full.to_string()))?;
        let shift = remove_at(&mut child, rest, child_id, full)?;
        if !child.is_empty() {
            return Ok(shift);
        }
    }

    match (slot, segment) {
        (Slot::Table(table), Segment::Key(key)) => {
            table
                .remove(key)
                .ok_or_else(|| Error::UnitNotFound(full.to_string()))?;
            Ok(None)
        }
        (Slot::Array(array), Segment::Index(index)) if *index < array.len() => {
            array.remove(*index);
            Ok(Some(IndexShift {
                array: here,
                removed: *index,
            }))
        }
        (Slot::Tables(tables), Segment::Index(index)) if *index < tables.len() => {
            tables.remove(*index);
            Ok(Some(IndexShift {
                array: here,
                removed: *index,
            }))
        }
        _ => Err(Error::UnitNotFound(full.to_string())),
    }
}

fn child_slot<'b>(slot: &'b mut Slot<'_>, segment: &Segment) -> Option<Slot<'b>> {
    match (slot, segment) {
        (Slot::Table(table), Segment::Key(key)) => table.get_mut(key).and_then(item_slot),
        (Slot::Array(array), Segment::Index(index)) => array.get_mut(*index).and_then(value_slot),
        (Slot::Tables(tables), Segment::Index(index)) => {
            tables.get_mut(*index).map(|table| Slot::Table(table))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flatten::flatten;

    fn entries(doc: &Document) -> Vec<(String, Translation, Option<String>)> {
        let tree = doc.tree().unwrap();
        flatten(&tree, doc.flatten_options())
            .map(|entry| {
                let entry = entry.unwrap();
                (entry.id.to_string(), entry.value, entry.comment)
            })
            .collect()
    }

    #[test]
    fn test_parse_and_serialize_unchanged() {
        let raw = "# Header\n\ntitle = \"Hello\"\n\n[menu]\nopen = 'Open'  # trailing\n";
        let doc = Document::parse(raw).unwrap();
        assert_eq!(doc.serialize().unwrap(), raw);
    }

    #[test]
    fn test_parse_error_has_line() {
        let err = Document::parse("a = \"ok\"\nb = \n").unwrap_err();
        match err {
            Error::Parse { format, line, .. } => {
                assert_eq!(format, "toml");
                assert_eq!(line, Some(2));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_tree_comments() {
        let raw = "# Greeting\nkey1 = \"value1\"\n# Detached\n\nkey2 = \"value2\"\n";
        let doc = Document::parse(raw).unwrap();
        let flat = entries(&doc);
        assert_eq!(flat[0].2.as_deref(), Some("Greeting"));
        assert_eq!(flat[1].2, None);
    }

    #[test]
    fn test_table_header_comment_attaches_to_plural() {
        let raw = "# Apples in the basket\n[apples]\none = \"One apple\"\nother = \"{{.Count}} apples\"\n";
        let doc = Document::parse(raw).unwrap();
        let flat = entries(&doc);
        assert_eq!(flat.len(), 1);
        assert_eq!(flat[0].0, "apples");
        assert_eq!(flat[0].2.as_deref(), Some("Apples in the basket"));
    }

    #[test]
    fn test_datetime_is_unsupported() {
        let doc = Document::parse("when = 1979-05-27T07:32:00Z\n").unwrap();
        let tree = doc.tree().unwrap();
        let err = flatten(&tree, doc.flatten_options()).next().unwrap().unwrap_err();
        assert!(matches!(err, Error::Structure { .. }));
    }

    #[test]
    fn test_place_keeps_decor() {
        let mut doc = Document::parse("# note\ngreeting = \"Hello\"   # inline\n").unwrap();
        doc.place(&UnitId::key("greeting"), &Translation::from("Bonjour"), &[])
            .unwrap();
        assert_eq!(doc.serialize().unwrap(), "# note\ngreeting = \"Bonjour\"   # inline\n");
    }

    #[test]
    fn test_place_creates_tables() {
        let mut doc = Document::parse("title = \"T\"\n").unwrap();
        let id = UnitId::key("menu").with_key("file").with_key("open");
        doc.place(&id, &Translation::from("Open"), &[]).unwrap();
        let flat = entries(&doc);
        assert_eq!(flat[1].0, "menu.file.open");
        assert!(doc.serialize().unwrap().contains("[menu.file]\nopen = \"Open\""));
    }

    #[test]
    fn test_place_into_inline_table_and_array() {
        let mut doc = Document::parse("point = { x = \"1\" }\nnames = [\"a\", \"b\"]\n").unwrap();
        doc.place(&UnitId::key("point").with_key("x"), &Translation::from("2"), &[])
            .unwrap();
        doc.place(&UnitId::key("names").with_index(1), &Translation::from("c"), &[])
            .unwrap();
        assert_eq!(
            doc.serialize().unwrap(),
            "point = { x = \"2\" }\nnames = [\"a\", \"c\"]\n"
        );
    }

    #[test]
    fn test_place_refuses_missing_array() {
        let mut doc = Document::default();
        let id = UnitId::key("names").with_index(0);
        assert!(matches!(
            doc.place(&id, &Translation::from("a"), &[]),
            Err(Error::Structure { .. })
        ));
    }

    #[test]
    fn test_place_never_grows_arrays() {
        let mut doc = Document::parse("names = [\"a\", \"b\"]\n").unwrap();
        let id = UnitId::key("names").with_index(2);
        assert!(matches!(
            doc.place(&id, &Translation::from("c"), &[]),
            Err(Error::Structure { .. })
        ));
        assert_eq!(doc.serialize().unwrap(), "names = [\"a\", \"b\"]\n");
    }

    #[test]
    fn test_place_array_where_table_expected() {
        let mut doc = Document::parse("names = [\"a\"]\n").unwrap();
        let id = UnitId::key("names").with_key("first");
        assert!(matches!(
            doc.place(&id, &Translation::from("a"), &[]),
            Err(Error::Structure { .. })
        ));
    }

    #[test]
    fn test_place_plural_rewrites_group() {
        let raw = "[apples]\none = \"One apple\"\nother = \"Many apples\"\n";
        let mut doc = Document::parse(raw).unwrap();
        let value = Translation::Plural(vec!["1".into(), "2".into(), "3".into(), "4".into()]);
        let tags = plural_rules::plural_tags(Some("ru"));
        doc.place(&UnitId::key("apples"), &value, &tags).unwrap();
        let flat = entries(&doc);
        assert_eq!(flat[0].1, value);
        assert!(doc.serialize().unwrap().contains("few = \"2\""));
    }

    #[test]
    fn test_remove_prunes_tables() {
        let raw = "[test.\"1\"]\na = \"x\"\nb = \"y\"\n\n[test.\"2\"]\nc = \"z\"\nd = \"w\"\n";
        let mut doc = Document::parse(raw).unwrap();
        doc.remove(&"test.1.a".parse().unwrap()).unwrap();
        doc.remove(&"test.1.b".parse().unwrap()).unwrap();
        let out = doc.serialize().unwrap();
        assert!(!out.contains("[test.\"1\"]"));
        assert!(out.contains("[test.\"2\"]\nc = \"z\"\nd = \"w\"\n"));
    }

    #[test]
    fn test_remove_array_element_shifts() {
        let mut doc = Document::parse("names = [\"a\", \"b\", \"c\"]\n").unwrap();
        let shift = doc.remove(&UnitId::key("names").with_index(0)).unwrap();
        assert_eq!(shift.map(|s| s.removed), Some(0));
        let flat = entries(&doc);
        assert_eq!(flat[0].0, "names->[0]");
        assert_eq!(flat[0].1, Translation::from("b"));
    }

    #[test]
    fn test_remove_missing() {
        let mut doc = Document::parse("a = \"x\"\n").unwrap();
        assert!(matches!(
            doc.remove(&UnitId::key("b")),
            Err(Error::UnitNotFound(_))
        ));
    }
}
