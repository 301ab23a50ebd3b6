//! Support for nested JSON catalogs and go-i18n v2 JSON.
//!
//! Plain JSON (i18next style) maps every string leaf to a unit; nulls are
//! skipped and numbers or booleans are read as text. The go-i18n flavor adds
//! message objects: `{ "description": "...", "one": "...", "other": "..." }` is
//! a single unit whose note is the description.
//!
//! Documents are written with four-space indentation, keys in document order
//! and a trailing newline.

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map, Value, ser::PrettyFormatter};

use crate::{
    error::Error,
    flatten::{self, FlattenOptions, IndexShift},
    formats::{FormatHandler, FormatType},
    node::{Member, Node, bool_text, float_text},
    plural_rules,
    traits::Backing,
    types::{PluralCategory, Translation},
    unit_id::UnitId,
};

/// Keys of a go-i18n message object that carry no translatable text.
const MESSAGE_METADATA: [&str; 5] = ["id", "description", "hash", "leftDelim", "rightDelim"];

/// The two JSON dialects sharing this adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Flavor {
    #[default]
    Plain,
    GoI18n,
}

#[derive(Debug, Clone)]
pub struct Document {
    root: Node,
    flavor: Flavor,
}

pub fn handler() -> FormatHandler {
    FormatHandler {
        format: FormatType::Json,
        parse: |raw| Ok(Box::new(Document::parse(raw, Flavor::Plain)?)),
        empty: || Box::new(Document::empty(Flavor::Plain)),
    }
}

pub fn go_i18n_handler() -> FormatHandler {
    FormatHandler {
        format: FormatType::GoI18nJson,
        parse: |raw| Ok(Box::new(Document::parse(raw, Flavor::GoI18n)?)),
        empty: || Box::new(Document::empty(Flavor::GoI18n)),
    }
}

impl Document {
    pub fn parse(raw: &str, flavor: Flavor) -> Result<Self, Error> {
        let value = parse_value(raw, "json")?;
        Ok(Self {
            root: value_to_node(&value),
            flavor,
        })
    }

    pub fn empty(flavor: Flavor) -> Self {
        Self {
            root: Node::mapping(),
            flavor,
        }
    }
}

impl Backing for Document {
    fn format(&self) -> FormatType {
        match self.flavor {
            Flavor::Plain => FormatType::Json,
            Flavor::GoI18n => FormatType::GoI18nJson,
        }
    }

    fn tree(&self) -> Result<Node, Error> {
        Ok(match self.flavor {
            Flavor::Plain => self.root.clone(),
            Flavor::GoI18n => message_view(&self.root),
        })
    }

    fn flatten_options(&self) -> FlattenOptions {
        FlattenOptions {
            plurals: self.flavor == Flavor::GoI18n,
        }
    }

    fn place(
        &mut self,
        id: &UnitId,
        value: &Translation,
        tags: &[PluralCategory],
    ) -> Result<(), Error> {
        if self.flavor == Flavor::Plain && value.is_plural() {
            return Err(Error::structure(id, "plain JSON has no plural groups"));
        }
        if self.flavor == Flavor::GoI18n {
            if let Some(Node::Mapping(message)) = flatten::node_at_mut(&mut self.root, id) {
                if is_message_object(message) {
                    write_message(message, value, tags);
                    return Ok(());
                }
            }
        }
        flatten::place(&mut self.root, id, value, tags)
    }

    fn remove(&mut self, id: &UnitId) -> Result<Option<IndexShift>, Error> {
        flatten::remove(&mut self.root, id)
    }

    fn serialize(&self) -> Result<String, Error> {
        write_pretty(&node_to_value(&self.root))
    }

    fn box_clone(&self) -> Box<dyn Backing> {
        Box::new(self.clone())
    }
}

/// Parses JSON text, reporting syntax errors under `format`.
pub(crate) fn parse_value(raw: &str, format: &str) -> Result<Value, Error> {
    serde_json::from_str(raw).map_err(|e| Error::parse(format, e.to_string(), Some(e.line())))
}

pub(crate) fn value_to_node(value: &Value) -> Node {
    match value {
        Value::Null => Node::Null,
        Value::Bool(b) => Node::coerced(bool_text(*b), b.to_string()),
        Value::Number(n) => match n.as_f64() {
            Some(f) if !n.is_i64() && !n.is_u64() => Node::coerced(float_text(f), n.to_string()),
            _ => Node::coerced(n.to_string(), n.to_string()),
        },
        Value::String(s) => Node::text(s.clone()),
        Value::Array(items) => Node::Sequence(items.iter().map(value_to_node).collect()),
        Value::Object(map) => Node::Mapping(
            map.iter()
                .map(|(key, value)| (key.clone(), Member::new(value_to_node(value))))
                .collect(),
        ),
    }
}

/// Converts a tree back to JSON. Scalars never rewritten as units (ARB and
/// go-i18n metadata) keep their native boolean or number.
pub(crate) fn node_to_value(node: &Node) -> Value {
    match node {
        Node::Scalar {
            value,
            native: Some(native),
        } => serde_json::from_str(native).unwrap_or_else(|_| Value::String(value.clone())),
        Node::Scalar { value, .. } => Value::String(value.clone()),
        Node::Sequence(items) => Value::Array(items.iter().map(node_to_value).collect()),
        Node::Mapping(map) => Value::Object(
            map.iter()
                .map(|(key, member)| (key.clone(), node_to_value(&member.node)))
                .collect::<Map<String, Value>>(),
        ),
        Node::Null | Node::Unsupported(_) => Value::Null,
    }
}

pub(crate) fn write_pretty(value: &Value) -> Result<String, Error> {
    let mut buf = Vec::new();
    let mut serializer =
        serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
    value.serialize(&mut serializer)?;
    buf.push(b'\n');
    String::from_utf8(buf).map_err(|e| Error::parse("json", e.to_string(), None))
}

fn is_message_object(map: &IndexMap<String, Member>) -> bool {
    let mut has_category = false;
    for key in map.keys() {
        if key.parse::<PluralCategory>().is_ok() {
            has_category = true;
        } else if !MESSAGE_METADATA.contains(&key.as_str()) {
            return false;
        }
    }
    has_category
}

/// The document with message objects reduced to their translatable part.
///
/// A message with only `other` becomes a plain string, one with several
/// categories a plural group; the description becomes the member comment.
fn message_view(node: &Node) -> Node {
    match node {
        Node::Mapping(map) => Node::Mapping(
            map.iter()
                .map(|(key, member)| {
                    let view = match &member.node {
                        Node::Mapping(inner) if is_message_object(inner) => message_member(inner),
                        other => Member::with_comment(message_view(other), member.comment.clone()),
                    };
                    (key.clone(), view)
                })
                .collect(),
        ),
        Node::Sequence(items) => Node::Sequence(items.iter().map(message_view).collect()),
        other => other.clone(),
    }
}

fn message_member(message: &IndexMap<String, Member>) -> Member {
    let description = match message.get("description").map(|m| &m.node) {
        Some(Node::Scalar { value, .. }) => Some(value.clone()),
        _ => None,
    };
    let mut categories: IndexMap<String, Member> = message
        .iter()
        .filter(|(key, _)| key.parse::<PluralCategory>().is_ok())
        .map(|(key, member)| (key.clone(), member.clone()))
        .collect();

    let node = if categories.len() == 1 {
        match categories.shift_remove("other") {
            Some(other) => other.node,
            None => Node::Mapping(categories),
        }
    } else {
        Node::Mapping(categories)
    };
    Member::with_comment(node, description)
}

/// Writes a value into a message object, keeping its metadata keys in place.
fn write_message(
    message: &mut IndexMap<String, Member>,
    value: &Translation,
    tags: &[PluralCategory],
) {
    let encoded: Vec<(String, String)> = match value {
        Translation::Singular(text) => vec![("other".to_string(), text.clone())],
        Translation::Plural(forms) => plural_rules::encode(forms, tags)
            .into_iter()
            .map(|(category, text)| (category.as_str().to_string(), text))
            .collect(),
    };
    message.retain(|key, _| {
        key.parse::<PluralCategory>().is_err() || encoded.iter().any(|(k, _)| k == key)
    });
    for (key, text) in encoded {
        match message.get_mut(&key) {
            Some(member) => member.node = Node::text(text),
            None => {
                message.insert(key, Member::new(Node::text(text)));
            }
        }
    }
}
