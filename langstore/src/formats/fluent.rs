//! Support for Project Fluent (`.ftl`) resources.
//!
//! Every message value, term value and attribute is one unit. Messages are
//! addressed by their id, terms by `-id`, attributes by `id.attr`. Patterns
//! that contain placeables or select expressions are exposed as their Fluent
//! source text, so they survive a round trip through a bilingual file intact.
//!
//! Only the comment the Fluent parser attaches to a message (a `#` block
//! directly above it) becomes a note. Group (`##`) and resource (`###`)
//! comments, and any comment followed by a blank line, belong to no unit.

use std::collections::HashSet;

use fluent_syntax::{
    ast::{Attribute, Entry, Identifier, Message, Pattern, PatternElement, Resource, Term},
    parser, serializer,
};
use indexmap::IndexMap;

use crate::{
    error::{Error, line_of},
    flatten::IndexShift,
    formats::{FormatHandler, FormatType},
    node::{Member, Node},
    traits::Backing,
    types::{PluralCategory, Translation},
    unit_id::{Segment, UnitId},
};

/// Scratch message id used to render and parse single patterns.
const SCRATCH_ID: &str = "x";

#[derive(Debug, Clone)]
pub struct Document {
    resource: Resource<String>,
}

impl Default for Document {
    fn default() -> Self {
        Self {
            resource: Resource { body: Vec::new() },
        }
    }
}

pub fn handler() -> FormatHandler {
    FormatHandler {
        format: FormatType::Fluent,
        parse: |raw| Ok(Box::new(Document::parse(raw)?)),
        empty: || Box::new(Document::default()),
    }
}

impl Document {
    pub fn parse(raw: &str) -> Result<Self, Error> {
        match parser::parse(raw.to_string()) {
            Ok(resource) => Ok(Self { resource }),
            Err((_, errors)) => {
                let (message, line) = errors
                    .first()
                    .map(|err| (format!("{:?}", err.kind), Some(line_of(raw, err.pos.start))))
                    .unwrap_or_else(|| ("invalid resource".to_string(), None));
                Err(Error::parse("ftl", message, line))
            }
        }
    }

    fn entry_mut(&mut self, target: &Target) -> Option<&mut Entry<String>> {
        self.resource.body.iter_mut().find(|entry| target.matches(entry))
    }

    fn entry_position(&self, target: &Target) -> Option<usize> {
        self.resource.body.iter().position(|entry| target.matches(entry))
    }
}

/// A message, term or attribute addressed by a unit id.
#[derive(Debug)]
struct Target {
    term: bool,
    id: String,
    attribute: Option<String>,
}

impl Target {
    /// Accepts both the single-key form (`msg.attr`) produced by flattening
    /// and the two-key form a parsed location string gives.
    fn resolve(unit: &UnitId) -> Result<Self, Error> {
        let mut names = Vec::with_capacity(unit.len());
        for segment in unit.segments() {
            match segment {
                Segment::Key(name) => names.push(name.as_str()),
                Segment::Index(_) => {
                    return Err(Error::structure(unit, "Fluent resources have no arrays"));
                }
            }
        }
        let joined = names.join(".");
        let (head, attribute) = match joined.split_once('.') {
            Some((head, attr)) => (head, Some(attr.to_string())),
            None => (joined.as_str(), None),
        };
        let (term, id) = match head.strip_prefix('-') {
            Some(id) => (true, id),
            None => (false, head),
        };
        if id.is_empty() || attribute.as_deref().is_some_and(|a| a.is_empty() || a.contains('.')) {
            return Err(Error::InvalidUnitId(unit.to_string()));
        }
        Ok(Self {
            term,
            id: id.to_string(),
            attribute,
        })
    }

    fn matches(&self, entry: &Entry<String>) -> bool {
        match entry {
            Entry::Message(message) => !self.term && message.id.name == self.id,
            Entry::Term(term) => self.term && term.id.name == self.id,
            _ => false,
        }
    }

    fn name(&self) -> String {
        if self.term {
            format!("-{}", self.id)
        } else {
            self.id.clone()
        }
    }
}

impl Backing for Document {
    fn format(&self) -> FormatType {
        FormatType::Fluent
    }

    fn tree(&self) -> Result<Node, Error> {
        let mut map = IndexMap::new();
        let mut seen = HashSet::new();
        let mut add = |key: String, member: Member| -> Result<(), Error> {
            if !seen.insert(key.clone()) {
                return Err(Error::DuplicateUnit(key));
            }
            map.insert(key, member);
            Ok(())
        };

        for entry in &self.resource.body {
            let (name, value, attributes, comment) = match entry {
                Entry::Message(message) => (
                    message.id.name.clone(),
                    message.value.as_ref(),
                    &message.attributes,
                    message.comment.as_ref(),
                ),
                Entry::Term(term) => (
                    format!("-{}", term.id.name),
                    Some(&term.value),
                    &term.attributes,
                    term.comment.as_ref(),
                ),
                _ => continue,
            };
            let note = comment.map(|c| c.content.join("\n"));
            if let Some(value) = value {
                add(
                    name.clone(),
                    Member::with_comment(Node::text(pattern_to_text(value)), note),
                )?;
            }
            for attribute in attributes {
                add(
                    format!("{}.{}", name, attribute.id.name),
                    Member::new(Node::text(pattern_to_text(&attribute.value))),
                )?;
            }
        }
        Ok(Node::Mapping(map))
    }

    fn place(
        &mut self,
        id: &UnitId,
        value: &Translation,
        _tags: &[PluralCategory],
    ) -> Result<(), Error> {
        let Translation::Singular(text) = value else {
            return Err(Error::structure(id, "Fluent messages have no plural groups"));
        };
        let target = Target::resolve(id)?;
        let pattern = text_to_pattern(text, id)?;

        let Some(entry) = self.entry_mut(&target) else {
            let entry = new_entry(&target, pattern, id)?;
            self.resource.body.push(entry);
            return Ok(());
        };

        let (value_slot, attributes) = match entry {
            Entry::Message(message) => (
                MessageValue::Optional(&mut message.value),
                &mut message.attributes,
            ),
            Entry::Term(term) => (MessageValue::Required(&mut term.value), &mut term.attributes),
            _ => return Err(Error::structure(id, "not a message")),
        };

        match &target.attribute {
            Some(name) => {
                let pattern =
                    pattern.ok_or_else(|| Error::structure(id, "an attribute value cannot be empty"))?;
                match attributes.iter_mut().find(|a| a.id.name == *name) {
                    Some(attribute) => attribute.value = pattern,
                    None => attributes.push(Attribute {
                        id: Identifier { name: name.clone() },
                        value: pattern,
                    }),
                }
            }
            None => match value_slot {
                MessageValue::Optional(slot) => {
                    if pattern.is_none() && attributes.is_empty() {
                        return Err(Error::structure(id, "a message needs a value or an attribute"));
                    }
                    *slot = pattern;
                }
                MessageValue::Required(slot) => {
                    *slot = pattern.ok_or_else(|| Error::structure(id, "a term value cannot be empty"))?;
                }
            },
        }
        Ok(())
    }

    fn remove(&mut self, id: &UnitId) -> Result<Option<IndexShift>, Error> {
        let target = Target::resolve(id)?;
        let position = self
            .entry_position(&target)
            .ok_or_else(|| Error::UnitNotFound(id.to_string()))?;

        let emptied = match &mut self.resource.body[position] {
            Entry::Message(message) => {
                match &target.attribute {
                    Some(name) => remove_attribute(&mut message.attributes, name, id)?,
                    None => {
                        message
                            .value
                            .take()
                            .ok_or_else(|| Error::UnitNotFound(id.to_string()))?;
                    }
                }
                message.value.is_none() && message.attributes.is_empty()
            }
            Entry::Term(term) => match &target.attribute {
                Some(name) => {
                    remove_attribute(&mut term.attributes, name, id)?;
                    false
                }
                None if term.attributes.is_empty() => true,
                None => {
                    return Err(Error::structure(id, "a term with attributes must keep its value"));
                }
            },
            _ => false,
        };

        if emptied {
            self.resource.body.remove(position);
            tracing::trace!(entry = %target.name(), "dropped empty Fluent entry");
        }
        Ok(None)
    }

    fn serialize(&self) -> Result<String, Error> {
        Ok(serializer::serialize(&self.resource))
    }

    fn box_clone(&self) -> Box<dyn Backing> {
        Box::new(self.clone())
    }
}

enum MessageValue<'a> {
    Optional(&'a mut Option<Pattern<String>>),
    Required(&'a mut Pattern<String>),
}

fn remove_attribute(
    attributes: &mut Vec<Attribute<String>>,
    name: &str,
    id: &UnitId,
) -> Result<(), Error> {
    let index = attributes
        .iter()
        .position(|a| a.id.name == name)
        .ok_or_else(|| Error::UnitNotFound(id.to_string()))?;
    attributes.remove(index);
    Ok(())
}

fn new_entry(
    target: &Target,
    pattern: Option<Pattern<String>>,
    id: &UnitId,
) -> Result<Entry<String>, Error> {
    let identifier = Identifier {
        name: target.id.clone(),
    };
    let (value, attributes) = match (&target.attribute, pattern) {
        (Some(name), Some(pattern)) => (
            None,
            vec![Attribute {
                id: Identifier { name: name.clone() },
                value: pattern,
            }],
        ),
        (None, Some(pattern)) => (Some(pattern), Vec::new()),
        (_, None) => return Err(Error::structure(id, "cannot add an empty Fluent entry")),
    };

    if target.term {
        let value = value.ok_or_else(|| Error::structure(id, "a new term needs a value first"))?;
        Ok(Entry::Term(Term {
            id: identifier,
            value,
            attributes,
            comment: None,
        }))
    } else {
        Ok(Entry::Message(Message {
            id: identifier,
            value,
            attributes,
            comment: None,
        }))
    }
}

/// Renders a pattern as Fluent source text, without the leading `id =`.
fn pattern_to_text(pattern: &Pattern<String>) -> String {
    let mut plain = String::new();
    for element in &pattern.elements {
        match element {
            PatternElement::TextElement { value } => plain.push_str(value),
            PatternElement::Placeable { .. } => return render_pattern(pattern),
        }
    }
    plain
}

fn render_pattern(pattern: &Pattern<String>) -> String {
    let scratch = Resource {
        body: vec![Entry::Message(Message {
            id: Identifier {
                name: SCRATCH_ID.to_string(),
            },
            value: Some(pattern.clone()),
            attributes: Vec::new(),
            comment: None,
        })],
    };
    let source = serializer::serialize(&scratch);
    let body = source
        .strip_prefix(SCRATCH_ID)
        .and_then(|rest| rest.trim_start_matches(' ').strip_prefix('='))
        .unwrap_or(&source);

    let lines: Vec<&str> = body.trim_end_matches('\n').split('\n').collect();
    let mut out: Vec<&str> = Vec::with_capacity(lines.len());
    for (n, line) in lines.iter().enumerate() {
        if n == 0 {
            let first = line.trim_start_matches(' ');
            if !first.is_empty() {
                out.push(first);
            }
        } else {
            out.push(dedent(line));
        }
    }
    out.join("\n")
}

fn dedent(line: &str) -> &str {
    let spaces = line.len() - line.trim_start_matches(' ').len();
    &line[spaces.min(4)..]
}

/// Parses Fluent source text back into a pattern; empty text gives `None`.
fn text_to_pattern(text: &str, id: &UnitId) -> Result<Option<Pattern<String>>, Error> {
    if text.trim().is_empty() {
        return Ok(None);
    }
    let mut source = format!("{} =", SCRATCH_ID);
    if text.contains('\n') {
        for line in text.split('\n') {
            source.push('\n');
            if !line.is_empty() {
                source.push_str("    ");
                source.push_str(line);
            }
        }
    } else {
        source.push(' ');
        source.push_str(text);
    }
    source.push('\n');

    let invalid = || Error::structure(id, format!("not a valid Fluent pattern: {:?}", text));
    let resource = parser::parse(source).map_err(|_| invalid())?;
    match resource.body.into_iter().next() {
        Some(Entry::Message(Message {
            value: Some(pattern),
            ..
        })) => Ok(Some(pattern)),
        _ => Err(invalid()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flatten::{FlatEntry, flatten};

    fn entries(doc: &Document) -> Vec<FlatEntry> {
        let tree = doc.tree().unwrap();
        flatten(&tree, doc.flatten_options())
            .collect::<Result<_, _>>()
            .unwrap()
    }

    #[test]
    fn test_units_and_ids() {
        let raw = "hello = Hello\n-brand = Firefox\nlogin =\n    .placeholder = Email\n    .title = Log in\n";
        let doc = Document::parse(raw).unwrap();
        let ids: Vec<String> = entries(&doc).iter().map(|e| e.id.to_string()).collect();
        assert_eq!(ids, vec!["hello", "-brand", "login.placeholder", "login.title"]);
    }

    #[test]
    fn test_round_trip() {
        let raw = "# Greeting shown on start\nhello = Hello\n\n## Menu\n\nopen = Open { $file }\n";
        let doc = Document::parse(raw).unwrap();
        assert_eq!(doc.serialize().unwrap(), raw);
    }

    #[test]
    fn test_message_comment_attaches() {
        let raw = "# Greeting shown on start\nhello = Hello\n\n# Standalone\n\nbye = Bye\n";
        let doc = Document::parse(raw).unwrap();
        let flat = entries(&doc);
        assert_eq!(flat[0].comment.as_deref(), Some("Greeting shown on start"));
        assert_eq!(flat[1].comment, None);
    }

    #[test]
    fn test_placeables_stay_source_text() {
        let doc = Document::parse("open = Open { $file } now\n").unwrap();
        let flat = entries(&doc);
        assert_eq!(flat[0].value.first(), "Open { $file } now");
    }

    #[test]
    fn test_multiline_value() {
        let doc = Document::parse("about =\n    First line\n    second line\n").unwrap();
        let flat = entries(&doc);
        assert_eq!(flat[0].value.first(), "First line\nsecond line");
    }

    #[test]
    fn test_parse_error() {
        let err = Document::parse("hello = Hello\n= broken\n").unwrap_err();
        match err {
            Error::Parse { format, line, .. } => {
                assert_eq!(format, "ftl");
                assert_eq!(line, Some(2));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_place_existing_and_new() {
        let mut doc = Document::parse("hello = Hello\n").unwrap();
        doc.place(&UnitId::key("hello"), &Translation::from("Bonjour"), &[])
            .unwrap();
        doc.place(&UnitId::key("bye"), &Translation::from("Au revoir { $name }"), &[])
            .unwrap();
        doc.place(&"login.title".parse().unwrap(), &Translation::from("Connexion"), &[])
            .unwrap();
        assert_eq!(
            doc.serialize().unwrap(),
            "hello = Bonjour\nbye = Au revoir { $name }\nlogin =\n    .title = Connexion\n"
        );
    }

    #[test]
    fn test_place_rejects_plural() {
        let mut doc = Document::default();
        let value = Translation::Plural(vec!["a".into(), "b".into()]);
        assert!(matches!(
            doc.place(&UnitId::key("n"), &value, &[]),
            Err(Error::Structure { .. })
        ));
    }

    #[test]
    fn test_remove_attribute_then_message() {
        let mut doc = Document::parse("login =\n    .title = Log in\nhello = Hello\n").unwrap();
        doc.remove(&UnitId::key("login.title")).unwrap();
        assert_eq!(doc.serialize().unwrap(), "hello = Hello\n");
        doc.remove(&UnitId::key("hello")).unwrap();
        assert_eq!(doc.serialize().unwrap(), "");
    }

    #[test]
    fn test_remove_value_keeps_attributes() {
        let mut doc = Document::parse("login = Login\n    .title = Log in\n").unwrap();
        doc.remove(&UnitId::key("login")).unwrap();
        assert_eq!(doc.serialize().unwrap(), "login =\n    .title = Log in\n");
    }

    #[test]
    fn test_duplicate_message_is_rejected() {
        let doc = Document::parse("a = One\na = Two\n").unwrap();
        assert!(matches!(doc.tree(), Err(Error::DuplicateUnit(_))));
    }
}
