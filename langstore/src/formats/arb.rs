//! Support for Flutter Application Resource Bundles (`.arb`).
//!
//! An ARB file is JSON where `@key` objects describe `key` and `@@`-prefixed
//! keys hold file-level metadata such as `@@locale`. Neither is ever a unit.
//! ICU plural and select messages stay plain text.

use crate::{
    error::Error,
    flatten::{self, IndexShift},
    formats::{
        FormatHandler, FormatType,
        json::{node_to_value, parse_value, value_to_node, write_pretty},
    },
    node::{Member, Node},
    traits::Backing,
    types::{PluralCategory, Translation},
    unit_id::{Segment, UnitId},
};

#[derive(Debug, Clone)]
pub struct Document {
    root: Node,
}

impl Default for Document {
    fn default() -> Self {
        Self {
            root: Node::mapping(),
        }
    }
}

pub fn handler() -> FormatHandler {
    FormatHandler {
        format: FormatType::Arb,
        parse: |raw| Ok(Box::new(Document::parse(raw)?)),
        empty: || Box::new(Document::default()),
    }
}

impl Document {
    pub fn parse(raw: &str) -> Result<Self, Error> {
        let value = parse_value(raw, "arb")?;
        if !value.is_object() {
            return Err(Error::parse("arb", "the top level must be an object", None));
        }
        Ok(Self {
            root: value_to_node(&value),
        })
    }

    fn description(&self, key: &str) -> Option<String> {
        let metadata = self.root.as_mapping()?.get(&format!("@{}", key))?;
        match &metadata.node.as_mapping()?.get("description")?.node {
            Node::Scalar { value, .. } => Some(value.clone()),
            _ => None,
        }
    }
}

impl Backing for Document {
    fn format(&self) -> FormatType {
        FormatType::Arb
    }

    fn tree(&self) -> Result<Node, Error> {
        let Some(map) = self.root.as_mapping() else {
            return Ok(Node::mapping());
        };
        Ok(Node::Mapping(
            map.iter()
                .filter(|(key, _)| !key.starts_with('@'))
                .map(|(key, member)| {
                    let view = Member::with_comment(member.node.clone(), self.description(key));
                    (key.clone(), view)
                })
                .collect(),
        ))
    }

    fn language(&self) -> Option<String> {
        match &self.root.as_mapping()?.get("@@locale")?.node {
            Node::Scalar { value, .. } if !value.is_empty() => Some(value.clone()),
            _ => None,
        }
    }

    fn place(
        &mut self,
        id: &UnitId,
        value: &Translation,
        tags: &[PluralCategory],
    ) -> Result<(), Error> {
        if value.is_plural() {
            return Err(Error::structure(id, "ARB messages carry plurals as ICU text"));
        }
        if let Some(Segment::Key(key)) = id.segments().first() {
            if key.starts_with('@') {
                return Err(Error::structure(id, "metadata keys are not translatable"));
            }
        }
        flatten::place(&mut self.root, id, value, tags)
    }

    fn remove(&mut self, id: &UnitId) -> Result<Option<IndexShift>, Error> {
        let shift = flatten::remove(&mut self.root, id)?;
        if let ([Segment::Key(key)], Node::Mapping(map)) = (id.segments(), &mut self.root) {
            map.shift_remove(&format!("@{}", key));
        }
        Ok(shift)
    }

    fn serialize(&self) -> Result<String, Error> {
        write_pretty(&node_to_value(&self.root))
    }

    fn box_clone(&self) -> Box<dyn Backing> {
        Box::new(self.clone())
    }
}
