//! Flattening of a document tree into translation units, and its inverse.
//!
//! [`flatten`] walks a [`Node`] tree depth-first in document order and yields
//! one [`FlatEntry`] per leaf. [`place`] and [`remove`] edit a tree at a
//! [`UnitId`], creating intermediate maps on demand and pruning containers that
//! become empty.

use crate::{
    error::Error,
    node::{Member, Node},
    plural_rules,
    types::{PluralCategory, Translation},
    unit_id::{Segment, UnitId},
};

/// One leaf produced by [`flatten`].
#[derive(Debug, Clone, PartialEq)]
pub struct FlatEntry {
    pub id: UnitId,
    pub value: Translation,
    pub comment: Option<String>,
    /// The native value was not a string and was stringified.
    pub coerced: bool,
}

/// Format-specific knobs of the traversal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlattenOptions {
    /// Treat maps keyed by CLDR categories as single plural units.
    pub plurals: bool,
}

/// Position of an array element that was deleted; later siblings move down by one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexShift {
    pub array: UnitId,
    pub removed: usize,
}

/// Lazy depth-first traversal. Each call to [`flatten`] starts a fresh one.
#[derive(Debug)]
pub struct Flatten<'a> {
    stack: Vec<Frame<'a>>,
    options: FlattenOptions,
}

#[derive(Debug)]
struct Frame<'a> {
    id: UnitId,
    node: &'a Node,
    comment: Option<&'a str>,
}

/// Walks `tree` and yields its leaves in document order.
///
/// Stops after the first [`Error::Structure`].
pub fn flatten(tree: &Node, options: FlattenOptions) -> Flatten<'_> {
    Flatten {
        stack: vec![Frame {
            id: UnitId::root(),
            node: tree,
            comment: None,
        }],
        options,
    }
}

impl Iterator for Flatten<'_> {
    type Item = Result<FlatEntry, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(frame) = self.stack.pop() {
            match frame.node {
                Node::Scalar { value, native } => {
                    return Some(Ok(FlatEntry {
                        id: frame.id,
                        value: Translation::Singular(value.clone()),
                        comment: frame.comment.map(str::to_string),
                        coerced: native.is_some(),
                    }));
                }
                Node::Null => {}
                Node::Unsupported(type_name) => {
                    self.stack.clear();
                    return Some(Err(Error::structure(
                        &frame.id,
                        format!("unsupported value of type {}", type_name),
                    )));
                }
                Node::Sequence(items) => {
                    for (index, item) in items.iter().enumerate().rev() {
                        self.stack.push(Frame {
                            id: frame.id.with_index(index),
                            node: item,
                            comment: None,
                        });
                    }
                }
                Node::Mapping(map) => {
                    if self.options.plurals && plural_rules::detect(map) {
                        return Some(Ok(FlatEntry {
                            id: frame.id,
                            value: plural_rules::decode(map),
                            comment: frame.comment.map(str::to_string),
                            coerced: false,
                        }));
                    }
                    for (key, member) in map.iter().rev() {
                        self.stack.push(Frame {
                            id: frame.id.with_key(key.clone()),
                            node: &member.node,
                            comment: member.comment.as_deref(),
                        });
                    }
                }
            }
        }
        None
    }
}

/// Builds the node that stores `value`; plurals are encoded with `tags`.
pub fn value_node(value: &Translation, tags: &[PluralCategory]) -> Node {
    match value {
        Translation::Singular(text) => Node::text(text.clone()),
        Translation::Plural(forms) => plural_rules::encode_node(forms, tags),
    }
}

/// Writes `value` at `id`, creating missing maps along the way.
///
/// Arrays are never created or grown: an `index` segment must address an
/// existing element.
pub fn place(
    tree: &mut Node,
    id: &UnitId,
    value: &Translation,
    tags: &[PluralCategory],
) -> Result<(), Error> {
    let Some((last, parents)) = id.segments().split_last() else {
        *tree = value_node(value, tags);
        return Ok(());
    };

    let mut current = tree;
    for (depth, segment) in parents.iter().enumerate() {
        let next_is_key = matches!(id.segments()[depth + 1], Segment::Key(_));
        current = descend_or_create(current, segment, next_is_key, id)?;
    }

    let node = value_node(value, tags);
    match (current, last) {
        (Node::Mapping(map), Segment::Key(key)) => {
            match map.get_mut(key) {
                Some(member) => member.node = node,
                None => {
                    map.insert(key.clone(), Member::new(node));
                }
            }
            Ok(())
        }
        (Node::Sequence(items), Segment::Index(index)) => {
            let len = items.len();
            match items.get_mut(*index) {
                Some(item) => {
                    *item = node;
                    Ok(())
                }
                None => Err(Error::structure(
                    id,
                    format!("array index out of range (length {})", len),
                )),
            }
        }
        (other, _) => Err(Error::structure(
            id,
            format!("cannot place a value inside {}", other.type_name()),
        )),
    }
}

fn descend_or_create<'a>(
    node: &'a mut Node,
    segment: &Segment,
    next_is_key: bool,
    id: &UnitId,
) -> Result<&'a mut Node, Error> {
    if matches!(node, Node::Null) && matches!(segment, Segment::Key(_)) {
        *node = Node::mapping();
    }
    match (node, segment) {
        (Node::Mapping(map), Segment::Key(key)) => {
            if !map.contains_key(key) {
                if !next_is_key {
                    return Err(Error::structure(id, "arrays must exist before indexing"));
                }
                map.insert(key.clone(), Member::new(Node::mapping()));
            }
            let member = map
                .get_mut(key)
                .ok_or_else(|| Error::structure(id, "missing map entry"))?;
            if matches!(member.node, Node::Scalar { .. }) {
                return Err(Error::structure(id, "a value is in the way of a nested key"));
            }
            Ok(&mut member.node)
        }
        (Node::Sequence(items), Segment::Index(index)) => items
            .get_mut(*index)
            .ok_or_else(|| Error::structure(id, "arrays must exist before indexing")),
        (other, Segment::Key(_)) => Err(Error::structure(
            id,
            format!("expected a map, found {}", other.type_name()),
        )),
        (other, Segment::Index(_)) => Err(Error::structure(
            id,
            format!("expected an array, found {}", other.type_name()),
        )),
    }
}

/// Deletes the leaf at `id` and every ancestor container left empty, the root
/// excepted.
pub fn remove(tree: &mut Node, id: &UnitId) -> Result<Option<IndexShift>, Error> {
    if id.is_empty() {
        return Err(Error::structure(id, "cannot remove the document root"));
    }
    remove_at(tree, id.segments(), UnitId::root(), id)
}

fn remove_at(
    node: &mut Node,
    path: &[Segment],
    here: UnitId,
    full: &UnitId,
) -> Result<Option<IndexShift>, Error> {
    let Some((segment, rest)) = path.split_first() else {
        return Err(Error::UnitNotFound(full.to_string()));
    };

    if !rest.is_empty() {
        let (shift, emptied) = {
            let child = child_mut(node, segment).ok_or_else(|| Error::UnitNotFound(full.to_string()))?;
            let shift = remove_at(child, rest, child_id(&here, segment), full)?;
            (shift, child.is_empty_container())
        };
        if !emptied {
            return Ok(shift);
        }
    }

    match (node, segment) {
        (Node::Mapping(map), Segment::Key(key)) => {
            map.shift_remove(key)
                .ok_or_else(|| Error::UnitNotFound(full.to_string()))?;
            Ok(None)
        }
        (Node::Sequence(items), Segment::Index(index)) if *index < items.len() => {
            items.remove(*index);
            Ok(Some(IndexShift {
                array: here,
                removed: *index,
            }))
        }
        _ => Err(Error::UnitNotFound(full.to_string())),
    }
}

fn child_mut<'a>(node: &'a mut Node, segment: &Segment) -> Option<&'a mut Node> {
    match (node, segment) {
        (Node::Mapping(map), Segment::Key(key)) => map.get_mut(key).map(|m| &mut m.node),
        (Node::Sequence(items), Segment::Index(index)) => items.get_mut(*index),
        _ => None,
    }
}

/// The node addressed by `id`, if the path exists.
pub fn node_at<'a>(tree: &'a Node, id: &UnitId) -> Option<&'a Node> {
    id.segments()
        .iter()
        .try_fold(tree, |node, segment| match (node, segment) {
            (Node::Mapping(map), Segment::Key(key)) => map.get(key).map(|m| &m.node),
            (Node::Sequence(items), Segment::Index(index)) => items.get(*index),
            _ => None,
        })
}

pub fn node_at_mut<'a>(tree: &'a mut Node, id: &UnitId) -> Option<&'a mut Node> {
    id.segments()
        .iter()
        .try_fold(tree, |node, segment| child_mut(node, segment))
}

fn child_id(parent: &UnitId, segment: &Segment) -> UnitId {
    match segment {
        Segment::Key(key) => parent.with_key(key.clone()),
        Segment::Index(index) => parent.with_index(*index),
    }
}
