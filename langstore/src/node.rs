//! The variant document tree shared by every native format.
//!
//! Adapters expose their parsed document as a [`Node`] tree; flattening and the
//! merge engine only ever look at this shape, never at format-specific ASTs.

use indexmap::IndexMap;

/// A node of a native document, reduced to the kinds the flattener cares about.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// A leaf value. `native` holds the source literal (`true`, `3`) when the
    /// native value was a boolean or a number that had to be turned into text.
    Scalar {
        value: String,
        native: Option<String>,
    },

    /// An ordered list of children.
    Sequence(Vec<Node>),

    /// An ordered map of children.
    Mapping(IndexMap<String, Member>),

    /// An explicit null or an empty slot.
    Null,

    /// A native value the flattener cannot represent (e.g. a TOML datetime).
    Unsupported(&'static str),
}

/// A map entry with the comment attached to its key, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    pub node: Node,
    pub comment: Option<String>,
}

impl Node {
    pub fn text(value: impl Into<String>) -> Self {
        Node::Scalar {
            value: value.into(),
            native: None,
        }
    }

    /// A boolean or number shown as `value`, remembering its `native` literal.
    pub fn coerced(value: impl Into<String>, native: impl Into<String>) -> Self {
        Node::Scalar {
            value: value.into(),
            native: Some(native.into()),
        }
    }

    pub fn mapping() -> Self {
        Node::Mapping(IndexMap::new())
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Node::Scalar { .. } => "string",
            Node::Sequence(_) => "array",
            Node::Mapping(_) => "map",
            Node::Null => "null",
            Node::Unsupported(name) => name,
        }
    }

    pub fn as_mapping(&self) -> Option<&IndexMap<String, Member>> {
        match self {
            Node::Mapping(map) => Some(map),
            _ => None,
        }
    }

    pub fn is_empty_container(&self) -> bool {
        match self {
            Node::Mapping(map) => map.is_empty(),
            Node::Sequence(items) => items.is_empty(),
            _ => false,
        }
    }
}

impl Member {
    pub fn new(node: Node) -> Self {
        Self {
            node,
            comment: None,
        }
    }

    pub fn with_comment(node: Node, comment: Option<String>) -> Self {
        Self { node, comment }
    }
}

/// Renders a boolean the way units display them (`true` becomes `True`).
pub fn bool_text(value: bool) -> String {
    if value { "True" } else { "False" }.to_string()
}

/// Renders a float keeping a fractional part for whole numbers (`2.0`, not `2`).
pub fn float_text(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e16 {
        format!("{:.1}", value)
    } else {
        value.to_string()
    }
}
