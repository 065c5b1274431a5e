use crate::diagnostic::{Diagnostic, LineIndex, Position, Range};

/// Index of a node in its document's arena.
///
/// A `NodeId` is only meaningful together with the [`JsonDocument`] that
/// produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) usize);

/// The kind tag of an AST node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Null,
    Boolean,
    Number,
    String,
    Array,
    Object,
    Property,
}

impl NodeKind {
    /// The kind name as it appears in schema `type` values and diagnostics.
    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::Null => "null",
            NodeKind::Boolean => "boolean",
            NodeKind::Number => "number",
            NodeKind::String => "string",
            NodeKind::Array => "array",
            NodeKind::Object => "object",
            NodeKind::Property => "property",
        }
    }
}

/// Kind-specific payload of an AST node.
#[derive(Debug, Clone)]
pub enum NodeContent {
    Null,
    Boolean(bool),
    Number {
        value: f64,
        /// True iff the source lexeme contained no decimal point. An
        /// exponent alone does not make a number non-integer.
        is_integer: bool,
    },
    /// The decoded string value. The node's span includes the quotes.
    String(String),
    Array {
        items: Vec<NodeId>,
    },
    /// Properties in source order; duplicate keys are kept (and flagged as
    /// parse diagnostics).
    Object {
        properties: Vec<NodeId>,
    },
    Property {
        /// Always a `String` node.
        key: NodeId,
        /// Absent when error recovery finalized the property without one.
        value: Option<NodeId>,
        /// Byte offset of the `:`, or −1 when no colon was seen.
        colon_offset: isize,
    },
}

/// A syntax tree node: a shared positional header plus kind-specific content.
///
/// `offset`/`length` are byte positions spanning the smallest range covering
/// the node's tokens (string spans include the quotes). `parent` is a
/// non-owning back reference; the arena inside [`JsonDocument`] owns every
/// node.
#[derive(Debug, Clone)]
pub struct Node {
    pub offset: usize,
    pub length: usize,
    pub parent: Option<NodeId>,
    pub content: NodeContent,
}

impl Node {
    pub fn kind(&self) -> NodeKind {
        match self.content {
            NodeContent::Null => NodeKind::Null,
            NodeContent::Boolean(_) => NodeKind::Boolean,
            NodeContent::Number { .. } => NodeKind::Number,
            NodeContent::String(_) => NodeKind::String,
            NodeContent::Array { .. } => NodeKind::Array,
            NodeContent::Object { .. } => NodeKind::Object,
            NodeContent::Property { .. } => NodeKind::Property,
        }
    }

    /// The decoded string value, for `String` nodes.
    pub fn as_str(&self) -> Option<&str> {
        match &self.content {
            NodeContent::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self.content {
            NodeContent::Number { value, .. } => Some(value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.content {
            NodeContent::Boolean(value) => Some(value),
            _ => None,
        }
    }

    fn contains(&self, offset: usize, include_right_bound: bool) -> bool {
        (offset >= self.offset && offset < self.offset + self.length)
            || (include_right_bound && offset == self.offset + self.length)
    }
}

/// The result of parsing one JSON text: the node arena, the root, the syntax
/// diagnostics, and (when requested) comment ranges.
///
/// The document owns its source text and every node; node handles stay valid
/// for the document's lifetime.
#[derive(Debug)]
pub struct JsonDocument {
    text: String,
    nodes: Vec<Node>,
    root: Option<NodeId>,
    syntax_errors: Vec<Diagnostic>,
    comments: Vec<Range>,
    line_index: LineIndex,
}

impl JsonDocument {
    pub(crate) fn new(
        text: String,
        nodes: Vec<Node>,
        root: Option<NodeId>,
        syntax_errors: Vec<Diagnostic>,
        comments: Vec<Range>,
        line_index: LineIndex,
    ) -> Self {
        Self {
            text,
            nodes,
            root,
            syntax_errors,
            comments,
            line_index,
        }
    }

    /// The source text the document was parsed from.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    /// Diagnostics detected while parsing, in emission order.
    pub fn syntax_errors(&self) -> &[Diagnostic] {
        &self.syntax_errors
    }

    /// Comment ranges in source order. Empty unless
    /// [`ParseOptions::collect_comments`](crate::ParseOptions::collect_comments)
    /// was set.
    pub fn comments(&self) -> &[Range] {
        &self.comments
    }

    /// Maps a byte offset to a line/character position.
    pub fn position_at(&self, offset: usize) -> Position {
        self.line_index.position_at(&self.text, offset)
    }

    /// The children of a node in source order: array items, object
    /// properties, or a property's key followed by its value.
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        match &self.node(id).content {
            NodeContent::Array { items } => items.clone(),
            NodeContent::Object { properties } => properties.clone(),
            NodeContent::Property { key, value, .. } => {
                let mut children = vec![*key];
                children.extend(*value);
                children
            }
            _ => Vec::new(),
        }
    }

    /// The deepest node whose span contains `offset`.
    ///
    /// With `include_right_bound`, a node whose span ends exactly at
    /// `offset` also counts as containing it.
    pub fn node_from_offset(&self, offset: usize, include_right_bound: bool) -> Option<NodeId> {
        let root = self.root?;
        self.find_node_at_offset(root, offset, include_right_bound)
    }

    fn find_node_at_offset(
        &self,
        id: NodeId,
        offset: usize,
        include_right_bound: bool,
    ) -> Option<NodeId> {
        if !self.node(id).contains(offset, include_right_bound) {
            return None;
        }
        for child in self.children(id) {
            if self.node(child).offset > offset {
                break;
            }
            if let Some(found) = self.find_node_at_offset(child, offset, include_right_bound) {
                return Some(found);
            }
        }
        Some(id)
    }

    /// Pre-order depth-first traversal from the root. Returning `false` from
    /// the visitor stops the traversal.
    pub fn visit(&self, mut visitor: impl FnMut(NodeId) -> bool) {
        if let Some(root) = self.root {
            self.do_visit(root, &mut visitor);
        }
    }

    fn do_visit(&self, id: NodeId, visitor: &mut impl FnMut(NodeId) -> bool) -> bool {
        if !visitor(id) {
            return false;
        }
        for child in self.children(id) {
            if !self.do_visit(child, visitor) {
                return false;
            }
        }
        true
    }
}
