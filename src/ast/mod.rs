//! AST module for nodematch
//!
//! This module provides the homogeneous syntax tree the whole engine works on.
//! A [`Node`] is one of three shapes (identifier, literal, call) plus an
//! ordered attribute list. Nodes are immutable, `Arc`-shared handles whose
//! child lists are persistent vectors, so rebuilding a node with one field
//! changed shares everything else with the original.
//!
//! # Equality
//!
//! `PartialEq` on [`Node`] is *structural*: variant, name/value/target and
//! arguments are compared pairwise, while attribute lists and spans are
//! ignored. Use [`Node::eq_with_attrs`] when attributes matter.
//!
//! ```rust
//! use nodematch::ast::Node;
//! let a = Node::call_named("Foo", [Node::literal(1)]);
//! let b = a.plus_attrs([Node::id("public")]);
//! assert_eq!(a, b);
//! assert!(!a.eq_with_attrs(&b));
//! ```

// ============================================================================
// IMPORTS
// ============================================================================

use im::Vector;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

// ============================================================================
// CORE DATA STRUCTURES
// ============================================================================

/// An interned-by-sharing identifier name.
pub type Symbol = Arc<str>;

/// Ordered, persistent list of nodes used for arguments and attributes.
pub type NodeList = Vector<Node>;

/// Represents a span in the source text a node was read from.
///
/// Spans are carried for diagnostics only and never take part in equality.
///
/// # Examples
///
/// ```rust
/// use nodematch::ast::Span;
/// let span = Span::new(2, 7);
/// assert_eq!(span.len(), 5);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

/// Shared handle to an immutable tree node.
#[derive(Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Node(Arc<NodeData>);

/// The payload behind a [`Node`] handle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeData {
    pub kind: NodeKind,
    #[serde(default, skip_serializing_if = "Vector::is_empty")]
    pub attrs: NodeList,
    #[serde(default)]
    pub span: Span,
}

/// The three node shapes.
///
/// A zero-argument call and a bare identifier are distinct:
/// `Call { target: Id("Foo"), args: [] }` is not `Id("Foo")`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum NodeKind {
    Id(Symbol),
    Literal(Value),
    Call { target: Node, args: NodeList },
}

// ============================================================================
// PUBLIC API IMPLEMENTATION
// ============================================================================

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Span { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Smallest span covering both `self` and `other`.
    pub fn cover(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

impl Node {
    /// Builds a node from its parts.
    pub fn from_parts(kind: NodeKind, attrs: NodeList, span: Span) -> Node {
        Node(Arc::new(NodeData { kind, attrs, span }))
    }

    /// Creates an identifier node.
    pub fn id(name: impl Into<Symbol>) -> Node {
        Node::from_parts(NodeKind::Id(name.into()), Vector::new(), Span::default())
    }

    /// Creates a literal node.
    pub fn literal(value: impl Into<Value>) -> Node {
        Node::from_parts(NodeKind::Literal(value.into()), Vector::new(), Span::default())
    }

    /// Creates a call node with an arbitrary target.
    pub fn call(target: Node, args: impl IntoIterator<Item = Node>) -> Node {
        Node::from_parts(
            NodeKind::Call {
                target,
                args: args.into_iter().collect(),
            },
            Vector::new(),
            Span::default(),
        )
    }

    /// Creates a call whose target is the identifier `name`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use nodematch::ast::Node;
    /// let call = Node::call_named("+", [Node::id("a"), Node::literal(2)]);
    /// assert!(call.calls("+", 2));
    /// ```
    pub fn call_named(name: impl Into<Symbol>, args: impl IntoIterator<Item = Node>) -> Node {
        Node::call(Node::id(name), args)
    }

    pub fn kind(&self) -> &NodeKind {
        &self.0.kind
    }

    pub fn attrs(&self) -> &NodeList {
        &self.0.attrs
    }

    pub fn has_attrs(&self) -> bool {
        !self.0.attrs.is_empty()
    }

    pub fn span(&self) -> Span {
        self.0.span
    }

    pub fn is_id(&self) -> bool {
        matches!(self.kind(), NodeKind::Id(_))
    }

    pub fn is_literal(&self) -> bool {
        matches!(self.kind(), NodeKind::Literal(_))
    }

    pub fn is_call(&self) -> bool {
        matches!(self.kind(), NodeKind::Call { .. })
    }

    /// The identifier name, if this is an `Id`.
    pub fn name(&self) -> Option<&Symbol> {
        match self.kind() {
            NodeKind::Id(name) => Some(name),
            _ => None,
        }
    }

    pub fn is_id_named(&self, name: &str) -> bool {
        self.name().is_some_and(|n| &**n == name)
    }

    /// The literal value, if this is a `Literal`.
    pub fn value(&self) -> Option<&Value> {
        match self.kind() {
            NodeKind::Literal(value) => Some(value),
            _ => None,
        }
    }

    /// The call target, if this is a `Call`.
    pub fn target(&self) -> Option<&Node> {
        match self.kind() {
            NodeKind::Call { target, .. } => Some(target),
            _ => None,
        }
    }

    /// The call arguments, if this is a `Call`.
    pub fn args(&self) -> Option<&NodeList> {
        match self.kind() {
            NodeKind::Call { args, .. } => Some(args),
            _ => None,
        }
    }

    /// Number of call arguments; zero for identifiers and literals.
    pub fn arg_count(&self) -> usize {
        self.args().map_or(0, Vector::len)
    }

    pub fn arg(&self, index: usize) -> Option<&Node> {
        self.args().and_then(|args| args.get(index))
    }

    /// Name of the call target when it is a plain identifier.
    pub fn target_name(&self) -> Option<&Symbol> {
        self.target().and_then(Node::name)
    }

    /// True when this is a call to identifier `name` with exactly `argc` arguments.
    pub fn calls(&self, name: &str, argc: usize) -> bool {
        self.target().is_some_and(|t| t.is_id_named(name)) && self.arg_count() == argc
    }

    /// True when this is a call to identifier `name` with at least `min` arguments.
    pub fn calls_min(&self, name: &str, min: usize) -> bool {
        self.target().is_some_and(|t| t.is_id_named(name)) && self.arg_count() >= min
    }

    /// True when this is a call to identifier `name`, any arity.
    pub fn calls_any(&self, name: &str) -> bool {
        self.target().is_some_and(|t| t.is_id_named(name))
    }

    pub fn with_attrs(&self, attrs: NodeList) -> Node {
        Node::from_parts(self.0.kind.clone(), attrs, self.0.span)
    }

    /// Appends attributes, keeping the existing ones first.
    pub fn plus_attrs(&self, extra: impl IntoIterator<Item = Node>) -> Node {
        let mut attrs = self.0.attrs.clone();
        attrs.extend(extra);
        if attrs.len() == self.0.attrs.len() {
            return self.clone();
        }
        self.with_attrs(attrs)
    }

    pub fn without_attrs(&self) -> Node {
        if !self.has_attrs() {
            return self.clone();
        }
        self.with_attrs(Vector::new())
    }

    /// Replaces the argument list of a call; other shapes are returned unchanged.
    pub fn with_args(&self, args: NodeList) -> Node {
        let NodeKind::Call { target, .. } = self.kind() else {
            return self.clone();
        };
        Node::from_parts(
            NodeKind::Call {
                target: target.clone(),
                args,
            },
            self.0.attrs.clone(),
            self.0.span,
        )
    }

    /// Replaces the target of a call; other shapes are returned unchanged.
    pub fn with_target(&self, target: Node) -> Node {
        let NodeKind::Call { args, .. } = self.kind() else {
            return self.clone();
        };
        Node::from_parts(
            NodeKind::Call {
                target,
                args: args.clone(),
            },
            self.0.attrs.clone(),
            self.0.span,
        )
    }

    pub fn with_span(&self, span: Span) -> Node {
        Node::from_parts(self.0.kind.clone(), self.0.attrs.clone(), span)
    }

    /// True when both handles share the same allocation.
    pub fn ptr_eq(a: &Node, b: &Node) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }

    /// Structural equality that also compares attribute lists, recursively.
    pub fn eq_with_attrs(&self, other: &Node) -> bool {
        if Node::ptr_eq(self, other) {
            return true;
        }
        lists_eq_by(self.attrs(), other.attrs(), Node::eq_with_attrs)
            && kinds_eq_by(self.kind(), other.kind(), Node::eq_with_attrs)
    }
}

// ============================================================================
// INFRASTRUCTURE/TRAITS
// ============================================================================

impl PartialEq for Node {
    fn eq(&self, other: &Node) -> bool {
        Node::ptr_eq(self, other) || kinds_eq_by(self.kind(), other.kind(), Node::eq)
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "`{}`", self)
    }
}

impl From<Value> for Node {
    fn from(value: Value) -> Self {
        Node::literal(value)
    }
}

// ============================================================================
// INTERNAL HELPERS
// ============================================================================

fn kinds_eq_by(a: &NodeKind, b: &NodeKind, eq: fn(&Node, &Node) -> bool) -> bool {
    match (a, b) {
        (NodeKind::Id(x), NodeKind::Id(y)) => x == y,
        (NodeKind::Literal(x), NodeKind::Literal(y)) => x == y,
        (
            NodeKind::Call { target: t1, args: a1 },
            NodeKind::Call { target: t2, args: a2 },
        ) => eq(t1, t2) && lists_eq_by(a1, a2, eq),
        _ => false,
    }
}

fn lists_eq_by(a: &NodeList, b: &NodeList, eq: fn(&Node, &Node) -> bool) -> bool {
    a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| eq(x, y))
}

// ============================================================================
// MODULE EXPORTS
// ============================================================================

pub mod builder;
pub mod symbols;
pub mod value;

pub use value::Value;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_arg_call_differs_from_identifier() {
        let call = Node::call_named("Foo", []);
        let id = Node::id("Foo");
        assert_ne!(call, id);
        assert!(call.calls("Foo", 0));
        assert!(!id.calls("Foo", 0));
    }

    #[test]
    fn equality_ignores_attributes_and_spans() {
        let plain = Node::call_named("f", [Node::id("x")]);
        let decorated = plain
            .plus_attrs([Node::id("inline")])
            .with_span(Span::new(3, 9));
        assert_eq!(plain, decorated);
        assert!(!plain.eq_with_attrs(&decorated));
        assert!(decorated.eq_with_attrs(&decorated.without_attrs().plus_attrs([Node::id("inline")])));
    }

    #[test]
    fn rebuilding_shares_untouched_children() {
        let arg = Node::call_named("g", [Node::literal(1)]);
        let call = Node::call_named("f", [arg.clone()]);
        let renamed = call.with_target(Node::id("h"));
        let shared = renamed.arg(0).unwrap();
        assert!(Node::ptr_eq(shared, &arg));
    }
}
