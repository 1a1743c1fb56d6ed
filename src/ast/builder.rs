//! Terse node constructors used by the pattern compiler and the macro front-ends.

use super::symbols::{self, host};
use super::{Node, Value};

pub fn id(name: &str) -> Node {
    Node::id(name)
}

pub fn lit(value: impl Into<Value>) -> Node {
    Node::literal(value)
}

pub fn null() -> Node {
    Node::literal(Value::Null)
}

pub fn call(name: &str, args: impl IntoIterator<Item = Node>) -> Node {
    Node::call_named(name, args)
}

/// `(. object Member)`
pub fn member(object: Node, name: &str) -> Node {
    call(host::DOT, [object, id(name)])
}

/// `(= name value)`
pub fn assign(name: Node, value: Node) -> Node {
    call(host::ASSIGN, [name, value])
}

/// `({} stmt*)`
pub fn braces(stmts: impl IntoIterator<Item = Node>) -> Node {
    call(symbols::BRACES, stmts)
}

/// `(#splice item*)`
pub fn splice(items: impl IntoIterator<Item = Node>) -> Node {
    call(symbols::SPLICE, items)
}

/// Left-folds `items` with `op`; `None` when `items` is empty.
pub fn fold_binary(op: &str, items: impl IntoIterator<Item = Node>) -> Option<Node> {
    items
        .into_iter()
        .reduce(|acc, next| call(op, [acc, next]))
}

/// Conjunction of `conds`, or `true` when there are none.
pub fn and_all(conds: impl IntoIterator<Item = Node>) -> Node {
    fold_binary(symbols::AND, conds).unwrap_or_else(|| lit(true))
}

/// Disjunction of `conds`, or `false` when there are none.
pub fn or_all(conds: impl IntoIterator<Item = Node>) -> Node {
    fold_binary(symbols::OR, conds).unwrap_or_else(|| lit(false))
}

/// Statements of a `{}` block, or the node itself as a one-statement list.
pub fn block_items(node: &Node) -> Vec<Node> {
    if node.calls_any(symbols::BRACES) && !node.has_attrs() {
        return node.args().map(|a| a.iter().cloned().collect()).unwrap_or_default();
    }
    vec![node.clone()]
}
