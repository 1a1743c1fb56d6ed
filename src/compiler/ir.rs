//! Test/binding IR: the compiler's working list before it becomes an `if` chain.

use crate::ast::builder::{self, call, null};
use crate::ast::symbols::host;
use crate::ast::{Node, NodeKind};

/// One entry of a compiled pattern.
#[derive(Debug, Clone, PartialEq)]
pub enum Test {
    /// Boolean expression ANDed into the case condition.
    Condition(Node),
    /// Binding `(= name value)` that may run once the case is accepted.
    Statement(Node),
}

/// A folded pattern: its condition and the bindings deferred to the branch.
#[derive(Debug, Clone, PartialEq)]
pub struct Folded {
    pub condition: Node,
    pub deferred: Vec<Node>,
}

/// Folds a test list into one condition.
///
/// With `defer` set, a statement is moved into the accepted branch unless a
/// later condition reads the variable it assigns; otherwise it becomes the
/// condition `(!= (= name value) null)` at its position.
pub fn fold(tests: Vec<Test>, defer: bool) -> Folded {
    let mut conds = Vec::new();
    let mut deferred = Vec::new();
    for (i, test) in tests.iter().enumerate() {
        match test {
            Test::Condition(cond) => conds.push(cond.clone()),
            Test::Statement(stmt) => {
                let read_later = assigned_name(stmt).is_some_and(|name| {
                    tests[i + 1..].iter().any(|t| match t {
                        Test::Condition(c) => mentions(c, name),
                        Test::Statement(_) => false,
                    })
                });
                if defer && !read_later {
                    deferred.push(stmt.clone());
                } else {
                    conds.push(call(host::NEQ, [stmt.clone(), null()]));
                }
            }
        }
    }
    Folded {
        condition: builder::and_all(conds),
        deferred,
    }
}

fn assigned_name(stmt: &Node) -> Option<&str> {
    stmt.arg(0).and_then(Node::name).map(|n| &**n)
}

/// True when an identifier named `name` occurs anywhere in `code`.
pub fn mentions(code: &Node, name: &str) -> bool {
    match code.kind() {
        NodeKind::Id(id) => &**id == name,
        NodeKind::Literal(_) => false,
        NodeKind::Call { target, args } => {
            mentions(target, name) || args.iter().any(|a| mentions(a, name))
        }
    }
}
