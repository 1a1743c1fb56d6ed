//! Template expansion.
//!
//! [`expand`] rewrites a template with a [`Captures`] map:
//!
//! - `$x` bound to one node is replaced by that node; attributes written on
//!   the `$x` itself are appended to the node's own.
//! - `$xs` or `$(... xs)` bound to a list, inside an argument or attribute
//!   list, is spliced in place of its one slot. In any other position it is a
//!   `ScalarSplice` error.
//! - `$y` with no binding is left as written.
//! - Inserted nodes are never expanded again, and subtrees that contain no
//!   bound capture come back as the same allocation.

use crate::ast::{Node, NodeKind, NodeList, Symbol};
use crate::config::EngineConfig;
use crate::diagnostics::EngineError;
use crate::pattern::{attribute_patterns, Capture, CaptureSpec, Captures};
use crate::err_ctx;

/// Expands `template` with `captures` under the default depth limit.
///
/// ```rust
/// use nodematch::ast::Node;
/// use nodematch::expand::expand;
/// use nodematch::pattern::{Capture, Captures};
/// use nodematch::syntax::parse_one;
/// let mut caps = Captures::new();
/// caps.insert("args", Capture::Many([Node::literal(1), Node::literal(2)].into_iter().collect()));
/// let out = expand(&parse_one("(Bar 0 $(... args))").unwrap(), &caps).unwrap();
/// assert_eq!(out.to_string(), "(Bar 0 1 2)");
/// ```
pub fn expand(template: &Node, captures: &Captures) -> Result<Node, EngineError> {
    Expander::new(captures).expand(template)
}

pub struct Expander<'c> {
    captures: &'c Captures,
    max_depth: usize,
}

impl<'c> Expander<'c> {
    pub fn new(captures: &'c Captures) -> Self {
        Expander {
            captures,
            max_depth: EngineConfig::default().max_depth,
        }
    }

    pub fn with_config(captures: &'c Captures, config: &EngineConfig) -> Self {
        Expander {
            captures,
            max_depth: config.max_depth,
        }
    }

    pub fn expand(&self, template: &Node) -> Result<Node, EngineError> {
        self.expand_node(template, 0)
    }

    fn expand_node(&self, node: &Node, depth: usize) -> Result<Node, EngineError> {
        if depth > self.max_depth {
            return Err(err_ctx!(
                RecursionLimit,
                node.span(),
                "template nested deeper than {} levels",
                self.max_depth
            ));
        }

        if let Some(name) = capture_name(node) {
            match self.captures.get(&name) {
                Some(Capture::Single(bound)) => {
                    let extra: NodeList = attribute_patterns(node).into_iter().cloned().collect();
                    let extra = self.expand_list(&extra, depth + 1)?.unwrap_or(extra);
                    return Ok(bound.plus_attrs(extra));
                }
                Some(Capture::Many(_)) => {
                    return Err(err_ctx!(
                        ScalarSplice,
                        node.span(),
                        "`{}` holds a node list and cannot stand for a single node",
                        name
                    )
                    .with_help("list captures can only be spliced into an argument or attribute list"));
                }
                None => return Ok(node.clone()),
            }
        }

        let attrs = self.expand_list(node.attrs(), depth + 1)?;
        let rebuilt = match node.kind() {
            NodeKind::Id(_) | NodeKind::Literal(_) => node.clone(),
            NodeKind::Call { target, args } => {
                let new_target = self.expand_node(target, depth + 1)?;
                let new_args = self.expand_list(args, depth + 1)?;
                if Node::ptr_eq(&new_target, target) && new_args.is_none() {
                    node.clone()
                } else {
                    node.with_target(new_target)
                        .with_args(new_args.unwrap_or_else(|| args.clone()))
                }
            }
        };
        Ok(match attrs {
            Some(attrs) => rebuilt.with_attrs(attrs),
            None => rebuilt,
        })
    }

    /// Expands list items with splicing; `None` when nothing changed.
    fn expand_list(&self, items: &NodeList, depth: usize) -> Result<Option<NodeList>, EngineError> {
        let mut out = NodeList::new();
        let mut changed = false;
        for item in items {
            if let Some(Capture::Many(spliced)) = capture_name(item).and_then(|n| self.captures.get(&n)) {
                out.extend(spliced.iter().cloned());
                changed = true;
                continue;
            }
            let expanded = self.expand_node(item, depth)?;
            changed |= !Node::ptr_eq(&expanded, item);
            out.push_back(expanded);
        }
        Ok(changed.then_some(out))
    }
}

/// Name referenced by a `$` node in a template. A `$` form that does not
/// decode as a capture is ordinary template text.
fn capture_name(node: &Node) -> Option<Symbol> {
    CaptureSpec::of(node).ok().flatten().map(|spec| spec.name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::ErrorKind;
    use crate::syntax::parse_one;

    fn caps(pairs: &[(&str, Capture)]) -> Captures {
        let mut c = Captures::new();
        for (k, v) in pairs {
            c.insert(*k, v.clone());
        }
        c
    }

    fn list(items: &[&str]) -> Capture {
        Capture::Many(items.iter().map(|s| Node::id(*s)).collect())
    }

    #[test]
    fn splices_interleave_with_plain_items() {
        let c = caps(&[("a", list(&["x", "y"])), ("b", list(&[])), ("k", Capture::Single(Node::literal(7)))]);
        let out = expand(&parse_one("(f $a 1 $(... b) $k $a)").unwrap(), &c).unwrap();
        assert_eq!(out.to_string(), "(f x y 1 7 x y)");
    }

    #[test]
    fn attribute_lists_splice_too() {
        let c = caps(&[("attrs", list(&["public", "static"]))]);
        let out = expand(&parse_one("[$(... attrs) extra] (def f)").unwrap(), &c).unwrap();
        assert_eq!(out.to_string(), "[public static extra] (def f)");
    }

    #[test]
    fn list_in_scalar_position_is_an_error() {
        let c = caps(&[("xs", list(&["a"]))]);
        let err = expand(&parse_one("($xs 1)").unwrap(), &c).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ScalarSplice);
        let err = expand(&parse_one("$xs").unwrap(), &c).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ScalarSplice);
    }

    #[test]
    fn unbound_captures_stay_and_inserted_nodes_are_not_rescanned() {
        let c = caps(&[("x", Capture::Single(parse_one("$y").unwrap())), ("y", Capture::Single(Node::id("no")))]);
        let out = expand(&parse_one("(g $x $z)").unwrap(), &c).unwrap();
        assert_eq!(out.to_string(), "(g $y $z)");
    }

    #[test]
    fn capture_free_templates_are_shared() {
        let template = parse_one("(f (g 1) [a] h)").unwrap();
        let out = expand(&template, &Captures::new()).unwrap();
        assert!(Node::ptr_eq(&out, &template));
    }

    #[test]
    fn attributes_on_a_substitution_are_appended() {
        let c = caps(&[("x", Capture::Single(parse_one("[a] v").unwrap()))]);
        let out = expand(&parse_one("[b] $x").unwrap(), &c).unwrap();
        assert_eq!(out.to_string(), "[a b] v");
    }
}
