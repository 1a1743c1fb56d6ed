//! Prints nodes in the s-expression surface accepted by [`crate::syntax::parse`].
//!
//! Printing and reading round-trip, attributes included, for every tree whose
//! literals have a surface form (byte arrays do not).

use std::fmt;

use crate::ast::symbols;
use crate::ast::{Node, NodeKind};

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.has_attrs() {
            write!(f, "[")?;
            write_spaced(f, self.attrs().iter())?;
            write!(f, "] ")?;
        }
        match self.kind() {
            NodeKind::Id(name) => write_ident(f, name),
            NodeKind::Literal(value) => write!(f, "{}", value),
            NodeKind::Call { target, args } => {
                if is_sugared_substitute(target, args.len()) {
                    return write!(f, "${}", args[0]);
                }
                write!(f, "(")?;
                write!(f, "{}", target)?;
                if !args.is_empty() {
                    write!(f, " ")?;
                    write_spaced(f, args.iter())?;
                }
                write!(f, ")")
            }
        }
    }
}

/// `($ x)` prints as `$x`; a `$` target carrying attributes cannot use the sugar.
fn is_sugared_substitute(target: &Node, argc: usize) -> bool {
    argc == 1 && target.is_id_named(symbols::SUBSTITUTE) && !target.has_attrs()
}

fn write_spaced<'a>(f: &mut fmt::Formatter<'_>, nodes: impl Iterator<Item = &'a Node>) -> fmt::Result {
    for (i, node) in nodes.enumerate() {
        if i > 0 {
            write!(f, " ")?;
        }
        write!(f, "{}", node)?;
    }
    Ok(())
}

fn write_ident(f: &mut fmt::Formatter<'_>, name: &str) -> fmt::Result {
    if needs_quoting(name) {
        write!(f, "`{}`", name)
    } else {
        write!(f, "{}", name)
    }
}

fn needs_quoting(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return true;
    };
    let delimiter = |c: char| c.is_whitespace() || "()[]\";`".contains(c);
    if name.chars().any(delimiter) {
        return true;
    }
    if matches!(name, "true" | "false" | "null") {
        return true;
    }
    let second = chars.next();
    match first {
        '\'' => true,
        '$' => second.is_some(),
        c if c.is_ascii_digit() => true,
        '-' => second.is_some_and(|c| c.is_ascii_digit()),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::{Node, Value};
    use crate::syntax::parse_one;

    fn roundtrip(src: &str) {
        let node = parse_one(src).unwrap();
        let printed = node.to_string();
        let reparsed = parse_one(&printed).unwrap();
        assert!(node.eq_with_attrs(&reparsed), "{} != {}", src, printed);
    }

    #[test]
    fn prints_surface_forms() {
        let node = parse_one("[static] (matchCode x ({} (case $(... xs)) (Foo)))").unwrap();
        assert_eq!(node.to_string(), "[static] (matchCode x ({} (case $(... xs)) (Foo)))");
    }

    #[test]
    fn awkward_identifiers_are_quoted() {
        assert_eq!(Node::id("two words").to_string(), "`two words`");
        assert_eq!(Node::id("true").to_string(), "`true`");
        assert_eq!(Node::id("$x").to_string(), "`$x`");
        assert_eq!(Node::id("$").to_string(), "$");
        assert_eq!(Node::id("-").to_string(), "-");
        assert_eq!(Node::literal(Value::Float(2.0)).to_string(), "2.0");
    }

    #[test]
    fn reading_and_printing_round_trip() {
        for src in [
            "(+ $a $b)",
            "[$(... attrs)] $x",
            "$[ref] x",
            "(f $(&& x (. x IsId)) \"s\\n\" 'q' -1.25)",
            "([a] f)",
            "(`odd name` `$y` `12`)",
        ] {
            roundtrip(src);
        }
    }
}
