//! Nodematch reader - s-expression surface to [`Node`] trees.
//!
//! Reads the small documentation/test surface described in [`crate::syntax`].
//! The reader is purely syntactic: `$x` is just sugar for the call `($ x)`,
//! and it is the pattern layer that gives `$` its meaning.

use pest::{error::Error, iterators::Pair, Parser};
use pest_derive::Parser;

use crate::ast::{Node, NodeKind, NodeList, Span, Value};
use crate::ast::symbols;
use crate::diagnostics::{EngineError, ErrorContext};

#[derive(Parser)]
#[grammar = "syntax/grammar.pest"]
struct NodeParser;

// ============================================================================
// PUBLIC API
// ============================================================================

/// Parses source text into a sequence of top-level nodes.
///
/// # Examples
///
/// ```rust
/// use nodematch::syntax::parse;
/// let nodes = parse("(+ $a $b) [public] (Foo)").unwrap();
/// assert_eq!(nodes.len(), 2);
/// assert!(nodes[1].calls("Foo", 0));
/// assert!(nodes[1].has_attrs());
/// ```
pub fn parse(source_text: &str) -> Result<Vec<Node>, EngineError> {
    let mut pairs = NodeParser::parse(Rule::program, source_text).map_err(convert_parse_error)?;

    let Some(program) = pairs.next() else {
        return Ok(vec![]);
    };

    program
        .into_inner()
        .filter(|p| p.as_rule() != Rule::EOI)
        .map(build_node)
        .collect()
}

/// Parses source text that must contain exactly one node.
pub fn parse_one(source_text: &str) -> Result<Node, EngineError> {
    let mut nodes = parse(source_text)?;
    if nodes.len() != 1 {
        return Err(EngineError::Parse {
            message: format!("expected exactly one node, found {}", nodes.len()),
            ctx: ErrorContext::with_span(Span::new(0, source_text.len())),
        });
    }
    Ok(nodes.remove(0))
}

// ============================================================================
// NODE BUILDERS
// ============================================================================

fn build_node(pair: Pair<Rule>) -> Result<Node, EngineError> {
    let span = get_span(&pair);

    match pair.as_rule() {
        Rule::node => {
            let mut attrs = NodeList::new();
            let mut core = None;
            for inner in pair.into_inner() {
                if inner.as_rule() == Rule::attrs {
                    for attr in inner.into_inner() {
                        attrs.push_back(build_node(attr)?);
                    }
                } else {
                    core = Some(build_node(inner)?);
                }
            }
            // grammar guarantees an atom follows the attributes
            let core = core.ok_or_else(|| make_error("missing node after attributes", span))?;
            Ok(Node::from_parts(core.kind().clone(), attrs, span))
        }

        Rule::capture => {
            let body = pair
                .into_inner()
                .next()
                .and_then(|b| b.into_inner().next())
                .ok_or_else(|| make_error("missing node after `$`", span))?;
            let inner = build_node(body)?;
            Ok(make_call(Node::id(symbols::SUBSTITUTE).with_span(Span::new(span.start, span.start + 1)), vec![inner], span))
        }

        Rule::call => {
            let mut items = pair.into_inner();
            let target = items
                .next()
                .ok_or_else(|| make_error("empty call", span))
                .and_then(build_node)?;
            let args = items.map(build_node).collect::<Result<Vec<_>, _>>()?;
            Ok(make_call(target, args, span))
        }

        Rule::string => {
            let text = pair.into_inner().next().map_or("", |p| p.as_str());
            let content = unescape(text, span)?;
            Ok(make_literal(Value::from(content), span))
        }

        Rule::char_lit => {
            let text = pair.into_inner().next().map_or("", |p| p.as_str());
            let content = unescape(text, span)?;
            let mut chars = content.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Ok(make_literal(Value::Char(c), span)),
                _ => Err(make_error(format!("invalid character literal '{}'", text), span)),
            }
        }

        Rule::number => {
            let text = pair.as_str();
            let value = if text.contains(['.', 'e', 'E']) {
                text.parse::<f64>().map(Value::Float).ok()
            } else {
                text.parse::<i64>().map(Value::Int).ok()
            };
            let value = value.ok_or_else(|| make_error(format!("invalid number '{}'", text), span))?;
            Ok(make_literal(value, span))
        }

        Rule::boolean => Ok(make_literal(Value::Bool(pair.as_str() == "true"), span)),

        Rule::null => Ok(make_literal(Value::Null, span)),

        Rule::quoted_ident => {
            let text = pair.into_inner().next().map_or("", |p| p.as_str());
            Ok(make_id(text, span))
        }

        Rule::ident => Ok(make_id(pair.as_str(), span)),

        rule => Err(make_error(format!("unsupported rule: {:?}", rule), span)),
    }
}

// ============================================================================
// NODE CONSTRUCTORS
// ============================================================================

fn make_id(text: &str, span: Span) -> Node {
    Node::from_parts(NodeKind::Id(text.into()), NodeList::new(), span)
}

fn make_literal(value: Value, span: Span) -> Node {
    Node::from_parts(NodeKind::Literal(value), NodeList::new(), span)
}

fn make_call(target: Node, args: Vec<Node>, span: Span) -> Node {
    Node::from_parts(
        NodeKind::Call {
            target,
            args: args.into_iter().collect(),
        },
        NodeList::new(),
        span,
    )
}

// ============================================================================
// UTILITIES
// ============================================================================

fn get_span(pair: &Pair<Rule>) -> Span {
    Span {
        start: pair.as_span().start(),
        end: pair.as_span().end(),
    }
}

fn unescape(text: &str, span: Span) -> Result<String, EngineError> {
    let mut result = String::with_capacity(text.len());
    let mut chars = text.chars();

    while let Some(ch) = chars.next() {
        if ch != '\\' {
            result.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => result.push('\n'),
            Some('t') => result.push('\t'),
            Some('r') => result.push('\r'),
            Some('0') => result.push('\0'),
            Some('\\') => result.push('\\'),
            Some('"') => result.push('"'),
            Some('\'') => result.push('\''),
            Some(other) => {
                return Err(make_error(format!("unknown escape '\\{}'", other), span));
            }
            None => return Err(make_error("dangling escape", span)),
        }
    }

    Ok(result)
}

// ============================================================================
// ERROR HANDLING
// ============================================================================

fn make_error(message: impl Into<String>, span: Span) -> EngineError {
    EngineError::Parse {
        message: message.into(),
        ctx: ErrorContext::with_span(span),
    }
}

fn convert_parse_error(error: Error<Rule>) -> EngineError {
    let span = match error.location {
        pest::error::InputLocation::Pos(pos) => Span {
            start: pos,
            end: pos,
        },
        pest::error::InputLocation::Span((start, end)) => Span { start, end },
    };

    let rendered = error.variant.message();
    let message = if rendered.contains("EOI") && rendered.contains("node") {
        "unexpected closing delimiter".to_string()
    } else {
        rendered.to_string()
    };

    make_error(message, span).with_help("check for unbalanced `(`, `[` or a missing closing quote")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::ErrorKind;

    #[test]
    fn empty_input_has_no_nodes() {
        assert!(parse("").unwrap().is_empty());
        assert!(parse("  ; only a comment\n").unwrap().is_empty());
    }

    #[test]
    fn dollar_prefix_is_sugar_for_substitute_call() {
        let sugar = parse_one("$x").unwrap();
        let plain = parse_one("($ x)").unwrap();
        assert_eq!(sugar, plain);
        assert!(sugar.calls("$", 1));
    }

    #[test]
    fn lone_dollar_is_an_identifier() {
        let node = parse_one("($ (... xs))").unwrap();
        assert!(node.target().unwrap().is_id_named("$"));
        assert!(node.arg(0).unwrap().calls("...", 1));
    }

    #[test]
    fn literals_keep_their_types() {
        let nodes = parse(r#"42 -7 1.5 "a\"b" 'c' true null"#).unwrap();
        let values: Vec<_> = nodes.iter().map(|n| n.value().cloned().unwrap()).collect();
        assert_eq!(
            values,
            vec![
                Value::Int(42),
                Value::Int(-7),
                Value::Float(1.5),
                Value::from("a\"b"),
                Value::Char('c'),
                Value::Bool(true),
                Value::Null,
            ]
        );
    }

    #[test]
    fn unmatched_paren_is_a_parse_error() {
        let err = parse("(a b").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);
    }

    #[test]
    fn spans_cover_source_text() {
        let node = parse_one("  (f x)").unwrap();
        assert_eq!(node.span(), Span::new(2, 7));
    }
}
