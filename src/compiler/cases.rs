//! Match cases and the surface forms that declare them.

use crate::ast::builder::block_items;
use crate::ast::{symbols, Node, Span};
use crate::diagnostics::EngineError;
use crate::err_ctx;

/// One case of a `matchCode` body: alternatives plus the handler statements.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchCase {
    /// Pattern alternatives; empty for the default case.
    pub patterns: Vec<Node>,
    pub handler: Vec<Node>,
    pub span: Span,
}

impl MatchCase {
    pub fn new(patterns: impl IntoIterator<Item = Node>, handler: impl IntoIterator<Item = Node>) -> Self {
        let patterns: Vec<Node> = patterns.into_iter().collect();
        let span = patterns
            .iter()
            .map(Node::span)
            .reduce(Span::cover)
            .unwrap_or_default();
        MatchCase {
            patterns,
            handler: handler.into_iter().collect(),
            span,
        }
    }

    pub fn default_case(handler: impl IntoIterator<Item = Node>) -> Self {
        MatchCase {
            patterns: Vec::new(),
            handler: handler.into_iter().collect(),
            span: Span::default(),
        }
    }

    pub fn is_default(&self) -> bool {
        self.patterns.is_empty()
    }

    fn at(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Reads the cases of a `matchCode` body.
    ///
    /// Two spellings are accepted and may be mixed:
    ///
    /// - labelled blocks: `(case P1 P2)` or `(default)` followed by handler
    ///   statements; consecutive labels with nothing between them merge into
    ///   one case;
    /// - arrows: `(=> P handler)`, `(=> (case P1 P2) handler)`,
    ///   `(=> (default) handler)`, where a `{}` handler contributes its
    ///   statements.
    ///
    /// ```rust
    /// use nodematch::compiler::MatchCase;
    /// use nodematch::syntax::parse_one;
    /// let body = parse_one("({} (case foo) (case FOO) (Foo) (default) (Other))").unwrap();
    /// let cases = MatchCase::parse_block(&body).unwrap();
    /// assert_eq!(cases.len(), 2);
    /// assert_eq!(cases[0].patterns.len(), 2);
    /// assert!(cases[1].is_default());
    /// ```
    pub fn parse_block(body: &Node) -> Result<Vec<MatchCase>, EngineError> {
        let mut cases = Vec::new();
        let mut current: Option<MatchCase> = None;

        for item in block_items(body) {
            if item.calls_any(symbols::CASE) {
                let patterns: Vec<Node> = item.args().map(|a| a.iter().cloned().collect()).unwrap_or_default();
                if patterns.is_empty() {
                    return Err(err_ctx!(MalformedPattern, item.span(), "`case` needs at least one pattern"));
                }
                match current.as_mut() {
                    // `case a: case b: stmt` falls through into one case
                    Some(open) if open.handler.is_empty() && !open.is_default() => {
                        open.patterns.extend(patterns);
                        open.span = open.span.cover(item.span());
                    }
                    _ => {
                        cases.extend(current.take());
                        current = Some(MatchCase::new(patterns, []).at(item.span()));
                    }
                }
            } else if is_default_label(&item) {
                cases.extend(current.take());
                current = Some(MatchCase::default_case([]).at(item.span()));
            } else if item.calls_min(symbols::ARROW, 2) {
                cases.extend(current.take());
                cases.push(parse_arrow(&item)?);
            } else {
                match current.as_mut() {
                    Some(open) => open.handler.push(item),
                    None => {
                        return Err(err_ctx!(
                            MalformedPattern,
                            item.span(),
                            "statement `{}` appears before the first case",
                            item
                        ))
                    }
                }
            }
        }
        cases.extend(current);
        Ok(cases)
    }
}

fn is_default_label(item: &Node) -> bool {
    item.calls(symbols::DEFAULT, 0) || item.is_id_named(symbols::DEFAULT)
}

fn parse_arrow(item: &Node) -> Result<MatchCase, EngineError> {
    let args = item.args().cloned().unwrap_or_default();
    let head = &args[0];
    let handler: Vec<Node> = args.iter().skip(1).flat_map(block_items).collect();
    if is_default_label(head) {
        return Ok(MatchCase::default_case(handler).at(item.span()));
    }
    let patterns: Vec<Node> = if head.calls_any(symbols::CASE) {
        head.args().map(|a| a.iter().cloned().collect()).unwrap_or_default()
    } else {
        vec![head.clone()]
    };
    if patterns.is_empty() {
        return Err(err_ctx!(MalformedPattern, head.span(), "`case` needs at least one pattern"));
    }
    Ok(MatchCase::new(patterns, handler).at(item.span()))
}

/// Rejects a default case that is not last, and more than one default.
pub fn check_order(cases: &[MatchCase]) -> Result<(), EngineError> {
    let last = cases.len().saturating_sub(1);
    for (i, case) in cases.iter().enumerate() {
        if case.is_default() && i != last {
            return Err(err_ctx!(
                MalformedPattern,
                case.span,
                "the default case must be the last case"
            )
            .with_help("move `default` after every other case"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::ErrorKind;
    use crate::syntax::parse_one;

    fn parse(src: &str) -> Result<Vec<MatchCase>, EngineError> {
        MatchCase::parse_block(&parse_one(src).unwrap())
    }

    #[test]
    fn arrows_and_labels_mix() {
        let cases = parse("({} (=> (f $x) ({} (a) (b))) (case 1 2) (c) (=> (default) (d)))").unwrap();
        assert_eq!(cases.len(), 3);
        assert_eq!(cases[0].handler.len(), 2);
        assert_eq!(cases[1].patterns.len(), 2);
        assert!(cases[2].is_default());
    }

    #[test]
    fn statements_need_a_case() {
        assert_eq!(parse("({} (stray) (case x))").unwrap_err().kind(), ErrorKind::MalformedPattern);
    }

    #[test]
    fn default_must_be_last() {
        let cases = parse("({} (default) (a) (case x) (b))").unwrap();
        assert_eq!(check_order(&cases).unwrap_err().kind(), ErrorKind::MalformedPattern);
        let twice = parse("({} (default) (a) (default) (b))").unwrap();
        assert!(check_order(&twice).is_err());
    }
}
