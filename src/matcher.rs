//! # Runtime matcher
//!
//! Interpretive, recursive-descent matching of one candidate tree against one
//! validated [`Pattern`], producing a [`Captures`] map. Used directly by
//! `replace`, `define`, `unroll`, `staticMatches` and `[static] matchCode`.
//!
//! ## Order of checks
//!
//! For every pattern node the matcher looks at, in order:
//!
//! 1. the attribute pattern (`[$(... a)]`), which binds all candidate attributes;
//! 2. a capture (`$x`), which binds the candidate after running its guard;
//! 3. identifiers by name and literals by value;
//! 4. calls: argument count, then target, leading arguments, the variadic
//!    slice and the trailing arguments.
//!
//! The pattern compiler emits its tests in the same order so guards observe
//! the same earlier captures on both paths.
//!
//! A mismatch is `Ok(false)` and may leave partial bindings behind; callers
//! clear the map before the next attempt ([`Matcher::match_any`] does).
//!
//! ```rust
//! use nodematch::matcher::match_pattern;
//! use nodematch::syntax::parse_one;
//! let caps = match_pattern(&parse_one("(+ 1 2)").unwrap(), &parse_one("(+ $a $b)").unwrap())
//!     .unwrap()
//!     .unwrap();
//! assert_eq!(caps.single("a").unwrap().to_string(), "1");
//! ```

use crate::ast::{Node, NodeKind, NodeList};
use crate::config::EngineConfig;
use crate::diagnostics::EngineError;
use crate::eval::{GuardEvaluator, HostEvaluator};
use crate::pattern::{attribute_patterns, Capture, CaptureSpec, Captures, Layout, Pattern};
use crate::err_ctx;

// ============================================================================
// MATCHER
// ============================================================================

pub struct Matcher<'g> {
    guards: &'g mut dyn GuardEvaluator,
    max_depth: usize,
}

impl<'g> Matcher<'g> {
    pub fn new(guards: &'g mut dyn GuardEvaluator) -> Self {
        Matcher {
            guards,
            max_depth: EngineConfig::default().max_depth,
        }
    }

    pub fn with_config(guards: &'g mut dyn GuardEvaluator, config: &EngineConfig) -> Self {
        Matcher {
            guards,
            max_depth: config.max_depth,
        }
    }

    /// Matches `candidate` against `pattern`.
    ///
    /// On success `unmatched_attrs` holds the candidate's top-level attributes
    /// the pattern did not claim: all of them, unless the pattern has an
    /// attribute capture or is itself a capture (which takes the candidate
    /// whole).
    pub fn matches(
        &mut self,
        candidate: &Node,
        pattern: &Pattern,
        captures: &mut Captures,
        unmatched_attrs: &mut NodeList,
    ) -> Result<bool, EngineError> {
        unmatched_attrs.clear();
        let pat = pattern.node();
        let matched = self.match_node(candidate, pat, captures, 0)?;
        log::trace!(
            "`{}` {} `{}`",
            candidate,
            if matched { "matches" } else { "does not match" },
            pat
        );
        if matched && attribute_patterns(pat).is_empty() && CaptureSpec::of(pat)?.is_none() {
            unmatched_attrs.extend(candidate.attrs().iter().cloned());
        }
        Ok(matched)
    }

    /// Tries `patterns` in order; the first that matches wins.
    ///
    /// Returns the index of the winning pattern and its unmatched attributes.
    /// `captures` is cleared before every attempt and left empty when nothing
    /// matches.
    pub fn match_any(
        &mut self,
        candidate: &Node,
        patterns: &[Pattern],
        captures: &mut Captures,
    ) -> Result<Option<(usize, NodeList)>, EngineError> {
        let mut unmatched = NodeList::new();
        for (i, pattern) in patterns.iter().enumerate() {
            captures.clear();
            if self.matches(candidate, pattern, captures, &mut unmatched)? {
                return Ok(Some((i, unmatched)));
            }
        }
        captures.clear();
        Ok(None)
    }

    fn match_node(
        &mut self,
        candidate: &Node,
        pattern: &Node,
        captures: &mut Captures,
        depth: usize,
    ) -> Result<bool, EngineError> {
        if depth > self.max_depth {
            return Err(err_ctx!(
                RecursionLimit,
                candidate.span(),
                "matching nested deeper than {} levels",
                self.max_depth
            ));
        }

        let mut claimed_attrs = false;
        match attribute_patterns(pattern).as_slice() {
            [] => {}
            [attr] => {
                let spec = variadic_spec(attr)?;
                let value = Capture::Many(candidate.attrs().clone());
                if !self.bind(&spec, value, captures)? {
                    return Ok(false);
                }
                claimed_attrs = true;
            }
            more => {
                return Err(err_ctx!(
                    MalformedPattern,
                    more[0].span(),
                    "attribute patterns must be a single `$(... name)` capture"
                ))
            }
        }

        if let Some(spec) = CaptureSpec::of(pattern)? {
            if spec.variadic {
                return Err(err_ctx!(
                    MalformedPattern,
                    pattern.span(),
                    "variadic capture `{}` outside an argument list",
                    pattern
                ));
            }
            let value = if claimed_attrs {
                candidate.without_attrs()
            } else {
                candidate.clone()
            };
            return self.bind(&spec, Capture::Single(value), captures);
        }

        match pattern.kind() {
            NodeKind::Id(name) => Ok(candidate.is_id_named(name)),
            NodeKind::Literal(value) => Ok(candidate.value() == Some(value)),
            NodeKind::Call { target, args } => {
                let (Some(c_target), Some(c_args)) = (candidate.target(), candidate.args()) else {
                    return Ok(false);
                };
                let layout = Layout::of(args)?;
                if !layout.accepts(c_args.len()) {
                    return Ok(false);
                }
                if !self.match_node(c_target, target, captures, depth + 1)? {
                    return Ok(false);
                }
                self.match_args(c_args, args, &layout, captures, depth + 1)
            }
        }
    }

    fn match_args(
        &mut self,
        c_args: &NodeList,
        p_args: &NodeList,
        layout: &Layout,
        captures: &mut Captures,
        depth: usize,
    ) -> Result<bool, EngineError> {
        let n = c_args.len();
        let Some(range) = layout.slice(n) else {
            return Ok(false);
        };

        for i in 0..layout.leading {
            if !self.match_node(&c_args[i], &p_args[i], captures, depth)? {
                return Ok(false);
            }
        }

        let Some(v) = layout.variadic else {
            return Ok(true);
        };
        let spec = variadic_spec(&p_args[v])?;
        let slice = c_args.clone().slice(range);
        if !self.bind(&spec, Capture::Many(slice), captures)? {
            return Ok(false);
        }

        for i in v + 1..p_args.len() {
            let ci = layout.candidate_index(i, n);
            if !self.match_node(&c_args[ci], &p_args[i], captures, depth)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn bind(&mut self, spec: &CaptureSpec, value: Capture, captures: &mut Captures) -> Result<bool, EngineError> {
        if let Some(guard) = &spec.guard {
            let passed = self
                .guards
                .eval_guard(guard, &spec.name, &value, captures)
                .map_err(|e| e.or_span(spec.span))?;
            if !passed {
                log::trace!("guard on `{}` rejected the candidate", spec.name);
                return Ok(false);
            }
        }
        Ok(captures.bind(&spec.name, value))
    }
}

fn variadic_spec(node: &Node) -> Result<CaptureSpec, EngineError> {
    CaptureSpec::of(node)?.filter(|s| s.variadic).ok_or_else(|| {
        err_ctx!(
            MalformedPattern,
            node.span(),
            "expected a variadic capture, found `{}`",
            node
        )
    })
}

// ============================================================================
// CONVENIENCE ENTRY POINTS
// ============================================================================

/// Validates `pattern` and matches it against `candidate` with the host
/// evaluator handling guards. `Ok(None)` is a plain mismatch.
pub fn match_pattern(candidate: &Node, pattern: &Node) -> Result<Option<Captures>, EngineError> {
    let pattern = Pattern::new(pattern.clone())?;
    let mut guards = HostEvaluator::new();
    let mut matcher = Matcher::new(&mut guards);
    let mut captures = Captures::new();
    let mut unmatched = NodeList::new();
    Ok(matcher
        .matches(candidate, &pattern, &mut captures, &mut unmatched)?
        .then_some(captures))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::ErrorKind;
    use crate::syntax::parse_one;

    fn try_match(pattern: &str, candidate: &str) -> Option<Captures> {
        match_pattern(&parse_one(candidate).unwrap(), &parse_one(pattern).unwrap()).unwrap()
    }

    #[test]
    fn literal_patterns_compare_values() {
        assert!(try_match("(f 1)", "(f 1)").is_some());
        assert!(try_match("(f 1)", "(f 1.0)").is_none());
        assert!(try_match("(f null)", "(f null)").is_some());
    }

    #[test]
    fn target_may_itself_be_a_pattern() {
        let caps = try_match("((. Invalid $F) $x)", "((. Invalid Foo) 3)").unwrap();
        assert_eq!(caps.single("F").unwrap().to_string(), "Foo");
    }

    #[test]
    fn variadic_in_the_middle_takes_the_rest() {
        let caps = try_match("(f $a $(... mid) $z)", "(f 1 2 3 4)").unwrap();
        assert_eq!(caps.many("mid").unwrap().len(), 2);
        assert_eq!(caps.single("z").unwrap().to_string(), "4");
        assert!(try_match("(f $a $(... mid) $z)", "(f 1)").is_none());
    }

    #[test]
    fn guards_filter_candidates() {
        let pat = "(f $(&& x (. # IsId)))";
        assert!(try_match(pat, "(f a)").is_some());
        assert!(try_match(pat, "(f 1)").is_none());
        let counted = "(f $(&& (... xs) (> (. xs Count) 1)))";
        assert!(try_match(counted, "(f 1 2)").is_some());
        assert!(try_match(counted, "(f 1)").is_none());
    }

    #[test]
    fn match_any_takes_the_first_match() {
        let pats = vec![
            Pattern::new(parse_one("(f $x)").unwrap()).unwrap(),
            Pattern::new(parse_one("(f 1)").unwrap()).unwrap(),
        ];
        let mut ev = HostEvaluator::new();
        let mut matcher = Matcher::new(&mut ev);
        let mut caps = Captures::new();
        let (which, _) = matcher
            .match_any(&parse_one("(f 1)").unwrap(), &pats, &mut caps)
            .unwrap()
            .unwrap();
        assert_eq!(which, 0);
        assert!(caps.contains("x"));
    }

    #[test]
    fn unclaimed_top_level_attributes_are_reported() {
        let pat = Pattern::new(parse_one("(f $x)").unwrap()).unwrap();
        let mut ev = HostEvaluator::new();
        let mut matcher = Matcher::new(&mut ev);
        let mut caps = Captures::new();
        let mut unmatched = NodeList::new();
        let cand = parse_one("[inline public] (f 1)").unwrap();
        assert!(matcher.matches(&cand, &pat, &mut caps, &mut unmatched).unwrap());
        assert_eq!(unmatched.len(), 2);
    }

    #[test]
    fn deep_candidates_hit_the_depth_limit() {
        let mut cand = Node::id("x");
        let mut pat = Node::id("x");
        for _ in 0..20 {
            cand = Node::call_named("f", [cand]);
            pat = Node::call_named("f", [pat]);
        }
        let pattern = Pattern::new(pat).unwrap();
        let mut ev = HostEvaluator::new();
        let config = EngineConfig {
            max_depth: 5,
            ..EngineConfig::default()
        };
        let mut matcher = Matcher::with_config(&mut ev, &config);
        let err = matcher
            .matches(&cand, &pattern, &mut Captures::new(), &mut NodeList::new())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RecursionLimit);
    }
}
