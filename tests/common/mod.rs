//! Shared helpers for the integration tests: parsing shorthands, a seeded
//! random tree generator, and a driver that runs compiled match code.

#![allow(dead_code)]

use nodematch::ast::builder::{call, id, lit};
use nodematch::compiler::{compile_match, MatchCase};
use nodematch::config::EngineConfig;
use nodematch::eval::{HostEvaluator, HostValue};
use nodematch::namer::Namer;
use nodematch::pattern::{Capture, Pattern};
use nodematch::syntax::parse_one;
use nodematch::{Node, NodeList};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256StarStar;

/// Name the compiled code reads the subject from; never a capture name.
pub const SUBJECT: &str = "subject__";

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn node(src: &str) -> Node {
    parse_one(src).unwrap_or_else(|e| panic!("cannot parse `{}`: {}", src, e))
}

pub fn pattern(src: &str) -> Pattern {
    Pattern::new(node(src)).unwrap_or_else(|e| panic!("invalid pattern `{}`: {}", src, e))
}

pub fn capture_value(capture: &Capture) -> HostValue {
    match capture {
        Capture::Single(node) => HostValue::Node(node.clone()),
        Capture::Many(nodes) => HostValue::List(nodes.clone()),
    }
}

/// Names bound by `pattern`, in a stable order.
pub fn bound_names(pattern: &Pattern) -> Vec<String> {
    let mut names: Vec<String> = pattern.names().map(|(n, _)| n.to_string()).collect();
    names.sort();
    names
}

/// Names bound by any alternative of a case, in a stable order.
pub fn case_names(alternatives: &[Pattern]) -> Vec<String> {
    let mut names: Vec<String> = alternatives.iter().flat_map(bound_names).collect();
    names.sort();
    names.dedup();
    names
}

/// The handler compiled for case `index`: `(tuple index name…)`.
pub fn reporting_handler(index: usize, alternatives: &[Pattern]) -> Node {
    let mut items = vec![lit(index as i64)];
    items.extend(case_names(alternatives).iter().map(|n| id(n)));
    call("tuple", items)
}

/// Compiles one case per pattern and runs the code against `candidate`.
///
/// Returns `Unit` when no case matched, otherwise the tuple the winning
/// case's [`reporting_handler`] built.
pub fn run_compiled(patterns: &[Pattern], candidate: &Node, config: &EngineConfig) -> HostValue {
    let cases: Vec<Vec<Pattern>> = patterns.iter().map(|p| vec![p.clone()]).collect();
    run_compiled_cases(&cases, candidate, config)
}

/// Like [`run_compiled`], with several alternatives per case.
pub fn run_compiled_cases(cases: &[Vec<Pattern>], candidate: &Node, config: &EngineConfig) -> HostValue {
    let cases: Vec<MatchCase> = cases
        .iter()
        .enumerate()
        .map(|(i, alternatives)| {
            MatchCase::new(
                alternatives.iter().map(|p| p.node().clone()),
                [reporting_handler(i, alternatives)],
            )
        })
        .collect();
    let code = compile_match(&id(SUBJECT), &cases, &Namer::new(), config)
        .unwrap_or_else(|e| panic!("compile failed: {}", e));
    let mut evaluator = HostEvaluator::with_config(config);
    evaluator.set(SUBJECT, candidate.clone());
    evaluator
        .eval(&code)
        .unwrap_or_else(|e| panic!("evaluating `{}` failed: {}", code, e))
}

// ============================================================================
// RANDOM TREES
// ============================================================================

const IDS: [&str; 3] = ["a", "b", "c"];
const TARGETS: [&str; 2] = ["f", "g"];
const ATTRS: [&str; 2] = ["pub", "inline"];

/// Seeded generator of candidate trees and of patterns abstracted from them.
pub struct TreeGen {
    rng: Xoshiro256StarStar,
}

/// Fresh capture names for one pattern; `prefix` keeps patterns apart.
pub struct Names {
    prefix: String,
    next: usize,
    singles: Vec<(String, Node)>,
}

impl Names {
    pub fn new(prefix: &str) -> Self {
        Names {
            prefix: prefix.to_string(),
            next: 0,
            singles: Vec::new(),
        }
    }

    fn fresh(&mut self, kind: &str) -> String {
        self.next += 1;
        format!("{}{}{}", self.prefix, kind, self.next)
    }
}

impl TreeGen {
    pub fn new(seed: u64) -> Self {
        TreeGen {
            rng: Xoshiro256StarStar::seed_from_u64(seed),
        }
    }

    pub fn chance(&mut self, p: f64) -> bool {
        self.rng.gen_bool(p)
    }

    pub fn below(&mut self, n: usize) -> usize {
        self.rng.gen_range(0..n)
    }

    fn leaf(&mut self) -> Node {
        if self.chance(0.5) {
            id(IDS[self.below(IDS.len())])
        } else {
            lit(self.below(3) as i64)
        }
    }

    /// A random tree at most `depth` calls deep.
    pub fn tree(&mut self, depth: usize) -> Node {
        let node = if depth == 0 || self.chance(0.35) {
            self.leaf()
        } else {
            let argc = self.below(4);
            let args: Vec<Node> = (0..argc).map(|_| self.tree(depth - 1)).collect();
            if self.chance(0.1) {
                Node::call(self.leaf(), args)
            } else {
                call(TARGETS[self.below(TARGETS.len())], args)
            }
        };
        if self.chance(0.15) {
            node.plus_attrs([id(ATTRS[self.below(ATTRS.len())])])
        } else {
            node
        }
    }

    /// `node` with one random subtree replaced, one argument dropped, or one
    /// argument duplicated.
    pub fn mutate(&mut self, node: &Node) -> Node {
        let Some(args) = node.args().cloned() else {
            return if self.chance(0.5) { self.tree(1) } else { node.clone() };
        };
        if args.is_empty() || self.chance(0.2) {
            return self.tree(2);
        }
        let i = self.below(args.len());
        let mut args = args;
        match self.below(3) {
            0 => {
                args.remove(i);
            }
            1 => {
                let copy = args[i].clone();
                args.insert(i, copy);
            }
            _ => {
                let mutated = self.mutate(&args[i]);
                args.set(i, mutated);
            }
        }
        node.with_args(args)
    }

    /// A pattern that `node` instantiates: some subtrees become captures,
    /// some argument runs become variadic captures.
    pub fn abstract_pattern(&mut self, node: &Node, names: &mut Names, depth: usize) -> Node {
        if depth > 0 && self.chance(0.3) {
            return self.capture(node, names);
        }
        let Some(args) = node.args() else {
            return node.without_attrs();
        };
        let target = node.target().cloned().unwrap_or_else(|| id("f"));
        let target = if !target.is_id() && self.chance(0.5) {
            self.capture(&target, names)
        } else {
            target.without_attrs()
        };

        let mut items: Vec<Node> = args.iter().cloned().collect();
        let variadic = if self.chance(0.35) {
            let start = self.below(items.len() + 1);
            let end = start + self.below(items.len() - start + 1);
            Some((start, end))
        } else {
            None
        };
        let mut pattern_args = Vec::new();
        for (i, item) in items.drain(..).enumerate() {
            match variadic {
                Some((start, _)) if i == start => pattern_args.push(variadic_capture(names)),
                _ => {}
            }
            if matches!(variadic, Some((start, end)) if i >= start && i < end) {
                continue;
            }
            pattern_args.push(self.abstract_pattern(&item, names, depth + 1));
        }
        if matches!(variadic, Some((start, _)) if start == args.len()) {
            pattern_args.push(variadic_capture(names));
        }

        let pattern = Node::call(target, pattern_args);
        if node.has_attrs() && self.chance(0.4) {
            let attrs = names.fresh("a");
            pattern.with_attrs(NodeList::unit(call("$", [call("...", [id(&attrs)])])))
        } else {
            pattern
        }
    }

    /// A capture `node` satisfies: guards are chosen to hold for it and a
    /// name is reused only for an equal subtree.
    fn capture(&mut self, node: &Node, names: &mut Names) -> Node {
        let equal: Vec<String> = names
            .singles
            .iter()
            .filter(|(_, seen)| seen == node)
            .map(|(name, _)| name.clone())
            .collect();
        if !equal.is_empty() && self.chance(0.5) {
            return call("$", [id(&equal[self.below(equal.len())])]);
        }
        let name = names.fresh("x");
        names.singles.push((name.clone(), node.clone()));
        let guard = match self.below(4) {
            0 if node.is_id() => Some("(. # IsId)"),
            1 if !node.is_call() => Some("(! (. # IsCall))"),
            _ => None,
        };
        match guard {
            Some(guard) => call("$", [call("&&", [id(&name), parse_one(guard).unwrap_or_else(|_| id("true"))])]),
            None => call("$", [id(&name)]),
        }
    }
}

fn variadic_capture(names: &mut Names) -> Node {
    let name = names.fresh("v");
    call("$", [call("...", [id(&name)])])
}
