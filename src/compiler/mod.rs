//! # Pattern compiler
//!
//! Turns the cases of a `matchCode` body into code that, run later by the
//! host, picks the first matching case. Each pattern is walked exactly like
//! the runtime matcher walks it, but instead of deciding, the walk emits one
//! test per check into a [`Test`] list.
//!
//! ## Output shape
//!
//! ```text
//! ({}
//!   (#var LNode (= tmp_1 subject))       ; only for a non-identifier subject
//!   (#var LNode a tmp_2 (= c null))      ; hoisted, one per name
//!   (#var LNodeList xs)
//!   (if cond1 ({} deferred… handler1…)
//!     (if cond2 ({} handler2…)
//!       ({} default…))))
//! ```
//!
//! - Candidate reads are `(index (. C Args) i)`, trailing ones count from
//!   `(. C ArgCount)`, and the variadic slice is
//!   `(Slice (. C Args) lead (- (. C ArgCount) trail))`.
//! - A sub-expression read at least twice is cached in a temporary through
//!   `(!= (= tmp_N expr) null)` (always, with `always_cache`).
//! - A capture binds with `(!= (= x C) null)`; a repeated name tests
//!   `(Equals x C)`; a guard follows with `#` and `_` replaced by `x`.
//! - Declarations are hoisted so sibling branches never redeclare a local.
//!   A name bound by only some alternatives of a case is initialised to
//!   `null` or `(list)`; `ref` captures assign an existing variable and are
//!   not declared.
//!
//! ```rust
//! use nodematch::compiler::{compile_match, MatchCase};
//! use nodematch::config::EngineConfig;
//! use nodematch::namer::Namer;
//! use nodematch::syntax::parse_one;
//! let cases = vec![MatchCase::new([parse_one("foo").unwrap(), parse_one("FOO").unwrap()], [parse_one("(Foo)").unwrap()])];
//! let code = compile_match(&parse_one("x").unwrap(), &cases, &Namer::new(), &EngineConfig::default()).unwrap();
//! assert_eq!(
//!     code.to_string(),
//!     r#"({} (if (|| (IsIdNamed x "foo") (IsIdNamed x "FOO")) ({} (Foo))))"#
//! );
//! ```

use std::collections::HashSet;

use crate::ast::builder::{self, assign, braces, call, id, lit, member, null};
use crate::ast::symbols::{self, host};
use crate::ast::{Node, NodeKind, Symbol};
use crate::config::EngineConfig;
use crate::diagnostics::{EngineError, ErrorContext};
use crate::namer::Namer;
use crate::pattern::{attribute_patterns, bind_guard_self, CaptureKind, CaptureSpec, Layout, Pattern};
use crate::err_ctx;

pub mod cases;
pub mod ir;

pub use cases::{check_order, MatchCase};
pub use ir::{fold, Folded, Test};

// ============================================================================
// PUBLIC API
// ============================================================================

/// Compiles `cases` against `subject` into one block of host code.
pub fn compile_match(
    subject: &Node,
    cases: &[MatchCase],
    namer: &Namer,
    config: &EngineConfig,
) -> Result<Node, EngineError> {
    check_order(cases)?;
    let mut compiler = MatchCompiler::new(namer, config);

    let mut prelude = Vec::new();
    let subject_var = if subject.is_id() && !subject.has_attrs() && !captured_anywhere(subject, cases, config)? {
        subject.clone()
    } else {
        let tmp = compiler.fresh_temp();
        prelude.push(call(host::VAR, [id(&config.node_type), assign(id(&tmp), subject.clone())]));
        id(&tmp)
    };

    let mut branches = Vec::new();
    let mut fallback = None;
    for case in cases {
        if case.is_default() {
            fallback = Some(braces(case.handler.iter().cloned()));
            continue;
        }
        let (condition, deferred) = compiler.compile_case(&subject_var, case)?;
        let body = braces(deferred.into_iter().chain(case.handler.iter().cloned()));
        branches.push((condition, body));
    }

    let chain = branches
        .into_iter()
        .rev()
        .fold(fallback, |otherwise, (condition, body)| {
            let mut parts = vec![condition, body];
            parts.extend(otherwise);
            Some(call(host::IF, parts))
        });

    log::debug!(
        "compiled {} case(s) against `{}` with {} hoisted name(s)",
        cases.len(),
        subject,
        compiler.decls.len()
    );

    let mut block = prelude;
    block.extend(compiler.declarations());
    block.extend(chain);
    Ok(braces(block))
}

// ============================================================================
// CASE COMPILATION
// ============================================================================

struct Decl {
    name: Symbol,
    kind: CaptureKind,
    maybe_unassigned: bool,
}

struct MatchCompiler<'a> {
    namer: &'a Namer,
    config: &'a EngineConfig,
    /// Hoisted names in order of first appearance.
    decls: Vec<Decl>,
    /// Names assigned by reference; they are never declared.
    by_ref: HashSet<Symbol>,
}

/// Per-alternative walk state.
struct Walk {
    tests: Vec<Test>,
    bound: Vec<Symbol>,
}

impl<'a> MatchCompiler<'a> {
    fn new(namer: &'a Namer, config: &'a EngineConfig) -> Self {
        MatchCompiler {
            namer,
            config,
            decls: Vec::new(),
            by_ref: HashSet::new(),
        }
    }

    fn fresh_temp(&mut self) -> Symbol {
        self.namer.next_name(&self.config.temp_prefix)
    }

    /// Condition of one case and the bindings deferred into its branch.
    fn compile_case(&mut self, subject: &Node, case: &MatchCase) -> Result<(Node, Vec<Node>), EngineError> {
        let single = case.patterns.len() == 1;
        let mut alternatives = Vec::new();
        let mut bound_sets = Vec::new();

        for pattern in &case.patterns {
            let pattern = Pattern::with_config(pattern.clone(), self.config)?;
            let mut walk = Walk {
                tests: Vec::new(),
                bound: Vec::new(),
            };
            self.gen(subject, pattern.node(), &mut walk, 0)?;
            log::trace!("`{}` compiled to {} test(s)", pattern, walk.tests.len());
            alternatives.push(fold(walk.tests, single));
            bound_sets.push(walk.bound);
        }

        // names bound by only some alternatives may be read unassigned by the handler
        let mut partial: Vec<Symbol> = Vec::new();
        for names in &bound_sets {
            for name in names {
                if !bound_sets.iter().all(|other| other.contains(name)) && !partial.contains(name) {
                    self.mark_maybe_unassigned(name);
                    partial.push(name.clone());
                }
            }
        }

        if single {
            let Folded { condition, deferred } = alternatives.remove(0);
            return Ok((condition, deferred));
        }
        // an alternative that wins must not see values left by one that failed
        let conditions: Vec<Node> = alternatives
            .into_iter()
            .zip(&bound_sets)
            .map(|(folded, bound)| {
                let resets = partial
                    .iter()
                    .filter(|name| !bound.contains(*name) && !self.by_ref.contains(*name))
                    .filter_map(|name| self.reset(name));
                builder::and_all(resets.chain(std::iter::once(folded.condition)))
            })
            .collect();
        Ok((builder::or_all(conditions), Vec::new()))
    }

    /// A condition that sets `name` back to its default and holds.
    fn reset(&self, name: &Symbol) -> Option<Node> {
        let decl = self.decls.iter().find(|d| d.name == *name)?;
        Some(match decl.kind {
            CaptureKind::Single => call(host::EQ, [assign(id(name), null()), null()]),
            CaptureKind::Many => not_null(assign(id(name), call(host::LIST, []))),
        })
    }

    fn gen(&mut self, subject: &Node, pattern: &Node, walk: &mut Walk, depth: usize) -> Result<(), EngineError> {
        if depth > self.config.max_depth {
            return Err(err_ctx!(
                RecursionLimit,
                pattern.span(),
                "pattern nested deeper than {} levels",
                self.config.max_depth
            ));
        }

        let reads = read_count(pattern);
        if reads == 0 {
            return Ok(());
        }
        let cache = !subject.is_id() && (reads >= 2 || self.config.always_cache);
        let subject = if cache {
            let tmp = self.fresh_temp();
            self.declare(&tmp, CaptureKind::Single, pattern)?;
            walk.tests.push(Test::Condition(not_null(assign(id(&tmp), subject.clone()))));
            id(&tmp)
        } else {
            subject.clone()
        };

        let mut claimed_attrs = false;
        match attribute_patterns(pattern).as_slice() {
            [] => {}
            [attr] => {
                let spec = CaptureSpec::of(attr)?.filter(|s| s.variadic).ok_or_else(|| {
                    err_ctx!(MalformedPattern, attr.span(), "attribute pattern must be a `$(... name)` capture")
                })?;
                self.bind(&spec, member(subject.clone(), host::ATTRS), walk)?;
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
                call(host::WITHOUT_ATTRS, [subject])
            } else {
                subject
            };
            return self.bind(&spec, value, walk);
        }

        match pattern.kind() {
            NodeKind::Id(name) => {
                walk.tests
                    .push(Test::Condition(call(host::IS_ID_NAMED, [subject, lit(&**name)])));
            }
            NodeKind::Literal(value) => {
                walk.tests
                    .push(Test::Condition(call(host::HAS_VALUE, [subject, Node::literal(value.clone())])));
            }
            NodeKind::Call { target, args } => {
                let layout = Layout::of(args)?;
                let count = lit(layout.min_len() as i64);
                match plain_name(target) {
                    Some(name) => {
                        let test = if layout.is_variadic() { host::CALLS_MIN } else { host::CALLS };
                        walk.tests
                            .push(Test::Condition(call(test, [subject.clone(), lit(&**name), count])));
                    }
                    None => {
                        let op = if layout.is_variadic() { host::GE } else { host::EQ };
                        walk.tests.push(Test::Condition(member(subject.clone(), host::IS_CALL)));
                        walk.tests.push(Test::Condition(call(
                            op,
                            [member(subject.clone(), host::ARG_COUNT), count],
                        )));
                        self.gen(&member(subject.clone(), host::TARGET), target, walk, depth + 1)?;
                    }
                }

                let list = member(subject.clone(), host::ARGS);
                let arg_count = member(subject.clone(), host::ARG_COUNT);
                for (i, arg) in args.iter().enumerate() {
                    if layout.variadic == Some(i) {
                        let spec = CaptureSpec::of(arg)?.ok_or_else(|| {
                            err_ctx!(Internal, arg.span(), "variadic position holds `{}`", arg)
                        })?;
                        let end = from_end(&arg_count, layout.trailing);
                        let slice = call(host::SLICE, [list.clone(), lit(layout.leading as i64), end]);
                        self.bind(&spec, slice, walk)?;
                        continue;
                    }
                    let index = match layout.variadic {
                        Some(v) if i > v => from_end(&arg_count, layout.trailing - (i - v - 1)),
                        _ => lit(i as i64),
                    };
                    self.gen(&call(host::INDEX, [list.clone(), index]), arg, walk, depth + 1)?;
                }
            }
        }
        Ok(())
    }

    /// Emits the binding of one capture to the candidate expression `value`.
    fn bind(&mut self, spec: &CaptureSpec, value: Node, walk: &mut Walk) -> Result<(), EngineError> {
        if spec.is_wildcard() {
            if let Some(guard) = &spec.guard {
                walk.tests.push(Test::Condition(bind_guard_self(guard, &value)));
            }
            return Ok(());
        }

        let var = id(&spec.name);
        if walk.bound.contains(&spec.name) {
            walk.tests.push(Test::Condition(call(host::EQUALS, [var.clone(), value])));
        } else {
            walk.bound.push(spec.name.clone());
            if spec.by_ref {
                self.by_ref.insert(spec.name.clone());
            }
            self.declare(&spec.name, spec.kind(), &value)?;
            let assignment = assign(var.clone(), value);
            if spec.variadic && spec.guard.is_none() {
                walk.tests.push(Test::Statement(assignment));
            } else {
                walk.tests.push(Test::Condition(not_null(assignment)));
            }
        }

        if let Some(guard) = &spec.guard {
            walk.tests.push(Test::Condition(bind_guard_self(guard, &var)));
        }
        Ok(())
    }

    fn declare(&mut self, name: &Symbol, kind: CaptureKind, at: &Node) -> Result<(), EngineError> {
        if let Some(existing) = self.decls.iter().find(|d| d.name == *name) {
            if existing.kind != kind {
                return Err(EngineError::AmbiguousCapture {
                    message: format!(
                        "`{}` is captured both as a {} and as a {}",
                        name, existing.kind, kind
                    ),
                    ctx: ErrorContext::with_span(at.span()),
                });
            }
            return Ok(());
        }
        self.decls.push(Decl {
            name: name.clone(),
            kind,
            maybe_unassigned: false,
        });
        Ok(())
    }

    fn mark_maybe_unassigned(&mut self, name: &Symbol) {
        if let Some(decl) = self.decls.iter_mut().find(|d| d.name == *name) {
            decl.maybe_unassigned = true;
        }
    }

    /// `#var` statements for every hoisted name, nodes first, then lists.
    fn declarations(&self) -> Vec<Node> {
        let mut out = Vec::new();
        for (kind, type_name) in [
            (CaptureKind::Single, &self.config.node_type),
            (CaptureKind::Many, &self.config.list_type),
        ] {
            let items: Vec<Node> = self
                .decls
                .iter()
                .filter(|d| d.kind == kind && !self.by_ref.contains(&d.name))
                .map(|d| match (d.maybe_unassigned, kind) {
                    (false, _) => id(&d.name),
                    (true, CaptureKind::Single) => assign(id(&d.name), null()),
                    (true, CaptureKind::Many) => assign(id(&d.name), call(host::LIST, [])),
                })
                .collect();
            if !items.is_empty() {
                out.push(call(host::VAR, std::iter::once(id(type_name)).chain(items)));
            }
        }
        out
    }
}

// ============================================================================
// INTERNAL HELPERS
// ============================================================================

/// Predicted number of reads of the candidate expression a pattern node makes.
fn read_count(pattern: &Node) -> usize {
    let mut reads = usize::from(!attribute_patterns(pattern).is_empty());
    if let Ok(Some(spec)) = CaptureSpec::of(pattern) {
        return reads
            + match (spec.is_wildcard(), spec.guard.is_some()) {
                (true, false) => 0,
                // the guard may mention `#` more than once
                (true, true) => 2,
                (false, _) => 1,
            };
    }
    match pattern.kind() {
        NodeKind::Id(_) | NodeKind::Literal(_) => reads + 1,
        NodeKind::Call { target, args } => {
            reads += 1;
            if plain_name(target).is_none() {
                reads += 2;
            }
            reads + args.iter().filter(|a| read_count(a) > 0).count()
        }
    }
}

/// Name of a call target that is a bare identifier rather than a sub-pattern.
fn plain_name(target: &Node) -> Option<&Symbol> {
    if target.has_attrs() || target.calls_any(symbols::SUBSTITUTE) {
        return None;
    }
    target.name()
}

/// Whether some pattern captures into the variable `subject` names; the
/// hoisted declaration would shadow it.
fn captured_anywhere(subject: &Node, cases: &[MatchCase], config: &EngineConfig) -> Result<bool, EngineError> {
    let Some(name) = subject.name() else {
        return Ok(false);
    };
    for pattern in cases.iter().flat_map(|c| c.patterns.iter()) {
        if Pattern::with_config(pattern.clone(), config)?.usage(name).is_some() {
            return Ok(true);
        }
    }
    Ok(false)
}

fn not_null(expr: Node) -> Node {
    call(host::NEQ, [expr, null()])
}

/// `(- count k)`, or `count` itself when `k` is zero.
fn from_end(count: &Node, k: usize) -> Node {
    if k == 0 {
        return count.clone();
    }
    call(host::SUB, [count.clone(), lit(k as i64)])
}
