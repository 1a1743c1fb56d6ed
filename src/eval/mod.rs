//! # Host evaluator
//!
//! A small interpreter for the node vocabulary the pattern compiler emits. It
//! stands in for the host language in two places:
//!
//! - the runtime matcher evaluates guard conditions through the
//!   [`GuardEvaluator`] trait, which [`HostEvaluator`] implements;
//! - synthesized `matchCode` output can be executed directly, which is how the
//!   compiled and interpreted paths are checked against each other.
//!
//! ## Calling conventions
//!
//! Special forms (`{}`, `if`, `#var`, `=`, `&&`, `||`, `quote`, `.`, `HasValue`)
//! receive their operands unevaluated. Every other form evaluates its operands left to right
//! first. Identifiers are variable reads, literals evaluate to themselves.
//!
//! ## Locals
//!
//! `#var T a (= b init)` declares locals in the innermost block. Declaring a
//! name that is already visible, assigning an undeclared name, or reading a
//! declared but unassigned one is an `Eval` error. This mirrors the host rules
//! that force the compiler to hoist declarations above the `if` chain.
//!
//! ```rust
//! use nodematch::eval::{HostEvaluator, HostValue};
//! use nodematch::syntax::parse_one;
//! let mut ev = HostEvaluator::new();
//! let code = parse_one("({} (#var int (= n 2)) (if (> n 1) (+ n 40) 0))").unwrap();
//! assert_eq!(ev.eval(&code).unwrap(), HostValue::Int(42));
//! ```

use std::collections::HashMap;

use crate::ast::symbols::{self, host};
use crate::ast::{Node, NodeKind, NodeList, Span, Symbol};
use crate::config::EngineConfig;
use crate::diagnostics::EngineError;
use crate::pattern::{Capture, Captures};
use crate::err_ctx;

pub mod value;

pub use value::HostValue;

// ============================================================================
// GUARD EVALUATION SEAM
// ============================================================================

/// Evaluates capture guards for the runtime matcher.
pub trait GuardEvaluator {
    /// Evaluates `guard` with `#`, `_` and `name` bound to `value` and every
    /// capture bound so far visible by name.
    fn eval_guard(
        &mut self,
        guard: &Node,
        name: &Symbol,
        value: &Capture,
        captures: &Captures,
    ) -> Result<bool, EngineError>;
}

// ============================================================================
// EVALUATOR STATE
// ============================================================================

type Scope = HashMap<Symbol, Option<HostValue>>;

#[derive(Debug, Clone)]
pub struct HostEvaluator {
    scopes: Vec<Scope>,
    max_depth: usize,
}

impl Default for HostEvaluator {
    fn default() -> Self {
        HostEvaluator::new()
    }
}

impl HostEvaluator {
    pub fn new() -> Self {
        HostEvaluator::with_config(&EngineConfig::default())
    }

    pub fn with_config(config: &EngineConfig) -> Self {
        HostEvaluator {
            scopes: vec![Scope::new()],
            max_depth: config.max_depth,
        }
    }

    /// Binds `name` in the outermost scope, replacing any previous binding.
    pub fn set(&mut self, name: impl Into<Symbol>, value: impl Into<HostValue>) -> &mut Self {
        self.scopes[0].insert(name.into(), Some(value.into()));
        self
    }

    /// Current value of `name`; `None` when undeclared or unassigned.
    pub fn get(&self, name: &str) -> Option<&HostValue> {
        self.lookup(name).and_then(Option::as_ref)
    }

    /// True when `name` is declared in some scope, assigned or not.
    pub fn is_declared(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    pub fn eval(&mut self, code: &Node) -> Result<HostValue, EngineError> {
        self.eval_at(code, 0)
    }

    /// Evaluates `code` and requires a boolean result.
    pub fn eval_bool(&mut self, code: &Node) -> Result<bool, EngineError> {
        let value = self.eval(code)?;
        expect_bool(&value, code)
    }

    fn lookup(&self, name: &str) -> Option<&Option<HostValue>> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    fn lookup_mut(&mut self, name: &str) -> Option<&mut Option<HostValue>> {
        self.scopes.iter_mut().rev().find_map(|scope| scope.get_mut(name))
    }

    /// Runs `body` inside a fresh scope that is popped even on error.
    fn scoped<T>(
        &mut self,
        seed: Scope,
        body: impl FnOnce(&mut Self) -> Result<T, EngineError>,
    ) -> Result<T, EngineError> {
        self.scopes.push(seed);
        let result = body(self);
        self.scopes.pop();
        result
    }
}

impl GuardEvaluator for HostEvaluator {
    fn eval_guard(
        &mut self,
        guard: &Node,
        name: &Symbol,
        value: &Capture,
        captures: &Captures,
    ) -> Result<bool, EngineError> {
        let mut seed: Scope = captures
            .iter()
            .map(|(k, v)| (k.clone(), Some(capture_value(v))))
            .collect();
        let bound = capture_value(value);
        for key in [name.clone(), symbols::HASH.into(), symbols::WILDCARD.into()] {
            seed.insert(key, Some(bound.clone()));
        }
        log::trace!("guard `{}` for `{}`", guard, name);
        self.scoped(seed, |ev| {
            let result = ev.eval_at(guard, 0)?;
            expect_bool(&result, guard)
        })
    }
}

// ============================================================================
// EVALUATION
// ============================================================================

impl HostEvaluator {
    fn eval_at(&mut self, code: &Node, depth: usize) -> Result<HostValue, EngineError> {
        if depth > self.max_depth {
            return Err(err_ctx!(
                RecursionLimit,
                code.span(),
                "evaluation nested deeper than {} levels",
                self.max_depth
            ));
        }
        match code.kind() {
            NodeKind::Literal(value) => Ok(HostValue::from_value(value)),
            NodeKind::Id(name) => self.read_var(name, code.span()),
            NodeKind::Call { target, args } => {
                let Some(form) = target.name() else {
                    return Err(err_ctx!(Eval, code.span(), "cannot call `{}`", target));
                };
                let form = form.clone();
                self.eval_form(&form, args, code, depth + 1)
                    .map_err(|e| e.or_span(code.span()))
            }
        }
    }

    fn read_var(&self, name: &str, span: Span) -> Result<HostValue, EngineError> {
        match self.lookup(name) {
            Some(Some(value)) => Ok(value.clone()),
            Some(None) => Err(err_ctx!(Eval, span, "`{}` is read before it is assigned", name)),
            None => Err(err_ctx!(Eval, span, "unknown variable `{}`", name)),
        }
    }

    fn eval_form(
        &mut self,
        form: &str,
        args: &NodeList,
        code: &Node,
        depth: usize,
    ) -> Result<HostValue, EngineError> {
        // special forms see their operands unevaluated
        match form {
            symbols::BRACES => return self.eval_block(args, depth),
            host::IF => return self.eval_if(args, code, depth),
            host::VAR => return self.eval_var(args, code, depth),
            host::ASSIGN => return self.eval_assign(args, code, depth),
            symbols::AND | symbols::OR => return self.eval_logic(form, args, depth),
            host::QUOTE => {
                let [quoted] = operands::<1>(args, code)?;
                return Ok(HostValue::Node(quoted.clone()));
            }
            host::HAS_VALUE => return self.eval_has_value(args, code, depth),
            host::DOT => {
                let [object, name] = operands::<2>(args, code)?;
                let Some(name) = name.name() else {
                    return Err(err_ctx!(Eval, name.span(), "member name must be an identifier"));
                };
                let object = self.eval_at(object, depth)?;
                return member(&object, name, code);
            }
            _ => {}
        }

        let values = args
            .iter()
            .map(|a| self.eval_at(a, depth))
            .collect::<Result<Vec<_>, _>>()?;
        apply_builtin(form, values, code)
    }

    fn eval_block(&mut self, stmts: &NodeList, depth: usize) -> Result<HostValue, EngineError> {
        self.scoped(Scope::new(), |ev| {
            let mut last = HostValue::Unit;
            for stmt in stmts {
                last = ev.eval_at(stmt, depth)?;
            }
            Ok(last)
        })
    }

    fn eval_if(&mut self, args: &NodeList, code: &Node, depth: usize) -> Result<HostValue, EngineError> {
        if !(2..=3).contains(&args.len()) {
            return Err(err_ctx!(Eval, code.span(), "`if` takes a condition and one or two branches"));
        }
        let cond = self.eval_at(&args[0], depth)?;
        if expect_bool(&cond, &args[0])? {
            self.eval_at(&args[1], depth)
        } else if let Some(otherwise) = args.get(2) {
            self.eval_at(otherwise, depth)
        } else {
            Ok(HostValue::Unit)
        }
    }

    fn eval_var(&mut self, args: &NodeList, code: &Node, depth: usize) -> Result<HostValue, EngineError> {
        // first operand is the declared type, which the evaluator does not check
        if args.is_empty() {
            return Err(err_ctx!(Eval, code.span(), "`#var` needs a type"));
        }
        for decl in args.iter().skip(1) {
            let (name, init) = if let Some(name) = decl.name() {
                (name.clone(), None)
            } else if decl.calls(host::ASSIGN, 2) {
                let name = decl
                    .arg(0)
                    .and_then(Node::name)
                    .cloned()
                    .ok_or_else(|| err_ctx!(Eval, decl.span(), "cannot declare `{}`", decl))?;
                let init = decl.arg(1).map(|i| self.eval_at(i, depth)).transpose()?;
                (name, init)
            } else {
                return Err(err_ctx!(Eval, decl.span(), "cannot declare `{}`", decl));
            };
            if self.is_declared(&name) {
                return Err(err_ctx!(Eval, decl.span(), "`{}` is already declared", name));
            }
            if let Some(scope) = self.scopes.last_mut() {
                scope.insert(name, init);
            }
        }
        Ok(HostValue::Unit)
    }

    fn eval_assign(&mut self, args: &NodeList, code: &Node, depth: usize) -> Result<HostValue, EngineError> {
        let [lhs, rhs] = operands::<2>(args, code)?;
        let Some(name) = lhs.name().cloned() else {
            return Err(err_ctx!(Eval, lhs.span(), "cannot assign to `{}`", lhs));
        };
        let value = self.eval_at(rhs, depth)?;
        match self.lookup_mut(&name) {
            Some(slot) => {
                *slot = Some(value.clone());
                Ok(value)
            }
            None => Err(err_ctx!(Eval, lhs.span(), "assignment to undeclared `{}`", name)),
        }
    }

    fn eval_logic(&mut self, op: &str, args: &NodeList, depth: usize) -> Result<HostValue, EngineError> {
        let short_circuit_on = op == symbols::OR;
        for arg in args {
            let value = self.eval_at(arg, depth)?;
            if expect_bool(&value, arg)? == short_circuit_on {
                return Ok(HostValue::Bool(short_circuit_on));
            }
        }
        Ok(HostValue::Bool(!short_circuit_on))
    }

    fn eval_has_value(&mut self, args: &NodeList, code: &Node, depth: usize) -> Result<HostValue, EngineError> {
        let [subject, literal] = operands::<2>(args, code)?;
        let Some(expected) = literal.value() else {
            return Err(err_ctx!(Eval, literal.span(), "`HasValue` needs a literal, found `{}`", literal));
        };
        let subject = self.eval_at(subject, depth)?;
        let node = expect_node(&subject, code)?;
        Ok(HostValue::Bool(node.value() == Some(expected)))
    }
}

// ============================================================================
// EAGER BUILTINS
// ============================================================================

fn apply_builtin(form: &str, values: Vec<HostValue>, code: &Node) -> Result<HostValue, EngineError> {
    match form {
        symbols::NOT => {
            let [v] = take::<1>(values, code)?;
            Ok(HostValue::Bool(!expect_bool(&v, code)?))
        }
        host::EQ | host::NEQ => {
            let [a, b] = take::<2>(values, code)?;
            Ok(HostValue::Bool((a == b) == (form == host::EQ)))
        }
        host::LT | host::LE | host::GT | host::GE => {
            let [a, b] = take::<2>(values, code)?;
            let (a, b) = (expect_number(&a, code)?, expect_number(&b, code)?);
            Ok(HostValue::Bool(match form {
                host::LT => a < b,
                host::LE => a <= b,
                host::GT => a > b,
                _ => a >= b,
            }))
        }
        host::ADD | host::SUB => arithmetic(form, values, code),
        host::INDEX => {
            let [seq, index] = take::<2>(values, code)?;
            let i = expect_index(&index, code)?;
            match &seq {
                HostValue::List(items) => items
                    .get(i)
                    .cloned()
                    .map(HostValue::Node)
                    .ok_or_else(|| out_of_range(i, items.len(), code)),
                HostValue::Tuple(items) => items
                    .get(i)
                    .cloned()
                    .ok_or_else(|| out_of_range(i, items.len(), code)),
                other => Err(type_error("list", other, code)),
            }
        }
        host::SLICE => {
            let [seq, start, end] = take::<3>(values, code)?;
            let items = expect_list(&seq, code)?;
            let (start, end) = (expect_index(&start, code)?, expect_index(&end, code)?);
            if start > end || end > items.len() {
                return Err(err_ctx!(
                    Eval,
                    code.span(),
                    "slice {}..{} out of range for {} items",
                    start,
                    end,
                    items.len()
                ));
            }
            Ok(HostValue::List(items.clone().slice(start..end)))
        }
        host::IS_ID_NAMED => {
            let [node, name] = take::<2>(values, code)?;
            let name = expect_str(&name, code)?;
            Ok(HostValue::Bool(expect_node(&node, code)?.is_id_named(name)))
        }
        host::CALLS | host::CALLS_MIN => {
            let [node, name, count] = take::<3>(values, code)?;
            let node = expect_node(&node, code)?;
            let name = expect_str(&name, code)?;
            let count = expect_index(&count, code)?;
            Ok(HostValue::Bool(if form == host::CALLS {
                node.calls(name, count)
            } else {
                node.calls_min(name, count)
            }))
        }
        host::EQUALS => {
            let [a, b] = take::<2>(values, code)?;
            match (&a, &b) {
                (HostValue::Node(x), HostValue::Node(y)) => Ok(HostValue::Bool(x == y)),
                (HostValue::List(x), HostValue::List(y)) => Ok(HostValue::Bool(x == y)),
                _ => Ok(HostValue::Bool(false)),
            }
        }
        host::WITHOUT_ATTRS => {
            let [node] = take::<1>(values, code)?;
            Ok(HostValue::Node(expect_node(&node, code)?.without_attrs()))
        }
        host::TUPLE => Ok(HostValue::Tuple(values)),
        host::LIST => values
            .iter()
            .map(|v| expect_node(v, code).cloned())
            .collect::<Result<NodeList, _>>()
            .map(HostValue::List),
        other => Err(err_ctx!(Eval, code.span(), "unknown form `{}`", other)),
    }
}

fn arithmetic(op: &str, values: Vec<HostValue>, code: &Node) -> Result<HostValue, EngineError> {
    let [a, b] = take::<2>(values, code)?;
    let sign = if op == host::ADD { 1 } else { -1 };
    match (&a, &b) {
        (HostValue::Int(x), HostValue::Int(y)) => x
            .checked_add(sign * y)
            .map(HostValue::Int)
            .ok_or_else(|| err_ctx!(Eval, code.span(), "integer overflow in `{}`", code)),
        _ => Ok(HostValue::Float(
            expect_number(&a, code)? + sign as f64 * expect_number(&b, code)?,
        )),
    }
}

/// Member access `(. object Member)`.
fn member(object: &HostValue, member: &str, code: &Node) -> Result<HostValue, EngineError> {
    match (object, member) {
        (HostValue::List(items), host::COUNT) => Ok(HostValue::Int(items.len() as i64)),
        (HostValue::List(items), host::IS_EMPTY) => Ok(HostValue::Bool(items.is_empty())),
        (HostValue::Tuple(items), host::COUNT) => Ok(HostValue::Int(items.len() as i64)),
        (HostValue::Str(s), host::COUNT) => Ok(HostValue::Int(s.chars().count() as i64)),
        (HostValue::Node(node), _) => node_member(node, member, code),
        (other, _) => Err(err_ctx!(
            Eval,
            code.span(),
            "{} has no member `{}`",
            other.type_name(),
            member
        )),
    }
}

fn node_member(node: &Node, member: &str, code: &Node) -> Result<HostValue, EngineError> {
    let or_null = |v: Option<HostValue>| v.unwrap_or(HostValue::Null);
    Ok(match member {
        host::NAME => or_null(node.name().map(|n| HostValue::Str(n.clone()))),
        host::TARGET => or_null(node.target().cloned().map(HostValue::Node)),
        host::ARGS => HostValue::List(node.args().cloned().unwrap_or_default()),
        host::ARG_COUNT => HostValue::Int(node.arg_count() as i64),
        host::ATTRS => HostValue::List(node.attrs().clone()),
        host::VALUE => or_null(node.value().map(HostValue::from_value)),
        host::IS_ID => HostValue::Bool(node.is_id()),
        host::IS_CALL => HostValue::Bool(node.is_call()),
        host::IS_LITERAL => HostValue::Bool(node.is_literal()),
        other => return Err(err_ctx!(Eval, code.span(), "node has no member `{}`", other)),
    })
}

// ============================================================================
// INTERNAL HELPERS
// ============================================================================

fn capture_value(capture: &Capture) -> HostValue {
    match capture {
        Capture::Single(node) => HostValue::Node(node.clone()),
        Capture::Many(nodes) => HostValue::List(nodes.clone()),
    }
}

fn operands<'a, const N: usize>(args: &'a NodeList, code: &Node) -> Result<[&'a Node; N], EngineError> {
    let refs: Vec<&Node> = args.iter().collect();
    refs.try_into().map_err(|_| arity_error(N, args.len(), code))
}

fn take<const N: usize>(values: Vec<HostValue>, code: &Node) -> Result<[HostValue; N], EngineError> {
    let found = values.len();
    values.try_into().map_err(|_| arity_error(N, found, code))
}

fn arity_error(expected: usize, found: usize, code: &Node) -> EngineError {
    err_ctx!(
        Eval,
        code.span(),
        "`{}` expects {} operand(s), found {}",
        code.target().map_or_else(String::new, |t| t.to_string()),
        expected,
        found
    )
}

fn type_error(expected: &str, found: &HostValue, code: &Node) -> EngineError {
    err_ctx!(
        Eval,
        code.span(),
        "expected {} in `{}`, found {}",
        expected,
        code,
        found.type_name()
    )
}

fn out_of_range(i: usize, len: usize, code: &Node) -> EngineError {
    err_ctx!(Eval, code.span(), "index {} out of range for {} items", i, len)
}

fn expect_bool(value: &HostValue, code: &Node) -> Result<bool, EngineError> {
    value.as_bool().ok_or_else(|| type_error("bool", value, code))
}

fn expect_node<'a>(value: &'a HostValue, code: &Node) -> Result<&'a Node, EngineError> {
    value.as_node().ok_or_else(|| type_error("node", value, code))
}

fn expect_list<'a>(value: &'a HostValue, code: &Node) -> Result<&'a NodeList, EngineError> {
    value.as_list().ok_or_else(|| type_error("node list", value, code))
}

fn expect_str<'a>(value: &'a HostValue, code: &Node) -> Result<&'a str, EngineError> {
    match value {
        HostValue::Str(s) => Ok(&**s),
        other => Err(type_error("string", other, code)),
    }
}

fn expect_number(value: &HostValue, code: &Node) -> Result<f64, EngineError> {
    match value {
        HostValue::Int(i) => Ok(*i as f64),
        HostValue::Float(x) => Ok(*x),
        other => Err(type_error("number", other, code)),
    }
}

fn expect_index(value: &HostValue, code: &Node) -> Result<usize, EngineError> {
    value
        .as_int()
        .and_then(|i| usize::try_from(i).ok())
        .ok_or_else(|| type_error("non-negative int", value, code))
}
