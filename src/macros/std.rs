//! Built-in macros.
//!
//! Every built-in here is a thin client of the engine:
//!
//! | Macro                   | Surface                                      | Engine path        |
//! |-------------------------|----------------------------------------------|--------------------|
//! | `replace`               | `(replace (=> P T)… body…)`                  | runtime matcher    |
//! | `define`                | `(define P body…)`                           | registry + matcher |
//! | `unroll`                | `(unroll (in X (tuple a b…)) body…)`         | identifier rewrite |
//! | `staticMatches`         | `(staticMatches candidate P…)`               | runtime matcher    |
//! | `matchCode`             | `(matchCode subject case…)`                  | pattern compiler   |
//! | `[static] matchCode`    | `[static] (matchCode subject case…)`         | runtime matcher    |
//!
//! Errors propagate to the processor, which reports them and leaves the call
//! as written.

use ::std::collections::HashMap;

use crate::ast::builder::{block_items, braces, lit, null, splice};
use crate::ast::{symbols, Node, NodeKind, NodeList, Symbol};
use crate::compiler::{check_order, compile_match, MatchCase};
use crate::config::EngineConfig;
use crate::diagnostics::EngineError;
use crate::eval::HostEvaluator;
use crate::expand::Expander;
use crate::matcher::Matcher;
use crate::pattern::{patterns_of, Capture, CaptureKind, Captures, Layout, Pattern};
use crate::err_ctx;

use super::expander::rule_output;
use super::{MacroContext, MacroKey, MacroRegistry, MacroTemplate};

// ============================================================================
// REGISTRATION
// ============================================================================

/// Registers the built-in macros, all at any arity.
pub fn register_std_macros(registry: &mut MacroRegistry) {
    registry.register(symbols::DEFINE, None, expand_define);
    registry.register(symbols::MATCH_CODE, None, expand_match_code);
    registry.register(symbols::REPLACE, None, expand_replace);
    registry.register(symbols::STATIC_MATCHES, None, expand_static_matches);
    registry.register(symbols::UNROLL, None, expand_unroll);
}

// ============================================================================
// replace
// ============================================================================

/// `(replace (=> P1 T1) (=> P2 T2) body…)`
///
/// Rewrites every subtree of the body matching some `Pi`, outside-in and
/// first-match-wins. Replacement output is not searched again. A lone body
/// item is returned as is, several are spliced.
fn expand_replace(node: &Node, ctx: &mut MacroContext<'_>) -> Result<Option<Node>, EngineError> {
    let args = call_args(node);
    let mut rules = Vec::new();
    let mut body = Vec::new();
    for arg in &args {
        if body.is_empty() && is_rule_block(arg) {
            rules.extend(arg.args().into_iter().flatten().cloned());
        } else if body.is_empty() && arg.calls(symbols::ARROW, 2) {
            rules.push(arg.clone());
        } else {
            body.push(arg.clone());
        }
    }
    if rules.is_empty() {
        return Err(err_ctx!(MalformedPattern, node.span(), "`replace` needs at least one `(=> pattern template)` rule"));
    }

    let (patterns, templates) = split_rules(&rules, ctx.config)?;
    let mut replacer = Replacer {
        patterns: &patterns,
        templates: &templates,
        guards: HostEvaluator::with_config(ctx.config),
        config: ctx.config,
        count: 0,
    };
    let mut out = Vec::with_capacity(body.len());
    for item in &body {
        let replaced = replacer.replace(item, 0)?;
        out.extend(spliced_items(replaced));
    }
    log::debug!("replace: {} rewrite(s) with {} rule(s)", replacer.count, rules.len());

    Ok(Some(match out.len() {
        1 => out.remove(0),
        _ => splice(out),
    }))
}

fn is_rule_block(arg: &Node) -> bool {
    arg.calls_min(symbols::BRACES, 1)
        && arg
            .args()
            .is_some_and(|items| items.iter().all(|r| r.calls(symbols::ARROW, 2)))
}

fn split_rules(rules: &[Node], config: &EngineConfig) -> Result<(Vec<Pattern>, Vec<Node>), EngineError> {
    let mut patterns = Vec::with_capacity(rules.len());
    let mut templates = Vec::with_capacity(rules.len());
    for rule in rules {
        let (Some(pattern), Some(template)) = (rule.arg(0), rule.arg(1)) else {
            return Err(err_ctx!(MalformedPattern, rule.span(), "expected `(=> pattern template)`"));
        };
        patterns.push(Pattern::with_config(pattern.clone(), config)?);
        templates.push(template.clone());
    }
    Ok((patterns, templates))
}

struct Replacer<'r> {
    patterns: &'r [Pattern],
    templates: &'r [Node],
    guards: HostEvaluator,
    config: &'r EngineConfig,
    count: usize,
}

impl Replacer<'_> {
    fn replace(&mut self, node: &Node, depth: usize) -> Result<Node, EngineError> {
        if depth > self.config.max_depth {
            return Err(err_ctx!(
                RecursionLimit,
                node.span(),
                "replace nested deeper than {} levels",
                self.config.max_depth
            ));
        }

        let mut captures = Captures::new();
        let hit = Matcher::with_config(&mut self.guards, self.config).match_any(node, self.patterns, &mut captures)?;
        if let Some((i, unmatched)) = hit {
            self.count += 1;
            let output = Expander::with_config(&captures, self.config).expand(&self.templates[i])?;
            return Ok(rule_output(output, unmatched));
        }

        let attrs = self.replace_list(node.attrs(), depth)?;
        let rebuilt = match node.kind() {
            NodeKind::Id(_) | NodeKind::Literal(_) => node.clone(),
            NodeKind::Call { target, args } => {
                let new_target = self.replace(target, depth + 1)?;
                let new_args = self.replace_list(args, depth)?;
                node.with_target(new_target).with_args(new_args)
            }
        };
        Ok(rebuilt.with_attrs(attrs))
    }

    fn replace_list(&mut self, items: &NodeList, depth: usize) -> Result<NodeList, EngineError> {
        let mut out = NodeList::new();
        for item in items {
            out.extend(spliced_items(self.replace(item, depth + 1)?));
        }
        Ok(out)
    }
}

// ============================================================================
// define
// ============================================================================

/// `(define P body…)`
///
/// Registers a rule for calls to `P`'s target. Non-variadic patterns are keyed
/// by their exact arity, variadic ones by name alone. Several body items form
/// one block that is spliced at the call site.
fn expand_define(node: &Node, ctx: &mut MacroContext<'_>) -> Result<Option<Node>, EngineError> {
    let args = call_args(node);
    let Some((pattern, body)) = args.split_first() else {
        return Err(err_ctx!(MalformedPattern, node.span(), "`define` needs a pattern and a body"));
    };
    let Some(name) = pattern.target_name().cloned() else {
        return Err(err_ctx!(
            MalformedPattern,
            pattern.span(),
            "`define` pattern `{}` must be a call with a named target",
            pattern
        )
        .with_help("write the pattern as `(name $arg…)`"));
    };
    let layout = Layout::of(&pattern.args().cloned().unwrap_or_default())?;
    let arity = (!layout.is_variadic()).then(|| pattern.arg_count());

    let body = match body {
        [single] => single.clone(),
        many => braces(many.iter().cloned()),
    };
    let key = MacroKey::new(name, arity);
    log::debug!("define: registering {}", key);
    ctx.registry.register_template(key, MacroTemplate::with_config(pattern.clone(), body, ctx.config)?);
    Ok(Some(splice([])))
}

// ============================================================================
// unroll
// ============================================================================

/// `(unroll (in X (tuple a b…)) body…)` or
/// `(unroll (in (tuple X Y) (tuple (tuple a1 b1) (tuple a2 b2)…)) body…)`
///
/// Emits one copy of the body per list element with the loop identifiers
/// replaced, spliced into the enclosing list.
fn expand_unroll(node: &Node, _ctx: &mut MacroContext<'_>) -> Result<Option<Node>, EngineError> {
    let args = call_args(node);
    let Some((clause, body)) = args.split_first() else {
        return Err(err_ctx!(MalformedPattern, node.span(), "`unroll` needs an `(in …)` clause"));
    };
    if !clause.calls(symbols::IN, 2) {
        return Err(err_ctx!(MalformedPattern, clause.span(), "expected `(in names values)`, found `{}`", clause));
    }
    let (Some(names_node), Some(values_node)) = (clause.arg(0), clause.arg(1)) else {
        return Err(err_ctx!(Internal, clause.span(), "`in` clause lost its operands"));
    };

    let names: Vec<Symbol> = if names_node.calls_any(symbols::TUPLE) {
        tuple_items(names_node)?
            .iter()
            .map(|n| loop_name(n))
            .collect::<Result<_, _>>()?
    } else {
        vec![loop_name(names_node)?]
    };
    let rows = tuple_items(values_node)?;
    let body: Vec<Node> = body.iter().flat_map(block_items).collect();

    let mut out = Vec::with_capacity(rows.len() * body.len());
    for row in rows.iter() {
        let values: Vec<Node> = if names.len() == 1 {
            vec![row.clone()]
        } else {
            tuple_items(row)?.into_iter().collect()
        };
        if values.len() != names.len() {
            return Err(err_ctx!(
                MalformedPattern,
                row.span(),
                "`{}` has {} item(s) but {} name(s) are unrolled",
                row,
                values.len(),
                names.len()
            ));
        }
        let bindings: HashMap<&str, &Node> = names.iter().map(|n| &**n).zip(values.iter()).collect();
        out.extend(body.iter().map(|stmt| substitute_ids(stmt, &bindings)));
    }
    Ok(Some(splice(out)))
}

fn loop_name(node: &Node) -> Result<Symbol, EngineError> {
    node.name()
        .cloned()
        .ok_or_else(|| err_ctx!(MalformedPattern, node.span(), "unroll variable `{}` must be an identifier", node))
}

/// Items of `(tuple …)` or `({} …)`.
fn tuple_items(node: &Node) -> Result<NodeList, EngineError> {
    if node.calls_any(symbols::TUPLE) || node.calls_any(symbols::BRACES) {
        return Ok(node.args().cloned().unwrap_or_default());
    }
    Err(err_ctx!(MalformedPattern, node.span(), "expected a `(tuple …)` list, found `{}`", node))
}

/// Replaces identifiers by name everywhere in `node`, keeping their attributes.
fn substitute_ids(node: &Node, bindings: &HashMap<&str, &Node>) -> Node {
    if let Some(value) = node.name().and_then(|n| bindings.get(&**n)) {
        return value.plus_attrs(node.attrs().iter().cloned());
    }
    let attrs: NodeList = node.attrs().iter().map(|a| substitute_ids(a, bindings)).collect();
    let rebuilt = match node.kind() {
        NodeKind::Call { target, args } => node
            .with_target(substitute_ids(target, bindings))
            .with_args(args.iter().map(|a| substitute_ids(a, bindings)).collect()),
        _ => node.clone(),
    };
    rebuilt.with_attrs(attrs)
}

// ============================================================================
// staticMatches
// ============================================================================

/// `(staticMatches candidate P…)` becomes `true` when any `P` matches.
fn expand_static_matches(node: &Node, ctx: &mut MacroContext<'_>) -> Result<Option<Node>, EngineError> {
    let args = call_args(node);
    let Some((candidate, patterns)) = args.split_first() else {
        return Err(err_ctx!(MalformedPattern, node.span(), "`staticMatches` needs a candidate"));
    };
    let patterns = patterns_of(patterns, ctx.config)?;
    let mut guards = HostEvaluator::with_config(ctx.config);
    let hit = Matcher::with_config(&mut guards, ctx.config).match_any(candidate, &patterns, &mut Captures::new())?;
    Ok(Some(lit(hit.is_some())))
}

// ============================================================================
// matchCode
// ============================================================================

/// `(matchCode subject case…)`, the cases written either as one `{}` block
/// or directly as arguments.
///
/// Plain `matchCode` compiles the cases into host code. With a `static`
/// attribute the subject is matched now and the chosen handler, expanded with
/// the captures, is spliced in its place; nothing is emitted when no case
/// matches.
fn expand_match_code(node: &Node, ctx: &mut MacroContext<'_>) -> Result<Option<Node>, EngineError> {
    let args = call_args(node);
    let Some((subject, body)) = args.split_first() else {
        return Err(err_ctx!(MalformedPattern, node.span(), "`matchCode` needs a subject"));
    };
    let cases = MatchCase::parse_block(&braces(body.iter().flat_map(block_items)))?;

    if !node.attrs().iter().any(|a| a.is_id_named(symbols::STATIC)) {
        return compile_match(subject, &cases, ctx.namer, ctx.config).map(Some);
    }

    check_order(&cases)?;
    let mut guards = HostEvaluator::with_config(ctx.config);
    let mut matcher = Matcher::with_config(&mut guards, ctx.config);
    let mut captures = Captures::new();
    for case in &cases {
        if case.is_default() {
            return Ok(Some(splice(case.handler.iter().cloned())));
        }
        let patterns = patterns_of(&case.patterns, ctx.config)?;
        if let Some((winner, _)) = matcher.match_any(subject, &patterns, &mut captures)? {
            default_sibling_names(&patterns, winner, &mut captures);
            let expander = Expander::with_config(&captures, ctx.config);
            let handler = case
                .handler
                .iter()
                .map(|stmt| expander.expand(stmt))
                .collect::<Result<Vec<_>, _>>()?;
            return Ok(Some(splice(handler)));
        }
    }
    ctx.diagnostics
        .note(Some(node.span()), format!("no case of static matchCode matches `{}`", subject));
    Ok(Some(splice([])))
}

/// Binds `null` or an empty list for names only other alternatives capture,
/// as compiled code initialises them.
fn default_sibling_names(patterns: &[Pattern], winner: usize, captures: &mut Captures) {
    for (i, pattern) in patterns.iter().enumerate() {
        if i == winner {
            continue;
        }
        for (name, usage) in pattern.names() {
            if captures.contains(name) {
                continue;
            }
            let default = match usage.kind {
                CaptureKind::Single => Capture::Single(null()),
                CaptureKind::Many => Capture::Many(NodeList::new()),
            };
            captures.insert(name.clone(), default);
        }
    }
}

// ============================================================================
// HELPERS
// ============================================================================

fn call_args(node: &Node) -> Vec<Node> {
    node.args().map(|a| a.iter().cloned().collect()).unwrap_or_default()
}

/// Items of an unattributed `#splice`, or the node itself.
fn spliced_items(node: Node) -> Vec<Node> {
    if node.calls_any(symbols::SPLICE) && !node.has_attrs() {
        return call_args(&node);
    }
    vec![node]
}
