//! # Pattern grammar
//!
//! A pattern is an ordinary [`Node`] in which `$` calls mark captures:
//!
//! | Surface            | Meaning                                              |
//! |--------------------|------------------------------------------------------|
//! | `$x`               | bind one node to `x`                                 |
//! | `$_`               | match anything, bind nothing                         |
//! | `$(... xs)` / `$(.. xs)` / `[params] $xs` | bind zero or more consecutive list items |
//! | `$(&& x cond)`     | bind `x` only if `cond` holds (`#`/`_` name the value) |
//! | `` $(`[]` x cond) `` | legacy spelling of a guarded capture (`x[cond]`)   |
//! | `$[ref] x`         | bind into an existing output variable (compiled path) |
//! | `[$(... a)] pat`   | bind all attributes of the candidate to `a`          |
//!
//! [`Pattern::new`] validates a pattern once, before any matching attempt, and
//! rejects structurally invalid patterns with `MalformedPattern`:
//!
//! - more than one variadic capture in one argument or attribute list,
//! - attribute patterns other than a single variadic capture,
//! - a variadic capture in a scalar position (call target, top level),
//! - one name used both as a single and as a list capture (`AmbiguousCapture`).

use std::fmt;

use crate::ast::{symbols, Node, NodeKind, Span, Symbol};
use crate::config::EngineConfig;
use crate::diagnostics::EngineError;
use crate::err_ctx;

pub mod captures;
pub mod slice;

pub use captures::{Capture, Captures};
pub use slice::Layout;

// ============================================================================
// CAPTURE SPECIFICATIONS
// ============================================================================

/// Whether a capture binds one node or a list of nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CaptureKind {
    Single,
    Many,
}

impl fmt::Display for CaptureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureKind::Single => write!(f, "single node"),
            CaptureKind::Many => write!(f, "node list"),
        }
    }
}

/// The decoded form of one `$` capture node.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureSpec {
    pub name: Symbol,
    pub variadic: bool,
    /// Combined guard condition; `#` and `_` inside it refer to the bound value.
    pub guard: Option<Node>,
    pub by_ref: bool,
    pub span: Span,
}

impl CaptureSpec {
    /// Decodes `node` as a capture, returning `Ok(None)` for non-capture nodes.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use nodematch::pattern::CaptureSpec;
    /// use nodematch::syntax::parse_one;
    /// let spec = CaptureSpec::of(&parse_one("$(&& (... xs) (> (. # Count) 1))").unwrap())
    ///     .unwrap()
    ///     .unwrap();
    /// assert_eq!(&*spec.name, "xs");
    /// assert!(spec.variadic);
    /// assert!(spec.guard.is_some());
    /// ```
    pub fn of(node: &Node) -> Result<Option<CaptureSpec>, EngineError> {
        if !node.calls_any(symbols::SUBSTITUTE) {
            return Ok(None);
        }
        let Some(mut inner) = node.arg(0).filter(|_| node.arg_count() == 1) else {
            return Err(err_ctx!(
                MalformedPattern,
                node.span(),
                "`$` takes exactly one operand, found {}",
                node.arg_count()
            ));
        };

        let mut variadic = false;
        let mut by_ref = false;
        apply_modifiers(node.attrs().iter(), &mut variadic, &mut by_ref);

        let mut guards = Vec::new();
        loop {
            if inner.calls(symbols::DOT_DOT_DOT, 1) || inner.calls(symbols::DOT_DOT, 1) {
                variadic = true;
                inner = inner.arg(0).unwrap_or(inner);
                continue;
            }
            if inner.calls(symbols::AND, 2) || inner.calls(symbols::INDEX_BRACKETS, 2) {
                if let (Some(value), Some(cond)) = (inner.arg(0), inner.arg(1)) {
                    guards.push(cond.clone());
                    inner = value;
                    continue;
                }
            }
            break;
        }

        let Some(name) = inner.name() else {
            return Err(err_ctx!(
                MalformedPattern,
                inner.span(),
                "a capture must name an identifier, found `{}`",
                inner
            ));
        };
        for attr in inner.attrs() {
            if !is_modifier(attr) {
                return Err(err_ctx!(
                    MalformedPattern,
                    attr.span(),
                    "unsupported attribute `{}` on capture `{}`",
                    attr,
                    name
                ));
            }
        }
        apply_modifiers(inner.attrs().iter(), &mut variadic, &mut by_ref);

        // conditions were collected outermost first
        guards.reverse();
        let guard = crate::ast::builder::fold_binary(symbols::AND, guards);

        Ok(Some(CaptureSpec {
            name: name.clone(),
            variadic,
            guard,
            by_ref,
            span: node.span(),
        }))
    }

    pub fn kind(&self) -> CaptureKind {
        if self.variadic {
            CaptureKind::Many
        } else {
            CaptureKind::Single
        }
    }

    pub fn is_wildcard(&self) -> bool {
        &*self.name == symbols::WILDCARD
    }
}

/// Attribute patterns of `node`: its attributes minus capture modifiers.
pub fn attribute_patterns(node: &Node) -> Vec<&Node> {
    let is_capture = node.calls_any(symbols::SUBSTITUTE);
    node.attrs()
        .iter()
        .filter(|a| !(is_capture && is_modifier(a)))
        .collect()
}

/// True when `node` is a variadic capture.
pub fn is_variadic_capture(node: &Node) -> Result<bool, EngineError> {
    Ok(CaptureSpec::of(node)?.is_some_and(|spec| spec.variadic))
}

fn is_modifier(attr: &Node) -> bool {
    attr.is_id_named(symbols::REF) || attr.is_id_named(symbols::PARAMS)
}

fn apply_modifiers<'a>(attrs: impl Iterator<Item = &'a Node>, variadic: &mut bool, by_ref: &mut bool) {
    for attr in attrs {
        if attr.is_id_named(symbols::PARAMS) {
            *variadic = true;
        } else if attr.is_id_named(symbols::REF) {
            *by_ref = true;
        }
    }
}

// ============================================================================
// VALIDATED PATTERNS
// ============================================================================

/// How one capture name is used inside a pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Usage {
    pub kind: CaptureKind,
    /// Number of occurrences; above one means later occurrences must be equal.
    pub count: usize,
    pub by_ref: bool,
}

/// A pattern node that passed validation.
#[derive(Debug, Clone)]
pub struct Pattern {
    node: Node,
    usages: Vec<(Symbol, Usage)>,
}

#[derive(Clone, Copy, PartialEq)]
enum Position {
    Scalar,
    ListItem,
}

impl Pattern {
    /// Validates `node` as a pattern.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use nodematch::pattern::Pattern;
    /// use nodematch::syntax::parse_one;
    /// assert!(Pattern::new(parse_one("(f $(... a) $(... b))").unwrap()).is_err());
    /// let ok = Pattern::new(parse_one("(+ $x $x)").unwrap()).unwrap();
    /// assert_eq!(ok.usage("x").unwrap().count, 2);
    /// ```
    pub fn new(node: Node) -> Result<Pattern, EngineError> {
        Pattern::with_config(node, &EngineConfig::default())
    }

    /// Like [`Pattern::new`], bounding nesting by `config.max_depth`.
    pub fn with_config(node: Node, config: &EngineConfig) -> Result<Pattern, EngineError> {
        let mut usages = Vec::new();
        validate(&node, Position::Scalar, &mut usages, 0, config.max_depth)?;
        Ok(Pattern { node, usages })
    }

    pub fn node(&self) -> &Node {
        &self.node
    }

    pub fn usage(&self, name: &str) -> Option<&Usage> {
        self.usages
            .iter()
            .find(|(n, _)| &**n == name)
            .map(|(_, u)| u)
    }

    /// Capture names in order of first occurrence, wildcard excluded.
    pub fn names(&self) -> impl Iterator<Item = (&Symbol, &Usage)> {
        self.usages.iter().map(|(n, u)| (n, u))
    }

    pub fn is_repeated(&self, name: &str) -> bool {
        self.usage(name).is_some_and(|u| u.count > 1)
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.node)
    }
}

fn validate(
    node: &Node,
    position: Position,
    usages: &mut Vec<(Symbol, Usage)>,
    depth: usize,
    max_depth: usize,
) -> Result<(), EngineError> {
    if depth > max_depth {
        return Err(err_ctx!(
            RecursionLimit,
            node.span(),
            "pattern nesting exceeds {} levels",
            max_depth
        ));
    }

    let attrs = attribute_patterns(node);
    if !attrs.is_empty() {
        let spec = match attrs.as_slice() {
            [only] => CaptureSpec::of(only)?.filter(|s| s.variadic),
            _ => None,
        };
        let Some(spec) = spec else {
            return Err(err_ctx!(
                MalformedPattern,
                attrs[0].span(),
                "attribute patterns must be a single `$(... name)` capture, found `[{}]`",
                attrs.iter().map(|a| a.to_string()).collect::<Vec<_>>().join(" ")
            )
            .with_help("positional attribute patterns are not supported"));
        };
        record(&spec, usages)?;
    }

    if let Some(spec) = CaptureSpec::of(node)? {
        if spec.variadic && position == Position::Scalar {
            return Err(err_ctx!(
                MalformedPattern,
                node.span(),
                "variadic capture `{}` can only appear inside an argument list",
                node
            ));
        }
        return record(&spec, usages);
    }

    if let NodeKind::Call { target, args } = node.kind() {
        validate(target, Position::Scalar, usages, depth + 1, max_depth)?;
        Layout::of(args).map_err(|e| e.or_span(node.span()))?;
        for arg in args {
            validate(arg, Position::ListItem, usages, depth + 1, max_depth)?;
        }
    }
    Ok(())
}

fn record(spec: &CaptureSpec, usages: &mut Vec<(Symbol, Usage)>) -> Result<(), EngineError> {
    if spec.is_wildcard() {
        return Ok(());
    }
    let kind = spec.kind();
    if let Some((_, usage)) = usages.iter_mut().find(|(n, _)| *n == spec.name) {
        if usage.kind != kind {
            return Err(EngineError::AmbiguousCapture {
                message: format!(
                    "`{}` is captured both as a {} and as a {}",
                    spec.name, usage.kind, kind
                ),
                ctx: crate::diagnostics::ErrorContext::with_span(spec.span),
            });
        }
        usage.count += 1;
        usage.by_ref |= spec.by_ref;
        return Ok(());
    }
    usages.push((
        spec.name.clone(),
        Usage {
            kind,
            count: 1,
            by_ref: spec.by_ref,
        },
    ));
    Ok(())
}

/// Parses and validates every node of `nodes` as a pattern.
pub fn patterns_of<'a>(
    nodes: impl IntoIterator<Item = &'a Node>,
    config: &EngineConfig,
) -> Result<Vec<Pattern>, EngineError> {
    nodes.into_iter().map(|n| Pattern::with_config(n.clone(), config)).collect()
}

/// Substitutes `replacement` for every `#` and `_` identifier in a guard condition.
pub fn bind_guard_self(guard: &Node, replacement: &Node) -> Node {
    if guard.is_id_named(symbols::HASH) || guard.is_id_named(symbols::WILDCARD) {
        return replacement.clone();
    }
    match guard.kind() {
        NodeKind::Call { target, args } => {
            let new_target = bind_guard_self(target, replacement);
            let new_args: crate::ast::NodeList =
                args.iter().map(|a| bind_guard_self(a, replacement)).collect();
            guard.with_target(new_target).with_args(new_args)
        }
        _ => guard.clone(),
    }
}
