//! The macro processor: outside-in expansion of a whole tree.
//!
//! ## Recursion and Expansion
//!
//! A call whose target resolves in the registry is handed to its macro before
//! its children are looked at. The output replaces the call and is expanded
//! again, up to `max_macro_depth` nested re-expansions; a macro that declines
//! leaves the call in place and expansion continues into its children.
//! Results of the form `(#splice item…)` are spliced into the enclosing
//! argument, attribute or top-level list.
//!
//! ## Error Handling
//!
//! A macro that fails is reported to [`Diagnostics`] and the call is left
//! exactly as written, so one bad pattern costs one call site.

use crate::ast::{symbols, Node, NodeKind, NodeList};
use crate::config::EngineConfig;
use crate::diagnostics::{Diagnostics, EngineError};
use crate::expand::Expander;
use crate::eval::HostEvaluator;
use crate::matcher::Matcher;
use crate::namer::Namer;
use crate::pattern::Captures;
use crate::err_ctx;

use super::{MacroContext, MacroDef, MacroProvenance, MacroRegistry, MacroStep, MacroTemplate};

pub struct MacroProcessor {
    registry: MacroRegistry,
    diagnostics: Diagnostics,
    namer: Namer,
    config: EngineConfig,
    trace: Vec<MacroStep>,
}

impl Default for MacroProcessor {
    fn default() -> Self {
        MacroProcessor::new(EngineConfig::default())
    }
}

impl MacroProcessor {
    /// A processor with the built-in macros and a fresh naming session.
    pub fn new(config: EngineConfig) -> Self {
        MacroProcessor::with_parts(MacroRegistry::with_builtins(), Namer::new(), config)
    }

    pub fn with_parts(registry: MacroRegistry, namer: Namer, config: EngineConfig) -> Self {
        MacroProcessor {
            registry,
            diagnostics: Diagnostics::new(),
            namer,
            config,
            trace: Vec::new(),
        }
    }

    pub fn registry(&self) -> &MacroRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut MacroRegistry {
        &mut self.registry
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn take_diagnostics(&mut self) -> Diagnostics {
        ::std::mem::take(&mut self.diagnostics)
    }

    pub fn namer(&self) -> &Namer {
        &self.namer
    }

    pub fn trace(&self) -> &[MacroStep] {
        &self.trace
    }

    /// Expands a sequence of top-level nodes, splicing `#splice` results.
    ///
    /// ```rust
    /// use nodematch::macros::MacroProcessor;
    /// use nodematch::syntax::parse;
    /// let mut mp = MacroProcessor::default();
    /// let out = mp.process(&parse("(define (sq $x) (* $x $x)) (sq 3)").unwrap());
    /// assert_eq!(out.len(), 1);
    /// assert_eq!(out[0].to_string(), "(* 3 3)");
    /// assert!(!mp.diagnostics().has_errors());
    /// ```
    pub fn process(&mut self, nodes: &[Node]) -> Vec<Node> {
        let items: NodeList = nodes.iter().cloned().collect();
        let expanded = self.expand_list(&items, 0, 0);
        expanded.unwrap_or(items).into_iter().collect()
    }

    /// Expands one node; a top-level `#splice` result is returned as is.
    pub fn process_node(&mut self, node: &Node) -> Node {
        self.expand_node(node, 0, 0)
    }

    fn expand_node(&mut self, node: &Node, depth: usize, macro_depth: usize) -> Node {
        if depth > self.config.max_depth {
            self.report(&err_ctx!(
                RecursionLimit,
                node.span(),
                "tree nested deeper than {} levels",
                self.config.max_depth
            ));
            return node.clone();
        }

        if let Some(output) = self.invoke(node, depth, macro_depth) {
            return output;
        }

        let attrs = self.expand_list(node.attrs(), depth + 1, macro_depth);
        let rebuilt = match node.kind() {
            NodeKind::Id(_) | NodeKind::Literal(_) => node.clone(),
            NodeKind::Call { target, args } => {
                let new_target = self.expand_node(target, depth + 1, macro_depth);
                let new_args = self.expand_list(args, depth + 1, macro_depth);
                if Node::ptr_eq(&new_target, target) && new_args.is_none() {
                    node.clone()
                } else {
                    node.with_target(new_target)
                        .with_args(new_args.unwrap_or_else(|| args.clone()))
                }
            }
        };
        match attrs {
            Some(attrs) => rebuilt.with_attrs(attrs),
            None => rebuilt,
        }
    }

    /// Expands list items, splicing `#splice` results; `None` when unchanged.
    fn expand_list(&mut self, items: &NodeList, depth: usize, macro_depth: usize) -> Option<NodeList> {
        let mut out = NodeList::new();
        let mut changed = false;
        for item in items {
            let expanded = self.expand_node(item, depth, macro_depth);
            if is_splice(&expanded) {
                out.extend(expanded.args().cloned().unwrap_or_default());
                changed = true;
                continue;
            }
            changed |= !Node::ptr_eq(&expanded, item);
            out.push_back(expanded);
        }
        changed.then_some(out)
    }

    /// Runs the macro `node` calls, if any. `None` means no macro took it.
    fn invoke(&mut self, node: &Node, depth: usize, macro_depth: usize) -> Option<Node> {
        let name = node.target_name()?.clone();
        let (provenance, def) = self
            .registry
            .lookup(&name, node.arg_count())
            .map(|(p, d)| (p, d.clone()))?;

        if macro_depth >= self.config.max_macro_depth {
            self.report(&err_ctx!(
                RecursionLimit,
                node.span(),
                "macro `{}` re-expanded more than {} times",
                name,
                self.config.max_macro_depth
            ));
            return Some(node.clone());
        }

        log::debug!("expanding `{}` at {}..{}", name, node.span().start, node.span().end);
        let result = match def {
            MacroDef::Native(func) => {
                let mut ctx = MacroContext {
                    registry: &mut self.registry,
                    diagnostics: &mut self.diagnostics,
                    namer: &self.namer,
                    config: &self.config,
                };
                func(node, &mut ctx)
            }
            MacroDef::Templates(rules) => self.apply_rules(&name, &rules, node),
        };

        match result {
            Ok(Some(output)) => {
                self.trace.push(MacroStep {
                    macro_name: name,
                    provenance,
                    input: node.clone(),
                    output: output.clone(),
                });
                Some(self.expand_node(&output, depth, macro_depth + 1))
            }
            Ok(None) => None,
            Err(err) => {
                self.report(&err.or_span(node.span()));
                Some(node.clone())
            }
        }
    }

    /// Expands a call of a `define`d macro with the first rule that matches.
    fn apply_rules(&mut self, name: &str, rules: &[MacroTemplate], node: &Node) -> Result<Option<Node>, EngineError> {
        let mut guards = HostEvaluator::with_config(&self.config);
        let mut matcher = Matcher::with_config(&mut guards, &self.config);
        let mut captures = Captures::new();
        let mut unmatched = NodeList::new();
        for rule in rules {
            captures.clear();
            if !matcher.matches(node, &rule.pattern, &mut captures, &mut unmatched)? {
                continue;
            }
            let body = self.namer.hygienize(&rule.body);
            let output = Expander::with_config(&captures, &self.config).expand(&body)?;
            return Ok(Some(rule_output(output, unmatched)));
        }
        self.diagnostics
            .warn(Some(node.span()), format!("no rule of `{}` matches `{}`", name, node));
        Ok(None)
    }

    fn report(&mut self, err: &EngineError) {
        self.diagnostics.report(err);
    }
}

fn is_splice(node: &Node) -> bool {
    node.calls_any(symbols::SPLICE) && !node.has_attrs()
}

/// An unattributed `{}` block becomes a `#splice` of its statements.
pub(crate) fn braces_to_splice(node: Node) -> Node {
    if node.calls_any(symbols::BRACES) && !node.has_attrs() {
        return node.with_target(Node::id(symbols::SPLICE));
    }
    node
}

/// What a matched rule leaves at the call site: the expanded template with the
/// call's unclaimed attributes carried over. A splice hands them to each item
/// so the marker itself stays unattributed.
pub(crate) fn rule_output(output: Node, unmatched: NodeList) -> Node {
    let output = braces_to_splice(output);
    if unmatched.is_empty() {
        return output;
    }
    match output.args() {
        Some(items) if is_splice(&output) => {
            let items: NodeList = items.iter().map(|item| item.plus_attrs(unmatched.iter().cloned())).collect();
            output.with_args(items)
        }
        _ => output.plus_attrs(unmatched),
    }
}
