//! # Macro front-ends
//!
//! The macros in this module are thin clients of the engine: each one feeds a
//! pattern and a candidate or template into the matcher, the compiler or the
//! expander, and hands the resulting tree back to the [`MacroProcessor`].
//!
//! ## Module Structure
//!
//! - **Core Types**: [`MacroFn`], [`MacroTemplate`], [`MacroDef`], [`MacroKey`]
//! - **Registry**: [`MacroRegistry`], resolving a name and arity to a definition
//! - **Processor**: [`MacroProcessor`] in `expander.rs`, the outside-in driver
//! - **Built-ins**: `replace`, `define`, `unroll`, `staticMatches`,
//!   `matchCode` and `[static] matchCode` in `std.rs`
//!
//! ## Dispatch
//!
//! A call `(name arg…)` resolves to the definition registered for
//! `(name, arity)` if there is one, otherwise to the definition registered for
//! `name` at any arity. Resolution happens once per call site; nothing is
//! looked up reflectively.

use ::std::collections::HashMap;
use ::std::fmt;

use crate::ast::{Node, Symbol};
use crate::config::EngineConfig;
use crate::diagnostics::{Diagnostics, EngineError};
use crate::namer::Namer;
use crate::pattern::Pattern;

pub mod expander;
pub mod std;

pub use expander::MacroProcessor;

// ============================================================================
// CORE DATA STRUCTURES
// ============================================================================

/// A native macro. `Ok(None)` means the macro declined and the call stays as
/// written; `Ok(Some(output))` replaces the call and is expanded again.
pub type MacroFn = fn(&Node, &mut MacroContext<'_>) -> Result<Option<Node>, EngineError>;

/// One `define`d rule: a validated pattern and the body it expands to.
#[derive(Debug, Clone)]
pub struct MacroTemplate {
    pub pattern: Pattern,
    pub body: Node,
}

impl MacroTemplate {
    pub fn new(pattern: Node, body: Node) -> Result<Self, EngineError> {
        MacroTemplate::with_config(pattern, body, &EngineConfig::default())
    }

    pub fn with_config(pattern: Node, body: Node, config: &EngineConfig) -> Result<Self, EngineError> {
        Ok(MacroTemplate {
            pattern: Pattern::with_config(pattern, config)?,
            body,
        })
    }
}

#[derive(Debug, Clone)]
pub enum MacroDef {
    Native(MacroFn),
    /// Rules tried in definition order; the first match wins.
    Templates(Vec<MacroTemplate>),
}

/// Where a definition came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacroProvenance {
    Core,
    User,
}

/// Registry key: a name and an exact arity, or `None` for any arity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MacroKey {
    pub name: Symbol,
    pub arity: Option<usize>,
}

impl MacroKey {
    pub fn new(name: impl Into<Symbol>, arity: Option<usize>) -> Self {
        MacroKey {
            name: name.into(),
            arity,
        }
    }
}

impl fmt::Display for MacroKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.arity {
            Some(n) => write!(f, "{}/{}", self.name, n),
            None => write!(f, "{}/*", self.name),
        }
    }
}

/// One recorded expansion, for tracing.
#[derive(Debug, Clone)]
pub struct MacroStep {
    pub macro_name: Symbol,
    pub provenance: MacroProvenance,
    pub input: Node,
    pub output: Node,
}

/// Capabilities a native macro receives.
pub struct MacroContext<'a> {
    pub registry: &'a mut MacroRegistry,
    pub diagnostics: &'a mut Diagnostics,
    pub namer: &'a Namer,
    pub config: &'a EngineConfig,
}

// ============================================================================
// REGISTRY
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct MacroRegistry {
    macros: HashMap<MacroKey, (MacroProvenance, MacroDef)>,
}

impl MacroRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in macros.
    pub fn with_builtins() -> Self {
        let mut registry = MacroRegistry::new();
        self::std::register_std_macros(&mut registry);
        registry
    }

    /// Registers a native macro, returning the definition it replaced.
    ///
    /// ```rust
    /// use nodematch::macros::{MacroFn, MacroRegistry};
    /// let mut reg = MacroRegistry::new();
    /// let decline: MacroFn = |_, _| Ok(None);
    /// assert!(reg.register("foo", None, decline).is_none());
    /// assert!(reg.register("foo", None, decline).is_some());
    /// assert!(reg.contains("foo", 3));
    /// ```
    pub fn register(&mut self, name: &str, arity: Option<usize>, func: MacroFn) -> Option<MacroDef> {
        self.macros
            .insert(MacroKey::new(name, arity), (MacroProvenance::Core, MacroDef::Native(func)))
            .map(|(_, def)| def)
    }

    /// Adds a user rule under `key`, after any rules already there. A native
    /// definition under the same key is replaced.
    pub fn register_template(&mut self, key: MacroKey, template: MacroTemplate) {
        match self.macros.get_mut(&key) {
            Some((MacroProvenance::User, MacroDef::Templates(rules))) => rules.push(template),
            _ => {
                self.macros
                    .insert(key, (MacroProvenance::User, MacroDef::Templates(vec![template])));
            }
        }
    }

    pub fn unregister(&mut self, key: &MacroKey) -> Option<MacroDef> {
        self.macros.remove(key).map(|(_, def)| def)
    }

    /// Resolves a call of `name` with `arity` arguments.
    pub fn lookup(&self, name: &str, arity: usize) -> Option<(MacroProvenance, &MacroDef)> {
        let exact = MacroKey::new(name, Some(arity));
        let any = MacroKey::new(name, None);
        self.macros
            .get(&exact)
            .or_else(|| self.macros.get(&any))
            .map(|(prov, def)| (*prov, def))
    }

    pub fn contains(&self, name: &str, arity: usize) -> bool {
        self.lookup(name, arity).is_some()
    }

    pub fn len(&self) -> usize {
        self.macros.len()
    }

    pub fn is_empty(&self) -> bool {
        self.macros.is_empty()
    }

    /// Registered keys, sorted for stable output.
    pub fn keys(&self) -> Vec<&MacroKey> {
        let mut keys: Vec<_> = self.macros.keys().collect();
        keys.sort_by(|a, b| a.name.cmp(&b.name).then(a.arity.cmp(&b.arity)));
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::parse_one;

    fn rule(pattern: &str, body: &str) -> MacroTemplate {
        MacroTemplate::new(parse_one(pattern).unwrap(), parse_one(body).unwrap()).unwrap()
    }

    #[test]
    fn exact_arity_wins_over_any_arity() {
        let mut reg = MacroRegistry::new();
        reg.register_template(MacroKey::new("f", None), rule("(f $(... xs))", "any"));
        reg.register_template(MacroKey::new("f", Some(1)), rule("(f $x)", "one"));
        let Some((_, MacroDef::Templates(rules))) = reg.lookup("f", 1) else {
            panic!("f/1 should resolve");
        };
        assert_eq!(rules[0].body.to_string(), "one");
        let Some((_, MacroDef::Templates(rules))) = reg.lookup("f", 4) else {
            panic!("f/4 should fall back");
        };
        assert_eq!(rules[0].body.to_string(), "any");
        assert!(reg.lookup("g", 0).is_none());
    }

    #[test]
    fn user_rules_accumulate_in_order() {
        let mut reg = MacroRegistry::new();
        let key = MacroKey::new("f", Some(1));
        reg.register_template(key.clone(), rule("(f 1)", "first"));
        reg.register_template(key.clone(), rule("(f $x)", "second"));
        let Some((prov, MacroDef::Templates(rules))) = reg.lookup("f", 1) else {
            panic!("f/1 should resolve");
        };
        assert_eq!(prov, MacroProvenance::User);
        assert_eq!(rules.len(), 2);
        assert_eq!(key.to_string(), "f/1");
    }

    #[test]
    fn builtins_are_registered() {
        let reg = MacroRegistry::with_builtins();
        for name in ["replace", "define", "unroll", "staticMatches", "matchCode"] {
            assert!(reg.contains(name, 2), "{}", name);
        }
    }
}
