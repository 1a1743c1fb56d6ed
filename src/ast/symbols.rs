//! Well-known identifier names.
//!
//! The pattern grammar, the macro front-ends and the code the pattern compiler
//! emits are all expressed as ordinary nodes; these are the names they use.

// --- Pattern grammar ---

pub const SUBSTITUTE: &str = "$";
pub const DOT_DOT_DOT: &str = "...";
pub const DOT_DOT: &str = "..";
pub const AND: &str = "&&";
pub const OR: &str = "||";
pub const NOT: &str = "!";
/// Legacy guard form `x[cond]`.
pub const INDEX_BRACKETS: &str = "[]";
pub const HASH: &str = "#";
pub const WILDCARD: &str = "_";
pub const REF: &str = "ref";
pub const PARAMS: &str = "params";

// --- Front-end syntax ---

pub const BRACES: &str = "{}";
pub const SPLICE: &str = "#splice";
pub const ARROW: &str = "=>";
pub const CASE: &str = "case";
pub const DEFAULT: &str = "default";
pub const STATIC: &str = "static";
pub const TUPLE: &str = "tuple";
pub const IN: &str = "in";

pub const REPLACE: &str = "replace";
pub const DEFINE: &str = "define";
pub const UNROLL: &str = "unroll";
pub const STATIC_MATCHES: &str = "staticMatches";
pub const MATCH_CODE: &str = "matchCode";

/// Placeholder text rewritten by the hygienic namer inside macro bodies.
pub const UNIQUE_MARKER: &str = "unique#";
pub const TEMP_MARKER: &str = "temp#";

/// Vocabulary of the code emitted by the pattern compiler and understood by
/// the host evaluator.
pub mod host {
    pub const IF: &str = "if";
    pub const VAR: &str = "#var";
    pub const ASSIGN: &str = "=";
    pub const EQ: &str = "==";
    pub const NEQ: &str = "!=";
    pub const LT: &str = "<";
    pub const LE: &str = "<=";
    pub const GT: &str = ">";
    pub const GE: &str = ">=";
    pub const ADD: &str = "+";
    pub const SUB: &str = "-";
    pub const DOT: &str = ".";
    pub const INDEX: &str = "index";
    pub const SLICE: &str = "Slice";
    pub const IS_ID_NAMED: &str = "IsIdNamed";
    pub const CALLS: &str = "Calls";
    pub const CALLS_MIN: &str = "CallsMin";
    pub const HAS_VALUE: &str = "HasValue";
    pub const EQUALS: &str = "Equals";
    pub const WITHOUT_ATTRS: &str = "WithoutAttrs";
    pub const QUOTE: &str = "quote";
    pub const TUPLE: &str = "tuple";
    pub const LIST: &str = "list";

    pub const NAME: &str = "Name";
    pub const TARGET: &str = "Target";
    pub const ARGS: &str = "Args";
    pub const ARG_COUNT: &str = "ArgCount";
    pub const ATTRS: &str = "Attrs";
    pub const VALUE: &str = "Value";
    pub const IS_ID: &str = "IsId";
    pub const IS_CALL: &str = "IsCall";
    pub const IS_LITERAL: &str = "IsLiteral";
    pub const COUNT: &str = "Count";
    pub const IS_EMPTY: &str = "IsEmpty";
}
