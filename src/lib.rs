pub use crate::diagnostics::{Diagnostics, EngineError, ErrorContext, ErrorKind};

pub mod ast;
pub mod cli;
pub mod compiler;
pub mod config;
pub mod diagnostics;
pub mod eval;
pub mod expand;
pub mod macros;
pub mod matcher;
pub mod namer;
pub mod pattern;
pub mod syntax;

pub use crate::ast::{Node, NodeKind, NodeList, Span, Symbol, Value};
pub use crate::config::EngineConfig;
pub use crate::matcher::{match_pattern, Matcher};
pub use crate::pattern::{Capture, Captures, Pattern};
