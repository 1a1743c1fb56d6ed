//! Unified, `miette`-based diagnostics for nodematch.
//!
//! Every failure the engine can report is an [`EngineError`]. A plain pattern
//! mismatch is *not* an error: matchers return `Ok(false)` / `Ok(None)` and the
//! compiled code simply falls through to the next case.
//!
//! # Error Construction Macros
//!
//! - `err_msg!(MalformedPattern, "two variadic captures in `{}`", list)` builds
//!   an error without a location.
//! - `err_ctx!(MalformedPattern, node.span(), "default case must be last")`
//!   attaches the span of the offending node.
//!
//! # Sinks
//!
//! Macro front-ends do not abort on errors. They push a [`Record`] into a
//! [`DiagnosticSink`] (normally [`Diagnostics`]) and leave their input
//! unchanged, so one bad pattern degrades one macro call and nothing else.

use std::fmt;

use miette::{Diagnostic, LabeledSpan};
use thiserror::Error;

use crate::ast::Span;

// ============================================================================
// ERROR CLASSIFICATION
// ============================================================================

/// Type-safe error classification corresponding to [`EngineError`] variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The s-expression surface could not be read
    Parse,
    /// Structurally invalid pattern (two variadics in one list, bad attributes, misplaced default)
    MalformedPattern,
    /// A capture name used inconsistently (single vs. list) across patterns
    AmbiguousCapture,
    /// A list capture substituted where exactly one node is required
    ScalarSplice,
    /// Tree depth or re-expansion budget exhausted
    RecursionLimit,
    /// Host evaluator failure (guards, compiled code)
    Eval,
    /// Invalid engine configuration
    Config,
    /// Internal engine errors
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Parse => "Parse",
            ErrorKind::MalformedPattern => "MalformedPattern",
            ErrorKind::AmbiguousCapture => "AmbiguousCapture",
            ErrorKind::ScalarSplice => "ScalarSplice",
            ErrorKind::RecursionLimit => "RecursionLimit",
            ErrorKind::Eval => "Eval",
            ErrorKind::Config => "Config",
            ErrorKind::Internal => "Internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Minimal error context: where it happened and how to fix it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ErrorContext {
    pub span: Option<Span>,
    pub help: Option<String>,
}

impl ErrorContext {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_span(span: Span) -> Self {
        Self {
            span: Some(span),
            help: None,
        }
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }
}

// ============================================================================
// ENGINE ERROR
// ============================================================================

/// Unified error type for every non-mismatch failure mode.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EngineError {
    #[error("Parse error: {message}")]
    Parse { message: String, ctx: ErrorContext },
    #[error("Malformed pattern: {message}")]
    MalformedPattern { message: String, ctx: ErrorContext },
    #[error("Ambiguous capture: {message}")]
    AmbiguousCapture { message: String, ctx: ErrorContext },
    #[error("Cannot splice a list capture here: {message}")]
    ScalarSplice { message: String, ctx: ErrorContext },
    #[error("Recursion limit exceeded: {message}")]
    RecursionLimit { message: String, ctx: ErrorContext },
    #[error("Evaluation error: {message}")]
    Eval { message: String, ctx: ErrorContext },
    #[error("Configuration error: {message}")]
    Config { message: String, ctx: ErrorContext },
    #[error("Internal error: {message}")]
    Internal { message: String, ctx: ErrorContext },
}

impl EngineError {
    fn parts(&self) -> (&String, &ErrorContext) {
        match self {
            EngineError::Parse { message, ctx }
            | EngineError::MalformedPattern { message, ctx }
            | EngineError::AmbiguousCapture { message, ctx }
            | EngineError::ScalarSplice { message, ctx }
            | EngineError::RecursionLimit { message, ctx }
            | EngineError::Eval { message, ctx }
            | EngineError::Config { message, ctx }
            | EngineError::Internal { message, ctx } => (message, ctx),
        }
    }

    fn ctx_mut(&mut self) -> &mut ErrorContext {
        match self {
            EngineError::Parse { ctx, .. }
            | EngineError::MalformedPattern { ctx, .. }
            | EngineError::AmbiguousCapture { ctx, .. }
            | EngineError::ScalarSplice { ctx, .. }
            | EngineError::RecursionLimit { ctx, .. }
            | EngineError::Eval { ctx, .. }
            | EngineError::Config { ctx, .. }
            | EngineError::Internal { ctx, .. } => ctx,
        }
    }

    /// Returns the type-safe classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::Parse { .. } => ErrorKind::Parse,
            EngineError::MalformedPattern { .. } => ErrorKind::MalformedPattern,
            EngineError::AmbiguousCapture { .. } => ErrorKind::AmbiguousCapture,
            EngineError::ScalarSplice { .. } => ErrorKind::ScalarSplice,
            EngineError::RecursionLimit { .. } => ErrorKind::RecursionLimit,
            EngineError::Eval { .. } => ErrorKind::Eval,
            EngineError::Config { .. } => ErrorKind::Config,
            EngineError::Internal { .. } => ErrorKind::Internal,
        }
    }

    pub fn message(&self) -> &str {
        self.parts().0
    }

    pub fn span(&self) -> Option<Span> {
        self.parts().1.span
    }

    /// Attaches `span` unless the error already points somewhere more precise.
    pub fn or_span(mut self, span: Span) -> Self {
        let ctx = self.ctx_mut();
        if ctx.span.is_none() {
            ctx.span = Some(span);
        }
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.ctx_mut().help = Some(help.into());
        self
    }
}

impl Diagnostic for EngineError {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new(format!("nodematch::{}", self.kind())))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.parts()
            .1
            .help
            .as_ref()
            .map(|h| Box::new(h) as Box<dyn fmt::Display + 'a>)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let (message, ctx) = self.parts();
        let span = ctx.span?;
        Some(Box::new(std::iter::once(label_for(Some(message.clone()), span))))
    }
}

/// Constructs an [`EngineError`] variant with a formatted message and no location.
#[macro_export]
macro_rules! err_msg {
    ($variant:ident, $($arg:tt)+) => {
        $crate::diagnostics::EngineError::$variant {
            message: format!($($arg)+),
            ctx: $crate::diagnostics::ErrorContext::none(),
        }
    };
}

/// Constructs an [`EngineError`] variant with a formatted message located at a span.
#[macro_export]
macro_rules! err_ctx {
    ($variant:ident, $span:expr, $($arg:tt)+) => {
        $crate::diagnostics::EngineError::$variant {
            message: format!($($arg)+),
            ctx: $crate::diagnostics::ErrorContext::with_span($span),
        }
    };
}

// ============================================================================
// DIAGNOSTIC SINK
// ============================================================================

/// How serious a reported record is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Note,
    Warning,
    Error,
}

/// One `(severity, location, message)` record pushed through a sink.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct Record {
    pub severity: Severity,
    pub kind: Option<ErrorKind>,
    pub message: String,
    pub span: Option<Span>,
    pub help: Option<String>,
}

impl Diagnostic for Record {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.kind
            .map(|k| Box::new(format!("nodematch::{}", k)) as Box<dyn fmt::Display + 'a>)
    }

    fn severity(&self) -> Option<miette::Severity> {
        Some(match self.severity {
            Severity::Note => miette::Severity::Advice,
            Severity::Warning => miette::Severity::Warning,
            Severity::Error => miette::Severity::Error,
        })
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.help
            .as_ref()
            .map(|h| Box::new(h) as Box<dyn fmt::Display + 'a>)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let span = self.span?;
        Some(Box::new(std::iter::once(label_for(None, span))))
    }
}

impl From<&EngineError> for Record {
    fn from(err: &EngineError) -> Self {
        let (message, ctx) = err.parts();
        Record {
            severity: Severity::Error,
            kind: Some(err.kind()),
            message: message.clone(),
            span: ctx.span,
            help: ctx.help.clone(),
        }
    }
}

/// Capability through which the engine reports diagnostics.
pub trait DiagnosticSink {
    fn emit(&mut self, record: Record);
}

/// A sink that collects records in emission order.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    records: Vec<Record>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an engine error at `Error` severity.
    pub fn report(&mut self, err: &EngineError) {
        self.emit(Record::from(err));
    }

    pub fn warn(&mut self, span: Option<Span>, message: impl Into<String>) {
        self.emit(Record {
            severity: Severity::Warning,
            kind: None,
            message: message.into(),
            span,
            help: None,
        });
    }

    pub fn note(&mut self, span: Option<Span>, message: impl Into<String>) {
        self.emit(Record {
            severity: Severity::Note,
            kind: None,
            message: message.into(),
            span,
            help: None,
        });
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn errors(&self) -> impl Iterator<Item = &Record> {
        self.records.iter().filter(|r| r.severity == Severity::Error)
    }

    pub fn has_errors(&self) -> bool {
        self.errors().next().is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn into_records(self) -> Vec<Record> {
        self.records
    }
}

impl DiagnosticSink for Diagnostics {
    fn emit(&mut self, record: Record) {
        match record.severity {
            Severity::Error => log::debug!("diagnostic: {}", record.message),
            Severity::Warning => log::warn!("{}", record.message),
            Severity::Note => log::trace!("note: {}", record.message),
        }
        self.records.push(record);
    }
}

// ============================================================================
// INTERNAL HELPERS
// ============================================================================

fn label_for(text: Option<String>, span: Span) -> LabeledSpan {
    LabeledSpan::new(text, span.start, span.len().max(1))
}
