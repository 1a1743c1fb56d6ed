//! The nodematch command-line interface.
//!
//! Thin orchestration over the library: read a file, run the engine, hand the
//! result to [`output`].

use std::fs;
use std::path::Path;
use std::process;

use clap::Parser;
use miette::{IntoDiagnostic, NamedSource, Report, WrapErr};

use crate::cli::args::{Command, NodematchArgs};
use crate::config::EngineConfig;
use crate::macros::MacroProcessor;
use crate::matcher::match_pattern;
use crate::syntax::{parse, parse_one};

pub mod args;
pub mod output;

/// The main entry point for the CLI.
pub fn run() {
    let args = NodematchArgs::parse();

    let result = match args.command {
        Command::Expand { file, trace, config } => handle_expand(&file, trace, config.as_deref()),
        Command::Match { pattern, candidate } => handle_match(&pattern, &candidate),
        Command::Ast { file } => handle_ast(&file),
    };

    match result {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(report) => {
            eprintln!("{:?}", report);
            process::exit(1);
        }
    }
}

/// `Ok(false)` means the command ran but reported errors.
type CliResult = miette::Result<bool>;

fn read_source(path: &Path) -> miette::Result<String> {
    fs::read_to_string(path)
        .into_diagnostic()
        .wrap_err_with(|| format!("cannot read {}", path.display()))
}

fn with_source(err: crate::diagnostics::EngineError, name: &str, source: &str) -> Report {
    Report::new(err).with_source_code(NamedSource::new(name, source.to_string()))
}

/// Handles the `expand` subcommand.
fn handle_expand(path: &Path, trace: bool, config: Option<&Path>) -> CliResult {
    let config = match config {
        Some(config_path) => EngineConfig::load(config_path).map_err(Report::new)?,
        None => EngineConfig::default(),
    };
    let name = path.display().to_string();
    let source = read_source(path)?;
    let nodes = parse(&source).map_err(|e| with_source(e, &name, &source))?;

    let mut processor = MacroProcessor::new(config);
    let expanded = processor.process(&nodes);

    if trace {
        output::print_trace(processor.trace());
    }
    output::print_nodes(&expanded);
    output::print_records(processor.diagnostics().records(), &name, &source);
    Ok(!processor.diagnostics().has_errors())
}

/// Handles the `match` subcommand.
fn handle_match(pattern: &str, candidate: &str) -> CliResult {
    let pattern_node = parse_one(pattern).map_err(|e| with_source(e, "pattern", pattern))?;
    let candidate_node = parse_one(candidate).map_err(|e| with_source(e, "candidate", candidate))?;
    let captures = match_pattern(&candidate_node, &pattern_node).map_err(|e| with_source(e, "pattern", pattern))?;

    let json = serde_json::json!({
        "matched": captures.is_some(),
        "captures": captures,
    });
    println!("{}", serde_json::to_string_pretty(&json).into_diagnostic()?);
    Ok(true)
}

/// Handles the `ast` subcommand.
fn handle_ast(path: &Path) -> CliResult {
    let name = path.display().to_string();
    let source = read_source(path)?;
    let nodes = parse(&source).map_err(|e| with_source(e, &name, &source))?;
    println!("{}", serde_json::to_string_pretty(&nodes).into_diagnostic()?);
    Ok(true)
}
