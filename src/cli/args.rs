//! Command-line arguments and subcommands for the nodematch CLI.
//!
//! Declared with the `clap` derive API.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "nodematch",
    version,
    about = "Tree pattern matching, template expansion and match-code synthesis."
)]
pub struct NodematchArgs {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Macro-expand a file and print the resulting nodes.
    Expand {
        /// The s-expression file to expand.
        #[arg(required = true)]
        file: PathBuf,
        /// Show every macro step as a colored diff.
        #[arg(long)]
        trace: bool,
        /// JSON engine configuration.
        #[arg(long, value_name = "JSON")]
        config: Option<PathBuf>,
    },
    /// Match one candidate against one pattern and print the captures as JSON.
    Match {
        /// The pattern, e.g. `(+ $a $b)`.
        pattern: String,
        /// The candidate, e.g. `(+ 1 2)`.
        candidate: String,
    },
    /// Print the parsed tree of a file as JSON.
    Ast {
        /// The s-expression file to parse.
        #[arg(required = true)]
        file: PathBuf,
    },
}
