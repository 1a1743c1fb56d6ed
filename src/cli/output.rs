//! Handles all user-facing output for the CLI.
//!
//! Diagnostics are rendered through `miette` against the source they point
//! into; macro traces are printed as line diffs with `difference`, colored
//! through `termcolor`.

use std::io::{self, Write};

use difference::{Changeset, Difference};
use miette::{NamedSource, Report};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use crate::ast::Node;
use crate::diagnostics::Record;
use crate::macros::MacroStep;

// ============================================================================
// DIAGNOSTICS
// ============================================================================

/// Renders one sink record with a source snippet.
pub fn render_record(record: &Record, name: &str, source: &str) -> String {
    let report = Report::new(record.clone()).with_source_code(NamedSource::new(name, source.to_string()));
    format!("{:?}", report)
}

/// Writes every record to stderr in emission order.
pub fn print_records(records: &[Record], name: &str, source: &str) {
    for record in records {
        eprintln!("{}", render_record(record, name, source));
    }
}

// ============================================================================
// NODES
// ============================================================================

pub fn print_nodes(nodes: &[Node]) {
    for node in nodes {
        println!("{}", node);
    }
}

// ============================================================================
// TRACE
// ============================================================================

/// Prints each macro step as a header plus a diff of its input and output.
pub fn print_trace(trace: &[MacroStep]) {
    let mut stdout = StandardStream::stdout(ColorChoice::Auto);
    for (i, step) in trace.iter().enumerate() {
        let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Yellow)).set_bold(true));
        let _ = writeln!(stdout, "--- Step {}: {} ({:?}) ---", i, step.macro_name, step.provenance);
        let _ = stdout.reset();

        let before = step.input.to_string();
        let after = step.output.to_string();
        let changeset = Changeset::new(&before, &after, " ");
        let _ = print_diff(&mut stdout, &changeset.diffs);
        let _ = stdout.reset();
        let _ = writeln!(stdout);
    }
}

fn print_diff(out: &mut impl WriteColor, diffs: &[Difference]) -> io::Result<()> {
    for diff in diffs {
        match diff {
            Difference::Same(text) => {
                out.reset()?;
                writeln!(out, " {}", text)?;
            }
            Difference::Add(text) => {
                out.set_color(ColorSpec::new().set_fg(Some(Color::Green)))?;
                writeln!(out, "+{}", text)?;
            }
            Difference::Rem(text) => {
                out.set_color(ColorSpec::new().set_fg(Some(Color::Red)))?;
                writeln!(out, "-{}", text)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Span;
    use crate::err_ctx;

    #[test]
    fn rendered_errors_carry_code_and_snippet() {
        let source = "(f $(... a) $(... b))";
        let err = err_ctx!(MalformedPattern, Span::new(3, 11), "two variadic captures")
            .with_help("keep one");
        let text = render_record(&Record::from(&err), "input.nm", source);
        assert!(text.contains("nodematch::MalformedPattern"));
        assert!(text.contains("input.nm"));
        assert!(text.contains("keep one"));
    }

    #[test]
    fn diff_marks_removed_and_added_words() {
        let mut buf = termcolor::Buffer::no_color();
        let changeset = Changeset::new("(f 1)", "(g 1)", " ");
        print_diff(&mut buf, &changeset.diffs).unwrap();
        let text = String::from_utf8(buf.into_inner()).unwrap();
        assert!(text.contains("-(f"));
        assert!(text.contains("+(g"));
    }
}
