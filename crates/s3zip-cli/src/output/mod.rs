//! Output formatting module.

mod formatter;
mod human;
mod json;

pub use formatter::OutputFormatter;

use console::Term;
use human::HumanFormatter;
use json::JsonFormatter;

/// Creates an output formatter based on CLI flags.
///
/// `to_stderr` moves the summary off stdout when stdout carries the archive.
pub fn create_formatter(
    json: bool,
    verbose: bool,
    quiet: bool,
    to_stderr: bool,
) -> Box<dyn OutputFormatter> {
    let term = if to_stderr {
        Term::stderr()
    } else {
        Term::stdout()
    };

    if json {
        Box::new(JsonFormatter::new(term))
    } else {
        Box::new(HumanFormatter::new(verbose, quiet, term))
    }
}
