//! ui::output
//!
//! User-facing output.
//!
//! # Design
//!
//! Results go to stdout, warnings and errors to stderr. Everything except
//! errors and explicitly requested JSON respects `--quiet`. Diagnostics are
//! not printed here; they go through `tracing`.

use std::fmt::Display;

use serde::Serialize;

/// Output verbosity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Debug,
}

impl Verbosity {
    /// `--quiet` wins over `--debug`.
    pub fn from_flags(quiet: bool, debug: bool) -> Self {
        if quiet {
            Verbosity::Quiet
        } else if debug {
            Verbosity::Debug
        } else {
            Verbosity::Normal
        }
    }
}

/// Print a line of results (respects quiet mode).
pub fn print(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        println!("{}", message);
    }
}

/// Print a section heading followed by indented items, or `(none)`.
pub fn section<T: Display>(title: &str, items: &[T], verbosity: Verbosity) {
    if verbosity == Verbosity::Quiet {
        return;
    }
    println!("{}:", title);
    if items.is_empty() {
        println!("  (none)");
    } else {
        println!("{}", format_list(items, "  "));
    }
}

/// Print a value as pretty JSON. Always shown.
pub fn json<T: Serialize>(value: &T) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print an error message (always shown).
pub fn error(message: impl Display) {
    eprintln!("error: {}", message);
}

/// Print a warning message (respects quiet mode).
pub fn warn(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        eprintln!("warning: {}", message);
    }
}

/// Format a list of items, one per line.
pub fn format_list<T: Display>(items: &[T], prefix: &str) -> String {
    items
        .iter()
        .map(|item| format!("{}{}", prefix, item))
        .collect::<Vec<_>>()
        .join("\n")
}
