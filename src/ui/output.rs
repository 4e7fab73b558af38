//! ui::output
//!
//! Output formatting and display.
//!
//! # Design
//!
//! Output is formatted consistently and respects the quiet flag.
//! When `--json` is enabled, output is machine-readable JSON.

use std::fmt::Display;

use serde::Serialize;

/// Output verbosity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// Quiet mode - minimal output
    Quiet,
    /// Normal mode - standard output
    Normal,
    /// Debug mode - verbose output
    Debug,
}

impl Verbosity {
    /// Create verbosity from flags.
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

/// Print a message (respects quiet mode).
pub fn print(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        println!("{}", message);
    }
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

/// Print a value as pretty JSON (always shown).
pub fn json<T: Serialize>(value: &T) -> serde_json::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Lay out rows as left-aligned columns separated by two spaces.
///
/// Trailing whitespace is trimmed from every line.
pub fn format_table(rows: &[Vec<String>]) -> String {
    let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
    let widths: Vec<usize> = (0..columns)
        .map(|c| {
            rows.iter()
                .filter_map(|r| r.get(c))
                .map(|cell| cell.chars().count())
                .max()
                .unwrap_or(0)
        })
        .collect();

    rows.iter()
        .map(|row| {
            let line = row
                .iter()
                .zip(&widths)
                .map(|(cell, width)| format!("{:<width$}", cell, width = width))
                .collect::<Vec<_>>()
                .join("  ");
            line.trim_end().to_string()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    mod verbosity {
        use super::*;

        #[test]
        fn from_flags() {
            assert_eq!(Verbosity::from_flags(false, false), Verbosity::Normal);
            assert_eq!(Verbosity::from_flags(false, true), Verbosity::Debug);
            assert_eq!(Verbosity::from_flags(true, true), Verbosity::Quiet);
        }
    }

    mod format_table {
        use super::*;

        fn row(cells: &[&str]) -> Vec<String> {
            cells.iter().map(|c| c.to_string()).collect()
        }

        #[test]
        fn aligns_columns() {
            let table = format_table(&[row(&["api", "main", "ok"]), row(&["frontend", "dev", "fail"])]);
            assert_eq!(table, "api       main  ok\nfrontend  dev   fail");
        }

        #[test]
        fn ragged_rows() {
            let table = format_table(&[row(&["a", "b"]), row(&["long"])]);
            assert_eq!(table, "a     b\nlong");
        }

        #[test]
        fn empty() {
            assert_eq!(format_table(&[]), "");
        }
    }
}
