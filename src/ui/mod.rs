//! ui
//!
//! User-facing output and diagnostic logging.
//!
//! # Modules
//!
//! - [`output`] - Output formatting and display
//! - [`logging`] - `tracing` subscriber setup
//!
//! # Design
//!
//! Command results go to stdout through [`output`]; diagnostics go to stderr
//! through `tracing`. Quiet mode silences everything but errors.

pub mod logging;
pub mod output;
