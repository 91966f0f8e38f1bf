//! A small interactive shell.
//!
//! The shell reads a line, splits it into words honoring quotes and backslash
//! escapes, and runs the first word either as a builtin implemented in Rust or as
//! an external program found on `PATH`. Output can be redirected to a file, and two
//! commands can be chained with `|`.
//!
//! The main entry point is [`Interpreter`], which executes whole input lines and
//! drives the interactive loop. The public modules expose the individual pieces
//! (tokenizer, redirection, runnables, pipelines, completion) so they can be used
//! and tested on their own.

pub mod builtin;
pub mod command;
pub mod completion;
mod editor;
pub mod env;
pub mod external;
mod interpreter;
pub mod lexer;
pub mod pipeline;
pub mod redirect;
pub mod runnable;

/// Just a convenient re-export of the interactive command runner.
///
/// See [`Interpreter`] for the high-level API and examples.
pub use interpreter::{Interpreter, PROMPT};
