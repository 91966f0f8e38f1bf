//! Glue between rustyline and the completion state machine.

use crate::completion::{Completion, CompletionState};
use rustyline::completion::{Completer, FilenameCompleter, Pair};
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{Context, Helper};
use std::cell::RefCell;
use std::collections::BTreeSet;
use std::io::{self, Write};

pub(crate) struct ShellHelper {
    commands: BTreeSet<String>,
    state: RefCell<CompletionState>,
    files: FilenameCompleter,
}

impl ShellHelper {
    pub(crate) fn new(commands: BTreeSet<String>) -> Self {
        Self {
            commands,
            state: RefCell::new(CompletionState::new()),
            files: FilenameCompleter::new(),
        }
    }
}

fn pair(text: String) -> Pair {
    Pair {
        display: text.clone(),
        replacement: text,
    }
}

impl ShellHelper {
    /// Completion for the text before `pos`, writing any candidate listing to
    /// `listing`.
    fn complete_into(
        &self,
        line: &str,
        pos: usize,
        ctx: &Context<'_>,
        listing: &mut dyn Write,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let typed = &line[..pos];
        let start = typed.len() - typed.trim_start().len();
        let word = &typed[start..];

        // Past the command name: complete file names instead.
        if word.contains(' ') {
            return self.files.complete(line, pos, ctx);
        }

        let candidates = match self.state.borrow_mut().request(word, &self.commands) {
            // No candidates makes rustyline ring the bell.
            Completion::Bell => Vec::new(),
            Completion::Accept(name) => vec![pair(format!("{name} "))],
            Completion::Extend(prefix) => vec![pair(prefix)],
            Completion::List(names) => {
                write!(listing, "\n{}\n", names.join(" "))?;
                listing.flush()?;
                // Replacing the word with itself redraws the prompt below the listing.
                vec![pair(word.to_string())]
            }
        };
        Ok((start, candidates))
    }
}

impl Completer for ShellHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        self.complete_into(line, pos, ctx, &mut io::stdout().lock())
    }
}

impl Hinter for ShellHelper {
    type Hint = String;

    fn hint(&self, _line: &str, _pos: usize, _ctx: &Context<'_>) -> Option<String> {
        None
    }
}

impl Highlighter for ShellHelper {}

impl Validator for ShellHelper {}

impl Helper for ShellHelper {}
