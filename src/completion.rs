//! Command-name completion.
//!
//! [`CompletionState`] decides what a completion request does with the text typed so
//! far: ring the bell, accept the only match, extend to the longest common prefix of
//! several matches, or list them all when the same ambiguous request is repeated.

use std::collections::BTreeSet;

/// What the line editor should do in response to one completion request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// Ring the bell and leave the input untouched.
    Bell,
    /// Exactly one command matches; complete to it.
    Accept(String),
    /// Several commands match and share a prefix longer than the input.
    Extend(String),
    /// Print every match (sorted) and redraw the prompt with the input unchanged.
    List(Vec<String>),
}

/// Tracks repeated completion requests on the same input across a session.
#[derive(Debug, Default)]
pub struct CompletionState {
    last_attempted_input: String,
    repeat_count: u32,
}

impl CompletionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handles a completion request for `input` against the `known` command names.
    pub fn request(&mut self, input: &str, known: &BTreeSet<String>) -> Completion {
        let candidates: Vec<String> = known
            .range(input.to_string()..)
            .take_while(|name| name.starts_with(input))
            .cloned()
            .collect();

        let outcome = match candidates.as_slice() {
            [] => {
                self.repeat_count = 0;
                self.last_attempted_input = input.to_string();
                Completion::Bell
            }
            [only] => Completion::Accept(only.clone()),
            _ => {
                let lcp = longest_common_prefix(&candidates);
                if lcp.len() > input.len() {
                    Completion::Extend(lcp)
                } else {
                    self.ambiguous(input, candidates)
                }
            }
        };
        log::debug!(
            "completion for {:?}: {:?} (repeat {})",
            input,
            outcome,
            self.repeat_count
        );
        outcome
    }

    fn ambiguous(&mut self, input: &str, candidates: Vec<String>) -> Completion {
        if input == self.last_attempted_input {
            self.repeat_count += 1;
        } else {
            self.repeat_count = 1;
            self.last_attempted_input = input.to_string();
        }
        // Every request after the first repeats the listing.
        if self.repeat_count == 1 {
            Completion::Bell
        } else {
            Completion::List(candidates)
        }
    }
}

/// The longest common prefix of two strings, compared character by character.
pub fn common_prefix<'a>(a: &'a str, b: &str) -> &'a str {
    let end = a
        .char_indices()
        .zip(b.chars())
        .find(|((_, x), y)| x != y)
        .map(|((i, _), _)| i)
        .unwrap_or_else(|| a.len().min(b.len()));
    &a[..end]
}

/// The longest common prefix of every string in `names`; empty for an empty set.
pub fn longest_common_prefix(names: &[String]) -> String {
    let Some((first, rest)) = names.split_first() else {
        return String::new();
    };
    rest.iter()
        .fold(first.as_str(), |acc, name| common_prefix(acc, name))
        .to_string()
}
