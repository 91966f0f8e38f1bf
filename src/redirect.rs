//! Output redirection: `>`, `1>`, `>>`, `1>>`, `2>` and `2>>`.
//!
//! Only the first redirection operator on a line is honored. Everything from the
//! operator onwards is removed from the command's words.

use anyhow::{Result, anyhow, bail};
use std::fs::{File, OpenOptions};
use std::path::Path;

/// Which of the command's output streams is sent to the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectStream {
    Stdout,
    Stderr,
}

/// How the target file is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectMode {
    /// Create the file or cut it to zero length.
    Truncate,
    /// Create the file or write after its existing content.
    Append,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectionSpec {
    pub stream: RedirectStream,
    pub mode: RedirectMode,
    pub path: String,
}

impl RedirectionSpec {
    /// Opens the target, resolving a relative path against `cwd`.
    ///
    /// The error names the path and carries the OS error text.
    pub fn open(&self, cwd: &Path) -> Result<File> {
        let file = self.open_untruncated(cwd)?;
        self.truncate(&file)?;
        Ok(file)
    }

    /// Opens (creating if needed) the target without cutting its content.
    ///
    /// Used when several targets must all open before any of them is
    /// truncated; finish with [`RedirectionSpec::truncate`].
    pub fn open_untruncated(&self, cwd: &Path) -> Result<File> {
        let mut options = OpenOptions::new();
        options.create(true);
        match self.mode {
            RedirectMode::Truncate => options.write(true),
            RedirectMode::Append => options.append(true),
        };
        log::debug!("redirecting {:?} to {} ({:?})", self.stream, self.path, self.mode);
        options
            .open(cwd.join(&self.path))
            .map_err(|e| anyhow!("{}: {}", self.path, e))
    }

    /// Cuts `file` to zero length in truncate mode; a no-op for append.
    pub fn truncate(&self, file: &File) -> Result<()> {
        if self.mode == RedirectMode::Truncate {
            file.set_len(0)
                .map_err(|e| anyhow!("{}: {}", self.path, e))?;
        }
        Ok(())
    }
}

fn parse_operator(token: &str) -> Option<(RedirectStream, RedirectMode)> {
    match token {
        ">" | "1>" => Some((RedirectStream::Stdout, RedirectMode::Truncate)),
        ">>" | "1>>" => Some((RedirectStream::Stdout, RedirectMode::Append)),
        "2>" => Some((RedirectStream::Stderr, RedirectMode::Truncate)),
        "2>>" => Some((RedirectStream::Stderr, RedirectMode::Append)),
        _ => None,
    }
}

/// Splits `tokens` into the command words and the redirection, if any.
///
/// The command words are everything before the first redirection operator. An
/// operator with no path after it yields no redirection.
pub fn find_redirection(tokens: &[String]) -> (&[String], Option<RedirectionSpec>) {
    let Some(idx) = tokens
        .iter()
        .position(|t| parse_operator(t).is_some())
    else {
        return (tokens, None);
    };

    let spec = tokens.get(idx + 1).and_then(|path| {
        parse_operator(&tokens[idx]).map(|(stream, mode)| RedirectionSpec {
            stream,
            mode,
            path: path.clone(),
        })
    });
    (&tokens[..idx], spec)
}

/// [`find_redirection`] for a command that must have a name: a redirection
/// with nothing in front of it is a syntax error naming the operator.
pub fn split_command(tokens: &[String]) -> Result<(&[String], Option<RedirectionSpec>)> {
    let (words, redirect) = find_redirection(tokens);
    match (words.is_empty(), tokens.first()) {
        (true, Some(operator)) => bail!("syntax error near unexpected token `{operator}'"),
        _ => Ok((words, redirect)),
    }
}
