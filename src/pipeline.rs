//! Two commands joined by `|`.
//!
//! The left command's stdout is connected to the right command's stdin through an
//! OS pipe. Both sides are started before either is awaited: the right side is
//! awaited on the calling thread while a single background thread waits for the
//! left side, so a producer that fills the pipe buffer never blocks a consumer
//! that has not been started yet.

use crate::command::{ExitCode, Streams};
use crate::env::Environment;
use crate::redirect::{RedirectStream, RedirectionSpec, split_command};
use crate::runnable::Runnable;
use anyhow::{Context, Result, anyhow, bail};
use std::fs::File;
use std::io;
use std::thread;

/// Splits `tokens` at the first `|`.
///
/// Later `|` tokens stay in the right-hand command as ordinary words.
pub fn split_pipeline(tokens: &[String]) -> Option<(&[String], &[String])> {
    let idx = tokens.iter().position(|t| t == "|")?;
    Some((&tokens[..idx], &tokens[idx + 1..]))
}

/// One side of the pipeline after resolution, before anything has started.
struct Stage {
    runnable: Runnable,
    redirect: Option<(RedirectStream, File)>,
}

impl Stage {
    /// Applies the stage's own redirection on top of `streams`.
    fn streams(&mut self, streams: Streams) -> Streams {
        match self.redirect.take() {
            Some((RedirectStream::Stdout, file)) => streams.with_stdout(file),
            Some((RedirectStream::Stderr, file)) => streams.with_stderr(file),
            None => streams,
        }
    }
}

fn resolve_side(
    tokens: &[String],
    env: &Environment,
) -> Result<(Option<Runnable>, Option<RedirectionSpec>, String)> {
    let (words, redirect) = split_command(tokens)?;
    let name = words.first().cloned().unwrap_or_default();
    Ok((Runnable::resolve(words, env), redirect, name))
}

/// Opens every target, and truncates them only once all of them have opened,
/// so a failing target leaves the other side's file untouched.
fn open_redirects(
    specs: [Option<RedirectionSpec>; 2],
    env: &Environment,
) -> Result<[Option<(RedirectStream, File)>; 2]> {
    let mut opened = Vec::with_capacity(specs.len());
    for spec in specs {
        opened.push(match spec {
            Some(spec) => {
                let file = spec.open_untruncated(&env.current_dir)?;
                Some((spec, file))
            }
            None => None,
        });
    }

    let mut ready = [None, None];
    for (slot, side) in ready.iter_mut().zip(opened) {
        if let Some((spec, file)) = side {
            spec.truncate(&file)?;
            *slot = Some((spec.stream, file));
        }
    }
    Ok(ready)
}

/// Runs `left | right` and returns the exit code of `right`.
///
/// Nothing is started unless both sides resolve and every redirection target
/// opens; the error then names the offending command or path.
pub fn run_pipeline(left: &[String], right: &[String], env: &mut Environment) -> Result<ExitCode> {
    if left.is_empty() || right.is_empty() {
        bail!("syntax error near unexpected token `|'");
    }

    let (left_runnable, left_redirect, left_name) = resolve_side(left, env)?;
    let (right_runnable, right_redirect, right_name) = resolve_side(right, env)?;
    let (left_runnable, right_runnable) = match (left_runnable, right_runnable) {
        (Some(l), Some(r)) => (l, r),
        (l, r) => {
            let missing: Vec<String> = [(l.is_none(), &left_name), (r.is_none(), &right_name)]
                .into_iter()
                .filter(|(missing, _)| *missing)
                .map(|(_, name)| format!("{name}: command not found"))
                .collect();
            return Err(anyhow!(missing.join("\n")));
        }
    };

    let [left_file, right_file] = open_redirects([left_redirect, right_redirect], env)?;
    let mut producer = Stage {
        runnable: left_runnable,
        redirect: left_file,
    };
    let mut consumer = Stage {
        runnable: right_runnable,
        redirect: right_file,
    };

    let (reader, writer) = io::pipe().context("failed to create pipe")?;
    log::info!("pipeline: {} | {}", producer.runnable.name(), consumer.runnable.name());

    let producer_streams = producer.streams(Streams::inherited().with_stdout(writer));
    let consumer_streams = consumer.streams(Streams::inherited().with_stdin(reader));

    // The producer only ever sees a copy of the environment.
    let producer = producer
        .runnable
        .prepare(producer_streams)
        .start_detached(env.clone())?;
    let producer = thread::Builder::new()
        .name("pipeline-producer".to_string())
        .spawn(move || producer.wait())
        .context("failed to start pipeline waiter")?;

    let consumer_result = consumer
        .runnable
        .prepare(consumer_streams)
        .start(env)
        .and_then(|handle| handle.wait());

    match producer.join() {
        Ok(Ok(code)) => log::debug!("pipeline producer exited with {code}"),
        Ok(Err(e)) => log::warn!("pipeline producer failed: {e:#}"),
        Err(_) => log::warn!("pipeline producer waiter panicked"),
    }

    consumer_result
}
