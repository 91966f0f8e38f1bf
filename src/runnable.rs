//! One command ready to run, whether it is a builtin or a program on disk.
//!
//! Both kinds go through the same lifecycle: [`Runnable::prepare`] attaches the
//! streams, [`Prepared::start`] (or [`Prepared::start_detached`]) launches it and
//! [`Handle::wait`] collects the exit code. Callers such as the pipeline executor
//! never need to know which kind they hold.

use crate::builtin::Builtin;
use crate::command::{ExitCode, Streams};
use crate::env::Environment;
use crate::external::{ExternalProcess, resolve_executable, wait_child};
use anyhow::{Result, anyhow};
use std::io::Write;
use std::process::Child;
use std::thread::{self, JoinHandle};

/// A builtin together with the arguments it was invoked with.
#[derive(Debug)]
pub struct BuiltinInvocation {
    builtin: Builtin,
    args: Vec<String>,
}

impl BuiltinInvocation {
    pub fn new(builtin: Builtin, args: Vec<String>) -> Self {
        Self { builtin, args }
    }

    fn run(self, mut streams: Streams, env: &mut Environment) -> Result<ExitCode> {
        let code = self.builtin.execute(
            &self.args,
            &mut streams.stdin,
            &mut streams.stdout,
            &mut streams.stderr,
            env,
        )?;
        // The consumer may already be gone; that is not the builtin's failure.
        let _ = streams.stdout.flush();
        let _ = streams.stderr.flush();
        Ok(code)
    }
}

#[derive(Debug)]
pub enum Runnable {
    Builtin(BuiltinInvocation),
    External(ExternalProcess),
}

impl Runnable {
    /// Resolves `words[0]` to a builtin or an executable on `PATH`.
    ///
    /// Returns `None` for an empty command or an unknown name.
    pub fn resolve(words: &[String], env: &Environment) -> Option<Runnable> {
        let (name, args) = words.split_first()?;
        if let Some(builtin) = Builtin::from_name(name) {
            return Some(Runnable::Builtin(BuiltinInvocation::new(
                builtin,
                args.to_vec(),
            )));
        }
        let path = resolve_executable(env, name)?;
        log::debug!("{} resolved to {}", name, path.display());
        Some(Runnable::External(ExternalProcess::new(
            name.as_str(),
            path,
            args.iter().map(Into::into).collect(),
        )))
    }

    /// The command name as the user typed it.
    pub fn name(&self) -> &str {
        match self {
            Runnable::Builtin(b) => b.builtin.name(),
            Runnable::External(e) => e.name(),
        }
    }

    /// Attaches the streams the command will own for its lifetime.
    pub fn prepare(self, streams: Streams) -> Prepared {
        Prepared {
            runnable: self,
            streams,
        }
    }
}

/// A runnable with its streams attached, not yet started.
pub struct Prepared {
    runnable: Runnable,
    streams: Streams,
}

impl Prepared {
    /// Starts the command against the shell's own environment.
    ///
    /// A builtin runs to completion on the calling thread before this returns; an
    /// external program is spawned and left running.
    pub fn start(self, env: &mut Environment) -> Result<Handle> {
        match self.runnable {
            Runnable::Builtin(b) => Ok(Handle::Finished(b.run(self.streams, env)?)),
            Runnable::External(e) => Ok(Handle::Child(e.spawn(self.streams, env)?)),
        }
    }

    /// Starts the command so that it makes progress on its own.
    ///
    /// A builtin gets a dedicated thread and works on `env`, which is owned by that
    /// thread; changes it makes are not seen by the shell.
    pub fn start_detached(self, env: Environment) -> Result<Handle> {
        match self.runnable {
            Runnable::Builtin(b) => {
                let streams = self.streams;
                let handle = thread::Builder::new()
                    .name(format!("builtin-{}", b.builtin.name()))
                    .spawn(move || {
                        let mut env = env;
                        b.run(streams, &mut env)
                    })?;
                Ok(Handle::Thread(handle))
            }
            Runnable::External(e) => Ok(Handle::Child(e.spawn(self.streams, &env)?)),
        }
    }
}

/// A started command.
#[derive(Debug)]
pub enum Handle {
    /// A builtin that already ran on the calling thread.
    Finished(ExitCode),
    Thread(JoinHandle<Result<ExitCode>>),
    Child(Child),
}

impl Handle {
    /// Blocks until the command finishes and returns its exit code.
    pub fn wait(self) -> Result<ExitCode> {
        match self {
            Handle::Finished(code) => Ok(code),
            Handle::Thread(handle) => handle
                .join()
                .map_err(|_| anyhow!("builtin thread panicked"))?,
            Handle::Child(child) => wait_child(child),
        }
    }
}
