use anyhow::{Context, Result};
use argh::FromArgs;
use log::LevelFilter;
use minishell::Interpreter;
use simplelog::{Config, WriteLogger};
use std::fs::File;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(FromArgs)]
/// A small interactive shell with builtins, redirection, pipes and tab completion.
struct Options {
    #[argh(option, short = 'c')]
    /// run this single line instead of starting an interactive session.
    command: Option<String>,

    #[argh(option)]
    /// write a log to this file.
    log_file: Option<PathBuf>,

    #[argh(option, default = "LevelFilter::Info")]
    /// log verbosity: off, error, warn, info, debug or trace (default: info).
    log_level: LevelFilter,
}

fn init_logging(options: &Options) -> Result<()> {
    let Some(path) = &options.log_file else {
        return Ok(());
    };
    let file = File::create(path)
        .with_context(|| format!("cannot create log file {}", path.display()))?;
    WriteLogger::init(options.log_level, Config::default(), file)
        .context("cannot install logger")?;
    Ok(())
}

fn main() -> ExitCode {
    let options: Options = argh::from_env();
    if let Err(e) = init_logging(&options) {
        eprintln!("{e:#}");
        return ExitCode::FAILURE;
    }

    let mut shell = Interpreter::default();

    if let Some(line) = &options.command {
        return match shell.execute_line(line) {
            Ok(code) => ExitCode::from(code.clamp(0, 255) as u8),
            Err(e) => {
                eprintln!("{e:#}");
                ExitCode::FAILURE
            }
        };
    }

    match shell.repl() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
