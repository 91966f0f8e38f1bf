use crate::command::ExitCode;
use crate::env::Environment;
use crate::external::resolve_executable;
use anyhow::{Result, anyhow};
use argh::{EarlyExit, FromArgs};
use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;

/// Built-in commands known to the shell at compile time.
///
/// Builtins run in-process against the streams they are handed; no child
/// process is spawned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
    Exit,
    Pwd,
    Cd,
    Echo,
    Type,
}

impl Builtin {
    /// Every builtin, in the order `type` and completion enumerate them.
    pub const ALL: [Builtin; 5] = [
        Builtin::Exit,
        Builtin::Pwd,
        Builtin::Cd,
        Builtin::Echo,
        Builtin::Type,
    ];

    /// Canonical name of the command, e.g. "echo" or "cd".
    pub fn name(self) -> &'static str {
        match self {
            Builtin::Exit => "exit",
            Builtin::Pwd => "pwd",
            Builtin::Cd => "cd",
            Builtin::Echo => "echo",
            Builtin::Type => "type",
        }
    }

    pub fn from_name(name: &str) -> Option<Builtin> {
        Builtin::ALL.into_iter().find(|b| b.name() == name)
    }

    /// Runs the builtin with `args` (not including the command name).
    ///
    /// Failures are reported on `stderr` and turned into exit code 1; the returned
    /// `Err` is reserved for being unable to write that report at all.
    pub fn execute(
        self,
        args: &[String],
        stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        stderr: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<ExitCode> {
        match self {
            Builtin::Exit => run::<Exit>(args, stdin, stdout, stderr, env),
            Builtin::Pwd => run::<Pwd>(args, stdin, stdout, stderr, env),
            Builtin::Cd => run::<Cd>(args, stdin, stdout, stderr, env),
            Builtin::Echo => run::<Echo>(args, stdin, stdout, stderr, env),
            Builtin::Type => run::<Type>(args, stdin, stdout, stderr, env),
        }
    }
}

/// A builtin's argument structure, parsed with [`argh`] and executed directly.
trait BuiltinCommand: Sized + FromArgs {
    const BUILTIN: Builtin;

    /// Leading words parsed as flags; everything from the first other word on
    /// is an operand, even when it starts with `-`.
    const FLAGS: &'static [&'static str] = &[];

    /// Executes the command using provided IO streams and environment.
    ///
    /// An `Err` is printed on stderr by the caller and maps to exit code 1.
    fn execute(
        self,
        stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<ExitCode>;
}

fn run<T: BuiltinCommand>(
    args: &[String],
    stdin: &mut dyn Read,
    stdout: &mut dyn Write,
    stderr: &mut dyn Write,
    env: &mut Environment,
) -> Result<ExitCode> {
    let args = argh_args::<T>(args);
    let cmd = match T::from_args(&[T::BUILTIN.name()], &args) {
        Ok(cmd) => cmd,
        Err(EarlyExit { output, status }) => {
            return match status {
                Ok(()) => {
                    stdout.write_all(output.as_bytes())?;
                    Ok(0)
                }
                Err(()) => {
                    write!(stderr, "{}: {}", T::BUILTIN.name(), output)?;
                    Ok(1)
                }
            };
        }
    };

    match cmd.execute(stdin, stdout, env) {
        Ok(code) => Ok(code),
        Err(e) if is_broken_pipe(&e) => {
            log::debug!("{}: output closed early", T::BUILTIN.name());
            Ok(1)
        }
        Err(e) => {
            writeln!(stderr, "{e:#}")?;
            Ok(1)
        }
    }
}

/// Arguments as handed to argh: recognized leading flags, then `--`, then the
/// operands untouched.
fn argh_args<T: BuiltinCommand>(args: &[String]) -> Vec<&str> {
    let flag_count = args
        .iter()
        .take_while(|arg| arg.as_str() == "--help" || T::FLAGS.contains(&arg.as_str()))
        .count();
    let (flags, operands) = args.split_at(flag_count);
    flags
        .iter()
        .map(String::as_str)
        .chain(std::iter::once("--"))
        .chain(operands.iter().map(String::as_str))
        .collect()
}

fn is_broken_pipe(e: &anyhow::Error) -> bool {
    e.downcast_ref::<io::Error>()
        .is_some_and(|e| e.kind() == io::ErrorKind::BrokenPipe)
}

/// Both `cd` and `type` take exactly one operand.
fn single_operand(builtin: Builtin, mut operands: Vec<String>) -> Result<String> {
    match operands.len() {
        1 => Ok(operands.remove(0)),
        _ => Err(anyhow!("{}: too many arguments", builtin.name())),
    }
}

#[derive(FromArgs)]
/// Exit the shell with status 0.
pub struct Exit {
    #[argh(positional, greedy)]
    /// ignored.
    pub _args: Vec<String>,
}

impl BuiltinCommand for Exit {
    const BUILTIN: Builtin = Builtin::Exit;

    fn execute(
        self,
        _stdin: &mut dyn Read,
        _stdout: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<ExitCode> {
        env.should_exit = true;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Print the current working directory to standard output.
pub struct Pwd {}

impl BuiltinCommand for Pwd {
    const BUILTIN: Builtin = Builtin::Pwd;

    fn execute(
        self,
        _stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<ExitCode> {
        writeln!(stdout, "{}", env.current_dir.to_string_lossy())?;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Change the current working directory.
/// `~` stands for the directory in the HOME environment variable.
pub struct Cd {
    #[argh(positional, greedy)]
    /// directory to switch to; absolute or relative to the current directory.
    pub target: Vec<String>,
}

impl BuiltinCommand for Cd {
    const BUILTIN: Builtin = Builtin::Cd;

    fn execute(
        self,
        _stdin: &mut dyn Read,
        _stdout: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<ExitCode> {
        let arg = single_operand(Self::BUILTIN, self.target)?;

        let target = if arg == "~" {
            env.home_dir()
                .ok_or_else(|| anyhow!("cd: cannot determine home directory"))?
        } else if let Some(rest) = arg.strip_prefix("~/") {
            env.home_dir()
                .ok_or_else(|| anyhow!("cd: cannot determine home directory"))?
                .join(rest)
        } else {
            PathBuf::from(&arg)
        };

        let new_dir = env.current_dir.join(target);
        match fs::canonicalize(&new_dir) {
            Ok(dir) if dir.is_dir() => {
                log::debug!("cd: {} -> {}", env.current_dir.display(), dir.display());
                env.current_dir = dir;
                Ok(0)
            }
            _ => Err(anyhow!("cd: {}: No such file or directory", arg)),
        }
    }
}

#[derive(FromArgs)]
/// write the arguments to standard output, separated by spaces.
/// by default, a trailing newline is printed.
pub struct Echo {
    #[argh(switch, short = 'n')]
    /// do not output the trailing newline.
    pub no_newline: bool,

    #[argh(positional, greedy)]
    /// values to print as-is, separated by spaces.
    pub args: Vec<String>,
}

impl BuiltinCommand for Echo {
    const BUILTIN: Builtin = Builtin::Echo;
    const FLAGS: &'static [&'static str] = &["-n"];

    fn execute(
        self,
        _stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        _env: &mut Environment,
    ) -> Result<ExitCode> {
        let s = self.args.join(" ");
        if self.no_newline {
            write!(stdout, "{}", s)?;
        } else {
            writeln!(stdout, "{}", s)?;
        }
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Describe how a command name would be interpreted.
pub struct Type {
    #[argh(positional, greedy)]
    /// command name to look up.
    pub names: Vec<String>,
}

impl BuiltinCommand for Type {
    const BUILTIN: Builtin = Builtin::Type;

    fn execute(
        self,
        _stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<ExitCode> {
        let name = single_operand(Self::BUILTIN, self.names)?;
        if Builtin::from_name(&name).is_some() {
            writeln!(stdout, "{} is a shell builtin", name)?;
        } else if let Some(path) = resolve_executable(env, &name) {
            writeln!(stdout, "{} is {}", name, path.display())?;
        } else {
            writeln!(stdout, "{}: not found", name)?;
        }
        Ok(0)
    }
}
