use crate::builtin::Builtin;
use crate::command::{ExitCode, Streams};
use crate::editor::ShellHelper;
use crate::env::Environment;
use crate::external::executables_in_path;
use crate::lexer;
use crate::pipeline;
use crate::redirect::{RedirectStream, split_command};
use crate::runnable::Runnable;
use anyhow::{Context, anyhow};
use rustyline::config::BellStyle;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{CompletionType, Config, Editor};
use std::collections::BTreeSet;
use std::ffi::OsStr;

/// Printed before every line read interactively.
pub const PROMPT: &str = "$ ";

/// A minimal shell-like interpreter that can execute built-in and external commands.
///
/// The interpreter owns the [`Environment`] every command runs in and the set of
/// command names offered by tab completion, discovered once from `PATH` at
/// construction.
///
/// Example
/// ```
/// use minishell::Interpreter;
/// let mut sh = Interpreter::default();
/// let code = sh.run("echo", &["hello", "world"]).unwrap();
/// assert_eq!(code, 0);
/// ```
pub struct Interpreter {
    env: Environment,
    known_commands: BTreeSet<String>,
}

impl Interpreter {
    /// Create an interpreter working in `env`.
    pub fn new(env: Environment) -> Self {
        let search_paths = env.search_path().unwrap_or_default();
        let mut known_commands = executables_in_path(OsStr::new(&search_paths));
        known_commands.extend(Builtin::ALL.iter().map(|b| b.name().to_string()));
        log::info!("{} commands available for completion", known_commands.len());
        Self {
            env,
            known_commands,
        }
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    /// Builtin names plus every executable found on `PATH`.
    pub fn known_commands(&self) -> &BTreeSet<String> {
        &self.known_commands
    }

    /// True once `exit` has run.
    pub fn should_exit(&self) -> bool {
        self.env.should_exit
    }

    /// Run a single command invocation by name with arguments.
    ///
    /// Returns the command's exit code or an error if the command cannot be found
    /// or fails to start.
    pub fn run(&mut self, name: &str, args: &[&str]) -> anyhow::Result<ExitCode> {
        let words: Vec<String> = std::iter::once(name)
            .chain(args.iter().copied())
            .map(String::from)
            .collect();
        self.execute_words(&words)
    }

    /// Tokenizes and executes one input line.
    ///
    /// Errors are specific to this line (unknown command, unopenable redirection
    /// target, ...) and leave the interpreter usable.
    pub fn execute_line(&mut self, line: &str) -> anyhow::Result<ExitCode> {
        let tokens = lexer::tokenize(line);
        log::debug!("tokens: {:?}", tokens);
        if tokens.is_empty() {
            return Ok(0);
        }

        match pipeline::split_pipeline(&tokens) {
            Some((left, right)) => pipeline::run_pipeline(left, right, &mut self.env),
            None => self.execute_words(&tokens),
        }
    }

    fn execute_words(&mut self, tokens: &[String]) -> anyhow::Result<ExitCode> {
        let (words, redirect) = split_command(tokens)?;
        let Some(name) = words.first() else {
            return Ok(0);
        };
        let runnable = Runnable::resolve(words, &self.env)
            .ok_or_else(|| anyhow!("{}: command not found", name))?;

        let streams = match redirect {
            Some(spec) => {
                let file = spec.open(&self.env.current_dir)?;
                match spec.stream {
                    RedirectStream::Stdout => Streams::inherited().with_stdout(file),
                    RedirectStream::Stderr => Streams::inherited().with_stderr(file),
                }
            }
            None => Streams::inherited(),
        };

        runnable.prepare(streams).start(&mut self.env)?.wait()
    }

    /// Read-Eval-Print Loop: prompt, read a line, run it, until `exit` or end of input.
    ///
    /// Only a failure to read input ends the loop with an error.
    pub fn repl(&mut self) -> anyhow::Result<()> {
        let config = Config::builder()
            .completion_type(CompletionType::List)
            .bell_style(BellStyle::Audible)
            .auto_add_history(true)
            .build();
        let mut rl: Editor<ShellHelper, DefaultHistory> = Editor::with_config(config)?;
        rl.set_helper(Some(ShellHelper::new(self.known_commands.clone())));

        while !self.env.should_exit {
            match rl.readline(PROMPT) {
                Ok(line) => {
                    if let Err(e) = self.execute_line(&line) {
                        eprintln!("{e:#}");
                    }
                    self.sync_process_dir();
                }
                Err(ReadlineError::Interrupted) => continue,
                Err(ReadlineError::Eof) => break,
                Err(err) => return Err(err).context("failed to read input"),
            }
        }

        Ok(())
    }

    /// Keeps the process working directory in step with `cd`, so that file-name
    /// completion looks in the right place.
    fn sync_process_dir(&self) {
        let current = std::env::current_dir().ok();
        if current.as_ref() != Some(&self.env.current_dir) {
            if let Err(e) = std::env::set_current_dir(&self.env.current_dir) {
                log::warn!("cannot enter {}: {}", self.env.current_dir.display(), e);
            }
        }
    }
}

impl Default for Interpreter {
    /// Create an interpreter over a snapshot of the current process environment.
    fn default() -> Self {
        Self::new(Environment::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn make_unique_temp_dir() -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let p = std::env::temp_dir().join(format!(
            "interpreter_tests_{}_{}",
            std::process::id(),
            nanos
        ));
        fs::create_dir_all(&p).expect("create temp dir");
        p
    }

    fn interpreter_in(dir: &PathBuf) -> Interpreter {
        let mut env = Environment::new();
        env.current_dir = dir.clone();
        Interpreter::new(env)
    }

    #[test]
    fn known_commands_include_builtins() {
        let sh = Interpreter::default();
        for b in Builtin::ALL {
            assert!(sh.known_commands().contains(b.name()));
        }
    }

    #[test]
    fn blank_line_is_a_no_op() {
        let mut sh = Interpreter::default();
        assert_eq!(sh.execute_line("").unwrap(), 0);
        assert_eq!(sh.execute_line("    ").unwrap(), 0);
    }

    #[test]
    fn unknown_command_is_reported() {
        let mut sh = Interpreter::default();
        let err = sh.execute_line("no_such_command_abc arg").unwrap_err();
        assert_eq!(err.to_string(), "no_such_command_abc: command not found");
        // The interpreter stays usable.
        assert_eq!(sh.execute_line("echo still here > /dev/null").unwrap(), 0);
    }

    #[test]
    fn redirect_truncate_and_append_round_trip() {
        let dir = make_unique_temp_dir();
        let mut sh = interpreter_in(&dir);
        let f = dir.join("f");

        sh.execute_line("echo hello > f").unwrap();
        assert_eq!(fs::read_to_string(&f).unwrap(), "hello\n");

        sh.execute_line("echo hello >> f").unwrap();
        sh.execute_line("echo hello 1>> f").unwrap();
        assert_eq!(fs::read_to_string(&f).unwrap(), "hello\nhello\nhello\n");

        sh.execute_line("echo hello 1> f").unwrap();
        assert_eq!(fs::read_to_string(&f).unwrap(), "hello\n");

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn stderr_redirect_captures_builtin_failure() {
        let dir = make_unique_temp_dir();
        let mut sh = interpreter_in(&dir);

        let code = sh.execute_line("cd /definitely/missing 2> err").unwrap();
        assert_eq!(code, 1);
        assert_eq!(
            fs::read_to_string(dir.join("err")).unwrap(),
            "cd: /definitely/missing: No such file or directory\n"
        );

        sh.execute_line("type a b 2>> err").unwrap();
        assert!(
            fs::read_to_string(dir.join("err"))
                .unwrap()
                .ends_with("type: too many arguments\n")
        );

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn redirection_without_a_command_is_reported() {
        let dir = make_unique_temp_dir();
        let mut sh = interpreter_in(&dir);

        let err = sh.execute_line("> f").unwrap_err();
        assert_eq!(err.to_string(), "syntax error near unexpected token `>'");
        let err = sh.execute_line("> f | cat").unwrap_err();
        assert_eq!(err.to_string(), "syntax error near unexpected token `>'");
        assert!(!dir.join("f").exists());

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn unopenable_target_skips_the_command() {
        let dir = make_unique_temp_dir();
        let mut sh = interpreter_in(&dir);

        let err = sh.execute_line("cd .. > missing/out").unwrap_err();
        assert!(err.to_string().starts_with("missing/out: "), "{err}");
        assert_eq!(sh.env().current_dir, dir);

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn quoted_words_reach_the_command() {
        let dir = make_unique_temp_dir();
        let mut sh = interpreter_in(&dir);

        sh.execute_line("echo 'hello    world' foo\"bar\"baz \"a\\\"b\" > out")
            .unwrap();
        assert_eq!(
            fs::read_to_string(dir.join("out")).unwrap(),
            "hello    world foobarbaz a\"b\n"
        );

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    #[cfg(unix)]
    fn external_output_redirects_and_runs_in_current_dir() {
        let dir = make_unique_temp_dir();
        fs::write(dir.join("data"), "abc\n").unwrap();
        let mut sh = interpreter_in(&dir);

        assert_eq!(sh.execute_line("cat data > copy").unwrap(), 0);
        assert_eq!(fs::read_to_string(dir.join("copy")).unwrap(), "abc\n");

        let code = sh.execute_line("cat nothing_here 2> err").unwrap();
        assert_ne!(code, 0);
        assert!(fs::read_to_string(dir.join("err")).unwrap().contains("nothing_here"));

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    #[cfg(unix)]
    fn pipeline_from_a_line() {
        let dir = make_unique_temp_dir();
        let mut sh = interpreter_in(&dir);

        assert_eq!(sh.execute_line("echo one two | wc -w > count").unwrap(), 0);
        assert_eq!(fs::read_to_string(dir.join("count")).unwrap().trim(), "2");

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn cd_then_pwd() {
        let dir = make_unique_temp_dir();
        fs::create_dir_all(dir.join("inner")).unwrap();
        let dir = fs::canonicalize(dir).unwrap();
        let mut sh = interpreter_in(&dir);

        sh.execute_line("cd inner").unwrap();
        sh.execute_line("pwd > ../where").unwrap();
        assert_eq!(
            fs::read_to_string(dir.join("where")).unwrap(),
            format!("{}\n", dir.join("inner").display())
        );

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn exit_sets_the_flag() {
        let mut sh = Interpreter::default();
        assert!(!sh.should_exit());
        assert_eq!(sh.execute_line("exit").unwrap(), 0);
        assert!(sh.should_exit());
    }
}
