use crate::command::{ExitCode, Streams};
use crate::env::Environment;
use anyhow::{Context, Result};
use std::borrow::Cow;
use std::collections::BTreeSet;
use std::ffi::{OsStr, OsString};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Child, ExitStatus};

/// Command that is not a builtin: a program on disk.
#[derive(Debug)]
pub struct ExternalProcess {
    /// The name the user typed; becomes `argv[0]` of the child.
    name: String,
    path: PathBuf,
    args: Vec<OsString>,
}

impl ExternalProcess {
    pub fn new(name: impl Into<String>, path: PathBuf, args: Vec<OsString>) -> Self {
        Self {
            name: name.into(),
            path,
            args,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Spawns the program with its standard handles wired to `streams`.
    ///
    /// The parent's copies of the handles are released before returning, so a pipe
    /// handed in as stdout reaches end-of-stream as soon as the child exits.
    pub fn spawn(self, streams: Streams, env: &Environment) -> Result<Child> {
        let mut cmd = std::process::Command::new(&self.path);
        set_arg0(&mut cmd, &self.name);
        cmd.args(&self.args)
            .stdin(streams.stdin.stdio())
            .stdout(streams.stdout.stdio())
            .stderr(streams.stderr.stdio())
            .envs(env.vars.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .current_dir(&env.current_dir);
        log::debug!("spawning {} as {:?}", self.path.display(), self.name);
        cmd.spawn()
            .with_context(|| format!("{}: failed to start", self.name))
    }
}

#[cfg(unix)]
fn set_arg0(cmd: &mut std::process::Command, name: &str) {
    use std::os::unix::process::CommandExt;
    cmd.arg0(name);
}

#[cfg(not(unix))]
fn set_arg0(_cmd: &mut std::process::Command, _name: &str) {}

/// Waits for `child` and translates its status into a shell exit code.
pub fn wait_child(mut child: Child) -> Result<ExitCode> {
    let exit_status = child.wait()?;
    match exit_status.code() {
        Some(x) => Ok(x),
        None => Ok(terminated_by_signal(exit_status)),
    }
}

#[cfg(unix)]
fn terminated_by_signal(exit_status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    if let Some(signal) = ExitStatusExt::signal(&exit_status) {
        128 + signal
    } else if ExitStatusExt::core_dumped(&exit_status) {
        255
    } else {
        -1
    }
}

#[cfg(not(unix))]
fn terminated_by_signal(_exit_status: ExitStatus) -> i32 {
    -1
}

/// Resolves `name` to a runnable program using the environment's `PATH` and
/// current directory.
pub fn resolve_executable(env: &Environment, name: &str) -> Option<PathBuf> {
    let search_paths = env.search_path().unwrap_or_default();
    find_command_path(
        OsStr::new(&search_paths),
        &env.current_dir,
        Path::new(name),
    )
    .map(Cow::into_owned)
}

/// Resolve a command path the way a typical shell would.
///
/// Behavior:
/// - Absolute path: returns it if it exists.
/// - Relative with multiple components (e.g., `bin/sh`) or `./`-prefixed: returns
///   `cwd` joined with it if that exists.
/// - Single path component (no separators): search each directory in `search_paths` (PATH)
///   and return the first executable match.
/// - Empty path: returns `None`.
///
/// Returns either a borrowed reference to the provided `path` or an owned `PathBuf`
/// when the result is discovered relative to `cwd` or via PATH lookup.
pub fn find_command_path<'a>(
    search_paths: &OsStr,
    cwd: &Path,
    path: &'a Path,
) -> Option<Cow<'a, Path>> {
    if path.is_absolute() {
        return find_by_path(path).map(Cow::Borrowed);
    }

    let mut components = path.components();
    let first = components.next();
    let second = components.next();
    match (first, second) {
        (None, None) => {
            // Empty path -> not found
            None
        }
        (Some(x), None) => {
            // Single component -> search in PATH
            find_in_path(search_paths, x.as_os_str()).map(Cow::Owned)
        }
        _ => {
            // Anything with a directory part -> relative to the current dir
            let joined = cwd.join(path);
            find_by_path(&joined).map(|p| Cow::Owned(p.to_owned()))
        }
    }
}

fn find_in_path(search_paths: &OsStr, cmd: &OsStr) -> Option<PathBuf> {
    std::env::split_paths(search_paths)
        .map(|dir| dir.join(cmd))
        .find(|path| is_executable(path))
}

fn find_by_path(path: &Path) -> Option<&Path> {
    if path.exists() { Some(path) } else { None }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    fs::metadata(path).is_ok_and(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Collects the names of every executable file found in the `search_paths` directories.
///
/// Unreadable or missing directories are skipped.
pub fn executables_in_path(search_paths: &OsStr) -> BTreeSet<String> {
    let mut names = BTreeSet::new();
    for dir in std::env::split_paths(search_paths) {
        let Ok(entries) = fs::read_dir(&dir) else {
            log::debug!("skipping unreadable PATH entry {}", dir.display());
            continue;
        };
        for entry in entries.flatten() {
            if !is_executable(&entry.path()) {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                names.insert(name.to_owned());
            }
        }
    }
    names
}
