use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Output, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

fn shell() -> Command {
    Command::new(env!("CARGO_BIN_EXE_minishell"))
}

fn make_unique_temp_dir(tag: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let p = std::env::temp_dir().join(format!(
        "minishell_it_{}_{}_{}",
        std::process::id(),
        tag,
        nanos
    ));
    fs::create_dir_all(&p).expect("create temp dir");
    p
}

/// Runs one line with `-c` and returns the process output.
fn run_line(line: &str, dir: &PathBuf) -> Output {
    shell()
        .arg("-c")
        .arg(line)
        .current_dir(dir)
        .output()
        .expect("run minishell")
}

/// Feeds `input` to an interactive session on a non-terminal stdin.
fn run_session(input: &str, dir: &PathBuf) -> Output {
    let mut child = shell()
        .current_dir(dir)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn minishell");
    child
        .stdin
        .take()
        .unwrap()
        .write_all(input.as_bytes())
        .unwrap();
    child.wait_with_output().expect("wait for minishell")
}

fn stdout_of(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr_of(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn echo_with_quotes() {
    let dir = make_unique_temp_dir("echo");
    let out = run_line("echo 'hello   world' \"it's\" a\\ b", &dir);
    assert!(out.status.success());
    assert_eq!(stdout_of(&out), "hello   world it's a b\n");
    let _ = fs::remove_dir_all(dir);
}

#[test]
fn type_reports_builtins_and_misses() {
    let dir = make_unique_temp_dir("type");
    let out = run_line("type exit", &dir);
    assert_eq!(stdout_of(&out), "exit is a shell builtin\n");

    let out = run_line("type no_such_thing_123", &dir);
    assert_eq!(stdout_of(&out), "no_such_thing_123: not found\n");

    let out = run_line("type a b", &dir);
    assert_eq!(out.status.code(), Some(1));
    assert_eq!(stderr_of(&out), "type: too many arguments\n");
    let _ = fs::remove_dir_all(dir);
}

#[test]
fn unknown_command_is_not_fatal() {
    let dir = make_unique_temp_dir("unknown");
    let out = run_session("nonexistent_cmd_42\necho after\n", &dir);
    assert!(out.status.success());
    assert!(stderr_of(&out).contains("nonexistent_cmd_42: command not found"));
    assert!(stdout_of(&out).contains("after\n"));
    let _ = fs::remove_dir_all(dir);
}

#[test]
fn exit_stops_the_session_with_status_zero() {
    let dir = make_unique_temp_dir("exit");
    let out = run_session("echo before\nexit\necho after\n", &dir);
    assert_eq!(out.status.code(), Some(0));
    let stdout = stdout_of(&out);
    assert!(stdout.contains("before\n"));
    assert!(!stdout.contains("after"));
    let _ = fs::remove_dir_all(dir);
}

#[test]
fn end_of_input_exits_cleanly() {
    let dir = make_unique_temp_dir("eof");
    let out = run_session("", &dir);
    assert_eq!(out.status.code(), Some(0));
    let _ = fs::remove_dir_all(dir);
}

#[test]
fn redirection_round_trip_across_lines() {
    let dir = make_unique_temp_dir("redirect");
    let out = run_session("echo hello > f\necho hello >> f\necho hello 1>> f\n", &dir);
    assert!(out.status.success());
    assert_eq!(
        fs::read_to_string(dir.join("f")).unwrap(),
        "hello\nhello\nhello\n"
    );

    run_line("echo hello > f", &dir);
    assert_eq!(fs::read_to_string(dir.join("f")).unwrap(), "hello\n");
    let _ = fs::remove_dir_all(dir);
}

#[test]
fn bad_redirection_target_is_reported() {
    let dir = make_unique_temp_dir("badredirect");
    let out = run_session("echo x > no/such/dir/f\necho ok\n", &dir);
    assert!(out.status.success());
    assert!(stderr_of(&out).contains("no/such/dir/f: "));
    assert!(stdout_of(&out).contains("ok\n"));
    let _ = fs::remove_dir_all(dir);
}

#[test]
#[cfg(unix)]
fn cd_persists_between_lines() {
    let dir = make_unique_temp_dir("cd");
    fs::create_dir_all(dir.join("sub")).unwrap();
    let canonical = fs::canonicalize(dir.join("sub")).unwrap();

    let out = run_session("cd sub\npwd\nls > listing\n", &dir);
    assert!(stdout_of(&out).contains(&format!("{}\n", canonical.display())));
    assert!(canonical.join("listing").exists());
    let _ = fs::remove_dir_all(dir);
}

#[test]
#[cfg(unix)]
fn pipeline_between_builtin_and_external() {
    let dir = make_unique_temp_dir("pipe");
    let out = run_line("echo alpha beta | tr a-z A-Z", &dir);
    assert!(out.status.success());
    assert_eq!(stdout_of(&out), "ALPHA BETA\n");
    let _ = fs::remove_dir_all(dir);
}

#[test]
#[cfg(unix)]
fn pipeline_moves_large_payloads() {
    let dir = make_unique_temp_dir("bigpipe");
    let payload = "0123456789abcdef\n".repeat(64 * 1024);
    fs::write(dir.join("big"), &payload).unwrap();

    let out = run_line("cat big | wc -c", &dir);
    assert!(out.status.success());
    assert_eq!(stdout_of(&out).trim(), payload.len().to_string());
    let _ = fs::remove_dir_all(dir);
}

#[test]
fn log_file_receives_records() {
    let dir = make_unique_temp_dir("log");
    let log = dir.join("shell.log");
    let out = shell()
        .arg("--log-file")
        .arg(&log)
        .arg("--log-level")
        .arg("debug")
        .arg("-c")
        .arg("echo logged")
        .current_dir(&dir)
        .output()
        .unwrap();
    assert!(out.status.success());
    assert!(fs::read_to_string(&log).unwrap().contains("tokens"));
    let _ = fs::remove_dir_all(dir);
}
