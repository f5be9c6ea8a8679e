#[cfg(unix)]
use std::io::Write;
#[cfg(unix)]
use std::process::{Command, Stdio};

#[cfg(unix)]
fn run_shell(lines: &[&str]) -> std::process::Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_mysh"))
        .arg("--norc")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn mysh");

    {
        let stdin = child.stdin.as_mut().expect("stdin");
        for line in lines {
            writeln!(stdin, "{line}").expect("write line");
        }
    }

    child.wait_with_output().expect("wait output")
}

#[cfg(unix)]
#[test]
fn pipeline_sigpipe_does_not_abort_shell() {
    // `yes` writes indefinitely; `head -1` exits after one line, closing the
    // read end, so `yes` receives SIGPIPE and terminates (SIG_DFL, reset by
    // the forked child before `execvp`). The shell itself must stay alive
    // and keep processing the next line.
    let output = run_shell(&["yes | head -1", "echo ALIVE"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("ALIVE"), "stdout was: {stdout}");
    assert!(output.status.success(), "shell did not exit cleanly");
}

#[cfg(unix)]
#[test]
fn shell_ignores_sigtstp_at_prompt() {
    // Send SIGTSTP directly to the shell process itself (no foreground job
    // running). `signal-hook` intercepts delivery, so the default stop
    // action never applies — the shell stays alive and keeps reading input.
    let mut child = Command::new(env!("CARGO_BIN_EXE_mysh"))
        .arg("--norc")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn mysh");

    unsafe {
        libc::kill(child.id() as libc::pid_t, libc::SIGTSTP);
    }

    {
        let stdin = child.stdin.as_mut().expect("stdin");
        writeln!(stdin, "echo ALIVE").expect("write line");
    }

    let output = child.wait_with_output().expect("wait output");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("ALIVE"), "stdout was: {stdout}");
}
