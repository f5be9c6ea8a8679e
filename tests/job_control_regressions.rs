use std::io::Write;
use std::process::{Command, Stdio};

/// Feed `lines` to a fresh `mysh` over stdin, close stdin (EOF rather than an
/// explicit `exit`), and return the full output. The shell's own exit code
/// on EOF is the last line's exit status, which is what these tests assert on.
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
fn failing_background_command() -> &'static str {
    "sh -c 'sleep 1; exit 7' &"
}

#[cfg(unix)]
#[test]
fn wait_returns_background_job_exit_status() {
    let output = run_shell(&[failing_background_command(), "wait"]);
    assert_eq!(output.status.code(), Some(7), "status was: {:?}", output.status);
}

#[cfg(unix)]
#[test]
fn wait_invalid_job_id_sets_nonzero_status() {
    let output = run_shell(&["wait 99999"]);
    assert_eq!(output.status.code(), Some(1), "status was: {:?}", output.status);
}

#[cfg(unix)]
#[test]
fn fg_preserves_signal_exit_code() {
    let output = run_shell(&["sh -c 'sleep 1; kill -INT $$' &", "fg"]);
    assert_eq!(output.status.code(), Some(130), "status was: {:?}", output.status);
}

#[cfg(unix)]
#[test]
fn jobs_lists_background_job_with_cmdline() {
    let output = run_shell(&["sleep 2 &", "jobs"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("sleep 2"), "stdout was: {stdout}");
}
