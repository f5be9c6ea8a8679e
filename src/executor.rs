//! Build pipes, fork children, assign process groups, install terminal
//! ownership, and either wait for the foreground group or hand a
//! background job off to the table. This is the hard part the spec calls
//! out by name: everything here only matters on Unix, where process
//! groups and a controlling terminal exist.

use crate::builtins::{self, BuiltinOutcome};
use crate::parser::Pipeline;
use crate::shell::Shell;
use crate::signals::SignalState;

pub enum Outcome {
    Continue(i32),
    Exit(i32),
}

/// Execute one parsed `Pipeline`. `command_text` is the original raw line,
/// kept around only for job-table display (`jobs`, the `[n] pid` banner).
pub fn execute_pipeline(
    pipeline: &Pipeline,
    command_text: &str,
    shell: &mut Shell,
    signals: &SignalState,
) -> Outcome {
    if pipeline.is_empty() {
        return Outcome::Continue(0);
    }

    if pipeline.commands.len() == 1 {
        let cmd = &pipeline.commands[0];
        let is_builtin = cmd.program().map(builtins::is_builtin).unwrap_or(false);
        if is_builtin && !pipeline.background && cmd.infile.is_none() && cmd.outfile.is_none() {
            return match builtins::execute(&cmd.argv, shell, signals) {
                BuiltinOutcome::Continue(code) => Outcome::Continue(code),
                BuiltinOutcome::Exit(code) => Outcome::Exit(code),
            };
        }
    }

    #[cfg(unix)]
    {
        unix_exec::run_forked_pipeline(pipeline, command_text, shell, signals)
    }

    #[cfg(not(unix))]
    {
        eprintln!("mysh: job-controlled pipelines require a Unix target");
        Outcome::Continue(1)
    }
}

/// Outcome of waiting on a foreground process group.
#[cfg(unix)]
pub enum ForegroundOutcome {
    Exited(i32),
    Stopped,
}

/// `waitpid(-pgid, &status, WUNTRACED)` in a loop until `ECHILD`, collapsed
/// to the single-loop form the design notes call for (no redundant inner
/// `WNOHANG` pass). `last_pid` identifies which reaped pid's status becomes
/// the pipeline's reported exit code — the pipeline leader for a freshly
/// launched job, since `fg`/`wait` key everything off the group leader.
#[cfg(unix)]
pub fn wait_foreground_group(pgid: crate::jobs::Pid, last_pid: crate::jobs::Pid) -> ForegroundOutcome {
    let mut last_code = 0;

    loop {
        let mut raw_status: libc::c_int = 0;
        let waited = unsafe { libc::waitpid(-pgid, &mut raw_status, libc::WUNTRACED) };

        if waited < 0 {
            let err = std::io::Error::last_os_error();
            if err.raw_os_error() == Some(libc::EINTR) {
                continue;
            }
            // ECHILD: the group has been fully reaped.
            break;
        }

        if unsafe { libc::WIFSTOPPED(raw_status) } {
            return ForegroundOutcome::Stopped;
        }

        if let Some(code) = crate::status::exit_code_from_wait_status(raw_status) {
            if waited == last_pid {
                last_code = code;
            }
        }
    }

    ForegroundOutcome::Exited(last_code)
}

#[cfg(unix)]
mod unix_exec {
    use std::ffi::CString;
    use std::os::unix::io::AsRawFd;

    use os_pipe::{pipe, PipeReader, PipeWriter};

    use super::{ForegroundOutcome, Outcome};
    use crate::builtins::{self, BuiltinOutcome};
    use crate::job_control::ForegroundTerminalGuard;
    use crate::jobs::Pid;
    use crate::parser::{Command, OutputRedirect, Pipeline};
    use crate::shell::Shell;
    use crate::signals::SignalState;

    /// Everything a forked child needs, precomputed in the parent so the
    /// fork-to-exec window in the child does no heap allocation beyond
    /// what opening a redirection file or running a builtin requires.
    struct ExecPlan {
        is_builtin: bool,
        argv: Vec<String>,
        _argv_cstrings: Vec<CString>,
        argv_ptrs: Vec<*const libc::c_char>,
        infile_c: Option<CString>,
        outfile_c: Option<(CString, bool)>,
    }

    fn build_plan(command: &Command) -> ExecPlan {
        let is_builtin = command.program().map(builtins::is_builtin).unwrap_or(false);
        let argv_cstrings: Vec<CString> = command
            .argv
            .iter()
            .map(|a| CString::new(a.as_bytes()).unwrap_or_else(|_| CString::new("").unwrap()))
            .collect();
        let mut argv_ptrs: Vec<*const libc::c_char> =
            argv_cstrings.iter().map(|c| c.as_ptr()).collect();
        argv_ptrs.push(std::ptr::null());

        let infile_c = command
            .infile
            .as_ref()
            .map(|p| CString::new(p.as_bytes()).unwrap_or_else(|_| CString::new("").unwrap()));
        let outfile_c = command.outfile.as_ref().map(|OutputRedirect { path, append }| {
            (
                CString::new(path.as_bytes()).unwrap_or_else(|_| CString::new("").unwrap()),
                *append,
            )
        });

        ExecPlan {
            is_builtin,
            argv: command.argv.clone(),
            _argv_cstrings: argv_cstrings,
            argv_ptrs,
            infile_c,
            outfile_c,
        }
    }

    pub(super) fn run_forked_pipeline(
        pipeline: &Pipeline,
        command_text: &str,
        shell: &mut Shell,
        signals: &SignalState,
    ) -> Outcome {
        let n = pipeline.commands.len();
        let plans: Vec<ExecPlan> = pipeline.commands.iter().map(build_plan).collect();

        let mut pipes: Vec<(PipeReader, PipeWriter)> = Vec::with_capacity(n.saturating_sub(1));
        for _ in 0..n.saturating_sub(1) {
            match pipe() {
                Ok(p) => pipes.push(p),
                Err(e) => {
                    eprintln!("mysh: {}", crate::error::ShellError::SyscallFailure("pipe", e));
                    return Outcome::Continue(1);
                }
            }
        }
        let pipe_fds: Vec<(i32, i32)> = pipes
            .iter()
            .map(|(r, w)| (r.as_raw_fd(), w.as_raw_fd()))
            .collect();

        let mut child_pids: Vec<Pid> = Vec::with_capacity(n);
        let mut leader_pgid: Pid = 0;

        for (i, plan) in plans.iter().enumerate() {
            let stdin_fd = if i > 0 { Some(pipe_fds[i - 1].0) } else { None };
            let stdout_fd = if i < n - 1 { Some(pipe_fds[i].1) } else { None };
            let target_pgid = if i == 0 { 0 } else { leader_pgid };

            // SAFETY: the child only touches raw fds, precomputed C strings,
            // and `_exit`/`execvp` before replacing or terminating itself.
            let pid = unsafe { libc::fork() };

            if pid < 0 {
                let err = crate::error::ShellError::SyscallFailure("fork", std::io::Error::last_os_error());
                eprintln!("mysh: {err}");
                return Outcome::Continue(1);
            }

            if pid == 0 {
                child_exec(
                    plan,
                    target_pgid,
                    stdin_fd,
                    stdout_fd,
                    &pipe_fds,
                    !pipeline.background,
                    shell,
                    signals,
                );
                unreachable!("child_exec always terminates the child");
            }

            let assigned_pgid = if i == 0 { pid } else { leader_pgid };
            // Mirror the setpgid call in the parent to close the classic race.
            unsafe { libc::setpgid(pid, assigned_pgid) };
            if i == 0 {
                leader_pgid = pid;
            }
            child_pids.push(pid);
        }

        // The parent retains no pipe fds at all; every child already has its
        // own copy from the fork that spawned it.
        drop(pipes);

        if pipeline.background {
            match shell.jobs.add_running(leader_pgid, command_text.to_string()) {
                Some(id) => println!("[{id}] {leader_pgid}"),
                None => { /* table full: job still runs, just untracked */ }
            }
            return Outcome::Continue(0);
        }

        signals.set_foreground(leader_pgid);
        let terminal_guard = ForegroundTerminalGuard::new(leader_pgid).ok();

        let last_pid = *child_pids.last().unwrap();
        let outcome = super::wait_foreground_group(leader_pgid, last_pid);

        drop(terminal_guard);
        signals.clear_foreground();

        match outcome {
            ForegroundOutcome::Stopped => {
                if let Some(id) = shell.jobs.add_stopped(leader_pgid, command_text.to_string()) {
                    println!("[{id}]  Stopped  {command_text}");
                }
                Outcome::Continue(0)
            }
            ForegroundOutcome::Exited(code) => Outcome::Continue(code),
        }
    }

    /// Runs entirely inside the forked child. Never returns: every path ends
    /// in `_exit` (for a builtin or a spawn failure) or `execvp` replacing
    /// the process image outright.
    fn child_exec(
        plan: &ExecPlan,
        target_pgid: Pid,
        stdin_fd: Option<i32>,
        stdout_fd: Option<i32>,
        pipe_fds: &[(i32, i32)],
        foreground: bool,
        shell: &mut Shell,
        signals: &SignalState,
    ) -> ! {
        unsafe {
            libc::setpgid(0, target_pgid);

            if foreground {
                let self_pgid = libc::getpgrp();
                libc::tcsetpgrp(libc::STDIN_FILENO, self_pgid);
            }

            for sig in [libc::SIGINT, libc::SIGTSTP, libc::SIGQUIT, libc::SIGPIPE] {
                libc::signal(sig, libc::SIG_DFL);
            }

            if let Some(fd) = stdin_fd {
                libc::dup2(fd, libc::STDIN_FILENO);
            }
            if let Some(fd) = stdout_fd {
                libc::dup2(fd, libc::STDOUT_FILENO);
            }
            for (r, w) in pipe_fds {
                libc::close(*r);
                libc::close(*w);
            }

            // Redirections override pipe endpoints: applied after the dup2s
            // above, so a later `dup2` here wins, matching the spec.
            if let Some(path) = &plan.infile_c {
                let fd = libc::open(path.as_ptr(), libc::O_RDONLY);
                if fd >= 0 {
                    libc::dup2(fd, libc::STDIN_FILENO);
                    libc::close(fd);
                }
            }
            if let Some((path, append)) = &plan.outfile_c {
                let flags = libc::O_WRONLY
                    | libc::O_CREAT
                    | if *append { libc::O_APPEND } else { libc::O_TRUNC };
                let fd = libc::open(path.as_ptr(), flags, 0o644);
                if fd >= 0 {
                    libc::dup2(fd, libc::STDOUT_FILENO);
                    libc::close(fd);
                }
            }
        }

        if plan.is_builtin {
            let code = match builtins::execute(&plan.argv, shell, signals) {
                BuiltinOutcome::Continue(code) | BuiltinOutcome::Exit(code) => code,
            };
            use std::io::Write as _;
            let _ = std::io::stdout().flush();
            let _ = std::io::stderr().flush();
            unsafe { libc::_exit(code) };
        }

        unsafe {
            libc::execvp(plan.argv_ptrs[0], plan.argv_ptrs.as_ptr());
        }

        // execvp only returns on failure.
        let err = std::io::Error::last_os_error();
        let program = plan.argv.first().cloned().unwrap_or_default();
        if err.kind() == std::io::ErrorKind::NotFound {
            eprintln!("mysh: {}", crate::error::ShellError::NotFound(program));
            unsafe { libc::_exit(127) };
        } else {
            eprintln!("mysh: {program}: {}", crate::error::ShellError::SyscallFailure("execvp", err));
            unsafe { libc::_exit(126) };
        }
    }
}
