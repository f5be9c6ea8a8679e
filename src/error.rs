//! Error taxonomy for everything below the main loop.
//!
//! The shell's public contract is still "every command line reduces to an
//! `i32` exit status" — these variants exist so builtins and the executor
//! can distinguish error *kinds* internally (tests, `fg`/`bg`/`wait`
//! reporting a missing job) without string-matching stderr text.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ShellError {
    /// A builtin was called with the wrong number/shape of arguments.
    #[error("{0}")]
    BuiltinUsage(String),

    /// `fork`, `pipe`, `dup2`, `setpgid`, `tcsetpgrp`, or `execvp` failed.
    #[error("{0}: {1}")]
    SyscallFailure(&'static str, std::io::Error),

    /// `execvp` could not resolve the command name.
    #[error("command not found: {0}")]
    NotFound(String),

    /// `fg`/`bg`/`wait` referenced a job id that isn't in the table.
    #[error("job not found: {0}")]
    JobNotFound(usize),

    /// Loading or saving history/config/rc state failed. Never fatal.
    #[error("{0}: {1}")]
    PersistenceFailure(String, std::io::Error),
}

impl ShellError {
    /// Map an error kind to the shell's documented exit-status convention.
    pub fn exit_code(&self) -> i32 {
        match self {
            ShellError::NotFound(_) => 127,
            ShellError::BuiltinUsage(_) | ShellError::JobNotFound(_) => 1,
            ShellError::SyscallFailure(..) => 1,
            ShellError::PersistenceFailure(..) => 0,
        }
    }
}
