//! Signal plumbing: a background thread (driven by `signal-hook`'s own
//! internal self-pipe) that turns `SIGCHLD`/`SIGINT`/`SIGTSTP` delivery
//! into plain memory writes, and a `drain()` the main loop calls to do
//! the actual (non-signal-safe) job-table mutation.
//!
//! The spec's source mutates the job table straight from the `SIGCHLD`
//! handler; the design notes call that out as something a reimplementation
//! should upgrade. `signal_hook::iterator::Signals` already runs its
//! delivery loop on an ordinary thread rather than inside a signal
//! handler, so the handler body itself never touches the `HashMap` —
//! it just flips an `AtomicBool`, which the main loop drains between
//! lines (and again right before printing a prompt).

#[cfg(unix)]
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
#[cfg(unix)]
use std::sync::Arc;

#[cfg(unix)]
use signal_hook::consts::{SIGCHLD, SIGINT, SIGTSTP};
#[cfg(unix)]
use signal_hook::iterator::Signals;

use crate::jobs::{JobState, JobTable, Pid};
use crate::status;

/// Shared handle the main loop and the signal thread both hold.
#[derive(Clone)]
pub struct SignalState {
    #[cfg(unix)]
    chld_pending: Arc<AtomicBool>,
    #[cfg(unix)]
    fg_pgid: Arc<AtomicI32>,
}

impl Default for SignalState {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalState {
    pub fn new() -> Self {
        #[cfg(unix)]
        {
            SignalState {
                chld_pending: Arc::new(AtomicBool::new(false)),
                fg_pgid: Arc::new(AtomicI32::new(0)),
            }
        }
        #[cfg(not(unix))]
        {
            SignalState {}
        }
    }

    /// Record the process group currently holding the terminal in the
    /// foreground, so `SIGINT`/`SIGTSTP` forwarding knows where to send
    /// the signal. `0` means no foreground group (signals are swallowed).
    #[cfg(unix)]
    pub fn set_foreground(&self, pgid: Pid) {
        self.fg_pgid.store(pgid, Ordering::SeqCst);
    }

    #[cfg(not(unix))]
    pub fn set_foreground(&self, _pgid: Pid) {}

    #[cfg(unix)]
    pub fn clear_foreground(&self) {
        self.fg_pgid.store(0, Ordering::SeqCst);
    }

    #[cfg(not(unix))]
    pub fn clear_foreground(&self) {}

    /// Ignore `SIGTTOU`/`SIGTTIN` process-wide (so `tcsetpgrp` from a
    /// background-of-its-own-group shell doesn't stop the shell itself),
    /// and spawn the background thread that turns `SIGCHLD`/`SIGINT`/
    /// `SIGTSTP` delivery into the flags this type exposes.
    #[cfg(unix)]
    pub fn install(&self) -> std::io::Result<()> {
        unsafe {
            libc::signal(libc::SIGTTOU, libc::SIG_IGN);
            libc::signal(libc::SIGTTIN, libc::SIG_IGN);
        }

        let mut signals = Signals::new([SIGCHLD, SIGINT, SIGTSTP])?;
        let chld_pending = self.chld_pending.clone();
        let fg_pgid = self.fg_pgid.clone();

        std::thread::spawn(move || {
            for signal in signals.forever() {
                match signal {
                    SIGCHLD => chld_pending.store(true, Ordering::SeqCst),
                    SIGINT | SIGTSTP => {
                        let fg = fg_pgid.load(Ordering::SeqCst);
                        if fg > 0 {
                            unsafe {
                                libc::kill(-fg, signal);
                            }
                        }
                        // No foreground group: the shell itself is not
                        // interruptible by Ctrl-C/Ctrl-Z, per the spec.
                    }
                    _ => {}
                }
            }
        });

        Ok(())
    }

    #[cfg(not(unix))]
    pub fn install(&self) -> std::io::Result<()> {
        Ok(())
    }

    /// Drain any pending `SIGCHLD` notification and reap every child that
    /// can be collected without blocking, updating `jobs` in place.
    /// Prints `[n]  Done  cmdline` for jobs that just finished, matching
    /// the teacher's job-table notification style.
    #[cfg(unix)]
    pub fn drain(&self, jobs: &mut JobTable) {
        if !self.chld_pending.swap(false, Ordering::SeqCst) {
            return;
        }
        reap_available(jobs);
    }

    #[cfg(not(unix))]
    pub fn drain(&self, _jobs: &mut JobTable) {}
}

#[cfg(unix)]
fn reap_available(jobs: &mut JobTable) {
    loop {
        let mut raw_status: libc::c_int = 0;
        let pid = unsafe {
            libc::waitpid(
                -1,
                &mut raw_status,
                libc::WNOHANG | libc::WUNTRACED | libc::WCONTINUED,
            )
        };

        if pid <= 0 {
            break;
        }

        let pgid = unsafe { libc::getpgid(pid) };
        let pgid = if pgid < 0 { pid } else { pgid };

        if unsafe { libc::WIFSTOPPED(raw_status) } {
            jobs.set_state_by_pgid(pgid, JobState::Stopped);
        } else if unsafe { libc::WIFCONTINUED(raw_status) } {
            jobs.set_state_by_pgid(pgid, JobState::Running);
        } else if let Some(code) = status::exit_code_from_wait_status(raw_status) {
            if let Some(job) = jobs.by_pgid_mut(pgid) {
                if job.state != JobState::Done {
                    println!("[{}]  Done  {}", job.id, job.cmdline);
                }
            }
            jobs.mark_done(pgid, code);
        }
    }
}
