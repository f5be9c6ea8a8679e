//! The job table: background/stopped process groups tracked by a small
//! integer id distinct from their `pgid`. Mutated both by the main loop
//! (on launch, on `fg`/`bg`) and by the signal reaper draining `SIGCHLD`
//! notifications (see [`crate::signals`]) — never by the signal handler
//! itself.

use std::collections::HashMap;

use crate::limits::MAX_JOBS;

#[cfg(unix)]
pub type Pid = libc::pid_t;
#[cfg(not(unix))]
pub type Pid = i32;

/// The lifecycle state of a tracked job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Running,
    Stopped,
    Done,
}

/// A single tracked background or stopped job.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: usize,
    pub pgid: Pid,
    pub cmdline: String,
    pub state: JobState,
    pub exit_code: Option<i32>,
}

/// The shell's job table.
#[derive(Debug, Default)]
pub struct JobTable {
    jobs: HashMap<usize, Job>,
    next_id: usize,
}

impl JobTable {
    pub fn new() -> Self {
        Self {
            jobs: HashMap::new(),
            next_id: 1,
        }
    }

    /// Register a new running job. Per the spec, a full table silently
    /// drops the new job from tracking — the pipeline still runs, it's
    /// just invisible to `jobs`/`fg`/`bg`. Returns the assigned id, or
    /// `None` on overflow.
    pub fn add_running(&mut self, pgid: Pid, cmdline: String) -> Option<usize> {
        if self.non_done_count() >= MAX_JOBS {
            tracing::warn!(pgid, "job table full ({MAX_JOBS}); job not tracked");
            return None;
        }
        let id = self.next_id;
        self.next_id += 1;
        self.jobs.insert(
            id,
            Job {
                id,
                pgid,
                cmdline,
                state: JobState::Running,
                exit_code: None,
            },
        );
        tracing::debug!(id, pgid, "job registered as running");
        Some(id)
    }

    /// Same as [`add_running`](Self::add_running) but the job starts
    /// `Stopped` (e.g. a foreground pipeline that received `SIGTSTP`
    /// before the shell could hand it off).
    pub fn add_stopped(&mut self, pgid: Pid, cmdline: String) -> Option<usize> {
        let id = self.add_running(pgid, cmdline)?;
        if let Some(job) = self.jobs.get_mut(&id) {
            job.state = JobState::Stopped;
        }
        Some(id)
    }

    fn non_done_count(&self) -> usize {
        self.jobs
            .values()
            .filter(|j| j.state != JobState::Done)
            .count()
    }

    /// Find the job whose process group matches `pgid` — used by the
    /// signal reaper, which only knows the pid/pgid a `waitpid` call
    /// reported, not the shell-local job id.
    pub fn by_pgid_mut(&mut self, pgid: Pid) -> Option<&mut Job> {
        self.jobs.values_mut().find(|j| j.pgid == pgid)
    }

    pub fn get(&self, id: usize) -> Option<&Job> {
        self.jobs.get(&id)
    }

    pub fn get_mut(&mut self, id: usize) -> Option<&mut Job> {
        self.jobs.get_mut(&id)
    }

    pub fn set_state(&mut self, id: usize, state: JobState) {
        if let Some(job) = self.jobs.get_mut(&id) {
            tracing::debug!(id, ?state, "job state transition");
            job.state = state;
        }
    }

    /// Same as [`set_state`](Self::set_state) but looked up by `pgid`,
    /// for the signal reaper which only has a pid/pgid from `waitpid`.
    pub fn set_state_by_pgid(&mut self, pgid: Pid, state: JobState) {
        if let Some(job) = self.by_pgid_mut(pgid) {
            tracing::debug!(id = job.id, pgid, ?state, "job state transition");
            job.state = state;
        }
    }

    pub fn mark_done(&mut self, pgid: Pid, exit_code: i32) {
        if let Some(job) = self.by_pgid_mut(pgid) {
            tracing::debug!(id = job.id, pgid, exit_code, "job done");
            job.state = JobState::Done;
            job.exit_code = Some(exit_code);
        }
    }

    /// Drop every `Done` entry from the table. Called at the top of each
    /// interactive loop iteration, per the spec's Job lifecycle.
    pub fn sweep_done(&mut self) {
        self.jobs.retain(|_, job| job.state != JobState::Done);
    }

    pub fn remove(&mut self, id: usize) -> Option<Job> {
        self.jobs.remove(&id)
    }

    /// All jobs sorted by id, for the `jobs` builtin.
    pub fn jobs_sorted(&self) -> Vec<&Job> {
        let mut list: Vec<&Job> = self.jobs.values().collect();
        list.sort_by_key(|j| j.id);
        list
    }

    pub fn most_recent_id(&self) -> Option<usize> {
        self.jobs.keys().copied().max()
    }

    pub fn most_recent_stopped_id(&self) -> Option<usize> {
        self.jobs
            .iter()
            .filter(|(_, j)| j.state == JobState::Stopped)
            .map(|(id, _)| *id)
            .max()
    }

    pub fn running_ids(&self) -> Vec<usize> {
        self.jobs
            .iter()
            .filter(|(_, j)| j.state == JobState::Running)
            .map(|(id, _)| *id)
            .collect()
    }
}
