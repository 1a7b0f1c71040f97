use nix::errno::Errno;
use nix::sys::signal::Signal;
use nix::sys::wait::{WaitPidFlag, WaitStatus, waitpid};
use nix::unistd::Pid;

use super::job::JobTable;
use super::state::JobState;

/// A state change reported by `waitpid` for one child.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ChildChange {
    Exited(Pid, i32),
    Signaled(Pid, Signal),
    Stopped(Pid, Signal),
}

impl ChildChange {
    pub fn from_status(status: WaitStatus) -> Option<Self> {
        match status {
            WaitStatus::Exited(pid, code) => Some(ChildChange::Exited(pid, code)),
            WaitStatus::Signaled(pid, signal, _core_dumped) => {
                Some(ChildChange::Signaled(pid, signal))
            }
            WaitStatus::Stopped(pid, signal) => Some(ChildChange::Stopped(pid, signal)),
            _ => None,
        }
    }
}

/// User-facing report of a job that did not end by exiting normally.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum JobNotice {
    Terminated {
        job_id: usize,
        pid: Pid,
        signal: Signal,
    },
    Stopped {
        job_id: usize,
        pid: Pid,
        signal: Signal,
    },
}

impl std::fmt::Display for JobNotice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobNotice::Terminated {
                job_id,
                pid,
                signal,
            } => write!(
                f,
                "Job [{}] ({}) terminated by signal {}",
                job_id, pid, *signal as i32
            ),
            JobNotice::Stopped {
                job_id,
                pid,
                signal,
            } => write!(
                f,
                "Job [{}] ({}) stopped by signal {}",
                job_id, pid, *signal as i32
            ),
        }
    }
}

/// Non-blocking reap of one pending child state change.
///
/// Returns `None` once no child has anything left to report (or there are
/// no children at all).
pub fn reap_next() -> Option<ChildChange> {
    loop {
        match waitpid(
            Pid::from_raw(-1),
            Some(WaitPidFlag::WNOHANG | WaitPidFlag::WUNTRACED),
        ) {
            Ok(WaitStatus::StillAlive) => return None,
            Ok(status) => {
                if let Some(change) = ChildChange::from_status(status) {
                    return Some(change);
                }
            }
            Err(Errno::EINTR) => continue,
            Err(_) => return None,
        }
    }
}

/// Applies one child state change to the table.
///
/// Exited and killed children lose their slot, stopped children are marked
/// Stopped. Changes for untracked pids are ignored.
pub fn apply_change(table: &mut JobTable, change: ChildChange) -> Option<JobNotice> {
    match change {
        ChildChange::Exited(pid, _code) => {
            table.remove(pid);
            None
        }
        ChildChange::Signaled(pid, signal) => {
            let job_id = table.find_by_pid(pid).map(|job| job.job_id);
            table.remove(pid);
            job_id.map(|job_id| JobNotice::Terminated {
                job_id,
                pid,
                signal,
            })
        }
        ChildChange::Stopped(pid, signal) => {
            let job = table.find_by_pid_mut(pid)?;
            job.state = JobState::Stopped;
            Some(JobNotice::Stopped {
                job_id: job.job_id,
                pid,
                signal,
            })
        }
    }
}

/// Body of the SIGCHLD handler: drains every pending change, not just the
/// first, since one signal may stand for several children.
///
/// Runs in signal context, so it only scans and writes table fields; `report`
/// must be async-signal-safe as well. Returns the number of changes applied.
pub fn drain_child_changes<N, R>(table: &mut JobTable, mut next: N, mut report: R) -> usize
where
    N: FnMut() -> Option<ChildChange>,
    R: FnMut(JobNotice),
{
    let mut drained = 0;
    while let Some(change) = next() {
        drained += 1;
        if let Some(notice) = apply_change(table, change) {
            report(notice);
        }
    }
    drained
}
