//! Ownership of the job table shared between the main control flow and the
//! signal handlers.
//!
//! There are no locks: the main flow reaches the table only through a
//! [`Deferred`] guard, which keeps SIGCHLD, SIGINT and SIGTSTP blocked for as
//! long as it lives. Handlers therefore never observe a half-written slot.
//! The shell is single threaded; the mask is per thread.

use nix::sys::signal::SigSet;
use nix::unistd::Pid;
use std::cell::UnsafeCell;
use std::sync::OnceLock;
use tracing::{debug, error};
use tsh_types::TshResult;

use super::job::{JobTable, volatile_state};
use super::signal::{self, JOB_SIGNALS};
use super::state::JobState;

pub struct JobControl {
    table: UnsafeCell<JobTable>,
}

// SAFETY: the table is only mutated from the main thread while a `Deferred`
// guard blocks the job-control signals, or from a handler while those same
// signals are blocked by `sa_mask`.
unsafe impl Sync for JobControl {}

static JOB_CONTROL: OnceLock<JobControl> = OnceLock::new();

impl std::fmt::Debug for JobControl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobControl").finish_non_exhaustive()
    }
}

impl JobControl {
    pub(crate) fn new() -> Self {
        JobControl {
            table: UnsafeCell::new(JobTable::new()),
        }
    }

    /// Creates the process-wide job table and installs the handlers that
    /// maintain it. Failure leaves the shell unable to do job control.
    pub fn install() -> TshResult<&'static JobControl> {
        let control = JOB_CONTROL.get_or_init(JobControl::new);
        signal::install_handlers()?;
        debug!("job control installed");
        Ok(control)
    }

    /// The table registered by [`JobControl::install`], for handlers.
    pub(crate) fn installed() -> Option<&'static JobControl> {
        JOB_CONTROL.get()
    }

    /// # Safety
    ///
    /// Only for signal handlers, which run with the job-control signals
    /// blocked and can only interrupt the main flow outside a `Deferred`.
    pub(crate) unsafe fn handler_table(&self) -> &mut JobTable {
        unsafe { &mut *self.table.get() }
    }

    /// Blocks the job-control signals and grants exclusive table access
    /// until the returned guard is dropped.
    pub fn defer(&self) -> TshResult<Deferred<'_>> {
        let previous = signal::block_job_signals()?;
        Ok(Deferred {
            control: self,
            previous,
        })
    }
}

/// Exclusive access to the job table with notification delivery deferred.
/// Dropping it restores the signal mask that was in effect before.
pub struct Deferred<'a> {
    control: &'a JobControl,
    previous: SigSet,
}

impl std::fmt::Debug for Deferred<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Deferred").finish_non_exhaustive()
    }
}

impl Deferred<'_> {
    pub fn table(&mut self) -> &mut JobTable {
        unsafe { &mut *self.control.table.get() }
    }

    /// Blocks until `pid` has exited or stopped.
    ///
    /// The check runs with signals deferred and the sleep re-enables them
    /// atomically via `sigsuspend`, so a SIGCHLD arriving between the two
    /// cannot be missed. A missing slot counts as "no longer foreground".
    /// The state is read through a raw pointer since the SIGCHLD handler
    /// writes the slot while this loop sleeps.
    pub fn wait_foreground(&mut self, pid: Pid) {
        let mut wake = self.previous;
        for signal in JOB_SIGNALS {
            wake.remove(signal);
        }
        let table = self.control.table.get().cast_const();
        debug!("waiting for foreground job {}", pid);
        while unsafe { volatile_state(table, pid) } == Some(JobState::Foreground) {
            signal::suspend(&wake);
        }
        debug!("foreground job {} released the shell", pid);
    }
}

impl Drop for Deferred<'_> {
    fn drop(&mut self) {
        if let Err(e) = signal::restore_mask(&self.previous) {
            error!("failed to restore signal mask: {}", e);
        }
    }
}
