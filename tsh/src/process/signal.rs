use libc::{STDOUT_FILENO, c_int};
use nix::sys::signal::{
    SaFlags, SigAction, SigHandler, SigSet, SigmaskHow, Signal, kill, killpg, sigaction,
    sigprocmask,
};
use nix::unistd::{Pid, write};
use std::fmt;
use tracing::{debug, error, warn};
use tsh_types::{TshError, TshResult};

use super::control::JobControl;
use super::job::JobTable;
use super::wait::{JobNotice, drain_child_changes, reap_next};

/// Signals deferred while the main flow owns the job table.
pub const JOB_SIGNALS: [Signal; 3] = [Signal::SIGCHLD, Signal::SIGINT, Signal::SIGTSTP];

pub(crate) fn job_signal_set() -> SigSet {
    let mut set = SigSet::empty();
    for signal in JOB_SIGNALS {
        set.add(signal);
    }
    set
}

/// Blocks the job-control signals and returns the mask that was in effect.
pub(crate) fn block_job_signals() -> TshResult<SigSet> {
    let mut previous = SigSet::empty();
    sigprocmask(
        SigmaskHow::SIG_BLOCK,
        Some(&job_signal_set()),
        Some(&mut previous),
    )
    .map_err(TshError::Mask)?;
    Ok(previous)
}

pub(crate) fn unblock_job_signals() -> TshResult<()> {
    sigprocmask(SigmaskHow::SIG_UNBLOCK, Some(&job_signal_set()), None).map_err(TshError::Mask)
}

pub(crate) fn restore_mask(previous: &SigSet) -> TshResult<()> {
    sigprocmask(SigmaskHow::SIG_SETMASK, Some(previous), None).map_err(TshError::Mask)
}

/// Atomically swaps in `mask` and sleeps until a handler has run.
pub(crate) fn suspend(mask: &SigSet) {
    // sigsuspend always returns -1/EINTR once a handler ran
    unsafe {
        libc::sigsuspend(mask.as_ref());
    }
}

/// Installs the child-state, interrupt, suspend and quit handlers.
///
/// Each handler runs with all job-control signals blocked, so handlers never
/// interleave with each other while one of them is walking the table.
pub fn install_handlers() -> TshResult<()> {
    debug!("installing job control handlers");
    install(Signal::SIGCHLD, handle_sigchld)?;
    install(Signal::SIGINT, handle_sigint)?;
    install(Signal::SIGTSTP, handle_sigtstp)?;
    install(Signal::SIGQUIT, handle_sigquit)?;
    Ok(())
}

fn install(signal: Signal, handler: extern "C" fn(c_int)) -> TshResult<()> {
    let action = SigAction::new(
        SigHandler::Handler(handler),
        SaFlags::SA_RESTART,
        job_signal_set(),
    );
    unsafe { sigaction(signal, &action) }.map_err(|source| TshError::Install {
        signal: signal.as_str(),
        source,
    })?;
    Ok(())
}

/// Restores default dispositions in a freshly forked child so the program it
/// becomes reacts to ctrl-c and ctrl-z normally.
pub(crate) fn reset_child_signals() -> TshResult<()> {
    let action = SigAction::new(SigHandler::SigDfl, SaFlags::empty(), SigSet::empty());
    for signal in [
        Signal::SIGCHLD,
        Signal::SIGINT,
        Signal::SIGTSTP,
        Signal::SIGQUIT,
    ] {
        unsafe { sigaction(signal, &action) }.map_err(|source| TshError::Install {
            signal: signal.as_str(),
            source,
        })?;
    }
    Ok(())
}

/// Forwards `signal` to the process group of the foreground job.
///
/// Returns the job's pid, or `None` (and sends nothing) when no job is in the
/// foreground. The job's state is left alone; a stop is recorded once the
/// kernel reports it through SIGCHLD.
pub fn route_to_foreground<F>(table: &JobTable, signal: Signal, send: F) -> Option<Pid>
where
    F: FnOnce(Pid, Signal) -> nix::Result<()>,
{
    let pid = table.foreground_pid()?;
    let _ = send(pid, signal);
    Some(pid)
}

/// Sends `signal` to the process group led by `pid`, falling back to the
/// single process when the group is gone. Main control flow only.
pub(crate) fn send_to_group(pid: Pid, signal: Signal) -> anyhow::Result<()> {
    debug!("📡 SIGNAL: Sending signal {:?} to process group {}", signal, pid);
    match killpg(pid, signal) {
        Ok(_) => Ok(()),
        Err(e) => {
            warn!(
                "📡 SIGNAL: Failed to signal process group {}: {}, trying individual process",
                pid, e
            );
            kill(pid, signal).map_err(|e2| {
                error!("📡 SIGNAL: Failed to send {:?} to pid {}: {}", signal, pid, e2);
                anyhow::anyhow!("failed to send {} to {}: {}", signal.as_str(), pid, e2)
            })
        }
    }
}

/// Fixed-capacity formatter for messages produced inside signal handlers,
/// where neither allocation nor the tracing subscriber may be used.
pub(crate) struct StackWriter {
    buf: [u8; 256],
    len: usize,
}

impl StackWriter {
    pub(crate) const fn new() -> Self {
        StackWriter {
            buf: [0; 256],
            len: 0,
        }
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    pub(crate) fn write_to_stdout(&self) {
        let _ = write(STDOUT_FILENO, self.as_bytes());
    }
}

impl fmt::Write for StackWriter {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let room = self.buf.len() - self.len;
        let n = s.len().min(room);
        self.buf[self.len..self.len + n].copy_from_slice(&s.as_bytes()[..n]);
        self.len += n;
        if n < s.len() { Err(fmt::Error) } else { Ok(()) }
    }
}

fn print_notice(notice: JobNotice) {
    use std::fmt::Write as _;
    let mut out = StackWriter::new();
    let _ = writeln!(out, "{notice}");
    out.write_to_stdout();
}

extern "C" fn handle_sigchld(_: c_int) {
    if let Some(control) = JobControl::installed() {
        let table = unsafe { control.handler_table() };
        drain_child_changes(table, reap_next, print_notice);
    }
}

fn forward(signal: Signal) {
    if let Some(control) = JobControl::installed() {
        let table = unsafe { control.handler_table() };
        route_to_foreground(table, signal, |pid, signal| killpg(pid, signal));
    }
}

extern "C" fn handle_sigint(_: c_int) {
    forward(Signal::SIGINT);
}

extern "C" fn handle_sigtstp(_: c_int) {
    forward(Signal::SIGTSTP);
}

extern "C" fn handle_sigquit(_: c_int) {
    let _ = write(
        STDOUT_FILENO,
        b"Terminating after receipt of SIGQUIT signal\n",
    );
    unsafe { libc::_exit(1) }
}
