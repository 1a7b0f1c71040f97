use crate::process::signal::send_to_group;
use crate::process::{Job, JobState, JobTable};
use crate::shell::Shell;
use anyhow::Result;
use nix::sys::signal::Signal;
use nix::unistd::Pid;
use tracing::{debug, info};
use tsh_types::JobSpec;

pub fn list_jobs(shell: &mut Shell) -> Result<Vec<String>> {
    let mut deferred = shell.control.defer()?;
    Ok(deferred.table().list().map(|s| s.to_string()).collect())
}

/// Resumes a stopped or background job with SIGCONT.
///
/// The new state is recorded before the signal is sent, so the job is
/// already Foreground when its process group starts running again.
pub fn continue_job(shell: &mut Shell, spec: JobSpec, foreground: bool) -> Result<String> {
    let mut deferred = shell.control.defer()?;
    let (pid, brief) = resume_job(deferred.table(), spec, foreground, send_to_group)?;
    if foreground {
        deferred.wait_foreground(pid);
    }
    Ok(brief)
}

/// Moves the job named by `spec` to its new state and sends SIGCONT through
/// `send`. When the signal cannot be delivered the job keeps the state it
/// had before. Returns the pid and the `[jid] (pid) cmdline` description.
fn resume_job<F>(
    table: &mut JobTable,
    spec: JobSpec,
    foreground: bool,
    send: F,
) -> Result<(Pid, String)>
where
    F: FnOnce(Pid, Signal) -> Result<()>,
{
    let (pid, previous) = table
        .find(spec)
        .map(|job| (job.pid, job.state))
        .ok_or_else(|| spec.not_found())?;

    let state = if foreground {
        JobState::Foreground
    } else {
        JobState::Background
    };
    table.set_state(pid, state)?;
    let brief = table.find_by_pid(pid).map(Job::brief).unwrap_or_default();
    info!("continuing job {} as {}", spec, state);

    if let Err(e) = send(pid, Signal::SIGCONT) {
        // SIGCHLD will clear the slot if the process is gone
        table.set_state(pid, previous)?;
        return Err(e);
    }
    Ok((pid, brief))
}

/// Sends SIGTERM followed by SIGCONT to every tracked job, so stopped jobs
/// see the termination request too.
pub fn terminate_jobs(shell: &mut Shell) -> Result<()> {
    let mut deferred = shell.control.defer()?;
    for job in deferred.table().jobs() {
        debug!("terminating job {} (pid: {})", job.job_id, job.pid);
        let _ = send_to_group(job.pid, Signal::SIGTERM);
        let _ = send_to_group(job.pid, Signal::SIGCONT);
    }
    Ok(())
}
