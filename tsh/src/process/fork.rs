use anyhow::{Context as _, Result};
use nix::errno::Errno;
use nix::sys::signal::{Signal, kill};
use nix::unistd::{ForkResult, Pid, execvp, fork, getpid, setpgid};
use std::ffi::{CStr, CString};
use tracing::{debug, error, info};
use tsh_types::{Context, TshError};

use super::control::JobControl;
use super::state::JobState;

/// Converts the argument vector before forking so the child has nothing
/// left to allocate or fail on except `execvp` itself.
fn prepare_argv(argv: &[String]) -> Result<Vec<CString>, TshError> {
    if argv.is_empty() {
        return Err(TshError::Argument("empty command".to_string()));
    }
    argv.iter()
        .map(|arg| {
            CString::new(arg.as_str()).map_err(|_| TshError::Exec {
                command: argv[0].clone(),
                message: "argument contains a NUL byte".to_string(),
            })
        })
        .collect()
}

/// Launches `argv` as a new job in its own process group.
///
/// The table entry is written while SIGCHLD, SIGINT and SIGTSTP are blocked,
/// so no handler can see the child before its slot exists. Foreground jobs
/// are waited for before the mask is restored.
pub fn launch_job(
    ctx: &Context,
    control: &JobControl,
    argv: &[String],
    background: bool,
    cmdline: &str,
) -> Result<Pid> {
    let args = prepare_argv(argv)?;

    let mut deferred = control
        .defer()
        .context("failed to defer job control signals")?;

    debug!("🍴 FORK: launching {:?} background:{}", argv, background);
    let pid = unsafe { fork() }.map_err(TshError::Fork)?;

    match pid {
        ForkResult::Child => exec_child(&args),
        ForkResult::Parent { child } => {
            // the child does the same; whichever runs first wins the race
            if let Err(e) = setpgid(child, child) {
                debug!("🍴 FORK: parent setpgid({}) failed: {}", child, e);
            }

            let state = if background {
                JobState::Background
            } else {
                JobState::Foreground
            };
            let table = deferred.table();
            let job_id = match table.add(child, state, cmdline) {
                Ok(job_id) => job_id,
                Err(e) => {
                    error!("🍴 FORK: could not register pid {}: {}", child, e);
                    // an untracked child must not keep running; SIGCHLD reaps it
                    let _ = kill(child, Signal::SIGKILL);
                    return Err(TshError::from(e).into());
                }
            };
            info!("added job [{}] {} {}", job_id, child, cmdline.trim_end());
            if ctx.verbose {
                ctx.write_stdout(&format!(
                    "Added job [{}] {} {}",
                    job_id,
                    child,
                    cmdline.trim_end()
                ))?;
            }

            if background {
                if let Some(job) = table.find_by_pid(child) {
                    ctx.write_stdout(&job.brief())?;
                }
            } else {
                deferred.wait_foreground(child);
            }
            Ok(child)
        }
    }
}

/// Child half of the launch: leave the shell's process group, take back the
/// default signal behaviour and become the requested program. Never returns.
fn exec_child(args: &[CString]) -> ! {
    let pid = getpid();
    if let Err(e) = setpgid(pid, pid) {
        eprintln!("setpgid error: {e}");
        std::process::exit(1);
    }
    if let Err(e) = super::signal::reset_child_signals()
        .and_then(|_| super::signal::unblock_job_signals())
    {
        eprintln!("{e}");
        std::process::exit(1);
    }

    let program: &CStr = &args[0];
    let err = match execvp(program, args) {
        Ok(never) => match never {},
        Err(err) => err,
    };
    let name = program.to_string_lossy();
    match err {
        Errno::ENOENT => println!("{name}: Command not found"),
        Errno::EACCES => println!("{name}: Permission denied"),
        err => println!("{name}: {}", err.desc()),
    }
    std::process::exit(1);
}
