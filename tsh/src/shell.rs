pub mod eval;
pub mod job;
pub mod parse;

use crate::process::JobControl;
use anyhow::Result;
use nix::unistd::{Pid, getpid};
use std::io::Write;
use tracing::{debug, warn};
use tsh_builtin::ShellProxy;
use tsh_types::{Context, ExitStatus, JobSpec};

pub const APP_NAME: &str = "tsh";
pub const PROMPT: &str = "tsh> ";

pub struct Shell {
    pub control: &'static JobControl,
    pub exited: Option<ExitStatus>,
    pub pid: Pid,
}

impl std::fmt::Debug for Shell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shell")
            .field("pid", &self.pid)
            .field("exited", &self.exited)
            .finish()
    }
}

impl Drop for Shell {
    fn drop(&mut self) {
        if let Err(e) = self.terminate_jobs() {
            warn!("failed to terminate jobs on exit: {}", e);
        }
    }
}

impl Shell {
    pub fn new(control: &'static JobControl) -> Self {
        Shell {
            control,
            exited: None,
            pid: getpid(),
        }
    }

    pub fn eval_str(&mut self, ctx: &Context, input: &str) -> Result<ExitStatus> {
        eval::eval_str(self, ctx, input)
    }

    pub fn exit(&mut self) {
        self.exited = Some(ExitStatus::ExitedWith(0));
    }

    pub fn print_error(&self, msg: String) {
        eprintln!("{APP_NAME}: {msg}");
        std::io::stderr().flush().ok();
    }

    pub fn terminate_jobs(&mut self) -> Result<()> {
        job::terminate_jobs(self)
    }
}

impl ShellProxy for Shell {
    fn exit_shell(&mut self) {
        debug!("exit requested from builtin");
        self.exit();
    }

    fn list_jobs(&mut self) -> Result<Vec<String>> {
        job::list_jobs(self)
    }

    fn continue_job(&mut self, spec: JobSpec, foreground: bool) -> Result<String> {
        job::continue_job(self, spec, foreground)
    }
}
