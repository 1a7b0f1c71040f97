use anyhow::Result;
use libc::{STDERR_FILENO, STDOUT_FILENO};
use nix::unistd::Pid;
use std::fmt::Debug;
use std::fs::File;
use std::io::Write;
use std::mem;
use std::os::unix::io::FromRawFd;
use std::os::unix::io::RawFd;
use thiserror::Error;

/// Errors raised by job table lookups and mutations.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobError {
    #[error("invalid process id {0}")]
    InvalidPid(i32),

    #[error("Tried to create too many jobs")]
    TableFull,

    #[error("a foreground job is already running")]
    ForegroundBusy,

    #[error("process {0} is already tracked")]
    DuplicatePid(i32),

    #[error("jobs cannot be registered in the undefined state")]
    UndefinedState,

    #[error("%{0}: No such job")]
    NoSuchJob(usize),

    #[error("({0}): No such process")]
    NoSuchProcess(i32),
}

/// Tiny shell specific error types
#[derive(Error, Debug)]
pub enum TshError {
    #[error("failed to change signal mask: {0}")]
    Mask(nix::Error),

    #[error("failed to install handler for {signal}: {source}")]
    Install {
        signal: &'static str,
        source: nix::Error,
    },

    #[error("fork error: {0}")]
    Fork(nix::Error),

    #[error("{command}: {message}")]
    Exec { command: String, message: String },

    #[error(transparent)]
    Job(#[from] JobError),

    #[error("{0}")]
    Argument(String),
}

pub type TshResult<T> = std::result::Result<T, TshError>;

/// A reference to a tracked job as typed by the user: `%3` or `1234`.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum JobSpec {
    JobId(usize),
    Pid(Pid),
}

impl JobSpec {
    pub fn parse(arg: &str) -> Option<Self> {
        if let Some(jid) = arg.strip_prefix('%') {
            jid.parse::<usize>().ok().map(JobSpec::JobId)
        } else {
            arg.parse::<i32>().ok().map(|pid| JobSpec::Pid(Pid::from_raw(pid)))
        }
    }

    pub fn not_found(&self) -> JobError {
        match self {
            JobSpec::JobId(jid) => JobError::NoSuchJob(*jid),
            JobSpec::Pid(pid) => JobError::NoSuchProcess(pid.as_raw()),
        }
    }
}

impl std::fmt::Display for JobSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobSpec::JobId(jid) => write!(f, "%{jid}"),
            JobSpec::Pid(pid) => write!(f, "{pid}"),
        }
    }
}

#[derive(Clone)]
pub struct Context {
    pub outfile: RawFd,
    pub errfile: RawFd,
    pub verbose: bool,
}

impl Context {
    pub fn new(verbose: bool) -> Self {
        Context {
            outfile: STDOUT_FILENO,
            errfile: STDERR_FILENO,
            verbose,
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new(false)
    }
}

impl Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::result::Result<(), std::fmt::Error> {
        f.debug_struct("Context")
            .field("outfile", &self.outfile)
            .field("errfile", &self.errfile)
            .field("verbose", &self.verbose)
            .finish()
    }
}

impl Context {
    pub fn write_stdout(&self, msg: &str) -> Result<()> {
        write_line(self.outfile, msg)
    }

    pub fn write_stderr(&self, msg: &str) -> Result<()> {
        write_line(self.errfile, msg)
    }
}

/// Writes `msg` and its newline with a single `write_all`, so output from a
/// running job cannot land between the text and the line break.
fn write_line(fd: RawFd, msg: &str) -> Result<()> {
    let line = format!("{msg}\n");
    let mut file = unsafe { File::from_raw_fd(fd) };
    let res = file.write_all(line.as_bytes());
    mem::forget(file);
    res?;
    Ok(())
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ExitStatus {
    ExitedWith(i32),
    Running(Pid),
}

#[cfg(test)]
mod tests {
    use super::*;
    use nix::unistd::{close, pipe, read};

    #[test]
    fn parse_job_spec() {
        assert_eq!(JobSpec::parse("%3"), Some(JobSpec::JobId(3)));
        assert_eq!(
            JobSpec::parse("1234"),
            Some(JobSpec::Pid(Pid::from_raw(1234)))
        );
        assert_eq!(JobSpec::parse("%"), None);
        assert_eq!(JobSpec::parse("%x"), None);
        assert_eq!(JobSpec::parse("abc"), None);
    }

    #[test]
    fn lines_are_written_whole() {
        let (read_fd, write_fd) = pipe().unwrap();
        let ctx = Context {
            outfile: write_fd,
            errfile: write_fd,
            verbose: true,
        };
        ctx.write_stdout("Added job [1] 4242 /bin/echo hi").unwrap();
        ctx.write_stderr("tsh: oops").unwrap();
        close(write_fd).unwrap();

        let mut buf = [0u8; 128];
        let n = read(read_fd, &mut buf).unwrap();
        close(read_fd).unwrap();
        assert_eq!(
            std::str::from_utf8(&buf[..n]).unwrap(),
            "Added job [1] 4242 /bin/echo hi\ntsh: oops\n"
        );
    }

    #[test]
    fn not_found_messages() {
        assert_eq!(
            JobSpec::JobId(2).not_found().to_string(),
            "%2: No such job"
        );
        assert_eq!(
            JobSpec::Pid(Pid::from_raw(77)).not_found().to_string(),
            "(77): No such process"
        );
        assert_eq!(
            JobError::TableFull.to_string(),
            "Tried to create too many jobs"
        );
    }
}
