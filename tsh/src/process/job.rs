//! Fixed-capacity registry of the shell's child processes.
//!
//! The table is touched from signal handlers, so nothing here allocates
//! after construction: slots live in an array and command lines are copied
//! into an inline buffer.

use nix::unistd::Pid;
use std::ptr;
use tsh_types::{JobError, JobSpec};

use super::state::JobState;

/// Number of job slots. Job ids wrap back to 1 once they pass it.
pub const MAX_JOBS: usize = 16;
/// Longest command line kept for display, in bytes.
pub const MAX_LINE: usize = 1024;

const NO_PID: Pid = Pid::from_raw(0);

/// Inline, fixed-size copy of the text a job was launched with.
#[derive(Clone)]
pub struct CommandLine {
    buf: [u8; MAX_LINE],
    len: usize,
}

impl CommandLine {
    pub const fn new() -> Self {
        CommandLine {
            buf: [0; MAX_LINE],
            len: 0,
        }
    }

    /// Stores `text` without its trailing newline, truncated on a char
    /// boundary when it does not fit.
    pub fn set(&mut self, text: &str) {
        let text = text.trim_end_matches(['\n', '\r']);
        let mut len = text.len().min(MAX_LINE);
        while !text.is_char_boundary(len) {
            len -= 1;
        }
        self.buf[..len].copy_from_slice(&text.as_bytes()[..len]);
        self.len = len;
    }

    pub fn clear(&mut self) {
        self.len = 0;
    }

    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.buf[..self.len]).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Default for CommandLine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CommandLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("CommandLine").field(&self.as_str()).finish()
    }
}

impl std::fmt::Display for CommandLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One slot of the job table. A slot whose `pid` is 0 is unused.
#[derive(Debug, Clone)]
pub struct Job {
    pub pid: Pid,
    pub job_id: usize,
    pub state: JobState,
    pub cmdline: CommandLine,
}

impl Job {
    pub const fn empty() -> Self {
        Job {
            pid: NO_PID,
            job_id: 0,
            state: JobState::Undefined,
            cmdline: CommandLine::new(),
        }
    }

    pub fn is_occupied(&self) -> bool {
        self.pid != NO_PID
    }

    pub fn clear(&mut self) {
        self.pid = NO_PID;
        self.job_id = 0;
        self.state = JobState::Undefined;
        self.cmdline.clear();
    }

    /// `[jid] (pid) State cmdline`, the `jobs` listing format.
    pub fn summary(&self) -> JobSummary<'_> {
        JobSummary(self)
    }

    /// `[jid] (pid) cmdline`, printed when a job starts running in the background.
    pub fn brief(&self) -> String {
        format!("[{}] ({}) {}", self.job_id, self.pid, self.cmdline)
    }
}

impl Default for Job {
    fn default() -> Self {
        Self::empty()
    }
}

/// Display adapter for one line of the job listing.
#[derive(Debug, Clone, Copy)]
pub struct JobSummary<'a>(&'a Job);

impl JobSummary<'_> {
    pub fn job(&self) -> &Job {
        self.0
    }
}

impl std::fmt::Display for JobSummary<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let job = self.0;
        write!(
            f,
            "[{}] ({}) {} {}",
            job.job_id, job.pid, job.state, job.cmdline
        )
    }
}

#[derive(Debug, Clone)]
pub struct JobTable {
    slots: [Job; MAX_JOBS],
    next_job_id: usize,
}

impl Default for JobTable {
    fn default() -> Self {
        Self::new()
    }
}

impl JobTable {
    pub fn new() -> Self {
        JobTable {
            slots: std::array::from_fn(|_| Job::empty()),
            next_job_id: 1,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// The id the next successful `add` will try first.
    pub fn next_job_id(&self) -> usize {
        self.next_job_id
    }

    pub fn len(&self) -> usize {
        self.jobs().count()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs().next().is_none()
    }

    /// Occupied slots in table order.
    pub fn jobs(&self) -> impl Iterator<Item = &Job> {
        self.slots.iter().filter(|job| job.is_occupied())
    }

    /// Resets a slot to the unused state. Out-of-range slots are ignored.
    pub fn clear(&mut self, slot: usize) {
        if let Some(job) = self.slots.get_mut(slot) {
            job.clear();
        }
    }

    /// Largest job id currently allocated, 0 when the table is empty.
    pub fn max_job_id(&self) -> usize {
        self.jobs().map(|job| job.job_id).max().unwrap_or(0)
    }

    /// Registers a new job in the first unused slot and returns its job id.
    pub fn add(&mut self, pid: Pid, state: JobState, cmdline: &str) -> Result<usize, JobError> {
        if pid.as_raw() < 1 {
            return Err(JobError::InvalidPid(pid.as_raw()));
        }
        if state == JobState::Undefined {
            return Err(JobError::UndefinedState);
        }
        if self.find_by_pid(pid).is_some() {
            return Err(JobError::DuplicatePid(pid.as_raw()));
        }
        if state == JobState::Foreground && self.foreground_pid().is_some() {
            return Err(JobError::ForegroundBusy);
        }
        let Some(slot) = self.slots.iter().position(|job| !job.is_occupied()) else {
            return Err(JobError::TableFull);
        };

        let job_id = self.allocate_job_id();
        let job = &mut self.slots[slot];
        job.pid = pid;
        job.state = state;
        job.job_id = job_id;
        job.cmdline.set(cmdline);
        Ok(job_id)
    }

    fn allocate_job_id(&mut self) -> usize {
        let wrap = |job_id: usize| if job_id >= MAX_JOBS { 1 } else { job_id + 1 };
        let mut job_id = match self.next_job_id {
            0 => 1,
            id if id > MAX_JOBS => 1,
            id => id,
        };
        // a free slot exists, so fewer than MAX_JOBS ids are live
        while self.find_by_job_id(job_id).is_some() {
            job_id = wrap(job_id);
        }
        self.next_job_id = wrap(job_id);
        job_id
    }

    /// Clears the slot owned by `pid`. Returns false if there is no such job.
    pub fn remove(&mut self, pid: Pid) -> bool {
        if pid.as_raw() < 1 {
            return false;
        }
        match self.slots.iter_mut().find(|job| job.pid == pid) {
            Some(job) => {
                job.clear();
                self.next_job_id = self.max_job_id() + 1;
                true
            }
            None => false,
        }
    }

    pub fn find_by_pid(&self, pid: Pid) -> Option<&Job> {
        if pid.as_raw() < 1 {
            return None;
        }
        self.slots.iter().find(|job| job.pid == pid)
    }

    pub fn find_by_pid_mut(&mut self, pid: Pid) -> Option<&mut Job> {
        if pid.as_raw() < 1 {
            return None;
        }
        self.slots.iter_mut().find(|job| job.pid == pid)
    }

    pub fn find_by_job_id(&self, job_id: usize) -> Option<&Job> {
        if job_id < 1 {
            return None;
        }
        self.slots.iter().find(|job| job.job_id == job_id)
    }

    pub fn find_by_job_id_mut(&mut self, job_id: usize) -> Option<&mut Job> {
        if job_id < 1 {
            return None;
        }
        self.slots.iter_mut().find(|job| job.job_id == job_id)
    }

    pub fn find(&self, spec: JobSpec) -> Option<&Job> {
        match spec {
            JobSpec::JobId(job_id) => self.find_by_job_id(job_id),
            JobSpec::Pid(pid) => self.find_by_pid(pid),
        }
    }

    /// Process id of the foreground job, if any.
    pub fn foreground_pid(&self) -> Option<Pid> {
        self.slots
            .iter()
            .find(|job| job.state == JobState::Foreground)
            .map(|job| job.pid)
    }

    /// Moves the job owned by `pid` to `state`, keeping at most one
    /// foreground job.
    pub fn set_state(&mut self, pid: Pid, state: JobState) -> Result<(), JobError> {
        if state == JobState::Undefined {
            return Err(JobError::UndefinedState);
        }
        if state == JobState::Foreground
            && self.foreground_pid().is_some_and(|fg| fg != pid)
        {
            return Err(JobError::ForegroundBusy);
        }
        let job = self
            .find_by_pid_mut(pid)
            .ok_or(JobError::NoSuchProcess(pid.as_raw()))?;
        job.state = state;
        Ok(())
    }

    /// One summary line per occupied slot, in table order.
    pub fn list(&self) -> impl Iterator<Item = JobSummary<'_>> {
        self.jobs().map(Job::summary)
    }
}

/// Reads the state of `pid`'s slot without forming a reference to the table,
/// so a handler writing the same slot does not alias a live borrow.
///
/// # Safety
///
/// `table` must point to a live `JobTable`.
pub(crate) unsafe fn volatile_state(table: *const JobTable, pid: Pid) -> Option<JobState> {
    if pid.as_raw() < 1 {
        return None;
    }
    let slots = unsafe { ptr::addr_of!((*table).slots) }.cast::<Job>();
    (0..MAX_JOBS).find_map(|i| {
        let job = unsafe { slots.add(i) };
        let slot_pid = unsafe { ptr::read_volatile(ptr::addr_of!((*job).pid)) };
        (slot_pid == pid).then(|| unsafe { ptr::read_volatile(ptr::addr_of!((*job).state)) })
    })
}
