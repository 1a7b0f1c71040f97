pub mod control;
pub mod fork;
pub mod job;
pub mod signal;
pub mod state;
pub mod wait;

pub use control::{Deferred, JobControl};
pub use fork::launch_job;
pub use job::{Job, JobSummary, JobTable, MAX_JOBS};
pub use state::JobState;
pub use wait::{ChildChange, JobNotice};
