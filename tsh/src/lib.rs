pub mod errors;
pub mod process;
pub mod repl;
pub mod shell;

pub use process::{JobControl, JobState, JobTable};
pub use shell::Shell;
