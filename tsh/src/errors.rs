use tracing::debug;
use tsh_types::{JobError, TshError};

/// Display error in a user-friendly format without stack traces.
pub fn display_user_error(err: &anyhow::Error) {
    debug!("command failed: {:?}", err);
    match err.downcast_ref::<TshError>() {
        // job table problems are part of normal shell output
        Some(TshError::Job(JobError::TableFull)) => println!("{err}"),
        _ => eprintln!("tsh: {err}"),
    }
}
