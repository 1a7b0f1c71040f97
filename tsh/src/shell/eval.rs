use crate::process::launch_job;
use crate::shell::Shell;
use crate::shell::parse::{ParsedLine, parse_line};
use anyhow::Result;
use tracing::debug;
use tsh_types::{Context, ExitStatus};

/// Evaluates one command line: built-ins run in the shell, anything else
/// is launched as a job.
pub fn eval_str(shell: &mut Shell, ctx: &Context, input: &str) -> Result<ExitStatus> {
    let ParsedLine { argv, background } = parse_line(input);
    let Some(cmd) = argv.first() else {
        return Ok(ExitStatus::ExitedWith(0));
    };

    if let Some(builtin) = tsh_builtin::get_command(cmd) {
        debug!("builtin {} {:?}", cmd, argv);
        return Ok(builtin(ctx, argv, shell));
    }

    let pid = launch_job(ctx, shell.control, &argv, background, input)?;
    if background {
        Ok(ExitStatus::Running(pid))
    } else {
        Ok(ExitStatus::ExitedWith(0))
    }
}
