use super::ShellProxy;
use super::resume;
use tsh_types::{Context, ExitStatus};

pub const COMMAND_NAME: &str = "fg";

pub fn command(ctx: &Context, argv: Vec<String>, proxy: &mut dyn ShellProxy) -> ExitStatus {
    match resume::run(COMMAND_NAME, &argv, proxy, true) {
        // the job already owned the terminal output, nothing left to report
        Ok(_) => ExitStatus::ExitedWith(0),
        Err(e) => {
            ctx.write_stdout(&e.to_string()).ok();
            ExitStatus::ExitedWith(1)
        }
    }
}
