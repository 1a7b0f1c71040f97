use super::ShellProxy;
use super::resume;
use tsh_types::{Context, ExitStatus};

pub const COMMAND_NAME: &str = "bg";

pub fn command(ctx: &Context, argv: Vec<String>, proxy: &mut dyn ShellProxy) -> ExitStatus {
    match resume::run(COMMAND_NAME, &argv, proxy, false) {
        Ok(summary) => {
            ctx.write_stdout(&summary).ok();
            ExitStatus::ExitedWith(0)
        }
        Err(e) => {
            ctx.write_stdout(&e.to_string()).ok();
            ExitStatus::ExitedWith(1)
        }
    }
}
