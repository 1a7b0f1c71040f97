use super::ShellProxy;
use tsh_types::{Context, ExitStatus};

pub fn command(ctx: &Context, _argv: Vec<String>, proxy: &mut dyn ShellProxy) -> ExitStatus {
    let lines = match proxy.list_jobs() {
        Ok(lines) => lines,
        Err(e) => {
            ctx.write_stderr(&format!("jobs: {e}")).ok();
            return ExitStatus::ExitedWith(1);
        }
    };
    for line in lines {
        if let Err(e) = ctx.write_stdout(&line) {
            ctx.write_stderr(&format!("jobs: {e}")).ok();
            return ExitStatus::ExitedWith(1);
        }
    }
    ExitStatus::ExitedWith(0)
}
