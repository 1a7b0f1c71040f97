//! Argument handling shared by `fg` and `bg`.

use super::ShellProxy;
use anyhow::{Result, bail};
use tracing::debug;
use tsh_types::JobSpec;

/// Parses `<cmd> %jid|pid` and forwards the request to the shell.
pub(crate) fn run(
    cmd: &str,
    argv: &[String],
    proxy: &mut dyn ShellProxy,
    foreground: bool,
) -> Result<String> {
    let Some(arg) = argv.get(1) else {
        bail!("{cmd} command requires PID or %jobid argument");
    };
    let Some(spec) = JobSpec::parse(arg) else {
        bail!("{cmd}: argument must be a PID or %jobid");
    };
    debug!("{cmd}: continuing {spec} foreground:{foreground}");
    proxy.continue_job(spec, foreground)
}
