use crate::errors::display_user_error;
use crate::shell::{PROMPT, Shell};
use std::io::{self, BufRead, Write};
use std::process::ExitCode;
use tracing::{debug, error};
use tsh_types::{Context, ExitStatus};

/// Read-eval loop. Returns when `quit` runs or the input reaches EOF.
pub fn run<R: BufRead>(
    shell: &mut Shell,
    ctx: &Context,
    mut input: R,
    emit_prompt: bool,
) -> ExitCode {
    let mut line = String::new();
    loop {
        if emit_prompt {
            print!("{PROMPT}");
            io::stdout().flush().ok();
        }

        line.clear();
        match input.read_line(&mut line) {
            Ok(0) => {
                debug!("end of input");
                io::stdout().flush().ok();
                return ExitCode::SUCCESS;
            }
            Ok(_) => {}
            Err(err) => {
                error!("read error: {}", err);
                shell.print_error(format!("read error: {err}"));
                return ExitCode::FAILURE;
            }
        }

        match shell.eval_str(ctx, &line) {
            Ok(status) => debug!("{:?} -> {:?}", line.trim_end(), status),
            Err(err) => display_user_error(&err),
        }
        io::stdout().flush().ok();

        if let Some(ExitStatus::ExitedWith(code)) = shell.exited {
            debug!("shell exit requested with status {}", code);
            return ExitCode::from(u8::try_from(code).unwrap_or(1));
        }
    }
}
