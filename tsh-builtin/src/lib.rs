use anyhow::Result;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::debug;
use tsh_types::{Context, ExitStatus, JobSpec};

// Builtin command modules
mod bg;
mod fg;
mod jobs;
mod resume;

/// Trait that provides an interface for builtin commands to interact with the shell
/// This allows builtin commands to perform job control without direct coupling
pub trait ShellProxy {
    /// Initiates shell exit process
    fn exit_shell(&mut self);

    /// Returns one summary line per tracked job, in table order
    fn list_jobs(&mut self) -> Result<Vec<String>>;

    /// Sends SIGCONT to a stopped or background job and moves it to the
    /// requested state. Returns the job's `[jid] (pid) cmdline` description.
    /// When `foreground` is set this blocks until the job stops or exits.
    fn continue_job(&mut self, spec: JobSpec, foreground: bool) -> Result<String>;
}

/// Type alias for builtin command function signature
/// All builtin commands must conform to this signature
pub type BuiltinCommand =
    fn(ctx: &Context, argv: Vec<String>, proxy: &mut dyn ShellProxy) -> ExitStatus;

/// Global registry of all builtin commands
pub static BUILTIN_COMMAND: Lazy<Mutex<HashMap<&str, BuiltinCommand>>> = Lazy::new(|| {
    let mut builtin = HashMap::new();

    builtin.insert("quit", quit as BuiltinCommand);

    // Job control commands
    builtin.insert("jobs", jobs::command as BuiltinCommand);
    builtin.insert("fg", fg::command as BuiltinCommand);
    builtin.insert("bg", bg::command as BuiltinCommand);

    Mutex::new(builtin)
});

/// Retrieves a builtin command function by name
/// Returns None if the command is not found
pub fn get_command(name: &str) -> Option<BuiltinCommand> {
    if let Ok(builtin) = BUILTIN_COMMAND.lock() {
        builtin.get(name).copied()
    } else {
        None
    }
}

/// Built-in quit command implementation
pub fn quit(_ctx: &Context, _argv: Vec<String>, proxy: &mut dyn ShellProxy) -> ExitStatus {
    debug!("quit command called - initiating normal shell exit");
    proxy.exit_shell();
    ExitStatus::ExitedWith(0)
}
