use anyhow::Result;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tiny_shell::process::JobControl;
use tiny_shell::repl;
use tiny_shell::shell::Shell;
use tracing::debug;
use tracing_subscriber::EnvFilter;
use tsh_types::Context;

/// A tiny shell with job control
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Print additional diagnostic information
    #[arg(short, long)]
    verbose: bool,

    /// Do not emit a command prompt
    #[arg(short = 'p', long = "no-prompt")]
    no_prompt: bool,

    /// Write trace output to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(err) = init_tracing(cli.log_file.as_deref()) {
        eprintln!("Failed to initialize tracing: {err}");
        return ExitCode::FAILURE;
    }

    // without handlers there is no safe way to track children
    let control = match JobControl::install() {
        Ok(control) => control,
        Err(err) => {
            eprintln!("tsh: {err}");
            return ExitCode::FAILURE;
        }
    };

    debug!("start shell");
    let mut shell = Shell::new(control);
    let ctx = Context::new(cli.verbose);
    let stdin = std::io::stdin();
    repl::run(&mut shell, &ctx, stdin.lock(), !cli.no_prompt)
}

fn init_tracing(log_file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_from_env("TSH_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    match log_file {
        Some(path) => {
            let log_file = std::sync::Arc::new(std::fs::File::create(path)?);
            tracing_subscriber::fmt()
                .with_ansi(false)
                .with_env_filter(filter)
                .with_file(true)
                .with_line_number(true)
                .with_writer(log_file)
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}
