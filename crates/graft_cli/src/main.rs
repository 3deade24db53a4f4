//! graft CLI - Main entry point.
//!
//! Exit codes:
//! - 0: Success, with or without warnings
//! - 1: Precondition or fatal failure
//! - 2: Invalid arguments

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;

use commands::{Cli, Commands};

/// CI-friendly exit codes
pub struct ExitCodes;

impl ExitCodes {
    pub const SUCCESS: u8 = 0;
    pub const GENERAL_ERROR: u8 = 1;
    pub const INVALID_ARGS: u8 = 2;
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return ExitCode::from(if e.use_stderr() {
                ExitCodes::INVALID_ARGS
            } else {
                ExitCodes::SUCCESS
            });
        }
    };

    // RUST_LOG wins over the verbosity flags
    let default_filter = if cli.verbose {
        "graft=debug,warn"
    } else if cli.quiet {
        "warn"
    } else {
        "graft=info,warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let log_result = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .try_init();

    if log_result.is_err() {
        // Logging already initialized, continue
    }

    let output = commands::Output {
        json: cli.json,
        quiet: cli.quiet,
    };
    let result = match cli.command {
        None => commands::update::execute(&cli.root, output).await,
        Some(Commands::Pull(args)) => commands::pull::execute(args, output).await,
    };

    match result {
        Ok(()) => ExitCode::from(ExitCodes::SUCCESS),
        Err(e) => {
            eprintln!("❌ Error: {:#}", e);
            ExitCode::from(ExitCodes::GENERAL_ERROR)
        }
    }
}
