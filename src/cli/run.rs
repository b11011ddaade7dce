//! CLI entry point and dispatch logic
//!
//! This module owns the `run()` function which:
//! - Parses CLI arguments
//! - Builds CliArgs and discovers Config
//! - Creates the tokio runtime
//! - Dispatches to command handlers
//! - Handles all error output

use anyhow::Result;
use clap::Parser;
use tracing::warn;

use super::args::{Cli, Commands};
use super::commands;

use crate::{CliArgs, Config, DeckflowError, ExitCode};
use deckflow_utils::logging::init_tracing;

/// Main CLI execution function.
///
/// This function handles ALL output including errors. It returns `Result<(), ExitCode>`:
/// - On success: returns `Ok(())`, or `Err(code)` for a non-zero outcome such
///   as a partially generated deck
/// - On error: prints a user-facing report and returns `Err(ExitCode)`
///
/// main.rs only calls `std::process::exit(code.as_i32())` on error - it does NOT print.
pub fn run() -> Result<(), ExitCode> {
    let cli = Cli::parse();

    let cli_args = CliArgs {
        config_path: cli.config.clone(),
        service_url: cli.service_url.clone(),
        profile: cli.profile.clone(),
        request_timeout_secs: cli.request_timeout,
        verbose: cli.verbose.then_some(true),
    };

    let config = match Config::discover(&cli_args) {
        Ok(config) => config,
        Err(err) => {
            let err = DeckflowError::from(err);
            eprint!("{}", err.display_for_user());
            return Err(err.to_exit_code());
        }
    };

    if let Err(e) = init_tracing(cli.verbose || config.verbose()) {
        eprintln!("⚠ Failed to initialise logging: {e}");
    }

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("✗ Failed to create async runtime: {e}");
            return Err(ExitCode::INTERNAL);
        }
    };

    let result = rt.block_on(async {
        match cli.command {
            Commands::Run(args) => commands::execute_run_command(&args, &config).await,
            Commands::Config { json } => commands::execute_config_command(json, &config),
            Commands::Defaults => commands::execute_defaults_command(&config).await,
            Commands::Session { id, json } => {
                commands::execute_session_command(&id, json, &config).await
            }
        }
    });

    match result {
        Ok(code) if code == ExitCode::SUCCESS => Ok(()),
        Ok(code) => Err(code),
        Err(err) => {
            let (report, code) = report_error(&err);
            eprint!("{report}");
            Err(code)
        }
    }
}

/// Render an error for the terminal and pick its exit code.
///
/// Commands wrap typed failures in [`DeckflowError`]; the first one found in
/// the context chain gets the full report. Anything else is an internal
/// failure.
pub(crate) fn report_error(err: &anyhow::Error) -> (String, ExitCode) {
    match err.chain().find_map(|cause| cause.downcast_ref::<DeckflowError>()) {
        Some(typed) => {
            if err.chain().count() > 1 {
                warn!(error = %format!("{err:#}"), "Command failed");
            }
            (typed.display_for_user(), typed.to_exit_code())
        }
        None => (format!("Error: {err:#}\n"), ExitCode::INTERNAL),
    }
}
