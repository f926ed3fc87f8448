// Standard library
use std::process::ExitCode;

// External crates
use clap::Parser;
use tracing::info;

// Internal imports
use snap_core::{snap_error, snap_error_hint, SnapError};
use snap_logging::{init_subscriber, LogSettings};

// Local modules
mod cli;
mod commands;

use cli::Args;
use commands::execute_command;

fn main() -> ExitCode {
    let args = Args::parse();

    let mut settings = LogSettings::from_env();
    if args.debug {
        settings = settings.with_level("debug");
    }
    // Held until exit so buffered file logs are flushed.
    let _log_guard = init_subscriber(&settings);

    if args.debug {
        info!("Starting snap command");
    }

    match execute_command(&args) {
        Ok(report) if report.outcome.is_success() => ExitCode::SUCCESS,
        Ok(_) => {
            snap_error!("Snapshot job for instance {} failed", args.instance_id);
            ExitCode::FAILURE
        }
        Err(e) => {
            snap_error!("{:#}", e);
            if let Some(hint) = hint_for(&e) {
                snap_error_hint!("{}", hint);
            }
            ExitCode::FAILURE
        }
    }
}

fn hint_for(error: &anyhow::Error) -> Option<String> {
    match error.downcast_ref::<SnapError>()? {
        SnapError::UnknownProvider(_) => Some(format!(
            "Supported providers: {}",
            commands::supported_providers().join(", ")
        )),
        SnapError::Config(_) => {
            Some("Check the configuration file or pass one with --config".to_string())
        }
        SnapError::Network(_) => {
            Some("Check network connectivity and the configured API URLs".to_string())
        }
        _ => None,
    }
}
