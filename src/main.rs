//! enerplan - Multi-agent planning assistant for urban energy workflows.

use clap::Parser;
use std::process::ExitCode;

use enerplan::cli::Commands;
use enerplan::config::load_settings;
use enerplan::logging;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Commands::parse();

    let settings = match load_settings(args.config.as_ref()) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Failed to load settings: {}", e);
            return ExitCode::FAILURE;
        }
    };

    // The guard flushes the file appender on drop; keep it alive for the
    // whole run.
    let _guard = match logging::init(settings.log_dir.as_ref()) {
        Ok((guard, _)) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match args.run(settings).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
