//! Deployment configuration resolver - command line entry point

use anyhow::{Context, Result};
use clap::Parser;
use config::{ConfigLoader, ProcessEnv, SEARCH_PATH_ENV};
use std::env;
use std::process::ExitCode;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod commands;

use cli::{Cli, Command, LogFormat};

fn main() -> Result<ExitCode> {
    // Load .env before parsing so LOG_FORMAT and the connection variables can come from it
    let dotenv_result = dotenv::dotenv();

    let cli = Cli::parse();
    init_logging(cli.log_format)?;

    match dotenv_result {
        Ok(path) => info!("Loaded environment variables from {}", path.display()),
        Err(e) if e.not_found() => {}
        Err(e) => warn!("Could not load .env file: {}", e),
    }

    let loader = ConfigLoader::new(cli.search_path(env::var_os(SEARCH_PATH_ENV)));
    debug!(search_path = ?loader.search_path().dirs(), "Resolving configuration");

    let mut stdout = std::io::stdout().lock();
    match cli.command {
        Command::Show { format, reveal_secrets } => {
            let resolved = loader.resolve().context("Failed to resolve configuration")?;
            commands::show(&resolved, format, reveal_secrets, &mut stdout)?;
        }
        Command::Check => {
            let resolved = loader.resolve().context("Failed to resolve configuration")?;
            let report = commands::check(&resolved, &ProcessEnv, &mut stdout)?;
            match report.into_result() {
                Ok(warnings) => info!("Configuration is valid with {} warnings", warnings.len()),
                Err(e) => {
                    error!("{}", e);
                    return Ok(ExitCode::FAILURE);
                }
            }
        }
        Command::Example { path, force } => {
            commands::example(&path, force)?;
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// Initialize logging; output goes to stderr so stdout stays machine readable
fn init_logging(format: LogFormat) -> Result<()> {
    let log_level = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level));

    let registry = tracing_subscriber::registry().with(env_filter);

    match format {
        LogFormat::Pretty => {
            registry
                .with(tracing_subscriber::fmt::layer().pretty().with_writer(std::io::stderr))
                .try_init()
                .context("Failed to initialize pretty logging")?;
        }
        LogFormat::Json => {
            registry
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .try_init()
                .context("Failed to initialize JSON logging")?;
        }
    }

    debug!("Logging initialized at level {}", log_level);
    Ok(())
}
