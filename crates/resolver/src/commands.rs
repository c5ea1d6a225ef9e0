//! Subcommand implementations

use crate::cli::OutputFormat;
use anyhow::{bail, Context, Result};
use chrono::Local;
use config::{
    ConfigLoader, ConfigValidator, Environment, ResolutionState, Resolved, ValidationReport, CONSUMED_VARIABLES,
};
use std::io::Write;
use std::path::Path;
use tracing::info;
use types::PREVIEW_VALUE;

/// Print the resolved configuration
pub fn show(resolved: &Resolved, format: OutputFormat, reveal_secrets: bool, out: &mut impl Write) -> Result<()> {
    let config = if reveal_secrets {
        resolved.config.clone()
    } else {
        resolved.config.redacted()
    };

    let rendered = match format {
        OutputFormat::Yaml => config.to_yaml(),
        OutputFormat::Json => config.to_json(),
    }
    .context("Failed to render configuration")?;

    writeln!(out, "{}", rendered.trim_end())?;
    Ok(())
}

/// Print a validation report and return it
pub fn check<E: Environment + ?Sized>(resolved: &Resolved, env: &E, out: &mut impl Write) -> Result<ValidationReport> {
    match &resolved.state {
        ResolutionState::DefaultsLoaded => writeln!(out, "Source: built-in defaults")?,
        ResolutionState::OverridesMerged { source, keys } => {
            writeln!(out, "Source: {} ({} keys)", source.display(), keys.len())?;
            for key in keys {
                writeln!(out, "  override {}", key)?;
            }
        }
    }

    let unset: Vec<&str> = CONSUMED_VARIABLES
        .iter()
        .copied()
        .filter(|name| env.var(name).map_or(true, |value| value.is_empty()))
        .collect();
    if !unset.is_empty() {
        writeln!(out, "Unset variables: {}", unset.join(", "))?;
    }

    writeln!(out, "Database: {}", resolved.database.redacted_uri())?;
    writeln!(out, "Examples: {}", resolved.examples.redacted_uri())?;
    writeln!(
        out,
        "Feature flags: {}",
        resolved.config.feature_flags.enabled().join(", ")
    )?;
    writeln!(out, "Numbers: {}", resolved.config.d3_format.preview())?;
    writeln!(
        out,
        "Currency: {}",
        resolved.config.d3_format.format_currency(Some(PREVIEW_VALUE), 2)
    )?;
    writeln!(
        out,
        "Dates: {}",
        resolved.config.d3_time_format.format(&Local::now().naive_local(), "%c")
    )?;

    let report = ConfigValidator::validate(resolved);
    for issue in &report.errors {
        writeln!(out, "error   {}: {}", issue.field, issue.message)?;
    }
    for issue in &report.warnings {
        writeln!(out, "warning {}: {}", issue.field, issue.message)?;
    }
    if report.is_valid() && !report.has_warnings() {
        writeln!(out, "No issues found")?;
    }
    writeln!(out, "{}", report.summary())?;

    Ok(report)
}

/// Write an override file pre-filled with the defaults
pub fn example(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists; pass --force to replace it", path.display());
    }
    ConfigLoader::create_example(path)?;
    info!("Wrote example configuration to {}", path.display());
    Ok(())
}
