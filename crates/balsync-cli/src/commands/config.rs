//! Config command - View and validate balsync configuration
//!
//! `show` prints the effective configuration (defaults when the file is
//! missing). `validate` parses the file and reports every invalid field.

use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::Subcommand;
use tracing::info;

use balsync_core::config::Config;

use crate::output::{get_formatter, OutputFormat};

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display current configuration
    Show,
    /// Validate configuration file
    Validate,
}

impl ConfigCommand {
    pub async fn execute(&self, config_path: &Path, format: OutputFormat) -> Result<()> {
        match self {
            ConfigCommand::Show => execute_show(config_path, format),
            ConfigCommand::Validate => execute_validate(config_path, format),
        }
    }
}

fn execute_show(config_path: &Path, format: OutputFormat) -> Result<()> {
    let formatter = get_formatter(format.is_json());
    let config = Config::load_or_default(config_path);

    info!(config_path = %config_path.display(), "Showing configuration");

    if format.is_json() {
        let json =
            serde_json::to_value(&config).context("Failed to serialize configuration to JSON")?;
        formatter.print_json(&json);
        return Ok(());
    }

    formatter.success(&format!("Configuration ({})", config_path.display()));
    formatter.info("");
    let yaml =
        serde_yaml::to_string(&config).context("Failed to serialize configuration to YAML")?;
    for line in yaml.lines() {
        formatter.info(line);
    }
    Ok(())
}

fn execute_validate(config_path: &Path, format: OutputFormat) -> Result<()> {
    let formatter = get_formatter(format.is_json());

    if !config_path.exists() {
        bail!("Configuration file not found: {}", config_path.display());
    }
    let config = Config::load(config_path)
        .with_context(|| format!("Failed to parse {}", config_path.display()))?;
    let errors: Vec<String> = config.validate().iter().map(ToString::to_string).collect();

    if format.is_json() {
        formatter.print_json(&serde_json::json!({
            "valid": errors.is_empty(),
            "path": config_path.display().to_string(),
            "errors": errors,
        }));
    } else if errors.is_empty() {
        formatter.success(&format!("Configuration valid ({})", config_path.display()));
    } else {
        for error in &errors {
            formatter.warn(error);
        }
    }

    if !errors.is_empty() {
        bail!("{} invalid field(s)", errors.len());
    }
    Ok(())
}
