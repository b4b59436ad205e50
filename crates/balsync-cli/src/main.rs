//! balsync CLI - Command-line interface for balsync
//!
//! Provides commands for:
//! - Managing Bases Adresses Locales (create, demo, habilitation, delete)
//! - Publishing to and reconciling with the deposit service
//! - Pausing and resuming automatic synchronization
//! - Running the periodic scheduler
//! - Viewing and validating configuration

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use balsync_core::config::{Config, LoggingConfig};

mod commands;
mod mailer;
mod output;

use commands::{
    bal::BalCommand,
    config::ConfigCommand,
    run::RunCommand,
    status::StatusCommand,
    sync::{PauseCommand, ResumeCommand, SyncCommand},
    voie::VoieCommand,
};
use output::OutputFormat;

#[derive(Debug, Parser)]
#[command(
    name = "balsync",
    version,
    about = "Bases Adresses Locales publication and synchronization"
)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use alternate config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Manage Bases Adresses Locales
    #[command(subcommand)]
    Bal(BalCommand),
    /// Manage voies
    #[command(subcommand)]
    Voie(VoieCommand),
    /// Publish a dataset or bring it in line with the deposit service
    Sync(SyncCommand),
    /// Pause automatic synchronization of a dataset
    Pause(PauseCommand),
    /// Resume automatic synchronization of a dataset
    Resume(ResumeCommand),
    /// Show synchronization status
    Status(StatusCommand),
    /// Run the periodic synchronization scheduler
    Run(RunCommand),
    /// View and validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Path of the configuration file in use
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(Config::default_path)
    }
}

/// Picks the log filter: `RUST_LOG`, then `-v`, then the configured level
fn env_filter(verbose: u8, logging: &LoggingConfig) -> EnvFilter {
    let level = match verbose {
        0 => logging.level.as_str(),
        1 => "debug",
        _ => "trace",
    };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config_path();
    let logging = Config::load_or_default(&config_path).logging;

    let filter = env_filter(cli.verbose, &logging);
    if logging.format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    }

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Human
    };

    let result = match cli.command {
        Commands::Bal(cmd) => cmd.execute(&config_path, format).await,
        Commands::Voie(cmd) => cmd.execute(&config_path, format).await,
        Commands::Sync(cmd) => cmd.execute(&config_path, format).await,
        Commands::Pause(cmd) => cmd.execute(&config_path, format).await,
        Commands::Resume(cmd) => cmd.execute(&config_path, format).await,
        Commands::Status(cmd) => cmd.execute(&config_path, format).await,
        Commands::Run(cmd) => cmd.execute(&config_path, format).await,
        Commands::Config(cmd) => cmd.execute(&config_path, format).await,
    };

    if let Err(e) = result {
        output::get_formatter(cli.json).error(&format!("{e:#}"));
        std::process::exit(commands::exit_code(&e));
    }
    Ok(())
}
