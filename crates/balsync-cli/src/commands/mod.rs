//! CLI command implementations
//!
//! Every command that touches datasets opens an [`AppContext`], which wires
//! the SQLite repository, the deposit client, the exporter and the mailer
//! into the use-case services.

pub mod bal;
pub mod config;
pub mod run;
pub mod status;
pub mod sync;
pub mod voie;

use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing::debug;

use balsync_cache::{DatabasePool, SqliteAddressRepository};
use balsync_core::config::Config;
use balsync_core::domain::DomainError;
use balsync_core::ports::{IAddressRepository, IExporter};
use balsync_core::usecases::{BaseLocaleService, ServiceError, VoieService};
use balsync_depot::{DepotClient, DepotDepositClient};
use balsync_export::CsvExporter;
use balsync_geo::GeoAdapter;
use balsync_sync::PublicationEngine;
use balsync_telemetry::MetricsRegistry;

use crate::mailer::LogMailer;

/// Services shared by the commands
pub struct AppContext {
    pub config: Config,
    pub repository: Arc<dyn IAddressRepository + Send + Sync>,
    pub metrics: Arc<MetricsRegistry>,
    pub engine: Arc<PublicationEngine>,
    pub exporter: Arc<dyn IExporter + Send + Sync>,
    pub base_locales: BaseLocaleService,
    pub voies: VoieService,
}

impl AppContext {
    /// Loads and validates the configuration, then opens the database
    ///
    /// A missing configuration file means defaults.
    pub async fn open(config_path: &Path) -> Result<Self> {
        let config = if config_path.exists() {
            Config::load(config_path)
                .with_context(|| format!("Failed to load {}", config_path.display()))?
        } else {
            Config::default()
        };

        let errors = config.validate();
        if !errors.is_empty() {
            let details: Vec<String> = errors.iter().map(ToString::to_string).collect();
            bail!("Invalid configuration: {}", details.join("; "));
        }

        Self::with_config(config).await
    }

    /// Builds the context from an already validated configuration
    pub async fn with_config(config: Config) -> Result<Self> {
        let pool = DatabasePool::new(&config.database.path)
            .await
            .context("Failed to open database")?;
        debug!(path = %config.database.path.display(), "Database opened");

        let repository: Arc<dyn IAddressRepository + Send + Sync> =
            Arc::new(SqliteAddressRepository::new(pool.pool().clone()));
        let depot = DepotDepositClient::new(DepotClient::with_base_url(
            config.depot.token.clone(),
            config.depot.url.as_str(),
        ));
        let exporter: Arc<dyn IExporter + Send + Sync> =
            Arc::new(CsvExporter::new(repository.clone()));
        let metrics = Arc::new(MetricsRegistry::new()?);

        let engine = PublicationEngine::new(
            repository.clone(),
            Arc::new(depot),
            exporter.clone(),
            Arc::new(LogMailer::new(&config.mail)),
        )
        .with_metrics(metrics.clone());

        Ok(Self {
            base_locales: BaseLocaleService::new(repository.clone()),
            voies: VoieService::new(repository.clone(), Arc::new(GeoAdapter::new())),
            engine: Arc::new(engine),
            exporter,
            metrics,
            repository,
            config,
        })
    }
}

/// Process exit code for a failed command
///
/// Use-case failures exit with their HTTP status class (4 for client
/// errors, 5 for server errors), anything else with 1.
pub fn exit_code(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<ServiceError>() {
        Some(e) => i32::from(e.http_status() / 100),
        None => 1,
    }
}

/// Parses an id argument
pub fn parse_id<T>(value: &str) -> Result<T>
where
    T: FromStr<Err = DomainError>,
{
    value
        .parse()
        .with_context(|| format!("Invalid identifier '{value}'"))
}

#[cfg(test)]
pub(crate) mod testing {
    use std::path::Path;

    use balsync_core::config::{Config, ConfigBuilder};

    use super::AppContext;

    /// Context on a fresh database under `dir`
    pub async fn context(dir: &Path) -> AppContext {
        let config: Config = ConfigBuilder::new()
            .database_path(dir.join("balsync.db"))
            .depot_url("http://127.0.0.1:9")
            .mail_enabled(false)
            .build();
        AppContext::with_config(config).await.unwrap()
    }
}
