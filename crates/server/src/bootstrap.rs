use std::sync::Arc;

use axum::Router;
use spi_advisor::{generator_from_config, oracle_from_config};
use spi_core::config::{AppConfig, ConfigError, LoadOptions};
use spi_core::{PriceQueryRuntime, SuggestionAdvisor, TieredPricingEngine};
use spi_db::{connect_from_config, migrations, DbPool, SqlCatalogRepository};
use thiserror::Error;
use tracing::info;

use crate::api::{self, ApiState};
use crate::health;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub api_state: ApiState,
}

impl Application {
    pub fn router(&self) -> Router {
        api::router(self.api_state.clone()).merge(health::router(self.db_pool.clone()))
    }
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("integration setup failed: {0}")]
    Integration(String),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let db_pool =
        connect_from_config(&config.database).await.map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let oracle = oracle_from_config(&config.search)
        .map_err(|error| BootstrapError::Integration(format!("{error:#}")))?;
    let generator = generator_from_config(&config.llm)
        .map_err(|error| BootstrapError::Integration(format!("{error:#}")))?;
    info!(
        event_name = "system.bootstrap.collaborators_ready",
        correlation_id = "bootstrap",
        web_search = config.search.enabled,
        llm = config.llm.enabled,
        "outbound collaborators configured"
    );

    let runtime = PriceQueryRuntime::new(
        Arc::new(SqlCatalogRepository::new(db_pool.clone())),
        TieredPricingEngine::new(config.pricing.clone()),
        oracle,
        config.search.timeout(),
    );
    let api_state = ApiState {
        runtime: Arc::new(runtime),
        advisor: SuggestionAdvisor::new(generator, config.llm.timeout()),
        filter_platform: config.catalog.filter_platform,
    };

    Ok(Application { config, db_pool, api_state })
}
