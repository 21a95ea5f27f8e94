use std::sync::Arc;

use budgetflow_core::config::{AppConfig, ConfigError};
use budgetflow_core::lifecycle::{LifecycleCoordinator, TracingViewRefresher};
use budgetflow_core::notification::{Notifier, TracingNotifier};
use budgetflow_core::workflow::WorkflowEngine;
use budgetflow_db::{connect_with_config, migrations, DbPool, SqlRecordStore};
use thiserror::Error;
use tracing::info;

use crate::notifier::HttpNotifier;

pub type ServerCoordinator = LifecycleCoordinator<SqlRecordStore, TracingViewRefresher>;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub coordinator: Arc<ServerCoordinator>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("notification client could not be built: {0}")]
    Notifier(#[source] reqwest::Error),
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let db_pool =
        connect_with_config(&config.database).await.map_err(BootstrapError::DatabaseConnect)?;
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

    let notifier = build_notifier(&config)?;
    let coordinator = LifecycleCoordinator::new(
        SqlRecordStore::new(db_pool.clone()),
        TracingViewRefresher,
        notifier,
        WorkflowEngine::new(config.office_policy()),
    );

    Ok(Application { config, db_pool, coordinator: Arc::new(coordinator) })
}

fn build_notifier(config: &AppConfig) -> Result<Arc<dyn Notifier>, BootstrapError> {
    if config.notification.enabled {
        if let Some(http) =
            HttpNotifier::from_config(&config.notification).map_err(BootstrapError::Notifier)?
        {
            info!(
                event_name = "system.bootstrap.notifier",
                correlation_id = "bootstrap",
                transport = "http",
                "notifications are delivered over http"
            );
            return Ok(Arc::new(http));
        }
    }

    info!(
        event_name = "system.bootstrap.notifier",
        correlation_id = "bootstrap",
        transport = "log",
        "notifications are written to the log only"
    );
    Ok(Arc::new(TracingNotifier))
}
