use std::future::Future;
use std::sync::Arc;

use budgetflow_core::config::{AppConfig, LoadOptions};
use budgetflow_core::errors::CoordinatorError;
use budgetflow_core::lifecycle::{LifecycleCoordinator, TracingViewRefresher};
use budgetflow_core::notification::TracingNotifier;
use budgetflow_core::workflow::WorkflowEngine;
use budgetflow_db::{connect_with_config, SqlRecordStore};
use serde::Serialize;
use serde_json::{json, Value};
use tokio::runtime::Runtime;

use crate::commands::CommandResult;

pub(crate) type CliCoordinator = LifecycleCoordinator<SqlRecordStore, TracingViewRefresher>;

pub(crate) struct Completed {
    pub message: String,
    pub data: Value,
}

impl Completed {
    pub fn new(message: impl Into<String>, data: &impl Serialize) -> Self {
        let data = serde_json::to_value(data)
            .unwrap_or_else(|error| json!({ "serialization_error": error.to_string() }));
        Self { message: message.into(), data }
    }
}

/// Loads config, opens the database and hands a coordinator to `operation`.
///
/// Notifications from the CLI are logged only; delivery belongs to the server.
pub(crate) fn run_workflow<F, Fut>(command: &str, operation: F) -> CommandResult
where
    F: FnOnce(CliCoordinator) -> Fut,
    Fut: Future<Output = Result<Completed, CoordinatorError>>,
{
    let (config, runtime) = match prepare(command) {
        Ok(prepared) => prepared,
        Err(failure) => return failure,
    };

    runtime.block_on(async {
        let pool = match connect_with_config(&config.database).await {
            Ok(pool) => pool,
            Err(error) => {
                return CommandResult::failure(command, "db_connectivity", error.to_string(), 4);
            }
        };

        let coordinator = LifecycleCoordinator::new(
            SqlRecordStore::new(pool.clone()),
            TracingViewRefresher,
            Arc::new(TracingNotifier),
            WorkflowEngine::new(config.office_policy()),
        );
        let outcome = operation(coordinator).await;
        pool.close().await;

        match outcome {
            Ok(completed) => {
                CommandResult::success_with_data(command, completed.message, Some(completed.data))
            }
            Err(error) => coordinator_failure(command, &error),
        }
    })
}

/// Loads config and builds the single-threaded runtime every command runs on.
pub(crate) fn prepare(command: &str) -> Result<(AppConfig, Runtime), CommandResult> {
    let config = AppConfig::load(LoadOptions::default()).map_err(|error| {
        CommandResult::failure(
            command,
            "config_validation",
            format!("configuration issue: {error}"),
            2,
        )
    })?;
    let runtime =
        tokio::runtime::Builder::new_current_thread().enable_all().build().map_err(|error| {
            CommandResult::failure(
                command,
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            )
        })?;
    Ok((config, runtime))
}

fn coordinator_failure(command: &str, error: &CoordinatorError) -> CommandResult {
    let (error_class, exit_code) = match error {
        CoordinatorError::Persistence(_) => ("persistence", 4),
        CoordinatorError::NotFound(_) => ("not_found", 6),
        CoordinatorError::Forbidden { .. } => ("forbidden", 6),
        CoordinatorError::InvalidState { .. } => ("invalid_state", 6),
        CoordinatorError::ConcurrentModification { .. } => ("conflict", 6),
        CoordinatorError::Validation(_) => ("validation", 2),
    };
    CommandResult::failure(command, error_class, error.to_string(), exit_code)
}
