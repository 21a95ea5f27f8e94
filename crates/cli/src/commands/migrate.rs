use budgetflow_db::{connect_with_config, migrations};
use serde_json::json;

use crate::commands::context::prepare;
use crate::commands::CommandResult;

pub fn run() -> CommandResult {
    let (config, runtime) = match prepare("migrate") {
        Ok(prepared) => prepared,
        Err(failure) => return failure,
    };

    runtime.block_on(async {
        let pool = match connect_with_config(&config.database).await {
            Ok(pool) => pool,
            Err(error) => {
                return CommandResult::failure("migrate", "db_connectivity", error.to_string(), 4);
            }
        };

        let report = async {
            let before = migrations::applied_migrations(&pool).await?;
            migrations::run_pending(&pool).await?;
            let after = migrations::applied_migrations(&pool).await?;
            Ok::<_, migrations::MigrateError>((before, after))
        }
        .await;
        pool.close().await;

        let (before, after) = match report {
            Ok(versions) => versions,
            Err(error) => {
                return CommandResult::failure("migrate", "migration", error.to_string(), 5);
            }
        };

        let newly_applied: Vec<i64> = after
            .iter()
            .map(|migration| migration.version)
            .filter(|version| !before.iter().any(|known| known.version == *version))
            .collect();
        let applied: Vec<_> = after
            .iter()
            .map(|migration| {
                json!({ "version": migration.version, "description": migration.description })
            })
            .collect();

        let message = match newly_applied.len() {
            0 => format!("schema up to date at {} migration(s)", after.len()),
            count => format!("applied {count} budgetflow migration(s)"),
        };
        CommandResult::success_with_data(
            "migrate",
            message,
            Some(json!({ "applied": applied, "newly_applied": newly_applied })),
        )
    })
}
