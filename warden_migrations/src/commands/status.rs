use miette::{Context, IntoDiagnostic, Result};
use warden_migrations::MigrationStatus;

use super::prepare_migration_context;
use crate::cli::StatusCommandArguments;


pub fn cli_status(arguments: StatusCommandArguments) -> Result<()> {
    let async_runtime = tokio::runtime::Runtime::new()
        .into_diagnostic()
        .wrap_err("failed to initialize tokio async runtime")?;

    async_runtime
        .block_on(cli_status_inner(arguments))
        .wrap_err("failed to run root async task to completion")
}

async fn cli_status_inner(arguments: StatusCommandArguments) -> Result<()> {
    let mut context = prepare_migration_context(&arguments.connection).await?;

    context
        .manager
        .initialize_migration_tracking_in_database(&mut context.database_connection)
        .await
        .into_diagnostic()
        .wrap_err("failed to initialize migration table in database")?;

    let migrations = context
        .manager
        .migrations_with_status(&mut context.database_connection)
        .await
        .into_diagnostic()
        .wrap_err("failed to load and validate migrations")?;

    println!();

    for migration in &migrations {
        match migration.status() {
            MigrationStatus::Pending => {
                println!("  {}  [pending]", migration.identifier());
            }
            MigrationStatus::Applied { at } => {
                println!(
                    "  {}  [applied at {}]",
                    migration.identifier(),
                    at.to_rfc3339()
                );
            }
        }
    }

    let pending_migration_count = migrations
        .iter()
        .filter(|migration| migration.is_pending())
        .count();

    println!();
    println!(
        "{} migrations in total, {} pending.",
        migrations.len(),
        pending_migration_count
    );

    Ok(())
}
