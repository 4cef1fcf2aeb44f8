use miette::{miette, Context, IntoDiagnostic, Result};

use super::{confirm_or_abort, prepare_migration_context};
use crate::cli::DownCommandArguments;

pub fn cli_down(arguments: DownCommandArguments) -> Result<()> {
    let async_runtime = tokio::runtime::Runtime::new()
        .into_diagnostic()
        .wrap_err("failed to initialize tokio async runtime")?;

    async_runtime
        .block_on(cli_down_inner(arguments))
        .wrap_err("failed to run root async task to completion")
}


async fn cli_down_inner(arguments: DownCommandArguments) -> Result<()> {
    if arguments.rollback_to_version < 0 {
        return Err(miette!("the rollback version must not be negative"));
    }

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

    let migrations_to_roll_back = migrations
        .iter()
        .rev()
        .filter(|migration| !migration.is_pending())
        .filter(|migration| migration.identifier().version > arguments.rollback_to_version)
        .collect::<Vec<_>>();

    if migrations_to_roll_back.is_empty() {
        println!("No migrations to roll back: already at (or before) specified target version.");
        return Ok(());
    }

    if let Some(irreversible_migration) = migrations_to_roll_back
        .iter()
        .find(|migration| !migration.has_rollback_script())
    {
        return Err(miette!(
            "migration {} cannot be rolled back: it has no rollback script",
            irreversible_migration.identifier()
        ));
    }


    println!(
        "Found {} migrations to roll back to reach version {}:",
        migrations_to_roll_back.len(),
        arguments.rollback_to_version
    );
    for migration_to_roll_back in &migrations_to_roll_back {
        println!("  {}", migration_to_roll_back.identifier());
    }
    println!();

    if !arguments.assume_yes {
        confirm_or_abort(
            "Are you sure you want to continue? The migrations above will be rolled back \
            and the tables they created will be dropped, including all of their data.",
        )?;
        println!();
    }


    let rolled_back_migrations = context
        .manager
        .rollback_to(
            &mut context.database_connection,
            arguments.rollback_to_version,
        )
        .await
        .into_diagnostic()
        .wrap_err("failed to roll back migrations")?;

    for rolled_back_migration in &rolled_back_migrations {
        println!("Rolled back migration {}.", rolled_back_migration);
    }

    println!();
    println!(
        "All {} requested migrations rolled back, database schema is now at version {}.",
        rolled_back_migrations.len(),
        arguments.rollback_to_version
    );

    Ok(())
}
