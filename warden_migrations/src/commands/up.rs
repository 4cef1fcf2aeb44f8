use miette::{miette, Context, IntoDiagnostic, Result};

use super::{confirm_or_abort, prepare_migration_context};
use crate::cli::UpCommandArguments;


pub fn cli_up(arguments: UpCommandArguments) -> Result<()> {
    let async_runtime = tokio::runtime::Runtime::new()
        .into_diagnostic()
        .wrap_err("failed to initialize tokio async runtime")?;

    async_runtime
        .block_on(cli_up_inner(arguments))
        .wrap_err("failed to run root async task to completion")
}



async fn cli_up_inner(arguments: UpCommandArguments) -> Result<()> {
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

    let Some(newest_migration) = migrations.last() else {
        println!("No migrations to apply: no migrations available.");
        return Ok(());
    };

    let version_to_migrate_to = arguments
        .migrate_to_version
        .unwrap_or(newest_migration.identifier().version);

    if !migrations
        .iter()
        .any(|migration| migration.identifier().version == version_to_migrate_to)
    {
        return Err(miette!(
            "there is no migration with version {}",
            version_to_migrate_to
        ));
    }


    let migrations_to_apply = migrations
        .iter()
        .filter(|migration| migration.is_pending())
        .filter(|migration| migration.identifier().version <= version_to_migrate_to)
        .collect::<Vec<_>>();

    if migrations_to_apply.is_empty() {
        println!("No migrations to apply: already at (or past) specified target version.");
        return Ok(());
    }


    println!(
        "Found {} migrations to apply to reach version {}:",
        migrations_to_apply.len(),
        version_to_migrate_to
    );
    for migration_to_apply in &migrations_to_apply {
        println!("  {}", migration_to_apply.identifier());
    }
    println!();

    if !arguments.assume_yes {
        confirm_or_abort(
            "Are you sure you want to continue? The migrations above will be applied.",
        )?;
        println!();
    }


    let applied_migrations = context
        .manager
        .apply_pending(
            &mut context.database_connection,
            Some(version_to_migrate_to),
        )
        .await
        .into_diagnostic()
        .wrap_err("failed to apply migrations")?;

    for applied_migration in &applied_migrations {
        println!("Applied migration {}.", applied_migration);
    }

    println!();
    println!(
        "All {} requested migrations applied, database schema is now at version {}.",
        applied_migrations.len(),
        version_to_migrate_to
    );

    Ok(())
}
