use miette::{Context, IntoDiagnostic, Result};
use sqlx::Connection;

use super::{flush_stdout, prepare_migration_context};
use crate::cli::InitializeCommandArguments;


pub fn cli_initialize(arguments: InitializeCommandArguments) -> Result<()> {
    let async_runtime = tokio::runtime::Runtime::new()
        .into_diagnostic()
        .wrap_err("failed to initialize tokio async runtime")?;

    async_runtime
        .block_on(cli_initialize_inner(arguments))
        .wrap_err("failed to run root async task to completion")
}

async fn cli_initialize_inner(arguments: InitializeCommandArguments) -> Result<()> {
    let mut context = prepare_migration_context(&arguments.connection).await?;


    print!("Setting up migration table if missing...");
    flush_stdout()?;

    context
        .manager
        .initialize_migration_tracking_in_database(&mut context.database_connection)
        .await
        .into_diagnostic()
        .wrap_err("failed to initialize migration table in database")?;

    println!("  [Done!]");


    context
        .database_connection
        .close()
        .await
        .into_diagnostic()
        .wrap_err("failed to close the database connection")?;

    Ok(())
}
