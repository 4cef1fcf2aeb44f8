use clap::Parser;
use miette::{Context, IntoDiagnostic, Result};
use tracing::info;
use warden::{
    database::establish_database_connection_pool,
    logging::initialize_tracing,
    Authorization,
};
use warden_configuration::Configuration;

mod cli;
mod commands;

use crate::cli::CliArgs;
use crate::commands::run_command;



#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments.
    let arguments = CliArgs::parse();

    // Load configuration.
    let configuration = match arguments.configuration_file_path.as_ref() {
        Some(path) => Configuration::load_from_path(path),
        None => Configuration::load_from_default_path(),
    }
    .into_diagnostic()
    .wrap_err("Failed to load configuration file.")?;


    let guard = initialize_tracing(
        configuration.logging.console_output_level_filter(),
        configuration.logging.log_file_output_level_filter(),
        &configuration.logging.log_file_output_directory,
        "warden.log",
    )
    .wrap_err("Failed to initialize tracing.")?;

    info!(
        file_path = configuration
            .configuration_file_path
            .to_string_lossy()
            .as_ref(),
        "Configuration loaded."
    );


    let authorization = if arguments.in_memory {
        Authorization::in_memory(&configuration.authorization)
    } else {
        let database_pool = establish_database_connection_pool(&configuration.database)
            .await
            .into_diagnostic()
            .wrap_err("Failed to connect to the PostgreSQL database.")?;

        let authorization =
            Authorization::with_postgres(database_pool, &configuration.authorization);

        if arguments.apply_pending_migrations {
            authorization
                .apply_pending_migrations()
                .await
                .into_diagnostic()
                .wrap_err("Failed to apply pending migrations.")?;
        }

        authorization
    };

    info!(
        storage_backend = authorization.storage_backend_name(),
        team_mode = ?authorization.team_mode(),
        "Authorization service initialized."
    );


    run_command(&authorization, arguments.command).await?;


    drop(guard);

    Ok(())
}
