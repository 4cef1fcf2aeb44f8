use std::{
    borrow::Cow,
    env::{self, VarError},
    io::{self, Write},
};

use miette::{miette, Context, IntoDiagnostic, Result};
use sqlx::PgConnection;
use warden_configuration::Configuration;
use warden_database::PermissionSchema;
use warden_migrations::{connect_to_database, MigrationManager};

use crate::cli::ConnectionArguments;

pub(crate) mod down;
pub(crate) mod initialize;
pub(crate) mod status;
pub(crate) mod up;


pub(crate) fn get_database_url_with_env_fallback<'a, S>(
    optional_database_url: Option<&'a S>,
    fallback_environment_variable_name: &str,
) -> Result<Option<Cow<'a, str>>>
where
    S: AsRef<str>,
{
    if let Some(database_url_override) = optional_database_url {
        return Ok(Some(Cow::from(database_url_override.as_ref())));
    }

    match env::var(fallback_environment_variable_name) {
        Ok(database_url_from_env) => Ok(Some(Cow::from(database_url_from_env))),
        Err(error) => match error {
            VarError::NotPresent => Ok(None),
            VarError::NotUnicode(_) => Err(miette!(
                "the {} environment variable is not valid Unicode",
                fallback_environment_variable_name
            )),
        },
    }
}


/// A database connection and the migration manager for the configured schema.
pub(crate) struct MigrationContext {
    pub(crate) database_connection: PgConnection,

    pub(crate) manager: MigrationManager,
}

pub(crate) async fn prepare_migration_context(
    arguments: &ConnectionArguments,
) -> Result<MigrationContext> {
    let configuration = match arguments.configuration_file_path.as_ref() {
        Some(configuration_file_path) => Configuration::load_from_path(configuration_file_path),
        None => Configuration::load_from_default_path(),
    }
    .into_diagnostic()
    .wrap_err("failed to load configuration")?;

    let manager = MigrationManager::new(&PermissionSchema::new(
        configuration.authorization.schema_names.clone(),
        configuration.authorization.team_mode,
    ));


    let database_url =
        get_database_url_with_env_fallback(arguments.database_url.as_ref(), "DATABASE_URL")?
            .unwrap_or_else(|| Cow::from(configuration.database.connection_url()));

    print!("Connecting to the PostgreSQL database...");
    flush_stdout()?;

    let database_connection = connect_to_database(database_url.as_ref())
        .await
        .into_diagnostic()
        .wrap_err("unable to connect to database")?;

    println!("  [Connected!]");


    Ok(MigrationContext {
        database_connection,
        manager,
    })
}


pub(crate) fn flush_stdout() -> Result<()> {
    io::stdout()
        .flush()
        .into_diagnostic()
        .wrap_err("failed to flush terminal output")
}


/// Asks a y/N question, failing unless the user answers with "y".
pub(crate) fn confirm_or_abort(prompt: &str) -> Result<()> {
    print!("{} [y/N] ", prompt);
    flush_stdout()?;

    let mut user_response = String::new();
    io::stdin()
        .read_line(&mut user_response)
        .into_diagnostic()
        .wrap_err("failed to read user terminal input")?;

    if user_response.trim_end().to_ascii_lowercase() != "y" {
        return Err(miette!("User aborted command."));
    }

    Ok(())
}
