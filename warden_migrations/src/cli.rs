use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "warden_migrations",
    author,
    about = "Warden permission table migrations CLI.",
    version
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: CliCommand,
}



#[derive(Subcommand)]
pub enum CliCommand {
    #[command(
        name = "initialize",
        about = "Prepares the database for migrations by creating the migration tracking table."
    )]
    Initialize(InitializeCommandArguments),

    #[command(
        name = "status",
        about = "Displays all embedded migrations and whether they have been applied."
    )]
    Status(StatusCommandArguments),

    #[command(
        name = "up",
        about = "Applies pending migrations to upgrade the database to the specified schema version."
    )]
    Up(UpCommandArguments),

    #[command(
        name = "down",
        about = "Rolls back applied migrations to revert the database to the specified schema version. \
                Note that in general, this is a destructive action."
    )]
    Down(DownCommandArguments),
}


/// Options shared by every subcommand.
#[derive(Args)]
pub struct ConnectionArguments {
    #[arg(
        long = "configuration-file-path",
        short = 'c',
        help = "Path to the configuration file. The table names, column names and team mode \
                in its [authorization] table determine the generated migration scripts. \
                Defaults to \"./data/configuration.toml\"."
    )]
    pub configuration_file_path: Option<PathBuf>,

    #[arg(
        long = "database-url",
        short = 'd',
        help = "URL of the PostgreSQL database to use. If unspecified, we'll attempt to use \
                the DATABASE_URL environment variable. If neither this option nor DATABASE_URL are available, \
                the [database] table of the configuration file is used."
    )]
    pub database_url: Option<String>,
}


#[derive(Args)]
pub struct InitializeCommandArguments {
    #[command(flatten)]
    pub connection: ConnectionArguments,
}


#[derive(Args)]
pub struct StatusCommandArguments {
    #[command(flatten)]
    pub connection: ConnectionArguments,
}


#[derive(Args)]
pub struct UpCommandArguments {
    #[command(flatten)]
    pub connection: ConnectionArguments,

    #[arg(
        long = "migrate-to-version",
        short = 'v',
        help = "Specifies the version of the database to migrate to. The version should match a defined migration \
                and must be greater than the currently applied version. If unspecified, it defaults to the newest version."
    )]
    pub migrate_to_version: Option<i64>,

    #[arg(
        long = "yes",
        short = 'y',
        action = ArgAction::SetTrue,
        help = "Skips the confirmation prompt."
    )]
    pub assume_yes: bool,
}


#[derive(Args)]
pub struct DownCommandArguments {
    #[command(flatten)]
    pub connection: ConnectionArguments,

    #[arg(
        long = "rollback-to-version",
        short = 'v',
        help = "Specifies the version of the database to rollback to. The version should match a defined migration \
                and must be smaller than the currently applied version. If you want to perform a rollback all the \
                way to the beginning, set this to 0."
    )]
    pub rollback_to_version: i64,

    #[arg(
        long = "yes",
        short = 'y',
        action = ArgAction::SetTrue,
        help = "Skips the confirmation prompt."
    )]
    pub assume_yes: bool,
}
