//! Command-line interface definitions for the administration binary.

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};
use warden_core::{id::TeamId, subject::Subject};


#[derive(Parser)]
#[command(
    name = "warden",
    author,
    about = "Administration CLI for the warden role-based access control service.",
    version
)]
pub struct CliArgs {
    /// This is the path to the configuration file to use.
    /// If unspecified, this defaults to `./data/configuration.toml`.
    #[arg(
        short = 'c',
        long = "configuration-file-path",
        global = true,
        help = "Path to the configuration file to use. Defaults to ./data/configuration.toml"
    )]
    pub configuration_file_path: Option<PathBuf>,

    #[arg(
        long = "in-memory",
        global = true,
        action = ArgAction::SetTrue,
        help = "Use the in-memory storage backend instead of PostgreSQL. \
                Nothing is persisted between invocations."
    )]
    pub in_memory: bool,

    #[arg(
        long = "apply-pending-migrations",
        global = true,
        action = ArgAction::SetTrue,
        conflicts_with = "in_memory",
        help = "On startup, apply any pending database migrations."
    )]
    pub apply_pending_migrations: bool,

    #[command(subcommand)]
    pub command: CliCommand,
}



#[derive(Subcommand)]
pub enum CliCommand {
    #[command(
        name = "seed",
        about = "Ensures the built-in roles (admin, manager) exist under the default guard."
    )]
    Seed(SeedCommandArguments),

    #[command(name = "create-permission", about = "Creates a new permission.")]
    CreatePermission(CreatePermissionCommandArguments),

    #[command(name = "create-role", about = "Creates a new role.")]
    CreateRole(CreateRoleCommandArguments),

    #[command(
        name = "grant-permission",
        about = "Grants a permission to a role. Both must belong to the same guard."
    )]
    GrantPermission(GrantPermissionCommandArguments),

    #[command(name = "assign-role", about = "Assigns a role to a subject.")]
    AssignRole(AssignRoleCommandArguments),

    #[command(
        name = "assign-permission",
        about = "Assigns a permission directly to a subject."
    )]
    AssignPermission(AssignPermissionCommandArguments),

    #[command(
        name = "check-permission",
        about = "Checks whether a subject holds a permission, directly or through its roles."
    )]
    CheckPermission(CheckPermissionCommandArguments),

    #[command(name = "check-role", about = "Checks whether a subject holds a role.")]
    CheckRole(CheckRoleCommandArguments),
}


/// Guard and team options shared by most subcommands.
#[derive(Args)]
pub struct ScopeArguments {
    #[arg(
        long = "guard",
        short = 'g',
        help = "Guard to operate in. Defaults to the default_guard from the configuration file."
    )]
    pub guard: Option<String>,

    #[arg(
        long = "team",
        short = 't',
        help = "Team to operate in. Required if team scoping is enabled, rejected otherwise."
    )]
    pub team: Option<TeamId>,
}


#[derive(Args)]
pub struct SeedCommandArguments {
    #[arg(
        long = "team",
        short = 't',
        help = "Team to seed the roles into. Required if team scoping is enabled, rejected otherwise."
    )]
    pub team: Option<TeamId>,
}


#[derive(Args)]
pub struct CreatePermissionCommandArguments {
    #[arg(help = "Name of the new permission, e.g. \"edit-content\".")]
    pub name: String,

    #[arg(
        long = "guard",
        short = 'g',
        help = "Guard of the new permission. Defaults to the default_guard from the configuration file."
    )]
    pub guard: Option<String>,
}


#[derive(Args)]
pub struct CreateRoleCommandArguments {
    #[arg(help = "Name of the new role, e.g. \"editor\".")]
    pub name: String,

    #[command(flatten)]
    pub scope: ScopeArguments,
}


#[derive(Args)]
pub struct GrantPermissionCommandArguments {
    #[arg(long = "role", short = 'r', help = "Name of the role to grant the permission to.")]
    pub role: String,

    #[arg(long = "permission", short = 'p', help = "Name of the permission to grant.")]
    pub permission: String,

    #[command(flatten)]
    pub scope: ScopeArguments,
}


#[derive(Args)]
pub struct AssignRoleCommandArguments {
    #[arg(help = "Subject to assign the role to, in the form <type>:<id> (e.g. User:7).")]
    pub subject: Subject,

    #[arg(long = "role", short = 'r', help = "Name of the role to assign.")]
    pub role: String,

    #[command(flatten)]
    pub scope: ScopeArguments,
}


#[derive(Args)]
pub struct AssignPermissionCommandArguments {
    #[arg(help = "Subject to assign the permission to, in the form <type>:<id> (e.g. User:7).")]
    pub subject: Subject,

    #[arg(long = "permission", short = 'p', help = "Name of the permission to assign.")]
    pub permission: String,

    #[command(flatten)]
    pub scope: ScopeArguments,
}


#[derive(Args)]
pub struct CheckPermissionCommandArguments {
    #[arg(help = "Subject to check, in the form <type>:<id> (e.g. User:7).")]
    pub subject: Subject,

    #[arg(long = "permission", short = 'p', help = "Name of the permission to check for.")]
    pub permission: String,

    #[command(flatten)]
    pub scope: ScopeArguments,
}


#[derive(Args)]
pub struct CheckRoleCommandArguments {
    #[arg(help = "Subject to check, in the form <type>:<id> (e.g. User:7).")]
    pub subject: Subject,

    #[arg(long = "role", short = 'r', help = "Name of the role to check for.")]
    pub role: String,

    #[command(flatten)]
    pub scope: ScopeArguments,
}


#[cfg(test)]
mod test {
    use clap::Parser;

    use super::*;

    #[test]
    fn migrations_cannot_be_requested_for_in_memory_storage() {
        let parse_result = CliArgs::try_parse_from([
            "warden",
            "--in-memory",
            "--apply-pending-migrations",
            "seed",
        ]);

        let error = match parse_result {
            Ok(_) => panic!("--in-memory and --apply-pending-migrations were accepted together"),
            Err(error) => error,
        };
        assert_eq!(error.kind(), clap::error::ErrorKind::ArgumentConflict);

        let with_postgres =
            CliArgs::try_parse_from(["warden", "--apply-pending-migrations", "seed"]).unwrap();
        assert!(with_postgres.apply_pending_migrations);
        assert!(!with_postgres.in_memory);

        let in_memory = CliArgs::try_parse_from(["warden", "--in-memory", "seed"]).unwrap();
        assert!(in_memory.in_memory);
        assert!(matches!(in_memory.command, CliCommand::Seed(_)));
    }
}
