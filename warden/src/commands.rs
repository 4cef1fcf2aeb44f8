use miette::{Context, IntoDiagnostic, Result};
use warden::{seeder::seed_roles, Authorization};

use crate::cli::{
    AssignPermissionCommandArguments,
    AssignRoleCommandArguments,
    CheckPermissionCommandArguments,
    CheckRoleCommandArguments,
    CliCommand,
    CreatePermissionCommandArguments,
    CreateRoleCommandArguments,
    GrantPermissionCommandArguments,
    ScopeArguments,
    SeedCommandArguments,
};


fn guard_or_default<'a>(authorization: &'a Authorization, guard: &'a Option<String>) -> &'a str {
    guard
        .as_deref()
        .unwrap_or_else(|| authorization.default_guard())
}


pub(crate) async fn run_command(authorization: &Authorization, command: CliCommand) -> Result<()> {
    match command {
        CliCommand::Seed(arguments) => cli_seed(authorization, arguments).await,
        CliCommand::CreatePermission(arguments) => {
            cli_create_permission(authorization, arguments).await
        }
        CliCommand::CreateRole(arguments) => cli_create_role(authorization, arguments).await,
        CliCommand::GrantPermission(arguments) => {
            cli_grant_permission(authorization, arguments).await
        }
        CliCommand::AssignRole(arguments) => cli_assign_role(authorization, arguments).await,
        CliCommand::AssignPermission(arguments) => {
            cli_assign_permission(authorization, arguments).await
        }
        CliCommand::CheckPermission(arguments) => {
            cli_check_permission(authorization, arguments).await
        }
        CliCommand::CheckRole(arguments) => cli_check_role(authorization, arguments).await,
    }
}



async fn cli_seed(authorization: &Authorization, arguments: SeedCommandArguments) -> Result<()> {
    let seeded_roles = seed_roles(authorization, arguments.team)
        .await
        .into_diagnostic()
        .wrap_err("failed to seed roles")?;

    for role in &seeded_roles {
        println!("Role \"{}\" ({}) is present.", role.name, role.id);
    }

    Ok(())
}


async fn cli_create_permission(
    authorization: &Authorization,
    arguments: CreatePermissionCommandArguments,
) -> Result<()> {
    let guard = guard_or_default(authorization, &arguments.guard);

    let permission = authorization
        .identity()
        .create_permission(&arguments.name, guard)
        .await
        .into_diagnostic()
        .wrap_err("failed to create permission")?;

    println!(
        "Created permission \"{}\" in guard \"{}\" ({}).",
        permission.name, permission.guard, permission.id
    );

    Ok(())
}


async fn cli_create_role(
    authorization: &Authorization,
    arguments: CreateRoleCommandArguments,
) -> Result<()> {
    let guard = guard_or_default(authorization, &arguments.scope.guard);

    let role = authorization
        .identity()
        .create_role(&arguments.name, guard, arguments.scope.team)
        .await
        .into_diagnostic()
        .wrap_err("failed to create role")?;

    println!(
        "Created role \"{}\" in guard \"{}\" ({}).",
        role.name, role.guard, role.id
    );

    Ok(())
}


async fn cli_grant_permission(
    authorization: &Authorization,
    arguments: GrantPermissionCommandArguments,
) -> Result<()> {
    let ScopeArguments { guard, team } = &arguments.scope;
    let guard = guard_or_default(authorization, guard);

    let role = authorization
        .identity()
        .find_role_by_name(&arguments.role, guard, *team)
        .await
        .into_diagnostic()
        .wrap_err("failed to look up role")?;

    let permission = authorization
        .identity()
        .find_permission_by_name(&arguments.permission, guard)
        .await
        .into_diagnostic()
        .wrap_err("failed to look up permission")?;

    let newly_granted = authorization
        .assignments()
        .grant_permission_to_role(role.id, permission.id)
        .await
        .into_diagnostic()
        .wrap_err("failed to grant permission to role")?;

    if newly_granted {
        println!(
            "Granted permission \"{}\" to role \"{}\".",
            permission.name, role.name
        );
    } else {
        println!(
            "Role \"{}\" already had permission \"{}\".",
            role.name, permission.name
        );
    }

    Ok(())
}


async fn cli_assign_role(
    authorization: &Authorization,
    arguments: AssignRoleCommandArguments,
) -> Result<()> {
    let ScopeArguments { guard, team } = &arguments.scope;
    let guard = guard_or_default(authorization, guard);

    let role = authorization
        .identity()
        .find_role_by_name(&arguments.role, guard, *team)
        .await
        .into_diagnostic()
        .wrap_err("failed to look up role")?;

    let newly_assigned = authorization
        .assignments()
        .assign_role_to_subject(&arguments.subject, role.id, *team)
        .await
        .into_diagnostic()
        .wrap_err("failed to assign role to subject")?;

    if newly_assigned {
        println!("Assigned role \"{}\" to {}.", role.name, arguments.subject);
    } else {
        println!("{} already had role \"{}\".", arguments.subject, role.name);
    }

    Ok(())
}


async fn cli_assign_permission(
    authorization: &Authorization,
    arguments: AssignPermissionCommandArguments,
) -> Result<()> {
    let ScopeArguments { guard, team } = &arguments.scope;
    let guard = guard_or_default(authorization, guard);

    let permission = authorization
        .identity()
        .find_permission_by_name(&arguments.permission, guard)
        .await
        .into_diagnostic()
        .wrap_err("failed to look up permission")?;

    let newly_assigned = authorization
        .assignments()
        .assign_permission_to_subject(&arguments.subject, permission.id, *team)
        .await
        .into_diagnostic()
        .wrap_err("failed to assign permission to subject")?;

    if newly_assigned {
        println!(
            "Assigned permission \"{}\" to {}.",
            permission.name, arguments.subject
        );
    } else {
        println!(
            "{} already had permission \"{}\".",
            arguments.subject, permission.name
        );
    }

    Ok(())
}


async fn cli_check_permission(
    authorization: &Authorization,
    arguments: CheckPermissionCommandArguments,
) -> Result<()> {
    let ScopeArguments { guard, team } = &arguments.scope;
    let guard = guard_or_default(authorization, guard);

    let has_permission = authorization
        .queries()
        .subject_has_permission(&arguments.subject, &arguments.permission, guard, *team)
        .await
        .into_diagnostic()
        .wrap_err("failed to check permission")?;

    println!(
        "{} {} permission \"{}\" in guard \"{}\".",
        arguments.subject,
        if has_permission { "has" } else { "does not have" },
        arguments.permission,
        guard
    );

    Ok(())
}


async fn cli_check_role(
    authorization: &Authorization,
    arguments: CheckRoleCommandArguments,
) -> Result<()> {
    let ScopeArguments { guard, team } = &arguments.scope;
    let guard = guard_or_default(authorization, guard);

    let has_role = authorization
        .queries()
        .subject_has_role(&arguments.subject, &arguments.role, guard, *team)
        .await
        .into_diagnostic()
        .wrap_err("failed to check role")?;

    println!(
        "{} {} role \"{}\" in guard \"{}\".",
        arguments.subject,
        if has_role { "has" } else { "does not have" },
        arguments.role,
        guard
    );

    Ok(())
}
