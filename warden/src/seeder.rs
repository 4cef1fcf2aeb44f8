//! Idempotent bootstrap of the built-in roles.

use tracing::info;
use warden_core::{id::TeamId, models::Role};

use crate::{errors::AuthorizationResult, service::Authorization};


pub struct SeededRole {
    pub name: &'static str,

    pub description: &'static str,
}

pub const SEEDED_ROLES: [SeededRole; 2] = [
    SeededRole {
        name: "admin",
        description: "Administrator with full access",
    },
    SeededRole {
        name: "manager",
        description: "Can edit content",
    },
];


/// Ensures every role in [`SEEDED_ROLES`] exists under the service's default guard
/// (in `team`, if team scoping is enabled).
///
/// Running the seeder again creates nothing new, but the cache is invalidated
/// on every run regardless.
pub async fn seed_roles(
    authorization: &Authorization,
    team: Option<TeamId>,
) -> AuthorizationResult<Vec<Role>> {
    let guard = authorization.default_guard();
    let mut seeded_roles = Vec::with_capacity(SEEDED_ROLES.len());

    for seeded_role in &SEEDED_ROLES {
        let role = authorization
            .identity()
            .find_or_create_role(seeded_role.name, guard, team)
            .await?;

        info!(
            role_id = %role.id,
            name = seeded_role.name,
            description = seeded_role.description,
            guard = guard,
            team = ?team,
            "Ensured seeded role exists."
        );

        seeded_roles.push(role);
    }

    authorization.cache().invalidate();

    Ok(seeded_roles)
}
