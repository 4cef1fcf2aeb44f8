//! Permission and role records.

use std::sync::Arc;

use tracing::info;
use warden_core::{
    id::{PermissionId, RoleId, TeamId},
    models::{Permission, Role},
    team::TeamMode,
};

use crate::{
    cache::AuthorizationCache,
    errors::{AuthorizationError, AuthorizationResult, IdentityKind},
    scope::check_team_argument,
    storage::AuthorizationStorage,
};


/// Creates, looks up, renames and deletes permissions and roles.
///
/// Every successful write invalidates the authorization cache before returning.
#[derive(Clone)]
pub struct IdentityStore {
    storage: Arc<dyn AuthorizationStorage>,

    cache: Arc<AuthorizationCache>,

    team_mode: TeamMode,
}

impl IdentityStore {
    pub fn new(
        storage: Arc<dyn AuthorizationStorage>,
        cache: Arc<AuthorizationCache>,
        team_mode: TeamMode,
    ) -> Self {
        Self {
            storage,
            cache,
            team_mode,
        }
    }

    pub async fn create_permission(
        &self,
        name: &str,
        guard: &str,
    ) -> AuthorizationResult<Permission> {
        let permission = self.storage.create_permission(name, guard).await?;
        self.cache.invalidate();

        info!(
            permission_id = %permission.id,
            name = permission.name.as_str(),
            guard = permission.guard.as_str(),
            "Created permission."
        );

        Ok(permission)
    }

    /// Returns the existing permission with this `(name, guard)`, or creates it.
    pub async fn find_or_create_permission(
        &self,
        name: &str,
        guard: &str,
    ) -> AuthorizationResult<Permission> {
        let outcome = self.storage.find_or_create_permission(name, guard).await?;

        if outcome.created {
            self.cache.invalidate();

            info!(
                permission_id = %outcome.record.id,
                name = outcome.record.name.as_str(),
                guard = outcome.record.guard.as_str(),
                "Created permission."
            );
        }

        Ok(outcome.record)
    }

    pub async fn find_permission_by_name(
        &self,
        name: &str,
        guard: &str,
    ) -> AuthorizationResult<Permission> {
        self.storage
            .find_permission(name, guard)
            .await?
            .ok_or_else(|| {
                AuthorizationError::not_found(
                    IdentityKind::Permission,
                    format!("no permission named \"{}\" in guard \"{}\"", name, guard),
                )
            })
    }

    pub async fn rename_permission(
        &self,
        permission_id: PermissionId,
        new_name: &str,
    ) -> AuthorizationResult<Permission> {
        let permission = self
            .storage
            .rename_permission(permission_id, new_name)
            .await?;
        self.cache.invalidate();

        info!(
            permission_id = %permission.id,
            new_name = permission.name.as_str(),
            "Renamed permission."
        );

        Ok(permission)
    }

    /// Deletes a permission along with every assignment of it.
    pub async fn delete_permission(&self, permission_id: PermissionId) -> AuthorizationResult<()> {
        self.storage.delete_permission(permission_id).await?;
        self.cache.invalidate();

        info!(permission_id = %permission_id, "Deleted permission.");

        Ok(())
    }

    /// Lists permissions ordered by guard and name, optionally only those of one guard.
    pub async fn list_permissions(
        &self,
        guard: Option<&str>,
    ) -> AuthorizationResult<Vec<Permission>> {
        self.storage.list_permissions(guard).await
    }


    pub async fn create_role(
        &self,
        name: &str,
        guard: &str,
        team: Option<TeamId>,
    ) -> AuthorizationResult<Role> {
        check_team_argument(self.team_mode, team, "create_role")?;

        let role = self.storage.create_role(name, guard, team).await?;
        self.cache.invalidate();

        info!(
            role_id = %role.id,
            name = role.name.as_str(),
            guard = role.guard.as_str(),
            team = ?role.team_id,
            "Created role."
        );

        Ok(role)
    }

    /// Returns the existing role with this `(name, guard, team)`, or creates it.
    pub async fn find_or_create_role(
        &self,
        name: &str,
        guard: &str,
        team: Option<TeamId>,
    ) -> AuthorizationResult<Role> {
        check_team_argument(self.team_mode, team, "find_or_create_role")?;

        let outcome = self.storage.find_or_create_role(name, guard, team).await?;

        if outcome.created {
            self.cache.invalidate();

            info!(
                role_id = %outcome.record.id,
                name = outcome.record.name.as_str(),
                guard = outcome.record.guard.as_str(),
                team = ?outcome.record.team_id,
                "Created role."
            );
        }

        Ok(outcome.record)
    }

    pub async fn find_role_by_name(
        &self,
        name: &str,
        guard: &str,
        team: Option<TeamId>,
    ) -> AuthorizationResult<Role> {
        check_team_argument(self.team_mode, team, "find_role_by_name")?;

        self.storage
            .find_role(name, guard, team)
            .await?
            .ok_or_else(|| {
                AuthorizationError::not_found(
                    IdentityKind::Role,
                    format!("no role named \"{}\" in guard \"{}\"", name, guard),
                )
            })
    }

    pub async fn rename_role(&self, role_id: RoleId, new_name: &str) -> AuthorizationResult<Role> {
        let role = self.storage.rename_role(role_id, new_name).await?;
        self.cache.invalidate();

        info!(
            role_id = %role.id,
            new_name = role.name.as_str(),
            "Renamed role."
        );

        Ok(role)
    }

    /// Deletes a role along with every assignment of it.
    pub async fn delete_role(&self, role_id: RoleId) -> AuthorizationResult<()> {
        self.storage.delete_role(role_id).await?;
        self.cache.invalidate();

        info!(role_id = %role_id, "Deleted role.");

        Ok(())
    }

    pub async fn list_roles(&self, guard: Option<&str>) -> AuthorizationResult<Vec<Role>> {
        self.storage.list_roles(guard).await
    }
}
