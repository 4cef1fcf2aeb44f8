//! Role-permission grants and subject assignments.

use std::sync::Arc;

use tracing::info;
use warden_core::{
    id::{PermissionId, RoleId, TeamId},
    subject::AsSubject,
    team::TeamMode,
};

use crate::{
    cache::AuthorizationCache,
    errors::AuthorizationResult,
    scope::check_team_argument,
    storage::AuthorizationStorage,
};


/// Manages who holds which role or permission.
///
/// Assigning something that is already assigned (or revoking something that isn't)
/// succeeds without changing anything; the returned `bool` tells whether a row changed.
/// Every successful call invalidates the authorization cache before returning.
#[derive(Clone)]
pub struct AssignmentStore {
    storage: Arc<dyn AuthorizationStorage>,

    cache: Arc<AuthorizationCache>,

    team_mode: TeamMode,
}

impl AssignmentStore {
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

    /// Fails with `GuardMismatch` if the role and the permission belong to different guards.
    pub async fn grant_permission_to_role(
        &self,
        role_id: RoleId,
        permission_id: PermissionId,
    ) -> AuthorizationResult<bool> {
        let newly_granted = self
            .storage
            .grant_permission_to_role(role_id, permission_id)
            .await?;
        self.cache.invalidate();

        info!(
            role_id = %role_id,
            permission_id = %permission_id,
            newly_granted,
            "Granted permission to role."
        );

        Ok(newly_granted)
    }

    pub async fn revoke_permission_from_role(
        &self,
        role_id: RoleId,
        permission_id: PermissionId,
    ) -> AuthorizationResult<bool> {
        let revoked = self
            .storage
            .revoke_permission_from_role(role_id, permission_id)
            .await?;
        self.cache.invalidate();

        info!(
            role_id = %role_id,
            permission_id = %permission_id,
            revoked,
            "Revoked permission from role."
        );

        Ok(revoked)
    }

    pub async fn assign_role_to_subject<S>(
        &self,
        subject: S,
        role_id: RoleId,
        team: Option<TeamId>,
    ) -> AuthorizationResult<bool>
    where
        S: AsSubject,
    {
        check_team_argument(self.team_mode, team, "assign_role_to_subject")?;

        let subject = subject.to_subject();

        let newly_assigned = self
            .storage
            .assign_role_to_subject(&subject, role_id, team)
            .await?;
        self.cache.invalidate();

        info!(
            subject = %subject,
            role_id = %role_id,
            team = ?team,
            newly_assigned,
            "Assigned role to subject."
        );

        Ok(newly_assigned)
    }

    pub async fn remove_role_from_subject<S>(
        &self,
        subject: S,
        role_id: RoleId,
        team: Option<TeamId>,
    ) -> AuthorizationResult<bool>
    where
        S: AsSubject,
    {
        check_team_argument(self.team_mode, team, "remove_role_from_subject")?;

        let subject = subject.to_subject();

        let removed = self
            .storage
            .remove_role_from_subject(&subject, role_id, team)
            .await?;
        self.cache.invalidate();

        info!(
            subject = %subject,
            role_id = %role_id,
            team = ?team,
            removed,
            "Removed role from subject."
        );

        Ok(removed)
    }

    pub async fn assign_permission_to_subject<S>(
        &self,
        subject: S,
        permission_id: PermissionId,
        team: Option<TeamId>,
    ) -> AuthorizationResult<bool>
    where
        S: AsSubject,
    {
        check_team_argument(self.team_mode, team, "assign_permission_to_subject")?;

        let subject = subject.to_subject();

        let newly_assigned = self
            .storage
            .assign_permission_to_subject(&subject, permission_id, team)
            .await?;
        self.cache.invalidate();

        info!(
            subject = %subject,
            permission_id = %permission_id,
            team = ?team,
            newly_assigned,
            "Assigned permission to subject."
        );

        Ok(newly_assigned)
    }

    pub async fn revoke_permission_from_subject<S>(
        &self,
        subject: S,
        permission_id: PermissionId,
        team: Option<TeamId>,
    ) -> AuthorizationResult<bool>
    where
        S: AsSubject,
    {
        check_team_argument(self.team_mode, team, "revoke_permission_from_subject")?;

        let subject = subject.to_subject();

        let revoked = self
            .storage
            .revoke_permission_from_subject(&subject, permission_id, team)
            .await?;
        self.cache.invalidate();

        info!(
            subject = %subject,
            permission_id = %permission_id,
            team = ?team,
            revoked,
            "Revoked permission from subject."
        );

        Ok(revoked)
    }

    /// Makes `role_ids` the exact set of roles the subject holds (within `team`).
    pub async fn sync_roles_for_subject<S>(
        &self,
        subject: S,
        role_ids: &[RoleId],
        team: Option<TeamId>,
    ) -> AuthorizationResult<()>
    where
        S: AsSubject,
    {
        check_team_argument(self.team_mode, team, "sync_roles_for_subject")?;

        let subject = subject.to_subject();

        self.storage
            .sync_roles_for_subject(&subject, role_ids, team)
            .await?;
        self.cache.invalidate();

        info!(
            subject = %subject,
            team = ?team,
            role_count = role_ids.len(),
            "Synchronized subject roles."
        );

        Ok(())
    }
}
