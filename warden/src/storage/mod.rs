//! Storage backends for permissions, roles and their assignments.
//!
//! Every mutating operation of [`AuthorizationStorage`] is atomic: it validates its
//! references and applies its changes inside one transaction (Postgres) or under one
//! write lock (in memory), so a failed call never leaves partial writes behind.
//! Team arguments are passed through verbatim; checking them against the deployment's
//! team mode is the job of the stores in front of the backend.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use warden_core::{
    id::{PermissionId, RoleId, TeamId},
    models::{Permission, Role},
    subject::Subject,
};

use crate::errors::AuthorizationResult;

mod memory;
mod postgres;

pub use memory::MemoryStorage;
pub use postgres::PostgresStorage;



#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[derive(Serialize, Deserialize)]
pub struct RolePermissionAssignment {
    pub role_id: RoleId,

    pub permission_id: PermissionId,
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[derive(Serialize, Deserialize)]
pub struct SubjectRoleAssignment {
    pub subject: Subject,

    pub role_id: RoleId,

    pub team_id: Option<TeamId>,
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[derive(Serialize, Deserialize)]
pub struct SubjectPermissionAssignment {
    pub subject: Subject,

    pub permission_id: PermissionId,

    pub team_id: Option<TeamId>,
}


/// Every row of every permission table, read at a single point in time.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[derive(Serialize, Deserialize)]
pub struct StorageSnapshot {
    pub permissions: Vec<Permission>,

    pub roles: Vec<Role>,

    pub role_permissions: Vec<RolePermissionAssignment>,

    pub subject_roles: Vec<SubjectRoleAssignment>,

    pub subject_permissions: Vec<SubjectPermissionAssignment>,
}


/// Result of an idempotent "find or create" call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FoundOrCreated<T> {
    pub record: T,

    pub created: bool,
}



#[async_trait]
pub trait AuthorizationStorage: Send + Sync {
    /// Fails with `DuplicateIdentity` if `(name, guard)` is taken.
    async fn create_permission(&self, name: &str, guard: &str) -> AuthorizationResult<Permission>;

    async fn find_or_create_permission(
        &self,
        name: &str,
        guard: &str,
    ) -> AuthorizationResult<FoundOrCreated<Permission>>;

    async fn find_permission(
        &self,
        name: &str,
        guard: &str,
    ) -> AuthorizationResult<Option<Permission>>;

    /// Fails with `NotFound` for an unknown id and `DuplicateIdentity` if the new name is taken.
    async fn rename_permission(
        &self,
        permission_id: PermissionId,
        new_name: &str,
    ) -> AuthorizationResult<Permission>;

    /// Deletes the permission and every assignment referencing it.
    /// Fails with `NotFound` for an unknown id.
    async fn delete_permission(&self, permission_id: PermissionId) -> AuthorizationResult<()>;

    async fn list_permissions(&self, guard: Option<&str>) -> AuthorizationResult<Vec<Permission>>;


    /// Fails with `DuplicateIdentity` if `(name, guard, team)` is taken.
    async fn create_role(
        &self,
        name: &str,
        guard: &str,
        team: Option<TeamId>,
    ) -> AuthorizationResult<Role>;

    async fn find_or_create_role(
        &self,
        name: &str,
        guard: &str,
        team: Option<TeamId>,
    ) -> AuthorizationResult<FoundOrCreated<Role>>;

    async fn find_role(
        &self,
        name: &str,
        guard: &str,
        team: Option<TeamId>,
    ) -> AuthorizationResult<Option<Role>>;

    /// Fails with `NotFound` for an unknown id and `DuplicateIdentity` if the new name is taken.
    async fn rename_role(&self, role_id: RoleId, new_name: &str) -> AuthorizationResult<Role>;

    /// Deletes the role and every assignment referencing it.
    /// Fails with `NotFound` for an unknown id.
    async fn delete_role(&self, role_id: RoleId) -> AuthorizationResult<()>;

    async fn list_roles(&self, guard: Option<&str>) -> AuthorizationResult<Vec<Role>>;


    /// Returns `false` if the role already had the permission.
    /// Fails with `DanglingReference` or `GuardMismatch`.
    async fn grant_permission_to_role(
        &self,
        role_id: RoleId,
        permission_id: PermissionId,
    ) -> AuthorizationResult<bool>;

    /// Returns `false` if the role didn't have the permission.
    async fn revoke_permission_from_role(
        &self,
        role_id: RoleId,
        permission_id: PermissionId,
    ) -> AuthorizationResult<bool>;

    /// Returns `false` if the subject already had the role.
    /// Fails with `DanglingReference` if the role doesn't exist.
    async fn assign_role_to_subject(
        &self,
        subject: &Subject,
        role_id: RoleId,
        team: Option<TeamId>,
    ) -> AuthorizationResult<bool>;

    async fn remove_role_from_subject(
        &self,
        subject: &Subject,
        role_id: RoleId,
        team: Option<TeamId>,
    ) -> AuthorizationResult<bool>;

    /// Returns `false` if the subject already had the permission.
    /// Fails with `DanglingReference` if the permission doesn't exist.
    async fn assign_permission_to_subject(
        &self,
        subject: &Subject,
        permission_id: PermissionId,
        team: Option<TeamId>,
    ) -> AuthorizationResult<bool>;

    async fn revoke_permission_from_subject(
        &self,
        subject: &Subject,
        permission_id: PermissionId,
        team: Option<TeamId>,
    ) -> AuthorizationResult<bool>;

    /// Replaces the roles the subject holds (within `team`) with exactly `role_ids`.
    /// Fails with `DanglingReference` (changing nothing) if any role doesn't exist.
    async fn sync_roles_for_subject(
        &self,
        subject: &Subject,
        role_ids: &[RoleId],
        team: Option<TeamId>,
    ) -> AuthorizationResult<()>;


    /// Reads every table in one consistent pass. This is O(total rows).
    async fn load_snapshot(&self) -> AuthorizationResult<StorageSnapshot>;

    fn backend_name(&self) -> &'static str;
}
