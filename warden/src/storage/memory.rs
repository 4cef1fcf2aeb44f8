//! In-memory storage backend.
//!
//! All state lives behind a single `tokio::sync::RwLock`: mutations take the write lock
//! for their whole duration, which makes each of them atomic and serializes writers.
//! Nothing is durable. Deleting a permission or a role removes the assignments that
//! reference it explicitly, mirroring the `ON DELETE CASCADE` foreign keys of the
//! Postgres schema.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use warden_core::{
    id::{PermissionId, RoleId, TeamId},
    models::{Permission, Role},
    subject::Subject,
};

use super::{
    AuthorizationStorage,
    FoundOrCreated,
    RolePermissionAssignment,
    StorageSnapshot,
    SubjectPermissionAssignment,
    SubjectRoleAssignment,
};
use crate::errors::{AuthorizationError, AuthorizationResult, IdentityKind};


#[derive(Default)]
struct MemoryState {
    permissions: BTreeMap<PermissionId, Permission>,

    roles: BTreeMap<RoleId, Role>,

    role_permissions: BTreeSet<RolePermissionAssignment>,

    subject_roles: BTreeSet<SubjectRoleAssignment>,

    subject_permissions: BTreeSet<SubjectPermissionAssignment>,
}

impl MemoryState {
    fn find_permission(&self, name: &str, guard: &str) -> Option<&Permission> {
        self.permissions
            .values()
            .find(|permission| permission.name == name && permission.guard == guard)
    }

    fn find_role(&self, name: &str, guard: &str, team: Option<TeamId>) -> Option<&Role> {
        self.roles
            .values()
            .find(|role| role.name == name && role.guard == guard && role.team_id == team)
    }

    fn insert_permission(&mut self, name: &str, guard: &str) -> Permission {
        let creation_time = Utc::now();

        let permission = Permission {
            id: PermissionId::generate(),
            name: name.to_string(),
            guard: guard.to_string(),
            created_at: creation_time,
            updated_at: creation_time,
        };

        self.permissions.insert(permission.id, permission.clone());

        permission
    }

    fn insert_role(&mut self, name: &str, guard: &str, team: Option<TeamId>) -> Role {
        let creation_time = Utc::now();

        let role = Role {
            id: RoleId::generate(),
            team_id: team,
            name: name.to_string(),
            guard: guard.to_string(),
            created_at: creation_time,
            updated_at: creation_time,
        };

        self.roles.insert(role.id, role.clone());

        role
    }

    fn ensure_role_exists(&self, role_id: RoleId) -> AuthorizationResult<&Role> {
        self.roles
            .get(&role_id)
            .ok_or_else(|| AuthorizationError::dangling(IdentityKind::Role, role_id))
    }

    fn ensure_permission_exists(
        &self,
        permission_id: PermissionId,
    ) -> AuthorizationResult<&Permission> {
        self.permissions
            .get(&permission_id)
            .ok_or_else(|| AuthorizationError::dangling(IdentityKind::Permission, permission_id))
    }
}



/// Non-durable [`AuthorizationStorage`] for tests, development and the CLI's
/// `--in-memory` mode.
#[derive(Default)]
pub struct MemoryStorage {
    state: RwLock<MemoryState>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}


#[async_trait]
impl AuthorizationStorage for MemoryStorage {
    async fn create_permission(&self, name: &str, guard: &str) -> AuthorizationResult<Permission> {
        let mut state = self.state.write().await;

        if state.find_permission(name, guard).is_some() {
            return Err(AuthorizationError::duplicate_permission(name, guard));
        }

        Ok(state.insert_permission(name, guard))
    }

    async fn find_or_create_permission(
        &self,
        name: &str,
        guard: &str,
    ) -> AuthorizationResult<FoundOrCreated<Permission>> {
        let mut state = self.state.write().await;

        if let Some(existing_permission) = state.find_permission(name, guard) {
            return Ok(FoundOrCreated {
                record: existing_permission.clone(),
                created: false,
            });
        }

        Ok(FoundOrCreated {
            record: state.insert_permission(name, guard),
            created: true,
        })
    }

    async fn find_permission(
        &self,
        name: &str,
        guard: &str,
    ) -> AuthorizationResult<Option<Permission>> {
        let state = self.state.read().await;

        Ok(state.find_permission(name, guard).cloned())
    }

    async fn rename_permission(
        &self,
        permission_id: PermissionId,
        new_name: &str,
    ) -> AuthorizationResult<Permission> {
        let mut state = self.state.write().await;

        let Some(permission) = state.permissions.get(&permission_id) else {
            return Err(AuthorizationError::not_found(
                IdentityKind::Permission,
                format!("no permission with id {}", permission_id),
            ));
        };

        let guard = permission.guard.clone();

        if let Some(conflicting_permission) = state.find_permission(new_name, &guard) {
            if conflicting_permission.id != permission_id {
                return Err(AuthorizationError::duplicate_permission(new_name, guard));
            }
        }

        let Some(permission) = state.permissions.get_mut(&permission_id) else {
            return Err(AuthorizationError::not_found(
                IdentityKind::Permission,
                format!("no permission with id {}", permission_id),
            ));
        };

        permission.name = new_name.to_string();
        permission.updated_at = Utc::now();

        Ok(permission.clone())
    }

    async fn delete_permission(&self, permission_id: PermissionId) -> AuthorizationResult<()> {
        let mut state = self.state.write().await;

        if state.permissions.remove(&permission_id).is_none() {
            return Err(AuthorizationError::not_found(
                IdentityKind::Permission,
                format!("no permission with id {}", permission_id),
            ));
        }

        state
            .role_permissions
            .retain(|assignment| assignment.permission_id != permission_id);
        state
            .subject_permissions
            .retain(|assignment| assignment.permission_id != permission_id);

        Ok(())
    }

    async fn list_permissions(&self, guard: Option<&str>) -> AuthorizationResult<Vec<Permission>> {
        let state = self.state.read().await;

        let mut permissions: Vec<Permission> = state
            .permissions
            .values()
            .filter(|permission| guard.map_or(true, |guard| permission.guard == guard))
            .cloned()
            .collect();

        permissions.sort_unstable_by(|first, second| {
            (&first.guard, &first.name).cmp(&(&second.guard, &second.name))
        });

        Ok(permissions)
    }


    async fn create_role(
        &self,
        name: &str,
        guard: &str,
        team: Option<TeamId>,
    ) -> AuthorizationResult<Role> {
        let mut state = self.state.write().await;

        if state.find_role(name, guard, team).is_some() {
            return Err(AuthorizationError::duplicate_role(name, guard, team));
        }

        Ok(state.insert_role(name, guard, team))
    }

    async fn find_or_create_role(
        &self,
        name: &str,
        guard: &str,
        team: Option<TeamId>,
    ) -> AuthorizationResult<FoundOrCreated<Role>> {
        let mut state = self.state.write().await;

        if let Some(existing_role) = state.find_role(name, guard, team) {
            return Ok(FoundOrCreated {
                record: existing_role.clone(),
                created: false,
            });
        }

        Ok(FoundOrCreated {
            record: state.insert_role(name, guard, team),
            created: true,
        })
    }

    async fn find_role(
        &self,
        name: &str,
        guard: &str,
        team: Option<TeamId>,
    ) -> AuthorizationResult<Option<Role>> {
        let state = self.state.read().await;

        Ok(state.find_role(name, guard, team).cloned())
    }

    async fn rename_role(&self, role_id: RoleId, new_name: &str) -> AuthorizationResult<Role> {
        let mut state = self.state.write().await;

        let Some(role) = state.roles.get(&role_id) else {
            return Err(AuthorizationError::not_found(
                IdentityKind::Role,
                format!("no role with id {}", role_id),
            ));
        };

        let (guard, team) = (role.guard.clone(), role.team_id);

        if let Some(conflicting_role) = state.find_role(new_name, &guard, team) {
            if conflicting_role.id != role_id {
                return Err(AuthorizationError::duplicate_role(new_name, guard, team));
            }
        }

        let Some(role) = state.roles.get_mut(&role_id) else {
            return Err(AuthorizationError::not_found(
                IdentityKind::Role,
                format!("no role with id {}", role_id),
            ));
        };

        role.name = new_name.to_string();
        role.updated_at = Utc::now();

        Ok(role.clone())
    }

    async fn delete_role(&self, role_id: RoleId) -> AuthorizationResult<()> {
        let mut state = self.state.write().await;

        if state.roles.remove(&role_id).is_none() {
            return Err(AuthorizationError::not_found(
                IdentityKind::Role,
                format!("no role with id {}", role_id),
            ));
        }

        state
            .role_permissions
            .retain(|assignment| assignment.role_id != role_id);
        state
            .subject_roles
            .retain(|assignment| assignment.role_id != role_id);

        Ok(())
    }

    async fn list_roles(&self, guard: Option<&str>) -> AuthorizationResult<Vec<Role>> {
        let state = self.state.read().await;

        let mut roles: Vec<Role> = state
            .roles
            .values()
            .filter(|role| guard.map_or(true, |guard| role.guard == guard))
            .cloned()
            .collect();

        roles.sort_unstable_by(|first, second| {
            (&first.guard, first.team_id, &first.name).cmp(&(
                &second.guard,
                second.team_id,
                &second.name,
            ))
        });

        Ok(roles)
    }


    async fn grant_permission_to_role(
        &self,
        role_id: RoleId,
        permission_id: PermissionId,
    ) -> AuthorizationResult<bool> {
        let mut state = self.state.write().await;

        let role_guard = state.ensure_role_exists(role_id)?.guard.clone();
        let permission = state.ensure_permission_exists(permission_id)?;

        if permission.guard != role_guard {
            return Err(AuthorizationError::GuardMismatch {
                role_guard,
                permission_guard: permission.guard.clone(),
            });
        }

        Ok(state.role_permissions.insert(RolePermissionAssignment {
            role_id,
            permission_id,
        }))
    }

    async fn revoke_permission_from_role(
        &self,
        role_id: RoleId,
        permission_id: PermissionId,
    ) -> AuthorizationResult<bool> {
        let mut state = self.state.write().await;

        Ok(state.role_permissions.remove(&RolePermissionAssignment {
            role_id,
            permission_id,
        }))
    }

    async fn assign_role_to_subject(
        &self,
        subject: &Subject,
        role_id: RoleId,
        team: Option<TeamId>,
    ) -> AuthorizationResult<bool> {
        let mut state = self.state.write().await;

        state.ensure_role_exists(role_id)?;

        Ok(state.subject_roles.insert(SubjectRoleAssignment {
            subject: subject.clone(),
            role_id,
            team_id: team,
        }))
    }

    async fn remove_role_from_subject(
        &self,
        subject: &Subject,
        role_id: RoleId,
        team: Option<TeamId>,
    ) -> AuthorizationResult<bool> {
        let mut state = self.state.write().await;

        Ok(state.subject_roles.remove(&SubjectRoleAssignment {
            subject: subject.clone(),
            role_id,
            team_id: team,
        }))
    }

    async fn assign_permission_to_subject(
        &self,
        subject: &Subject,
        permission_id: PermissionId,
        team: Option<TeamId>,
    ) -> AuthorizationResult<bool> {
        let mut state = self.state.write().await;

        state.ensure_permission_exists(permission_id)?;

        Ok(state
            .subject_permissions
            .insert(SubjectPermissionAssignment {
                subject: subject.clone(),
                permission_id,
                team_id: team,
            }))
    }

    async fn revoke_permission_from_subject(
        &self,
        subject: &Subject,
        permission_id: PermissionId,
        team: Option<TeamId>,
    ) -> AuthorizationResult<bool> {
        let mut state = self.state.write().await;

        Ok(state
            .subject_permissions
            .remove(&SubjectPermissionAssignment {
                subject: subject.clone(),
                permission_id,
                team_id: team,
            }))
    }

    async fn sync_roles_for_subject(
        &self,
        subject: &Subject,
        role_ids: &[RoleId],
        team: Option<TeamId>,
    ) -> AuthorizationResult<()> {
        let mut state = self.state.write().await;

        for role_id in role_ids {
            state.ensure_role_exists(*role_id)?;
        }

        state
            .subject_roles
            .retain(|assignment| !(&assignment.subject == subject && assignment.team_id == team));

        for role_id in role_ids {
            state.subject_roles.insert(SubjectRoleAssignment {
                subject: subject.clone(),
                role_id: *role_id,
                team_id: team,
            });
        }

        Ok(())
    }


    async fn load_snapshot(&self) -> AuthorizationResult<StorageSnapshot> {
        let state = self.state.read().await;

        Ok(StorageSnapshot {
            permissions: state.permissions.values().cloned().collect(),
            roles: state.roles.values().cloned().collect(),
            role_permissions: state.role_permissions.iter().cloned().collect(),
            subject_roles: state.subject_roles.iter().cloned().collect(),
            subject_permissions: state.subject_permissions.iter().cloned().collect(),
        })
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}



#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn deleting_a_permission_removes_its_assignments() {
        let storage = MemoryStorage::new();
        let subject = Subject::new("User", 1);

        let role = storage.create_role("editor", "web", None).await.unwrap();
        let permission = storage
            .create_permission("edit-content", "web")
            .await
            .unwrap();

        storage
            .grant_permission_to_role(role.id, permission.id)
            .await
            .unwrap();
        storage
            .assign_permission_to_subject(&subject, permission.id, None)
            .await
            .unwrap();

        storage.delete_permission(permission.id).await.unwrap();

        let snapshot = storage.load_snapshot().await.unwrap();
        assert!(snapshot.permissions.is_empty());
        assert!(snapshot.role_permissions.is_empty());
        assert!(snapshot.subject_permissions.is_empty());
        assert_eq!(snapshot.roles.len(), 1);
    }

    #[tokio::test]
    async fn failed_sync_changes_nothing() {
        let storage = MemoryStorage::new();
        let subject = Subject::new("User", 1);

        let role = storage.create_role("editor", "web", None).await.unwrap();
        storage
            .assign_role_to_subject(&subject, role.id, None)
            .await
            .unwrap();

        let missing_role_id = RoleId::generate();
        let sync_result = storage
            .sync_roles_for_subject(&subject, &[missing_role_id], None)
            .await;

        assert!(matches!(
            sync_result,
            Err(AuthorizationError::DanglingReference {
                kind: IdentityKind::Role,
                ..
            })
        ));

        let snapshot = storage.load_snapshot().await.unwrap();
        assert_eq!(snapshot.subject_roles.len(), 1);
        assert_eq!(snapshot.subject_roles[0].role_id, role.id);
    }

    #[tokio::test]
    async fn renaming_onto_an_existing_name_is_rejected() {
        let storage = MemoryStorage::new();

        let first = storage.create_permission("first", "web").await.unwrap();
        storage.create_permission("second", "web").await.unwrap();

        assert!(matches!(
            storage.rename_permission(first.id, "second").await,
            Err(AuthorizationError::DuplicateIdentity { .. })
        ));

        // Renaming to its own name is allowed.
        let renamed = storage.rename_permission(first.id, "first").await.unwrap();
        assert_eq!(renamed.name, "first");

        // The same name in another guard is a different permission.
        storage.create_permission("second", "api").await.unwrap();
    }
}
