//! PostgreSQL storage backend.
//!
//! Each mutating operation runs in its own transaction: references are validated and
//! uniqueness is pre-checked inside it, and unique or foreign key violations raised by
//! concurrent writers are mapped to the same errors the pre-checks produce.
//! Cascading deletes are left to the `ON DELETE CASCADE` foreign keys.

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool, Postgres, Transaction};
use warden_core::{
    id::{PermissionId, RoleId, TeamId},
    models::{Permission, Role},
    subject::Subject,
};
use warden_database::{
    entities::{
        permission::{PermissionMutation, PermissionQuery},
        role::{RoleMutation, RoleQuery},
        role_permission::{RolePermissionMutation, RolePermissionQuery},
        subject_permission::{SubjectPermissionMutation, SubjectPermissionQuery},
        subject_role::{SubjectRoleMutation, SubjectRoleQuery},
    },
    PermissionSchema,
    QueryError,
};

use super::{
    AuthorizationStorage,
    FoundOrCreated,
    RolePermissionAssignment,
    StorageSnapshot,
    SubjectPermissionAssignment,
    SubjectRoleAssignment,
};
use crate::errors::{AuthorizationError, AuthorizationResult, IdentityKind, StorageError};


/// Replaces unique or foreign key violations with a domain error.
fn map_constraint_violation<F>(error: QueryError, on_violation: F) -> AuthorizationError
where
    F: FnOnce() -> AuthorizationError,
{
    if error.is_unique_violation() || error.is_foreign_key_violation() {
        on_violation()
    } else {
        error.into()
    }
}


pub struct PostgresStorage {
    pool: PgPool,

    schema: PermissionSchema,
}

impl PostgresStorage {
    pub fn new(pool: PgPool, schema: PermissionSchema) -> Self {
        Self { pool, schema }
    }

    pub fn schema(&self) -> &PermissionSchema {
        &self.schema
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn begin(&self) -> AuthorizationResult<Transaction<'static, Postgres>> {
        self.pool
            .begin()
            .await
            .map_err(|error| StorageError::TransactionError { error }.into())
    }

    async fn commit(transaction: Transaction<'static, Postgres>) -> AuthorizationResult<()> {
        transaction
            .commit()
            .await
            .map_err(|error| StorageError::TransactionError { error }.into())
    }

    async fn get_role_or_dangling(
        &self,
        database_connection: &mut PgConnection,
        role_id: RoleId,
    ) -> AuthorizationResult<Role> {
        RoleQuery::get_by_id(database_connection, &self.schema, role_id)
            .await?
            .ok_or_else(|| AuthorizationError::dangling(IdentityKind::Role, role_id))
    }

    async fn get_permission_or_dangling(
        &self,
        database_connection: &mut PgConnection,
        permission_id: PermissionId,
    ) -> AuthorizationResult<Permission> {
        PermissionQuery::get_by_id(database_connection, &self.schema, permission_id)
            .await?
            .ok_or_else(|| AuthorizationError::dangling(IdentityKind::Permission, permission_id))
    }
}


#[async_trait]
impl AuthorizationStorage for PostgresStorage {
    async fn create_permission(&self, name: &str, guard: &str) -> AuthorizationResult<Permission> {
        let mut transaction = self.begin().await?;

        let existing_permission =
            PermissionQuery::get_by_name_and_guard(&mut transaction, &self.schema, name, guard)
                .await?;

        if existing_permission.is_some() {
            return Err(AuthorizationError::duplicate_permission(name, guard));
        }

        let new_permission = PermissionMutation::create(&mut transaction, &self.schema, name, guard)
            .await
            .map_err(|error| {
                map_constraint_violation(error, || {
                    AuthorizationError::duplicate_permission(name, guard)
                })
            })?;

        Self::commit(transaction).await?;

        Ok(new_permission)
    }

    async fn find_or_create_permission(
        &self,
        name: &str,
        guard: &str,
    ) -> AuthorizationResult<FoundOrCreated<Permission>> {
        let mut transaction = self.begin().await?;

        if let Some(existing_permission) =
            PermissionQuery::get_by_name_and_guard(&mut transaction, &self.schema, name, guard)
                .await?
        {
            return Ok(FoundOrCreated {
                record: existing_permission,
                created: false,
            });
        }

        if let Some(new_permission) =
            PermissionMutation::create_if_absent(&mut transaction, &self.schema, name, guard)
                .await?
        {
            Self::commit(transaction).await?;

            return Ok(FoundOrCreated {
                record: new_permission,
                created: true,
            });
        }

        // A concurrent writer inserted the same permission after our lookup;
        // its row is visible to a fresh statement once the insert returns.
        let concurrently_created_permission =
            PermissionQuery::get_by_name_and_guard(&mut transaction, &self.schema, name, guard)
                .await?
                .ok_or_else(|| {
                    QueryError::database_inconsistency(format!(
                        "permission \"{}\" for guard \"{}\" conflicted on insert but cannot be found",
                        name, guard
                    ))
                })?;

        Self::commit(transaction).await?;

        Ok(FoundOrCreated {
            record: concurrently_created_permission,
            created: false,
        })
    }

    async fn find_permission(
        &self,
        name: &str,
        guard: &str,
    ) -> AuthorizationResult<Option<Permission>> {
        let mut connection = self
            .pool
            .acquire()
            .await
            .map_err(|error| StorageError::ConnectionError { error })?;

        Ok(PermissionQuery::get_by_name_and_guard(&mut connection, &self.schema, name, guard).await?)
    }

    async fn rename_permission(
        &self,
        permission_id: PermissionId,
        new_name: &str,
    ) -> AuthorizationResult<Permission> {
        let mut transaction = self.begin().await?;

        let Some(permission) =
            PermissionQuery::get_by_id(&mut transaction, &self.schema, permission_id).await?
        else {
            return Err(AuthorizationError::not_found(
                IdentityKind::Permission,
                format!("no permission with id {}", permission_id),
            ));
        };

        let conflicting_permission = PermissionQuery::get_by_name_and_guard(
            &mut transaction,
            &self.schema,
            new_name,
            &permission.guard,
        )
        .await?;

        if conflicting_permission.is_some_and(|conflicting| conflicting.id != permission_id) {
            return Err(AuthorizationError::duplicate_permission(
                new_name,
                permission.guard,
            ));
        }

        let renamed_permission =
            PermissionMutation::rename(&mut transaction, &self.schema, permission_id, new_name)
                .await
                .map_err(|error| {
                    map_constraint_violation(error, || {
                        AuthorizationError::duplicate_permission(new_name, permission.guard.clone())
                    })
                })?
                .ok_or_else(|| {
                    AuthorizationError::not_found(
                        IdentityKind::Permission,
                        format!("no permission with id {}", permission_id),
                    )
                })?;

        Self::commit(transaction).await?;

        Ok(renamed_permission)
    }

    async fn delete_permission(&self, permission_id: PermissionId) -> AuthorizationResult<()> {
        let mut transaction = self.begin().await?;

        let deleted = PermissionMutation::delete(&mut transaction, &self.schema, permission_id).await?;

        if !deleted {
            return Err(AuthorizationError::not_found(
                IdentityKind::Permission,
                format!("no permission with id {}", permission_id),
            ));
        }

        Self::commit(transaction).await
    }

    async fn list_permissions(&self, guard: Option<&str>) -> AuthorizationResult<Vec<Permission>> {
        let mut connection = self
            .pool
            .acquire()
            .await
            .map_err(|error| StorageError::ConnectionError { error })?;

        Ok(PermissionQuery::get_all(&mut connection, &self.schema, guard).await?)
    }


    async fn create_role(
        &self,
        name: &str,
        guard: &str,
        team: Option<TeamId>,
    ) -> AuthorizationResult<Role> {
        let mut transaction = self.begin().await?;

        let existing_role =
            RoleQuery::get_by_unique_key(&mut transaction, &self.schema, name, guard, team).await?;

        if existing_role.is_some() {
            return Err(AuthorizationError::duplicate_role(name, guard, team));
        }

        let new_role = RoleMutation::create(&mut transaction, &self.schema, name, guard, team)
            .await
            .map_err(|error| {
                map_constraint_violation(error, || {
                    AuthorizationError::duplicate_role(name, guard, team)
                })
            })?;

        Self::commit(transaction).await?;

        Ok(new_role)
    }

    async fn find_or_create_role(
        &self,
        name: &str,
        guard: &str,
        team: Option<TeamId>,
    ) -> AuthorizationResult<FoundOrCreated<Role>> {
        let mut transaction = self.begin().await?;

        if let Some(existing_role) =
            RoleQuery::get_by_unique_key(&mut transaction, &self.schema, name, guard, team).await?
        {
            return Ok(FoundOrCreated {
                record: existing_role,
                created: false,
            });
        }

        if let Some(new_role) =
            RoleMutation::create_if_absent(&mut transaction, &self.schema, name, guard, team)
                .await?
        {
            Self::commit(transaction).await?;

            return Ok(FoundOrCreated {
                record: new_role,
                created: true,
            });
        }

        let concurrently_created_role =
            RoleQuery::get_by_unique_key(&mut transaction, &self.schema, name, guard, team)
                .await?
                .ok_or_else(|| {
                    QueryError::database_inconsistency(format!(
                        "role \"{}\" for guard \"{}\" conflicted on insert but cannot be found",
                        name, guard
                    ))
                })?;

        Self::commit(transaction).await?;

        Ok(FoundOrCreated {
            record: concurrently_created_role,
            created: false,
        })
    }

    async fn find_role(
        &self,
        name: &str,
        guard: &str,
        team: Option<TeamId>,
    ) -> AuthorizationResult<Option<Role>> {
        let mut connection = self
            .pool
            .acquire()
            .await
            .map_err(|error| StorageError::ConnectionError { error })?;

        Ok(RoleQuery::get_by_unique_key(&mut connection, &self.schema, name, guard, team).await?)
    }

    async fn rename_role(&self, role_id: RoleId, new_name: &str) -> AuthorizationResult<Role> {
        let mut transaction = self.begin().await?;

        let Some(role) = RoleQuery::get_by_id(&mut transaction, &self.schema, role_id).await? else {
            return Err(AuthorizationError::not_found(
                IdentityKind::Role,
                format!("no role with id {}", role_id),
            ));
        };

        let conflicting_role = RoleQuery::get_by_unique_key(
            &mut transaction,
            &self.schema,
            new_name,
            &role.guard,
            role.team_id,
        )
        .await?;

        if conflicting_role.is_some_and(|conflicting| conflicting.id != role_id) {
            return Err(AuthorizationError::duplicate_role(
                new_name,
                role.guard,
                role.team_id,
            ));
        }

        let renamed_role = RoleMutation::rename(&mut transaction, &self.schema, role_id, new_name)
            .await
            .map_err(|error| {
                map_constraint_violation(error, || {
                    AuthorizationError::duplicate_role(new_name, role.guard.clone(), role.team_id)
                })
            })?
            .ok_or_else(|| {
                AuthorizationError::not_found(
                    IdentityKind::Role,
                    format!("no role with id {}", role_id),
                )
            })?;

        Self::commit(transaction).await?;

        Ok(renamed_role)
    }

    async fn delete_role(&self, role_id: RoleId) -> AuthorizationResult<()> {
        let mut transaction = self.begin().await?;

        let deleted = RoleMutation::delete(&mut transaction, &self.schema, role_id).await?;

        if !deleted {
            return Err(AuthorizationError::not_found(
                IdentityKind::Role,
                format!("no role with id {}", role_id),
            ));
        }

        Self::commit(transaction).await
    }

    async fn list_roles(&self, guard: Option<&str>) -> AuthorizationResult<Vec<Role>> {
        let mut connection = self
            .pool
            .acquire()
            .await
            .map_err(|error| StorageError::ConnectionError { error })?;

        Ok(RoleQuery::get_all(&mut connection, &self.schema, guard).await?)
    }


    async fn grant_permission_to_role(
        &self,
        role_id: RoleId,
        permission_id: PermissionId,
    ) -> AuthorizationResult<bool> {
        let mut transaction = self.begin().await?;

        let role = self.get_role_or_dangling(&mut transaction, role_id).await?;
        let permission = self
            .get_permission_or_dangling(&mut transaction, permission_id)
            .await?;

        if role.guard != permission.guard {
            return Err(AuthorizationError::GuardMismatch {
                role_guard: role.guard,
                permission_guard: permission.guard,
            });
        }

        let newly_granted =
            RolePermissionMutation::grant(&mut transaction, &self.schema, role_id, permission_id)
                .await
                .map_err(|error| {
                    map_constraint_violation(error, || {
                        AuthorizationError::dangling(IdentityKind::Role, role_id)
                    })
                })?;

        Self::commit(transaction).await?;

        Ok(newly_granted)
    }

    async fn revoke_permission_from_role(
        &self,
        role_id: RoleId,
        permission_id: PermissionId,
    ) -> AuthorizationResult<bool> {
        let mut transaction = self.begin().await?;

        let revoked =
            RolePermissionMutation::revoke(&mut transaction, &self.schema, role_id, permission_id)
                .await?;

        Self::commit(transaction).await?;

        Ok(revoked)
    }

    async fn assign_role_to_subject(
        &self,
        subject: &Subject,
        role_id: RoleId,
        team: Option<TeamId>,
    ) -> AuthorizationResult<bool> {
        let mut transaction = self.begin().await?;

        self.get_role_or_dangling(&mut transaction, role_id).await?;

        let newly_assigned =
            SubjectRoleMutation::assign(&mut transaction, &self.schema, subject, role_id, team)
                .await
                .map_err(|error| {
                    map_constraint_violation(error, || {
                        AuthorizationError::dangling(IdentityKind::Role, role_id)
                    })
                })?;

        Self::commit(transaction).await?;

        Ok(newly_assigned)
    }

    async fn remove_role_from_subject(
        &self,
        subject: &Subject,
        role_id: RoleId,
        team: Option<TeamId>,
    ) -> AuthorizationResult<bool> {
        let mut transaction = self.begin().await?;

        let removed =
            SubjectRoleMutation::remove(&mut transaction, &self.schema, subject, role_id, team)
                .await?;

        Self::commit(transaction).await?;

        Ok(removed)
    }

    async fn assign_permission_to_subject(
        &self,
        subject: &Subject,
        permission_id: PermissionId,
        team: Option<TeamId>,
    ) -> AuthorizationResult<bool> {
        let mut transaction = self.begin().await?;

        self.get_permission_or_dangling(&mut transaction, permission_id)
            .await?;

        let newly_assigned = SubjectPermissionMutation::assign(
            &mut transaction,
            &self.schema,
            subject,
            permission_id,
            team,
        )
        .await
        .map_err(|error| {
            map_constraint_violation(error, || {
                AuthorizationError::dangling(IdentityKind::Permission, permission_id)
            })
        })?;

        Self::commit(transaction).await?;

        Ok(newly_assigned)
    }

    async fn revoke_permission_from_subject(
        &self,
        subject: &Subject,
        permission_id: PermissionId,
        team: Option<TeamId>,
    ) -> AuthorizationResult<bool> {
        let mut transaction = self.begin().await?;

        let revoked = SubjectPermissionMutation::revoke(
            &mut transaction,
            &self.schema,
            subject,
            permission_id,
            team,
        )
        .await?;

        Self::commit(transaction).await?;

        Ok(revoked)
    }

    async fn sync_roles_for_subject(
        &self,
        subject: &Subject,
        role_ids: &[RoleId],
        team: Option<TeamId>,
    ) -> AuthorizationResult<()> {
        let mut transaction = self.begin().await?;

        for role_id in role_ids {
            self.get_role_or_dangling(&mut transaction, *role_id)
                .await?;
        }

        SubjectRoleMutation::remove_all_for_subject(&mut transaction, &self.schema, subject, team)
            .await?;

        for role_id in role_ids {
            SubjectRoleMutation::assign(&mut transaction, &self.schema, subject, *role_id, team)
                .await
                .map_err(|error| {
                    map_constraint_violation(error, || {
                        AuthorizationError::dangling(IdentityKind::Role, *role_id)
                    })
                })?;
        }

        Self::commit(transaction).await
    }


    async fn load_snapshot(&self) -> AuthorizationResult<StorageSnapshot> {
        let mut transaction = self.begin().await?;

        // All five reads must observe the same state.
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *transaction)
            .await
            .map_err(|error| StorageError::TransactionError { error })?;

        let permissions = PermissionQuery::get_all(&mut transaction, &self.schema, None).await?;
        let roles = RoleQuery::get_all(&mut transaction, &self.schema, None).await?;

        let role_permissions = RolePermissionQuery::get_all(&mut transaction, &self.schema)
            .await?
            .into_iter()
            .map(|model| RolePermissionAssignment {
                role_id: model.role_id,
                permission_id: model.permission_id,
            })
            .collect();

        let subject_roles = SubjectRoleQuery::get_all(&mut transaction, &self.schema)
            .await?
            .into_iter()
            .map(|model| SubjectRoleAssignment {
                subject: model.subject,
                role_id: model.role_id,
                team_id: model.team_id,
            })
            .collect();

        let subject_permissions = SubjectPermissionQuery::get_all(&mut transaction, &self.schema)
            .await?
            .into_iter()
            .map(|model| SubjectPermissionAssignment {
                subject: model.subject,
                permission_id: model.permission_id,
                team_id: model.team_id,
            })
            .collect();

        Self::commit(transaction).await?;

        Ok(StorageSnapshot {
            permissions,
            roles,
            role_permissions,
            subject_roles,
            subject_permissions,
        })
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
