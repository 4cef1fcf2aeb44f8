use chrono::Utc;
use sqlx::PgConnection;
use warden_core::id::PermissionId;

use super::{InternalPermissionModel, PermissionModel};
use crate::{IntoExternalModel, PermissionSchema, QueryResult};


pub struct PermissionMutation;

impl PermissionMutation {
    /// Inserts a new permission. A `(name, guard)` collision surfaces as a unique violation
    /// (see [`QueryError::is_unique_violation`][crate::QueryError::is_unique_violation]).
    pub async fn create(
        database_connection: &mut PgConnection,
        schema: &PermissionSchema,
        name: &str,
        guard: &str,
    ) -> QueryResult<PermissionModel> {
        let permission_id = PermissionId::generate();
        let creation_time = Utc::now();

        let query = format!(
            "INSERT INTO {} (id, name, guard_name, created_at, updated_at) \
                VALUES ($1, $2, $3, $4, $4) \
                RETURNING id, name, guard_name, created_at, updated_at",
            schema.names.tables.permissions
        );

        let newly_created_permission = sqlx::query_as::<_, InternalPermissionModel>(&query)
            .bind(permission_id.into_uuid())
            .bind(name)
            .bind(guard)
            .bind(creation_time)
            .fetch_one(database_connection)
            .await?;

        Ok(newly_created_permission.into_external_model())
    }

    /// Inserts a new permission unless one with the same `(name, guard)` already exists.
    ///
    /// Returns `None` on a conflict. Unlike a select-then-insert, this never fails with a unique
    /// violation when another transaction inserts the same permission concurrently: the insert
    /// waits for that transaction and then does nothing.
    pub async fn create_if_absent(
        database_connection: &mut PgConnection,
        schema: &PermissionSchema,
        name: &str,
        guard: &str,
    ) -> QueryResult<Option<PermissionModel>> {
        let creation_time = Utc::now();

        let query = format!(
            "INSERT INTO {} (id, name, guard_name, created_at, updated_at) \
                VALUES ($1, $2, $3, $4, $4) \
                ON CONFLICT DO NOTHING \
                RETURNING id, name, guard_name, created_at, updated_at",
            schema.names.tables.permissions
        );

        let newly_created_permission = sqlx::query_as::<_, InternalPermissionModel>(&query)
            .bind(PermissionId::generate().into_uuid())
            .bind(name)
            .bind(guard)
            .bind(creation_time)
            .fetch_optional(database_connection)
            .await?;

        Ok(newly_created_permission.map(IntoExternalModel::into_external_model))
    }

    /// Renames a permission. Returns `None` if no such permission exists.
    pub async fn rename(
        database_connection: &mut PgConnection,
        schema: &PermissionSchema,
        permission_id: PermissionId,
        new_name: &str,
    ) -> QueryResult<Option<PermissionModel>> {
        let query = format!(
            "UPDATE {} \
                SET name = $1, updated_at = $2 \
                WHERE id = $3 \
                RETURNING id, name, guard_name, created_at, updated_at",
            schema.names.tables.permissions
        );

        let updated_permission = sqlx::query_as::<_, InternalPermissionModel>(&query)
            .bind(new_name)
            .bind(Utc::now())
            .bind(permission_id.into_uuid())
            .fetch_optional(database_connection)
            .await?;

        Ok(updated_permission.map(IntoExternalModel::into_external_model))
    }

    /// Deletes a permission, returning `true` if it existed.
    ///
    /// Rows in `role_has_permissions` and `model_has_permissions` referencing it
    /// are removed by the `ON DELETE CASCADE` foreign keys.
    pub async fn delete(
        database_connection: &mut PgConnection,
        schema: &PermissionSchema,
        permission_id: PermissionId,
    ) -> QueryResult<bool> {
        let query = format!(
            "DELETE FROM {} WHERE id = $1",
            schema.names.tables.permissions
        );

        let query_result = sqlx::query(&query)
            .bind(permission_id.into_uuid())
            .execute(database_connection)
            .await?;

        Ok(query_result.rows_affected() == 1)
    }
}
