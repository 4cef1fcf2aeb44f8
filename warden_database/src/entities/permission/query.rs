use sqlx::PgConnection;
use warden_core::id::PermissionId;

use super::{InternalPermissionModel, PermissionModel};
use crate::{IntoExternalModel, PermissionSchema, QueryResult};


pub struct PermissionQuery;

impl PermissionQuery {
    pub async fn get_by_id(
        database_connection: &mut PgConnection,
        schema: &PermissionSchema,
        permission_id: PermissionId,
    ) -> QueryResult<Option<PermissionModel>> {
        let query = format!(
            "SELECT id, name, guard_name, created_at, updated_at \
                FROM {} \
                WHERE id = $1",
            schema.names.tables.permissions
        );

        let internal_permission = sqlx::query_as::<_, InternalPermissionModel>(&query)
            .bind(permission_id.into_uuid())
            .fetch_optional(database_connection)
            .await?;

        Ok(internal_permission.map(IntoExternalModel::into_external_model))
    }

    pub async fn get_by_name_and_guard(
        database_connection: &mut PgConnection,
        schema: &PermissionSchema,
        name: &str,
        guard: &str,
    ) -> QueryResult<Option<PermissionModel>> {
        let query = format!(
            "SELECT id, name, guard_name, created_at, updated_at \
                FROM {} \
                WHERE name = $1 AND guard_name = $2",
            schema.names.tables.permissions
        );

        let internal_permission = sqlx::query_as::<_, InternalPermissionModel>(&query)
            .bind(name)
            .bind(guard)
            .fetch_optional(database_connection)
            .await?;

        Ok(internal_permission.map(IntoExternalModel::into_external_model))
    }

    /// Returns every permission, optionally restricted to a single guard.
    pub async fn get_all(
        database_connection: &mut PgConnection,
        schema: &PermissionSchema,
        guard: Option<&str>,
    ) -> QueryResult<Vec<PermissionModel>> {
        let query = format!(
            "SELECT id, name, guard_name, created_at, updated_at \
                FROM {} \
                WHERE ($1::text IS NULL OR guard_name = $1) \
                ORDER BY guard_name, name",
            schema.names.tables.permissions
        );

        let internal_permissions = sqlx::query_as::<_, InternalPermissionModel>(&query)
            .bind(guard)
            .fetch_all(database_connection)
            .await?;

        Ok(internal_permissions
            .into_iter()
            .map(IntoExternalModel::into_external_model)
            .collect())
    }
}
